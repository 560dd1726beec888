use std::sync::Arc;

use super::part::Part;
use crate::messages::{Event, PartEvent};

/// Holds the part open in the editor, if any.
///
/// Part notifications are forwarded through one hub that outlives individual
/// parts, so a subscriber keeps listening to whichever part is current.
#[derive(Debug, Default)]
pub struct PartProvider {
    part: Option<Part>,
    part_events: Arc<Event<PartEvent>>,
    pub object_changed: Event<()>,
}

impl PartProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&Part> {
        self.part.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut Part> {
        self.part.as_mut()
    }

    /// Current-part notifications, following part replacement.
    pub fn part_events(&self) -> &Event<PartEvent> {
        &self.part_events
    }

    /// Opens `part`, returning the previously open one detached from the hub.
    pub fn replace(&mut self, part: Option<Part>) -> Option<Part> {
        let mut previous = std::mem::replace(&mut self.part, part);
        if let Some(part) = self.part.as_mut() {
            log::info!("Opened part '{}'", part.name);
            part.rebind_events(self.part_events.clone());
        }
        if let Some(old) = previous.as_mut() {
            old.rebind_events(Arc::new(Event::new()));
        }
        self.object_changed.emit(());
        previous
    }

    pub fn close(&mut self) -> Option<Part> {
        self.replace(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::drain;
    use crate::model::Note;
    use crate::time_utils::TempoTrack;

    fn part(name: &str) -> Part {
        Part::new(name, 0.0, 1920.0, Arc::new(TempoTrack::default()))
    }

    #[test]
    fn events_follow_the_current_part() {
        let mut provider = PartProvider::new();
        let rx = provider.part_events().subscribe();
        let replaced = provider.object_changed.subscribe();

        provider.replace(Some(part("a")));
        let mut old = provider.replace(Some(part("b"))).unwrap();
        assert_eq!(drain(&replaced).0.len(), 2);

        old.insert_note(Note::new(0.0, 10.0, 60, ""));
        assert!(drain(&rx).0.is_empty());

        provider.get_mut().unwrap().insert_note(Note::new(0.0, 10.0, 60, ""));
        assert_eq!(drain(&rx).0, vec![PartEvent::Modified]);
    }
}
