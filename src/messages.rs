use crossbeam_channel::{Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

use crate::input::PianoTool;

/// Receiving end handed out by [`Event::subscribe`]. Dropping it unsubscribes.
pub type Subscription<T> = Receiver<T>;

/// Fan-out notification hub. Every subscriber gets its own channel; channels
/// whose receiver was dropped are pruned on the next emit.
pub struct Event<T: Clone> {
    senders: Mutex<Vec<Sender<T>>>,
}

impl<T: Clone> Default for Event<T> {
    fn default() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Clone> std::fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("subscribers", &self.senders.lock().len())
            .finish()
    }
}

impl<T: Clone> Event<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.senders.lock().push(tx);
        rx
    }

    pub fn emit(&self, value: T) {
        self.senders
            .lock()
            .retain(|tx| tx.send(value.clone()).is_ok());
    }

    /// Live subscriber count as of the last emit.
    pub fn subscriber_count(&self) -> usize {
        self.senders.lock().len()
    }
}

/// Change notifications published by a part.
#[derive(Debug, Clone, PartialEq)]
pub enum PartEvent {
    Modified,
    Committed,
    NoteSelectionChanged,
    VibratoSelectionChanged,
    PitchModified,
    SynthesisStatusChanged { start_time: f64, end_time: f64 },
}

/// Drains every pending message from `rx`, reporting whether the sender side
/// has gone away.
pub fn drain<T>(rx: &Subscription<T>) -> (Vec<T>, bool) {
    let mut out = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(v) => out.push(v),
            Err(TryRecvError::Empty) => return (out, false),
            Err(TryRecvError::Disconnected) => return (out, true),
        }
    }
}

/// Tool selection shared with the host toolbar.
#[derive(Debug, Default)]
pub struct ToolState {
    tool: PianoTool,
    pub changed: Event<PianoTool>,
}

impl ToolState {
    pub fn new(tool: PianoTool) -> Self {
        Self {
            tool,
            changed: Event::new(),
        }
    }

    #[inline]
    pub fn get(&self) -> PianoTool {
        self.tool
    }

    pub fn set(&mut self, tool: PianoTool) {
        if self.tool != tool {
            log::debug!("Piano tool {:?} -> {:?}", self.tool, tool);
            self.tool = tool;
            self.changed.emit(tool);
        }
    }
}
