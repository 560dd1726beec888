use std::collections::{HashMap, HashSet};

use egui::Rect;

use super::{Edge, Gesture, Operation, OperationContext, OperationKind, PointerInput, resized};
use crate::constants::DRAG_THRESHOLD;
use crate::hit_test::HitTarget;
use crate::model::{Note, Part};
use crate::time_utils::Tick;

/// Makes sure a pressed note takes part in the drag: an unselected note
/// becomes the only selection, a selected one keeps the group.
fn grab(part: &mut Part, id: u64) -> Option<Tick> {
    let note = part.notes().iter().find(|n| n.id == id)?;
    let (pos, selected) = (note.pos, note.selected);
    if !selected {
        part.select_notes(|n| n.id == id);
    }
    Some(pos)
}

/// Rectangle and click selection of notes.
///
/// Plain clicks on empty space clear the selection. With Ctrl/Cmd the
/// rectangle adds to what was selected, and a click on a note toggles it.
#[derive(Debug, Default)]
pub struct NoteSelect {
    press: Option<PointerInput>,
    current: Option<PointerInput>,
    dragging: bool,
    additive: bool,
    toggled: bool,
    before: HashSet<u64>,
    base: HashSet<u64>,
}

impl NoteSelect {
    /// The rubber band in view pixels while dragging.
    pub fn rect(&self) -> Option<Rect> {
        match (self.press, self.current) {
            (Some(press), Some(current)) if self.dragging => Some(Rect::from_two_pos(press.pos, current.pos)),
            _ => None,
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

fn selected_ids(notes: &[Note]) -> HashSet<u64> {
    notes.iter().filter(|n| n.selected).map(|n| n.id).collect()
}

impl Operation for NoteSelect {
    fn kind(&self) -> OperationKind {
        OperationKind::NoteSelect
    }

    fn start(&mut self, ctx: &mut OperationContext, input: &PointerInput, target: HitTarget) -> bool {
        let toggle = input.modifiers.command || input.modifiers.ctrl;
        self.before = selected_ids(ctx.part.notes());
        match target {
            HitTarget::Empty => {}
            HitTarget::Note(id) if toggle => {
                ctx.part
                    .select_notes(|n| if n.id == id { !n.selected } else { n.selected });
                self.toggled = true;
            }
            _ => return false,
        }
        self.additive = toggle;
        self.base = if toggle {
            selected_ids(ctx.part.notes())
        } else {
            HashSet::new()
        };
        self.press = Some(*input);
        true
    }

    fn update(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        let Some(press) = self.press else {
            return;
        };
        if !self.dragging && press.pos.distance(input.pos) < DRAG_THRESHOLD {
            return;
        }
        self.dragging = true;
        self.current = Some(*input);

        let part_pos = ctx.part.pos();
        let (t0, t1) = {
            let (a, b) = (ctx.tick_at(&press), ctx.tick_at(input));
            (a.min(b), a.max(b))
        };
        let (p0, p1) = {
            let (a, b) = (ctx.pitch_at(&press), ctx.pitch_at(input));
            (a.min(b), a.max(b))
        };
        let base = &self.base;
        ctx.part.select_notes(|n| {
            let inside = part_pos + n.pos < t1
                && part_pos + n.end_pos() > t0
                && (n.pitch + 1) as f64 > p0
                && (n.pitch as f64) < p1;
            inside || base.contains(&n.id)
        });
    }

    fn end(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        self.update(ctx, input);
        if !self.dragging && !self.additive && !self.toggled {
            ctx.part.select_notes(|_| false);
        }
        self.reset();
    }

    fn abort(&mut self, ctx: &mut OperationContext) {
        let before = std::mem::take(&mut self.before);
        ctx.part.select_notes(|n| before.contains(&n.id));
        self.reset();
    }

    fn is_operating(&self) -> bool {
        self.press.is_some()
    }
}

/// Drags the selected notes in time and pitch.
#[derive(Debug, Default)]
pub struct NoteMove {
    gesture: Gesture,
    anchor: Tick,
    origins: HashMap<u64, (Tick, i32)>,
    applied: (Tick, i32),
}

impl Operation for NoteMove {
    fn kind(&self) -> OperationKind {
        OperationKind::NoteMove
    }

    fn start(&mut self, ctx: &mut OperationContext, input: &PointerInput, target: HitTarget) -> bool {
        let HitTarget::Note(id) = target else {
            return false;
        };
        self.gesture.begin(ctx.part, input);
        let Some(pos) = grab(ctx.part, id) else {
            self.gesture.rollback(ctx.part);
            return false;
        };
        self.anchor = ctx.part.pos() + pos;
        self.origins = ctx
            .part
            .notes()
            .iter()
            .filter(|n| n.selected)
            .map(|n| (n.id, (n.pos, n.pitch)))
            .collect();
        self.applied = (0.0, 0);
        true
    }

    fn update(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        let Some(press) = self.gesture.press else {
            return;
        };
        let delta = ctx.snapped_delta(self.anchor, ctx.drag_ticks(&press, input));
        let key_delta = ((press.y() - input.y()) / ctx.view.pitch_axis.key_height()).round() as i32;
        if (delta, key_delta) == self.applied {
            return;
        }
        self.applied = (delta, key_delta);
        let origins = &self.origins;
        ctx.part.with_notes(|notes| {
            for note in notes.iter_mut() {
                if let Some(&(pos, pitch)) = origins.get(&note.id) {
                    note.pos = pos + delta;
                    note.pitch = pitch + key_delta;
                }
            }
        });
        self.gesture.changed = delta != 0.0 || key_delta != 0;
    }

    fn end(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        self.update(ctx, input);
        self.gesture.finish(ctx.part);
        self.origins.clear();
    }

    fn abort(&mut self, ctx: &mut OperationContext) {
        self.gesture.rollback(ctx.part);
        self.origins.clear();
    }

    fn is_operating(&self) -> bool {
        self.gesture.is_active()
    }
}

/// Drags the start or end of the selected notes.
#[derive(Debug)]
pub struct NoteResize {
    edge: Edge,
    gesture: Gesture,
    anchor: Tick,
    origins: HashMap<u64, (Tick, Tick)>,
    applied: Option<Tick>,
}

impl NoteResize {
    pub fn new(edge: Edge) -> Self {
        Self {
            edge,
            gesture: Gesture::default(),
            anchor: 0.0,
            origins: HashMap::new(),
            applied: None,
        }
    }
}

impl Operation for NoteResize {
    fn kind(&self) -> OperationKind {
        match self.edge {
            Edge::Start => OperationKind::NoteStartResize,
            Edge::End => OperationKind::NoteEndResize,
        }
    }

    fn start(&mut self, ctx: &mut OperationContext, input: &PointerInput, target: HitTarget) -> bool {
        let HitTarget::Note(id) = target else {
            return false;
        };
        self.gesture.begin(ctx.part, input);
        if grab(ctx.part, id).is_none() {
            self.gesture.rollback(ctx.part);
            return false;
        }
        let Some(note) = ctx.part.notes().iter().find(|n| n.id == id) else {
            self.gesture.rollback(ctx.part);
            return false;
        };
        self.anchor = ctx.part.pos()
            + match self.edge {
                Edge::Start => note.pos,
                Edge::End => note.end_pos(),
            };
        self.origins = ctx
            .part
            .notes()
            .iter()
            .filter(|n| n.selected)
            .map(|n| (n.id, (n.pos, n.dur)))
            .collect();
        self.applied = None;
        true
    }

    fn update(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        let Some(press) = self.gesture.press else {
            return;
        };
        let delta = ctx.snapped_delta(self.anchor, ctx.drag_ticks(&press, input));
        if self.applied == Some(delta) {
            return;
        }
        self.applied = Some(delta);
        let min_dur = ctx.cell_ticks_at(self.anchor + delta);
        let (edge, origins) = (self.edge, &self.origins);
        let changed = ctx.part.with_notes(|notes| {
            let mut changed = false;
            for note in notes.iter_mut() {
                if let Some(&(pos, dur)) = origins.get(&note.id) {
                    (note.pos, note.dur) = resized(edge, pos, dur, delta, min_dur);
                    changed |= (note.pos, note.dur) != (pos, dur);
                }
            }
            changed
        });
        self.gesture.changed = changed;
    }

    fn end(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        self.update(ctx, input);
        self.gesture.finish(ctx.part);
        self.origins.clear();
    }

    fn abort(&mut self, ctx: &mut OperationContext) {
        self.gesture.rollback(ctx.part);
        self.origins.clear();
    }

    fn is_operating(&self) -> bool {
        self.gesture.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use egui::Modifiers;

    fn note_id(fx: &Fixture, index: usize) -> u64 {
        fx.part.notes()[index].id
    }

    #[test]
    fn move_snaps_to_the_grid() {
        // The grid cell is 120 ticks (30 px) at this zoom.
        let mut fx = Fixture::new().with_notes(&[(0.0, 480.0, 60)]);
        let id = note_id(&fx, 0);
        let mut op = NoteMove::default();
        assert!(op.start(&mut fx.ctx(), &at(60.0, 115.0), HitTarget::Note(id)));
        assert!(fx.part.notes()[0].selected);

        op.update(&mut fx.ctx(), &at(70.0, 115.0));
        assert_eq!(fx.part.notes()[0].pos, 0.0);
        op.update(&mut fx.ctx(), &at(80.0, 112.0));
        assert_eq!(fx.part.notes()[0].pos, 120.0);
        assert_eq!(fx.part.notes()[0].pitch, 60);

        op.end(&mut fx.ctx(), &at(80.0, 112.0));
        assert_eq!(fx.part.commit_count(), 1);
    }

    #[test]
    fn pressing_an_unselected_note_drops_the_others() {
        let mut fx = Fixture::new().with_notes(&[(0.0, 480.0, 60), (960.0, 480.0, 62)]);
        fx.part.select_notes(|n| n.pitch == 62);
        let id = note_id(&fx, 0);
        let mut op = NoteMove::default();
        op.start(&mut fx.ctx(), &at(60.0, 115.0), HitTarget::Note(id));
        op.update(&mut fx.ctx(), &at(60.0, 105.0));
        let pitches: Vec<i32> = fx.part.notes().iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![61, 62]);
    }

    #[test]
    fn a_click_without_movement_does_not_commit() {
        let mut fx = Fixture::new().with_notes(&[(0.0, 480.0, 60)]);
        let id = note_id(&fx, 0);
        let mut op = NoteMove::default();
        op.start(&mut fx.ctx(), &at(60.0, 115.0), HitTarget::Note(id));
        op.end(&mut fx.ctx(), &at(61.0, 115.0));
        assert_eq!(fx.part.commit_count(), 0);
        assert!(fx.part.notes()[0].selected);
    }

    #[test]
    fn move_rejects_empty_space() {
        let mut fx = Fixture::new();
        let mut op = NoteMove::default();
        assert!(!op.start(&mut fx.ctx(), &at(60.0, 115.0), HitTarget::Empty));
        assert!(!op.is_operating());
    }

    #[test]
    fn start_resize_keeps_one_cell() {
        let mut fx = Fixture::new().with_notes(&[(0.0, 480.0, 60)]);
        let id = note_id(&fx, 0);
        let mut op = NoteResize::new(Edge::Start);
        op.start(&mut fx.ctx(), &at(1.0, 115.0), HitTarget::Note(id));
        op.update(&mut fx.ctx(), &at(61.0, 115.0));
        assert_eq!((fx.part.notes()[0].pos, fx.part.notes()[0].dur), (240.0, 240.0));

        op.update(&mut fx.ctx(), &at(400.0, 115.0));
        assert_eq!((fx.part.notes()[0].pos, fx.part.notes()[0].dur), (360.0, 120.0));
        op.end(&mut fx.ctx(), &at(400.0, 115.0));
        assert_eq!(fx.part.commit_count(), 1);
    }

    #[test]
    fn end_resize_stretches_and_aborts() {
        let mut fx = Fixture::new().with_notes(&[(0.0, 480.0, 60)]);
        let id = note_id(&fx, 0);
        let mut op = NoteResize::new(Edge::End);
        assert_eq!(op.kind(), OperationKind::NoteEndResize);
        op.start(&mut fx.ctx(), &at(119.0, 115.0), HitTarget::Note(id));
        op.update(&mut fx.ctx(), &at(239.0, 115.0));
        assert_eq!(fx.part.notes()[0].dur, 960.0);
        op.update(&mut fx.ctx(), &at(-500.0, 115.0));
        assert_eq!(fx.part.notes()[0].dur, 120.0);

        op.abort(&mut fx.ctx());
        assert_eq!(fx.part.notes()[0].dur, 480.0);
        assert_eq!(fx.part.commit_count(), 0);
    }

    #[test]
    fn rectangle_selects_overlapping_notes() {
        let mut fx = Fixture::new().with_notes(&[(0.0, 480.0, 60), (960.0, 480.0, 64), (2400.0, 480.0, 60)]);
        let mut op = NoteSelect::default();
        op.start(&mut fx.ctx(), &at(100.0, 60.0), HitTarget::Empty);
        op.update(&mut fx.ctx(), &at(300.0, 118.0));
        assert!(op.rect().is_some());
        let selected: Vec<bool> = fx.part.notes().iter().map(|n| n.selected).collect();
        assert_eq!(selected, vec![true, true, false]);
        op.end(&mut fx.ctx(), &at(300.0, 118.0));
        assert!(op.rect().is_none());
        assert_eq!(fx.part.commit_count(), 0);
    }

    #[test]
    fn click_on_empty_space_clears() {
        let mut fx = Fixture::new().with_notes(&[(0.0, 480.0, 60)]);
        fx.part.select_notes(|_| true);
        let mut op = NoteSelect::default();
        op.start(&mut fx.ctx(), &at(500.0, 300.0), HitTarget::Empty);
        op.end(&mut fx.ctx(), &at(500.5, 300.0));
        assert!(!fx.part.has_selected_notes());
    }

    #[test]
    fn ctrl_click_toggles_and_abort_restores() {
        let mut fx = Fixture::new().with_notes(&[(0.0, 480.0, 60), (960.0, 480.0, 60)]);
        fx.part.select_notes(|n| n.pos == 0.0);
        let id = note_id(&fx, 1);
        let mut op = NoteSelect::default();
        let input = with_mods(300.0, 115.0, Modifiers::COMMAND);
        op.start(&mut fx.ctx(), &input, HitTarget::Note(id));
        op.end(&mut fx.ctx(), &input);
        assert!(fx.part.notes().iter().all(|n| n.selected));

        op.start(&mut fx.ctx(), &input, HitTarget::Note(id));
        assert!(!fx.part.notes()[1].selected);
        op.abort(&mut fx.ctx());
        assert!(fx.part.notes()[1].selected);
    }
}
