use super::{Edge, Gesture, Operation, OperationContext, OperationKind, PointerInput, resized};
use crate::constants::MIN_PHONEME_DURATION;
use crate::hit_test::HitTarget;
use crate::model::Phoneme;
use crate::time_utils::Tick;
use crate::waveform::BoundaryKind;

#[derive(Debug, Clone, Copy)]
struct Span {
    id: u64,
    pos: Tick,
    dur: Tick,
}

#[derive(Debug, Clone, Copy)]
struct NoteGrip {
    edge: Edge,
    anchor: Tick,
    note: Span,
    /// The note sharing the dragged boundary, if the two touch.
    neighbour: Option<Span>,
}

/// Drags a note boundary from the waveform strip. A touching neighbour moves
/// with it, so adjacent notes stay adjacent.
#[derive(Debug, Default)]
pub struct WaveformNoteResize {
    gesture: Gesture,
    grip: Option<NoteGrip>,
    applied: Option<Tick>,
}

impl Operation for WaveformNoteResize {
    fn kind(&self) -> OperationKind {
        OperationKind::WaveformNoteResize
    }

    fn start(&mut self, ctx: &mut OperationContext, input: &PointerInput, target: HitTarget) -> bool {
        let HitTarget::Boundary { note_id, kind } = target else {
            return false;
        };
        let edge = match kind {
            BoundaryKind::NoteStart => Edge::Start,
            BoundaryKind::NoteEnd => Edge::End,
            _ => return false,
        };
        let notes = ctx.part.notes();
        let Some(note) = notes.iter().find(|n| n.id == note_id) else {
            return false;
        };
        let boundary = match edge {
            Edge::Start => note.pos,
            Edge::End => note.end_pos(),
        };
        let neighbour = notes
            .iter()
            .filter(|n| n.id != note_id)
            .find(|n| match edge {
                Edge::Start => n.end_pos() == boundary,
                Edge::End => n.pos == boundary,
            })
            .map(|n| Span {
                id: n.id,
                pos: n.pos,
                dur: n.dur,
            });
        self.grip = Some(NoteGrip {
            edge,
            anchor: ctx.part.pos() + boundary,
            note: Span {
                id: note.id,
                pos: note.pos,
                dur: note.dur,
            },
            neighbour,
        });
        self.applied = None;
        self.gesture.begin(ctx.part, input);
        true
    }

    fn update(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        let (Some(press), Some(grip)) = (self.gesture.press, self.grip) else {
            return;
        };
        let snapped = ctx.snapped_delta(grip.anchor, ctx.drag_ticks(&press, input));
        let min_dur = ctx.cell_ticks_at(grip.anchor + snapped);

        // Both sides of the boundary keep at least one cell.
        let (lower, upper) = match grip.edge {
            Edge::Start => (
                grip.neighbour.map_or(f64::NEG_INFINITY, |n| min_dur - n.dur),
                grip.note.dur - min_dur,
            ),
            Edge::End => (
                min_dur - grip.note.dur,
                grip.neighbour.map_or(f64::INFINITY, |n| n.dur - min_dur),
            ),
        };
        let delta = if lower <= upper {
            snapped.clamp(lower, upper)
        } else {
            0.0
        };
        if self.applied == Some(delta) {
            return;
        }
        self.applied = Some(delta);

        let other = match grip.edge {
            Edge::Start => Edge::End,
            Edge::End => Edge::Start,
        };
        ctx.part.with_notes(|notes| {
            for note in notes.iter_mut() {
                if note.id == grip.note.id {
                    (note.pos, note.dur) = resized(grip.edge, grip.note.pos, grip.note.dur, delta, 0.0);
                } else if let Some(n) = grip.neighbour.filter(|n| n.id == note.id) {
                    (note.pos, note.dur) = resized(other, n.pos, n.dur, delta, 0.0);
                }
            }
        });
        self.gesture.changed = delta != 0.0;
    }

    fn end(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        self.update(ctx, input);
        self.gesture.finish(ctx.part);
        self.grip = None;
    }

    fn abort(&mut self, ctx: &mut OperationContext) {
        self.gesture.rollback(ctx.part);
        self.grip = None;
    }

    fn is_operating(&self) -> bool {
        self.gesture.is_active()
    }
}

#[derive(Debug, Clone)]
struct PhonemeGrip {
    note_id: u64,
    kind: BoundaryKind,
    /// Seconds at the note start; phoneme times are relative to it.
    note_time: f64,
    origin: Vec<Phoneme>,
    authored: Vec<Phoneme>,
}

fn clamp_or(value: f64, lower: f64, upper: f64, fallback: f64) -> f64 {
    if lower <= upper {
        value.clamp(lower, upper)
    } else {
        fallback
    }
}

/// Moves `origin`'s boundary `kind` to `time`. A touching neighbour moves
/// along, and every phoneme keeps [`MIN_PHONEME_DURATION`].
fn moved_phonemes(origin: &[Phoneme], kind: BoundaryKind, time: f64) -> Vec<Phoneme> {
    let mut out = origin.to_vec();
    match kind {
        BoundaryKind::PhonemeStart(i) if i < origin.len() => {
            let prev = i.checked_sub(1).map(|p| &origin[p]);
            let lower = prev.map_or(f64::NEG_INFINITY, |p| p.start_time + MIN_PHONEME_DURATION);
            let upper = origin[i].end_time - MIN_PHONEME_DURATION;
            let t = clamp_or(time, lower, upper, origin[i].start_time);
            out[i].start_time = t;
            if let Some(p) = prev
                && p.end_time == origin[i].start_time
            {
                out[i - 1].end_time = t;
            }
        }
        BoundaryKind::PhonemeEnd(i) if i < origin.len() => {
            let next = origin.get(i + 1);
            let lower = origin[i].start_time + MIN_PHONEME_DURATION;
            let upper = next.map_or(f64::INFINITY, |n| n.end_time - MIN_PHONEME_DURATION);
            let t = clamp_or(time, lower, upper, origin[i].end_time);
            out[i].end_time = t;
            if let Some(n) = next
                && n.start_time == origin[i].end_time
            {
                out[i + 1].start_time = t;
            }
        }
        _ => {}
    }
    out
}

/// Drags a phoneme boundary from the waveform strip.
///
/// Synthesized timing is adopted as authored phonemes on the first real
/// change, so the backend's result becomes the starting point for editing.
#[derive(Debug, Default)]
pub struct WaveformPhonemeResize {
    gesture: Gesture,
    grip: Option<PhonemeGrip>,
    applied: Vec<Phoneme>,
}

impl Operation for WaveformPhonemeResize {
    fn kind(&self) -> OperationKind {
        OperationKind::WaveformPhonemeResize
    }

    fn start(&mut self, ctx: &mut OperationContext, input: &PointerInput, target: HitTarget) -> bool {
        let HitTarget::Boundary { note_id, kind } = target else {
            return false;
        };
        if !matches!(kind, BoundaryKind::PhonemeStart(_) | BoundaryKind::PhonemeEnd(_)) {
            return false;
        }
        let Some(note) = ctx.part.notes().iter().find(|n| n.id == note_id) else {
            return false;
        };
        let Some(origin) = note.effective_phonemes().map(<[Phoneme]>::to_vec) else {
            return false;
        };
        let note_time = ctx.part.tempo().time_at(ctx.part.pos() + note.pos);
        self.applied = origin.clone();
        self.grip = Some(PhonemeGrip {
            note_id,
            kind,
            note_time,
            origin,
            authored: note.phonemes.clone(),
        });
        self.gesture.begin(ctx.part, input);
        true
    }

    fn update(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        let Some(grip) = &self.grip else {
            return;
        };
        let time = ctx.part.tempo().time_at(ctx.tick_at(input)) - grip.note_time;
        let phonemes = moved_phonemes(&grip.origin, grip.kind, time);
        if phonemes == self.applied {
            return;
        }
        let note_id = grip.note_id;
        self.gesture.changed = phonemes != grip.authored;
        self.applied = phonemes.clone();
        ctx.part.with_notes(|notes| {
            if let Some(note) = notes.iter_mut().find(|n| n.id == note_id) {
                note.phonemes = phonemes;
            }
        });
    }

    fn end(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        self.update(ctx, input);
        self.gesture.finish(ctx.part);
        self.grip = None;
        self.applied.clear();
    }

    fn abort(&mut self, ctx: &mut OperationContext) {
        self.gesture.rollback(ctx.part);
        self.grip = None;
        self.applied.clear();
    }

    fn is_operating(&self) -> bool {
        self.gesture.is_active()
    }
}
