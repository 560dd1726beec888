use std::collections::BTreeMap;

use crate::model::{CurvePoint, Note, Part, Vibrato};
use crate::time_utils::Tick;

/// Whether an item spanning `[pos, end)` lies wholly inside the half-open
/// range `[start, stop)`. Items only touching the range edges from outside
/// are not contained.
#[inline]
pub fn contained(pos: Tick, end: Tick, (start, stop): (Tick, Tick)) -> bool {
    pos >= start && pos < stop && end <= stop
}

/// Notes with positions relative to the copy origin.
#[derive(Debug, Clone, Default)]
pub struct NoteClipboard {
    notes: Vec<Note>,
}

impl NoteClipboard {
    /// Copies notes wholly inside the local `range`, relative to its start.
    /// Without a range every note is taken, relative to the part start.
    pub fn copy(part: &Part, range: Option<(Tick, Tick)>) -> Self {
        let (origin, picked): (Tick, Vec<&Note>) = match range {
            Some(r) => (
                r.0,
                part.notes()
                    .iter()
                    .filter(|n| contained(n.pos, n.end_pos(), r))
                    .collect(),
            ),
            None => (0.0, part.notes().iter().collect()),
        };
        let notes = picked
            .into_iter()
            .map(|n| {
                let mut copy = n.clone();
                copy.pos -= origin;
                copy.selected = false;
                copy.synthesized_phonemes = None;
                copy
            })
            .collect();
        Self { notes }
    }

    /// Inserts fresh copies at `anchor + relative position`. Returns how many.
    pub fn paste(&self, part: &mut Part, anchor: Tick) -> usize {
        if self.notes.is_empty() {
            log::debug!("Note clipboard empty, nothing to paste");
            return 0;
        }
        part.begin_merge_dirty();
        for note in &self.notes {
            let mut copy = note.duplicate();
            copy.pos += anchor;
            part.insert_note(copy);
        }
        part.end_merge_dirty();
        self.notes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }
}

#[derive(Debug, Clone, Default)]
pub struct VibratoClipboard {
    vibratos: Vec<Vibrato>,
}

impl VibratoClipboard {
    /// Same origin rules as [`NoteClipboard::copy`].
    pub fn copy(part: &Part, range: Option<(Tick, Tick)>) -> Self {
        let (origin, picked): (Tick, Vec<&Vibrato>) = match range {
            Some(r) => (
                r.0,
                part.vibratos()
                    .iter()
                    .filter(|v| contained(v.pos, v.end_pos(), r))
                    .collect(),
            ),
            None => (0.0, part.vibratos().iter().collect()),
        };
        let vibratos = picked
            .into_iter()
            .map(|v| {
                let mut copy = v.clone();
                copy.pos -= origin;
                copy.selected = false;
                copy
            })
            .collect();
        Self { vibratos }
    }

    pub fn paste(&self, part: &mut Part, anchor: Tick) -> usize {
        if self.vibratos.is_empty() {
            log::debug!("Vibrato clipboard empty, nothing to paste");
            return 0;
        }
        part.begin_merge_dirty();
        for vibrato in &self.vibratos {
            let mut copy = vibrato.duplicate();
            copy.pos += anchor;
            part.insert_vibrato(copy);
        }
        part.end_merge_dirty();
        self.vibratos.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vibratos.is_empty()
    }

    pub fn vibratos(&self) -> &[Vibrato] {
        &self.vibratos
    }
}

/// Pitch and automation data over a tick range, re-based to the range start.
#[derive(Debug, Clone, Default)]
pub struct ParameterClipboard {
    duration: Tick,
    pitch: Vec<Vec<CurvePoint>>,
    automations: BTreeMap<String, Vec<Vec<CurvePoint>>>,
}

impl ParameterClipboard {
    /// Copies the curves over the local `range`, or from the part start to
    /// the end of the part or of the last curve, whichever is later.
    pub fn copy(part: &Part, range: Option<(Tick, Tick)>) -> Self {
        let (start, end) = range.unwrap_or_else(|| whole_part_range(part));
        let automations = part
            .automations()
            .iter()
            .map(|(id, track)| (id.clone(), track.curve.copy_range(start, end)))
            .filter(|(_, runs)| !runs.is_empty())
            .collect();
        Self {
            duration: end - start,
            pitch: part.pitch().copy_range(start, end),
            automations,
        }
    }

    /// Replaces `[anchor, anchor + duration]` with the copied curves.
    ///
    /// `blend` is the width in ticks over which the pasted data cross-fades
    /// from the existing curve at each edge.
    pub fn paste(&self, part: &mut Part, anchor: Tick, blend: Tick) -> bool {
        if self.is_empty() {
            log::debug!("Parameter clipboard empty, nothing to paste");
            return false;
        }
        part.begin_merge_dirty();
        part.with_pitch(|curve| curve.paste(&self.pitch, anchor, self.duration, blend));
        for (id, runs) in &self.automations {
            part.with_automation(id, |track| {
                track.curve.paste(runs, anchor, self.duration, blend)
            });
        }
        part.end_merge_dirty();
        true
    }

    pub fn is_empty(&self) -> bool {
        self.pitch.is_empty() && self.automations.is_empty()
    }

    pub fn duration(&self) -> Tick {
        self.duration
    }

    pub fn pitch(&self) -> &[Vec<CurvePoint>] {
        &self.pitch
    }

    pub fn automation(&self, id: &str) -> Option<&[Vec<CurvePoint>]> {
        self.automations.get(id).map(|r| r.as_slice())
    }
}

/// Starts at the part start, the same origin the item clipboards use.
fn whole_part_range(part: &Part) -> (Tick, Tick) {
    let end = std::iter::once(part.pitch().extent())
        .chain(part.automations().values().map(|t| t.curve.extent()))
        .flatten()
        .fold(part.dur(), |end, (_, e)| end.max(e));
    (0.0, end)
}

/// The three independent copy buffers.
#[derive(Debug, Clone, Default)]
pub struct Clipboards {
    pub notes: NoteClipboard,
    pub vibratos: VibratoClipboard,
    pub parameters: ParameterClipboard,
}
