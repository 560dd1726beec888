//! Interactive pointer gestures. Each gesture is one [`Operation`]; the
//! [`OperationRegistry`] owns one instance per kind and lets at most one run.

mod note;
mod pan;
mod pitch;
mod range;
mod vibrato;
mod waveform;

use egui::{Modifiers, PointerButton, Pos2};

use crate::config::EditorConfig;
use crate::hit_test::{HitTarget, hit_test};
use crate::model::{Part, PartSnapshot};
use crate::selection::Selection;
use crate::time_utils::Tick;
use crate::view::ViewState;

pub use note::{NoteMove, NoteResize, NoteSelect};
pub use pan::Pan;
pub use pitch::{PitchClear, PitchDraw, PitchLock};
pub use range::RangeSelect;
pub use vibrato::{VibratoMove, VibratoParameter, VibratoResize, VibratoSelect};
pub use waveform::{WaveformNoteResize, WaveformPhonemeResize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Pan,
    NoteSelect,
    NoteMove,
    NoteStartResize,
    NoteEndResize,
    VibratoSelect,
    VibratoMove,
    VibratoStartResize,
    VibratoEndResize,
    VibratoAmplitude,
    VibratoFrequency,
    VibratoPhase,
    PitchDraw,
    PitchClear,
    PitchLock,
    WaveformNoteResize,
    WaveformPhonemeResize,
    RangeSelect,
}

impl OperationKind {
    pub fn all() -> &'static [OperationKind] {
        use OperationKind::*;
        &[
            Pan,
            NoteSelect,
            NoteMove,
            NoteStartResize,
            NoteEndResize,
            VibratoSelect,
            VibratoMove,
            VibratoStartResize,
            VibratoEndResize,
            VibratoAmplitude,
            VibratoFrequency,
            VibratoPhase,
            PitchDraw,
            PitchClear,
            PitchLock,
            WaveformNoteResize,
            WaveformPhonemeResize,
            RangeSelect,
        ]
    }

    /// Whether finishing this gesture produces an undoable change.
    pub fn edits_data(&self) -> bool {
        !matches!(
            self,
            OperationKind::Pan
                | OperationKind::NoteSelect
                | OperationKind::VibratoSelect
                | OperationKind::RangeSelect
        )
    }
}

/// One pointer sample as delivered by the windowing layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    pub pos: Pos2,
    pub modifiers: Modifiers,
    pub button: PointerButton,
}

impl PointerInput {
    pub fn new(pos: Pos2, modifiers: Modifiers, button: PointerButton) -> Self {
        Self {
            pos,
            modifiers,
            button,
        }
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.pos.x as f64
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.pos.y as f64
    }
}

/// Everything an operation may touch while it runs.
pub struct OperationContext<'a> {
    pub part: &'a mut Part,
    pub view: &'a mut ViewState,
    pub selection: &'a mut Selection,
    pub config: &'a EditorConfig,
}

impl OperationContext<'_> {
    /// Global tick under the pointer.
    #[inline]
    pub fn tick_at(&self, input: &PointerInput) -> Tick {
        self.view.tick_axis.x_to_tick(input.x())
    }

    /// Global tick under the pointer, snapped to the grid.
    pub fn quantized_tick_at(&self, input: &PointerInput) -> Tick {
        self.view.quantize(self.tick_at(input), self.part.tempo())
    }

    #[inline]
    pub fn pitch_at(&self, input: &PointerInput) -> f64 {
        self.view.pitch_axis.y_to_pitch(input.y())
    }

    /// Horizontal drag distance in ticks.
    #[inline]
    pub fn drag_ticks(&self, from: &PointerInput, to: &PointerInput) -> Tick {
        (to.x() - from.x()) / self.view.tick_axis.pixels_per_tick()
    }

    /// `anchor + delta` snapped to the grid, returned as an offset from `anchor`.
    pub fn snapped_delta(&self, anchor: Tick, delta: Tick) -> Tick {
        self.view.quantize(anchor + delta, self.part.tempo()) - anchor
    }

    #[inline]
    pub fn cell_ticks_at(&self, tick: Tick) -> Tick {
        self.view.cell_ticks_at(tick, self.part.tempo())
    }
}

/// Which end of an item a resize drags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Start,
    End,
}

/// New `(pos, dur)` for an item resized by `delta` at `edge`, never shorter
/// than `min_dur`.
pub(crate) fn resized(edge: Edge, pos: Tick, dur: Tick, delta: Tick, min_dur: Tick) -> (Tick, Tick) {
    match edge {
        Edge::Start => {
            let end = pos + dur;
            let start = (pos + delta).min(end - min_dur);
            (start, end - start)
        }
        Edge::End => (pos, (dur + delta).max(min_dur)),
    }
}

/// A single interactive gesture with an `Idle -> Operating -> Idle` lifecycle.
///
/// `update` derives the edit from the state captured at `start` plus the
/// current pointer, so replaying the same input changes nothing further.
/// `abort` puts everything back as it was at `start` without committing.
pub trait Operation: Send {
    fn kind(&self) -> OperationKind;

    /// Returns `false` when `target` is not something this gesture acts on.
    fn start(&mut self, ctx: &mut OperationContext, input: &PointerInput, target: HitTarget) -> bool;

    fn update(&mut self, ctx: &mut OperationContext, input: &PointerInput);

    fn end(&mut self, ctx: &mut OperationContext, input: &PointerInput);

    fn abort(&mut self, ctx: &mut OperationContext);

    fn is_operating(&self) -> bool;
}

/// State every editing gesture keeps between `start` and `end`.
#[derive(Debug, Default)]
pub(crate) struct Gesture {
    snapshot: Option<PartSnapshot>,
    pub press: Option<PointerInput>,
    pub changed: bool,
}

impl Gesture {
    pub fn begin(&mut self, part: &Part, input: &PointerInput) {
        self.snapshot = Some(part.snapshot());
        self.press = Some(*input);
        self.changed = false;
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.press.is_some()
    }

    pub fn snapshot(&self) -> Option<&PartSnapshot> {
        self.snapshot.as_ref()
    }

    /// Commits when the gesture changed data, then goes idle.
    pub fn finish(&mut self, part: &mut Part) {
        if self.changed {
            part.commit();
        }
        self.reset();
    }

    /// Restores the snapshot taken at `begin`, then goes idle.
    pub fn rollback(&mut self, part: &mut Part) {
        if let Some(snapshot) = self.snapshot.take() {
            part.restore(&snapshot);
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.snapshot = None;
        self.press = None;
        self.changed = false;
    }
}

/// Owns one operation per kind and a single active slot.
pub struct OperationRegistry {
    operations: Vec<Box<dyn Operation>>,
    active: Option<usize>,
    in_update: bool,
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("active", &self.active_kind())
            .finish()
    }
}

impl OperationRegistry {
    pub fn new() -> Self {
        let operations = OperationKind::all().iter().map(|&kind| fresh(kind)).collect();
        Self {
            operations,
            active: None,
            in_update: false,
        }
    }

    fn index_of(&self, kind: OperationKind) -> Option<usize> {
        self.operations.iter().position(|op| op.kind() == kind)
    }

    pub fn get(&self, kind: OperationKind) -> Option<&dyn Operation> {
        self.index_of(kind).map(|i| self.operations[i].as_ref())
    }

    pub fn active_kind(&self) -> Option<OperationKind> {
        self.active.map(|i| self.operations[i].kind())
    }

    #[inline]
    pub fn is_operating(&self) -> bool {
        self.active.is_some()
    }

    /// Hit-tests the press and starts the matching operation. Ignored while
    /// another operation runs.
    pub fn press(&mut self, ctx: &mut OperationContext, input: &PointerInput) -> Option<OperationKind> {
        if let Some(kind) = self.active_kind() {
            log::debug!("Press ignored, {:?} still operating", kind);
            return None;
        }
        let hit = hit_test(ctx.part, ctx.view, ctx.config, input)?;
        let index = self.index_of(hit.kind)?;
        if !self.operations[index].start(ctx, input, hit.target) {
            log::debug!("{:?} rejected target {:?}", hit.kind, hit.target);
            return None;
        }
        log::debug!("Operation {:?} started", hit.kind);
        self.active = Some(index);
        Some(hit.kind)
    }

    pub fn drag(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        let Some(index) = self.active else {
            return;
        };
        self.in_update = true;
        self.operations[index].update(ctx, input);
        self.in_update = false;
    }

    pub fn release(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        if self.in_update {
            log::warn!("Release during update ignored");
            return;
        }
        let Some(index) = self.active.take() else {
            return;
        };
        self.operations[index].end(ctx, input);
        log::debug!("Operation {:?} ended", self.operations[index].kind());
    }

    /// Rolls back the active operation, if any.
    pub fn abort(&mut self, ctx: &mut OperationContext) -> bool {
        if self.in_update {
            log::warn!("Abort during update ignored");
            return false;
        }
        let Some(index) = self.active.take() else {
            return false;
        };
        self.operations[index].abort(ctx);
        log::info!("Operation {:?} aborted", self.operations[index].kind());
        true
    }

    /// Drops the active operation without touching any part, for when the
    /// part it was editing has gone away.
    pub fn forget(&mut self) {
        if let Some(index) = self.active.take() {
            log::info!("Operation {:?} dropped", self.operations[index].kind());
            self.operations[index] = fresh(self.operations[index].kind());
        }
    }
}

fn fresh(kind: OperationKind) -> Box<dyn Operation> {
    match kind {
        OperationKind::Pan => Box::new(Pan::default()),
        OperationKind::NoteSelect => Box::new(NoteSelect::default()),
        OperationKind::NoteMove => Box::new(NoteMove::default()),
        OperationKind::NoteStartResize => Box::new(NoteResize::new(Edge::Start)),
        OperationKind::NoteEndResize => Box::new(NoteResize::new(Edge::End)),
        OperationKind::VibratoSelect => Box::new(VibratoSelect::default()),
        OperationKind::VibratoMove => Box::new(VibratoMove::default()),
        OperationKind::VibratoStartResize => Box::new(VibratoResize::new(Edge::Start)),
        OperationKind::VibratoEndResize => Box::new(VibratoResize::new(Edge::End)),
        OperationKind::VibratoAmplitude => Box::new(VibratoParameter::amplitude()),
        OperationKind::VibratoFrequency => Box::new(VibratoParameter::frequency()),
        OperationKind::VibratoPhase => Box::new(VibratoParameter::phase()),
        OperationKind::PitchDraw => Box::new(PitchDraw::default()),
        OperationKind::PitchClear => Box::new(PitchClear::default()),
        OperationKind::PitchLock => Box::new(PitchLock::default()),
        OperationKind::WaveformNoteResize => Box::new(WaveformNoteResize::default()),
        OperationKind::WaveformPhonemeResize => Box::new(WaveformPhonemeResize::default()),
        OperationKind::RangeSelect => Box::new(RangeSelect::default()),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::axis::{PitchAxis, TickAxis};
    use crate::model::Note;
    use crate::time_utils::TempoTrack;
    use egui::pos2;
    use std::sync::Arc;

    /// 0.25 px per tick and 10 px per key with pitch 72 at the top, so a note
    /// of pitch 60 spans y 110..120 and tick 480 sits at x 120.
    pub struct Fixture {
        pub part: Part,
        pub view: ViewState,
        pub selection: Selection,
        pub config: EditorConfig,
    }

    impl Fixture {
        pub fn new() -> Self {
            let _ = env_logger::builder().is_test(true).try_init();
            let config = EditorConfig::default();
            let mut view = ViewState::new(1000.0, 600.0, &config);
            view.tick_axis = TickAxis::new(0.0, 0.25, 1000.0);
            view.pitch_axis = PitchAxis::new(72.0, 10.0, 600.0);
            Self {
                part: Part::new("p", 0.0, 4000.0, Arc::new(TempoTrack::default())),
                view,
                selection: Selection::default(),
                config,
            }
        }

        pub fn with_notes(mut self, notes: &[(f64, f64, i32)]) -> Self {
            for &(pos, dur, pitch) in notes {
                self.part.insert_note(Note::new(pos, dur, pitch, "la"));
            }
            self
        }

        pub fn ctx(&mut self) -> OperationContext<'_> {
            OperationContext {
                part: &mut self.part,
                view: &mut self.view,
                selection: &mut self.selection,
                config: &self.config,
            }
        }
    }

    pub fn at(x: f32, y: f32) -> PointerInput {
        PointerInput::new(pos2(x, y), Modifiers::NONE, PointerButton::Primary)
    }

    pub fn with_mods(x: f32, y: f32, modifiers: Modifiers) -> PointerInput {
        PointerInput::new(pos2(x, y), modifiers, PointerButton::Primary)
    }
}
