use std::collections::BTreeMap;
use std::sync::Arc;

use super::curve::{AutomationTrack, ParameterCurve, sample_run};
use super::note::{Note, Phoneme};
use super::synthesis::{SynthesisPiece, SynthesisResult, SynthesisStatus};
use super::vibrato::Vibrato;
use crate::constants::{VOLUME_AUTOMATION_ID, VOLUME_RANGE_DB};
use crate::messages::{Event, PartEvent};
use crate::time_utils::{db_to_level, TempoMap, Tick};

/// Maps a volume automation value in [-1, 1] to a linear gain factor.
///
/// 0 is unity, +1 is +12 dB and -1 is silence.
pub fn volume_to_level(volume: f64) -> f64 {
    if volume <= -1.0 {
        return 0.0;
    }
    db_to_level(volume.min(1.0) * VOLUME_RANGE_DB)
}

#[derive(Debug, Default, Clone, Copy)]
struct PendingEvents {
    modified: bool,
    pitch: bool,
    note_selection: bool,
    vibrato_selection: bool,
}

/// Rollback point for an interactive edit.
#[derive(Debug, Clone)]
pub struct PartSnapshot {
    pos: Tick,
    dur: Tick,
    notes: Vec<Note>,
    vibratos: Vec<Vibrato>,
    pitch: ParameterCurve,
    automations: BTreeMap<String, AutomationTrack>,
}

impl PartSnapshot {
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn vibratos(&self) -> &[Vibrato] {
        &self.vibratos
    }

    pub fn pitch(&self) -> &ParameterCurve {
        &self.pitch
    }
}

/// An editable region of notes, vibratos and parameter curves.
///
/// Child positions are local: the global tick of a note is `part.pos() + note.pos`.
pub struct Part {
    pub name: String,
    pos: Tick,
    dur: Tick,
    pub gain_db: f64,
    notes: Vec<Note>,
    vibratos: Vec<Vibrato>,
    pitch: ParameterCurve,
    automations: BTreeMap<String, AutomationTrack>,
    synthesis_pieces: Vec<SynthesisPiece>,
    tempo: Arc<dyn TempoMap>,
    events: Arc<Event<PartEvent>>,
    merge_depth: u32,
    pending: PendingEvents,
    commit_count: u64,
}

impl std::fmt::Debug for Part {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Part")
            .field("name", &self.name)
            .field("pos", &self.pos)
            .field("dur", &self.dur)
            .field("notes", &self.notes.len())
            .field("vibratos", &self.vibratos.len())
            .field("commit_count", &self.commit_count)
            .finish()
    }
}

impl Part {
    pub fn new(name: impl Into<String>, pos: Tick, dur: Tick, tempo: Arc<dyn TempoMap>) -> Self {
        let mut automations = BTreeMap::new();
        automations.insert(VOLUME_AUTOMATION_ID.to_string(), AutomationTrack::new(0.0));
        Self {
            name: name.into(),
            pos,
            dur,
            gain_db: 0.0,
            notes: Vec::new(),
            vibratos: Vec::new(),
            pitch: ParameterCurve::new(),
            automations,
            synthesis_pieces: Vec::new(),
            tempo,
            events: Arc::new(Event::new()),
            merge_depth: 0,
            pending: PendingEvents::default(),
            commit_count: 0,
        }
    }

    #[inline]
    pub fn pos(&self) -> Tick {
        self.pos
    }

    #[inline]
    pub fn dur(&self) -> Tick {
        self.dur
    }

    #[inline]
    pub fn end_pos(&self) -> Tick {
        self.pos + self.dur
    }

    pub fn set_pos(&mut self, pos: Tick) {
        if self.pos != pos {
            self.pos = pos;
            self.mark_modified();
        }
    }

    pub fn set_dur(&mut self, dur: Tick) {
        let dur = dur.max(0.0);
        if self.dur != dur {
            self.dur = dur;
            self.mark_modified();
        }
    }

    #[inline]
    pub fn tempo(&self) -> &dyn TempoMap {
        self.tempo.as_ref()
    }

    #[inline]
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    #[inline]
    pub fn vibratos(&self) -> &[Vibrato] {
        &self.vibratos
    }

    #[inline]
    pub fn pitch(&self) -> &ParameterCurve {
        &self.pitch
    }

    pub fn automations(&self) -> &BTreeMap<String, AutomationTrack> {
        &self.automations
    }

    pub fn automation(&self, id: &str) -> Option<&AutomationTrack> {
        self.automations.get(id)
    }

    pub fn synthesis_pieces(&self) -> &[SynthesisPiece] {
        &self.synthesis_pieces
    }

    pub fn events(&self) -> &Arc<Event<PartEvent>> {
        &self.events
    }

    pub(crate) fn rebind_events(&mut self, events: Arc<Event<PartEvent>>) {
        self.events = events;
    }

    pub fn commit_count(&self) -> u64 {
        self.commit_count
    }

    // ---- change tracking ----

    /// Marks the end of one undoable unit of change.
    pub fn commit(&mut self) {
        self.commit_count += 1;
        log::debug!("Part '{}' commit #{}", self.name, self.commit_count);
        self.events.emit(PartEvent::Committed);
    }

    pub fn begin_merge_dirty(&mut self) {
        self.merge_depth += 1;
    }

    /// Closes a merge block; the outermost one flushes each pending
    /// notification exactly once.
    pub fn end_merge_dirty(&mut self) {
        if self.merge_depth == 0 {
            log::warn!("end_merge_dirty without matching begin");
            return;
        }
        self.merge_depth -= 1;
        if self.merge_depth == 0 {
            let pending = std::mem::take(&mut self.pending);
            if pending.note_selection {
                self.events.emit(PartEvent::NoteSelectionChanged);
            }
            if pending.vibrato_selection {
                self.events.emit(PartEvent::VibratoSelectionChanged);
            }
            if pending.pitch {
                self.events.emit(PartEvent::PitchModified);
            }
            if pending.modified {
                self.events.emit(PartEvent::Modified);
            }
        }
    }

    fn mark_modified(&mut self) {
        if self.merge_depth > 0 {
            self.pending.modified = true;
        } else {
            self.events.emit(PartEvent::Modified);
        }
    }

    fn mark_pitch_modified(&mut self) {
        if self.merge_depth > 0 {
            self.pending.pitch = true;
            self.pending.modified = true;
        } else {
            self.events.emit(PartEvent::PitchModified);
            self.events.emit(PartEvent::Modified);
        }
    }

    fn mark_note_selection(&mut self) {
        if self.merge_depth > 0 {
            self.pending.note_selection = true;
        } else {
            self.events.emit(PartEvent::NoteSelectionChanged);
        }
    }

    fn mark_vibrato_selection(&mut self) {
        if self.merge_depth > 0 {
            self.pending.vibrato_selection = true;
        } else {
            self.events.emit(PartEvent::VibratoSelectionChanged);
        }
    }

    // ---- structural edits ----

    pub fn insert_note(&mut self, note: Note) {
        let at = self.notes.partition_point(|n| n.pos <= note.pos);
        self.notes.insert(at, note);
        self.mark_modified();
    }

    pub fn insert_vibrato(&mut self, vibrato: Vibrato) {
        let at = self.vibratos.partition_point(|v| v.pos <= vibrato.pos);
        self.vibratos.insert(at, vibrato);
        self.mark_modified();
    }

    /// Runs `f` over the notes, then restores position order.
    pub fn with_notes<R>(&mut self, f: impl FnOnce(&mut Vec<Note>) -> R) -> R {
        let out = f(&mut self.notes);
        self.notes.sort_by(|a, b| a.pos.total_cmp(&b.pos));
        self.mark_modified();
        out
    }

    pub fn with_vibratos<R>(&mut self, f: impl FnOnce(&mut Vec<Vibrato>) -> R) -> R {
        let out = f(&mut self.vibratos);
        self.vibratos.sort_by(|a, b| a.pos.total_cmp(&b.pos));
        self.mark_modified();
        out
    }

    pub fn with_pitch<R>(&mut self, f: impl FnOnce(&mut ParameterCurve) -> R) -> R {
        let out = f(&mut self.pitch);
        self.mark_pitch_modified();
        out
    }

    /// Edits the automation `id`, creating it with a zero default if absent.
    pub fn with_automation<R>(&mut self, id: &str, f: impl FnOnce(&mut AutomationTrack) -> R) -> R {
        let track = self
            .automations
            .entry(id.to_string())
            .or_insert_with(|| AutomationTrack::new(0.0));
        let out = f(track);
        self.mark_modified();
        out
    }

    pub fn remove_notes_where(&mut self, pred: impl Fn(&Note) -> bool) -> usize {
        let before = self.notes.len();
        self.notes.retain(|n| !pred(n));
        let removed = before - self.notes.len();
        if removed > 0 {
            self.mark_modified();
        }
        removed
    }

    pub fn remove_vibratos_where(&mut self, pred: impl Fn(&Vibrato) -> bool) -> usize {
        let before = self.vibratos.len();
        self.vibratos.retain(|v| !pred(v));
        let removed = before - self.vibratos.len();
        if removed > 0 {
            self.mark_modified();
        }
        removed
    }

    /// Clears pitch and every automation strictly inside the local range.
    pub fn clear_parameters(&mut self, start: Tick, end: Tick) {
        self.pitch.clear(start, end);
        for track in self.automations.values_mut() {
            track.curve.clear(start, end);
        }
        self.mark_pitch_modified();
    }

    // ---- per-item selection ----

    /// Sets each note's selection flag to `f(note)`; notifies only on change.
    pub fn select_notes(&mut self, f: impl Fn(&Note) -> bool) {
        let mut changed = false;
        for note in &mut self.notes {
            let sel = f(note);
            if note.selected != sel {
                note.selected = sel;
                changed = true;
            }
        }
        if changed {
            self.mark_note_selection();
        }
    }

    pub fn select_vibratos(&mut self, f: impl Fn(&Vibrato) -> bool) {
        let mut changed = false;
        for vibrato in &mut self.vibratos {
            let sel = f(vibrato);
            if vibrato.selected != sel {
                vibrato.selected = sel;
                changed = true;
            }
        }
        if changed {
            self.mark_vibrato_selection();
        }
    }

    pub fn has_selected_notes(&self) -> bool {
        self.notes.iter().any(|n| n.selected)
    }

    pub fn has_selected_vibratos(&self) -> bool {
        self.vibratos.iter().any(|v| v.selected)
    }

    // ---- rollback ----

    pub fn snapshot(&self) -> PartSnapshot {
        PartSnapshot {
            pos: self.pos,
            dur: self.dur,
            notes: self.notes.clone(),
            vibratos: self.vibratos.clone(),
            pitch: self.pitch.clone(),
            automations: self.automations.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: &PartSnapshot) {
        self.begin_merge_dirty();
        self.pos = snapshot.pos;
        self.dur = snapshot.dur;
        self.notes = snapshot.notes.clone();
        self.vibratos = snapshot.vibratos.clone();
        self.pitch = snapshot.pitch.clone();
        self.automations = snapshot.automations.clone();
        self.pending = PendingEvents {
            modified: true,
            pitch: true,
            note_selection: true,
            vibrato_selection: true,
        };
        self.end_merge_dirty();
    }

    // ---- synthesis ----

    pub fn set_synthesis_pieces(&mut self, pieces: Vec<SynthesisPiece>) {
        let (start, end) = pieces.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |acc, p| {
            (acc.0.min(p.start_time), acc.1.max(p.end_time))
        });
        self.synthesis_pieces = pieces;
        if start <= end {
            self.events.emit(PartEvent::SynthesisStatusChanged {
                start_time: start,
                end_time: end,
            });
        }
    }

    /// Updates one piece's status and result as reported by the backend.
    pub fn update_synthesis_piece(
        &mut self,
        index: usize,
        status: SynthesisStatus,
        result: Option<SynthesisResult>,
    ) {
        let Some(piece) = self.synthesis_pieces.get_mut(index) else {
            log::warn!("Synthesis update for unknown piece {}", index);
            return;
        };
        piece.status = status;
        if result.is_some() || status != SynthesisStatus::SynthesisSucceeded {
            piece.result = result;
        }
        let (start_time, end_time) = (piece.start_time, piece.end_time);
        self.events.emit(PartEvent::SynthesisStatusChanged {
            start_time,
            end_time,
        });
    }

    pub fn set_synthesized_phonemes(&mut self, note_id: u64, phonemes: Option<Vec<Phoneme>>) {
        if let Some(note) = self.notes.iter_mut().find(|n| n.id == note_id) {
            note.synthesized_phonemes = phonemes;
        }
    }

    // ---- sampling ----

    /// Pitch before vibrato: the drawn curve where defined, else the pitch of
    /// the note covering the tick, else NaN. Ticks are local.
    pub fn base_pitch(&self, ticks: &[Tick]) -> Vec<f64> {
        self.base_pitch_over(&self.pitch, ticks)
    }

    /// Base pitch with vibrato applied.
    pub fn final_pitch(&self, ticks: &[Tick]) -> Vec<f64> {
        let mut values = self.base_pitch(ticks);
        if self.vibratos.is_empty() {
            return values;
        }
        for (value, &t) in values.iter_mut().zip(ticks) {
            if value.is_nan() {
                continue;
            }
            for vibrato in self.vibratos.iter().filter(|v| v.contains(t)) {
                let elapsed =
                    self.tempo.time_at(self.pos + t) - self.tempo.time_at(self.pos + vibrato.pos);
                *value += vibrato.offset(t, elapsed);
            }
        }
        values
    }

    /// [`base_pitch`](Self::base_pitch) with `pitch` standing in for the
    /// part's own curve, e.g. the curve of a snapshot.
    pub fn base_pitch_over(&self, pitch: &ParameterCurve, ticks: &[Tick]) -> Vec<f64> {
        ticks
            .iter()
            .map(|&t| {
                let v = pitch.value_at(t);
                if !v.is_nan() {
                    return v;
                }
                self.note_at(t).map_or(f64::NAN, |n| n.pitch as f64)
            })
            .collect()
    }

    /// Pitch reported by the synthesis backend at local ticks; NaN where no
    /// result covers the tick.
    pub fn synthesized_pitch(&self, ticks: &[Tick]) -> Vec<f64> {
        ticks
            .iter()
            .map(|&t| {
                let time = self.tempo.time_at(self.pos + t);
                self.synthesis_pieces
                    .iter()
                    .filter_map(|piece| piece.result.as_ref())
                    .flat_map(|result| result.pitch.iter())
                    .map(|run| sample_run(run, time))
                    .find(|v| !v.is_nan())
                    .unwrap_or(f64::NAN)
            })
            .collect()
    }

    /// Automation values at local ticks, falling back to the track default.
    pub fn automation_values(&self, id: &str, ticks: &[Tick]) -> Vec<f64> {
        match self.automations.get(id) {
            Some(track) => track.values(ticks),
            None => vec![0.0; ticks.len()],
        }
    }

    pub fn note_at(&self, tick: Tick) -> Option<&Note> {
        let idx = self.notes.partition_point(|n| n.pos <= tick);
        self.notes[..idx].iter().rev().find(|n| n.contains(tick))
    }

    pub fn note_index(&self, id: u64) -> Option<usize> {
        self.notes.iter().position(|n| n.id == id)
    }

    pub fn vibrato_index(&self, id: u64) -> Option<usize> {
        self.vibratos.iter().position(|v| v.id == id)
    }
}
