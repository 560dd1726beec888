use std::ops::{BitOr, BitOrAssign};

use egui::{Key, Modifiers};

use crate::clipboard::{Clipboards, NoteClipboard, ParameterClipboard, VibratoClipboard, contained};
use crate::config::EditorConfig;
use crate::input::{EditCommand, PianoTool, ShortcutRegistry};
use crate::messages::{PartEvent, Subscription, drain};
use crate::model::{Part, PartProvider};
use crate::operation::{OperationContext, OperationKind, OperationRegistry, PointerInput};
use crate::selection::Selection;
use crate::synthesis_status::time_range_affects_view;
use crate::time_utils::Tick;
use crate::view::ViewState;

/// Layers of the grid that need repainting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Invalidation(u8);

impl Invalidation {
    pub const NONE: Self = Self(0);
    pub const GRID: Self = Self(1);
    pub const NOTES: Self = Self(1 << 1);
    pub const PITCH: Self = Self(1 << 2);
    pub const WAVEFORM: Self = Self(1 << 3);
    pub const SELECTION: Self = Self(1 << 4);
    pub const SYNTHESIS: Self = Self(1 << 5);
    pub const ALL: Self = Self(0b11_1111);

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl BitOr for Invalidation {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Invalidation {
    fn bitor_assign(&mut self, rhs: Self) {
        self.insert(rhs);
    }
}

/// What an edit command touches, resolved once from the tool and the range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditScope {
    pub notes: bool,
    pub vibratos: bool,
    pub parameters: bool,
    /// Part-local range when a range selection is active.
    pub range: Option<(Tick, Tick)>,
}

impl EditScope {
    pub fn resolve(tool: PianoTool, selection: &Selection, part_pos: Tick) -> Self {
        let (notes, vibratos, parameters) = match tool {
            PianoTool::Note => (true, false, false),
            PianoTool::Vibrato => (false, true, false),
            PianoTool::Pitch | PianoTool::Lock => (false, false, true),
            PianoTool::Select => (true, true, true),
        };
        Self {
            notes,
            vibratos,
            parameters,
            range: selection.local_range(part_pos),
        }
    }
}

/// Receivers for everything the grid reacts to. Dropping this unsubscribes.
#[derive(Debug)]
pub struct Subscriptions {
    part_replaced: Subscription<()>,
    part_events: Subscription<PartEvent>,
    tick_axis: Subscription<()>,
    pitch_axis: Subscription<()>,
    quantization: Subscription<()>,
    tool: Subscription<PianoTool>,
    waveform_bottom: Subscription<()>,
}

#[derive(Debug, Default)]
struct Pending {
    replaced: bool,
    tool_changed: bool,
    part_events: Vec<PartEvent>,
    axes: bool,
    quantization: bool,
    waveform_bottom: bool,
}

fn fired<T>(rx: &Subscription<T>) -> bool {
    !drain(rx).0.is_empty()
}

impl Subscriptions {
    pub fn new(view: &ViewState, provider: &PartProvider) -> Self {
        Self {
            part_replaced: provider.object_changed.subscribe(),
            part_events: provider.part_events().subscribe(),
            tick_axis: view.tick_axis.changed.subscribe(),
            pitch_axis: view.pitch_axis.changed.subscribe(),
            quantization: view.quantization.changed.subscribe(),
            tool: view.tools.changed.subscribe(),
            waveform_bottom: view.waveform_bottom_changed.subscribe(),
        }
    }

    fn drain(&self) -> Pending {
        let (part_events, closed) = drain(&self.part_events);
        if closed {
            log::warn!("Part event source closed");
        }
        Pending {
            replaced: fired(&self.part_replaced),
            tool_changed: fired(&self.tool),
            part_events,
            axes: fired(&self.tick_axis) | fired(&self.pitch_axis),
            quantization: fired(&self.quantization),
            waveform_bottom: fired(&self.waveform_bottom),
        }
    }
}

/// The piano-roll editing core: routes pointer input to operations, runs
/// keyboard commands and turns model and view notifications into repaint
/// flags.
#[derive(Debug)]
pub struct PianoGrid {
    selection: Selection,
    clipboards: Clipboards,
    registry: OperationRegistry,
    subscriptions: Option<Subscriptions>,
    config: EditorConfig,
    invalidation: Invalidation,
}

impl Default for PianoGrid {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Drop for PianoGrid {
    fn drop(&mut self) {
        self.detach();
    }
}

impl PianoGrid {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            selection: Selection::default(),
            clipboards: Clipboards::default(),
            registry: OperationRegistry::new(),
            subscriptions: None,
            config,
            invalidation: Invalidation::ALL,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        self.invalidation.insert(Invalidation::SELECTION);
        &mut self.selection
    }

    pub fn clipboards(&self) -> &Clipboards {
        &self.clipboards
    }

    pub fn active_operation(&self) -> Option<OperationKind> {
        self.registry.active_kind()
    }

    #[inline]
    pub fn is_operating(&self) -> bool {
        self.registry.is_operating()
    }

    pub fn is_attached(&self) -> bool {
        self.subscriptions.is_some()
    }

    /// Subscribes to the view and to whichever part `provider` holds.
    pub fn attach(&mut self, view: &ViewState, provider: &PartProvider) {
        if self.subscriptions.is_some() {
            log::warn!("PianoGrid attached twice, replacing subscriptions");
        }
        self.subscriptions = Some(Subscriptions::new(view, provider));
        self.invalidation.insert(Invalidation::ALL);
        log::debug!("PianoGrid attached");
    }

    pub fn detach(&mut self) {
        if self.subscriptions.take().is_some() {
            log::debug!("PianoGrid detached");
        }
    }

    /// Handles every pending notification and returns the accumulated
    /// repaint flags, clearing them.
    pub fn poll(&mut self, view: &mut ViewState, mut part: Option<&mut Part>) -> Invalidation {
        let pending = self
            .subscriptions
            .as_ref()
            .map(Subscriptions::drain)
            .unwrap_or_default();

        if pending.replaced {
            // The old part is gone, so there is nothing to roll back into.
            self.registry.forget();
            self.selection.deactivate();
            self.invalidation.insert(Invalidation::ALL);
        } else if pending.tool_changed {
            match part.as_deref_mut() {
                Some(p) => {
                    self.cancel(p, view);
                }
                None => self.registry.forget(),
            }
        }
        if pending.tool_changed || pending.axes {
            self.invalidation.insert(Invalidation::ALL);
        }
        if pending.quantization {
            self.invalidation.insert(Invalidation::GRID);
        }
        if pending.waveform_bottom {
            self.invalidation.insert(Invalidation::WAVEFORM);
        }

        for event in pending.part_events {
            let flags = match event {
                PartEvent::Modified => Invalidation::NOTES | Invalidation::PITCH | Invalidation::WAVEFORM,
                PartEvent::PitchModified => Invalidation::PITCH,
                PartEvent::NoteSelectionChanged | PartEvent::VibratoSelectionChanged => {
                    Invalidation::NOTES | Invalidation::SELECTION
                }
                PartEvent::Committed => {
                    log::trace!("Part committed");
                    Invalidation::NONE
                }
                PartEvent::SynthesisStatusChanged { start_time, end_time } => match part.as_deref() {
                    Some(p) if time_range_affects_view(start_time, end_time, &view.tick_axis, p.tempo()) => {
                        Invalidation::SYNTHESIS | Invalidation::PITCH | Invalidation::WAVEFORM
                    }
                    _ => Invalidation::NONE,
                },
            };
            self.invalidation.insert(flags);
        }

        std::mem::take(&mut self.invalidation)
    }

    fn track_range(&mut self, before: Selection) {
        if self.selection != before {
            self.invalidation.insert(Invalidation::SELECTION);
        }
    }

    pub fn pointer_down(&mut self, part: &mut Part, view: &mut ViewState, input: &PointerInput) -> Option<OperationKind> {
        let before = self.selection;
        let mut ctx = OperationContext {
            part,
            view,
            selection: &mut self.selection,
            config: &self.config,
        };
        let kind = self.registry.press(&mut ctx, input);
        self.track_range(before);
        kind
    }

    pub fn pointer_move(&mut self, part: &mut Part, view: &mut ViewState, input: &PointerInput) {
        let before = self.selection;
        let mut ctx = OperationContext {
            part,
            view,
            selection: &mut self.selection,
            config: &self.config,
        };
        self.registry.drag(&mut ctx, input);
        self.track_range(before);
    }

    pub fn pointer_up(&mut self, part: &mut Part, view: &mut ViewState, input: &PointerInput) {
        let before = self.selection;
        let mut ctx = OperationContext {
            part,
            view,
            selection: &mut self.selection,
            config: &self.config,
        };
        self.registry.release(&mut ctx, input);
        self.track_range(before);
    }

    /// Aborts the running operation. Returns whether one was running.
    pub fn cancel(&mut self, part: &mut Part, view: &mut ViewState) -> bool {
        let before = self.selection;
        let mut ctx = OperationContext {
            part,
            view,
            selection: &mut self.selection,
            config: &self.config,
        };
        let aborted = self.registry.abort(&mut ctx);
        self.track_range(before);
        aborted
    }

    fn clear_range(&mut self) -> bool {
        if !self.selection.is_active() {
            return false;
        }
        self.selection.deactivate();
        self.invalidation.insert(Invalidation::SELECTION);
        true
    }

    /// Borrows the grid's edit state against `part` for clipboard and
    /// transpose commands.
    pub fn bind<'a>(&'a mut self, part: &'a mut Part, view: &'a ViewState) -> PartEditor<'a> {
        PartEditor {
            part,
            view,
            selection: &self.selection,
            clipboards: &mut self.clipboards,
            config: &self.config,
        }
    }

    /// Runs `command`. Data edits are refused while an operation is running
    /// or when no part is open. Returns whether anything happened.
    pub fn execute(&mut self, command: EditCommand, part: Option<&mut Part>, view: &mut ViewState) -> bool {
        match command {
            EditCommand::Cancel => {
                if !self.registry.is_operating() {
                    return self.clear_range();
                }
                match part {
                    Some(p) => self.cancel(p, view),
                    None => {
                        self.registry.forget();
                        true
                    }
                }
            }
            EditCommand::SelectTool(tool) => {
                if view.tools.get() == tool {
                    return false;
                }
                match part {
                    Some(p) => {
                        self.cancel(p, view);
                    }
                    None => self.registry.forget(),
                }
                view.tools.set(tool);
                true
            }
            _ => {
                let Some(part) = part else {
                    log::debug!("{} ignored, no part open", command.name());
                    return false;
                };
                if let Some(kind) = self.registry.active_kind() {
                    log::debug!("{} ignored while {:?} is running", command.name(), kind);
                    return false;
                }
                let mut editor = self.bind(part, view);
                match command {
                    EditCommand::Copy => editor.copy(),
                    EditCommand::Cut => editor.cut(),
                    EditCommand::Paste => editor.paste(),
                    EditCommand::Delete => editor.delete(),
                    EditCommand::SelectAll => editor.select_all(),
                    EditCommand::TransposeUp => editor.change_key(1),
                    EditCommand::TransposeDown => editor.change_key(-1),
                    EditCommand::OctaveUp => editor.octave_up(),
                    EditCommand::OctaveDown => editor.octave_down(),
                    EditCommand::Cancel | EditCommand::SelectTool(_) => false,
                }
            }
        }
    }

    /// Resolves a key press through `shortcuts` and executes the bound command.
    pub fn handle_key(
        &mut self,
        shortcuts: &ShortcutRegistry,
        key: Key,
        modifiers: Modifiers,
        part: Option<&mut Part>,
        view: &mut ViewState,
    ) -> bool {
        match shortcuts.resolve(key, modifiers) {
            Some(command) => self.execute(command, part, view),
            None => false,
        }
    }
}

/// Clipboard, delete and transpose commands against one part.
pub struct PartEditor<'a> {
    part: &'a mut Part,
    view: &'a ViewState,
    selection: &'a Selection,
    clipboards: &'a mut Clipboards,
    config: &'a EditorConfig,
}

impl PartEditor<'_> {
    pub fn scope(&self) -> EditScope {
        EditScope::resolve(self.view.tools.get(), self.selection, self.part.pos())
    }

    /// Fills the clipboards of the current tool. Always succeeds, even when
    /// that leaves them empty.
    pub fn copy(&mut self) -> bool {
        let scope = self.scope();
        self.copy_scope(&scope);
        true
    }

    fn copy_scope(&mut self, scope: &EditScope) {
        if scope.notes {
            self.clipboards.notes = NoteClipboard::copy(self.part, scope.range);
        }
        if scope.vibratos {
            self.clipboards.vibratos = VibratoClipboard::copy(self.part, scope.range);
        }
        if scope.parameters {
            self.clipboards.parameters = ParameterClipboard::copy(self.part, scope.range);
        }
        log::debug!(
            "Copied {} notes, {} vibratos, {} ticks of parameters",
            self.clipboards.notes.notes().len(),
            self.clipboards.vibratos.vibratos().len(),
            self.clipboards.parameters.duration()
        );
    }

    /// Copy followed by delete, committed as one step.
    pub fn cut(&mut self) -> bool {
        let scope = self.scope();
        self.copy_scope(&scope);
        self.remove_committed(&scope)
    }

    pub fn delete(&mut self) -> bool {
        let scope = self.scope();
        self.remove_committed(&scope)
    }

    fn remove_committed(&mut self, scope: &EditScope) -> bool {
        self.part.begin_merge_dirty();
        let changed = self.remove(scope);
        self.part.end_merge_dirty();
        if changed {
            self.part.commit();
        }
        changed
    }

    fn remove(&mut self, scope: &EditScope) -> bool {
        let mut changed = false;
        match scope.range {
            Some(range) => {
                if scope.notes {
                    changed |= self.part.remove_notes_where(|n| contained(n.pos, n.end_pos(), range)) > 0;
                }
                if scope.vibratos {
                    changed |= self.part.remove_vibratos_where(|v| contained(v.pos, v.end_pos(), range)) > 0;
                }
                if scope.parameters {
                    let before = (self.part.pitch().clone(), self.part.automations().clone());
                    self.part.clear_parameters(range.0, range.1);
                    changed |= before.0 != *self.part.pitch() || before.1 != *self.part.automations();
                }
            }
            None => {
                // Curves have no per-point selection, so only items go.
                if scope.notes {
                    changed |= self.part.remove_notes_where(|n| n.selected) > 0;
                }
                if scope.vibratos {
                    changed |= self.part.remove_vibratos_where(|v| v.selected) > 0;
                }
            }
        }
        changed
    }

    /// Pastes at the playhead, snapped to the grid.
    pub fn paste(&mut self) -> bool {
        let anchor = self.view.quantize(self.view.playhead, self.part.tempo()) - self.part.pos();
        self.paste_at(anchor)
    }

    /// Pastes the current tool's clipboards with their origin at the
    /// part-local `anchor`. Commits once when anything landed.
    pub fn paste_at(&mut self, anchor: Tick) -> bool {
        let scope = self.scope();
        self.part.begin_merge_dirty();
        let mut pasted = false;
        if scope.notes {
            pasted |= self.clipboards.notes.paste(self.part, anchor) > 0;
        }
        if scope.vibratos {
            pasted |= self.clipboards.vibratos.paste(self.part, anchor) > 0;
        }
        if scope.parameters {
            let blend = self.config.interaction.parameter_paste_blend;
            pasted |= self.clipboards.parameters.paste(self.part, anchor, blend);
        }
        self.part.end_merge_dirty();
        if pasted {
            self.part.commit();
            log::debug!("Pasted at {}", anchor);
        }
        pasted
    }

    pub fn can_paste(&self) -> bool {
        let scope = self.scope();
        (scope.notes && !self.clipboards.notes.is_empty())
            || (scope.vibratos && !self.clipboards.vibratos.is_empty())
            || (scope.parameters && !self.clipboards.parameters.is_empty())
    }

    /// Shifts the selected notes by `offset` semitones.
    pub fn change_key(&mut self, offset: i32) -> bool {
        if offset == 0 || !self.part.has_selected_notes() {
            return false;
        }
        self.part.begin_merge_dirty();
        self.part.with_notes(|notes| {
            for note in notes.iter_mut().filter(|n| n.selected) {
                note.pitch += offset;
            }
        });
        self.part.end_merge_dirty();
        self.part.commit();
        true
    }

    pub fn octave_up(&mut self) -> bool {
        self.change_key(12)
    }

    pub fn octave_down(&mut self) -> bool {
        self.change_key(-12)
    }

    pub fn select_all(&mut self) -> bool {
        match self.view.tools.get() {
            PianoTool::Note | PianoTool::Select if !self.part.notes().is_empty() => {
                self.part.select_notes(|_| true);
                true
            }
            PianoTool::Vibrato if !self.part.vibratos().is_empty() => {
                self.part.select_vibratos(|_| true);
                true
            }
            _ => false,
        }
    }
}
