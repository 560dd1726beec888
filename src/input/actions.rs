use serde::{Deserialize, Serialize};

/// Editing tools of the piano grid; exactly one is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PianoTool {
    #[default]
    Note,
    Vibrato,
    Pitch,
    Lock,
    Select,
}

impl PianoTool {
    pub fn all() -> &'static [PianoTool] {
        use PianoTool::*;
        &[Note, Vibrato, Pitch, Lock, Select]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Note => "Note",
            Self::Vibrato => "Vibrato",
            Self::Pitch => "Pitch",
            Self::Lock => "Pitch Lock",
            Self::Select => "Range Select",
        }
    }

    /// Whether the tool edits continuous parameter curves.
    #[inline]
    pub fn edits_parameters(&self) -> bool {
        matches!(self, Self::Pitch | Self::Lock)
    }
}

/// Keyboard-reachable editor commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EditCommand {
    Copy,
    Cut,
    Paste,
    Delete,
    SelectAll,
    TransposeUp,
    TransposeDown,
    OctaveUp,
    OctaveDown,
    Cancel,
    SelectTool(PianoTool),
}

impl EditCommand {
    /// Get all commands (for UI enumeration)
    pub fn all() -> &'static [EditCommand] {
        use EditCommand::*;
        &[
            Copy,
            Cut,
            Paste,
            Delete,
            SelectAll,
            TransposeUp,
            TransposeDown,
            OctaveUp,
            OctaveDown,
            Cancel,
            SelectTool(PianoTool::Note),
            SelectTool(PianoTool::Vibrato),
            SelectTool(PianoTool::Pitch),
            SelectTool(PianoTool::Lock),
            SelectTool(PianoTool::Select),
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Copy => "Copy",
            Self::Cut => "Cut",
            Self::Paste => "Paste",
            Self::Delete => "Delete",
            Self::SelectAll => "Select All",
            Self::TransposeUp => "Transpose Up",
            Self::TransposeDown => "Transpose Down",
            Self::OctaveUp => "Octave Up",
            Self::OctaveDown => "Octave Down",
            Self::Cancel => "Cancel",
            Self::SelectTool(tool) => tool.name(),
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::Copy | Self::Cut | Self::Paste | Self::Delete | Self::SelectAll => "Edit",
            Self::TransposeUp | Self::TransposeDown | Self::OctaveUp | Self::OctaveDown => "Pitch",
            Self::Cancel => "Other",
            Self::SelectTool(_) => "Tools",
        }
    }
}
