pub mod actions;
pub mod shortcuts;

pub use actions::{EditCommand, PianoTool};
pub use shortcuts::{KeyCode, Keybind, ModifierSet, ShortcutRegistry};
