use super::actions::{EditCommand, PianoTool};
use egui::{Key, KeyboardShortcut, Modifiers};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single keybind (modifier + key)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Keybind {
    pub modifiers: ModifierSet,
    pub key: KeyCode,
}

/// Serializable modifier flags. `command` is Cmd on macOS and Ctrl elsewhere;
/// `ctrl` only ever means the macOS Control key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModifierSet {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub command: bool,
}

impl From<Modifiers> for ModifierSet {
    fn from(m: Modifiers) -> Self {
        Self {
            ctrl: m.ctrl && !m.command,
            shift: m.shift,
            alt: m.alt,
            command: m.command,
        }
    }
}

impl From<ModifierSet> for Modifiers {
    fn from(m: ModifierSet) -> Self {
        let mut mods = Modifiers::NONE;
        if m.command {
            mods = mods | Modifiers::COMMAND;
        }
        if m.ctrl {
            mods = mods | Modifiers::CTRL;
        }
        if m.shift {
            mods = mods | Modifiers::SHIFT;
        }
        if m.alt {
            mods = mods | Modifiers::ALT;
        }
        mods
    }
}

/// Serializable key enum (the subset of egui::Key the editor binds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    A,
    C,
    V,
    X,
    Num1,
    Num2,
    Num3,
    Num4,
    Num5,
    Delete,
    Backspace,
    Escape,
    ArrowUp,
    ArrowDown,
}

const KEY_TABLE: &[(KeyCode, Key)] = &[
    (KeyCode::A, Key::A),
    (KeyCode::C, Key::C),
    (KeyCode::V, Key::V),
    (KeyCode::X, Key::X),
    (KeyCode::Num1, Key::Num1),
    (KeyCode::Num2, Key::Num2),
    (KeyCode::Num3, Key::Num3),
    (KeyCode::Num4, Key::Num4),
    (KeyCode::Num5, Key::Num5),
    (KeyCode::Delete, Key::Delete),
    (KeyCode::Backspace, Key::Backspace),
    (KeyCode::Escape, Key::Escape),
    (KeyCode::ArrowUp, Key::ArrowUp),
    (KeyCode::ArrowDown, Key::ArrowDown),
];

impl From<KeyCode> for Key {
    fn from(code: KeyCode) -> Key {
        KEY_TABLE
            .iter()
            .find(|(c, _)| *c == code)
            .map(|&(_, k)| k)
            .unwrap_or(Key::Escape)
    }
}

impl TryFrom<Key> for KeyCode {
    type Error = ();
    fn try_from(key: Key) -> Result<Self, ()> {
        KEY_TABLE
            .iter()
            .find(|(_, k)| *k == key)
            .map(|&(c, _)| c)
            .ok_or(())
    }
}

impl Keybind {
    pub fn none(key: KeyCode) -> Self {
        Self {
            modifiers: ModifierSet::default(),
            key,
        }
    }

    pub fn cmd(key: KeyCode) -> Self {
        Self {
            modifiers: ModifierSet {
                command: true,
                ..Default::default()
            },
            key,
        }
    }

    pub fn shift(key: KeyCode) -> Self {
        Self {
            modifiers: ModifierSet {
                shift: true,
                ..Default::default()
            },
            key,
        }
    }

    pub fn to_egui(&self) -> KeyboardShortcut {
        KeyboardShortcut::new(self.modifiers.into(), self.key.into())
    }
}

impl std::fmt::Display for Keybind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cmd_key = if cfg!(target_os = "macos") { "Cmd" } else { "Ctrl" };
        if self.modifiers.command {
            write!(f, "{}+", cmd_key)?;
        }
        if self.modifiers.ctrl {
            write!(f, "Ctrl+")?;
        }
        if self.modifiers.shift {
            write!(f, "Shift+")?;
        }
        if self.modifiers.alt {
            write!(f, "Alt+")?;
        }
        write!(f, "{:?}", self.key)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BindingEntry {
    command: EditCommand,
    keys: Vec<Keybind>,
}

/// Central shortcut registry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<BindingEntry>", into = "Vec<BindingEntry>")]
pub struct ShortcutRegistry {
    /// Command -> keybinds (several binds per command allowed)
    bindings: HashMap<EditCommand, Vec<Keybind>>,
    keybind_to_command: HashMap<Keybind, EditCommand>,
}

impl From<Vec<BindingEntry>> for ShortcutRegistry {
    fn from(entries: Vec<BindingEntry>) -> Self {
        let mut reg = Self::empty();
        for entry in entries {
            for key in entry.keys {
                reg.bind(entry.command, key);
            }
        }
        reg
    }
}

impl From<ShortcutRegistry> for Vec<BindingEntry> {
    fn from(reg: ShortcutRegistry) -> Self {
        EditCommand::all()
            .iter()
            .filter_map(|cmd| {
                reg.bindings.get(cmd).map(|keys| BindingEntry {
                    command: *cmd,
                    keys: keys.clone(),
                })
            })
            .collect()
    }
}

impl Default for ShortcutRegistry {
    fn default() -> Self {
        Self::default_bindings()
    }
}

impl ShortcutRegistry {
    fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
            keybind_to_command: HashMap::new(),
        }
    }

    /// Load default keybinds
    pub fn default_bindings() -> Self {
        let mut reg = Self::empty();

        use EditCommand::*;
        use KeyCode::*;

        reg.bind(Copy, Keybind::cmd(C));
        reg.bind(Cut, Keybind::cmd(X));
        reg.bind(Paste, Keybind::cmd(V));
        reg.bind(SelectAll, Keybind::cmd(A));
        reg.bind(EditCommand::Delete, Keybind::none(KeyCode::Delete));
        reg.bind(EditCommand::Delete, Keybind::none(Backspace));

        reg.bind(TransposeUp, Keybind::none(ArrowUp));
        reg.bind(TransposeDown, Keybind::none(ArrowDown));
        reg.bind(OctaveUp, Keybind::shift(ArrowUp));
        reg.bind(OctaveDown, Keybind::shift(ArrowDown));

        reg.bind(Cancel, Keybind::none(Escape));

        reg.bind(SelectTool(PianoTool::Note), Keybind::none(Num1));
        reg.bind(SelectTool(PianoTool::Vibrato), Keybind::none(Num2));
        reg.bind(SelectTool(PianoTool::Pitch), Keybind::none(Num3));
        reg.bind(SelectTool(PianoTool::Lock), Keybind::none(Num4));
        reg.bind(SelectTool(PianoTool::Select), Keybind::none(Num5));

        reg
    }

    /// Add a binding. A keybind maps to one command; rebinding moves it.
    pub fn bind(&mut self, command: EditCommand, keybind: Keybind) {
        self.unbind(&keybind);
        self.bindings.entry(command).or_default().push(keybind);
        self.keybind_to_command.insert(keybind, command);
    }

    pub fn unbind(&mut self, keybind: &Keybind) {
        if self.keybind_to_command.remove(keybind).is_some() {
            for binds in self.bindings.values_mut() {
                binds.retain(|b| b != keybind);
            }
        }
    }

    pub fn get_bindings(&self, command: EditCommand) -> &[Keybind] {
        self.bindings
            .get(&command)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn get_command(&self, keybind: &Keybind) -> Option<EditCommand> {
        self.keybind_to_command.get(keybind).copied()
    }

    /// Command already using `keybind`, other than `exclude`.
    pub fn has_conflict(
        &self,
        keybind: &Keybind,
        exclude: Option<EditCommand>,
    ) -> Option<EditCommand> {
        self.get_command(keybind)
            .filter(|&c| exclude.is_none_or(|ex| ex != c))
    }

    /// Resolve a key press delivered by the windowing layer.
    pub fn resolve(&self, key: Key, modifiers: Modifiers) -> Option<EditCommand> {
        let key = KeyCode::try_from(key).ok()?;
        self.get_command(&Keybind {
            modifiers: modifiers.into(),
            key,
        })
    }

    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
