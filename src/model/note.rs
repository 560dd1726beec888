use serde::{Deserialize, Serialize};

use crate::idgen;
use crate::time_utils::Tick;

/// A phoneme span in seconds, relative to the start time of its note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phoneme {
    pub symbol: String,
    pub start_time: f64,
    pub end_time: f64,
}

impl Phoneme {
    pub fn new(symbol: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            symbol: symbol.into(),
            start_time,
            end_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: u64,
    /// Part-local start tick.
    pub pos: Tick,
    pub dur: Tick,
    pub pitch: i32,
    pub lyric: String,
    #[serde(skip)]
    pub selected: bool,
    /// Phonemes entered by the user; they take precedence over synthesized ones.
    #[serde(default)]
    pub phonemes: Vec<Phoneme>,
    /// Phoneme timing reported by the synthesis backend, read-only here.
    #[serde(skip)]
    pub synthesized_phonemes: Option<Vec<Phoneme>>,
}

impl Note {
    pub fn new(pos: Tick, dur: Tick, pitch: i32, lyric: impl Into<String>) -> Self {
        Self {
            id: idgen::next(),
            pos,
            dur,
            pitch,
            lyric: lyric.into(),
            selected: false,
            phonemes: Vec::new(),
            synthesized_phonemes: None,
        }
    }

    #[inline]
    pub fn end_pos(&self) -> Tick {
        self.pos + self.dur
    }

    #[inline]
    pub fn contains(&self, tick: Tick) -> bool {
        tick >= self.pos && tick < self.end_pos()
    }

    /// Phonemes to show for this note, authored first.
    pub fn effective_phonemes(&self) -> Option<&[Phoneme]> {
        if !self.phonemes.is_empty() {
            return Some(&self.phonemes);
        }
        self.synthesized_phonemes
            .as_deref()
            .filter(|p| !p.is_empty())
    }

    /// Copy with a fresh id and no selection, used by paste and duplication.
    pub fn duplicate(&self) -> Self {
        Self {
            id: idgen::next(),
            selected: false,
            synthesized_phonemes: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authored_phonemes_win() {
        let mut note = Note::new(0.0, 480.0, 60, "la");
        assert!(note.effective_phonemes().is_none());

        note.synthesized_phonemes = Some(vec![Phoneme::new("l", -0.05, 0.0)]);
        assert_eq!(note.effective_phonemes().unwrap()[0].symbol, "l");

        note.phonemes = vec![Phoneme::new("a", 0.0, 0.2)];
        assert_eq!(note.effective_phonemes().unwrap()[0].symbol, "a");
    }

    #[test]
    fn duplicate_gets_new_identity() {
        let mut note = Note::new(0.0, 480.0, 60, "la");
        note.selected = true;
        let copy = note.duplicate();
        assert_ne!(copy.id, note.id);
        assert!(!copy.selected);
        assert_eq!(copy.pitch, 60);
    }
}
