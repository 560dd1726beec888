use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::*;
use crate::paths::config_path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub grid: GridConfig,
    pub interaction: InteractionConfig,
    pub view: ViewConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Narrowest cell, in pixels, that the grid will still subdivide to.
    pub min_grid_gap: f32,
    /// Cell width at which grid lines reach full opacity.
    pub min_reality_grid_gap: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub edge_threshold: f32,
    pub vibrato_handle_radius: f32,
    pub waveform_handle_threshold: f32,
    /// Ticks over which pasted parameter data cross-fades into the existing curve.
    pub parameter_paste_blend: f64,
    pub pitch_draw_step: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub waveform_height: f32,
    pub pitch_fade: (f64, f64),
    pub phoneme_fade: (f64, f64),
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            interaction: InteractionConfig::default(),
            view: ViewConfig::default(),
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            min_grid_gap: MIN_GRID_GAP,
            min_reality_grid_gap: MIN_REALITY_GRID_GAP,
        }
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            edge_threshold: NOTE_EDGE_THRESHOLD,
            vibrato_handle_radius: VIBRATO_HANDLE_RADIUS,
            waveform_handle_threshold: WAVEFORM_HANDLE_THRESHOLD,
            parameter_paste_blend: PARAMETER_PASTE_BLEND,
            pitch_draw_step: PITCH_DRAW_STEP,
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            waveform_height: WAVEFORM_HEIGHT,
            pitch_fade: (PITCH_FADE_START, PITCH_FADE_END),
            phoneme_fade: (PHONEME_FADE_START, PHONEME_FADE_END),
        }
    }
}

impl EditorConfig {
    /// Loads the user config, falling back to defaults when it is missing or unreadable.
    pub fn load() -> Self {
        let path = config_path();
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring malformed config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config.sanitized())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn sanitized(mut self) -> Self {
        if self.grid.min_grid_gap <= 0.0 {
            log::warn!("min_grid_gap must be positive, using default");
            self.grid.min_grid_gap = MIN_GRID_GAP;
        }
        if self.grid.min_reality_grid_gap <= self.grid.min_grid_gap {
            self.grid.min_reality_grid_gap = self.grid.min_grid_gap * 2.0;
        }
        self.interaction.parameter_paste_blend = self.interaction.parameter_paste_blend.max(0.0);
        if self.interaction.pitch_draw_step <= 0.0 {
            self.interaction.pitch_draw_step = PITCH_DRAW_STEP;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("pianogrid-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn save_then_load_preserves_values() {
        let path = temp_file("config_roundtrip.json");
        let mut config = EditorConfig::default();
        config.interaction.parameter_paste_blend = 10.0;
        config.view.waveform_height = 80.0;
        config.save_to(&path).unwrap();

        let loaded = EditorConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let path = temp_file("config_partial.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{ "grid": { "min_grid_gap": 16.0 } }"#).unwrap();

        let loaded = EditorConfig::load_from(&path).unwrap();
        assert_eq!(loaded.grid.min_grid_gap, 16.0);
        assert_eq!(loaded.grid.min_reality_grid_gap, MIN_REALITY_GRID_GAP);
        assert_eq!(loaded.view.waveform_height, WAVEFORM_HEIGHT);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let path = temp_file("config_bad.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        assert!(EditorConfig::load_from(&path).is_err());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn nonsense_gaps_are_repaired() {
        let path = temp_file("config_gaps.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{ "grid": { "min_grid_gap": -1.0, "min_reality_grid_gap": 0.0 } }"#,
        )
        .unwrap();

        let loaded = EditorConfig::load_from(&path).unwrap();
        assert_eq!(loaded.grid.min_grid_gap, MIN_GRID_GAP);
        assert!(loaded.grid.min_reality_grid_gap > loaded.grid.min_grid_gap);
        let _ = std::fs::remove_file(&path);
    }
}
