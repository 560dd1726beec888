use crate::axis::{PitchAxis, TickAxis};
use crate::config::EditorConfig;
use crate::constants::WAVEFORM_HEIGHT;
use crate::messages::{Event, ToolState};
use crate::quantization::Quantization;
use crate::time_utils::{TempoMap, Tick};

/// View-side collaborators the piano grid reads and subscribes to.
#[derive(Debug)]
pub struct ViewState {
    pub tick_axis: TickAxis,
    pub pitch_axis: PitchAxis,
    pub quantization: Quantization,
    pub tools: ToolState,
    /// Global tick of the playhead; plain paste lands here.
    pub playhead: Tick,
    waveform_bottom: f64,
    waveform_height: f64,
    pub waveform_bottom_changed: Event<()>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            tick_axis: TickAxis::default(),
            pitch_axis: PitchAxis::default(),
            quantization: Quantization::default(),
            tools: ToolState::default(),
            playhead: 0.0,
            waveform_bottom: 0.0,
            waveform_height: WAVEFORM_HEIGHT as f64,
            waveform_bottom_changed: Event::new(),
        }
    }
}

impl ViewState {
    /// A view sized `width` x `height` using the grid and strip settings of `config`.
    pub fn new(width: f64, height: f64, config: &EditorConfig) -> Self {
        let mut view = Self::default();
        view.quantization.set_gaps(config.grid.clone());
        view.waveform_height = config.view.waveform_height as f64;
        view.set_size(width, height);
        view
    }

    /// Resizes both axes. The waveform strip stays docked to the bottom edge.
    pub fn set_size(&mut self, width: f64, height: f64) {
        self.tick_axis.set_width(width);
        self.pitch_axis.set_height(height);
        self.set_waveform_bottom(height);
    }

    #[inline]
    pub fn waveform_bottom(&self) -> f64 {
        self.waveform_bottom
    }

    #[inline]
    pub fn waveform_height(&self) -> f64 {
        self.waveform_height
    }

    #[inline]
    pub fn waveform_top(&self) -> f64 {
        self.waveform_bottom - self.waveform_height
    }

    pub fn set_waveform_bottom(&mut self, bottom: f64) {
        if self.waveform_bottom != bottom {
            self.waveform_bottom = bottom;
            self.waveform_bottom_changed.emit(());
        }
    }

    /// Snaps a global tick to the current grid.
    #[inline]
    pub fn quantize(&self, tick: Tick, tempo: &dyn TempoMap) -> Tick {
        self.quantization.quantize(tick, &self.tick_axis, tempo)
    }

    /// Effective grid cell at `tick`, used as the minimum length of resized items.
    #[inline]
    pub fn cell_ticks_at(&self, tick: Tick, tempo: &dyn TempoMap) -> Tick {
        self.quantization.cell_ticks_at(tick, &self.tick_axis, tempo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::drain;

    #[test]
    fn strip_follows_the_bottom_edge() {
        let mut view = ViewState::new(800.0, 600.0, &EditorConfig::default());
        assert_eq!(view.waveform_bottom(), 600.0);
        assert_eq!(view.waveform_top(), 600.0 - WAVEFORM_HEIGHT as f64);

        let rx = view.waveform_bottom_changed.subscribe();
        view.set_size(800.0, 600.0);
        view.set_size(800.0, 500.0);
        assert_eq!(drain(&rx).0.len(), 1);
        assert_eq!(view.tick_axis.width(), 800.0);
        assert_eq!(view.pitch_axis.height(), 500.0);
    }
}
