use serde::{Deserialize, Serialize};

use crate::constants::{VIBRATO_ATTACK_TICKS, VIBRATO_RELEASE_TICKS};
use crate::idgen;
use crate::time_utils::Tick;

pub const DEFAULT_VIBRATO_AMPLITUDE: f64 = 0.5;
pub const DEFAULT_VIBRATO_FREQUENCY: f64 = 5.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vibrato {
    pub id: u64,
    pub pos: Tick,
    pub dur: Tick,
    /// Peak deviation in semitones.
    pub amplitude: f64,
    /// Hz.
    pub frequency: f64,
    /// Fraction of a cycle, 0..1.
    pub phase: f64,
    #[serde(skip)]
    pub selected: bool,
}

impl Vibrato {
    pub fn new(pos: Tick, dur: Tick) -> Self {
        Self {
            id: idgen::next(),
            pos,
            dur,
            amplitude: DEFAULT_VIBRATO_AMPLITUDE,
            frequency: DEFAULT_VIBRATO_FREQUENCY,
            phase: 0.0,
            selected: false,
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

    /// Amplitude scale at `tick`, ramping in and out at the span edges.
    pub fn envelope(&self, tick: Tick) -> f64 {
        if !self.contains(tick) {
            return 0.0;
        }
        let attack = VIBRATO_ATTACK_TICKS.min(self.dur / 2.0);
        let release = VIBRATO_RELEASE_TICKS.min(self.dur / 2.0);
        let from_start = tick - self.pos;
        let to_end = self.end_pos() - tick;
        let mut scale = 1.0_f64;
        if attack > 0.0 {
            scale = scale.min(from_start / attack);
        }
        if release > 0.0 {
            scale = scale.min(to_end / release);
        }
        scale.clamp(0.0, 1.0)
    }

    /// Pitch deviation in semitones, `elapsed` seconds after the vibrato start.
    pub fn offset(&self, tick: Tick, elapsed: f64) -> f64 {
        let angle = std::f64::consts::TAU * (self.frequency * elapsed + self.phase);
        self.amplitude * self.envelope(tick) * angle.sin()
    }

    pub fn duplicate(&self) -> Self {
        Self {
            id: idgen::next(),
            selected: false,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_is_zero_outside_and_full_in_middle() {
        let v = Vibrato::new(0.0, 960.0);
        assert_eq!(v.envelope(-1.0), 0.0);
        assert_eq!(v.envelope(960.0), 0.0);
        assert_eq!(v.envelope(480.0), 1.0);
        assert!((v.envelope(30.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn quarter_cycle_phase_peaks_at_start_of_plateau() {
        let mut v = Vibrato::new(0.0, 960.0);
        v.phase = 0.25;
        assert!((v.offset(480.0, 0.0) - v.amplitude).abs() < 1e-12);
    }
}
