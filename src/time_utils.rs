use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BPM, DEFAULT_DENOMINATOR, DEFAULT_NUMERATOR, RESOLUTION};
use crate::error::{EditorError, Result};

/// Musical time. Linear within a part, `RESOLUTION` ticks per quarter note.
pub type Tick = f64;

/// Converter between musical ticks and wall-clock seconds, plus the meter layout.
///
/// Hosts normally hand in their own project-wide map; [`TempoTrack`] is a
/// self-contained implementation for hosts without one.
pub trait TempoMap: Send + Sync {
    fn time_at(&self, tick: Tick) -> f64;
    fn tick_at(&self, time: f64) -> Tick;
    fn meter_status(&self, tick: Tick) -> MeterStatus;
    fn time_signatures(&self) -> &[TimeSignature];

    /// The time signature in force at `tick`.
    fn time_signature_at(&self, tick: Tick) -> TimeSignature {
        let status = self.meter_status(tick);
        self.time_signatures()
            .get(status.time_signature_index)
            .copied()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterStatus {
    pub time_signature_index: usize,
    /// Fractional bar position; the integer part is the bar number.
    pub bar_index: f64,
}

impl MeterStatus {
    #[inline]
    pub fn bar(&self) -> i64 {
        self.bar_index.floor() as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub bar_index: i64,
    pub numerator: u32,
    pub denominator: u32,
    /// Tick at which this signature's first bar starts.
    pub pos: Tick,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            bar_index: 0,
            numerator: DEFAULT_NUMERATOR,
            denominator: DEFAULT_DENOMINATOR,
            pos: 0.0,
        }
    }
}

impl TimeSignature {
    pub fn new(bar_index: i64, numerator: u32, denominator: u32, pos: Tick) -> Result<Self> {
        if numerator == 0 {
            return Err(EditorError::InvalidTimeSignature(format!(
                "numerator must be positive, got {}",
                numerator
            )));
        }
        if denominator == 0 || !denominator.is_power_of_two() || denominator > 32 {
            return Err(EditorError::InvalidTimeSignature(format!(
                "denominator must be a power of two up to 32, got {}",
                denominator
            )));
        }
        Ok(Self {
            bar_index,
            numerator,
            denominator,
            pos,
        })
    }

    #[inline]
    pub fn ticks_per_beat(&self) -> f64 {
        RESOLUTION * 4.0 / self.denominator as f64
    }

    #[inline]
    pub fn ticks_per_bar(&self) -> f64 {
        self.ticks_per_beat() * self.numerator as f64
    }

    #[inline]
    pub fn tick_by_bar_index(&self, bar_index: f64) -> Tick {
        self.pos + (bar_index - self.bar_index as f64) * self.ticks_per_bar()
    }

    #[inline]
    pub fn tick_by_bar_and_beat(&self, bar_index: i64, beat: f64) -> Tick {
        self.tick_by_bar_index(bar_index as f64) + beat * self.ticks_per_beat()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tempo {
    pub pos: Tick,
    pub bpm: f64,
}

#[derive(Debug, Clone, Copy)]
struct TempoSegment {
    pos: Tick,
    bpm: f64,
    /// Seconds at `pos`.
    time: f64,
}

impl TempoSegment {
    #[inline]
    fn seconds_per_tick(&self) -> f64 {
        60.0 / (self.bpm * RESOLUTION)
    }
}

/// Piecewise-constant tempo with a list of time signatures.
#[derive(Debug, Clone)]
pub struct TempoTrack {
    segments: Vec<TempoSegment>,
    signatures: Vec<TimeSignature>,
}

impl Default for TempoTrack {
    fn default() -> Self {
        Self {
            segments: vec![TempoSegment {
                pos: 0.0,
                bpm: DEFAULT_BPM,
                time: 0.0,
            }],
            signatures: vec![TimeSignature::default()],
        }
    }
}

impl TempoTrack {
    pub fn new(bpm: f64) -> Result<Self> {
        validate_bpm(bpm)?;
        let mut track = Self::default();
        track.segments[0].bpm = bpm;
        Ok(track)
    }

    pub fn with_time_signature(mut self, numerator: u32, denominator: u32) -> Result<Self> {
        self.signatures[0] = TimeSignature::new(0, numerator, denominator, 0.0)?;
        self.rebuild_signature_positions();
        Ok(self)
    }

    pub fn tempos(&self) -> Vec<Tempo> {
        self.segments
            .iter()
            .map(|s| Tempo {
                pos: s.pos,
                bpm: s.bpm,
            })
            .collect()
    }

    /// Inserts or replaces the tempo starting at `pos`.
    pub fn add_tempo(&mut self, pos: Tick, bpm: f64) -> Result<()> {
        validate_bpm(bpm)?;
        if pos < 0.0 {
            return Err(EditorError::InvalidTempo(format!(
                "tempo position must not be negative, got {}",
                pos
            )));
        }
        match self.segments.iter_mut().find(|s| s.pos == pos) {
            Some(existing) => existing.bpm = bpm,
            None => self.segments.push(TempoSegment { pos, bpm, time: 0.0 }),
        }
        self.segments.sort_by(|a, b| a.pos.total_cmp(&b.pos));
        self.rebuild_segment_times();
        Ok(())
    }

    /// Inserts or replaces the signature that starts at `bar_index`.
    pub fn add_time_signature(
        &mut self,
        bar_index: i64,
        numerator: u32,
        denominator: u32,
    ) -> Result<()> {
        if bar_index < 0 {
            return Err(EditorError::InvalidTimeSignature(format!(
                "bar index must not be negative, got {}",
                bar_index
            )));
        }
        let signature = TimeSignature::new(bar_index, numerator, denominator, 0.0)?;
        self.signatures.retain(|s| s.bar_index != bar_index);
        self.signatures.push(signature);
        self.signatures.sort_by_key(|s| s.bar_index);
        self.rebuild_signature_positions();
        Ok(())
    }

    fn rebuild_segment_times(&mut self) {
        let mut time = 0.0;
        for i in 0..self.segments.len() {
            if i > 0 {
                let prev = self.segments[i - 1];
                time = prev.time + (self.segments[i].pos - prev.pos) * prev.seconds_per_tick();
            }
            self.segments[i].time = time;
        }
    }

    fn rebuild_signature_positions(&mut self) {
        for i in 0..self.signatures.len() {
            let pos = if i == 0 {
                0.0
            } else {
                let prev = self.signatures[i - 1];
                prev.tick_by_bar_index(self.signatures[i].bar_index as f64)
            };
            self.signatures[i].pos = pos;
        }
    }

    fn segment_for_tick(&self, tick: Tick) -> &TempoSegment {
        let idx = self
            .segments
            .partition_point(|s| s.pos <= tick)
            .saturating_sub(1);
        &self.segments[idx]
    }

    fn segment_for_time(&self, time: f64) -> &TempoSegment {
        let idx = self
            .segments
            .partition_point(|s| s.time <= time)
            .saturating_sub(1);
        &self.segments[idx]
    }
}

impl TempoMap for TempoTrack {
    fn time_at(&self, tick: Tick) -> f64 {
        let seg = self.segment_for_tick(tick);
        seg.time + (tick - seg.pos) * seg.seconds_per_tick()
    }

    fn tick_at(&self, time: f64) -> Tick {
        let seg = self.segment_for_time(time);
        seg.pos + (time - seg.time) / seg.seconds_per_tick()
    }

    fn meter_status(&self, tick: Tick) -> MeterStatus {
        let idx = self
            .signatures
            .partition_point(|s| s.pos <= tick)
            .saturating_sub(1);
        let sig = &self.signatures[idx];
        MeterStatus {
            time_signature_index: idx,
            bar_index: sig.bar_index as f64 + (tick - sig.pos) / sig.ticks_per_bar(),
        }
    }

    fn time_signatures(&self) -> &[TimeSignature] {
        &self.signatures
    }
}

fn validate_bpm(bpm: f64) -> Result<()> {
    if !(bpm.is_finite() && bpm > 0.0) {
        return Err(EditorError::InvalidTempo(format!(
            "bpm must be positive, got {}",
            bpm
        )));
    }
    Ok(())
}

/// Linear ramp from `y0` at `x0` to `y1` at `x1`, clamped outside the range.
///
/// Used for every fade-in of grid lines and overlays.
#[inline]
pub fn line_value(x0: f64, y0: f64, x1: f64, y1: f64, x: f64) -> f64 {
    if x <= x0 {
        return y0;
    }
    if x >= x1 {
        return y1;
    }
    y0 + (x - x0) / (x1 - x0) * (y1 - y0)
}

#[inline]
pub fn db_to_level(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Format a tick as bar:beat (1-based), e.g. for status readouts.
pub fn format_bar_beat(tempo: &dyn TempoMap, tick: Tick) -> String {
    let status = tempo.meter_status(tick);
    let sig = tempo.time_signature_at(tick);
    let bar_start = sig.tick_by_bar_index(status.bar() as f64);
    let beat = ((tick - bar_start) / sig.ticks_per_beat()).floor() as i64;
    format!("{}:{}", status.bar() + 1, beat + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn constant_tempo_conversion() {
        let track = TempoTrack::new(120.0).unwrap();
        // One beat at 120 bpm is half a second.
        assert!((track.time_at(RESOLUTION) - 0.5).abs() < EPS);
        assert!((track.tick_at(1.0) - 2.0 * RESOLUTION).abs() < EPS);
    }

    #[test]
    fn tempo_change_shifts_later_times() {
        let mut track = TempoTrack::new(120.0).unwrap();
        track.add_tempo(4.0 * RESOLUTION, 60.0).unwrap();
        // Four beats at 120 (2 s) then one beat at 60 (1 s).
        assert!((track.time_at(5.0 * RESOLUTION) - 3.0).abs() < EPS);
        assert!((track.tick_at(3.0) - 5.0 * RESOLUTION).abs() < EPS);
    }

    #[test]
    fn tick_time_roundtrip_across_segments() {
        let mut track = TempoTrack::new(90.0).unwrap();
        track.add_tempo(960.0, 150.0).unwrap();
        track.add_tempo(3000.0, 72.5).unwrap();
        for i in 0..100 {
            let tick = i as f64 * 47.3;
            let back = track.tick_at(track.time_at(tick));
            assert!((back - tick).abs() < 1e-6, "tick {} came back as {}", tick, back);
        }
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(TempoTrack::new(0.0).is_err());
        assert!(TimeSignature::new(0, 4, 3, 0.0).is_err());
        assert!(TimeSignature::new(0, 0, 4, 0.0).is_err());
    }

    #[test]
    fn meter_status_follows_signature_changes() {
        let mut track = TempoTrack::new(120.0).unwrap();
        track.add_time_signature(2, 3, 8).unwrap();
        let sigs = track.time_signatures();
        assert_eq!(sigs.len(), 2);
        // Two 4/4 bars.
        assert_eq!(sigs[1].pos, 2.0 * 4.0 * RESOLUTION);
        assert_eq!(sigs[1].ticks_per_beat(), RESOLUTION / 2.0);

        let status = track.meter_status(sigs[1].pos + sigs[1].ticks_per_bar() * 1.5);
        assert_eq!(status.time_signature_index, 1);
        assert!((status.bar_index - 3.5).abs() < EPS);
        assert_eq!(
            sigs[1].tick_by_bar_and_beat(3, 1.0),
            sigs[1].pos + sigs[1].ticks_per_bar() + RESOLUTION / 2.0
        );
    }

    #[test]
    fn line_value_clamps() {
        assert_eq!(line_value(6.0, 0.0, 12.0, 1.0, 3.0), 0.0);
        assert_eq!(line_value(6.0, 0.0, 12.0, 1.0, 9.0), 0.5);
        assert_eq!(line_value(6.0, 0.0, 12.0, 1.0, 30.0), 1.0);
    }

    #[test]
    fn bar_beat_formatting() {
        let track = TempoTrack::default();
        assert_eq!(format_bar_beat(&track, 0.0), "1:1");
        assert_eq!(format_bar_beat(&track, 5.0 * RESOLUTION), "2:2");
    }
}
