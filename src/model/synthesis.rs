use std::fmt::Debug;
use std::sync::Arc;

use super::curve::CurvePoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SynthesisStatus {
    NotSynthesized,
    Synthesizing,
    SynthesisSucceeded,
    SynthesisFailed,
}

/// Local extremes of the signal between two consecutive sample positions.
///
/// The ratios give where inside the column (0 = left edge, 1 = right edge) the
/// minimum and maximum occur, so a renderer can draw them in order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub min: f64,
    pub max: f64,
    pub min_ratio: f64,
    pub max_ratio: f64,
}

/// Read access to rendered audio, addressed by fractional sample position.
pub trait Waveform: Send + Sync + Debug {
    /// Interpolated amplitude at each position.
    fn values(&self, positions: &[f64]) -> Vec<f64>;

    /// One peak per gap between consecutive positions (`positions.len() - 1` entries).
    fn peaks(&self, positions: &[f64], values: &[f64]) -> Vec<Peak>;

    /// Number of rendered samples.
    fn sample_count(&self) -> usize;
}

/// In-memory mono sample buffer.
#[derive(Debug, Clone, Default)]
pub struct SampleBuffer {
    samples: Vec<f32>,
}

impl SampleBuffer {
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn sample(&self, index: i64) -> f64 {
        if index < 0 {
            return 0.0;
        }
        self.samples
            .get(index as usize)
            .map_or(0.0, |&s| s as f64)
    }

    fn value_at(&self, position: f64) -> f64 {
        let i = position.floor();
        let frac = position - i;
        let a = self.sample(i as i64);
        let b = self.sample(i as i64 + 1);
        a + (b - a) * frac
    }
}

impl Waveform for SampleBuffer {
    fn values(&self, positions: &[f64]) -> Vec<f64> {
        positions.iter().map(|&p| self.value_at(p)).collect()
    }

    fn peaks(&self, positions: &[f64], values: &[f64]) -> Vec<Peak> {
        positions
            .windows(2)
            .zip(values.windows(2))
            .map(|(pos, val)| {
                let (start, end) = (pos[0], pos[1]);
                let width = (end - start).max(f64::EPSILON);
                let mut peak = if val[0] <= val[1] {
                    Peak {
                        min: val[0],
                        max: val[1],
                        min_ratio: 0.0,
                        max_ratio: 1.0,
                    }
                } else {
                    Peak {
                        min: val[1],
                        max: val[0],
                        min_ratio: 1.0,
                        max_ratio: 0.0,
                    }
                };
                let first = start.floor() as i64 + 1;
                let last = end.ceil() as i64 - 1;
                for idx in first..=last {
                    let v = self.sample(idx);
                    let ratio = ((idx as f64 - start) / width).clamp(0.0, 1.0);
                    if v < peak.min {
                        peak.min = v;
                        peak.min_ratio = ratio;
                    }
                    if v > peak.max {
                        peak.max = v;
                        peak.max_ratio = ratio;
                    }
                }
                peak
            })
            .collect()
    }

    fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

#[derive(Debug, Clone)]
pub struct SynthesisResult {
    /// Seconds at sample 0.
    pub start_time: f64,
    pub sampling_rate: f64,
    /// Rendered pitch as runs of (seconds, semitone) points.
    pub pitch: Vec<Vec<CurvePoint>>,
    pub waveform: Option<Arc<dyn Waveform>>,
}

impl SynthesisResult {
    #[inline]
    pub fn sample_position(&self, time: f64) -> f64 {
        (time - self.start_time) * self.sampling_rate
    }

    /// Seconds covered by the rendered audio. May reach outside the piece,
    /// e.g. a consonant sung ahead of its note.
    pub fn audio_interval(&self) -> Option<(f64, f64)> {
        let waveform = self.waveform.as_ref()?;
        if !(self.sampling_rate > 0.0) {
            return None;
        }
        let duration = waveform.sample_count() as f64 / self.sampling_rate;
        Some((self.start_time, self.start_time + duration))
    }
}

#[derive(Debug, Clone)]
pub struct SynthesisPiece {
    pub start_time: f64,
    pub end_time: f64,
    pub status: SynthesisStatus,
    pub result: Option<SynthesisResult>,
}

impl SynthesisPiece {
    pub fn new(start_time: f64, end_time: f64) -> Self {
        Self {
            start_time,
            end_time,
            status: SynthesisStatus::NotSynthesized,
            result: None,
        }
    }

    /// Inclusive overlap with a time window.
    #[inline]
    pub fn intersects(&self, start_time: f64, end_time: f64) -> bool {
        !(self.start_time > end_time || self.end_time < start_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_interval_follows_the_samples() {
        let mut result = SynthesisResult {
            start_time: -0.1,
            sampling_rate: 100.0,
            pitch: Vec::new(),
            waveform: None,
        };
        assert_eq!(result.audio_interval(), None);
        result.waveform = Some(Arc::new(SampleBuffer::new(vec![0.0; 50])));
        let (start, end) = result.audio_interval().unwrap();
        assert_eq!(start, -0.1);
        assert!((end - 0.4).abs() < 1e-12);
        result.sampling_rate = 0.0;
        assert_eq!(result.audio_interval(), None);
    }

    #[test]
    fn buffer_interpolates_and_pads_with_silence() {
        let buf = SampleBuffer::new(vec![0.0, 1.0, -1.0]);
        let v = buf.values(&[-1.0, 0.5, 1.5, 10.0]);
        assert_eq!(v, vec![0.0, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn peaks_find_extremes_between_positions() {
        let buf = SampleBuffer::new(vec![0.0, 0.8, -0.6, 0.1, 0.0]);
        let positions = [0.0, 4.0];
        let values = buf.values(&positions);
        let peaks = buf.peaks(&positions, &values);
        assert_eq!(peaks.len(), 1);
        assert!((peaks[0].max - 0.8).abs() < 1e-6);
        assert!((peaks[0].min + 0.6).abs() < 1e-6);
        assert!(peaks[0].max_ratio < peaks[0].min_ratio);
    }

    #[test]
    fn piece_intersection_is_inclusive() {
        let piece = SynthesisPiece::new(1.0, 2.0);
        assert!(piece.intersects(2.0, 3.0));
        assert!(piece.intersects(0.0, 1.0));
        assert!(!piece.intersects(2.1, 3.0));
    }
}
