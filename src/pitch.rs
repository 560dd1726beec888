use egui::{Pos2, pos2};

use crate::axis::{PitchAxis, TickAxis};
use crate::input::PianoTool;
use crate::model::{Part, sample_run};
use crate::time_utils::{Tick, line_value};

/// Pitch polylines for one frame, in view pixels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PitchLayers {
    /// Common fade for every layer, keyed on zoom.
    pub opacity: f32,
    /// Pitch reported by the synthesis backend.
    pub synthesized: Vec<Vec<Pos2>>,
    /// Pre-vibrato pitch inside each vibrato span, drawn at half opacity.
    pub vibrato_baselines: Vec<Vec<Pos2>>,
    pub final_pitch: Vec<Vec<Pos2>>,
    pub final_width: f32,
}

impl PitchLayers {
    pub fn is_empty(&self) -> bool {
        self.synthesized.is_empty() && self.vibrato_baselines.is_empty() && self.final_pitch.is_empty()
    }

    #[inline]
    pub fn baseline_opacity(&self) -> f32 {
        self.opacity * 0.5
    }
}

/// Resamples pitch sources at one point per pixel column.
pub struct PitchSampler<'a> {
    ticks: &'a TickAxis,
    pitches: &'a PitchAxis,
}

impl<'a> PitchSampler<'a> {
    pub fn new(ticks: &'a TickAxis, pitches: &'a PitchAxis) -> Self {
        Self { ticks, pitches }
    }

    /// Column x positions covering global ticks `[start, end]`, clipped to the
    /// view. The exact right edge is always included.
    pub fn columns(&self, start: Tick, end: Tick) -> Vec<f64> {
        let x0 = self.ticks.tick_to_x(start).max(0.0);
        let x1 = self.ticks.tick_to_x(end).min(self.ticks.width());
        if !(x1 >= x0) {
            return Vec::new();
        }
        let mut xs: Vec<f64> = (0..)
            .map(|i| x0 + i as f64)
            .take_while(|&x| x < x1)
            .collect();
        xs.push(x1);
        xs
    }

    /// Splits `(x, pitch)` samples into polylines at every NaN.
    pub fn polylines(&self, xs: &[f64], values: &[f64]) -> Vec<Vec<Pos2>> {
        let mut lines = Vec::new();
        let mut current: Vec<Pos2> = Vec::new();
        for (&x, &v) in xs.iter().zip(values) {
            if v.is_nan() {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                current.clear();
                continue;
            }
            current.push(pos2(x as f32, self.pitches.pitch_to_y(v + 0.5) as f32));
        }
        if !current.is_empty() {
            lines.push(current);
        }
        lines
    }

    fn local_ticks(&self, part: &Part, xs: &[f64]) -> Vec<Tick> {
        xs.iter().map(|&x| self.ticks.x_to_tick(x) - part.pos()).collect()
    }

    /// Final pitch (curve or note, plus vibrato) across the whole view.
    pub fn final_pitch(&self, part: &Part) -> Vec<Vec<Pos2>> {
        let xs = self.columns(self.ticks.min_visible_tick(), self.ticks.max_visible_tick());
        let values = part.final_pitch(&self.local_ticks(part, &xs));
        self.polylines(&xs, &values)
    }

    /// Base pitch inside each vibrato span that reaches into the view.
    pub fn vibrato_baselines(&self, part: &Part) -> Vec<Vec<Pos2>> {
        let mut lines = Vec::new();
        for vibrato in part.vibratos() {
            let start = part.pos() + vibrato.pos;
            let end = part.pos() + vibrato.end_pos();
            let xs = self.columns(start, end);
            if xs.len() < 2 {
                continue;
            }
            let values = part.base_pitch(&self.local_ticks(part, &xs));
            lines.extend(self.polylines(&xs, &values));
        }
        lines
    }

    /// Backend pitch. Each run is stored in seconds and is mapped through the
    /// tempo map column by column.
    pub fn synthesized(&self, part: &Part) -> Vec<Vec<Pos2>> {
        let tempo = part.tempo();
        let mut lines = Vec::new();
        for piece in part.synthesis_pieces() {
            let Some(result) = &piece.result else {
                continue;
            };
            for run in &result.pitch {
                let (Some(first), Some(last)) = (run.first(), run.last()) else {
                    continue;
                };
                let xs = self.columns(tempo.tick_at(first.x), tempo.tick_at(last.x));
                if xs.len() < 2 {
                    continue;
                }
                let values: Vec<f64> = xs
                    .iter()
                    .map(|&x| sample_run(run, tempo.time_at(self.ticks.x_to_tick(x))))
                    .collect();
                lines.extend(self.polylines(&xs, &values));
            }
        }
        lines
    }

    /// Every pitch layer for the active tool. Empty when zoomed out past the fade.
    pub fn layers(&self, part: &Part, tool: PianoTool, fade: (f64, f64)) -> PitchLayers {
        let opacity = line_value(fade.0, 0.0, fade.1, 1.0, self.ticks.scale_level());
        if opacity <= 0.0 {
            return PitchLayers::default();
        }
        let show_baselines = matches!(tool, PianoTool::Pitch | PianoTool::Lock | PianoTool::Vibrato);
        PitchLayers {
            opacity: opacity as f32,
            synthesized: self.synthesized(part),
            vibrato_baselines: if show_baselines {
                self.vibrato_baselines(part)
            } else {
                Vec::new()
            },
            final_pitch: self.final_pitch(part),
            final_width: if tool == PianoTool::Note { 1.0 } else { 2.0 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{PITCH_FADE_END, PITCH_FADE_START};
    use crate::model::{CurvePoint, Note, SynthesisPiece, SynthesisResult, Vibrato};
    use crate::time_utils::{TempoMap, TempoTrack};
    use std::sync::Arc;

    const FADE: (f64, f64) = (PITCH_FADE_START, PITCH_FADE_END);

    fn axes() -> (TickAxis, PitchAxis) {
        // 0.25 px per tick, 1000 px wide: ticks 0..4000.
        (TickAxis::new(0.0, 0.25, 1000.0), PitchAxis::new(72.0, 10.0, 400.0))
    }

    fn part() -> Part {
        Part::new("p", 0.0, 4000.0, Arc::new(TempoTrack::default()))
    }

    #[test]
    fn gaps_split_polylines() {
        let (ticks, pitches) = axes();
        let mut p = part();
        p.insert_note(Note::new(0.0, 480.0, 60, "a"));
        p.insert_note(Note::new(960.0, 480.0, 62, "b"));
        let lines = PitchSampler::new(&ticks, &pitches).final_pitch(&p);
        assert_eq!(lines.len(), 2);
        let y60 = pitches.pitch_to_y(60.5) as f32;
        assert!(lines[0].iter().all(|pt| pt.y == y60));
        assert_eq!(lines[0][0].x, 0.0);
    }

    #[test]
    fn lone_sample_keeps_its_polyline() {
        let (ticks, pitches) = axes();
        let sampler = PitchSampler::new(&ticks, &pitches);
        let lines = sampler.polylines(&[0.0, 1.0, 2.0, 3.0], &[f64::NAN, 60.0, f64::NAN, 62.0]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], vec![pos2(1.0, pitches.pitch_to_y(60.5) as f32)]);
        assert_eq!(lines[1].len(), 1);
    }

    #[test]
    fn columns_are_clipped_and_include_the_edge() {
        let (ticks, pitches) = axes();
        let sampler = PitchSampler::new(&ticks, &pitches);
        let xs = sampler.columns(-100.0, 10.0);
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 2.5]);
        assert!(sampler.columns(5000.0, 6000.0).is_empty());
    }

    #[test]
    fn baselines_only_for_curve_tools() {
        let (ticks, pitches) = axes();
        let mut p = part();
        p.insert_note(Note::new(0.0, 1920.0, 60, "a"));
        p.insert_vibrato(Vibrato::new(480.0, 960.0));
        let sampler = PitchSampler::new(&ticks, &pitches);

        let note_layers = sampler.layers(&p, PianoTool::Note, FADE);
        assert!(note_layers.vibrato_baselines.is_empty());
        assert_eq!(note_layers.final_width, 1.0);

        let pitch_layers = sampler.layers(&p, PianoTool::Pitch, FADE);
        assert_eq!(pitch_layers.vibrato_baselines.len(), 1);
        assert_eq!(pitch_layers.final_width, 2.0);
        let baseline = &pitch_layers.vibrato_baselines[0];
        assert_eq!(baseline.first().unwrap().x, 120.0);
        assert_eq!(baseline.last().unwrap().x, 360.0);
    }

    #[test]
    fn zoomed_out_hides_everything() {
        let pitches = PitchAxis::new(72.0, 10.0, 400.0);
        let ticks = TickAxis::new(0.0, 1.0 / 256.0, 1000.0);
        let mut p = part();
        p.insert_note(Note::new(0.0, 480.0, 60, "a"));
        let layers = PitchSampler::new(&ticks, &pitches).layers(&p, PianoTool::Pitch, FADE);
        assert!(layers.is_empty());
        assert_eq!(layers.opacity, 0.0);
    }

    #[test]
    fn synthesized_pitch_follows_the_tempo_map() {
        let (ticks, pitches) = axes();
        let mut tempo = TempoTrack::new(120.0).unwrap();
        tempo.add_tempo(960.0, 60.0).unwrap();
        let mut p = Part::new("p", 0.0, 4000.0, Arc::new(tempo.clone()));
        let end = tempo.time_at(1920.0);
        let mut piece = SynthesisPiece::new(0.0, end);
        piece.result = Some(SynthesisResult {
            start_time: 0.0,
            sampling_rate: 44100.0,
            pitch: vec![vec![CurvePoint::new(0.0, 60.0), CurvePoint::new(end, 64.0)]],
            waveform: None,
        });
        p.set_synthesis_pieces(vec![piece]);

        let lines = PitchSampler::new(&ticks, &pitches).synthesized(&p);
        assert_eq!(lines.len(), 1);
        let last = lines[0].last().unwrap();
        assert!((last.x - 480.0).abs() < 1e-3);
        assert!((last.y - pitches.pitch_to_y(64.5) as f32).abs() < 1e-3);
        // At tick 960 one second of three has passed.
        let mid = lines[0].iter().find(|pt| pt.x == 240.0).unwrap();
        let expected = pitches.pitch_to_y(60.0 + 4.0 / 3.0 + 0.5) as f32;
        assert!((mid.y - expected).abs() < 1e-3);
    }
}
