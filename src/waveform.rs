use crate::axis::TickAxis;
use crate::constants::VOLUME_AUTOMATION_ID;
use crate::model::{Part, volume_to_level};
use crate::time_utils::{Tick, db_to_level, line_value};

/// One drawable column of the waveform strip, in view pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformColumn {
    pub x: f64,
    pub value_y: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_ratio: f64,
    pub max_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    NoteStart,
    NoteEnd,
    /// Start of phoneme `index`.
    PhonemeStart(usize),
    /// End of the last phoneme, `index` being that phoneme.
    PhonemeEnd(usize),
}

/// A note or phoneme boundary in the waveform strip.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryMarker {
    pub note_id: u64,
    pub kind: BoundaryKind,
    /// Global tick.
    pub tick: Tick,
    pub time: f64,
    pub x: f64,
    pub label: Option<String>,
    pub opacity: f32,
}

/// Maps rendered audio onto the waveform strip.
///
/// The strip spans `[bottom - height, bottom]`. A sample value `v` at gain `g`
/// lands at `(1 - v * g) * height / 2 + top`, so silence sits on the centre
/// line and full scale touches the top edge.
pub struct WaveformSampler<'a> {
    axis: &'a TickAxis,
    bottom: f64,
    height: f64,
}

impl<'a> WaveformSampler<'a> {
    pub fn new(axis: &'a TickAxis, bottom: f64, height: f64) -> Self {
        Self {
            axis,
            bottom,
            height,
        }
    }

    #[inline]
    pub fn top(&self) -> f64 {
        self.bottom - self.height
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.bottom
    }

    #[inline]
    pub fn value_to_y(&self, value: f64, gain: f64) -> f64 {
        (1.0 - value * gain) * (self.height / 2.0) + self.top()
    }

    /// Whether `y` lies inside the strip.
    #[inline]
    pub fn contains_y(&self, y: f64) -> bool {
        y >= self.top() && y <= self.bottom
    }

    fn columns(&self, start: Tick, end: Tick) -> Vec<f64> {
        let x0 = self.axis.tick_to_x(start).max(0.0);
        let x1 = self.axis.tick_to_x(end).min(self.axis.width());
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

    /// Columns for the rendered audio of every piece, clipped to the view.
    /// The audio interval may extend past the piece itself. Pieces without
    /// audio leave a gap.
    pub fn sample(&self, part: &Part) -> Vec<WaveformColumn> {
        let tempo = part.tempo();
        let view_start = tempo.time_at(self.axis.min_visible_tick());
        let view_end = tempo.time_at(self.axis.max_visible_tick());
        let static_gain = db_to_level(part.gain_db);

        let mut out = Vec::new();
        for (index, piece) in part.synthesis_pieces().iter().enumerate() {
            let Some(result) = &piece.result else {
                log::trace!("Piece {} has no result, skipped", index);
                continue;
            };
            let (Some(waveform), Some((audio_start, audio_end))) =
                (&result.waveform, result.audio_interval())
            else {
                log::trace!("Piece {} has no waveform, skipped", index);
                continue;
            };
            if audio_end < view_start || audio_start > view_end {
                continue;
            }

            let start = tempo.tick_at(audio_start.max(view_start));
            let end = tempo.tick_at(audio_end.min(view_end));
            let xs = self.columns(start, end);
            let ticks: Vec<Tick> = xs.iter().map(|&x| self.axis.x_to_tick(x)).collect();
            let positions: Vec<f64> = ticks
                .iter()
                .map(|&t| result.sample_position(tempo.time_at(t)))
                .collect();
            if positions.len() < 2 {
                continue;
            }

            let values = waveform.values(&positions);
            let peaks = waveform.peaks(&positions, &values);
            let local: Vec<Tick> = ticks.iter().map(|t| t - part.pos()).collect();
            let volumes = part.automation_values(VOLUME_AUTOMATION_ID, &local);

            for (i, peak) in peaks.iter().enumerate() {
                let gain = static_gain * volume_to_level(volumes[i]);
                out.push(WaveformColumn {
                    x: xs[i],
                    value_y: self.value_to_y(values[i], gain),
                    min_y: self.value_to_y(peak.min, gain),
                    max_y: self.value_to_y(peak.max, gain),
                    min_ratio: peak.min_ratio,
                    max_ratio: peak.max_ratio,
                });
            }
        }
        out
    }

    /// Note and phoneme boundaries for the visible notes.
    ///
    /// Authored phonemes win over synthesized ones; a note with neither shows
    /// its own start and end, labelled with the lyric.
    pub fn boundary_markers(&self, part: &Part, fade: (f64, f64)) -> Vec<BoundaryMarker> {
        let opacity = line_value(fade.0, 0.0, fade.1, 1.0, self.axis.scale_level()) as f32;
        if opacity <= 0.0 {
            return Vec::new();
        }
        let tempo = part.tempo();
        let (min, max) = (self.axis.min_visible_tick(), self.axis.max_visible_tick());
        let mut markers = Vec::new();
        let mut push = |note_id: u64, kind: BoundaryKind, tick: Tick, label: Option<String>| {
            markers.push(BoundaryMarker {
                note_id,
                kind,
                tick,
                time: tempo.time_at(tick),
                x: self.axis.tick_to_x(tick),
                label,
                opacity,
            });
        };

        for note in part.notes() {
            let start = part.pos() + note.pos;
            let end = part.pos() + note.end_pos();
            match note.effective_phonemes() {
                Some(phonemes) => {
                    let base = tempo.time_at(start);
                    let first = tempo.tick_at(base + phonemes[0].start_time);
                    let last = tempo.tick_at(base + phonemes[phonemes.len() - 1].end_time);
                    if last < min || first > max {
                        continue;
                    }
                    for (i, ph) in phonemes.iter().enumerate() {
                        let tick = tempo.tick_at(base + ph.start_time);
                        push(note.id, BoundaryKind::PhonemeStart(i), tick, Some(ph.symbol.clone()));
                    }
                    push(note.id, BoundaryKind::PhonemeEnd(phonemes.len() - 1), last, None);
                }
                None => {
                    if end < min || start > max {
                        continue;
                    }
                    push(note.id, BoundaryKind::NoteStart, start, Some(note.lyric.clone()));
                    push(note.id, BoundaryKind::NoteEnd, end, None);
                }
            }
        }
        markers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{PHONEME_FADE_END, PHONEME_FADE_START, WAVEFORM_HEIGHT};
    use crate::model::{
        CurvePoint, Note, Phoneme, SampleBuffer, SynthesisPiece, SynthesisResult,
    };
    use crate::time_utils::{TempoMap, TempoTrack};
    use std::sync::Arc;

    const FADE: (f64, f64) = (PHONEME_FADE_START, PHONEME_FADE_END);

    fn part_with_audio(samples: Vec<f32>, rate: f64) -> Part {
        let tempo = TempoTrack::default();
        let mut part = Part::new("p", 0.0, 4000.0, Arc::new(tempo.clone()));
        let duration = samples.len() as f64 / rate;
        let mut piece = SynthesisPiece::new(0.0, duration);
        piece.result = Some(SynthesisResult {
            start_time: 0.0,
            sampling_rate: rate,
            pitch: Vec::new(),
            waveform: Some(Arc::new(SampleBuffer::new(samples))),
        });
        part.set_synthesis_pieces(vec![piece, SynthesisPiece::new(duration, duration + 1.0)]);
        part
    }

    #[test]
    fn vertical_mapping() {
        let axis = TickAxis::new(0.0, 0.25, 1000.0);
        let h = WAVEFORM_HEIGHT as f64;
        let sampler = WaveformSampler::new(&axis, 500.0, h);
        let top = 500.0 - h;
        assert_eq!(sampler.value_to_y(0.0, 1.0), top + h / 2.0);
        assert_eq!(sampler.value_to_y(1.0, 1.0), top);
        assert_eq!(sampler.value_to_y(-1.0, 1.0), 500.0);
    }

    #[test]
    fn constant_signal_lands_on_one_line() {
        let part = part_with_audio(vec![0.5; 48_000], 48_000.0);
        let axis = TickAxis::new(0.0, 0.25, 1000.0);
        let sampler = WaveformSampler::new(&axis, 100.0, 64.0);
        let cols = sampler.sample(&part);
        assert!(!cols.is_empty());
        // One second at 120 bpm is 960 ticks, 240 px; the unsynthesized piece adds nothing.
        assert!(cols.last().unwrap().x < 240.0);
        for col in &cols[..cols.len() - 1] {
            assert!((col.value_y - sampler.value_to_y(0.5, 1.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn audio_outside_the_piece_is_drawn() {
        let mut part = Part::new("p", 0.0, 4000.0, Arc::new(TempoTrack::default()));
        // Piece spans 0.5..1.0 s, its audio 0.25..1.5 s.
        let mut piece = SynthesisPiece::new(0.5, 1.0);
        piece.result = Some(SynthesisResult {
            start_time: 0.25,
            sampling_rate: 1000.0,
            pitch: Vec::new(),
            waveform: Some(Arc::new(SampleBuffer::new(vec![0.5; 1250]))),
        });
        part.set_synthesis_pieces(vec![piece]);

        let axis = TickAxis::new(0.0, 0.25, 1000.0);
        let sampler = WaveformSampler::new(&axis, 100.0, 64.0);
        let cols = sampler.sample(&part);
        let first = cols.first().unwrap().x;
        let last = cols.last().unwrap().x;
        assert!((first - 60.0).abs() < 1e-9, "first column at {}", first);
        assert!(last > 350.0 && last < 360.0, "last column at {}", last);

        let level = sampler.value_to_y(0.5, 1.0);
        for x in [80.0, 320.0] {
            let col = cols.iter().find(|c| c.x == x).unwrap();
            assert!((col.value_y - level).abs() < 1e-9);
        }
    }

    #[test]
    fn gain_and_volume_scale_the_signal() {
        let mut part = part_with_audio(vec![0.5; 48_000], 48_000.0);
        part.gain_db = 6.0;
        part.with_automation(VOLUME_AUTOMATION_ID, |t| {
            t.curve.draw_line(CurvePoint::new(0.0, -1.0), CurvePoint::new(480.0, -1.0))
        });
        let axis = TickAxis::new(0.0, 0.25, 1000.0);
        let sampler = WaveformSampler::new(&axis, 100.0, 64.0);
        let cols = sampler.sample(&part);
        // Muted while the volume curve is at -1.
        assert_eq!(cols[10].value_y, sampler.value_to_y(0.0, 1.0));
        let boosted = cols.iter().find(|c| c.x == 200.0).unwrap();
        let expected = sampler.value_to_y(0.5 * db_to_level(6.0), 1.0);
        assert!((boosted.value_y - expected).abs() < 1e-6);
    }

    #[test]
    fn markers_prefer_authored_phonemes() {
        let tempo = TempoTrack::default();
        let mut part = Part::new("p", 0.0, 4000.0, Arc::new(tempo.clone()));
        let mut sung = Note::new(0.0, 960.0, 60, "ka");
        sung.phonemes = vec![Phoneme::new("k", -0.05, 0.05), Phoneme::new("a", 0.05, 1.0)];
        let id = sung.id;
        part.insert_note(sung);
        part.insert_note(Note::new(960.0, 480.0, 62, "la"));
        part.set_synthesized_phonemes(id, Some(vec![Phoneme::new("x", 0.0, 1.0)]));

        let axis = TickAxis::new(0.0, 0.25, 1000.0);
        let markers = WaveformSampler::new(&axis, 100.0, 64.0).boundary_markers(&part, FADE);
        let kinds: Vec<BoundaryKind> = markers.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BoundaryKind::PhonemeStart(0),
                BoundaryKind::PhonemeStart(1),
                BoundaryKind::PhonemeEnd(1),
                BoundaryKind::NoteStart,
                BoundaryKind::NoteEnd,
            ]
        );
        assert_eq!(markers[0].label.as_deref(), Some("k"));
        assert!((markers[0].time + 0.05).abs() < 1e-9);
        assert_eq!(markers[3].label.as_deref(), Some("la"));
        assert_eq!(markers[4].tick, 1440.0);
        assert!((markers[1].x - axis.tick_to_x(tempo.tick_at(0.05))).abs() < 1e-9);
    }
}
