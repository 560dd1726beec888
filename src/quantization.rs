use crate::axis::TickAxis;
use crate::config::GridConfig;
use crate::constants::{BEAT_FADE_END, BEAT_FADE_START, MAX_QUANTIZATION_DIVISION, QUANTIZATION_BASES};
use crate::error::{EditorError, Result};
use crate::messages::Event;
use crate::time_utils::{line_value, TempoMap, Tick, TimeSignature};

/// User-chosen snapping: `base` splits each beat, `division` caps how many
/// zoom-dependent sub-cells a base step may be split into.
#[derive(Debug)]
pub struct Quantization {
    base: u32,
    division: u32,
    gaps: GridConfig,
    pub changed: Event<()>,
}

impl Default for Quantization {
    fn default() -> Self {
        Self {
            base: 1,
            division: 4,
            gaps: GridConfig::default(),
            changed: Event::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridLineKind {
    Bar,
    Beat,
    Base,
    Cell,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub tick: Tick,
    pub x: f64,
    pub kind: GridLineKind,
    pub opacity: f32,
}

impl Quantization {
    pub fn new(base: u32, division: u32, gaps: GridConfig) -> Result<Self> {
        validate(base, division)?;
        Ok(Self {
            base,
            division,
            gaps,
            changed: Event::new(),
        })
    }

    #[inline]
    pub fn base(&self) -> u32 {
        self.base
    }

    #[inline]
    pub fn division(&self) -> u32 {
        self.division
    }

    pub fn set(&mut self, base: u32, division: u32) -> Result<()> {
        validate(base, division)?;
        if (base, division) != (self.base, self.division) {
            log::debug!("Quantization 1/{} x{}", base, division);
            self.base = base;
            self.division = division;
            self.changed.emit(());
        }
        Ok(())
    }

    pub fn set_gaps(&mut self, gaps: GridConfig) {
        if gaps != self.gaps {
            self.gaps = gaps;
            self.changed.emit(());
        }
    }

    /// How many cells each base step splits into at `pixels_per_base`.
    ///
    /// Doubles while the halved cell stays at least `min_grid_gap` wide and
    /// the count stays within `division`. Never below one.
    pub fn cells_per_base(&self, pixels_per_base: f64) -> u32 {
        let min_gap = self.gaps.min_grid_gap as f64;
        let mut cells = 1u32;
        while cells * 2 <= self.division && pixels_per_base / (cells * 2) as f64 >= min_gap {
            cells *= 2;
        }
        cells
    }

    fn cell_for(&self, sig: &TimeSignature, axis: &TickAxis) -> f64 {
        let ticks_per_base = sig.ticks_per_beat() / self.base as f64;
        let cells = self.cells_per_base(ticks_per_base * axis.pixels_per_tick());
        ticks_per_base / cells as f64
    }

    /// Effective snapping cell at `tick` for the current zoom.
    pub fn cell_ticks_at(&self, tick: Tick, axis: &TickAxis, tempo: &dyn TempoMap) -> f64 {
        self.cell_for(&tempo.time_signature_at(tick), axis)
    }

    /// Effective snapping cell for the signature at the left edge of the view.
    pub fn cell_ticks(&self, axis: &TickAxis, tempo: &dyn TempoMap) -> f64 {
        self.cell_ticks_at(axis.min_visible_tick(), axis, tempo)
    }

    /// Snaps a global tick to the nearest cell, counted from the start of the
    /// time signature in force there.
    pub fn quantize(&self, tick: Tick, axis: &TickAxis, tempo: &dyn TempoMap) -> Tick {
        let sig = tempo.time_signature_at(tick);
        let cell = self.cell_for(&sig, axis);
        sig.pos + ((tick - sig.pos) / cell).round() * cell
    }

    /// Drawable grid for the visible range. Lines that would be fully
    /// transparent are left out.
    pub fn grid_lines(&self, axis: &TickAxis, tempo: &dyn TempoMap) -> Vec<GridLine> {
        let (min, max) = (axis.min_visible_tick(), axis.max_visible_tick());
        let sigs = tempo.time_signatures();
        let first = tempo.meter_status(min).time_signature_index;
        let mut lines = Vec::new();
        for (i, sig) in sigs.iter().enumerate().skip(first) {
            if sig.pos > max {
                break;
            }
            let next = sigs.get(i + 1).map_or(f64::INFINITY, |n| n.pos);
            self.region_lines(sig, min.max(sig.pos), max.min(next), next, axis, &mut lines);
        }
        lines
    }

    fn region_lines(
        &self,
        sig: &TimeSignature,
        start: Tick,
        end: Tick,
        next: Tick,
        axis: &TickAxis,
        out: &mut Vec<GridLine>,
    ) {
        let ppt = axis.pixels_per_tick();
        let (gap, full) = (
            self.gaps.min_grid_gap as f64,
            self.gaps.min_reality_grid_gap as f64,
        );
        let ticks_per_beat = sig.ticks_per_beat();
        let ticks_per_base = ticks_per_beat / self.base as f64;
        let beat_opacity = line_value(
            BEAT_FADE_START as f64,
            0.0,
            BEAT_FADE_END as f64,
            1.0,
            ticks_per_beat * ppt,
        );
        let base_opacity = line_value(gap, 0.0, full, 1.0, ticks_per_base * ppt);

        let numerator = sig.numerator as i64;
        let (step, per_base, per_beat, per_bar) = if base_opacity > 0.0 {
            let cells = self.cells_per_base(ticks_per_base * ppt) as i64;
            let per_beat = cells * self.base as i64;
            (ticks_per_base / cells as f64, cells, per_beat, per_beat * numerator)
        } else if beat_opacity > 0.0 {
            (ticks_per_beat, 1, 1, numerator)
        } else {
            let bar_px = sig.ticks_per_bar() * ppt;
            let mut stride = 1.0;
            while bar_px * stride < gap {
                stride *= 2.0;
            }
            (sig.ticks_per_bar() * stride, 1, 1, 1)
        };

        let n_start = ((start - sig.pos) / step).ceil() as i64;
        let n_end = ((end - sig.pos) / step).floor() as i64;
        for n in n_start..=n_end {
            let tick = sig.pos + n as f64 * step;
            if tick >= next {
                break;
            }
            let (kind, opacity) = if n % per_bar == 0 {
                (GridLineKind::Bar, 1.0)
            } else if n % per_beat == 0 {
                (GridLineKind::Beat, beat_opacity)
            } else if n % per_base == 0 {
                (GridLineKind::Base, base_opacity)
            } else {
                let r = n.rem_euclid(per_base);
                let level = per_base >> r.trailing_zeros();
                let px = ticks_per_base * ppt / level as f64;
                (GridLineKind::Cell, line_value(gap, 0.0, full, 1.0, px))
            };
            if opacity <= 0.0 {
                continue;
            }
            out.push(GridLine {
                tick,
                x: axis.tick_to_x(tick),
                kind,
                opacity: opacity as f32,
            });
        }
    }
}

fn validate(base: u32, division: u32) -> Result<()> {
    if !QUANTIZATION_BASES.contains(&base) {
        return Err(EditorError::InvalidQuantization(format!(
            "base must be one of {:?}, got {}",
            QUANTIZATION_BASES, base
        )));
    }
    if division == 0 || !division.is_power_of_two() || division > MAX_QUANTIZATION_DIVISION {
        return Err(EditorError::InvalidQuantization(format!(
            "division must be a power of two up to {}, got {}",
            MAX_QUANTIZATION_DIVISION, division
        )));
    }
    Ok(())
}
