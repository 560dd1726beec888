use serde::{Deserialize, Serialize};

use crate::time_utils::Tick;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub x: Tick,
    pub y: f64,
}

impl CurvePoint {
    #[inline]
    pub fn new(x: Tick, y: f64) -> Self {
        Self { x, y }
    }
}

/// A piecewise-linear curve made of disjoint runs of points.
///
/// Inside a run values are linearly interpolated; between runs (and outside
/// all of them) the curve is undefined and samples as NaN.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterCurve {
    runs: Vec<Vec<CurvePoint>>,
}

impl ParameterCurve {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_runs(runs: Vec<Vec<CurvePoint>>) -> Self {
        let mut curve = Self::new();
        for run in runs {
            curve.insert_run(run);
        }
        curve
    }

    #[inline]
    pub fn runs(&self) -> &[Vec<CurvePoint>] {
        &self.runs
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Covered tick extent, or `None` for an empty curve.
    pub fn extent(&self) -> Option<(Tick, Tick)> {
        let first = self.runs.first()?.first()?.x;
        let last = self.runs.last()?.last()?.x;
        Some((first, last))
    }

    pub fn value_at(&self, tick: Tick) -> f64 {
        let idx = self.runs.partition_point(|run| run_end(run) < tick);
        match self.runs.get(idx) {
            Some(run) if run_start(run) <= tick => sample_run(run, tick),
            _ => f64::NAN,
        }
    }

    pub fn values(&self, ticks: &[Tick]) -> Vec<f64> {
        ticks.iter().map(|&t| self.value_at(t)).collect()
    }

    /// Removes everything strictly between `start` and `end`. Runs crossing a
    /// boundary are cut there with an interpolated end point.
    pub fn clear(&mut self, start: Tick, end: Tick) {
        let (start, end) = (start.min(end), start.max(end));
        if start == end || self.runs.is_empty() {
            return;
        }
        let mut out = Vec::with_capacity(self.runs.len() + 1);
        for run in self.runs.drain(..) {
            let (first, last) = (run_start(&run), run_end(&run));
            if last < start || first > end {
                out.push(run);
                continue;
            }
            let mut left: Vec<CurvePoint> = run.iter().copied().filter(|p| p.x < start).collect();
            if first < start && start <= last {
                left.push(CurvePoint::new(start, sample_run(&run, start)));
            }
            let mut right = Vec::new();
            if first <= end && end < last {
                right.push(CurvePoint::new(end, sample_run(&run, end)));
            }
            right.extend(run.iter().copied().filter(|p| p.x > end));
            if !left.is_empty() {
                out.push(left);
            }
            if !right.is_empty() {
                out.push(right);
            }
        }
        self.runs = out;
    }

    /// Writes `points` over the range they span. A run touching the new data
    /// on either side joins it into one continuous run.
    pub fn insert_run(&mut self, mut points: Vec<CurvePoint>) {
        points.retain(|p| p.x.is_finite() && p.y.is_finite());
        if points.is_empty() {
            return;
        }
        points.sort_by(|a, b| a.x.total_cmp(&b.x));
        points.dedup_by(|b, a| a.x == b.x);
        let (start, end) = (run_start(&points), run_end(&points));
        if start == end {
            self.clear(start - f64::EPSILON, end + f64::EPSILON);
        } else {
            self.clear(start, end);
        }

        let mut merged = points;
        if let Some(idx) = self.runs.iter().position(|r| run_end(r) == start) {
            let mut left = self.runs.remove(idx);
            left.pop();
            left.extend(merged);
            merged = left;
        }
        if let Some(idx) = self.runs.iter().position(|r| run_start(r) == end) {
            let right = self.runs.remove(idx);
            merged.extend(right.into_iter().skip(1));
        }
        let at = self
            .runs
            .partition_point(|r| run_start(r) < run_start(&merged));
        self.runs.insert(at, merged);
    }

    /// Straight segment from `from` to `to`, replacing what was there.
    pub fn draw_line(&mut self, from: CurvePoint, to: CurvePoint) {
        self.insert_run(vec![from, to]);
    }

    /// The data in `[start, end]`, re-based so `start` becomes tick 0.
    pub fn copy_range(&self, start: Tick, end: Tick) -> Vec<Vec<CurvePoint>> {
        let (start, end) = (start.min(end), start.max(end));
        let mut out = Vec::new();
        for run in &self.runs {
            let (first, last) = (run_start(run), run_end(run));
            if last < start || first > end {
                continue;
            }
            let mut piece = Vec::new();
            if first < start {
                piece.push(CurvePoint::new(start, sample_run(run, start)));
            }
            piece.extend(run.iter().copied().filter(|p| p.x >= start && p.x <= end));
            if last > end {
                piece.push(CurvePoint::new(end, sample_run(run, end)));
            }
            piece.dedup_by(|b, a| a.x == b.x);
            for p in &mut piece {
                p.x -= start;
            }
            out.push(piece);
        }
        out
    }

    /// Replaces `[offset, offset + duration]` with `runs` shifted by `offset`.
    ///
    /// Within `blend` ticks of each pasted run's edges the pasted values fade
    /// in from the curve that was there before, where one existed.
    pub fn paste(&mut self, runs: &[Vec<CurvePoint>], offset: Tick, duration: Tick, blend: Tick) {
        let shifted: Vec<Vec<CurvePoint>> = runs
            .iter()
            .filter(|r| !r.is_empty())
            .map(|r| {
                let run: Vec<CurvePoint> = r
                    .iter()
                    .map(|p| CurvePoint::new(p.x + offset, p.y))
                    .collect();
                if blend > 0.0 {
                    self.blend_edges(&run, blend)
                } else {
                    run
                }
            })
            .collect();

        self.clear(offset, offset + duration.max(0.0));
        for run in shifted {
            self.insert_run(run);
        }
    }

    fn blend_edges(&self, run: &[CurvePoint], blend: Tick) -> Vec<CurvePoint> {
        let (start, end) = (run_start(run), run_end(run));
        if !blend.is_finite() || !(end - start).is_finite() {
            return run.to_vec();
        }
        let width = blend.min((end - start) / 2.0);
        if width <= 0.0 {
            return run.to_vec();
        }

        // Densify the fade zones so the cross-fade is actually visible.
        let mut xs: Vec<Tick> = run.iter().map(|p| p.x).collect();
        let steps = (width.ceil() as usize).clamp(1, MAX_BLEND_STEPS);
        for i in 0..=steps {
            let d = width * i as f64 / steps as f64;
            xs.push(start + d);
            xs.push(end - d);
        }
        xs.sort_by(|a, b| a.total_cmp(b));
        xs.dedup();

        xs.into_iter()
            .map(|x| {
                let pasted = sample_run(run, x);
                let existing = self.value_at(x);
                let edge_distance = (x - start).min(end - x);
                let y = if existing.is_nan() || edge_distance >= width {
                    pasted
                } else {
                    let t = edge_distance / width;
                    existing + (pasted - existing) * t
                };
                CurvePoint::new(x, y)
            })
            .collect()
    }
}

/// Upper bound on extra points added per fade zone.
const MAX_BLEND_STEPS: usize = 64;

#[inline]
fn run_start(run: &[CurvePoint]) -> Tick {
    run.first().map_or(f64::NAN, |p| p.x)
}

#[inline]
fn run_end(run: &[CurvePoint]) -> Tick {
    run.last().map_or(f64::NAN, |p| p.x)
}

/// Linear interpolation inside one run; NaN outside it.
pub fn sample_run(run: &[CurvePoint], tick: Tick) -> f64 {
    let idx = run.partition_point(|p| p.x < tick);
    match (idx.checked_sub(1).and_then(|i| run.get(i)), run.get(idx)) {
        (_, Some(after)) if after.x == tick => after.y,
        (Some(before), Some(after)) => {
            let t = (tick - before.x) / (after.x - before.x);
            before.y + (after.y - before.y) * t
        }
        _ => f64::NAN,
    }
}

/// An automation lane: a curve plus the value used where the curve is undefined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationTrack {
    pub default_value: f64,
    pub curve: ParameterCurve,
}

impl AutomationTrack {
    pub fn new(default_value: f64) -> Self {
        Self {
            default_value,
            curve: ParameterCurve::new(),
        }
    }

    pub fn values(&self, ticks: &[Tick]) -> Vec<f64> {
        ticks
            .iter()
            .map(|&t| {
                let v = self.curve.value_at(t);
                if v.is_nan() { self.default_value } else { v }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(points: &[(f64, f64)]) -> Vec<CurvePoint> {
        points.iter().map(|&(x, y)| CurvePoint::new(x, y)).collect()
    }

    #[test]
    fn interpolates_inside_and_nan_outside() {
        let curve = ParameterCurve::from_runs(vec![line(&[(0.0, 60.0), (100.0, 70.0)])]);
        let v = curve.values(&[-1.0, 0.0, 50.0, 100.0, 101.0]);
        assert!(v[0].is_nan());
        assert_eq!(v[1], 60.0);
        assert_eq!(v[2], 65.0);
        assert_eq!(v[3], 70.0);
        assert!(v[4].is_nan());
    }

    #[test]
    fn clear_splits_with_interpolated_edges() {
        let mut curve = ParameterCurve::from_runs(vec![line(&[(0.0, 0.0), (100.0, 10.0)])]);
        curve.clear(20.0, 60.0);
        assert_eq!(curve.runs().len(), 2);
        assert_eq!(curve.value_at(20.0), 2.0);
        assert!(curve.value_at(40.0).is_nan());
        assert_eq!(curve.value_at(60.0), 6.0);
        assert_eq!(curve.value_at(80.0), 8.0);
    }

    #[test]
    fn insert_joins_touching_runs() {
        let mut curve = ParameterCurve::from_runs(vec![line(&[(0.0, 0.0), (100.0, 0.0)])]);
        curve.insert_run(line(&[(40.0, 5.0), (60.0, 5.0)]));
        assert_eq!(curve.runs().len(), 1);
        assert_eq!(curve.value_at(20.0), 0.0);
        assert_eq!(curve.value_at(50.0), 5.0);
        assert_eq!(curve.value_at(90.0), 0.0);
    }

    #[test]
    fn insert_into_gap_stays_separate() {
        let mut curve = ParameterCurve::new();
        curve.insert_run(line(&[(0.0, 1.0), (10.0, 1.0)]));
        curve.insert_run(line(&[(20.0, 2.0), (30.0, 2.0)]));
        assert_eq!(curve.runs().len(), 2);
        assert!(curve.value_at(15.0).is_nan());
    }

    #[test]
    fn copy_then_paste_translates() {
        let curve = ParameterCurve::from_runs(vec![line(&[(0.0, 0.0), (100.0, 10.0)])]);
        let copied = curve.copy_range(50.0, 80.0);
        assert_eq!(copied.len(), 1);
        assert_eq!(copied[0].first().unwrap().x, 0.0);
        assert_eq!(copied[0].last().unwrap().x, 30.0);

        let mut target = ParameterCurve::new();
        target.paste(&copied, 1000.0, 30.0, 0.0);
        for (src, dst) in [(50.0, 1000.0), (65.0, 1015.0), (80.0, 1030.0)] {
            assert!((curve.value_at(src) - target.value_at(dst)).abs() < 1e-9);
        }
    }

    #[test]
    fn paste_blends_into_existing_curve() {
        let mut target = ParameterCurve::from_runs(vec![line(&[(0.0, 0.0), (200.0, 0.0)])]);
        target.paste(&[line(&[(0.0, 10.0), (100.0, 10.0)])], 50.0, 100.0, 5.0);
        // Edge starts at the old value and reaches the pasted one after the blend width.
        assert!((target.value_at(50.0) - 0.0).abs() < 1e-9);
        assert!((target.value_at(55.0) - 10.0).abs() < 1e-9);
        assert!((target.value_at(100.0) - 10.0).abs() < 1e-9);
        assert!((target.value_at(150.0) - 0.0).abs() < 1e-9);
        assert_eq!(target.value_at(175.0), 0.0);
    }

    #[test]
    fn oversized_blend_stays_bounded() {
        let mut target = ParameterCurve::from_runs(vec![line(&[(0.0, 0.0), (1e9, 0.0)])]);
        target.paste(&[line(&[(0.0, 10.0), (1e8, 10.0)])], 0.0, 1e8, 1e12);
        let points: usize = target.runs().iter().map(Vec::len).sum();
        assert!(points <= 2 * (MAX_BLEND_STEPS + 1) + 4, "{} points", points);
        assert!((target.value_at(5e7) - 10.0).abs() < 1e-9);

        let mut target = ParameterCurve::from_runs(vec![line(&[(0.0, 0.0), (200.0, 0.0)])]);
        target.paste(&[line(&[(0.0, 10.0), (100.0, 10.0)])], 50.0, 100.0, f64::INFINITY);
        assert_eq!(target.value_at(50.0), 10.0);
        assert!(target.value_at(100.0).is_finite());
    }

    #[test]
    fn automation_falls_back_to_default() {
        let mut track = AutomationTrack::new(0.5);
        track.curve.insert_run(line(&[(0.0, 1.0), (10.0, 1.0)]));
        assert_eq!(track.values(&[5.0, 20.0]), vec![1.0, 0.5]);
    }
}
