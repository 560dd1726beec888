use super::{Gesture, Operation, OperationContext, OperationKind, PointerInput};
use crate::hit_test::HitTarget;
use crate::model::CurvePoint;
use crate::time_utils::Tick;

/// Curve point under the pointer in part-local ticks. Pitch lines are drawn
/// through the middle of each key row.
fn curve_point(ctx: &OperationContext, input: &PointerInput) -> CurvePoint {
    CurvePoint::new(ctx.tick_at(input) - ctx.part.pos(), ctx.pitch_at(input) - 0.5)
}

/// Part-local range swept by the pointer so far.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Sweep {
    lo: Tick,
    hi: Tick,
}

impl Sweep {
    fn at(tick: Tick) -> Self {
        Self { lo: tick, hi: tick }
    }

    fn extended(self, tick: Tick) -> Self {
        Self {
            lo: self.lo.min(tick),
            hi: self.hi.max(tick),
        }
    }
}

/// Freehand pitch drawing.
#[derive(Debug, Default)]
pub struct PitchDraw {
    gesture: Gesture,
    last: Option<CurvePoint>,
}

impl Operation for PitchDraw {
    fn kind(&self) -> OperationKind {
        OperationKind::PitchDraw
    }

    fn start(&mut self, ctx: &mut OperationContext, input: &PointerInput, target: HitTarget) -> bool {
        if target != HitTarget::Empty {
            return false;
        }
        self.gesture.begin(ctx.part, input);
        self.last = Some(curve_point(ctx, input));
        true
    }

    fn update(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        let Some(last) = self.last else {
            return;
        };
        let point = curve_point(ctx, input);
        if (point.x - last.x).abs() < ctx.config.interaction.pitch_draw_step {
            return;
        }
        ctx.part.with_pitch(|curve| curve.draw_line(last, point));
        self.last = Some(point);
        self.gesture.changed = true;
    }

    fn end(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        self.update(ctx, input);
        self.gesture.finish(ctx.part);
        self.last = None;
    }

    fn abort(&mut self, ctx: &mut OperationContext) {
        self.gesture.rollback(ctx.part);
        self.last = None;
    }

    fn is_operating(&self) -> bool {
        self.gesture.is_active()
    }
}

/// Erases the drawn pitch under the sweep, falling back to note pitch there.
#[derive(Debug, Default)]
pub struct PitchClear {
    gesture: Gesture,
    sweep: Option<Sweep>,
}

impl Operation for PitchClear {
    fn kind(&self) -> OperationKind {
        OperationKind::PitchClear
    }

    fn start(&mut self, ctx: &mut OperationContext, input: &PointerInput, target: HitTarget) -> bool {
        if target != HitTarget::Empty {
            return false;
        }
        self.gesture.begin(ctx.part, input);
        self.sweep = Some(Sweep::at(ctx.tick_at(input) - ctx.part.pos()));
        true
    }

    fn update(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        let Some(sweep) = self.sweep else {
            return;
        };
        let next = sweep.extended(ctx.tick_at(input) - ctx.part.pos());
        if next == sweep {
            return;
        }
        self.sweep = Some(next);
        ctx.part.with_pitch(|curve| curve.clear(next.lo, next.hi));
        let before = self.gesture.snapshot().map(|s| s.pitch());
        self.gesture.changed = before != Some(ctx.part.pitch());
    }

    fn end(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        self.update(ctx, input);
        self.gesture.finish(ctx.part);
        self.sweep = None;
    }

    fn abort(&mut self, ctx: &mut OperationContext) {
        self.gesture.rollback(ctx.part);
        self.sweep = None;
    }

    fn is_operating(&self) -> bool {
        self.gesture.is_active()
    }
}

/// Freezes the pitch as sounded into the drawn curve across the sweep.
///
/// Sampling happens once per pixel column. The synthesized pitch wins where
/// the backend has one; elsewhere the base pitch at press time is used, so
/// vibrato keeps acting on top of the locked line.
#[derive(Debug, Default)]
pub struct PitchLock {
    gesture: Gesture,
    sweep: Option<Sweep>,
}

impl PitchLock {
    fn locked_runs(ctx: &OperationContext, gesture: &Gesture, sweep: Sweep) -> Vec<Vec<CurvePoint>> {
        let Some(snapshot) = gesture.snapshot() else {
            return Vec::new();
        };
        let step = 1.0 / ctx.view.tick_axis.pixels_per_tick();
        let count = ((sweep.hi - sweep.lo) / step).ceil() as usize;
        let ticks: Vec<Tick> = (0..=count)
            .map(|i| (sweep.lo + i as f64 * step).min(sweep.hi))
            .collect();

        let synthesized = ctx.part.synthesized_pitch(&ticks);
        let base = ctx.part.base_pitch_over(snapshot.pitch(), &ticks);

        let mut runs = Vec::new();
        let mut run = Vec::new();
        for ((&t, &synth), &base) in ticks.iter().zip(&synthesized).zip(&base) {
            let value = if synth.is_nan() { base } else { synth };
            if value.is_nan() {
                if !run.is_empty() {
                    runs.push(std::mem::take(&mut run));
                }
                run.clear();
                continue;
            }
            run.push(CurvePoint::new(t, value));
        }
        if !run.is_empty() {
            runs.push(run);
        }
        runs
    }
}

impl Operation for PitchLock {
    fn kind(&self) -> OperationKind {
        OperationKind::PitchLock
    }

    fn start(&mut self, ctx: &mut OperationContext, input: &PointerInput, target: HitTarget) -> bool {
        if target != HitTarget::Empty {
            return false;
        }
        self.gesture.begin(ctx.part, input);
        self.sweep = Some(Sweep::at(ctx.tick_at(input) - ctx.part.pos()));
        true
    }

    fn update(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        let Some(sweep) = self.sweep else {
            return;
        };
        let next = sweep.extended(ctx.tick_at(input) - ctx.part.pos());
        if next == sweep {
            return;
        }
        self.sweep = Some(next);
        let runs = Self::locked_runs(ctx, &self.gesture, next);
        let Some(mut curve) = self.gesture.snapshot().map(|s| s.pitch().clone()) else {
            return;
        };
        for run in runs {
            curve.insert_run(run);
        }
        self.gesture.changed = self.gesture.snapshot().is_some_and(|s| *s.pitch() != curve);
        ctx.part.with_pitch(|pitch| *pitch = curve);
    }

    fn end(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        self.update(ctx, input);
        self.gesture.finish(ctx.part);
        self.sweep = None;
    }

    fn abort(&mut self, ctx: &mut OperationContext) {
        self.gesture.rollback(ctx.part);
        self.sweep = None;
    }

    fn is_operating(&self) -> bool {
        self.gesture.is_active()
    }
}
