use super::{Operation, OperationContext, OperationKind, PointerInput};
use crate::hit_test::HitTarget;
use crate::time_utils::Tick;

/// Drags the view. Works in every tool and never touches the part.
#[derive(Debug, Default)]
pub struct Pan {
    last: Option<PointerInput>,
    origin: Option<(Tick, f64)>,
}

impl Operation for Pan {
    fn kind(&self) -> OperationKind {
        OperationKind::Pan
    }

    fn start(&mut self, ctx: &mut OperationContext, input: &PointerInput, _target: HitTarget) -> bool {
        self.origin = Some((ctx.view.tick_axis.start(), ctx.view.pitch_axis.top_pitch()));
        self.last = Some(*input);
        true
    }

    fn update(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        let Some(last) = self.last.replace(*input) else {
            return;
        };
        let delta = input.pos - last.pos;
        ctx.view.tick_axis.pan_by(delta.x as f64);
        ctx.view.pitch_axis.pan_by(delta.y as f64);
    }

    fn end(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        self.update(ctx, input);
        self.last = None;
        self.origin = None;
    }

    fn abort(&mut self, ctx: &mut OperationContext) {
        if let Some((start, top)) = self.origin.take() {
            ctx.view.tick_axis.set_start(start);
            ctx.view.pitch_axis.set_top_pitch(top);
        }
        self.last = None;
    }

    fn is_operating(&self) -> bool {
        self.last.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use egui::{Modifiers, PointerButton, pos2};

    fn middle(x: f32, y: f32) -> PointerInput {
        PointerInput::new(pos2(x, y), Modifiers::NONE, PointerButton::Middle)
    }

    #[test]
    fn follows_the_pointer_and_leaves_data_alone() {
        let mut fx = Fixture::new().with_notes(&[(0.0, 480.0, 60)]);
        let mut pan = Pan::default();
        assert!(pan.start(&mut fx.ctx(), &middle(100.0, 100.0), HitTarget::Empty));
        pan.update(&mut fx.ctx(), &middle(60.0, 120.0));
        pan.update(&mut fx.ctx(), &middle(60.0, 120.0));
        // 40 px left at 0.25 px per tick, 20 px down at 10 px per key.
        assert_eq!(fx.view.tick_axis.start(), 160.0);
        assert_eq!(fx.view.pitch_axis.top_pitch(), 74.0);
        pan.end(&mut fx.ctx(), &middle(60.0, 120.0));
        assert!(!pan.is_operating());
        assert_eq!(fx.part.commit_count(), 0);
    }

    #[test]
    fn abort_puts_the_view_back() {
        let mut fx = Fixture::new();
        let mut pan = Pan::default();
        pan.start(&mut fx.ctx(), &middle(100.0, 100.0), HitTarget::Empty);
        pan.update(&mut fx.ctx(), &middle(0.0, 0.0));
        pan.abort(&mut fx.ctx());
        assert_eq!(fx.view.tick_axis.start(), 0.0);
        assert_eq!(fx.view.pitch_axis.top_pitch(), 72.0);
    }
}
