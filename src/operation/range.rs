use super::{Operation, OperationContext, OperationKind, PointerInput};
use crate::hit_test::HitTarget;
use crate::selection::Selection;
use crate::time_utils::Tick;

/// Picks a tick range on the grid. A plain click drops the range.
#[derive(Debug, Default)]
pub struct RangeSelect {
    anchor: Option<Tick>,
    before: Selection,
}

impl Operation for RangeSelect {
    fn kind(&self) -> OperationKind {
        OperationKind::RangeSelect
    }

    fn start(&mut self, ctx: &mut OperationContext, input: &PointerInput, target: HitTarget) -> bool {
        if target != HitTarget::Empty {
            return false;
        }
        self.before = *ctx.selection;
        self.anchor = Some(ctx.quantized_tick_at(input));
        true
    }

    fn update(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        if let Some(anchor) = self.anchor {
            let tick = ctx.quantized_tick_at(input);
            ctx.selection.activate(anchor, tick);
        }
    }

    fn end(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        self.update(ctx, input);
        if !ctx.selection.is_active() {
            ctx.selection.deactivate();
        }
        if let Some((start, end)) = ctx.selection.range() {
            log::debug!("Range selected {}..{}", start, end);
        }
        self.anchor = None;
    }

    fn abort(&mut self, ctx: &mut OperationContext) {
        *ctx.selection = self.before;
        self.anchor = None;
    }

    fn is_operating(&self) -> bool {
        self.anchor.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn drag_left_is_normalized_and_snapped() {
        let mut fx = Fixture::new();
        let mut op = RangeSelect::default();
        op.start(&mut fx.ctx(), &at(250.0, 300.0), HitTarget::Empty);
        op.update(&mut fx.ctx(), &at(118.0, 300.0));
        op.end(&mut fx.ctx(), &at(118.0, 300.0));
        assert_eq!(fx.selection.range(), Some((480.0, 960.0)));
        assert_eq!(fx.part.commit_count(), 0);
    }

    #[test]
    fn click_clears_and_abort_restores() {
        let mut fx = Fixture::new();
        fx.selection.activate(0.0, 480.0);
        let mut op = RangeSelect::default();
        op.start(&mut fx.ctx(), &at(300.0, 300.0), HitTarget::Empty);
        op.update(&mut fx.ctx(), &at(600.0, 300.0));
        op.abort(&mut fx.ctx());
        assert_eq!(fx.selection.range(), Some((0.0, 480.0)));

        op.start(&mut fx.ctx(), &at(300.0, 300.0), HitTarget::Empty);
        op.end(&mut fx.ctx(), &at(301.0, 300.0));
        assert_eq!(fx.selection.range(), None);
    }
}
