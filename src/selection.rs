use crate::time_utils::Tick;

/// Tick range picked with the range tool, in global ticks.
///
/// `start` may be greater than `end` after a leftward drag; readers go
/// through [`Selection::range`], which normalizes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Selection {
    pub start: Tick,
    pub end: Tick,
    active: bool,
}

impl Selection {
    pub fn activate(&mut self, start: Tick, end: Tick) {
        self.start = start;
        self.end = end;
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Active with a non-zero width.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active && self.start != self.end
    }

    #[inline]
    pub fn duration(&self) -> Tick {
        (self.end - self.start).abs()
    }

    /// Normalized `(min, max)` in global ticks when active.
    pub fn range(&self) -> Option<(Tick, Tick)> {
        self.is_active()
            .then(|| (self.start.min(self.end), self.start.max(self.end)))
    }

    /// Like [`range`](Self::range), shifted into a part's local ticks.
    pub fn local_range(&self, part_pos: Tick) -> Option<(Tick, Tick)> {
        self.range().map(|(s, e)| (s - part_pos, e - part_pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_drag_is_normalized() {
        let mut sel = Selection::default();
        sel.activate(960.0, 480.0);
        assert_eq!(sel.range(), Some((480.0, 960.0)));
        assert_eq!(sel.duration(), 480.0);
        assert_eq!(sel.local_range(100.0), Some((380.0, 860.0)));
    }

    #[test]
    fn zero_width_counts_as_inactive() {
        let mut sel = Selection::default();
        sel.activate(480.0, 480.0);
        assert!(!sel.is_active());
        assert_eq!(sel.range(), None);
    }

    #[test]
    fn deactivate_clears_range() {
        let mut sel = Selection::default();
        sel.activate(0.0, 10.0);
        sel.deactivate();
        assert!(sel.range().is_none());
    }
}
