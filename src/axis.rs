use crate::constants::*;
use crate::messages::Event;
use crate::time_utils::Tick;

/// Horizontal transform between ticks and pixels.
///
/// `x = (tick - start) * pixels_per_tick`, with `start` the tick shown at x = 0.
#[derive(Debug)]
pub struct TickAxis {
    start: Tick,
    pixels_per_tick: f64,
    width: f64,
    pub changed: Event<()>,
}

impl Default for TickAxis {
    fn default() -> Self {
        Self::new(0.0, DEFAULT_PIXELS_PER_TICK, 0.0)
    }
}

impl TickAxis {
    pub fn new(start: Tick, pixels_per_tick: f64, width: f64) -> Self {
        Self {
            start,
            pixels_per_tick: pixels_per_tick.clamp(MIN_PIXELS_PER_TICK, MAX_PIXELS_PER_TICK),
            width: width.max(0.0),
            changed: Event::new(),
        }
    }

    #[inline]
    pub fn tick_to_x(&self, tick: Tick) -> f64 {
        (tick - self.start) * self.pixels_per_tick
    }

    #[inline]
    pub fn x_to_tick(&self, x: f64) -> Tick {
        self.start + x / self.pixels_per_tick
    }

    /// First visible tick, inclusive.
    #[inline]
    pub fn min_visible_tick(&self) -> Tick {
        self.x_to_tick(0.0)
    }

    /// Last visible tick, inclusive.
    #[inline]
    pub fn max_visible_tick(&self) -> Tick {
        self.x_to_tick(self.width)
    }

    #[inline]
    pub fn is_visible(&self, tick: Tick) -> bool {
        tick >= self.min_visible_tick() && tick <= self.max_visible_tick()
    }

    #[inline]
    pub fn pixels_per_tick(&self) -> f64 {
        self.pixels_per_tick
    }

    #[inline]
    pub fn pixels_per_beat(&self, ticks_per_beat: f64) -> f64 {
        self.pixels_per_tick * ticks_per_beat
    }

    /// log2 of the zoom; fades are keyed on this.
    #[inline]
    pub fn scale_level(&self) -> f64 {
        self.pixels_per_tick.log2()
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[inline]
    pub fn start(&self) -> Tick {
        self.start
    }

    pub fn set_width(&mut self, width: f64) {
        let width = width.max(0.0);
        if self.width != width {
            self.width = width;
            self.changed.emit(());
        }
    }

    pub fn set_start(&mut self, start: Tick) {
        if self.start != start {
            self.start = start;
            self.changed.emit(());
        }
    }

    pub fn pan_by(&mut self, dx: f64) {
        self.set_start(self.start - dx / self.pixels_per_tick);
    }

    /// Multiplies the zoom by `factor`, keeping the tick under `pivot_x` in place.
    pub fn zoom_at(&mut self, pivot_x: f64, factor: f64) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let pivot = self.x_to_tick(pivot_x);
        let ppt = (self.pixels_per_tick * factor).clamp(MIN_PIXELS_PER_TICK, MAX_PIXELS_PER_TICK);
        if ppt == self.pixels_per_tick {
            return;
        }
        self.pixels_per_tick = ppt;
        self.start = pivot - pivot_x / ppt;
        self.changed.emit(());
    }
}

/// Vertical transform between pitch (semitones) and pixels. Higher pitch is
/// nearer the top.
#[derive(Debug)]
pub struct PitchAxis {
    top_pitch: f64,
    key_height: f64,
    height: f64,
    pub changed: Event<()>,
}

impl Default for PitchAxis {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_PITCH, DEFAULT_KEY_HEIGHT, 0.0)
    }
}

impl PitchAxis {
    pub fn new(top_pitch: f64, key_height: f64, height: f64) -> Self {
        Self {
            top_pitch,
            key_height: key_height.clamp(MIN_KEY_HEIGHT, MAX_KEY_HEIGHT),
            height: height.max(0.0),
            changed: Event::new(),
        }
    }

    #[inline]
    pub fn pitch_to_y(&self, pitch: f64) -> f64 {
        (self.top_pitch - pitch) * self.key_height
    }

    #[inline]
    pub fn y_to_pitch(&self, y: f64) -> f64 {
        self.top_pitch - y / self.key_height
    }

    #[inline]
    pub fn min_visible_pitch(&self) -> f64 {
        self.y_to_pitch(self.height)
    }

    #[inline]
    pub fn max_visible_pitch(&self) -> f64 {
        self.top_pitch
    }

    #[inline]
    pub fn key_height(&self) -> f64 {
        self.key_height
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn set_height(&mut self, height: f64) {
        let height = height.max(0.0);
        if self.height != height {
            self.height = height;
            self.changed.emit(());
        }
    }

    #[inline]
    pub fn top_pitch(&self) -> f64 {
        self.top_pitch
    }

    pub fn set_top_pitch(&mut self, top_pitch: f64) {
        if self.top_pitch != top_pitch {
            self.top_pitch = top_pitch;
            self.changed.emit(());
        }
    }

    pub fn pan_by(&mut self, dy: f64) {
        if dy != 0.0 {
            self.top_pitch += dy / self.key_height;
            self.changed.emit(());
        }
    }

    pub fn zoom_at(&mut self, pivot_y: f64, factor: f64) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let pivot = self.y_to_pitch(pivot_y);
        let kh = (self.key_height * factor).clamp(MIN_KEY_HEIGHT, MAX_KEY_HEIGHT);
        if kh == self.key_height {
            return;
        }
        self.key_height = kh;
        self.top_pitch = pivot + pivot_y / kh;
        self.changed.emit(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn tick_roundtrip_over_viewport() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let axis = TickAxis::new(
                rng.random_range(-5000.0..50000.0),
                rng.random_range(MIN_PIXELS_PER_TICK..MAX_PIXELS_PER_TICK),
                1200.0,
            );
            let x: f64 = rng.random_range(0.0..axis.width());
            let back = axis.tick_to_x(axis.x_to_tick(x));
            assert!((back - x).abs() < 1e-6, "x {} came back as {}", x, back);
        }
    }

    #[test]
    fn pitch_roundtrip_over_viewport() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let axis = PitchAxis::new(
                rng.random_range(40.0..100.0),
                rng.random_range(MIN_KEY_HEIGHT..MAX_KEY_HEIGHT),
                800.0,
            );
            let y: f64 = rng.random_range(0.0..axis.height());
            let back = axis.pitch_to_y(axis.y_to_pitch(y));
            assert!((back - y).abs() < 1e-9);
        }
    }

    #[test]
    fn visible_range_is_inclusive() {
        let axis = TickAxis::new(480.0, 0.5, 1000.0);
        assert_eq!(axis.min_visible_tick(), 480.0);
        assert_eq!(axis.max_visible_tick(), 2480.0);
        assert!(axis.is_visible(480.0));
        assert!(axis.is_visible(2480.0));
        assert!(!axis.is_visible(2480.5));
    }

    #[test]
    fn zoom_keeps_pivot_fixed() {
        let mut axis = TickAxis::new(0.0, 0.2, 1000.0);
        let before = axis.x_to_tick(300.0);
        axis.zoom_at(300.0, 2.0);
        assert!((axis.x_to_tick(300.0) - before).abs() < 1e-9);
        assert!((axis.pixels_per_tick() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn higher_pitch_is_higher_on_screen() {
        let axis = PitchAxis::new(72.0, 10.0, 400.0);
        assert!(axis.pitch_to_y(70.0) < axis.pitch_to_y(60.0));
        assert_eq!(axis.min_visible_pitch(), 32.0);
    }

    #[test]
    fn changes_are_published() {
        let mut axis = TickAxis::default();
        let rx = axis.changed.subscribe();
        axis.pan_by(10.0);
        axis.set_width(100.0);
        axis.set_width(100.0);
        assert_eq!(rx.try_iter().count(), 2);
    }
}
