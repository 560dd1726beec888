use std::collections::{HashMap, HashSet};

use super::{Edge, Gesture, Operation, OperationContext, OperationKind, PointerInput, resized};
use crate::constants::{
    DRAG_THRESHOLD, MAX_VIBRATO_FREQUENCY, MIN_VIBRATO_FREQUENCY, VIBRATO_FREQUENCY_PER_PIXEL,
    VIBRATO_PHASE_PER_PIXEL,
};
use crate::hit_test::HitTarget;
use crate::model::{Part, Vibrato};
use crate::time_utils::Tick;

fn selected_ids(vibratos: &[Vibrato]) -> HashSet<u64> {
    vibratos.iter().filter(|v| v.selected).map(|v| v.id).collect()
}

fn grab(part: &mut Part, id: u64) -> Option<&Vibrato> {
    let selected = part.vibratos().iter().find(|v| v.id == id)?.selected;
    if !selected {
        part.select_vibratos(|v| v.id == id);
    }
    part.vibratos().iter().find(|v| v.id == id)
}

/// Horizontal band selection of vibratos. Same click rules as note selection.
#[derive(Debug, Default)]
pub struct VibratoSelect {
    press: Option<PointerInput>,
    dragging: bool,
    additive: bool,
    toggled: bool,
    before: HashSet<u64>,
    base: HashSet<u64>,
}

impl Operation for VibratoSelect {
    fn kind(&self) -> OperationKind {
        OperationKind::VibratoSelect
    }

    fn start(&mut self, ctx: &mut OperationContext, input: &PointerInput, target: HitTarget) -> bool {
        let toggle = input.modifiers.command || input.modifiers.ctrl;
        self.before = selected_ids(ctx.part.vibratos());
        match target {
            HitTarget::Empty => {}
            HitTarget::Vibrato(id) if toggle => {
                ctx.part
                    .select_vibratos(|v| if v.id == id { !v.selected } else { v.selected });
                self.toggled = true;
            }
            _ => return false,
        }
        self.additive = toggle;
        self.base = if toggle {
            selected_ids(ctx.part.vibratos())
        } else {
            HashSet::new()
        };
        self.press = Some(*input);
        true
    }

    fn update(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        let Some(press) = self.press else {
            return;
        };
        if !self.dragging && press.pos.distance(input.pos) < DRAG_THRESHOLD {
            return;
        }
        self.dragging = true;
        let part_pos = ctx.part.pos();
        let (a, b) = (ctx.tick_at(&press), ctx.tick_at(input));
        let (t0, t1) = (a.min(b), a.max(b));
        let base = &self.base;
        ctx.part.select_vibratos(|v| {
            (part_pos + v.pos < t1 && part_pos + v.end_pos() > t0) || base.contains(&v.id)
        });
    }

    fn end(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        self.update(ctx, input);
        if !self.dragging && !self.additive && !self.toggled {
            ctx.part.select_vibratos(|_| false);
        }
        *self = Self::default();
    }

    fn abort(&mut self, ctx: &mut OperationContext) {
        let before = std::mem::take(&mut self.before);
        ctx.part.select_vibratos(|v| before.contains(&v.id));
        *self = Self::default();
    }

    fn is_operating(&self) -> bool {
        self.press.is_some()
    }
}

/// Drags the selected vibratos along the time axis.
#[derive(Debug, Default)]
pub struct VibratoMove {
    gesture: Gesture,
    anchor: Tick,
    origins: HashMap<u64, Tick>,
    applied: Tick,
}

impl Operation for VibratoMove {
    fn kind(&self) -> OperationKind {
        OperationKind::VibratoMove
    }

    fn start(&mut self, ctx: &mut OperationContext, input: &PointerInput, target: HitTarget) -> bool {
        let HitTarget::Vibrato(id) = target else {
            return false;
        };
        self.gesture.begin(ctx.part, input);
        let Some(pos) = grab(ctx.part, id).map(|v| v.pos) else {
            self.gesture.rollback(ctx.part);
            return false;
        };
        self.anchor = ctx.part.pos() + pos;
        self.origins = ctx
            .part
            .vibratos()
            .iter()
            .filter(|v| v.selected)
            .map(|v| (v.id, v.pos))
            .collect();
        self.applied = 0.0;
        true
    }

    fn update(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        let Some(press) = self.gesture.press else {
            return;
        };
        let delta = ctx.snapped_delta(self.anchor, ctx.drag_ticks(&press, input));
        if delta == self.applied {
            return;
        }
        self.applied = delta;
        let origins = &self.origins;
        ctx.part.with_vibratos(|vibratos| {
            for vibrato in vibratos.iter_mut() {
                if let Some(&pos) = origins.get(&vibrato.id) {
                    vibrato.pos = pos + delta;
                }
            }
        });
        self.gesture.changed = delta != 0.0;
    }

    fn end(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        self.update(ctx, input);
        self.gesture.finish(ctx.part);
        self.origins.clear();
    }

    fn abort(&mut self, ctx: &mut OperationContext) {
        self.gesture.rollback(ctx.part);
        self.origins.clear();
    }

    fn is_operating(&self) -> bool {
        self.gesture.is_active()
    }
}

/// Drags the start or end of the selected vibratos.
#[derive(Debug)]
pub struct VibratoResize {
    edge: Edge,
    gesture: Gesture,
    anchor: Tick,
    origins: HashMap<u64, (Tick, Tick)>,
    applied: Option<Tick>,
}

impl VibratoResize {
    pub fn new(edge: Edge) -> Self {
        Self {
            edge,
            gesture: Gesture::default(),
            anchor: 0.0,
            origins: HashMap::new(),
            applied: None,
        }
    }
}

impl Operation for VibratoResize {
    fn kind(&self) -> OperationKind {
        match self.edge {
            Edge::Start => OperationKind::VibratoStartResize,
            Edge::End => OperationKind::VibratoEndResize,
        }
    }

    fn start(&mut self, ctx: &mut OperationContext, input: &PointerInput, target: HitTarget) -> bool {
        let HitTarget::Vibrato(id) = target else {
            return false;
        };
        self.gesture.begin(ctx.part, input);
        let edge = self.edge;
        let Some(local) = grab(ctx.part, id).map(|v| match edge {
            Edge::Start => v.pos,
            Edge::End => v.end_pos(),
        }) else {
            self.gesture.rollback(ctx.part);
            return false;
        };
        self.anchor = ctx.part.pos() + local;
        self.origins = ctx
            .part
            .vibratos()
            .iter()
            .filter(|v| v.selected)
            .map(|v| (v.id, (v.pos, v.dur)))
            .collect();
        self.applied = None;
        true
    }

    fn update(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        let Some(press) = self.gesture.press else {
            return;
        };
        let delta = ctx.snapped_delta(self.anchor, ctx.drag_ticks(&press, input));
        if self.applied == Some(delta) {
            return;
        }
        self.applied = Some(delta);
        let min_dur = ctx.cell_ticks_at(self.anchor + delta);
        let (edge, origins) = (self.edge, &self.origins);
        self.gesture.changed = ctx.part.with_vibratos(|vibratos| {
            let mut changed = false;
            for vibrato in vibratos.iter_mut() {
                if let Some(&(pos, dur)) = origins.get(&vibrato.id) {
                    (vibrato.pos, vibrato.dur) = resized(edge, pos, dur, delta, min_dur);
                    changed |= (vibrato.pos, vibrato.dur) != (pos, dur);
                }
            }
            changed
        });
    }

    fn end(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        self.update(ctx, input);
        self.gesture.finish(ctx.part);
        self.origins.clear();
    }

    fn abort(&mut self, ctx: &mut OperationContext) {
        self.gesture.rollback(ctx.part);
        self.origins.clear();
    }

    fn is_operating(&self) -> bool {
        self.gesture.is_active()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handle {
    Amplitude,
    Frequency,
    Phase,
}

/// Drags one of the handles of a single vibrato.
///
/// Amplitude follows the pointer in semitones, frequency climbs as the
/// pointer rises and phase wraps around as it moves sideways.
#[derive(Debug)]
pub struct VibratoParameter {
    handle: Handle,
    gesture: Gesture,
    target: Option<(u64, f64)>,
    applied: f64,
}

impl VibratoParameter {
    pub fn amplitude() -> Self {
        Self::new(Handle::Amplitude)
    }

    pub fn frequency() -> Self {
        Self::new(Handle::Frequency)
    }

    pub fn phase() -> Self {
        Self::new(Handle::Phase)
    }

    fn new(handle: Handle) -> Self {
        Self {
            handle,
            gesture: Gesture::default(),
            target: None,
            applied: f64::NAN,
        }
    }

    fn read(&self, vibrato: &Vibrato) -> f64 {
        match self.handle {
            Handle::Amplitude => vibrato.amplitude,
            Handle::Frequency => vibrato.frequency,
            Handle::Phase => vibrato.phase,
        }
    }

    fn value(&self, origin: f64, dx: f64, dy: f64, key_height: f64) -> f64 {
        match self.handle {
            Handle::Amplitude => (origin + dy / key_height).max(0.0),
            Handle::Frequency => (origin + dy * VIBRATO_FREQUENCY_PER_PIXEL)
                .clamp(MIN_VIBRATO_FREQUENCY, MAX_VIBRATO_FREQUENCY),
            Handle::Phase => (origin + dx * VIBRATO_PHASE_PER_PIXEL).rem_euclid(1.0),
        }
    }
}

impl Operation for VibratoParameter {
    fn kind(&self) -> OperationKind {
        match self.handle {
            Handle::Amplitude => OperationKind::VibratoAmplitude,
            Handle::Frequency => OperationKind::VibratoFrequency,
            Handle::Phase => OperationKind::VibratoPhase,
        }
    }

    fn start(&mut self, ctx: &mut OperationContext, input: &PointerInput, target: HitTarget) -> bool {
        let HitTarget::Vibrato(id) = target else {
            return false;
        };
        let Some(origin) = ctx
            .part
            .vibratos()
            .iter()
            .find(|v| v.id == id)
            .map(|v| self.read(v))
        else {
            return false;
        };
        self.gesture.begin(ctx.part, input);
        self.target = Some((id, origin));
        self.applied = origin;
        true
    }

    fn update(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        let (Some(press), Some((id, origin))) = (self.gesture.press, self.target) else {
            return;
        };
        let value = self.value(
            origin,
            input.x() - press.x(),
            press.y() - input.y(),
            ctx.view.pitch_axis.key_height(),
        );
        if value == self.applied {
            return;
        }
        self.applied = value;
        let handle = self.handle;
        ctx.part.with_vibratos(|vibratos| {
            if let Some(vibrato) = vibratos.iter_mut().find(|v| v.id == id) {
                match handle {
                    Handle::Amplitude => vibrato.amplitude = value,
                    Handle::Frequency => vibrato.frequency = value,
                    Handle::Phase => vibrato.phase = value,
                }
            }
        });
        self.gesture.changed = value != origin;
    }

    fn end(&mut self, ctx: &mut OperationContext, input: &PointerInput) {
        self.update(ctx, input);
        self.gesture.finish(ctx.part);
        self.target = None;
    }

    fn abort(&mut self, ctx: &mut OperationContext) {
        self.gesture.rollback(ctx.part);
        self.target = None;
    }

    fn is_operating(&self) -> bool {
        self.gesture.is_active()
    }
}
