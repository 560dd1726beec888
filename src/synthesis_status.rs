use crate::axis::TickAxis;
use crate::model::{Part, SynthesisPiece, SynthesisStatus};
use crate::time_utils::TempoMap;

/// Renderer-facing state of a band in the status strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBandKind {
    Pending,
    Running,
    Done,
    Failed,
}

impl From<SynthesisStatus> for StatusBandKind {
    fn from(status: SynthesisStatus) -> Self {
        match status {
            SynthesisStatus::NotSynthesized => StatusBandKind::Pending,
            SynthesisStatus::Synthesizing => StatusBandKind::Running,
            SynthesisStatus::SynthesisSucceeded => StatusBandKind::Done,
            SynthesisStatus::SynthesisFailed => StatusBandKind::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusBand {
    pub x0: f64,
    pub x1: f64,
    pub kind: StatusBandKind,
}

/// Whether a piece spanning `[start_time, end_time]` seconds reaches into the
/// visible tick range. Both ends are inclusive.
pub fn time_range_affects_view(
    start_time: f64,
    end_time: f64,
    axis: &TickAxis,
    tempo: &dyn TempoMap,
) -> bool {
    !(start_time > tempo.time_at(axis.max_visible_tick())
        || end_time < tempo.time_at(axis.min_visible_tick()))
}

pub fn affects_view(piece: &SynthesisPiece, axis: &TickAxis, tempo: &dyn TempoMap) -> bool {
    piece.intersects(
        tempo.time_at(axis.min_visible_tick()),
        tempo.time_at(axis.max_visible_tick()),
    )
}

/// Per-piece x extents for the pieces in view.
pub fn status_bands(part: &Part, axis: &TickAxis) -> Vec<StatusBand> {
    let tempo = part.tempo();
    part.synthesis_pieces()
        .iter()
        .filter(|piece| affects_view(piece, axis, tempo))
        .map(|piece| StatusBand {
            x0: axis.tick_to_x(tempo.tick_at(piece.start_time)).max(0.0),
            x1: axis.tick_to_x(tempo.tick_at(piece.end_time)).min(axis.width()),
            kind: piece.status.into(),
        })
        .collect()
}
