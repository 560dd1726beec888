pub mod curve;
pub mod note;
pub mod part;
pub mod provider;
pub mod synthesis;
pub mod vibrato;

pub use curve::{AutomationTrack, CurvePoint, ParameterCurve, sample_run};
pub use note::{Note, Phoneme};
pub use part::{Part, PartSnapshot, volume_to_level};
pub use provider::PartProvider;
pub use synthesis::{
    Peak, SampleBuffer, SynthesisPiece, SynthesisResult, SynthesisStatus, Waveform,
};
pub use vibrato::Vibrato;
