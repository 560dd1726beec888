pub mod axis;
pub mod clipboard;
pub mod config;
pub mod constants;
pub mod editor;
pub mod error;
pub mod idgen;
pub mod input;
pub mod messages;
pub mod model;
pub mod operation;
pub mod paths;
pub mod pitch;
pub mod quantization;
pub mod selection;
pub mod synthesis_status;
pub mod time_utils;
pub mod view;
pub mod waveform;

pub use editor::{EditScope, Invalidation, PartEditor, PianoGrid};
