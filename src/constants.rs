// Musical time
pub const RESOLUTION: f64 = 480.0; // ticks per quarter note
pub const DEFAULT_BPM: f64 = 120.0;
pub const DEFAULT_NUMERATOR: u32 = 4;
pub const DEFAULT_DENOMINATOR: u32 = 4;

// Grid Constants
pub const MIN_GRID_GAP: f32 = 12.0;
pub const MIN_REALITY_GRID_GAP: f32 = 24.0;
pub const MAX_QUANTIZATION_DIVISION: u32 = 32;
pub const QUANTIZATION_BASES: &[u32] = &[1, 2, 3, 4, 6, 8];

// Axis Constants
pub const DEFAULT_PIXELS_PER_TICK: f64 = 96.0 / RESOLUTION; // 96 px per beat
pub const MIN_PIXELS_PER_TICK: f64 = 1.0 / 256.0;
pub const MAX_PIXELS_PER_TICK: f64 = 8.0;
pub const DEFAULT_KEY_HEIGHT: f64 = 16.0;
pub const MIN_KEY_HEIGHT: f64 = 4.0;
pub const MAX_KEY_HEIGHT: f64 = 64.0;
pub const DEFAULT_TOP_PITCH: f64 = 84.0;

// Interaction Constants
pub const NOTE_EDGE_THRESHOLD: f32 = 8.0;
pub const VIBRATO_HANDLE_RADIUS: f32 = 6.0;
pub const WAVEFORM_HANDLE_THRESHOLD: f32 = 4.0;
pub const PARAMETER_PASTE_BLEND: f64 = 5.0; // ticks
pub const PITCH_DRAW_STEP: f64 = 1.0; // ticks between drawn samples
pub const DRAG_THRESHOLD: f32 = 2.0;

// Waveform Constants
pub const WAVEFORM_HEIGHT: f32 = 64.0;
pub const MIN_PHONEME_DURATION: f64 = 0.01; // seconds

// Fade ranges, in scale levels (log2 of pixels per tick)
pub const PITCH_FADE_START: f64 = -6.7;
pub const PITCH_FADE_END: f64 = -4.3;
pub const PHONEME_FADE_START: f64 = -4.7;
pub const PHONEME_FADE_END: f64 = -2.3;
pub const BEAT_FADE_START: f32 = 6.0;
pub const BEAT_FADE_END: f32 = 12.0;

// Vibrato envelope
pub const VIBRATO_ATTACK_TICKS: f64 = 60.0;
pub const VIBRATO_RELEASE_TICKS: f64 = 60.0;

// Vibrato handles
pub const VIBRATO_HANDLE_GAP: f64 = 16.0; // px between the amplitude handle and the others
pub const VIBRATO_FREQUENCY_PER_PIXEL: f64 = 0.05; // Hz
pub const VIBRATO_PHASE_PER_PIXEL: f64 = 0.01; // cycles
pub const MIN_VIBRATO_FREQUENCY: f64 = 0.1;
pub const MAX_VIBRATO_FREQUENCY: f64 = 20.0;

// Volume automation
pub const VOLUME_AUTOMATION_ID: &str = "volume";
pub const VOLUME_RANGE_DB: f64 = 12.0;

// File names
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const SHORTCUTS_FILE_NAME: &str = "shortcuts.json";
