//! Default configuration constants for morselink.
//!
//! Shared by the config layer and the engine components so both agree on
//! the values used when nothing is configured.

/// Default starting speed in words per minute.
///
/// 20 WPM gives a 60 ms dot under the PARIS convention.
pub const INITIAL_WPM: f64 = 20.0;

/// Milliseconds per dot at 1 WPM (PARIS convention: dot = 1200 / WPM).
pub const DOT_MS_PER_WPM: f64 = 1200.0;

/// Number of samples kept in the classifier's learning window.
pub const LEARNING_WINDOW: usize = 100;

/// Default classifier sensitivity (clamped to [0.1, 0.9]).
pub const SENSITIVITY: f64 = 0.3;

/// Lower bound for the classifier sensitivity.
pub const MIN_SENSITIVITY: f64 = 0.1;

/// Upper bound for the classifier sensitivity.
pub const MAX_SENSITIVITY: f64 = 0.9;

/// Side-tone frequency in Hz.
pub const TONE_FREQUENCY_HZ: f32 = 800.0;

/// Output sample rate in Hz.
pub const SAMPLE_RATE: u32 = 48000;

/// Output amplitude (0.0 to 1.0).
pub const AMPLITUDE: f32 = 0.45;

/// Tone attack ramp in milliseconds.
///
/// A sub-millisecond ramp removes the key click without audibly
/// softening short dots.
pub const ATTACK_MS: f32 = 0.35;

/// Tone release ramp in milliseconds.
pub const RELEASE_MS: f32 = 1.0;

/// Default dot length for rendered playback (ms).
pub const DOT_MS: u32 = 60;

/// Default dash length for rendered playback (ms).
pub const DASH_MS: u32 = 180;

/// Default extra silence at a letter boundary (ms).
pub const LETTER_GAP_MS: u32 = 180;

/// Default extra silence at a word boundary (ms).
pub const WORD_GAP_MS: u32 = 420;

/// Number of playback channels owned by the registry.
pub const CHANNEL_COUNT: u8 = 11;

/// Channel that drives the main sink set.
pub const MAIN_CHANNEL: u8 = 5;

/// Animation frame interval of the visual indicator (ms).
pub const VISUAL_FRAME_MS: u32 = 40;

/// Interval between playback progress ticks (ms). Must stay at or below 100.
pub const PROGRESS_INTERVAL_MS: u64 = 80;

/// Shortest press a channel will schedule (ms).
pub const MIN_PLAY_MS: u32 = 1;

/// Shortest gap a channel will schedule (ms).
pub const MIN_GAP_MS: u32 = 0;

/// Placeholder emitted by the decoder for code groups missing from the table.
pub const UNKNOWN_PLACEHOLDER: &str = "[?]";
