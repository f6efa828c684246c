//! morselink - Real-time Morse engine
//!
//! Text/Morse codec, adaptive dot/dash classification of keyed timing,
//! sidetone synthesis and drift-free multi-channel playback.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod classifier;
pub mod codec;
pub mod config;
pub mod defaults;
pub mod error;
pub mod playback;

// Codec
pub use codec::{Glyph, MorseCodec, MorseSymbol, Prosign};

// Receive side
pub use classifier::{AdaptiveClassifier, Classification, ClassifierConfig, ReceiveAssembler};

// Audio
pub use audio::{
    AudioOutput, ElementTiming, PlaybackEvent, Player, StereoBuffer, ToneConfig, ToneSynthesizer,
    VirtualOutput,
};

// Playback channels
pub use playback::{
    ChannelRegistry, ChannelScheduler, ChannelSinks, Emitter, ErrorReporter, PlaybackItem,
    TimingMessage,
};

// Error handling
pub use error::{MorseError, Result};

// Config
pub use config::{Config, PlaybackConfig};

/// Build version string with optional git commit hash.
///
/// Returns `"0.3.0+abc1234"` when git hash is available, `"0.3.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
