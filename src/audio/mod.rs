//! Tone synthesis, audio outputs and buffer playback.

pub mod buffer;
#[cfg(feature = "cpal-audio")]
pub mod cpal_output;
pub mod output;
pub mod player;
pub mod synth;
pub mod wav;

pub use buffer::StereoBuffer;
#[cfg(feature = "cpal-audio")]
pub use cpal_output::CpalOutput;
pub use output::{AudioOutput, PlaybackId, SharedOutput, ToneCall, VirtualOutput, shared};
pub use player::{PlaybackEvent, PlaybackHandle, Player};
pub use synth::{ElementTiming, Envelope, ToneConfig, ToneSynthesizer};
pub use wav::{read_wav, save_wav, write_wav};
