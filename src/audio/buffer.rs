//! Interleaved 16-bit stereo sample buffer.

use crate::error::{MorseError, Result};
use std::time::Duration;

/// Largest buffer, in frames, whose sample count still fits a WAV file.
pub const MAX_FRAMES: usize = (u32::MAX / 2) as usize;

/// Caps a frame count at [`MAX_FRAMES`].
fn capped(frames: usize) -> usize {
    if frames > MAX_FRAMES {
        log::warn!("{} frames requested, capping at {}", frames, MAX_FRAMES);
        MAX_FRAMES
    } else {
        frames
    }
}

/// Interleaved `[left, right, left, right, ...]` 16-bit samples at a known
/// sample rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StereoBuffer {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl StereoBuffer {
    /// Empty buffer.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
        }
    }

    /// Zero-filled buffer of `frames` frames, at most [`MAX_FRAMES`].
    pub fn silent(frames: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![0; capped(frames) * 2],
            sample_rate,
        }
    }

    /// Wraps already interleaved samples. Fails on an odd sample count.
    pub fn from_interleaved(samples: Vec<i16>, sample_rate: u32) -> Result<Self> {
        if samples.len() % 2 != 0 {
            return Err(MorseError::AudioOutput {
                message: format!(
                    "interleaved stereo needs an even sample count, got {}",
                    samples.len()
                ),
            });
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Duplicates each mono sample into both channels.
    pub fn from_mono(mono: &[i16], sample_rate: u32) -> Self {
        let samples = mono.iter().flat_map(|&s| [s, s]).collect();
        Self {
            samples,
            sample_rate,
        }
    }

    pub(crate) fn with_capacity(frames: usize, sample_rate: u32) -> Self {
        Self {
            samples: Vec::with_capacity(capped(frames) * 2),
            sample_rate,
        }
    }

    pub(crate) fn push_frame(&mut self, sample: i16) {
        self.samples.push(sample);
        self.samples.push(sample);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of stereo frames.
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playing time at the buffer's sample rate.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Appends `other`, which must share this buffer's sample rate.
    pub fn append(&mut self, other: &StereoBuffer) -> Result<()> {
        if other.sample_rate != self.sample_rate {
            return Err(MorseError::AudioOutput {
                message: format!(
                    "cannot append {} Hz audio to a {} Hz buffer",
                    other.sample_rate, self.sample_rate
                ),
            });
        }
        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }

    /// Interleaved samples.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }

    pub fn left_channel(&self) -> Vec<i16> {
        self.samples.iter().step_by(2).copied().collect()
    }

    pub fn right_channel(&self) -> Vec<i16> {
        self.samples.iter().skip(1).step_by(2).copied().collect()
    }
}
