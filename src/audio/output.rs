//! Audio output handles.
//!
//! An [`AudioOutput`] is owned explicitly and passed to whatever plays
//! sound, so several engines can run side by side without contending for
//! a process-wide device.

use crate::audio::buffer::StereoBuffer;
use crate::error::{MorseError, Result};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Identifies one [`AudioOutput::play_buffer`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackId(pub u64);

/// A device (or stand-in) that can key a side tone and play rendered buffers.
pub trait AudioOutput: Send {
    fn sample_rate(&self) -> u32;

    /// Starts a continuous tone, optionally stopping by itself after
    /// `duration_ms`.
    fn start_tone(&mut self, frequency_hz: f32, duration_ms: Option<u32>) -> Result<()>;

    fn stop_tone(&mut self) -> Result<()>;

    /// Starts playing `buffer`, replacing anything already playing.
    fn play_buffer(&mut self, buffer: &StereoBuffer) -> Result<PlaybackId>;

    /// Frames of buffer `id` consumed so far, or `None` once `id` was
    /// stopped or replaced by another buffer.
    fn frames_played(&self, id: PlaybackId) -> Option<u64>;

    fn stop_buffer(&mut self) -> Result<()>;

    /// Name for logging.
    fn name(&self) -> &'static str {
        "audio"
    }
}

/// Output handle shared between a player and tone emitters.
pub type SharedOutput = Arc<Mutex<dyn AudioOutput>>;

/// Wraps an output for sharing.
pub fn shared<O: AudioOutput + 'static>(output: O) -> SharedOutput {
    Arc::new(Mutex::new(output))
}

/// A tone call recorded by [`VirtualOutput`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToneCall {
    Start {
        frequency_hz: f32,
        duration_ms: Option<u32>,
    },
    Stop,
}

/// In-memory output for headless use and tests.
///
/// Buffers are "consumed" in step with the wall clock. Tone calls are
/// recorded. A failing instance rejects every call, which lets callers
/// exercise their error paths.
#[derive(Debug)]
pub struct VirtualOutput {
    sample_rate: u32,
    tone_calls: Vec<ToneCall>,
    tone_active: bool,
    current: Option<CurrentBuffer>,
    next_id: u64,
    failing: bool,
}

#[derive(Debug, Clone, Copy)]
struct CurrentBuffer {
    id: PlaybackId,
    frames: u64,
    started: Instant,
}

impl CurrentBuffer {
    fn consumed(&self, sample_rate: u32) -> u64 {
        let elapsed = self.started.elapsed().as_secs_f64() * sample_rate as f64;
        (elapsed as u64).min(self.frames)
    }
}

impl VirtualOutput {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            tone_calls: Vec::new(),
            tone_active: false,
            current: None,
            next_id: 0,
            failing: false,
        }
    }

    /// An output whose every operation fails.
    pub fn failing(sample_rate: u32) -> Self {
        Self {
            failing: true,
            ..Self::new(sample_rate)
        }
    }

    pub fn tone_calls(&self) -> &[ToneCall] {
        &self.tone_calls
    }

    pub fn is_tone_active(&self) -> bool {
        self.tone_active
    }

    pub fn is_playing(&self) -> bool {
        self.current
            .is_some_and(|c| c.consumed(self.sample_rate) < c.frames)
    }

    fn check(&self, operation: &str) -> Result<()> {
        if self.failing {
            return Err(MorseError::AudioOutput {
                message: format!("virtual output rejected {operation}"),
            });
        }
        Ok(())
    }
}

impl AudioOutput for VirtualOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn start_tone(&mut self, frequency_hz: f32, duration_ms: Option<u32>) -> Result<()> {
        self.check("start_tone")?;
        self.tone_calls.push(ToneCall::Start {
            frequency_hz,
            duration_ms,
        });
        self.tone_active = true;
        Ok(())
    }

    fn stop_tone(&mut self) -> Result<()> {
        self.check("stop_tone")?;
        self.tone_calls.push(ToneCall::Stop);
        self.tone_active = false;
        Ok(())
    }

    fn play_buffer(&mut self, buffer: &StereoBuffer) -> Result<PlaybackId> {
        self.check("play_buffer")?;
        if buffer.sample_rate() != self.sample_rate {
            log::warn!(
                "playing {} Hz buffer on {} Hz virtual output",
                buffer.sample_rate(),
                self.sample_rate
            );
        }
        self.next_id += 1;
        let id = PlaybackId(self.next_id);
        self.current = Some(CurrentBuffer {
            id,
            frames: buffer.frames() as u64,
            started: Instant::now(),
        });
        Ok(id)
    }

    fn frames_played(&self, id: PlaybackId) -> Option<u64> {
        self.current
            .filter(|c| c.id == id)
            .map(|c| c.consumed(self.sample_rate))
    }

    fn stop_buffer(&mut self) -> Result<()> {
        self.check("stop_buffer")?;
        self.current = None;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "virtual"
    }
}

/// Time to play `frames` frames at `sample_rate`.
pub fn frames_to_duration(frames: u64, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(frames as f64 / sample_rate as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_tone_calls() {
        let mut output = VirtualOutput::new(48000);
        output.start_tone(800.0, Some(60)).unwrap();
        assert!(output.is_tone_active());
        output.stop_tone().unwrap();
        assert!(!output.is_tone_active());
        assert_eq!(
            output.tone_calls(),
            &[
                ToneCall::Start {
                    frequency_hz: 800.0,
                    duration_ms: Some(60)
                },
                ToneCall::Stop
            ]
        );
    }

    #[test]
    fn failing_output_rejects_calls() {
        let mut output = VirtualOutput::failing(48000);
        assert!(output.start_tone(800.0, None).is_err());
        assert!(output.play_buffer(&StereoBuffer::silent(1, 48000)).is_err());
        assert!(output.tone_calls().is_empty());
    }

    #[test]
    fn empty_buffer_is_immediately_done() {
        let mut output = VirtualOutput::new(48000);
        let id = output.play_buffer(&StereoBuffer::new(48000)).unwrap();
        assert_eq!(output.frames_played(id), Some(0));
        assert!(!output.is_playing());
    }

    #[test]
    fn buffer_is_consumed_over_time() {
        let mut output = VirtualOutput::new(48000);
        let id = output.play_buffer(&StereoBuffer::silent(480, 48000)).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(output.frames_played(id), Some(480));
        assert!(!output.is_playing());
    }

    #[test]
    fn stop_buffer_forgets_playback() {
        let mut output = VirtualOutput::new(48000);
        let id = output.play_buffer(&StereoBuffer::silent(48000, 48000)).unwrap();
        output.stop_buffer().unwrap();
        assert_eq!(output.frames_played(id), None);
        assert!(!output.is_playing());
    }

    #[test]
    fn new_buffer_replaces_previous_id() {
        let mut output = VirtualOutput::new(48000);
        let first = output.play_buffer(&StereoBuffer::silent(48000, 48000)).unwrap();
        let second = output.play_buffer(&StereoBuffer::silent(480, 48000)).unwrap();
        assert_ne!(first, second);
        assert_eq!(output.frames_played(first), None);
        assert!(output.frames_played(second).is_some());
    }

    #[test]
    fn shared_output_coerces_to_trait_object() {
        let output: SharedOutput = shared(VirtualOutput::new(44100));
        assert_eq!(output.lock().unwrap().sample_rate(), 44100);
    }

    #[test]
    fn frames_to_duration_handles_zero_rate() {
        assert_eq!(frames_to_duration(100, 0), Duration::ZERO);
        assert_eq!(frames_to_duration(48000, 48000), Duration::from_secs(1));
    }
}
