//! Output sinks driven by the channel schedulers.
//!
//! Every sink implements [`Emitter`]. A sink that can run a pulse of a
//! given length by itself is driven in [`EmissionMode::Timed`]; any other
//! sink is switched on at the start and off at the release
//! ([`EmissionMode::Toggle`]). The mode is decided once, when a scheduler
//! is built.

use crate::audio::output::SharedOutput;
use crate::playback::error::SinkError;
use crate::playback::types::ChannelId;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// A pulse for a timed sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    pub duration_ms: u32,
    /// Animation frames a visual indicator should show.
    pub frames: u32,
}

impl Pulse {
    /// `frames = ceil(duration_ms / frame_ms)`, at least one.
    pub fn new(duration_ms: u32, frame_ms: u32) -> Self {
        let frames = duration_ms.div_ceil(frame_ms.max(1)).max(1);
        Self {
            duration_ms,
            frames,
        }
    }
}

/// How a scheduler drives an emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmissionMode {
    Timed,
    Toggle,
}

/// Capability interface for audio, visual and lamp outputs.
pub trait Emitter: Send {
    fn name(&self) -> &str;

    /// Whether [`emit_timed`](Self::emit_timed) is available.
    fn supports_timed(&self) -> bool {
        false
    }

    /// Runs a pulse that ends by itself.
    fn emit_timed(&mut self, channel: ChannelId, _pulse: Pulse) -> Result<(), SinkError> {
        Err(SinkError::new(
            self.name(),
            format!("timed emission unsupported on channel {channel}"),
        ))
    }

    fn set_active(&mut self, channel: ChannelId, active: bool) -> Result<(), SinkError>;
}

/// Emitter shared by several channels.
pub type SharedEmitter = Arc<Mutex<dyn Emitter>>;

/// Wraps an emitter for sharing.
pub fn shared_emitter<E: Emitter + 'static>(emitter: E) -> SharedEmitter {
    Arc::new(Mutex::new(emitter))
}

/// Which output a sink feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Audio,
    Visual,
    Lamp,
}

/// The sinks one channel drives. Any of them may be absent.
#[derive(Clone, Default)]
pub struct ChannelSinks {
    pub audio: Option<SharedEmitter>,
    pub visual: Option<SharedEmitter>,
    pub lamp: Option<SharedEmitter>,
}

impl ChannelSinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_audio(mut self, emitter: SharedEmitter) -> Self {
        self.audio = Some(emitter);
        self
    }

    pub fn with_visual(mut self, emitter: SharedEmitter) -> Self {
        self.visual = Some(emitter);
        self
    }

    pub fn with_lamp(mut self, emitter: SharedEmitter) -> Self {
        self.lamp = Some(emitter);
        self
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (SinkKind, &SharedEmitter)> {
        [
            (SinkKind::Audio, self.audio.as_ref()),
            (SinkKind::Visual, self.visual.as_ref()),
            (SinkKind::Lamp, self.lamp.as_ref()),
        ]
        .into_iter()
        .filter_map(|(kind, emitter)| emitter.map(|e| (kind, e)))
    }
}

/// Keys a side tone on an audio output.
pub struct ToneEmitter {
    output: SharedOutput,
    frequency_hz: f32,
}

impl ToneEmitter {
    pub fn new(output: SharedOutput, frequency_hz: f32) -> Self {
        Self {
            output,
            frequency_hz,
        }
    }

    fn with_output<T>(
        &self,
        f: impl FnOnce(&mut dyn crate::audio::AudioOutput) -> crate::error::Result<T>,
    ) -> Result<T, SinkError> {
        let mut output = self
            .output
            .lock()
            .map_err(|_| SinkError::new("tone", "audio output lock poisoned"))?;
        f(&mut *output).map_err(|e| SinkError::new("tone", e.to_string()))
    }
}

impl Emitter for ToneEmitter {
    fn name(&self) -> &str {
        "tone"
    }

    fn supports_timed(&self) -> bool {
        true
    }

    fn emit_timed(&mut self, _channel: ChannelId, pulse: Pulse) -> Result<(), SinkError> {
        let frequency = self.frequency_hz;
        self.with_output(|out| out.start_tone(frequency, Some(pulse.duration_ms)))
    }

    fn set_active(&mut self, _channel: ChannelId, active: bool) -> Result<(), SinkError> {
        let frequency = self.frequency_hz;
        if active {
            self.with_output(|out| out.start_tone(frequency, None))
        } else {
            self.with_output(|out| out.stop_tone())
        }
    }
}

/// What a [`RecordingEmitter`] was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterAction {
    Timed(Pulse),
    Active(bool),
}

/// One recorded emitter call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitterCall {
    pub at: Instant,
    pub channel: ChannelId,
    pub action: EmitterAction,
}

/// Records every call with the time it was made.
///
/// Clones share one log, so a test can keep a clone and inspect what the
/// scheduler did.
#[derive(Clone)]
pub struct RecordingEmitter {
    name: String,
    timed: bool,
    failing: bool,
    calls: Arc<Mutex<Vec<EmitterCall>>>,
}

impl RecordingEmitter {
    /// A recorder that accepts timed pulses.
    pub fn timed(name: &str) -> Self {
        Self {
            name: name.to_string(),
            timed: true,
            failing: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A recorder that only supports on/off.
    pub fn toggle(name: &str) -> Self {
        Self {
            timed: false,
            ..Self::timed(name)
        }
    }

    /// Records calls but reports each one as failed.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn calls(&self) -> Vec<EmitterCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Instants at which an emission started.
    pub fn start_times(&self) -> Vec<Instant> {
        self.calls()
            .into_iter()
            .filter(|c| {
                matches!(
                    c.action,
                    EmitterAction::Timed(_) | EmitterAction::Active(true)
                )
            })
            .map(|c| c.at)
            .collect()
    }

    fn record(&self, channel: ChannelId, action: EmitterAction) -> Result<(), SinkError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(EmitterCall {
                at: Instant::now(),
                channel,
                action,
            });
        }
        if self.failing {
            return Err(SinkError::new(&self.name, "recording emitter set to fail"));
        }
        Ok(())
    }
}

impl Emitter for RecordingEmitter {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_timed(&self) -> bool {
        self.timed
    }

    fn emit_timed(&mut self, channel: ChannelId, pulse: Pulse) -> Result<(), SinkError> {
        if !self.timed {
            return Err(SinkError::new(&self.name, "timed emission unsupported"));
        }
        self.record(channel, EmitterAction::Timed(pulse))
    }

    fn set_active(&mut self, channel: ChannelId, active: bool) -> Result<(), SinkError> {
        self.record(channel, EmitterAction::Active(active))
    }
}

/// Writes emissions to the log at debug level.
#[derive(Debug, Clone)]
pub struct LogEmitter {
    name: String,
}

impl LogEmitter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl Emitter for LogEmitter {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_timed(&self) -> bool {
        true
    }

    fn emit_timed(&mut self, channel: ChannelId, pulse: Pulse) -> Result<(), SinkError> {
        log::debug!(
            "[{}] channel {} pulse {} ms ({} frames)",
            self.name,
            channel,
            pulse.duration_ms,
            pulse.frames
        );
        Ok(())
    }

    fn set_active(&mut self, channel: ChannelId, active: bool) -> Result<(), SinkError> {
        log::debug!("[{}] channel {} active={}", self.name, channel, active);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::output::{ToneCall, VirtualOutput};

    #[test]
    fn pulse_frames_round_up() {
        assert_eq!(Pulse::new(60, 40).frames, 2);
        assert_eq!(Pulse::new(80, 40).frames, 2);
        assert_eq!(Pulse::new(81, 40).frames, 3);
        assert_eq!(Pulse::new(1, 40).frames, 1);
        assert_eq!(Pulse::new(0, 40).frames, 1);
        assert_eq!(Pulse::new(60, 0).frames, 60);
    }

    #[test]
    fn tone_emitter_drives_output() {
        let output = Arc::new(Mutex::new(VirtualOutput::new(48000)));
        let shared: SharedOutput = output.clone();
        let mut emitter = ToneEmitter::new(shared, 700.0);

        emitter.emit_timed(5, Pulse::new(60, 40)).unwrap();
        emitter.set_active(5, true).unwrap();
        emitter.set_active(5, false).unwrap();

        let calls = output.lock().unwrap().tone_calls().to_vec();
        assert_eq!(
            calls,
            vec![
                ToneCall::Start {
                    frequency_hz: 700.0,
                    duration_ms: Some(60)
                },
                ToneCall::Start {
                    frequency_hz: 700.0,
                    duration_ms: None
                },
                ToneCall::Stop,
            ]
        );
    }

    #[test]
    fn tone_emitter_reports_output_failure() {
        let output: SharedOutput = Arc::new(Mutex::new(VirtualOutput::failing(48000)));
        let mut emitter = ToneEmitter::new(output, 800.0);
        let err = emitter.emit_timed(0, Pulse::new(60, 40)).unwrap_err();
        assert_eq!(err.sink, "tone");
        assert!(err.message.contains("start_tone"));
    }

    #[test]
    fn recording_emitter_shares_log_between_clones() {
        let recorder = RecordingEmitter::timed("visual");
        let mut clone = recorder.clone();
        clone.emit_timed(2, Pulse::new(120, 40)).unwrap();
        clone.set_active(2, false).unwrap();

        let calls = recorder.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].action, EmitterAction::Timed(Pulse::new(120, 40)));
        assert_eq!(recorder.start_times().len(), 1);
    }

    #[test]
    fn toggle_recorder_rejects_timed() {
        let mut recorder = RecordingEmitter::toggle("lamp");
        assert!(!recorder.supports_timed());
        assert!(recorder.emit_timed(0, Pulse::new(10, 40)).is_err());
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn default_emit_timed_is_unsupported() {
        struct OnOff;
        impl Emitter for OnOff {
            fn name(&self) -> &str {
                "onoff"
            }
            fn set_active(&mut self, _: ChannelId, _: bool) -> Result<(), SinkError> {
                Ok(())
            }
        }
        let mut sink = OnOff;
        assert!(!sink.supports_timed());
        assert!(sink.emit_timed(1, Pulse::new(10, 40)).is_err());
    }

    #[test]
    fn channel_sinks_iterates_present_sinks() {
        let sinks = ChannelSinks::new()
            .with_audio(shared_emitter(LogEmitter::new("audio")))
            .with_lamp(shared_emitter(LogEmitter::new("lamp")));
        let kinds: Vec<SinkKind> = sinks.iter().map(|(kind, _)| kind).collect();
        assert_eq!(kinds, vec![SinkKind::Audio, SinkKind::Lamp]);
    }
}
