//! Sound card output using CPAL (Cross-Platform Audio Library).

use crate::audio::buffer::StereoBuffer;
use crate::audio::output::{AudioOutput, PlaybackId};
use crate::error::{MorseError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::f64::consts::TAU;
use std::sync::{Arc, Mutex};

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is only created, played and dropped by the owning
/// `CpalOutput`, which callers access through a Mutex.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

#[derive(Debug, Default)]
struct Tone {
    phase: f64,
    step: f64,
    remaining: Option<u64>,
}

#[derive(Debug, Default)]
struct Mixer {
    tone: Option<Tone>,
    buffer: Vec<i16>,
    /// Id of the loaded buffer; cleared by a stop.
    buffer_id: Option<PlaybackId>,
    position: usize,
    played: u64,
    amplitude: f32,
}

impl Mixer {
    /// Next stereo frame, as floats in [-1, 1].
    fn next_frame(&mut self) -> (f32, f32) {
        let (mut left, mut right) = (0.0f32, 0.0f32);

        if self.position + 1 < self.buffer.len() {
            left += self.buffer[self.position] as f32 / i16::MAX as f32;
            right += self.buffer[self.position + 1] as f32 / i16::MAX as f32;
            self.position += 2;
            self.played += 1;
        }

        let mut finished = false;
        if let Some(tone) = self.tone.as_mut() {
            let value = (tone.phase.sin() as f32) * self.amplitude;
            tone.phase = (tone.phase + tone.step) % TAU;
            left += value;
            right += value;
            if let Some(remaining) = tone.remaining.as_mut() {
                *remaining = remaining.saturating_sub(1);
                finished = *remaining == 0;
            }
        }
        if finished {
            self.tone = None;
        }

        (left.clamp(-1.0, 1.0), right.clamp(-1.0, 1.0))
    }
}

/// Default output device, mixing a keyed side tone over buffer playback.
pub struct CpalOutput {
    stream: SendableStream,
    mixer: Arc<Mutex<Mixer>>,
    sample_rate: u32,
    channels: usize,
    next_id: u64,
}

impl CpalOutput {
    /// Opens the default output device at its native config.
    pub fn open_default(amplitude: f32) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| MorseError::AudioOutput {
                message: "no default output device".to_string(),
            })?;
        let supported = device
            .default_output_config()
            .map_err(|e| MorseError::AudioOutput {
                message: format!("Failed to query default output config: {}", e),
            })?;

        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let config: cpal::StreamConfig = supported.clone().into();
        let mixer = Arc::new(Mutex::new(Mixer {
            amplitude: amplitude.clamp(0.0, 1.0),
            ..Mixer::default()
        }));

        let err_callback = |err| {
            log::error!("audio output stream error: {}", err);
        };

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => {
                let mixer = Arc::clone(&mixer);
                device.build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        fill(data, channels, &mixer, |v| v);
                    },
                    err_callback,
                    None,
                )
            }
            cpal::SampleFormat::I16 => {
                let mixer = Arc::clone(&mixer);
                device.build_output_stream(
                    &config,
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        fill(data, channels, &mixer, |v| (v * i16::MAX as f32) as i16);
                    },
                    err_callback,
                    None,
                )
            }
            fmt => {
                return Err(MorseError::AudioOutput {
                    message: format!("Unsupported output sample format: {:?}", fmt),
                });
            }
        }
        .map_err(|e| MorseError::AudioOutput {
            message: format!("Failed to build output stream: {}", e),
        })?;

        stream.play().map_err(|e| MorseError::AudioOutput {
            message: format!("Failed to start output stream: {}", e),
        })?;

        log::info!("audio output opened: {}ch/{}Hz", channels, sample_rate);

        Ok(Self {
            stream: SendableStream(stream),
            mixer,
            sample_rate,
            channels,
            next_id: 0,
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    fn mixer(&self) -> Result<std::sync::MutexGuard<'_, Mixer>> {
        self.mixer.lock().map_err(|_| MorseError::AudioOutput {
            message: "audio mixer lock poisoned".to_string(),
        })
    }
}

fn fill<T: Copy + Default>(
    data: &mut [T],
    channels: usize,
    mixer: &Mutex<Mixer>,
    convert: impl Fn(f32) -> T,
) {
    let Ok(mut mixer) = mixer.lock() else {
        data.fill(T::default());
        return;
    };
    for frame in data.chunks_mut(channels.max(1)) {
        let (left, right) = mixer.next_frame();
        for (i, sample) in frame.iter_mut().enumerate() {
            *sample = convert(if i % 2 == 0 { left } else { right });
        }
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn start_tone(&mut self, frequency_hz: f32, duration_ms: Option<u32>) -> Result<()> {
        let sample_rate = self.sample_rate;
        let mut mixer = self.mixer()?;
        mixer.tone = Some(Tone {
            phase: 0.0,
            step: TAU * frequency_hz as f64 / sample_rate as f64,
            remaining: duration_ms.map(|ms| (ms as u64 * sample_rate as u64 / 1000).max(1)),
        });
        Ok(())
    }

    fn stop_tone(&mut self) -> Result<()> {
        self.mixer()?.tone = None;
        Ok(())
    }

    fn play_buffer(&mut self, buffer: &StereoBuffer) -> Result<PlaybackId> {
        if buffer.sample_rate() != self.sample_rate {
            log::warn!(
                "buffer is {} Hz but the device runs at {} Hz",
                buffer.sample_rate(),
                self.sample_rate
            );
        }
        self.next_id += 1;
        let id = PlaybackId(self.next_id);
        let mut mixer = self.mixer()?;
        mixer.buffer = buffer.samples().to_vec();
        mixer.buffer_id = Some(id);
        mixer.position = 0;
        mixer.played = 0;
        Ok(id)
    }

    fn frames_played(&self, id: PlaybackId) -> Option<u64> {
        let mixer = self.mixer().ok()?;
        (mixer.buffer_id == Some(id)).then_some(mixer.played)
    }

    fn stop_buffer(&mut self) -> Result<()> {
        let mut mixer = self.mixer()?;
        mixer.buffer.clear();
        mixer.buffer_id = None;
        mixer.position = 0;
        mixer.played = 0;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "cpal"
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        if let Err(e) = self.stream.0.pause() {
            log::debug!("failed to pause output stream: {}", e);
        }
    }
}
