//! Side-tone synthesis.
//!
//! Renders sine tones and silences into [`StereoBuffer`]s and strings them
//! together for a symbol stream. Output is deterministic for a given
//! configuration.

use crate::audio::buffer::{MAX_FRAMES, StereoBuffer};
use crate::codec::{MorseCodec, MorseSymbol};
use crate::defaults;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Tone settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneConfig {
    pub frequency_hz: f32,
    pub sample_rate: u32,
    /// 0.0 to 1.0 of full scale.
    pub amplitude: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            frequency_hz: defaults::TONE_FREQUENCY_HZ,
            sample_rate: defaults::SAMPLE_RATE,
            amplitude: defaults::AMPLITUDE,
            attack_ms: defaults::ATTACK_MS,
            release_ms: defaults::RELEASE_MS,
        }
    }
}

impl ToneConfig {
    pub fn envelope(&self) -> Envelope {
        Envelope {
            attack_ms: self.attack_ms,
            release_ms: self.release_ms,
        }
    }
}

/// Element and gap lengths used when rendering a symbol stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementTiming {
    pub dot_ms: u32,
    pub dash_ms: u32,
    /// Silence added at a letter boundary, on top of the element gap.
    pub letter_gap_ms: u32,
    /// Silence added at a word boundary, on top of the element gap.
    pub word_gap_ms: u32,
}

impl Default for ElementTiming {
    fn default() -> Self {
        Self {
            dot_ms: defaults::DOT_MS,
            dash_ms: defaults::DASH_MS,
            letter_gap_ms: defaults::LETTER_GAP_MS,
            word_gap_ms: defaults::WORD_GAP_MS,
        }
    }
}

impl ElementTiming {
    /// Standard 1:3 / 3 / 7 proportions for a speed in WPM.
    pub fn from_wpm(wpm: f64) -> Self {
        let wpm = if wpm.is_finite() && wpm > 0.0 {
            wpm
        } else {
            defaults::INITIAL_WPM
        };
        let dot = (defaults::DOT_MS_PER_WPM / wpm).round().max(1.0) as u32;
        Self {
            dot_ms: dot,
            dash_ms: dot * 3,
            letter_gap_ms: dot * 3,
            word_gap_ms: dot * 7,
        }
    }
}

/// Linear attack/release ramp applied to each tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub attack_ms: f32,
    pub release_ms: f32,
}

impl Envelope {
    /// No shaping: a pure sine switched on and off.
    pub fn none() -> Self {
        Self {
            attack_ms: 0.0,
            release_ms: 0.0,
        }
    }

    /// Gain for frame `i` of `len`.
    fn gain(&self, i: usize, len: usize, sample_rate: u32) -> f64 {
        let attack = ms_to_frames(self.attack_ms as f64, sample_rate);
        let release = ms_to_frames(self.release_ms as f64, sample_rate);
        let mut gain: f64 = 1.0;
        if attack > 0 && i < attack {
            gain = gain.min(i as f64 / attack as f64);
        }
        let from_end = len - 1 - i;
        if release > 0 && from_end < release {
            gain = gain.min(from_end as f64 / release as f64);
        }
        gain
    }
}

fn ms_to_frames(ms: f64, sample_rate: u32) -> usize {
    seconds_to_frames(ms / 1000.0, sample_rate)
}

/// `round(duration_s × sample_rate)`, at most [`MAX_FRAMES`]; non-positive
/// or non-finite gives 0.
fn seconds_to_frames(duration_s: f64, sample_rate: u32) -> usize {
    if !(duration_s.is_finite() && duration_s > 0.0) {
        return 0;
    }
    let frames = (duration_s * sample_rate as f64).round();
    if frames >= MAX_FRAMES as f64 {
        log::warn!("{:.1}s at {} Hz is too long, capping", duration_s, sample_rate);
        MAX_FRAMES
    } else {
        frames as usize
    }
}

/// Renders tones, silences and whole Morse sequences.
#[derive(Debug, Clone, Default)]
pub struct ToneSynthesizer {
    config: ToneConfig,
    envelope: Option<Envelope>,
}

impl ToneSynthesizer {
    pub fn new(config: ToneConfig) -> Self {
        Self {
            config,
            envelope: None,
        }
    }

    /// Overrides the envelope derived from the tone config.
    pub fn with_envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = Some(envelope);
        self
    }

    pub fn config(&self) -> &ToneConfig {
        &self.config
    }

    fn envelope(&self) -> Envelope {
        self.envelope.unwrap_or_else(|| self.config.envelope())
    }

    /// Sine tone of `round(duration_s × sample_rate)` frames, both channels
    /// identical.
    pub fn tone(
        &self,
        frequency_hz: f32,
        duration_s: f64,
        sample_rate: u32,
        amplitude: f32,
    ) -> StereoBuffer {
        let frames = seconds_to_frames(duration_s, sample_rate);
        let mut buffer = StereoBuffer::with_capacity(frames, sample_rate);
        self.write_tone(&mut buffer, frequency_hz, frames, amplitude);
        buffer
    }

    /// Zero-filled buffer of the same shape as [`tone`](Self::tone).
    pub fn silence(&self, duration_s: f64, sample_rate: u32) -> StereoBuffer {
        StereoBuffer::silent(seconds_to_frames(duration_s, sample_rate), sample_rate)
    }

    fn write_tone(&self, out: &mut StereoBuffer, frequency_hz: f32, frames: usize, amplitude: f32) {
        let sample_rate = out.sample_rate();
        if sample_rate == 0 || !frequency_hz.is_finite() {
            self.write_silence(out, frames);
            return;
        }
        let envelope = self.envelope();
        let amplitude = amplitude.clamp(0.0, 1.0) as f64 * i16::MAX as f64;
        let step = TAU * frequency_hz as f64 / sample_rate as f64;

        for i in 0..frames {
            let gain = envelope.gain(i, frames, sample_rate);
            let value = (step * i as f64).sin() * amplitude * gain;
            out.push_frame(value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16);
        }
    }

    fn write_silence(&self, out: &mut StereoBuffer, frames: usize) {
        for _ in 0..frames {
            out.push_frame(0);
        }
    }

    /// Renders a symbol stream with the configured tone.
    ///
    /// Each dot or dash is followed by one dot of silence; letter and word
    /// gaps add their own silence. `Unknown` symbols are skipped. Empty
    /// input gives an empty buffer.
    pub fn render_sequence(&self, symbols: &[MorseSymbol], timing: &ElementTiming) -> StereoBuffer {
        let sample_rate = self.config.sample_rate;
        let frames = |ms: u32| ms_to_frames(ms as f64, sample_rate);
        let mut out = StereoBuffer::new(sample_rate);

        for symbol in symbols {
            match symbol {
                MorseSymbol::Dot | MorseSymbol::Dash => {
                    let length = if *symbol == MorseSymbol::Dot {
                        timing.dot_ms
                    } else {
                        timing.dash_ms
                    };
                    self.write_tone(
                        &mut out,
                        self.config.frequency_hz,
                        frames(length),
                        self.config.amplitude,
                    );
                    self.write_silence(&mut out, frames(timing.dot_ms));
                }
                MorseSymbol::LetterGap => self.write_silence(&mut out, frames(timing.letter_gap_ms)),
                MorseSymbol::WordGap => self.write_silence(&mut out, frames(timing.word_gap_ms)),
                MorseSymbol::Unknown => log::debug!("skipping unknown symbol while rendering"),
            }
        }
        out
    }

    /// Renders the textual code form (`.`, `-`, `/`, `///`).
    pub fn render_code(&self, code: &str, timing: &ElementTiming) -> StereoBuffer {
        self.render_sequence(&MorseSymbol::parse_sequence(code), timing)
    }

    /// Encodes `text` and renders it.
    pub fn render_text(&self, text: &str, timing: &ElementTiming) -> StereoBuffer {
        let encoded = MorseCodec::new().encode_text(text);
        self.render_sequence(&encoded.symbols(), timing)
    }
}
