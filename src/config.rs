use crate::audio::output::SharedOutput;
use crate::audio::player::Player;
use crate::audio::synth::{ElementTiming, ToneConfig, ToneSynthesizer};
use crate::classifier::adaptive::{AdaptiveClassifier, ClassifierConfig};
use crate::defaults;
use crate::error::{MorseError, Result};
use crate::playback::scheduler::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub classifier: ClassifierConfig,
    pub tone: ToneConfig,
    pub timing: ElementTiming,
    pub playback: PlaybackConfig,
}

/// Channel layout and playback timing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    pub channel_count: u8,
    pub main_channel: u8,
    pub visual_frame_ms: u32,
    pub progress_interval_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            channel_count: defaults::CHANNEL_COUNT,
            main_channel: defaults::MAIN_CHANNEL,
            visual_frame_ms: defaults::VISUAL_FRAME_MS,
            progress_interval_ms: defaults::PROGRESS_INTERVAL_MS,
        }
    }
}

impl PlaybackConfig {
    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            channel_count: self.channel_count,
            main_channel: self.main_channel,
            visual_frame_ms: self.visual_frame_ms,
        }
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only a missing file falls back to defaults; invalid TOML is an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound) =>
            {
                log::debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.context(format!("Failed to load config from {}", path.display()))),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - MORSELINK_WPM → classifier.initial_wpm
    /// - MORSELINK_TONE_HZ → tone.frequency_hz
    /// - MORSELINK_SAMPLE_RATE → tone.sample_rate
    ///
    /// Values that don't parse are ignored with a warning.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(wpm) = env_value::<f64>("MORSELINK_WPM") {
            self.classifier.initial_wpm = wpm;
        }

        if let Some(frequency) = env_value::<f32>("MORSELINK_TONE_HZ") {
            self.tone.frequency_hz = frequency;
        }

        if let Some(rate) = env_value::<u32>("MORSELINK_SAMPLE_RATE") {
            self.tone.sample_rate = rate;
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/morselink/config.toml on Linux, or a path relative
    /// to the working directory when no config directory is known.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("morselink")
            .join("config.toml")
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        let wpm = self.classifier.initial_wpm;
        if !wpm.is_finite() || wpm <= 0.0 {
            return Err(invalid("classifier.initial_wpm", format!("must be positive, got {wpm}")));
        }
        if self.classifier.learning_window == 0 {
            return Err(invalid("classifier.learning_window", "must be positive"));
        }
        if !self.tone.frequency_hz.is_finite() || self.tone.frequency_hz <= 0.0 {
            return Err(invalid(
                "tone.frequency_hz",
                format!("must be positive, got {}", self.tone.frequency_hz),
            ));
        }
        if self.tone.sample_rate == 0 {
            return Err(invalid("tone.sample_rate", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.tone.amplitude) {
            return Err(invalid(
                "tone.amplitude",
                format!("must be within 0.0..=1.0, got {}", self.tone.amplitude),
            ));
        }
        if self.timing.dot_ms == 0 || self.timing.dash_ms == 0 {
            return Err(invalid("timing", "dot and dash lengths must be positive"));
        }
        if !(1..=100).contains(&self.playback.progress_interval_ms) {
            return Err(invalid(
                "playback.progress_interval_ms",
                format!("must be within 1..=100, got {}", self.playback.progress_interval_ms),
            ));
        }
        self.playback.scheduler().validate()
    }

    /// Classifier built from the `[classifier]` section.
    pub fn classifier(&self) -> AdaptiveClassifier {
        AdaptiveClassifier::new(self.classifier.clone())
    }

    /// Synthesizer built from the `[tone]` section.
    pub fn synthesizer(&self) -> ToneSynthesizer {
        ToneSynthesizer::new(self.tone.clone())
    }

    /// Player on `output` reporting progress at the configured interval.
    pub fn player(&self, output: SharedOutput) -> Player {
        Player::new(output).with_interval(self.playback.progress_interval())
    }
}

fn invalid(key: &str, message: impl Into<String>) -> MorseError {
    MorseError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

fn env_value<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok().filter(|v| !v.is_empty())?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("ignoring {}={:?}: not a valid number", key, raw);
            None
        }
    }
}
