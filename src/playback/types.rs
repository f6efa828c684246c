//! Playback items and channel identifiers.

use crate::defaults;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Index of a playback channel.
pub type ChannelId = u8;

/// One keyed element to play on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackItem {
    /// Key-down time.
    pub play_ms: u32,
    /// Silence before this element, measured from the previous release.
    pub gap_before_ms: u32,
    /// Whether the audio sink plays this element.
    pub emit_audio: bool,
}

impl PlaybackItem {
    /// An audible item. `play_ms` is raised to at least 1 ms.
    pub fn new(play_ms: u32, gap_before_ms: u32) -> Self {
        Self {
            play_ms: play_ms.max(defaults::MIN_PLAY_MS),
            gap_before_ms,
            emit_audio: true,
        }
    }

    /// Same item, silent on the audio sink.
    pub fn silent(mut self) -> Self {
        self.emit_audio = false;
        self
    }

    /// Builds an item from untrusted millisecond values.
    ///
    /// Fractions round up. Play times below 1 ms (or not a number) become
    /// 1 ms; negative or non-numeric gaps become 0 ms.
    pub fn clamped(play_ms: f64, gap_before_ms: f64, emit_audio: bool) -> Self {
        let play = clamp_ms(play_ms, defaults::MIN_PLAY_MS);
        let gap = clamp_ms(gap_before_ms, defaults::MIN_GAP_MS);
        if play as f64 != play_ms.ceil() || gap as f64 != gap_before_ms.ceil() {
            log::warn!(
                "clamped timing play={} gap={} to play={} gap={}",
                play_ms,
                gap_before_ms,
                play,
                gap
            );
        }
        Self {
            play_ms: play,
            gap_before_ms: gap,
            emit_audio,
        }
    }

    pub fn play_duration(&self) -> Duration {
        Duration::from_millis(self.play_ms as u64)
    }

    pub fn gap_duration(&self) -> Duration {
        Duration::from_millis(self.gap_before_ms as u64)
    }
}

fn clamp_ms(value: f64, minimum: u32) -> u32 {
    if value.is_nan() {
        return minimum;
    }
    let rounded = value.ceil();
    if rounded <= minimum as f64 {
        minimum
    } else if rounded >= u32::MAX as f64 {
        u32::MAX
    } else {
        rounded as u32
    }
}
