//! Inbound timing messages.
//!
//! Accepted JSON shapes:
//!
//! ```json
//! {"channel_id": 3, "press_ms": 60, "gap_before_ms": 180, "play_audio": true}
//! [60, 180]
//! ```
//!
//! The array form goes to the fallback channel given by the caller.
//! Durations may be numbers or numeric strings; anything else is kept as
//! NaN and clamped when the message becomes a [`PlaybackItem`].

use crate::error::{MorseError, Result};
use crate::playback::types::{ChannelId, PlaybackItem};
use serde::Serialize;
use serde_json::Value;

/// A keyed element as received from a peer. Values are untrusted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingMessage {
    pub channel_id: i64,
    pub press_ms: f64,
    pub gap_before_ms: f64,
    pub play_audio: bool,
}

impl TimingMessage {
    pub fn new(channel_id: i64, press_ms: f64, gap_before_ms: f64) -> Self {
        Self {
            channel_id,
            press_ms,
            gap_before_ms,
            play_audio: true,
        }
    }

    /// Parses one message. `fallback_channel` is used when the message
    /// does not name a channel.
    pub fn parse(json: &str, fallback_channel: ChannelId) -> Result<Self> {
        let value: Value = serde_json::from_str(json).map_err(|e| MorseError::MalformedMessage {
            message: format!("invalid JSON: {}", e),
        })?;
        Self::from_value(&value, fallback_channel)
    }

    pub fn from_value(value: &Value, fallback_channel: ChannelId) -> Result<Self> {
        match value {
            Value::Object(fields) => {
                let channel_id = match fields.get("channel_id") {
                    None | Some(Value::Null) => fallback_channel as i64,
                    Some(raw) => channel_number(raw).ok_or_else(|| {
                        MorseError::MalformedMessage {
                            message: format!("channel_id is not an integer: {}", raw),
                        }
                    })?,
                };
                Ok(Self {
                    channel_id,
                    press_ms: lenient_ms(fields.get("press_ms")),
                    gap_before_ms: lenient_ms(fields.get("gap_before_ms")),
                    play_audio: fields
                        .get("play_audio")
                        .and_then(Value::as_bool)
                        .unwrap_or(true),
                })
            }
            Value::Array(items) if (2..=3).contains(&items.len()) => Ok(Self {
                channel_id: fallback_channel as i64,
                press_ms: lenient_ms(items.first()),
                gap_before_ms: lenient_ms(items.get(1)),
                play_audio: items.get(2).and_then(Value::as_bool).unwrap_or(true),
            }),
            other => Err(MorseError::MalformedMessage {
                message: format!("expected an object or a [press, gap] array, got {}", other),
            }),
        }
    }

    /// The item to schedule, with durations clamped.
    pub fn to_item(&self) -> PlaybackItem {
        PlaybackItem::clamped(self.press_ms, self.gap_before_ms, self.play_audio)
    }
}

fn lenient_ms(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

fn channel_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
