//! Sink failures and how they are reported.

use crate::error::MorseError;
use crate::playback::types::ChannelId;
use std::fmt;

/// A sink call that failed. Scheduling carries on without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkError {
    pub sink: String,
    pub message: String,
}

impl SinkError {
    pub fn new(sink: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sink: sink.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.sink, self.message)
    }
}

impl std::error::Error for SinkError {}

impl From<SinkError> for MorseError {
    fn from(err: SinkError) -> Self {
        MorseError::SinkUnavailable {
            sink: err.sink,
            message: err.message,
        }
    }
}

/// Receives sink failures from channel schedulers.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, channel: ChannelId, error: &SinkError);
}

/// Reports through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, channel: ChannelId, error: &SinkError) {
        log::warn!("[channel {}] sink {} unavailable: {}", channel, error.sink, error.message);
    }
}
