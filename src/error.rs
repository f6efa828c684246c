//! Error types for morselink.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MorseError {
    // Configuration errors
    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    // Routing and inbound data errors
    #[error("Unknown channel: {channel_id}")]
    UnknownChannel { channel_id: i64 },

    #[error("Malformed timing message: {message}")]
    MalformedMessage { message: String },

    #[error("Channel {channel_id} is no longer running")]
    ChannelClosed { channel_id: u8 },

    // Output errors
    #[error("Sink '{sink}' unavailable: {message}")]
    SinkUnavailable { sink: String, message: String },

    #[error("Audio output failed: {message}")]
    AudioOutput { message: String },

    #[error("WAV error: {message}")]
    Wav { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, MorseError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_invalid_value_display() {
        let error = MorseError::ConfigInvalidValue {
            key: "classifier.initial_wpm".to_string(),
            message: "must be positive".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for classifier.initial_wpm: must be positive"
        );
    }

    #[test]
    fn test_unknown_channel_display() {
        let error = MorseError::UnknownChannel { channel_id: 42 };
        assert_eq!(error.to_string(), "Unknown channel: 42");
    }

    #[test]
    fn test_malformed_message_display() {
        let error = MorseError::MalformedMessage {
            message: "expected object or array".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Malformed timing message: expected object or array"
        );
    }

    #[test]
    fn test_channel_closed_display() {
        let error = MorseError::ChannelClosed { channel_id: 3 };
        assert_eq!(error.to_string(), "Channel 3 is no longer running");
    }

    #[test]
    fn test_sink_unavailable_display() {
        let error = MorseError::SinkUnavailable {
            sink: "lamp".to_string(),
            message: "device unplugged".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Sink 'lamp' unavailable: device unplugged"
        );
    }

    #[test]
    fn test_audio_output_display() {
        let error = MorseError::AudioOutput {
            message: "no default output device".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Audio output failed: no default output device"
        );
    }

    #[test]
    fn test_other_display() {
        let error = MorseError::Other("unexpected error".to_string());
        assert_eq!(error.to_string(), "unexpected error");
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: MorseError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_source_chain_io() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let error: MorseError = io_error.into();

        let error_trait: &dyn std::error::Error = &error;
        assert!(error_trait.source().is_some());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<MorseError>();
        assert_sync::<MorseError>();
    }
}
