//! Error types for voxgate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoxgateError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio ingestion errors
    #[error("WAV read failed: {message}")]
    Wav { message: String },

    #[error("Audio batch length mismatch: expected {expected} samples, got {actual}")]
    BatchLength { expected: usize, actual: usize },

    // Classifier errors
    #[error("Classifier initialization failed: {message}")]
    ClassifierInit { message: String },

    #[error("Classifier error: {message}")]
    Classifier { message: String },

    // Pipeline errors
    #[error("Pipeline channel closed: {name}")]
    ChannelClosed { name: String },

    #[error("Pipeline error: {message}")]
    Pipeline { message: String },

    // Protocol and session errors
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    #[error("Session transport error: {message}")]
    Session { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VoxgateError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_file_not_found_display() {
        let error = VoxgateError::ConfigFileNotFound {
            path: "/path/to/config.toml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found at /path/to/config.toml"
        );
    }

    #[test]
    fn test_config_parse_display() {
        let error = VoxgateError::ConfigParse {
            message: "invalid TOML syntax".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to parse configuration: invalid TOML syntax"
        );
    }

    #[test]
    fn test_config_invalid_value_display() {
        let error = VoxgateError::ConfigInvalidValue {
            key: "audio.sample_rate".to_string(),
            message: "must be positive".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for audio.sample_rate: must be positive"
        );
    }

    #[test]
    fn test_wav_display() {
        let error = VoxgateError::Wav {
            message: "not a RIFF file".to_string(),
        };
        assert_eq!(error.to_string(), "WAV read failed: not a RIFF file");
    }

    #[test]
    fn test_batch_length_display() {
        let error = VoxgateError::BatchLength {
            expected: 1600,
            actual: 1599,
        };
        assert_eq!(
            error.to_string(),
            "Audio batch length mismatch: expected 1600 samples, got 1599"
        );
    }

    #[test]
    fn test_classifier_init_display() {
        let error = VoxgateError::ClassifierInit {
            message: "model file missing".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Classifier initialization failed: model file missing"
        );
    }

    #[test]
    fn test_classifier_display() {
        let error = VoxgateError::Classifier {
            message: "inference failed".to_string(),
        };
        assert_eq!(error.to_string(), "Classifier error: inference failed");
    }

    #[test]
    fn test_channel_closed_display() {
        let error = VoxgateError::ChannelClosed {
            name: "commands".to_string(),
        };
        assert_eq!(error.to_string(), "Pipeline channel closed: commands");
    }

    #[test]
    fn test_pipeline_display() {
        let error = VoxgateError::Pipeline {
            message: "worker thread panicked".to_string(),
        };
        assert_eq!(error.to_string(), "Pipeline error: worker thread panicked");
    }

    #[test]
    fn test_protocol_display() {
        let error = VoxgateError::Protocol {
            message: "unknown message type".to_string(),
        };
        assert_eq!(error.to_string(), "Protocol error: unknown message type");
    }

    #[test]
    fn test_session_display() {
        let error = VoxgateError::Session {
            message: "stdout closed".to_string(),
        };
        assert_eq!(error.to_string(), "Session transport error: stdout closed");
    }

    #[test]
    fn test_other_display() {
        let error = VoxgateError::Other("unexpected error".to_string());
        assert_eq!(error.to_string(), "unexpected error");
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: VoxgateError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_str = "invalid = toml = syntax";
        let toml_error = toml::from_str::<toml::Value>(toml_str).unwrap_err();
        let error: VoxgateError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);

        fn returns_error() -> Result<i32> {
            Err(VoxgateError::Other("test error".to_string()))
        }
        assert!(returns_error().is_err());
    }

    #[test]
    fn test_error_source_chain_io() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let error: VoxgateError = io_error.into();

        let error_trait: &dyn std::error::Error = &error;
        assert!(error_trait.source().is_some());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<VoxgateError>();
        assert_sync::<VoxgateError>();
    }

    #[test]
    fn test_error_debug_format() {
        let error = VoxgateError::ConfigFileNotFound {
            path: "/test/path".to_string(),
        };
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("ConfigFileNotFound"));
        assert!(debug_str.contains("/test/path"));
    }
}
