//! Speech classification backends.
//!
//! The pipeline only ever sees the [`SpeechClassifier`] trait: one boolean
//! verdict per fixed-size batch, with fallible initialization and explicit
//! recurrent-state reset. Which backend sits behind it is a configuration
//! concern.

pub mod classifier;
pub mod energy;

pub use classifier::{MockClassifier, MockClassifierLog, SpeechClassifier};
pub use energy::EnergyClassifier;

use crate::config::ClassifierConfig;
use crate::error::{Result, VoxgateError};

/// Build the classifier named by the configuration.
pub fn build_classifier(config: &ClassifierConfig) -> Result<Box<dyn SpeechClassifier>> {
    match config.backend.as_str() {
        "energy" => Ok(Box::new(EnergyClassifier::new(config.threshold))),
        other => Err(VoxgateError::ConfigInvalidValue {
            key: "classifier.backend".to_string(),
            message: format!("unknown backend '{}' (available: energy)", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_energy_classifier() {
        let config = ClassifierConfig::default();
        let classifier = build_classifier(&config).unwrap();
        assert_eq!(classifier.name(), "energy");
    }

    #[test]
    fn test_build_unknown_backend_fails() {
        let config = ClassifierConfig {
            backend: "silero".to_string(),
            threshold: 0.45,
        };
        let result = build_classifier(&config);
        match result {
            Err(VoxgateError::ConfigInvalidValue { key, message }) => {
                assert_eq!(key, "classifier.backend");
                assert!(message.contains("silero"));
            }
            other => panic!("Expected ConfigInvalidValue, got {:?}", other.map(|c| c.name().to_string())),
        }
    }
}
