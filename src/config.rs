use crate::defaults;
use crate::error::{Result, VoxgateError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub detector: DetectorConfig,
    pub classifier: ClassifierConfig,
}

/// Audio format configuration.
///
/// Describes the sample stream the pipeline ingests and the batch geometry
/// derived from it. The classifier sees exactly `samples_per_batch()` samples
/// per verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub frame_duration_ms: u32,
    pub batch_frame_count: u32,
}

/// Segment detector configuration.
///
/// All run-length thresholds are expressed in milliseconds and compared in
/// whole batches (`count * batch_duration_ms`), never against wall-clock
/// deltas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectorConfig {
    pub speech_start_ms: u32,
    pub speech_stop_ms: u32,
    pub pre_roll_ms: u32,
    pub post_roll_ms: u32,
    pub min_speech_duration_secs: f64,
    pub max_speech_duration_secs: f64,
}

/// Classifier backend configuration.
///
/// `threshold` is passed through to the backend; voxgate itself never
/// interprets it beyond range validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    pub backend: String,
    pub threshold: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            frame_duration_ms: defaults::FRAME_DURATION_MS,
            batch_frame_count: defaults::BATCH_FRAME_COUNT,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            speech_start_ms: defaults::SPEECH_START_MS,
            speech_stop_ms: defaults::SPEECH_STOP_MS,
            pre_roll_ms: defaults::PRE_ROLL_MS,
            post_roll_ms: defaults::POST_ROLL_MS,
            min_speech_duration_secs: defaults::MIN_SPEECH_DURATION_SECS,
            max_speech_duration_secs: defaults::MAX_SPEECH_DURATION_SECS,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            backend: defaults::CLASSIFIER_BACKEND.to_string(),
            threshold: defaults::CLASSIFIER_THRESHOLD,
        }
    }
}

impl AudioConfig {
    /// Number of samples in one frame.
    pub fn samples_per_frame(&self) -> usize {
        (self.sample_rate * self.frame_duration_ms / 1000) as usize
    }

    /// Number of samples in one classifier batch.
    pub fn samples_per_batch(&self) -> usize {
        self.samples_per_frame() * self.batch_frame_count as usize
    }

    /// Duration of one batch in milliseconds.
    pub fn batch_duration_ms(&self) -> u32 {
        self.frame_duration_ms * self.batch_frame_count
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file is missing or contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VoxgateError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                VoxgateError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Panics on invalid TOML so a broken config never runs silently.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(VoxgateError::ConfigFileNotFound { .. }) => Self::default(),
            Err(e) => {
                panic!("Failed to load config from {}: {}", path.display(), e);
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - VOXGATE_THRESHOLD → classifier.threshold
    /// - VOXGATE_BACKEND → classifier.backend
    /// - VOXGATE_SPEECH_STOP_MS → detector.speech_stop_ms
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(threshold) = std::env::var("VOXGATE_THRESHOLD")
            && !threshold.is_empty()
        {
            match threshold.parse::<f32>() {
                Ok(value) => self.classifier.threshold = value,
                Err(_) => eprintln!(
                    "voxgate: ignoring VOXGATE_THRESHOLD={} (not a number)",
                    threshold
                ),
            }
        }

        if let Ok(backend) = std::env::var("VOXGATE_BACKEND")
            && !backend.is_empty()
        {
            self.classifier.backend = backend;
        }

        if let Ok(stop_ms) = std::env::var("VOXGATE_SPEECH_STOP_MS")
            && !stop_ms.is_empty()
        {
            match stop_ms.parse::<u32>() {
                Ok(value) => self.detector.speech_stop_ms = value,
                Err(_) => eprintln!(
                    "voxgate: ignoring VOXGATE_SPEECH_STOP_MS={} (not a number)",
                    stop_ms
                ),
            }
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/voxgate/config.toml on Linux
    #[cfg(feature = "cli")]
    pub fn default_path() -> std::path::PathBuf {
        dirs::config_dir()
            .expect("Could not determine config directory")
            .join("voxgate")
            .join("config.toml")
    }

    /// Check every field against its documented constraint.
    ///
    /// Called by `load`; construct-and-mutate callers should call it
    /// themselves before handing the config to a pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(invalid("audio.sample_rate", "must be positive"));
        }
        if self.audio.frame_duration_ms == 0 {
            return Err(invalid("audio.frame_duration_ms", "must be positive"));
        }
        if self.audio.sample_rate * self.audio.frame_duration_ms % 1000 != 0 {
            return Err(invalid(
                "audio.frame_duration_ms",
                "sample_rate * frame_duration_ms must be a whole number of samples",
            ));
        }
        if self.audio.batch_frame_count == 0 {
            return Err(invalid("audio.batch_frame_count", "must be positive"));
        }
        if self.detector.speech_start_ms == 0 {
            return Err(invalid("detector.speech_start_ms", "must be positive"));
        }
        if self.detector.speech_stop_ms == 0 {
            return Err(invalid("detector.speech_stop_ms", "must be positive"));
        }
        if self.detector.pre_roll_ms == 0 {
            return Err(invalid("detector.pre_roll_ms", "must be positive"));
        }
        if !self.detector.min_speech_duration_secs.is_finite()
            || self.detector.min_speech_duration_secs < 0.0
        {
            return Err(invalid(
                "detector.min_speech_duration_secs",
                "must be zero or a positive number",
            ));
        }
        if !self.detector.max_speech_duration_secs.is_finite()
            || self.detector.max_speech_duration_secs <= 0.0
        {
            return Err(invalid(
                "detector.max_speech_duration_secs",
                "must be positive",
            ));
        }
        if self.detector.max_speech_duration_secs < self.detector.min_speech_duration_secs {
            return Err(invalid(
                "detector.max_speech_duration_secs",
                "must not be smaller than min_speech_duration_secs",
            ));
        }
        if !self.classifier.threshold.is_finite()
            || !(0.0..=1.0).contains(&self.classifier.threshold)
        {
            return Err(invalid(
                "classifier.threshold",
                "must be between 0.0 and 1.0",
            ));
        }
        Ok(())
    }
}

fn invalid(key: &str, message: &str) -> VoxgateError {
    VoxgateError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}
