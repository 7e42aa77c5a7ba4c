//! voxgate - Real-time speech segment detection
//!
//! Turns a continuous sample stream into discrete speech segments: capture
//! chunks are packed into fixed-size batches, each batch gets a boolean
//! verdict from a pluggable classifier backend, and a hysteresis state
//! machine converts the verdict stream into `SpeechStart`/`SpeechEnd`
//! events with buffered pre-roll audio attached to every start.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod classify;
#[cfg(feature = "cli")]
pub mod cli;
pub mod clock;
pub mod config;
pub mod defaults;
pub mod error;
pub mod pipeline;
pub mod protocol;
pub mod segment;
pub mod session;

// Core traits (classifier seam + injectable time)
pub use classify::{SpeechClassifier, build_classifier};
pub use clock::{Clock, SystemClock};

// Pipeline
pub use pipeline::{Pipeline, PipelineEvent, PipelineHandle};

// Segmentation state machine (for embedding without the worker thread)
pub use segment::{EndReason, Segmenter, SegmenterConfig, SpeechEvent};

// Error handling
pub use error::{Result, VoxgateError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.2.0+abc1234"` when git hash is available, `"0.2.0"` otherwise.
/// The CLI reports this as its `--version` output.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
