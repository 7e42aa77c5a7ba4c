//! Command-line interface for voxgate
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Speech segment detection for audio streams
#[derive(Parser, Debug)]
#[command(
    name = "voxgate",
    version,
    long_version = crate::version_string(),
    about = "Real-time speech segment detection"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress progress output (detected segments still print)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print events as JSON lines instead of human-readable text
    #[arg(long, global = true)]
    pub json: bool,

    /// Classifier threshold override (0.0 to 1.0)
    #[arg(long, global = true, value_name = "VALUE")]
    pub threshold: Option<f32>,

    /// Maximum segment duration before a forced end. Examples: 90, 30s, 5m
    #[arg(long, global = true, value_name = "DURATION", value_parser = parse_max_speech_secs)]
    pub max_speech: Option<f64>,
}

/// Parse a segment duration string into seconds.
///
/// Supports any duration format accepted by `humantime`: bare numbers
/// (seconds), single-unit (`30s`, `5m`, `2h`), and compound (`1h30m`,
/// `2m30s`).
fn parse_max_speech_secs(s: &str) -> Result<f64, String> {
    let s = s.trim();
    // Bare number → seconds
    if let Ok(secs) = s.parse::<f64>() {
        if secs.is_finite() && secs > 0.0 {
            return Ok(secs);
        }
        return Err(format!("duration must be positive, got '{s}'"));
    }
    humantime::parse_duration(s)
        .map(|d| d.as_secs_f64())
        .map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect speech segments in a WAV file and print the events
    Run {
        /// Path to the WAV file
        file: PathBuf,
    },

    /// Serve the line-delimited JSON protocol over stdin/stdout
    Serve,

    /// Print the effective configuration
    Config {
        /// Print the default config file path instead of the contents
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}
