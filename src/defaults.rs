//! Default configuration constants for voxgate.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech classifiers and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16000;

/// Default frame duration in milliseconds.
///
/// A frame is the smallest unit the capture side copies around. 20ms at
/// 16kHz is 320 samples, small enough to keep copy latency negligible.
pub const FRAME_DURATION_MS: u32 = 20;

/// Default number of frames packed into one classifier batch.
///
/// 5 frames of 20ms give a 100ms batch, matching the window size common
/// speech classifiers are trained on. All run-length thresholds below are
/// counted in whole batches.
pub const BATCH_FRAME_COUNT: u32 = 5;

/// Default consecutive-speech duration in milliseconds before a segment starts.
///
/// Requiring 200ms (2 batches) of positive verdicts filters out clicks and
/// single misfires without adding noticeable onset latency. The pre-roll
/// buffer recovers the audio consumed while waiting.
pub const SPEECH_START_MS: u32 = 200;

/// Default silence duration in milliseconds before speech is considered ended.
///
/// 1500ms (1.5 seconds) allows for natural pauses in speech without prematurely
/// ending the segment.
pub const SPEECH_STOP_MS: u32 = 1500;

/// Pre-roll buffer duration in milliseconds.
///
/// Recent batches kept in a ring buffer while idle, reported with speech-start.
/// Captures soft onsets (plosives, fricatives) that occur before the classifier
/// starts voting speech.
pub const PRE_ROLL_MS: u32 = 600;

/// Post-roll padding duration in milliseconds.
///
/// Trailing audio a consumer should keep after speech-end so word endings
/// are not clipped. Reported with every speech-end event.
pub const POST_ROLL_MS: u32 = 1000;

/// Default minimum speech segment duration in seconds.
///
/// Advisory for consumers: segments shorter than this are usually noise and
/// worth discarding. The detector itself never suppresses events based on it,
/// since speech-start has already been emitted by the time duration is known.
pub const MIN_SPEECH_DURATION_SECS: f64 = 0.5;

/// Default maximum speech segment duration in seconds.
///
/// A segment still active after 5 minutes is force-ended so a stuck
/// classifier cannot hold a segment open forever.
pub const MAX_SPEECH_DURATION_SECS: f64 = 300.0;

/// Default classifier decision threshold (0.0 to 1.0).
///
/// Compared against the per-batch speech score. 0.45 is tuned for typical
/// microphone input levels and provides good sensitivity while filtering out
/// background noise.
pub const CLASSIFIER_THRESHOLD: f32 = 0.45;

/// Default classifier backend name.
pub const CLASSIFIER_BACKEND: &str = "energy";

/// Capacity of the pipeline command channel, in messages.
///
/// Audio batches and control messages share this channel. 64 batches is
/// 6.4 seconds of headroom; a consumer that falls further behind starts
/// losing audio (never control messages).
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Capacity of the pipeline event channel, in events.
///
/// Events are small and rare compared to audio, so this rarely fills.
/// The worker blocks rather than drop an event, preserving the strict
/// speech-start/speech-end alternation consumers rely on.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;
