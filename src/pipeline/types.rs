//! Command and event types flowing through the pipeline channels.

use crate::audio::AudioBatch;
use crate::segment::EndReason;

/// Inbound messages for the worker thread.
///
/// Control and audio share one channel so ordering is preserved end to
/// end: a `Reset` sent after a `Batch` is observed after that batch.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineCommand {
    /// Initialize the classifier backend.
    Init,
    /// One fixed-size batch of mono f32 samples.
    Batch(AudioBatch),
    /// Discard all accumulated state without emitting events.
    Reset,
    /// End an open segment immediately, then clear state.
    Stop,
    /// Ask the worker to emit a `State` event.
    QueryState,
    /// Exit the worker thread.
    Shutdown,
}

/// Outbound events from the worker thread.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// The classifier finished initializing.
    Initialized,
    /// Something went wrong; the pipeline itself is still alive.
    Error { message: String },
    /// A speech segment opened.
    ///
    /// `pre_roll` holds up to `pre_roll_ms` of audio leading into the
    /// segment, oldest first, ending with the batch that triggered the
    /// transition.
    SpeechStart {
        timestamp_ms: u64,
        pre_roll_ms: u32,
        pre_roll: Vec<f32>,
    },
    /// The open speech segment closed.
    ///
    /// `post_roll_ms` tells the consumer how much trailing audio to keep
    /// after the boundary.
    SpeechEnd {
        timestamp_ms: u64,
        post_roll_ms: u32,
        reason: EndReason,
    },
    /// Snapshot of the detection state, in response to `QueryState`.
    State { is_speech: bool, is_initialized: bool },
    /// Human-readable progress, e.g. classifier warm-up messages.
    Status { message: String },
}
