//! JSON message protocol for driving a pipeline from another process.
//!
//! One JSON object per line in both directions. Tags are kebab-case,
//! field names snake_case.

use crate::pipeline::PipelineEvent;
use crate::segment::EndReason;
use serde::{Deserialize, Serialize};

/// Inbound messages from the embedding process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Message {
    /// Initialize the classifier backend
    Init,
    /// One batch of mono f32 samples
    AudioBatch { samples: Vec<f32>, timestamp_ms: u64 },
    /// Discard all accumulated state without emitting events
    Reset,
    /// End an open segment immediately
    Stop,
    /// Request a `state` event
    GetState,
}

impl Message {
    /// Serialize message to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize message from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Outbound events to the embedding process.
///
/// The wire form of [`PipelineEvent`]: identical except that the pre-roll
/// sample payload stays in-process and only `pre_roll_ms` crosses the
/// boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    /// Classifier finished initializing
    Initialized,
    /// Something failed; the pipeline is still alive
    Error { message: String },
    /// A speech segment opened
    SpeechStart { timestamp_ms: u64, pre_roll_ms: u32 },
    /// The open speech segment closed
    SpeechEnd {
        timestamp_ms: u64,
        post_roll_ms: u32,
        reason: EndReason,
    },
    /// Detection state snapshot
    State { is_speech: bool, is_initialized: bool },
    /// Human-readable progress
    Status { message: String },
}

impl Event {
    /// Serialize event to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize event from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl From<PipelineEvent> for Event {
    fn from(event: PipelineEvent) -> Self {
        match event {
            PipelineEvent::Initialized => Event::Initialized,
            PipelineEvent::Error { message } => Event::Error { message },
            PipelineEvent::SpeechStart {
                timestamp_ms,
                pre_roll_ms,
                pre_roll: _,
            } => Event::SpeechStart {
                timestamp_ms,
                pre_roll_ms,
            },
            PipelineEvent::SpeechEnd {
                timestamp_ms,
                post_roll_ms,
                reason,
            } => Event::SpeechEnd {
                timestamp_ms,
                post_roll_ms,
                reason,
            },
            PipelineEvent::State {
                is_speech,
                is_initialized,
            } => Event::State {
                is_speech,
                is_initialized,
            },
            PipelineEvent::Status { message } => Event::Status { message },
        }
    }
}
