//! Detection pipeline: channels, worker thread, capture-side handle.
//!
//! One worker thread owns the classifier, the segmenter, and the pre-roll
//! buffer; the handle owns the frame batcher and the channel endpoints:
//!
//! ```text
//!   push_samples()   +----------------+  Batch / Init / ...  +--------+
//!   -------------->  | PipelineHandle | -------------------> | Worker |
//!                    |  FrameBatcher  |                      |  ring  |
//!   events()    <--- |                | <------------------- |  segm. |
//!                    +----------------+    PipelineEvent     +--------+
//! ```
//!
//! Control and audio share the inbound channel, so command ordering
//! relative to audio is exact.

pub mod handle;
pub mod types;
pub(crate) mod worker;

pub use handle::{Pipeline, PipelineHandle};
pub use types::{PipelineCommand, PipelineEvent};
