//! Segment detection.
//!
//! The segmenter sits between the classifier and the event channel:
//!
//! ```text
//!   verdicts (one per batch)
//!        |
//!        v
//!   +-----------+   Start / End    +---------------+
//!   | Segmenter | ---------------> | event channel |
//!   +-----------+                  +---------------+
//! ```
//!
//! Hysteresis on both edges: short pauses inside a segment do not close
//! it, and isolated positive blips do not open one.

pub mod segmenter;

pub use segmenter::{EndReason, SegmentPhase, Segmenter, SegmenterConfig, SpeechEvent};
