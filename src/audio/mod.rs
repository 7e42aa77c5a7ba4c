//! Audio ingestion building blocks.
//!
//! Raw capture chunks are packed into fixed-size batches and recent batches
//! are retained for pre-roll recovery:
//! ```text
//! ┌──────────────┐    ┌──────────────┐          ┌────────────┐
//! │ capture      │───▶│ FrameBatcher │──batch──▶│  pipeline  │
//! │ chunks (any  │    │ (exact-size  │          │  worker    │
//! │ length)      │    │  repacking)  │          └─────┬──────┘
//! └──────────────┘    └──────────────┘                │ clone
//!                                                     ▼
//!                                              ┌──────────────┐
//!                                              │PrerollBuffer │
//!                                              │ (last N)     │
//!                                              └──────────────┘
//! ```

pub mod batch;
pub mod batcher;
pub mod preroll;
pub mod wav;

pub use batch::AudioBatch;
pub use batcher::FrameBatcher;
pub use preroll::PrerollBuffer;
pub use wav::WavInput;
