//! The audio batch, the unit of work crossing the pipeline channel.

/// A fixed-size block of mono `f32` samples with capture timing.
///
/// Batches are produced by the [`FrameBatcher`](crate::audio::FrameBatcher)
/// with exactly `samples_per_batch` samples each. The `samples` vector is
/// freshly allocated per batch and never shared, so a classifier may consume
/// or retain it without aliasing pipeline buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBatch {
    /// Normalized samples in [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Milliseconds since the pipeline epoch at which this batch completed.
    pub timestamp_ms: u64,
}

impl AudioBatch {
    /// Creates a new audio batch.
    pub fn new(samples: Vec<f32>, timestamp_ms: u64) -> Self {
        Self {
            samples,
            timestamp_ms,
        }
    }

    /// Number of samples in the batch.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when the batch holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
