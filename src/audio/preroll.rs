//! Pre-roll retention: a fixed-capacity ring of the most recent batches.
//!
//! Soft speech onsets (plosives, breath before a word) happen before the
//! classifier starts voting speech. Keeping the last few hundred
//! milliseconds of audio lets a consumer prepend them when a segment
//! starts.

use crate::audio::batch::AudioBatch;

/// Fixed-capacity circular store of recent audio batches.
///
/// `push` overwrites the oldest batch once the buffer is full. `snapshot`
/// reads without consuming, returning whatever prefix has accumulated while
/// the buffer is still warming up. Capacity is fixed at construction; no
/// operation allocates beyond the snapshot result.
pub struct PrerollBuffer {
    capacity: usize,
    // Sample cap enforced by `snapshot_samples`; rings built from a raw
    // batch count have no cap.
    max_samples: usize,
    slots: Vec<AudioBatch>,
    // Next slot to write; equals the oldest slot once the buffer is full.
    write: usize,
}

impl PrerollBuffer {
    /// Creates a ring holding up to `capacity` batches.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be positive");
        Self {
            capacity,
            max_samples: usize::MAX,
            slots: Vec::with_capacity(capacity),
            write: 0,
        }
    }

    /// Creates a ring sized to cover `pre_roll_ms` of audio in
    /// `batch_duration_ms` batches. Storage rounds up to whole batches;
    /// sample snapshots are capped at exactly the configured duration.
    pub fn for_duration(pre_roll_ms: u32, batch_duration_ms: u32, samples_per_batch: usize) -> Self {
        assert!(batch_duration_ms > 0, "batch duration must be positive");
        let capacity = pre_roll_ms.div_ceil(batch_duration_ms).max(1) as usize;
        let max_samples = (samples_per_batch as u64 * u64::from(pre_roll_ms)
            / u64::from(batch_duration_ms)) as usize;
        Self {
            max_samples,
            ..Self::new(capacity)
        }
    }

    /// Stores a batch, overwriting the oldest when full.
    pub fn push(&mut self, batch: AudioBatch) {
        if self.slots.len() < self.capacity {
            self.slots.push(batch);
        } else {
            self.slots[self.write] = batch;
        }
        self.write = (self.write + 1) % self.capacity;
    }

    /// Returns the buffered batches oldest-first without consuming them.
    ///
    /// While the buffer is filling this is a prefix shorter than capacity.
    pub fn snapshot(&self) -> Vec<AudioBatch> {
        if self.slots.len() < self.capacity {
            self.slots.clone()
        } else {
            let mut out = Vec::with_capacity(self.capacity);
            out.extend_from_slice(&self.slots[self.write..]);
            out.extend_from_slice(&self.slots[..self.write]);
            out
        }
    }

    /// Returns the buffered audio oldest-first as one flat sample vector.
    ///
    /// Rings built with [`for_duration`](Self::for_duration) never return
    /// more than the configured duration's worth of samples: when the
    /// oldest stored batch straddles the cap, its leading samples are
    /// dropped.
    pub fn snapshot_samples(&self) -> Vec<f32> {
        let total: usize = self.slots.iter().map(|b| b.len()).sum();
        let mut out = Vec::with_capacity(total);
        if self.slots.len() < self.capacity {
            for batch in &self.slots {
                out.extend_from_slice(&batch.samples);
            }
        } else {
            for batch in self.slots[self.write..].iter().chain(&self.slots[..self.write]) {
                out.extend_from_slice(&batch.samples);
            }
        }
        if out.len() > self.max_samples {
            out.drain(..out.len() - self.max_samples);
        }
        out
    }

    /// Empties the buffer.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.write = 0;
    }

    /// Number of batches currently stored.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Maximum number of batches the ring retains.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
