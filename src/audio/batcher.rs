//! Frame batching: arbitrary capture chunks in, fixed-size batches out.
//!
//! Capture callbacks deliver whatever chunk size the platform felt like.
//! The batcher repacks them into exact classifier-sized batches, tagging
//! each with the clock reading at the moment it completed.

use crate::audio::batch::AudioBatch;
use crate::clock::{Clock, SystemClock};
use std::time::Instant;

/// Packs arbitrary-length sample chunks into fixed-size batches.
///
/// A single accumulation buffer holds the partial tail between pushes. The
/// tail pends indefinitely; there is no flush, so input that ends mid-batch
/// drops the remainder. Every emitted batch carries a freshly allocated
/// samples vector, never a view into the accumulation buffer.
pub struct FrameBatcher<C: Clock = SystemClock> {
    samples_per_batch: usize,
    pending: Vec<f32>,
    clock: C,
    epoch: Instant,
}

impl FrameBatcher<SystemClock> {
    /// Creates a batcher emitting batches of `samples_per_batch` samples.
    pub fn new(samples_per_batch: usize) -> Self {
        Self::with_clock(samples_per_batch, SystemClock)
    }
}

impl<C: Clock> FrameBatcher<C> {
    /// Creates a batcher with an injected clock; the epoch is the clock's
    /// current reading.
    pub fn with_clock(samples_per_batch: usize, clock: C) -> Self {
        let epoch = clock.now();
        Self::with_epoch(samples_per_batch, clock, epoch)
    }

    /// Creates a batcher sharing an epoch established elsewhere, so its
    /// timestamps line up with other pipeline components.
    pub fn with_epoch(samples_per_batch: usize, clock: C, epoch: Instant) -> Self {
        assert!(samples_per_batch > 0, "samples_per_batch must be positive");
        Self {
            samples_per_batch,
            pending: Vec::with_capacity(samples_per_batch),
            clock,
            epoch,
        }
    }

    /// Appends a chunk and returns every batch it completed, in order.
    ///
    /// A chunk spanning several batch boundaries yields several batches from
    /// one call. Copying is bounded by the chunk length; the only allocation
    /// is the buffer of each completed batch.
    pub fn push(&mut self, chunk: &[f32]) -> Vec<AudioBatch> {
        let mut completed = Vec::new();
        let mut rest = chunk;

        while !rest.is_empty() {
            let room = self.samples_per_batch - self.pending.len();
            let take = room.min(rest.len());
            self.pending.extend_from_slice(&rest[..take]);
            rest = &rest[take..];

            if self.pending.len() == self.samples_per_batch {
                let samples = std::mem::replace(
                    &mut self.pending,
                    Vec::with_capacity(self.samples_per_batch),
                );
                completed.push(AudioBatch::new(samples, self.timestamp_ms()));
            }
        }

        completed
    }

    /// Drops any partially accumulated samples.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Number of samples currently pending below one batch.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// The configured batch size in samples.
    pub fn samples_per_batch(&self) -> usize {
        self.samples_per_batch
    }

    fn timestamp_ms(&self) -> u64 {
        self.clock.now().duration_since(self.epoch).as_millis() as u64
    }
}
