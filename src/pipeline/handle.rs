//! Pipeline construction and the capture-side handle.

use crate::audio::{AudioBatch, FrameBatcher};
use crate::classify::{self, SpeechClassifier};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::defaults;
use crate::error::{Result, VoxgateError};
use crate::pipeline::types::{PipelineCommand, PipelineEvent};
use crate::pipeline::worker::{SharedFlags, Worker};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How long `close` waits for the worker to wind down before detaching it.
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(1);
const SHUTDOWN_POLL: Duration = Duration::from_millis(10);

/// Builder for a detection pipeline.
pub struct Pipeline {
    config: Config,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    /// Creates a pipeline builder over the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Sets a custom clock (for deterministic testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Builds and starts a pipeline in one call.
    pub fn spawn(config: Config, classifier: Box<dyn SpeechClassifier>) -> Result<PipelineHandle> {
        Self::new(config).start_with(classifier)
    }

    /// Starts the pipeline with the classifier backend named in the config.
    pub fn start(self) -> Result<PipelineHandle> {
        let classifier = classify::build_classifier(&self.config.classifier)?;
        self.start_with(classifier)
    }

    /// Starts the pipeline with an explicit classifier.
    ///
    /// Spawns the worker thread; the returned handle is the only way to
    /// feed it. Dropping the handle without calling `shutdown` closes the
    /// command channel and the worker exits on its own.
    pub fn start_with(self, classifier: Box<dyn SpeechClassifier>) -> Result<PipelineHandle> {
        self.config.validate()?;

        let (command_tx, command_rx) = bounded(defaults::COMMAND_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = bounded(defaults::EVENT_CHANNEL_CAPACITY);
        let flags = SharedFlags::default();
        let epoch = self.clock.now();
        let samples_per_batch = self.config.audio.samples_per_batch();

        let worker = Worker::new(
            &self.config,
            classifier,
            flags.clone(),
            self.clock.clone(),
            epoch,
            event_tx,
        );
        let thread = thread::Builder::new()
            .name("voxgate-worker".to_string())
            .spawn(move || worker.run(command_rx))
            .map_err(|e| VoxgateError::Pipeline {
                message: format!("failed to spawn worker thread: {}", e),
            })?;

        // Batcher and worker share one epoch so batch timestamps and the
        // worker's manual-stop timestamps live on the same axis.
        let batcher = FrameBatcher::with_epoch(samples_per_batch, self.clock, epoch);

        Ok(PipelineHandle {
            command_tx,
            event_rx,
            batcher,
            samples_per_batch,
            flags,
            dropped_batches: 0,
            worker: Some(thread),
        })
    }
}

/// Handle to a running pipeline.
///
/// Owns the frame batcher (capture side) and the channels to and from the
/// worker thread. Audio is delivered with `try_send` and dropped when the
/// inbox is full; control messages block briefly instead and are never
/// dropped.
pub struct PipelineHandle {
    command_tx: Sender<PipelineCommand>,
    event_rx: Receiver<PipelineEvent>,
    batcher: FrameBatcher<Arc<dyn Clock>>,
    samples_per_batch: usize,
    flags: SharedFlags,
    dropped_batches: u64,
    worker: Option<JoinHandle<()>>,
}

impl PipelineHandle {
    /// Asks the worker to initialize its classifier backend.
    ///
    /// Completion is reported as an `Initialized` (or `Error`) event.
    pub fn init(&self) -> Result<()> {
        self.send_control(PipelineCommand::Init)
    }

    /// Pushes raw capture samples of any chunk size.
    ///
    /// Completed batches are forwarded to the worker; a partial batch
    /// stays buffered until more samples arrive.
    pub fn push_samples(&mut self, samples: &[f32]) {
        for batch in self.batcher.push(samples) {
            self.forward_batch(batch);
        }
    }

    /// Sends one pre-batched audio batch, e.g. from a protocol peer.
    ///
    /// Rejects batches whose length does not match the configured batch
    /// geometry.
    pub fn send_batch(&mut self, batch: AudioBatch) -> Result<()> {
        if batch.samples.len() != self.samples_per_batch {
            return Err(VoxgateError::BatchLength {
                expected: self.samples_per_batch,
                actual: batch.samples.len(),
            });
        }
        self.forward_batch(batch);
        Ok(())
    }

    /// Sends one batch, waiting for inbox space instead of dropping.
    ///
    /// Offline sources (WAV analysis) need every batch to reach the worker.
    /// Live capture should prefer [`push_samples`](Self::push_samples),
    /// which sheds load rather than stalling the capture thread.
    pub fn send_batch_blocking(&self, batch: AudioBatch) -> Result<()> {
        if batch.samples.len() != self.samples_per_batch {
            return Err(VoxgateError::BatchLength {
                expected: self.samples_per_batch,
                actual: batch.samples.len(),
            });
        }
        self.send_control(PipelineCommand::Batch(batch))
    }

    /// Discards all accumulated state, local batcher included. No events.
    pub fn reset(&mut self) -> Result<()> {
        self.batcher.clear();
        self.send_control(PipelineCommand::Reset)
    }

    /// Ends an open segment immediately (`SpeechEnd` with reason
    /// `manual-stop`), then clears state like `reset`.
    pub fn stop(&mut self) -> Result<()> {
        self.batcher.clear();
        self.send_control(PipelineCommand::Stop)
    }

    /// Asks the worker for a `State` event.
    pub fn query_state(&self) -> Result<()> {
        self.send_control(PipelineCommand::QueryState)
    }

    /// Clones the event receiver. Consumers on other threads can pull
    /// events while the handle keeps feeding audio.
    pub fn events(&self) -> Receiver<PipelineEvent> {
        self.event_rx.clone()
    }

    /// Lock-free mirror of the detection phase.
    pub fn is_speech(&self) -> bool {
        self.flags.is_speech.load(Ordering::SeqCst)
    }

    /// Lock-free mirror of the classifier readiness.
    pub fn is_initialized(&self) -> bool {
        self.flags.is_initialized.load(Ordering::SeqCst)
    }

    /// Number of audio batches dropped because the inbox was full.
    pub fn dropped_batches(&self) -> u64 {
        self.dropped_batches
    }

    /// Batch geometry this pipeline expects from `send_batch`.
    pub fn samples_per_batch(&self) -> usize {
        self.samples_per_batch
    }

    /// Stops any active segment, shuts the worker down, and returns the
    /// events still queued at that point, oldest first.
    ///
    /// Joins the worker with a deadline; a hung worker is detached and
    /// dies with the process.
    pub fn shutdown(self) -> Vec<PipelineEvent> {
        let (mut events, leftover) = self.close();
        while let Ok(event) = leftover.try_recv() {
            events.push(event);
        }
        events
    }

    /// Like [`shutdown`](Self::shutdown), but leaves queued events in the
    /// channel and returns the receiver instead of draining it.
    ///
    /// For callers that already consume events elsewhere (a clone from
    /// `events()`): once this returns, the worker is gone, so every
    /// receiver sees the remaining events and then disconnects.
    ///
    /// A worker parked on a full, unread event channel can never pick up
    /// `Stop` or `Shutdown`, so delivery never blocks: queued events are
    /// pulled aside as needed to get the worker moving again. Whatever was
    /// pulled is returned alongside the receiver, oldest first.
    pub fn close(mut self) -> (Vec<PipelineEvent>, Receiver<PipelineEvent>) {
        self.batcher.clear();

        let deadline = Instant::now() + SHUTDOWN_DEADLINE;
        let mut pulled = Vec::new();
        self.send_with_deadline(PipelineCommand::Stop, deadline, &mut pulled);
        self.send_with_deadline(PipelineCommand::Shutdown, deadline, &mut pulled);

        if let Some(handle) = self.worker.take() {
            loop {
                if handle.is_finished() {
                    if let Err(panic_info) = handle.join() {
                        let msg = panic_info
                            .downcast_ref::<&str>()
                            .copied()
                            .or_else(|| panic_info.downcast_ref::<String>().map(|s| s.as_str()))
                            .unwrap_or("unknown panic");
                        eprintln!("voxgate: worker thread panicked: {}", msg);
                    }
                    break;
                }
                if Instant::now() >= deadline {
                    // Dropping the JoinHandle detaches the thread.
                    eprintln!("voxgate: shutdown timeout, detaching worker thread");
                    break;
                }
                // The worker may still be flushing queued batches into a
                // channel nobody else is reading; keep it from parking.
                if self.event_rx.is_full() {
                    while let Ok(event) = self.event_rx.try_recv() {
                        pulled.push(event);
                    }
                }
                thread::sleep(SHUTDOWN_POLL);
            }
        }

        (pulled, self.event_rx.clone())
    }

    /// Deliver a wind-down command without blocking on a full inbox.
    ///
    /// The worker drains the inbox only between event sends, so when both
    /// channels are full the queued events are pulled aside first.
    fn send_with_deadline(
        &self,
        command: PipelineCommand,
        deadline: Instant,
        pulled: &mut Vec<PipelineEvent>,
    ) {
        let mut pending = command;
        while let Err(err) = self.command_tx.try_send(pending) {
            pending = match err {
                TrySendError::Full(returned) => returned,
                TrySendError::Disconnected(_) => return,
            };
            if Instant::now() >= deadline {
                return;
            }
            if self.event_rx.is_full() {
                while let Ok(event) = self.event_rx.try_recv() {
                    pulled.push(event);
                }
            } else {
                thread::sleep(SHUTDOWN_POLL);
            }
        }
    }

    fn forward_batch(&mut self, batch: AudioBatch) {
        if self.command_tx.try_send(PipelineCommand::Batch(batch)).is_err() {
            self.dropped_batches += 1;
            if self.dropped_batches == 1 || self.dropped_batches.is_multiple_of(100) {
                eprintln!(
                    "voxgate: audio inbox full, dropped {} batch(es) so far",
                    self.dropped_batches
                );
            }
        }
    }

    fn send_control(&self, command: PipelineCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| VoxgateError::ChannelClosed {
                name: "pipeline commands".to_string(),
            })
    }
}
