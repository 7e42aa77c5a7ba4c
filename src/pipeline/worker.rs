//! Detection worker: the single thread that owns all per-stream state.
//!
//! Exactly one thread touches the classifier, the segmenter, and the
//! pre-roll buffer, so none of them need locks. Commands arrive on one
//! channel and are processed strictly in order; events leave on another.

use crate::audio::{AudioBatch, PrerollBuffer};
use crate::classify::SpeechClassifier;
use crate::clock::Clock;
use crate::config::Config;
use crate::pipeline::types::{PipelineCommand, PipelineEvent};
use crate::segment::{Segmenter, SegmenterConfig, SpeechEvent};
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Flags the worker maintains and the handle mirrors for lock-free reads.
#[derive(Clone, Default)]
pub(crate) struct SharedFlags {
    pub(crate) is_speech: Arc<AtomicBool>,
    pub(crate) is_initialized: Arc<AtomicBool>,
}

pub(crate) struct Worker {
    classifier: Box<dyn SpeechClassifier>,
    segmenter: Segmenter,
    ring: PrerollBuffer,
    samples_per_batch: usize,
    pre_roll_ms: u32,
    post_roll_ms: u32,
    flags: SharedFlags,
    clock: Arc<dyn Clock>,
    epoch: Instant,
    events: Sender<PipelineEvent>,
    dropped_before_init: u64,
    classify_errors: u64,
}

impl Worker {
    pub(crate) fn new(
        config: &Config,
        classifier: Box<dyn SpeechClassifier>,
        flags: SharedFlags,
        clock: Arc<dyn Clock>,
        epoch: Instant,
        events: Sender<PipelineEvent>,
    ) -> Self {
        let segmenter = Segmenter::new(SegmenterConfig::from_config(&config.audio, &config.detector));
        let ring = PrerollBuffer::for_duration(
            config.detector.pre_roll_ms,
            config.audio.batch_duration_ms(),
            config.audio.samples_per_batch(),
        );
        flags.is_initialized.store(classifier.is_ready(), Ordering::SeqCst);

        Self {
            classifier,
            segmenter,
            ring,
            samples_per_batch: config.audio.samples_per_batch(),
            pre_roll_ms: config.detector.pre_roll_ms,
            post_roll_ms: config.detector.post_roll_ms,
            flags,
            clock,
            epoch,
            events,
            dropped_before_init: 0,
            classify_errors: 0,
        }
    }

    /// Main loop. Returns when a `Shutdown` arrives, the command channel
    /// closes, or every event receiver is gone.
    pub(crate) fn run(mut self, commands: Receiver<PipelineCommand>) {
        while let Ok(command) = commands.recv() {
            let keep_going = match command {
                PipelineCommand::Init => self.handle_init(),
                PipelineCommand::Batch(batch) => self.handle_batch(batch),
                PipelineCommand::Reset => {
                    self.clear_segment_state();
                    true
                }
                PipelineCommand::Stop => self.handle_stop(),
                PipelineCommand::QueryState => self.emit(PipelineEvent::State {
                    is_speech: self.segmenter.is_speech(),
                    is_initialized: self.flags.is_initialized.load(Ordering::SeqCst),
                }),
                PipelineCommand::Shutdown => false,
            };

            if !keep_going {
                break;
            }
        }
    }

    /// Initialize (or re-initialize) the classifier.
    ///
    /// Failure leaves the worker alive and uninitialized; the next `Init`
    /// retries from scratch.
    fn handle_init(&mut self) -> bool {
        let events = self.events.clone();
        let mut progress = |message: &str| {
            let _ = events.send(PipelineEvent::Status {
                message: message.to_string(),
            });
        };

        match self.classifier.init(&mut progress) {
            Ok(()) => {
                self.flags.is_initialized.store(true, Ordering::SeqCst);
                if self.dropped_before_init > 0 {
                    eprintln!(
                        "voxgate: dropped {} batch(es) received before initialization",
                        self.dropped_before_init
                    );
                    self.dropped_before_init = 0;
                }
                self.emit(PipelineEvent::Initialized)
            }
            Err(err) => {
                self.flags.is_initialized.store(false, Ordering::SeqCst);
                self.emit(PipelineEvent::Error {
                    message: format!("classifier init failed: {}", err),
                })
            }
        }
    }

    fn handle_batch(&mut self, batch: AudioBatch) -> bool {
        if batch.samples.len() != self.samples_per_batch {
            eprintln!(
                "voxgate: dropping malformed batch: {} samples, expected {}",
                batch.samples.len(),
                self.samples_per_batch
            );
            return true;
        }

        if !self.flags.is_initialized.load(Ordering::SeqCst) {
            self.dropped_before_init += 1;
            return true;
        }

        let timestamp_ms = batch.timestamp_ms;

        // Ring first, so a start transition's snapshot includes the batch
        // that triggered it. The classifier gets the original by value.
        self.ring.push(batch.clone());

        let verdict = match self.classifier.classify(batch) {
            Ok(verdict) => verdict,
            Err(err) => {
                self.classify_errors += 1;
                if self.classify_errors == 1 || self.classify_errors.is_multiple_of(100) {
                    eprintln!(
                        "voxgate: classify error ({} total), treating batch as silence: {}",
                        self.classify_errors, err
                    );
                }
                false
            }
        };

        match self.segmenter.process(verdict, timestamp_ms) {
            Some(transition) => self.apply_transition(transition),
            None => true,
        }
    }

    fn handle_stop(&mut self) -> bool {
        let keep_going = match self.segmenter.stop(self.now_ms()) {
            Some(transition) => self.apply_transition(transition),
            None => true,
        };
        self.clear_segment_state();
        keep_going
    }

    fn apply_transition(&mut self, transition: SpeechEvent) -> bool {
        match transition {
            SpeechEvent::Start { timestamp_ms } => {
                self.flags.is_speech.store(true, Ordering::SeqCst);
                self.emit(PipelineEvent::SpeechStart {
                    timestamp_ms,
                    pre_roll_ms: self.pre_roll_ms,
                    pre_roll: self.ring.snapshot_samples(),
                })
            }
            SpeechEvent::End { timestamp_ms, reason } => {
                self.flags.is_speech.store(false, Ordering::SeqCst);
                // Segment boundary: recurrent classifier state and buffered
                // audio must not leak into the next segment.
                self.classifier.reset();
                self.ring.clear();
                self.emit(PipelineEvent::SpeechEnd {
                    timestamp_ms,
                    post_roll_ms: self.post_roll_ms,
                    reason,
                })
            }
        }
    }

    /// The shared clear used by `Reset` and the tail of `Stop`. Leaves the
    /// initialized flag alone: resetting state does not unload the backend.
    fn clear_segment_state(&mut self) {
        self.segmenter.reset();
        self.ring.clear();
        self.classifier.reset();
        self.flags.is_speech.store(false, Ordering::SeqCst);
    }

    fn emit(&mut self, event: PipelineEvent) -> bool {
        self.events.send(event).is_ok()
    }

    fn now_ms(&self) -> u64 {
        self.clock.now().duration_since(self.epoch).as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::MockClassifier;
    use crate::clock::SystemClock;
    use crate::segment::EndReason;
    use crossbeam_channel::bounded;
    use std::thread;
    use std::time::Duration;

    struct Fixture {
        commands: Sender<PipelineCommand>,
        events: Receiver<PipelineEvent>,
        flags: SharedFlags,
        worker: thread::JoinHandle<()>,
    }

    /// Spawn a worker over a config with a 100ms batch, 100ms start
    /// threshold, and 300ms stop threshold (3 negative batches).
    fn spawn_worker(classifier: MockClassifier) -> Fixture {
        let config = Config {
            detector: crate::config::DetectorConfig {
                speech_start_ms: 100,
                speech_stop_ms: 300,
                pre_roll_ms: 300,
                ..Default::default()
            },
            ..Default::default()
        };
        spawn_worker_with(config, classifier)
    }

    fn spawn_worker_with(config: Config, classifier: MockClassifier) -> Fixture {
        let (command_tx, command_rx) = bounded(64);
        let (event_tx, event_rx) = bounded(256);
        let flags = SharedFlags::default();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let epoch = clock.now();

        let worker = Worker::new(
            &config,
            Box::new(classifier),
            flags.clone(),
            clock,
            epoch,
            event_tx,
        );
        let handle = thread::spawn(move || worker.run(command_rx));

        Fixture {
            commands: command_tx,
            events: event_rx,
            flags,
            worker: handle,
        }
    }

    fn batch(value: f32, timestamp_ms: u64) -> AudioBatch {
        AudioBatch::new(vec![value; 1600], timestamp_ms)
    }

    fn recv(events: &Receiver<PipelineEvent>) -> PipelineEvent {
        events
            .recv_timeout(Duration::from_secs(2))
            .expect("expected an event")
    }

    fn finish(fixture: Fixture) {
        fixture.commands.send(PipelineCommand::Shutdown).unwrap();
        fixture.worker.join().unwrap();
    }

    #[test]
    fn test_init_emits_initialized_and_sets_flag() {
        let fixture = spawn_worker(MockClassifier::new());

        fixture.commands.send(PipelineCommand::Init).unwrap();

        assert_eq!(recv(&fixture.events), PipelineEvent::Initialized);
        assert!(fixture.flags.is_initialized.load(Ordering::SeqCst));
        finish(fixture);
    }

    #[test]
    fn test_init_forwards_progress_as_status_events() {
        let classifier =
            MockClassifier::new().with_progress_messages(["loading model", "warming up"]);
        let fixture = spawn_worker(classifier);

        fixture.commands.send(PipelineCommand::Init).unwrap();

        assert_eq!(
            recv(&fixture.events),
            PipelineEvent::Status {
                message: "loading model".to_string()
            }
        );
        assert_eq!(
            recv(&fixture.events),
            PipelineEvent::Status {
                message: "warming up".to_string()
            }
        );
        assert_eq!(recv(&fixture.events), PipelineEvent::Initialized);
        finish(fixture);
    }

    #[test]
    fn test_init_failure_emits_error_and_retry_succeeds() {
        let fixture = spawn_worker(MockClassifier::new().with_init_failure());

        fixture.commands.send(PipelineCommand::Init).unwrap();
        match recv(&fixture.events) {
            PipelineEvent::Error { message } => {
                assert!(message.contains("classifier init failed"), "got: {}", message);
            }
            other => panic!("expected Error, got {:?}", other),
        }
        assert!(!fixture.flags.is_initialized.load(Ordering::SeqCst));

        // Worker survived; a second init succeeds.
        fixture.commands.send(PipelineCommand::Init).unwrap();
        assert_eq!(recv(&fixture.events), PipelineEvent::Initialized);
        assert!(fixture.flags.is_initialized.load(Ordering::SeqCst));
        finish(fixture);
    }

    #[test]
    fn test_batches_before_init_are_dropped_without_events() {
        let classifier = MockClassifier::new().with_verdicts([true, true, true]);
        let log = classifier.log();
        let fixture = spawn_worker(classifier);

        fixture
            .commands
            .send(PipelineCommand::Batch(batch(0.5, 100)))
            .unwrap();
        fixture.commands.send(PipelineCommand::QueryState).unwrap();

        // The only event is the state reply; the batch never reached the
        // classifier.
        assert_eq!(
            recv(&fixture.events),
            PipelineEvent::State {
                is_speech: false,
                is_initialized: false
            }
        );
        assert_eq!(log.lock().unwrap().classify_calls, 0);
        finish(fixture);
    }

    #[test]
    fn test_malformed_batch_is_dropped() {
        let classifier = MockClassifier::new().with_verdicts([true]);
        let log = classifier.log();
        let fixture = spawn_worker(classifier);

        fixture.commands.send(PipelineCommand::Init).unwrap();
        assert_eq!(recv(&fixture.events), PipelineEvent::Initialized);

        // Wrong length: 7 samples instead of 1600.
        fixture
            .commands
            .send(PipelineCommand::Batch(AudioBatch::new(vec![0.5; 7], 100)))
            .unwrap();
        fixture.commands.send(PipelineCommand::QueryState).unwrap();

        assert_eq!(
            recv(&fixture.events),
            PipelineEvent::State {
                is_speech: false,
                is_initialized: true
            }
        );
        assert_eq!(log.lock().unwrap().classify_calls, 0);
        finish(fixture);
    }

    #[test]
    fn test_speech_start_carries_pre_roll_snapshot() {
        // Two silence batches, then speech. The snapshot must contain the
        // two silence batches plus the triggering batch, oldest first.
        let classifier = MockClassifier::new().with_verdicts([false, false, true]);
        let fixture = spawn_worker(classifier);

        fixture.commands.send(PipelineCommand::Init).unwrap();
        assert_eq!(recv(&fixture.events), PipelineEvent::Initialized);

        fixture.commands.send(PipelineCommand::Batch(batch(0.1, 100))).unwrap();
        fixture.commands.send(PipelineCommand::Batch(batch(0.2, 200))).unwrap();
        fixture.commands.send(PipelineCommand::Batch(batch(0.3, 300))).unwrap();

        match recv(&fixture.events) {
            PipelineEvent::SpeechStart {
                timestamp_ms,
                pre_roll_ms,
                pre_roll,
            } => {
                assert_eq!(timestamp_ms, 300);
                assert_eq!(pre_roll_ms, 300);
                assert_eq!(pre_roll.len(), 3 * 1600);
                assert_eq!(pre_roll[0], 0.1);
                assert_eq!(pre_roll[1600], 0.2);
                assert_eq!(pre_roll[3200], 0.3);
            }
            other => panic!("expected SpeechStart, got {:?}", other),
        }
        assert!(fixture.flags.is_speech.load(Ordering::SeqCst));
        finish(fixture);
    }

    #[test]
    fn test_pre_roll_snapshot_capped_at_configured_duration() {
        // 250ms of pre-roll in 100ms batches: the ring rounds its storage
        // up to three batches, the attached audio must not.
        let config = Config {
            detector: crate::config::DetectorConfig {
                speech_start_ms: 100,
                speech_stop_ms: 300,
                pre_roll_ms: 250,
                ..Default::default()
            },
            ..Default::default()
        };
        let classifier = MockClassifier::new().with_verdicts([false, false, true]);
        let fixture = spawn_worker_with(config, classifier);

        fixture.commands.send(PipelineCommand::Init).unwrap();
        assert_eq!(recv(&fixture.events), PipelineEvent::Initialized);

        fixture.commands.send(PipelineCommand::Batch(batch(0.1, 100))).unwrap();
        fixture.commands.send(PipelineCommand::Batch(batch(0.2, 200))).unwrap();
        fixture.commands.send(PipelineCommand::Batch(batch(0.3, 300))).unwrap();

        match recv(&fixture.events) {
            PipelineEvent::SpeechStart {
                pre_roll_ms,
                pre_roll,
                ..
            } => {
                assert_eq!(pre_roll_ms, 250);
                // Exactly 250ms at 16kHz, newest samples kept.
                assert_eq!(pre_roll.len(), 4000);
                assert_eq!(pre_roll[0], 0.1);
                assert_eq!(pre_roll[799], 0.1);
                assert_eq!(pre_roll[800], 0.2);
                assert_eq!(pre_roll[2400], 0.3);
            }
            other => panic!("expected SpeechStart, got {:?}", other),
        }
        finish(fixture);
    }

    #[test]
    fn test_silence_run_ends_segment_with_timeout() {
        let classifier =
            MockClassifier::new().with_verdicts([true, false, false, false]);
        let fixture = spawn_worker(classifier);

        fixture.commands.send(PipelineCommand::Init).unwrap();
        assert_eq!(recv(&fixture.events), PipelineEvent::Initialized);

        for i in 1..=4u64 {
            fixture
                .commands
                .send(PipelineCommand::Batch(batch(0.0, i * 100)))
                .unwrap();
        }

        assert!(matches!(recv(&fixture.events), PipelineEvent::SpeechStart { .. }));
        match recv(&fixture.events) {
            PipelineEvent::SpeechEnd {
                timestamp_ms,
                post_roll_ms,
                reason,
            } => {
                assert_eq!(timestamp_ms, 400);
                assert_eq!(post_roll_ms, 1000);
                assert_eq!(reason, EndReason::Timeout);
            }
            other => panic!("expected SpeechEnd, got {:?}", other),
        }
        assert!(!fixture.flags.is_speech.load(Ordering::SeqCst));
        finish(fixture);
    }

    #[test]
    fn test_segment_end_resets_classifier_and_ring() {
        let classifier =
            MockClassifier::new().with_verdicts([true, false, false, false, true]);
        let log = classifier.log();
        let fixture = spawn_worker(classifier);

        fixture.commands.send(PipelineCommand::Init).unwrap();
        assert_eq!(recv(&fixture.events), PipelineEvent::Initialized);

        for i in 1..=5u64 {
            fixture
                .commands
                .send(PipelineCommand::Batch(batch(0.0, i * 100)))
                .unwrap();
        }

        assert!(matches!(recv(&fixture.events), PipelineEvent::SpeechStart { .. }));
        assert!(matches!(recv(&fixture.events), PipelineEvent::SpeechEnd { .. }));

        // The fifth batch reopens a segment; its pre-roll must contain only
        // audio from after the boundary clear.
        match recv(&fixture.events) {
            PipelineEvent::SpeechStart { pre_roll, .. } => {
                assert_eq!(pre_roll.len(), 1600);
            }
            other => panic!("expected SpeechStart, got {:?}", other),
        }
        assert_eq!(log.lock().unwrap().reset_calls, 1);
        finish(fixture);
    }

    #[test]
    fn test_classify_error_counts_as_silence() {
        let classifier = MockClassifier::new().with_classify_failure();
        let fixture = spawn_worker(classifier);

        fixture.commands.send(PipelineCommand::Init).unwrap();
        assert_eq!(recv(&fixture.events), PipelineEvent::Initialized);

        fixture.commands.send(PipelineCommand::Batch(batch(0.9, 100))).unwrap();
        fixture.commands.send(PipelineCommand::QueryState).unwrap();

        // No segment opened; the worker stayed alive.
        assert_eq!(
            recv(&fixture.events),
            PipelineEvent::State {
                is_speech: false,
                is_initialized: true
            }
        );
        finish(fixture);
    }

    #[test]
    fn test_stop_while_active_emits_manual_stop_end() {
        let classifier = MockClassifier::new().with_verdicts([true]);
        let fixture = spawn_worker(classifier);

        fixture.commands.send(PipelineCommand::Init).unwrap();
        assert_eq!(recv(&fixture.events), PipelineEvent::Initialized);

        fixture.commands.send(PipelineCommand::Batch(batch(0.5, 100))).unwrap();
        assert!(matches!(recv(&fixture.events), PipelineEvent::SpeechStart { .. }));

        fixture.commands.send(PipelineCommand::Stop).unwrap();
        match recv(&fixture.events) {
            PipelineEvent::SpeechEnd { reason, .. } => {
                assert_eq!(reason, EndReason::ManualStop);
            }
            other => panic!("expected SpeechEnd, got {:?}", other),
        }
        assert!(!fixture.flags.is_speech.load(Ordering::SeqCst));
        finish(fixture);
    }

    #[test]
    fn test_stop_while_idle_emits_nothing() {
        let fixture = spawn_worker(MockClassifier::new());

        fixture.commands.send(PipelineCommand::Init).unwrap();
        assert_eq!(recv(&fixture.events), PipelineEvent::Initialized);

        fixture.commands.send(PipelineCommand::Stop).unwrap();
        fixture.commands.send(PipelineCommand::QueryState).unwrap();

        assert_eq!(
            recv(&fixture.events),
            PipelineEvent::State {
                is_speech: false,
                is_initialized: true
            }
        );
        finish(fixture);
    }

    #[test]
    fn test_reset_mid_segment_clears_without_events() {
        let classifier = MockClassifier::new().with_verdicts([true, true]);
        let log = classifier.log();
        let fixture = spawn_worker(classifier);

        fixture.commands.send(PipelineCommand::Init).unwrap();
        assert_eq!(recv(&fixture.events), PipelineEvent::Initialized);

        fixture.commands.send(PipelineCommand::Batch(batch(0.5, 100))).unwrap();
        assert!(matches!(recv(&fixture.events), PipelineEvent::SpeechStart { .. }));

        fixture.commands.send(PipelineCommand::Reset).unwrap();
        fixture.commands.send(PipelineCommand::QueryState).unwrap();

        // No SpeechEnd: only the state reply, back in idle but still
        // initialized.
        assert_eq!(
            recv(&fixture.events),
            PipelineEvent::State {
                is_speech: false,
                is_initialized: true
            }
        );
        assert_eq!(log.lock().unwrap().reset_calls, 1);
        finish(fixture);
    }

    #[test]
    fn test_worker_exits_when_command_channel_closes() {
        let fixture = spawn_worker(MockClassifier::new());

        drop(fixture.commands);
        fixture.worker.join().unwrap();
    }

    #[test]
    fn test_preinitialized_classifier_skips_init_requirement() {
        let classifier = MockClassifier::new().ready().with_verdicts([true]);
        let fixture = spawn_worker(classifier);

        assert!(fixture.flags.is_initialized.load(Ordering::SeqCst));

        fixture.commands.send(PipelineCommand::Batch(batch(0.5, 100))).unwrap();
        assert!(matches!(recv(&fixture.events), PipelineEvent::SpeechStart { .. }));
        finish(fixture);
    }
}
