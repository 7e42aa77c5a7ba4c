use crate::audio::AudioBatch;
use crate::error::{Result, VoxgateError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Trait for per-batch speech classification.
///
/// This trait allows swapping implementations (model-backed vs mock). The
/// pipeline worker owns its classifier exclusively and drives it from a
/// single thread, so implementations are free to carry recurrent state.
pub trait SpeechClassifier: Send {
    /// Load whatever assets the classifier needs.
    ///
    /// Called when an `init` control message reaches the worker, and again
    /// on any later `init` (retry after failure). Implementations may report
    /// human-readable progress through `progress`; each string is forwarded
    /// to consumers as a `status` event.
    fn init(&mut self, progress: &mut dyn FnMut(&str)) -> Result<()>;

    /// Classify one batch of audio as speech or not.
    ///
    /// The batch is consumed by value: the caller hands over a freshly
    /// allocated buffer that aliases nothing, so implementations may retain
    /// or mutate it freely.
    fn classify(&mut self, batch: AudioBatch) -> Result<bool>;

    /// Clear recurrent state between segments.
    fn reset(&mut self);

    /// Whether `init` has completed successfully.
    fn is_ready(&self) -> bool;

    /// Short backend name for diagnostics.
    fn name(&self) -> &str;
}

/// Call log shared between a [`MockClassifier`] and the test that built it.
///
/// The pipeline takes the classifier by value, so tests keep an `Arc` to the
/// log to observe calls from the outside.
#[derive(Debug, Default)]
pub struct MockClassifierLog {
    pub init_calls: usize,
    pub classify_calls: usize,
    pub reset_calls: usize,
    /// Every batch handed to `classify`, in order.
    pub batches_seen: Vec<AudioBatch>,
}

/// Mock classifier for testing
pub struct MockClassifier {
    verdicts: VecDeque<bool>,
    init_failures_remaining: u32,
    fail_classify: bool,
    progress_messages: Vec<String>,
    ready: bool,
    log: Arc<Mutex<MockClassifierLog>>,
}

impl MockClassifier {
    /// Create a new mock classifier with default settings
    pub fn new() -> Self {
        Self {
            verdicts: VecDeque::new(),
            init_failures_remaining: 0,
            fail_classify: false,
            progress_messages: Vec::new(),
            ready: false,
            log: Arc::new(Mutex::new(MockClassifierLog::default())),
        }
    }

    /// Script the verdicts returned by successive `classify` calls.
    ///
    /// Once the script is exhausted further batches are classified `false`.
    pub fn with_verdicts<I: IntoIterator<Item = bool>>(mut self, verdicts: I) -> Self {
        self.verdicts = verdicts.into_iter().collect();
        self
    }

    /// Fail the next `init` call; later calls succeed.
    pub fn with_init_failure(mut self) -> Self {
        self.init_failures_remaining = 1;
        self
    }

    /// Fail the next `count` `init` calls before succeeding.
    pub fn with_init_failures(mut self, count: u32) -> Self {
        self.init_failures_remaining = count;
        self
    }

    /// Configure the mock to fail on every classify call
    pub fn with_classify_failure(mut self) -> Self {
        self.fail_classify = true;
        self
    }

    /// Emit the given progress messages during a successful init.
    pub fn with_progress_messages<I, S>(mut self, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.progress_messages = messages.into_iter().map(Into::into).collect();
        self
    }

    /// Start in the ready state, as if init had already succeeded.
    pub fn ready(mut self) -> Self {
        self.ready = true;
        self
    }

    /// Clone the shared call log before handing the mock to a pipeline.
    pub fn log(&self) -> Arc<Mutex<MockClassifierLog>> {
        Arc::clone(&self.log)
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechClassifier for MockClassifier {
    fn init(&mut self, progress: &mut dyn FnMut(&str)) -> Result<()> {
        if let Ok(mut log) = self.log.lock() {
            log.init_calls += 1;
        }
        if self.init_failures_remaining > 0 {
            self.init_failures_remaining -= 1;
            return Err(VoxgateError::ClassifierInit {
                message: "mock classifier init failure".to_string(),
            });
        }
        for message in &self.progress_messages {
            progress(message);
        }
        self.ready = true;
        Ok(())
    }

    fn classify(&mut self, batch: AudioBatch) -> Result<bool> {
        if let Ok(mut log) = self.log.lock() {
            log.classify_calls += 1;
            log.batches_seen.push(batch);
        }
        if self.fail_classify {
            return Err(VoxgateError::Classifier {
                message: "mock classify failure".to_string(),
            });
        }
        Ok(self.verdicts.pop_front().unwrap_or(false))
    }

    fn reset(&mut self) {
        if let Ok(mut log) = self.log.lock() {
            log.reset_calls += 1;
        }
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn name(&self) -> &str {
        "mock"
    }
}
