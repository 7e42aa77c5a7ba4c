//! Speech segmentation state machine.
//!
//! Turns a stream of per-batch boolean verdicts into speech-start and
//! speech-end transitions with hysteresis. Run lengths are counted in
//! batches and compared as `count * batch_duration_ms`; wall-clock time is
//! never consulted, so a stalled producer cannot fabricate silence.

use crate::config::{AudioConfig, DetectorConfig};
use crate::defaults;
use serde::{Deserialize, Serialize};

/// Why a segment ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndReason {
    /// The inactive run reached `speech_stop_ms`, or the segment hit the
    /// maximum-duration cap.
    Timeout,
    /// A stop control message ended the segment.
    ManualStop,
}

/// Lifecycle events emitted by the segmenter.
///
/// Over any verdict sequence, `Start` and `End` strictly alternate,
/// beginning with `Start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechEvent {
    /// A segment began; `timestamp_ms` is the batch that crossed the
    /// start threshold.
    Start { timestamp_ms: u64 },
    /// The current segment ended.
    End { timestamp_ms: u64, reason: EndReason },
}

/// Detection phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentPhase {
    /// No segment open; counting consecutive positive verdicts.
    Idle,
    /// Inside a segment; counting consecutive negative verdicts.
    Active,
}

/// Segmenter thresholds, pre-reduced to what the state machine needs.
#[derive(Debug, Clone, Copy)]
pub struct SegmenterConfig {
    /// Duration of one batch in milliseconds.
    pub batch_duration_ms: u32,
    /// Consecutive speech required to open a segment.
    pub speech_start_ms: u32,
    /// Consecutive silence required to close a segment.
    pub speech_stop_ms: u32,
    /// Hard cap on segment duration in milliseconds.
    pub max_speech_ms: u64,
}

impl SegmenterConfig {
    /// Derive segmenter thresholds from the two config sections.
    pub fn from_config(audio: &AudioConfig, detector: &DetectorConfig) -> Self {
        Self {
            batch_duration_ms: audio.batch_duration_ms(),
            speech_start_ms: detector.speech_start_ms,
            speech_stop_ms: detector.speech_stop_ms,
            max_speech_ms: (detector.max_speech_duration_secs * 1000.0) as u64,
        }
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            batch_duration_ms: defaults::FRAME_DURATION_MS * defaults::BATCH_FRAME_COUNT,
            speech_start_ms: defaults::SPEECH_START_MS,
            speech_stop_ms: defaults::SPEECH_STOP_MS,
            max_speech_ms: (defaults::MAX_SPEECH_DURATION_SECS * 1000.0) as u64,
        }
    }
}

/// Hysteresis segmenter over per-batch verdicts.
///
/// In `Idle`, consecutive positive verdicts accumulate; a negative verdict
/// zeroes the run. When the run covers `speech_start_ms` the segmenter
/// opens a segment. In `Active` the roles flip: consecutive negatives
/// accumulate toward `speech_stop_ms`, and any positive verdict zeroes the
/// run, bridging short pauses without closing the segment.
pub struct Segmenter {
    config: SegmenterConfig,
    phase: SegmentPhase,
    active_run_batches: u32,
    inactive_run_batches: u32,
    segment_started_at_ms: Option<u64>,
}

impl Segmenter {
    /// Creates a segmenter in the idle phase.
    pub fn new(config: SegmenterConfig) -> Self {
        Self {
            config,
            phase: SegmentPhase::Idle,
            active_run_batches: 0,
            inactive_run_batches: 0,
            segment_started_at_ms: None,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SegmentPhase {
        self.phase
    }

    /// True while a segment is open.
    pub fn is_speech(&self) -> bool {
        self.phase == SegmentPhase::Active
    }

    /// Feed one verdict; returns at most one lifecycle event.
    ///
    /// `timestamp_ms` is the triggering batch's timestamp and becomes the
    /// event timestamp on a transition.
    pub fn process(&mut self, is_speech: bool, timestamp_ms: u64) -> Option<SpeechEvent> {
        match self.phase {
            SegmentPhase::Idle => {
                if is_speech {
                    self.active_run_batches += 1;
                    if self.run_ms(self.active_run_batches) >= u64::from(self.config.speech_start_ms)
                    {
                        self.enter_active(timestamp_ms);
                        return Some(SpeechEvent::Start { timestamp_ms });
                    }
                } else {
                    self.active_run_batches = 0;
                }
                None
            }
            SegmentPhase::Active => {
                if let Some(started_at) = self.segment_started_at_ms
                    && timestamp_ms.saturating_sub(started_at) >= self.config.max_speech_ms
                {
                    self.enter_idle();
                    return Some(SpeechEvent::End {
                        timestamp_ms,
                        reason: EndReason::Timeout,
                    });
                }

                if is_speech {
                    // Hysteresis bridge: a single positive verdict forgives
                    // the accumulated silence.
                    self.inactive_run_batches = 0;
                } else {
                    self.inactive_run_batches += 1;
                    if self.run_ms(self.inactive_run_batches)
                        >= u64::from(self.config.speech_stop_ms)
                    {
                        self.enter_idle();
                        return Some(SpeechEvent::End {
                            timestamp_ms,
                            reason: EndReason::Timeout,
                        });
                    }
                }
                None
            }
        }
    }

    /// End an open segment immediately.
    ///
    /// Returns the manual-stop end event while active, nothing while idle.
    /// Either way all counters are cleared.
    pub fn stop(&mut self, timestamp_ms: u64) -> Option<SpeechEvent> {
        match self.phase {
            SegmentPhase::Active => {
                self.enter_idle();
                Some(SpeechEvent::End {
                    timestamp_ms,
                    reason: EndReason::ManualStop,
                })
            }
            SegmentPhase::Idle => {
                self.reset();
                None
            }
        }
    }

    /// Clear phase and counters without emitting anything.
    pub fn reset(&mut self) {
        self.phase = SegmentPhase::Idle;
        self.active_run_batches = 0;
        self.inactive_run_batches = 0;
        self.segment_started_at_ms = None;
    }

    fn enter_active(&mut self, timestamp_ms: u64) {
        self.phase = SegmentPhase::Active;
        self.active_run_batches = 0;
        self.inactive_run_batches = 0;
        self.segment_started_at_ms = Some(timestamp_ms);
    }

    fn enter_idle(&mut self) {
        self.phase = SegmentPhase::Idle;
        self.active_run_batches = 0;
        self.inactive_run_batches = 0;
        self.segment_started_at_ms = None;
    }

    fn run_ms(&self, batches: u32) -> u64 {
        u64::from(batches) * u64::from(self.config.batch_duration_ms)
    }
}
