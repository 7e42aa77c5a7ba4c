//! RMS energy classifier.
//!
//! The built-in backend: no model assets, no recurrent state, just signal
//! energy mapped onto a 0..1 score and compared against the configured
//! threshold. Good enough for quiet rooms and for exercising the pipeline;
//! model-backed backends plug in through the same trait.

use crate::audio::AudioBatch;
use crate::classify::SpeechClassifier;
use crate::error::Result;

/// RMS level at which the speech score saturates at 1.0.
///
/// Normalized microphone speech typically lands between 0.02 and 0.2 RMS.
/// With this reference, the default threshold of 0.45 corresponds to an
/// RMS of 0.0225, just above room noise.
const FULL_SCALE_RMS: f32 = 0.05;

/// Energy-threshold speech classifier.
pub struct EnergyClassifier {
    threshold: f32,
    ready: bool,
}

impl EnergyClassifier {
    /// Creates a classifier voting speech when the score reaches `threshold`.
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            ready: false,
        }
    }

    /// Speech score for a buffer: RMS scaled into [0.0, 1.0].
    pub fn score(samples: &[f32]) -> f32 {
        (calculate_rms(samples) / FULL_SCALE_RMS).min(1.0)
    }
}

impl SpeechClassifier for EnergyClassifier {
    fn init(&mut self, progress: &mut dyn FnMut(&str)) -> Result<()> {
        self.ready = true;
        progress(&format!(
            "energy classifier ready (threshold {:.2})",
            self.threshold
        ));
        Ok(())
    }

    fn classify(&mut self, batch: AudioBatch) -> Result<bool> {
        Ok(Self::score(&batch.samples) >= self.threshold)
    }

    fn reset(&mut self) {
        // Stateless: nothing carries over between segments.
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn name(&self) -> &str {
        "energy"
    }
}

/// Root mean square of normalized samples.
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&s| {
            let s = s as f64;
            s * s
        })
        .sum();

    let mean_square = sum_squares / samples.len() as f64;
    mean_square.sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(samples: Vec<f32>) -> AudioBatch {
        AudioBatch::new(samples, 0)
    }

    #[test]
    fn test_rms_silence_is_zero() {
        assert_eq!(calculate_rms(&[0.0; 1600]), 0.0);
    }

    #[test]
    fn test_rms_of_constant_amplitude() {
        let rms = calculate_rms(&[0.1; 1600]);
        assert!((rms - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_rms_empty_is_zero() {
        assert_eq!(calculate_rms(&[]), 0.0);
    }

    #[test]
    fn test_score_saturates_at_one() {
        assert_eq!(EnergyClassifier::score(&[0.5; 100]), 1.0);
    }

    #[test]
    fn test_silence_is_not_speech() {
        let mut classifier = EnergyClassifier::new(0.45);
        classifier.init(&mut |_| {}).unwrap();

        assert!(!classifier.classify(batch(vec![0.0; 1600])).unwrap());
    }

    #[test]
    fn test_loud_audio_is_speech() {
        let mut classifier = EnergyClassifier::new(0.45);
        classifier.init(&mut |_| {}).unwrap();

        // RMS 0.03 → score 0.6, above the default threshold.
        assert!(classifier.classify(batch(vec![0.03; 1600])).unwrap());
    }

    #[test]
    fn test_quiet_noise_is_not_speech() {
        let mut classifier = EnergyClassifier::new(0.45);
        classifier.init(&mut |_| {}).unwrap();

        // RMS 0.01 → score 0.2, below the default threshold.
        assert!(!classifier.classify(batch(vec![0.01; 1600])).unwrap());
    }

    #[test]
    fn test_threshold_zero_accepts_everything_audible() {
        let mut classifier = EnergyClassifier::new(0.0);
        classifier.init(&mut |_| {}).unwrap();

        assert!(classifier.classify(batch(vec![0.001; 1600])).unwrap());
    }

    #[test]
    fn test_init_reports_readiness() {
        let mut classifier = EnergyClassifier::new(0.45);
        assert!(!classifier.is_ready());

        let mut messages = Vec::new();
        classifier.init(&mut |m| messages.push(m.to_string())).unwrap();

        assert!(classifier.is_ready());
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("energy classifier ready"));
    }

    #[test]
    fn test_name() {
        let classifier = EnergyClassifier::new(0.45);
        assert_eq!(classifier.name(), "energy");
    }
}
