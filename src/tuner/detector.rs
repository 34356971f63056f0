// Pitch detector - autocorrelation over a bounded lag range
// Monophonic only; one frequency estimate per analysis window

use crate::audio::dsp_utils::rms;
use crate::config::TunerConfig;
use crate::tuner::notes::{DetectedNote, frequency_to_note};

/// Autocorrelation pitch detector with a two-window debounce
#[derive(Debug, Clone)]
pub struct PitchDetector {
    config: TunerConfig,
    sample_rate: f64,
    min_lag: usize,
    max_lag: usize,
    /// Note name seen on the previous window
    previous: Option<&'static str>,
}

impl PitchDetector {
    pub fn new(config: TunerConfig, sample_rate: f64) -> Self {
        let min_lag = (sample_rate / config.max_frequency).ceil().max(1.0) as usize;
        let max_lag = (sample_rate / config.min_frequency).floor() as usize;
        Self {
            config,
            sample_rate,
            min_lag,
            max_lag,
            previous: None,
        }
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Lag range searched, in samples
    pub fn lag_range(&self) -> (usize, usize) {
        (self.min_lag, self.max_lag)
    }

    /// Fundamental frequency of `buffer`, or None for silence and
    /// out-of-range results
    pub fn detect_frequency(&self, buffer: &[f32]) -> Option<f64> {
        if buffer.len() < 2 || rms(buffer) < self.config.silence_threshold {
            return None;
        }

        let max_lag = self.max_lag.min(buffer.len() - 1);
        if self.min_lag > max_lag {
            return None;
        }

        // Peaks are local maxima of the correlation. The lobe around lag
        // zero only falls, so it never qualifies. Candidates reach one lag
        // past each end of the range so a peak straddling a bound is kept;
        // the frequency check below has the final word.
        let first = self.min_lag.saturating_sub(1).max(1);
        let lowest = first - 1;
        let highest = (max_lag + 2).min(buffer.len() - 1);
        let correlations: Vec<f64> = (lowest..=highest)
            .map(|lag| autocorrelation(buffer, lag))
            .collect();
        let at = |lag: usize| correlations[lag - lowest];

        let (best_lag, best) = (first..highest)
            .filter(|&lag| at(lag) > at(lag - 1) && at(lag) >= at(lag + 1))
            .map(|lag| (lag, at(lag)))
            .fold(None, |best: Option<(usize, f64)>, cur| match best {
                Some(b) if b.1 >= cur.1 => Some(b),
                _ => Some(cur),
            })?;
        if best <= 0.0 {
            return None;
        }

        let refined = refine_lag(buffer, best_lag, best);
        self.frequency_for_lag(refined)
    }

    fn frequency_for_lag(&self, lag: f64) -> Option<f64> {
        if lag <= 0.0 {
            return None;
        }
        let frequency = self.sample_rate / lag;
        (self.config.min_frequency..=self.config.max_frequency)
            .contains(&frequency)
            .then_some(frequency)
    }

    /// Analyse one window and apply the debounce
    ///
    /// A note is returned only when the same note name was also found on
    /// the previous window; silence breaks the streak.
    pub fn analyze(&mut self, buffer: &[f32]) -> Option<DetectedNote> {
        let candidate = self
            .detect_frequency(buffer)
            .and_then(|f| frequency_to_note(f, self.config.reference_a));

        let name = candidate.as_ref().map(|note| note.name);
        let stable = name.is_some() && name == self.previous;
        self.previous = name;

        if stable { candidate } else { None }
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}

fn autocorrelation(buffer: &[f32], lag: usize) -> f64 {
    buffer
        .iter()
        .zip(&buffer[lag..])
        .map(|(a, b)| *a as f64 * *b as f64)
        .sum()
}

/// Parabolic interpolation around the best lag
fn refine_lag(buffer: &[f32], lag: usize, peak: f64) -> f64 {
    if lag < 1 || lag + 1 >= buffer.len() {
        return lag as f64;
    }

    let before = autocorrelation(buffer, lag - 1);
    let after = autocorrelation(buffer, lag + 1);
    let denominator = before - 2.0 * peak + after;
    if denominator.abs() < 1e-12 {
        return lag as f64;
    }

    let shift = 0.5 * (before - after) / denominator;
    if shift.abs() > 1.0 {
        lag as f64
    } else {
        lag as f64 + shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f32::consts::PI;

    const SAMPLE_RATE: f64 = 44100.0;

    fn sine(frequency: f32, amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * frequency * i as f32 / SAMPLE_RATE as f32).sin() * amplitude)
            .collect()
    }

    fn detector() -> PitchDetector {
        PitchDetector::new(TunerConfig::default(), SAMPLE_RATE)
    }

    #[test]
    fn test_lag_range() {
        // ceil(44100 / 1760), floor(44100 / 55)
        assert_eq!(detector().lag_range(), (26, 801));
    }

    #[test]
    fn test_detects_a440() {
        let frequency = detector().detect_frequency(&sine(440.0, 0.5, 4096)).unwrap();
        assert!((frequency - 440.0).abs() < 1.0, "got {}", frequency);
    }

    #[test]
    fn test_detects_low_and_high_strings() {
        let low = detector().detect_frequency(&sine(82.41, 0.5, 4096)).unwrap();
        assert!((low - 82.41).abs() < 1.0, "got {}", low);

        let high = detector().detect_frequency(&sine(659.25, 0.5, 4096)).unwrap();
        assert!((high - 659.25).abs() < 3.0, "got {}", high);
    }

    #[test]
    fn test_high_register_keeps_its_octave() {
        let detector = detector();
        // Periods from about 44 samples down to just under the 26-sample bound
        let sweep = (1000..=1740).step_by(20).map(|f| f as f32);
        for frequency in sweep.chain([1174.7, 1318.5, 1661.2]) {
            let detected = detector
                .detect_frequency(&sine(frequency, 0.5, 4096))
                .unwrap_or_else(|| panic!("no pitch for {} Hz", frequency));
            let error = (detected - frequency as f64).abs() / frequency as f64;
            assert!(error < 0.01, "{} Hz detected as {}", frequency, detected);
        }

        let e6 = detector.detect_frequency(&sine(1318.5, 0.5, 4096)).unwrap();
        let note = frequency_to_note(e6, 440.0).unwrap();
        assert_eq!((note.name, note.octave), ("E", 6));
    }

    #[test]
    fn test_range_bounds_are_detected() {
        let detector = detector();
        let low = detector.detect_frequency(&sine(55.5, 0.5, 4096)).unwrap();
        assert!((low - 55.5).abs() < 1.0, "got {}", low);
        let high = detector.detect_frequency(&sine(1750.0, 0.5, 4096)).unwrap();
        assert!((high - 1750.0).abs() < 20.0, "got {}", high);
    }

    #[test]
    fn test_silence_has_no_pitch() {
        assert!(detector().detect_frequency(&vec![0.0; 4096]).is_none());
        // Below the 0.001 RMS threshold
        assert!(detector().detect_frequency(&sine(440.0, 0.001, 4096)).is_none());
        assert!(detector().detect_frequency(&[]).is_none());
    }

    #[test]
    fn test_out_of_range_lag_is_rejected() {
        let detector = detector();
        assert!(detector.frequency_for_lag(10.0).is_none()); // 4410 Hz
        assert!(detector.frequency_for_lag(1000.0).is_none()); // 44.1 Hz
        assert!(detector.frequency_for_lag(100.0).is_some());
        assert!(detector.frequency_for_lag(0.0).is_none());
    }

    #[test]
    fn test_flat_correlation_falls_back_to_integer_lag() {
        // A linear ramp in correlation gives a zero parabola denominator
        let buffer = vec![1.0f32; 64];
        assert_eq!(refine_lag(&buffer, 10, autocorrelation(&buffer, 10)), 10.0);
    }

    #[test]
    fn test_noise_never_panics() {
        let mut rng = StdRng::seed_from_u64(7);
        let noise: Vec<f32> = (0..4096).map(|_| rng.gen_range(-0.5..0.5)).collect();
        if let Some(frequency) = detector().detect_frequency(&noise) {
            assert!((55.0..=1760.0).contains(&frequency));
        }
    }

    #[test]
    fn test_debounce_needs_two_windows() {
        let mut detector = detector();
        let a = sine(440.0, 0.5, 4096);
        let e = sine(329.63, 0.5, 4096);

        assert!(detector.analyze(&a).is_none());
        let note = detector.analyze(&a).unwrap();
        assert_eq!((note.name, note.octave), ("A", 4));
        assert!(note.cents.abs() <= 2);

        // Changing note restarts the streak
        assert!(detector.analyze(&e).is_none());
        assert_eq!(detector.analyze(&e).unwrap().name, "E");

        // Silence in between breaks it too
        assert!(detector.analyze(&vec![0.0; 4096]).is_none());
        assert!(detector.analyze(&e).is_none());
    }
}
