// Audio timing - frame counter behind the render clock
// The audio callback advances it; anyone holding a clone can read "now".

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared frame position of the audio output
#[derive(Debug, Clone)]
pub struct AudioTiming {
    /// Frames rendered so far (incremented by the audio callback)
    sample_position: Arc<AtomicU64>,
    sample_rate: f64,
}

impl AudioTiming {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_position: Arc::new(AtomicU64::new(0)),
            sample_rate,
        }
    }

    pub fn current_sample(&self) -> u64 {
        self.sample_position.load(Ordering::Relaxed)
    }

    /// Current time in seconds since the clock started
    pub fn current_seconds(&self) -> f64 {
        self.samples_to_seconds(self.current_sample())
    }

    /// Advance sample position (called from audio callback)
    pub fn advance(&self, frames: usize) {
        self.sample_position
            .fetch_add(frames as u64, Ordering::Relaxed);
    }

    /// Absolute clock time to frame index; negative times map to frame 0
    pub fn seconds_to_samples(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * self.sample_rate).round() as u64
    }

    pub fn samples_to_seconds(&self, samples: u64) -> f64 {
        samples as f64 / self.sample_rate
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_creation() {
        let timing = AudioTiming::new(48000.0);
        assert_eq!(timing.current_sample(), 0);
        assert_eq!(timing.current_seconds(), 0.0);
        assert_eq!(timing.sample_rate(), 48000.0);
    }

    #[test]
    fn test_advance_samples() {
        let timing = AudioTiming::new(48000.0);
        timing.advance(480);
        assert_eq!(timing.current_sample(), 480);
        timing.advance(480);
        assert_eq!(timing.current_sample(), 960);
        assert!((timing.current_seconds() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_conversions() {
        let timing = AudioTiming::new(48000.0);
        assert_eq!(timing.seconds_to_samples(1.0), 48000);
        assert_eq!(timing.seconds_to_samples(0.01), 480);
        assert_eq!(timing.seconds_to_samples(-1.0), 0);
        assert_eq!(timing.samples_to_seconds(24000), 0.5);
    }

    #[test]
    fn test_clones_share_position() {
        let timing = AudioTiming::new(44100.0);
        let reader = timing.clone();
        timing.advance(100);
        assert_eq!(reader.current_sample(), 100);
    }
}
