// Tap tempo - BPM estimate from a sliding window of tap timestamps

use crate::config::TapTempoConfig;
use crate::sequencer::timeline::clamp_bpm;
use std::collections::VecDeque;

/// Estimates tempo from user taps
///
/// Keeps at most `capacity` timestamps. A gap longer than the timeout
/// starts a fresh window.
#[derive(Debug, Clone)]
pub struct TapTempo {
    taps: VecDeque<f64>,
    capacity: usize,
    timeout_ms: f64,
    bpm: Option<u32>,
}

impl TapTempo {
    pub fn new(config: &TapTempoConfig) -> Self {
        let capacity = config.capacity.max(2);
        Self {
            taps: VecDeque::with_capacity(capacity),
            capacity,
            timeout_ms: config.timeout_ms,
            bpm: None,
        }
    }

    /// Register a tap at `now_ms`, returns the current estimate
    pub fn tap(&mut self, now_ms: f64) -> Option<u32> {
        self.poll(now_ms);

        self.taps.push_back(now_ms);
        while self.taps.len() > self.capacity {
            self.taps.pop_front();
        }

        self.bpm = self.estimate();
        if let Some(bpm) = self.bpm {
            log::debug!("Tap tempo: {} BPM from {} taps", bpm, self.taps.len());
        }
        self.bpm
    }

    /// Clear the window if the last tap is older than the timeout
    pub fn poll(&mut self, now_ms: f64) {
        let expired = self
            .taps
            .back()
            .is_some_and(|last| now_ms - last > self.timeout_ms);
        if expired {
            log::debug!("Tap tempo window expired");
            self.reset();
        }
    }

    pub fn bpm(&self) -> Option<u32> {
        self.bpm
    }

    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }

    pub fn reset(&mut self) {
        self.taps.clear();
        self.bpm = None;
    }

    fn estimate(&self) -> Option<u32> {
        if self.taps.len() < 2 {
            return None;
        }

        let intervals: Vec<f64> = self
            .taps
            .iter()
            .zip(self.taps.iter().skip(1))
            .map(|(a, b)| b - a)
            .collect();
        let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
        if mean <= 0.0 {
            return None;
        }

        Some(clamp_bpm((60_000.0 / mean).round()) as u32)
    }
}

impl Default for TapTempo {
    fn default() -> Self {
        Self::new(&TapTempoConfig::default())
    }
}
