// DSP utilities - Audio hygiene, smoothing and bus dynamics
//
// Small building blocks used by the mix bus and the pitch detector.

use std::f32::consts::FRAC_PI_2;

/// Flush denormals to zero
///
/// Values extremely close to 0 can slow some CPUs down dramatically.
/// Threshold: 1e-15 (far below 32-bit float noise)
#[inline]
pub fn flush_denormals_to_zero(x: f32) -> f32 {
    if x.abs() < 1e-15 { 0.0 } else { x }
}

/// Linear amplitude to decibels
#[inline]
pub fn amp_to_db(amp: f32) -> f32 {
    20.0 * amp.abs().max(1e-10).log10()
}

/// Decibels to linear amplitude
#[inline]
pub fn db_to_amp(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Equal-power pan law
///
/// `pan` in [-1, 1] (left..right), returns (left_gain, right_gain).
/// Center gives ~0.707 on both sides.
#[inline]
pub fn equal_power_pan(pan: f32) -> (f32, f32) {
    let angle = (pan.clamp(-1.0, 1.0) * 0.5 + 0.5) * FRAC_PI_2;
    (angle.cos(), angle.sin())
}

/// Root mean square of a buffer (0.0 for an empty buffer)
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

/// One-pole smoother (first-order low-pass)
///
/// Smooths abrupt parameter changes to avoid clicks.
/// y[n] = y[n-1] + a * (x[n] - y[n-1])
pub struct OnePoleSmoother {
    current: f32,
    coefficient: f32,
}

impl OnePoleSmoother {
    /// `time_constant_ms` is the time to reach ~63% of the target
    ///
    /// ```
    /// use mymusic_practice::audio::dsp_utils::OnePoleSmoother;
    /// let smoother = OnePoleSmoother::new(0.5, 10.0, 44100.0);
    /// assert_eq!(smoother.get(), 0.5);
    /// ```
    pub fn new(initial_value: f32, time_constant_ms: f32, sample_rate: f32) -> Self {
        let time_constant_samples = time_constant_ms * 0.001 * sample_rate;
        let coefficient = if time_constant_samples > 0.0 {
            1.0 / time_constant_samples
        } else {
            1.0
        };

        Self {
            current: initial_value,
            coefficient: coefficient.min(1.0),
        }
    }

    #[inline]
    pub fn process(&mut self, target: f32) -> f32 {
        self.current += self.coefficient * (target - self.current);
        self.current = flush_denormals_to_zero(self.current);
        self.current
    }

    /// Jump to a value without smoothing
    #[inline]
    pub fn reset(&mut self, value: f32) {
        self.current = value;
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }
}

/// Fixed compressor settings of the master bus
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorParams {
    pub threshold_db: f32,
    pub knee_db: f32,
    pub ratio: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            threshold_db: -24.0,
            knee_db: 30.0,
            ratio: 12.0,
            attack_ms: 3.0,
            release_ms: 250.0,
        }
    }
}

/// Stereo feed-forward compressor with a soft knee
pub struct Compressor {
    params: CompressorParams,
    attack_coeff: f32,
    release_coeff: f32,
    envelope: f32,
}

impl Compressor {
    pub fn new(params: CompressorParams, sample_rate: f32) -> Self {
        let attack_coeff = (-1.0 / (params.attack_ms * 0.001 * sample_rate)).exp();
        let release_coeff = (-1.0 / (params.release_ms * 0.001 * sample_rate)).exp();
        Self {
            params,
            attack_coeff,
            release_coeff,
            envelope: 0.0,
        }
    }

    pub fn params(&self) -> CompressorParams {
        self.params
    }

    /// Gain reduction in dB for a given detector level
    pub fn gain_reduction_db(&self, level_db: f32) -> f32 {
        let CompressorParams {
            threshold_db,
            knee_db,
            ratio,
            ..
        } = self.params;
        let slope = 1.0 - 1.0 / ratio;
        let over = level_db - threshold_db;

        if knee_db > 0.0 && 2.0 * over.abs() <= knee_db {
            let x = over + knee_db / 2.0;
            -slope * x * x / (2.0 * knee_db)
        } else if over > 0.0 {
            -slope * over
        } else {
            0.0
        }
    }

    /// Process one stereo frame in place
    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let level = ((left * left + right * right) * 0.5).sqrt();

        let coeff = if level > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = flush_denormals_to_zero(coeff * self.envelope + (1.0 - coeff) * level);

        let gain = db_to_amp(self.gain_reduction_db(amp_to_db(self.envelope)));
        (left * gain, right * gain)
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_denormals() {
        assert_eq!(flush_denormals_to_zero(1e-20), 0.0);
        assert_eq!(flush_denormals_to_zero(0.1), 0.1);
        assert_eq!(flush_denormals_to_zero(-0.1), -0.1);
    }

    #[test]
    fn test_equal_power_pan() {
        let (l, r) = equal_power_pan(0.0);
        assert!((l - r).abs() < 1e-6);
        assert!((l - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-4);

        let (l, r) = equal_power_pan(-1.0);
        assert!((l - 1.0).abs() < 1e-6);
        assert!(r.abs() < 1e-6);

        let (l, r) = equal_power_pan(1.0);
        assert!(l.abs() < 1e-6);
        assert!((r - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rms() {
        assert_eq!(rms(&[]), 0.0);
        assert!((rms(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_smoother_convergence() {
        let mut smoother = OnePoleSmoother::new(0.0, 10.0, 44100.0);

        let mut final_value = 0.0;
        for _ in 0..4410 {
            final_value = smoother.process(1.0);
        }

        assert!((final_value - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_smoother_no_overshoot() {
        let mut smoother = OnePoleSmoother::new(0.0, 5.0, 44100.0);

        for _ in 0..100 {
            let value = smoother.process(1.0);
            assert!((0.0..=1.0).contains(&value));
        }
    }

    #[test]
    fn test_compressor_curve() {
        let comp = Compressor::new(CompressorParams::default(), 48000.0);

        // Far below the knee: untouched
        assert_eq!(comp.gain_reduction_db(-80.0), 0.0);

        // Far above: full ratio
        let reduction = comp.gain_reduction_db(0.0);
        let expected = -(1.0 - 1.0 / 12.0) * 24.0;
        assert!((reduction - expected).abs() < 1e-3);

        // Monotonic through the knee
        let mut last = 0.0;
        for db in (-60..=0).map(|d| d as f32) {
            let r = comp.gain_reduction_db(db);
            assert!(r <= last + 1e-4);
            last = r;
        }
    }

    #[test]
    fn test_compressor_reduces_loud_signal() {
        let mut comp = Compressor::new(CompressorParams::default(), 48000.0);
        let mut out = (0.0, 0.0);
        for _ in 0..48000 {
            out = comp.process(0.9, 0.9);
        }
        assert!(out.0 < 0.9 * 0.5);
        assert!(out.0 > 0.0);
    }
}
