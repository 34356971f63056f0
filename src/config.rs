// Engine configuration
// Timing constants and analysis defaults, loadable from a RON file

use crate::error::{PracticeError, PracticeResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Lookahead scheduler timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Period of the coarse software timer driving `tick()`
    pub tick_interval_ms: f64,
    /// How far ahead of the audio clock events are queued
    pub lookahead_ms: f64,
    /// Minimum distance between "now" and a scheduled start
    pub schedule_epsilon_ms: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 25.0,
            lookahead_ms: 120.0,
            schedule_epsilon_ms: 1.0,
        }
    }
}

impl SchedulerConfig {
    pub fn lookahead_seconds(&self) -> f64 {
        self.lookahead_ms / 1000.0
    }

    pub fn epsilon_seconds(&self) -> f64 {
        self.schedule_epsilon_ms / 1000.0
    }
}

/// Metronome defaults used when a session starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetronomeDefaults {
    pub bpm: u32,
    pub beats_per_measure: u32,
    pub count_in: u32,
    pub click_volume: f32,
}

impl Default for MetronomeDefaults {
    fn default() -> Self {
        Self {
            bpm: 120,
            beats_per_measure: 4,
            count_in: 0,
            click_volume: 0.8,
        }
    }
}

/// Tap-tempo window settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TapTempoConfig {
    pub capacity: usize,
    pub timeout_ms: f64,
}

impl Default for TapTempoConfig {
    fn default() -> Self {
        Self {
            capacity: 8,
            timeout_ms: 2000.0,
        }
    }
}

/// Pitch detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    pub min_frequency: f64,
    pub max_frequency: f64,
    pub silence_threshold: f32,
    /// Reference pitch of A4 in Hz
    pub reference_a: f64,
    pub buffer_size: usize,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            min_frequency: 55.0,
            max_frequency: 1760.0,
            silence_threshold: 0.001,
            reference_a: 440.0,
            buffer_size: 4096,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scheduler: SchedulerConfig,
    pub metronome: MetronomeDefaults,
    pub tap_tempo: TapTempoConfig,
    pub tuner: TunerConfig,
}

impl EngineConfig {
    /// Parse a RON document. Missing fields take their defaults.
    pub fn from_ron_str(source: &str) -> PracticeResult<Self> {
        let config: EngineConfig = ron::from_str(source).map_err(|e| {
            PracticeError::Configuration(format!("Failed to parse config: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_ron_string(&self) -> PracticeResult<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).map_err(|e| {
            PracticeError::Configuration(format!("Failed to serialize config: {}", e))
        })
    }

    /// Load config from a RON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> PracticeResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            PracticeError::Configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config = Self::from_ron_str(&source)?;
        log::info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Save config to a RON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> PracticeResult<()> {
        let source = self.to_ron_string()?;
        std::fs::write(path.as_ref(), source).map_err(|e| {
            PracticeError::Configuration(format!("Failed to write config file: {}", e))
        })
    }

    /// Check the values the engines rely on
    pub fn validate(&self) -> PracticeResult<()> {
        let s = &self.scheduler;
        if s.tick_interval_ms <= 0.0 {
            return Err(PracticeError::Configuration(
                "scheduler.tick_interval_ms must be positive".to_string(),
            ));
        }
        if s.lookahead_ms <= s.tick_interval_ms {
            return Err(PracticeError::Configuration(
                "scheduler.lookahead_ms must exceed the tick interval".to_string(),
            ));
        }
        if s.schedule_epsilon_ms < 0.0 {
            return Err(PracticeError::Configuration(
                "scheduler.schedule_epsilon_ms cannot be negative".to_string(),
            ));
        }

        if self.tap_tempo.capacity < 2 {
            return Err(PracticeError::Configuration(
                "tap_tempo.capacity must hold at least 2 taps".to_string(),
            ));
        }
        if self.tap_tempo.timeout_ms <= 0.0 {
            return Err(PracticeError::Configuration(
                "tap_tempo.timeout_ms must be positive".to_string(),
            ));
        }

        let t = &self.tuner;
        if t.min_frequency <= 0.0 || t.max_frequency <= t.min_frequency {
            return Err(PracticeError::Configuration(
                "tuner frequency range must satisfy 0 < min < max".to_string(),
            ));
        }
        if t.reference_a <= 0.0 {
            return Err(PracticeError::Configuration(
                "tuner.reference_a must be positive".to_string(),
            ));
        }
        if t.buffer_size == 0 {
            return Err(PracticeError::Configuration(
                "tuner.buffer_size cannot be zero".to_string(),
            ));
        }

        let m = &self.metronome;
        if !(20..=300).contains(&m.bpm) || m.beats_per_measure == 0 {
            return Err(PracticeError::Configuration(
                "metronome defaults need bpm in 20..=300 and at least one beat".to_string(),
            ));
        }

        Ok(())
    }
}
