// Timeline - Tempo representation shared by the drum loop and the metronome
// Handles bpm bounds, beat/step durations and Italian tempo markings

use std::fmt;

/// Lowest tempo any engine accepts
pub const MIN_BPM: f64 = 20.0;
/// Highest tempo any engine accepts
pub const MAX_BPM: f64 = 300.0;

/// Clamp a bpm value into [MIN_BPM, MAX_BPM]. NaN maps to MIN_BPM.
pub fn clamp_bpm(bpm: f64) -> f64 {
    if bpm.is_nan() {
        return MIN_BPM;
    }
    bpm.clamp(MIN_BPM, MAX_BPM)
}

/// Italian tempo marking for a bpm value
///
/// Each marking covers bpm values below its upper bound; Moderato
/// includes 120.
pub fn tempo_name(bpm: f64) -> &'static str {
    const MARKINGS: [(f64, &str); 10] = [
        (25.0, "Larghissimo"),
        (40.0, "Grave"),
        (60.0, "Largo"),
        (66.0, "Larghetto"),
        (76.0, "Adagio"),
        (108.0, "Andante"),
        (121.0, "Moderato"),
        (157.0, "Allegro"),
        (177.0, "Vivace"),
        (201.0, "Presto"),
    ];

    MARKINGS
        .iter()
        .find(|(upper, _)| bpm < *upper)
        .map(|(_, name)| *name)
        .unwrap_or("Prestissimo")
}

/// Tempo in BPM (Beats Per Minute), always within [MIN_BPM, MAX_BPM]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    /// Creates a new tempo, clamping out-of-range values
    pub fn new(bpm: f64) -> Self {
        Self {
            bpm: clamp_bpm(bpm),
        }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = clamp_bpm(bpm);
    }

    /// Duration of one beat in seconds
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Milliseconds between metronome clicks
    pub fn beat_interval_ms(&self) -> f64 {
        60_000.0 / self.bpm
    }

    /// Duration of one sequencer step (a beat split into `steps_per_beat`)
    pub fn step_duration_seconds(&self, steps_per_beat: u32) -> f64 {
        self.beat_duration_seconds() / steps_per_beat.max(1) as f64
    }

    pub fn name(&self) -> &'static str {
        tempo_name(self.bpm)
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(120.0)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0} BPM ({})", self.bpm, self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tempo() {
        let tempo = Tempo::new(120.0);
        assert_eq!(tempo.bpm(), 120.0);
        assert_eq!(tempo.beat_duration_seconds(), 0.5);
        assert_eq!(tempo.beat_interval_ms(), 500.0);

        // 16th notes at 120 BPM
        assert_eq!(tempo.step_duration_seconds(4), 0.125);
        assert_eq!(tempo.to_string(), "120 BPM (Moderato)");
    }

    #[test]
    fn test_tempo_is_clamped() {
        assert_eq!(Tempo::new(5.0).bpm(), MIN_BPM);
        assert_eq!(Tempo::new(999.0).bpm(), MAX_BPM);

        let mut tempo = Tempo::default();
        tempo.set_bpm(f64::NAN);
        assert_eq!(tempo.bpm(), MIN_BPM);
    }

    #[test]
    fn test_tempo_names() {
        assert_eq!(tempo_name(24.0), "Larghissimo");
        assert_eq!(tempo_name(25.0), "Grave");
        assert_eq!(tempo_name(50.0), "Largo");
        assert_eq!(tempo_name(100.0), "Andante");
        assert_eq!(tempo_name(120.0), "Moderato");
        assert_eq!(tempo_name(121.0), "Allegro");
        assert_eq!(tempo_name(180.0), "Presto");
        assert_eq!(tempo_name(250.0), "Prestissimo");
    }

    #[test]
    fn test_step_duration_guards_zero() {
        let tempo = Tempo::new(60.0);
        assert_eq!(tempo.step_duration_seconds(0), 1.0);
    }
}
