// Note math - frequency <-> equal-tempered note conversion

use serde::Serialize;
use std::fmt;

/// Chromatic note names, index 0 = C
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Note index of A4
pub const A4_NOTE_INDEX: i32 = 69;

/// A detected pitch mapped to the nearest note
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedNote {
    pub name: &'static str,
    /// Note index, 69 = A4
    pub value: i32,
    pub octave: i32,
    /// Deviation from the equal-tempered pitch, floored
    pub cents: i32,
    /// Measured frequency in Hz
    pub frequency: f64,
}

impl DetectedNote {
    /// Same note name and octave, ignoring cents
    pub fn same_note(&self, other: &DetectedNote) -> bool {
        self.value == other.value
    }

    pub fn is_in_tune(&self, tolerance_cents: i32) -> bool {
        self.cents.abs() <= tolerance_cents
    }
}

impl fmt::Display for DetectedNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} ({:+} cents)", self.name, self.octave, self.cents)
    }
}

/// Equal-tempered frequency of a note index
pub fn note_frequency(note_index: i32, reference_a: f64) -> f64 {
    reference_a * 2.0_f64.powf((note_index - A4_NOTE_INDEX) as f64 / 12.0)
}

/// Nearest note index for a frequency
pub fn note_index(frequency: f64, reference_a: f64) -> i32 {
    (12.0 * (frequency / reference_a).log2()).round() as i32 + A4_NOTE_INDEX
}

pub fn note_name(note_index: i32) -> &'static str {
    NOTE_NAMES[note_index.rem_euclid(12) as usize]
}

/// Map a frequency to its nearest note. None for non-positive input.
pub fn frequency_to_note(frequency: f64, reference_a: f64) -> Option<DetectedNote> {
    if frequency.is_nan() || frequency <= 0.0 || reference_a.is_nan() || reference_a <= 0.0 {
        return None;
    }

    let value = note_index(frequency, reference_a);
    let standard = note_frequency(value, reference_a);
    let cents = (1200.0 * (frequency / standard).log2()).floor() as i32;

    Some(DetectedNote {
        name: note_name(value),
        value,
        octave: value.div_euclid(12) - 1,
        cents,
        frequency,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a440() {
        let note = frequency_to_note(440.0, 440.0).unwrap();
        assert_eq!(note.name, "A");
        assert_eq!(note.value, 69);
        assert_eq!(note.octave, 4);
        assert_eq!(note.cents, 0);
        assert_eq!(note.to_string(), "A4 (+0 cents)");
    }

    #[test]
    fn test_low_e_string() {
        let note = frequency_to_note(82.41, 440.0).unwrap();
        assert_eq!(note.name, "E");
        assert_eq!(note.octave, 2);
        assert!(note.cents.abs() <= 1);
    }

    #[test]
    fn test_cents_are_floored() {
        // 10 cents sharp of A4
        let sharp = 440.0 * 2.0_f64.powf(10.5 / 1200.0);
        assert_eq!(frequency_to_note(sharp, 440.0).unwrap().cents, 10);

        // 10.5 cents flat floors to -11
        let flat = 440.0 * 2.0_f64.powf(-10.5 / 1200.0);
        assert_eq!(frequency_to_note(flat, 440.0).unwrap().cents, -11);
    }

    #[test]
    fn test_reference_pitch() {
        let note = frequency_to_note(432.0, 432.0).unwrap();
        assert_eq!(note.name, "A");
        assert_eq!(note.cents, 0);

        // A 440 A sounds sharp against a 432 reference
        let note = frequency_to_note(440.0, 432.0).unwrap();
        assert_eq!(note.name, "A");
        assert!(note.cents > 30);
    }

    #[test]
    fn test_note_frequency() {
        assert!((note_frequency(60, 440.0) - 261.6256).abs() < 1e-3);
        assert_eq!(note_frequency(81, 440.0), 880.0);
        assert_eq!(note_name(61), "C#");
    }

    #[test]
    fn test_invalid_frequency() {
        assert!(frequency_to_note(0.0, 440.0).is_none());
        assert!(frequency_to_note(-5.0, 440.0).is_none());
        assert!(frequency_to_note(f64::NAN, 440.0).is_none());
    }
}
