// Pattern - Drum project model: tracks, sections and step grids
// Every mutation leaves the pattern sets unique, sorted and within bounds

use crate::error::{PracticeError, PracticeResult};
use crate::sequencer::timeline::{MAX_BPM, MIN_BPM, clamp_bpm};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Unique identifier for tracks
pub type TrackId = String;

/// Unique identifier for sections
pub type SectionId = String;

/// Format version written into shared projects
pub const PROJECT_VERSION: u32 = 1;

pub const MAX_BARS: u32 = 16;
pub const MAX_BEATS_PER_BAR: u32 = 32;
pub const MAX_STEPS_PER_BEAT: u32 = 8;
pub const MAX_SWING: f32 = 0.75;
pub const MAX_NUDGE_MS: f32 = 80.0;

/// Generate a unique id for a new track or section
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Keep only indices in [0, step_count), sorted and unique
pub fn normalize_steps<I>(steps: I, step_count: u32) -> BTreeSet<u32>
where
    I: IntoIterator<Item = i64>,
{
    steps
        .into_iter()
        .filter(|s| *s >= 0 && *s < step_count as i64)
        .map(|s| s as u32)
        .collect()
}

/// Whether a track is audible given the solo state of the whole project
///
/// With any solo present only soloed, unmuted tracks play; otherwise
/// every unmuted track plays.
pub fn should_play_track(track: &DrumTrack, any_solo: bool) -> bool {
    if any_solo {
        track.solo && !track.mute
    } else {
        !track.mute
    }
}

/// One sample lane of the drum loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrumTrack {
    pub id: TrackId,
    pub name: String,
    pub sample_path: String,
    /// 0.0 - 1.0
    pub volume: f32,
    /// -1.0 left, 0.0 center, 1.0 right
    pub pan: f32,
    /// Timing offset, -80 to +80 ms
    pub nudge_ms: f32,
    pub mute: bool,
    pub solo: bool,
}

impl DrumTrack {
    pub fn new(name: impl Into<String>, sample_path: impl Into<String>) -> Self {
        Self::with_id(generate_id(), name, sample_path)
    }

    pub fn with_id(
        id: impl Into<String>,
        name: impl Into<String>,
        sample_path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sample_path: sample_path.into(),
            volume: 0.8,
            pan: 0.0,
            nudge_ms: 0.0,
            mute: false,
            solo: false,
        }
    }

    /// Pull volume, pan and nudge back into range
    pub fn clamp_params(&mut self) {
        self.volume = clamp_unit(self.volume, 0.0, 1.0);
        self.pan = clamp_unit(self.pan, -1.0, 1.0);
        self.nudge_ms = clamp_unit(self.nudge_ms, -MAX_NUDGE_MS, MAX_NUDGE_MS);
    }
}

fn clamp_unit(value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() { min.max(0.0).min(max) } else { value.clamp(min, max) }
}

/// A looped block of bars with its own grid and step pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrumSection {
    pub id: SectionId,
    pub name: String,
    pub bars: u32,
    pub beats_per_bar: u32,
    pub steps_per_beat: u32,
    /// How many times the section plays before moving on
    pub repeats: u32,
    /// Off-beat delay as a fraction of half a step, 0.0 - 0.75
    pub swing: f32,
    /// track id -> active step indices
    pub pattern: BTreeMap<TrackId, BTreeSet<u32>>,
}

impl DrumSection {
    /// One bar of 4/4 sixteenths
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(generate_id(), name)
    }

    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bars: 1,
            beats_per_bar: 4,
            steps_per_beat: 4,
            repeats: 1,
            swing: 0.0,
            pattern: BTreeMap::new(),
        }
    }

    /// Total number of steps in the section grid
    pub fn step_count(&self) -> u32 {
        self.beats_per_bar * self.bars * self.steps_per_beat
    }

    pub fn is_step_active(&self, track_id: &str, step: u32) -> bool {
        self.pattern
            .get(track_id)
            .is_some_and(|steps| steps.contains(&step))
    }

    /// Active steps of a track (empty if the track has none)
    pub fn steps_for(&self, track_id: &str) -> impl Iterator<Item = u32> + '_ {
        self.pattern.get(track_id).into_iter().flatten().copied()
    }

    /// Swing delay of a step in seconds; only odd (off-beat) steps move
    pub fn swing_offset(&self, step: u32, step_duration: f64) -> f64 {
        swing_offset(step, step_duration, self.swing)
    }

    /// Toggle one step, returns the new state
    pub fn toggle_step(&mut self, track_id: &str, step: u32) -> bool {
        if step >= self.step_count() {
            return false;
        }
        let steps = self.pattern.entry(track_id.to_string()).or_default();
        let active = if steps.remove(&step) {
            false
        } else {
            steps.insert(step);
            true
        };
        if steps.is_empty() {
            self.pattern.remove(track_id);
        }
        active
    }

    /// Replace a track's steps; out-of-range and duplicate indices are dropped
    pub fn set_steps<I>(&mut self, track_id: &str, steps: I)
    where
        I: IntoIterator<Item = i64>,
    {
        let normalized = normalize_steps(steps, self.step_count());
        if normalized.is_empty() {
            self.pattern.remove(track_id);
        } else {
            self.pattern.insert(track_id.to_string(), normalized);
        }
    }

    /// Change the grid, then re-normalize every pattern row
    pub fn resize(&mut self, bars: u32, beats_per_bar: u32, steps_per_beat: u32) {
        self.bars = bars.clamp(1, MAX_BARS);
        self.beats_per_bar = beats_per_bar.clamp(1, MAX_BEATS_PER_BAR);
        self.steps_per_beat = steps_per_beat.clamp(1, MAX_STEPS_PER_BEAT);
        self.normalize_pattern();
    }

    pub fn set_repeats(&mut self, repeats: u32) {
        self.repeats = repeats.max(1);
    }

    pub fn set_swing(&mut self, swing: f32) {
        self.swing = clamp_unit(swing, 0.0, MAX_SWING);
    }

    /// Drop indices outside the grid and rows left empty
    pub fn normalize_pattern(&mut self) {
        let step_count = self.step_count();
        for steps in self.pattern.values_mut() {
            steps.retain(|s| *s < step_count);
        }
        self.pattern.retain(|_, steps| !steps.is_empty());
    }
}

/// Swing delay for a step: `step_duration * swing * 0.5` on odd steps, 0 otherwise
pub fn swing_offset(step: u32, step_duration: f64, swing: f32) -> f64 {
    if step % 2 == 1 {
        step_duration * swing as f64 * 0.5
    } else {
        0.0
    }
}

/// A complete drum loop project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrumProject {
    pub version: u32,
    pub bpm: f64,
    pub master_volume: f32,
    pub tracks: Vec<DrumTrack>,
    /// Never empty
    pub sections: Vec<DrumSection>,
}

impl Default for DrumProject {
    /// Kick / snare / hi-hat backbeat over one bar of sixteenths
    fn default() -> Self {
        let tracks = vec![
            DrumTrack::with_id("kick", "Kick", "samples/kick.wav"),
            DrumTrack::with_id("snare", "Snare", "samples/snare.wav"),
            DrumTrack::with_id("hihat", "Hi-Hat", "samples/hihat.wav"),
        ];

        let mut section = DrumSection::with_id("main", "Main");
        section.set_steps("kick", [0, 8]);
        section.set_steps("snare", [4, 12]);
        section.set_steps("hihat", (0..16).step_by(2));

        Self {
            version: PROJECT_VERSION,
            bpm: 100.0,
            master_volume: 0.8,
            tracks,
            sections: vec![section],
        }
    }
}

impl DrumProject {
    /// A project with no tracks and one empty section
    pub fn empty() -> Self {
        Self {
            version: PROJECT_VERSION,
            bpm: 100.0,
            master_volume: 0.8,
            tracks: Vec::new(),
            sections: vec![DrumSection::new("Section 1")],
        }
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = clamp_bpm(bpm);
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = clamp_unit(volume, 0.0, 1.0);
    }

    pub fn has_solo(&self) -> bool {
        self.tracks.iter().any(|t| t.solo)
    }

    /// Tracks that should sound under the current mute/solo state
    pub fn audible_tracks(&self) -> impl Iterator<Item = &DrumTrack> {
        let any_solo = self.has_solo();
        self.tracks
            .iter()
            .filter(move |t| should_play_track(t, any_solo))
    }

    pub fn track(&self, track_id: &str) -> Option<&DrumTrack> {
        self.tracks.iter().find(|t| t.id == track_id)
    }

    pub fn section(&self, section_id: &str) -> Option<&DrumSection> {
        self.sections.iter().find(|s| s.id == section_id)
    }

    pub fn section_mut(&mut self, section_id: &str) -> Option<&mut DrumSection> {
        self.sections.iter_mut().find(|s| s.id == section_id)
    }

    /// Distinct sample paths referenced by the tracks
    pub fn sample_paths(&self) -> BTreeSet<&str> {
        self.tracks
            .iter()
            .map(|t| t.sample_path.as_str())
            .filter(|p| !p.is_empty())
            .collect()
    }

    pub fn add_track(&mut self, mut track: DrumTrack) -> TrackId {
        track.clamp_params();
        let id = track.id.clone();
        self.tracks.push(track);
        id
    }

    /// Remove a track and its rows in every section
    pub fn remove_track(&mut self, track_id: &str) -> Option<DrumTrack> {
        let index = self.tracks.iter().position(|t| t.id == track_id)?;
        for section in &mut self.sections {
            section.pattern.remove(track_id);
        }
        Some(self.tracks.remove(index))
    }

    /// Edit a track in place; parameters are clamped afterwards
    pub fn update_track<F>(&mut self, track_id: &str, edit: F) -> bool
    where
        F: FnOnce(&mut DrumTrack),
    {
        match self.tracks.iter_mut().find(|t| t.id == track_id) {
            Some(track) => {
                edit(track);
                track.id = track_id.to_string();
                track.clamp_params();
                true
            }
            None => false,
        }
    }

    /// Toggle a step; unknown track or section ids are ignored
    pub fn toggle_step(&mut self, section_id: &str, track_id: &str, step: u32) -> Option<bool> {
        if self.track(track_id).is_none() {
            return None;
        }
        self.section_mut(section_id)
            .map(|s| s.toggle_step(track_id, step))
    }

    pub fn clear_track_steps(&mut self, section_id: &str, track_id: &str) -> bool {
        match self.section_mut(section_id) {
            Some(section) => section.pattern.remove(track_id).is_some(),
            None => false,
        }
    }

    pub fn add_section(&mut self, section: DrumSection) -> SectionId {
        let mut section = section;
        section.resize(section.bars, section.beats_per_bar, section.steps_per_beat);
        section.set_repeats(section.repeats);
        section.set_swing(section.swing);
        let id = section.id.clone();
        self.sections.push(section);
        id
    }

    /// Copy a section (new id) right after the original
    pub fn duplicate_section(&mut self, section_id: &str) -> Option<SectionId> {
        let index = self.sections.iter().position(|s| s.id == section_id)?;
        let mut copy = self.sections[index].clone();
        copy.id = generate_id();
        copy.name = format!("{} (copy)", copy.name);
        let id = copy.id.clone();
        self.sections.insert(index + 1, copy);
        Some(id)
    }

    /// Remove a section; the last one can never be removed
    pub fn remove_section(&mut self, section_id: &str) -> Option<DrumSection> {
        if self.sections.len() <= 1 {
            return None;
        }
        let index = self.sections.iter().position(|s| s.id == section_id)?;
        Some(self.sections.remove(index))
    }

    /// Move a section to a new position (clamped to the list)
    pub fn move_section(&mut self, section_id: &str, new_index: usize) -> bool {
        let Some(index) = self.sections.iter().position(|s| s.id == section_id) else {
            return false;
        };
        let section = self.sections.remove(index);
        let new_index = new_index.min(self.sections.len());
        self.sections.insert(new_index, section);
        true
    }

    pub fn resize_section(
        &mut self,
        section_id: &str,
        bars: u32,
        beats_per_bar: u32,
        steps_per_beat: u32,
    ) -> bool {
        match self.section_mut(section_id) {
            Some(section) => {
                section.resize(bars, beats_per_bar, steps_per_beat);
                true
            }
            None => false,
        }
    }

    pub fn set_section_repeats(&mut self, section_id: &str, repeats: u32) -> bool {
        match self.section_mut(section_id) {
            Some(section) => {
                section.set_repeats(repeats);
                true
            }
            None => false,
        }
    }

    pub fn set_section_swing(&mut self, section_id: &str, swing: f32) -> bool {
        match self.section_mut(section_id) {
            Some(section) => {
                section.set_swing(swing);
                true
            }
            None => false,
        }
    }

    /// Schema check used when a project arrives from outside
    pub fn validate(&self) -> PracticeResult<()> {
        fn invalid(message: String) -> PracticeResult<()> {
            Err(PracticeError::Validation(message))
        }

        if self.version == 0 || self.version > PROJECT_VERSION {
            return invalid(format!("Unsupported project version {}", self.version));
        }
        if !(MIN_BPM..=MAX_BPM).contains(&self.bpm) {
            return invalid(format!("BPM {} outside {}-{}", self.bpm, MIN_BPM, MAX_BPM));
        }
        if !(0.0..=1.0).contains(&self.master_volume) {
            return invalid("Master volume must be between 0 and 1".to_string());
        }
        if self.sections.is_empty() {
            return invalid("Project must have at least one section".to_string());
        }

        let mut track_ids = BTreeSet::new();
        for track in &self.tracks {
            if track.id.is_empty() || !track_ids.insert(track.id.as_str()) {
                return invalid(format!("Duplicate or empty track id '{}'", track.id));
            }
            if !(0.0..=1.0).contains(&track.volume) {
                return invalid(format!("Track '{}' volume out of range", track.name));
            }
            if !(-1.0..=1.0).contains(&track.pan) {
                return invalid(format!("Track '{}' pan out of range", track.name));
            }
            if !(-MAX_NUDGE_MS..=MAX_NUDGE_MS).contains(&track.nudge_ms) {
                return invalid(format!("Track '{}' nudge out of range", track.name));
            }
        }

        let mut section_ids = BTreeSet::new();
        for section in &self.sections {
            if section.id.is_empty() || !section_ids.insert(section.id.as_str()) {
                return invalid(format!("Duplicate or empty section id '{}'", section.id));
            }
            if !(1..=MAX_BARS).contains(&section.bars)
                || !(1..=MAX_BEATS_PER_BAR).contains(&section.beats_per_bar)
                || !(1..=MAX_STEPS_PER_BEAT).contains(&section.steps_per_beat)
            {
                return invalid(format!("Section '{}' grid out of range", section.name));
            }
            if section.repeats == 0 {
                return invalid(format!("Section '{}' must repeat at least once", section.name));
            }
            if !(0.0..=MAX_SWING).contains(&section.swing) {
                return invalid(format!("Section '{}' swing out of range", section.name));
            }
            let step_count = section.step_count();
            for (track_id, steps) in &section.pattern {
                if !track_ids.contains(track_id.as_str()) {
                    return invalid(format!(
                        "Section '{}' references unknown track '{}'",
                        section.name, track_id
                    ));
                }
                if steps.iter().any(|s| *s >= step_count) {
                    return invalid(format!(
                        "Section '{}' has steps beyond {}",
                        section.name, step_count
                    ));
                }
            }
        }

        Ok(())
    }
}
