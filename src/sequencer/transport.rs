// Transport - Playback state and the published playhead cursor

use serde::{Deserialize, Serialize};

/// Transport state of the drum loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransportState {
    #[default]
    Stopped,
    /// Fetching sample buffers before the first step
    Preparing,
    Playing,
}

impl TransportState {
    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing)
    }

    /// Check if transport is stopped or still preparing
    pub fn is_stopped(&self) -> bool {
        !self.is_playing()
    }
}

/// Playhead position as seen by listeners
///
/// Republished once per scheduler tick, trailing the queued events so it
/// reflects what is audible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaybackCursor {
    /// Completed passes over the whole section list
    pub loop_count: u32,
    pub section_index: usize,
    pub step_index: u32,
    /// Steps in the current section
    pub total_steps: u32,
}

impl PlaybackCursor {
    /// Progress through the current section, 0.0 - 1.0
    pub fn progress(&self) -> f32 {
        if self.total_steps == 0 {
            0.0
        } else {
            self.step_index as f32 / self.total_steps as f32
        }
    }
}

/// Scheduler-owned position record, created on play and dropped on stop
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub section_index: usize,
    pub step_index: u32,
    pub repeat_index: u32,
    pub loop_count: u32,
    /// Audio clock time (seconds) of the next step to schedule
    pub next_event_time: f64,
}

impl PlaybackState {
    pub fn new(start_time: f64) -> Self {
        Self {
            section_index: 0,
            step_index: 0,
            repeat_index: 0,
            loop_count: 0,
            next_event_time: start_time,
        }
    }

    pub fn cursor(&self, total_steps: u32) -> PlaybackCursor {
        PlaybackCursor {
            loop_count: self.loop_count,
            section_index: self.section_index,
            step_index: self.step_index,
            total_steps,
        }
    }

    /// Move to the next step
    ///
    /// `step_count` and `repeats` describe the current section. Wrapping a
    /// section bumps the repeat counter; finishing the repeats moves to the
    /// next section, and wrapping the section list bumps the loop counter.
    pub fn advance(&mut self, step_count: u32, repeats: u32, section_count: usize) {
        self.step_index += 1;
        if self.step_index < step_count.max(1) {
            return;
        }

        self.step_index = 0;
        self.repeat_index += 1;
        if self.repeat_index < repeats.max(1) {
            return;
        }

        self.repeat_index = 0;
        self.section_index += 1;
        if self.section_index >= section_count.max(1) {
            self.section_index = 0;
            self.loop_count += 1;
        }
    }

    /// Keep the position valid after the project changed shape
    pub fn clamp_to(&mut self, step_count: u32, repeats: u32, section_count: usize) {
        if self.section_index >= section_count.max(1) {
            self.section_index = 0;
            self.step_index = 0;
            self.repeat_index = 0;
            return;
        }
        if self.step_index >= step_count.max(1) {
            self.step_index = 0;
        }
        if self.repeat_index >= repeats.max(1) {
            self.repeat_index = 0;
        }
    }
}
