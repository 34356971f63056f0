// Scheduler - Lookahead step scheduler for the drum loop
// A coarse timer calls tick(); every step falling inside the lookahead window
// is handed to the audio backend with a sample-accurate start time.

use crate::audio::clock::{AudioBackend, ScheduledSource};
use crate::config::SchedulerConfig;
use crate::error::{PracticeError, PracticeResult};
use crate::messaging::channels::{NotificationProducer, notify};
use crate::messaging::notification::{Notification, NotificationCategory};
use crate::messaging::snapshot::{SnapshotPublisher, SnapshotReader};
use crate::sampler::cache::{BufferCache, SampleFetcher};
use crate::sequencer::pattern::{DrumProject, DrumSection};
use crate::sequencer::timeline::Tempo;
use crate::sequencer::transport::{PlaybackCursor, PlaybackState, TransportState};
use std::collections::VecDeque;
use std::sync::Arc;

/// Counters describing scheduler health
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Sources handed to the backend
    pub scheduled_events: u64,
    /// Steps found behind the audio clock
    pub late_events: u64,
    /// Hits dropped because the track had no decoded buffer
    pub skipped_events: u64,
    /// Times the position jumped forward after a stall
    pub resyncs: u64,
}

pub struct DrumScheduler<B: AudioBackend> {
    backend: B,
    project: Arc<DrumProject>,
    buffers: BufferCache,
    config: SchedulerConfig,
    transport: TransportState,
    playback: Option<PlaybackState>,
    /// Cursors of queued steps, oldest first, waiting for their start time
    queued_cursors: VecDeque<(f64, PlaybackCursor)>,
    cursor: SnapshotPublisher<PlaybackCursor>,
    stats: SchedulerStats,
    notifications: Option<NotificationProducer>,
}

impl<B: AudioBackend> DrumScheduler<B> {
    pub fn new(backend: B, project: DrumProject, config: SchedulerConfig) -> Self {
        Self {
            backend,
            project: Arc::new(project),
            buffers: BufferCache::new(),
            config,
            transport: TransportState::Stopped,
            playback: None,
            queued_cursors: VecDeque::new(),
            cursor: SnapshotPublisher::new(PlaybackCursor::default()),
            stats: SchedulerStats::default(),
            notifications: None,
        }
    }

    /// Attach a channel for user-facing notifications
    pub fn set_notification_producer(&mut self, producer: NotificationProducer) {
        self.notifications = Some(producer);
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn project(&self) -> &DrumProject {
        &self.project
    }

    /// Shared handle on the project as the next tick will see it
    pub fn project_snapshot(&self) -> Arc<DrumProject> {
        Arc::clone(&self.project)
    }

    pub fn buffers(&self) -> &BufferCache {
        &self.buffers
    }

    pub fn transport(&self) -> TransportState {
        self.transport
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Last published playhead
    pub fn cursor(&self) -> PlaybackCursor {
        self.cursor.current()
    }

    pub fn cursor_reader(&self) -> SnapshotReader<PlaybackCursor> {
        self.cursor.reader()
    }

    /// Fetch any buffer the project needs that is not cached yet
    pub async fn preload<F: SampleFetcher>(&mut self, fetcher: &F) -> PracticeResult<usize> {
        let project = Arc::clone(&self.project);
        self.buffers.preload(fetcher, project.sample_paths()).await
    }

    /// Load every sample, then start scheduling from the first step
    pub async fn play<F: SampleFetcher>(&mut self, fetcher: &F) -> PracticeResult<()> {
        if self.is_playing() {
            return Ok(());
        }
        if self.project.tracks.is_empty() {
            return Err(PracticeError::no_tracks());
        }
        if self.project.sections.is_empty() {
            return Err(PracticeError::Configuration(
                "Project has no sections to play".to_string(),
            ));
        }
        if !self.backend.is_available() {
            return Err(PracticeError::Environment(
                "No audio output available".to_string(),
            ));
        }

        self.transport = TransportState::Preparing;
        if let Err(e) = self.preload(fetcher).await {
            self.transport = TransportState::Stopped;
            notify(
                &mut self.notifications,
                Notification::from_error(NotificationCategory::Scheduler, &e),
            );
            return Err(e);
        }

        self.backend.set_master_gain(self.project.master_volume);
        let start_time = self.backend.now() + self.config.epsilon_seconds();
        self.playback = Some(PlaybackState::new(start_time));
        self.queued_cursors.clear();
        self.transport = TransportState::Playing;
        self.cursor.publish(PlaybackCursor {
            total_steps: self.project.sections[0].step_count(),
            ..PlaybackCursor::default()
        });

        log::info!(
            "Drum loop started at {} BPM ({} tracks, {} sections)",
            self.project.bpm,
            self.project.tracks.len(),
            self.project.sections.len()
        );
        self.tick();
        Ok(())
    }

    /// Stop scheduling. Sources already queued on the backend may still sound.
    pub fn stop(&mut self) {
        if self.transport == TransportState::Stopped {
            return;
        }
        self.playback = None;
        self.queued_cursors.clear();
        self.transport = TransportState::Stopped;
        self.cursor.publish(PlaybackCursor::default());
        log::info!("Drum loop stopped");
    }

    pub async fn toggle<F: SampleFetcher>(&mut self, fetcher: &F) -> PracticeResult<()> {
        if self.is_playing() {
            self.stop();
            Ok(())
        } else {
            self.play(fetcher).await
        }
    }

    /// Change tempo live; the next step uses the new duration
    pub fn set_bpm(&mut self, bpm: f64) {
        Arc::make_mut(&mut self.project).set_bpm(bpm);
        log::debug!("Drum loop tempo set to {}", self.project.bpm);
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        Arc::make_mut(&mut self.project).set_master_volume(volume);
        self.backend.set_master_gain(self.project.master_volume);
    }

    /// Replace the project; the next tick plays from it
    ///
    /// An invalid project is rejected and the current one keeps playing.
    /// Tracks whose buffers are not cached stay silent until `preload`.
    pub fn update_project(&mut self, project: DrumProject) -> PracticeResult<()> {
        if let Err(e) = project.validate() {
            log::warn!("Rejected project update: {}", e);
            return Err(e);
        }
        self.project = Arc::new(project);
        if self.is_playing() {
            self.backend.set_master_gain(self.project.master_volume);
        }
        Ok(())
    }

    /// Timer callback: schedule every step inside the lookahead window.
    /// Returns the number of sources queued on this tick.
    pub fn tick(&mut self) -> usize {
        let Some(mut playback) = self.playback.take() else {
            return 0;
        };

        let project = Arc::clone(&self.project);
        let now = self.backend.now();
        let lookahead = self.config.lookahead_seconds();
        let epsilon = self.config.epsilon_seconds();

        {
            let section = current_section(&project, playback.section_index);
            playback.clamp_to(section.step_count(), section.repeats, project.sections.len());
        }

        if now - playback.next_event_time > lookahead {
            log::warn!(
                "Scheduler stalled {:.1} ms, resyncing to the audio clock",
                (now - playback.next_event_time) * 1000.0
            );
            self.stats.resyncs += 1;
            playback.next_event_time = now + epsilon;
        }

        let mut queued = 0;
        while playback.next_event_time < now + lookahead {
            let section = current_section(&project, playback.section_index);
            let step_count = section.step_count();

            queued += self.schedule_step(&project, section, &playback, now);
            self.queued_cursors
                .push_back((playback.next_event_time, playback.cursor(step_count)));

            let step_duration = Tempo::new(project.bpm).step_duration_seconds(section.steps_per_beat);
            playback.next_event_time += step_duration;
            playback.advance(step_count, section.repeats, project.sections.len());
        }

        self.playback = Some(playback);
        self.publish_due_cursor(now);
        queued
    }

    /// Queue every audible hit of the current step
    fn schedule_step(
        &mut self,
        project: &DrumProject,
        section: &DrumSection,
        playback: &PlaybackState,
        now: f64,
    ) -> usize {
        let event_time = playback.next_event_time;
        let earliest = now + self.config.epsilon_seconds();

        if event_time < now {
            self.stats.late_events += 1;
            log::warn!(
                "Step {} scheduled {:.1} ms late",
                playback.step_index,
                (now - event_time) * 1000.0
            );
            notify(
                &mut self.notifications,
                Notification::warning(
                    NotificationCategory::Scheduler,
                    "Audio timing degraded, some steps played late".to_string(),
                ),
            );
        }

        let step = playback.step_index;
        let step_duration = Tempo::new(project.bpm).step_duration_seconds(section.steps_per_beat);
        let swing = section.swing_offset(step, step_duration);

        let mut queued = 0;
        for track in project.audible_tracks() {
            if !section.is_step_active(&track.id, step) {
                continue;
            }
            let Some(buffer) = self.buffers.get(&track.sample_path) else {
                self.stats.skipped_events += 1;
                continue;
            };

            let start_time =
                (event_time + swing + track.nudge_ms as f64 / 1000.0).max(earliest);
            self.backend.schedule_source(ScheduledSource {
                buffer,
                start_time,
                gain: track.volume,
                pan: track.pan,
                label: track.id.clone(),
            });
            self.stats.scheduled_events += 1;
            queued += 1;
        }
        queued
    }

    /// Publish the newest queued cursor whose start time has been reached
    fn publish_due_cursor(&mut self, now: f64) {
        let mut latest = None;
        while let Some((time, cursor)) = self.queued_cursors.front() {
            if *time > now {
                break;
            }
            latest = Some(*cursor);
            self.queued_cursors.pop_front();
        }
        if let Some(cursor) = latest {
            self.cursor.publish(cursor);
        }
    }
}

fn current_section(project: &DrumProject, index: usize) -> &DrumSection {
    // The model never holds an empty section list
    &project.sections[index.min(project.sections.len().saturating_sub(1))]
}
