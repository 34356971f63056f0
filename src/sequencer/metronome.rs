// Metronome - Beat pulse engine with count-in, speed trainer and timer
// Tick-driven: the host calls tick(now_ms) from any periodic timer and the
// engine emits every pulse that came due since the last call.

use crate::audio::buffer::SampleBuffer;
use crate::audio::clock::{AudioBackend, ScheduledSource};
use crate::config::MetronomeDefaults;
use crate::messaging::channels::{NotificationProducer, notify};
use crate::messaging::notification::{Notification, NotificationCategory};
use crate::messaging::snapshot::{SnapshotPublisher, SnapshotReader};
use crate::sequencer::timeline::clamp_bpm;
use std::f32::consts::PI;
use std::sync::Arc;

pub const MAX_BEATS_PER_MEASURE: u32 = 32;

/// Sound of a click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickKind {
    /// First beat of the measure
    Downbeat,
    /// First beat of a subdivision group
    Accent,
    Normal,
    CountIn,
}

/// Why the engine stopped on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionReason {
    SpeedTrainer,
    Timer,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pulse {
    /// Count-in click, `remaining` counts down to 1
    CountIn { remaining: u32 },
    Click { beat: u32, kind: ClickKind },
    /// Speed trainer moved to a new tempo
    TempoChanged { bpm: u32 },
    /// Timer second elapsed since Running began
    Second { elapsed: u32 },
    Completed { reason: CompletionReason },
}

/// A pulse stamped with the time it was due (host clock, ms)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseEvent {
    pub at_ms: f64,
    pub pulse: Pulse,
}

impl PulseEvent {
    fn new(at_ms: f64, pulse: Pulse) -> Self {
        Self { at_ms, pulse }
    }

    /// Click timbre for audible pulses
    pub fn click_kind(&self) -> Option<ClickKind> {
        match self.pulse {
            Pulse::CountIn { .. } => Some(ClickKind::CountIn),
            Pulse::Click { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedTrainerSettings {
    pub bpm_increment: u32,
    /// Measures per loop
    pub repeats_per_loop: u32,
    /// None runs until stopped
    pub loops: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetronomeSettings {
    pub bpm: u32,
    pub beats_per_measure: u32,
    /// Subdivision groups, e.g. [3, 3] for 6/8
    pub grouping: Vec<u32>,
    pub count_in: u32,
    pub speed_trainer: Option<SpeedTrainerSettings>,
    pub timer_seconds: Option<u32>,
}

impl Default for MetronomeSettings {
    fn default() -> Self {
        Self::from(&MetronomeDefaults::default())
    }
}

impl From<&MetronomeDefaults> for MetronomeSettings {
    fn from(defaults: &MetronomeDefaults) -> Self {
        Self {
            bpm: defaults.bpm,
            beats_per_measure: defaults.beats_per_measure,
            grouping: Vec::new(),
            count_in: defaults.count_in,
            speed_trainer: None,
            timer_seconds: None,
        }
    }
}

impl MetronomeSettings {
    fn normalized(mut self) -> Self {
        self.bpm = clamp_bpm_u32(self.bpm);
        self.beats_per_measure = self.beats_per_measure.clamp(1, MAX_BEATS_PER_MEASURE);
        if let Some(trainer) = self.speed_trainer.as_mut() {
            trainer.repeats_per_loop = trainer.repeats_per_loop.max(1);
        }
        self.timer_seconds = self.timer_seconds.filter(|s| *s > 0);
        self
    }
}

fn clamp_bpm_u32(bpm: u32) -> u32 {
    clamp_bpm(bpm as f64) as u32
}

/// Beat offsets where each subdivision group starts
///
/// `accent_beats(&[3, 3]) == [0, 3]`
pub fn accent_beats(grouping: &[u32]) -> Vec<u32> {
    let mut offset = 0;
    let mut accents = Vec::with_capacity(grouping.len());
    for &size in grouping.iter().filter(|s| **s > 0) {
        accents.push(offset);
        offset += size;
    }
    accents
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpeedTrainerState {
    pub current_bpm: u32,
    pub current_loop: u32,
    pub current_repeat: u32,
}

/// Published metronome snapshot
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetronomeState {
    pub bpm: u32,
    /// Beat of the last click
    pub current_beat: u32,
    pub is_playing: bool,
    pub is_counting_in: bool,
    pub count_in_remaining: u32,
    pub elapsed_seconds: u32,
    pub speed_trainer: Option<SpeedTrainerState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    CountingIn,
    Running,
}

pub struct MetronomeEngine {
    settings: MetronomeSettings,
    accents: Vec<u32>,
    phase: Phase,
    bpm: u32,
    next_beat: u32,
    current_beat: u32,
    count_in_left: u32,
    count_in_shown: u32,
    next_beat_at: f64,
    next_second_at: Option<f64>,
    elapsed_seconds: u32,
    trainer: Option<SpeedTrainerState>,
    publisher: SnapshotPublisher<MetronomeState>,
    notifications: Option<NotificationProducer>,
}

impl MetronomeEngine {
    pub fn new(settings: MetronomeSettings) -> Self {
        let settings = settings.normalized();
        let engine = Self {
            accents: accent_beats(&settings.grouping),
            bpm: settings.bpm,
            settings,
            phase: Phase::Idle,
            next_beat: 0,
            current_beat: 0,
            count_in_left: 0,
            count_in_shown: 0,
            next_beat_at: 0.0,
            next_second_at: None,
            elapsed_seconds: 0,
            trainer: None,
            publisher: SnapshotPublisher::new(MetronomeState::default()),
            notifications: None,
        };
        engine.publish_state();
        engine
    }

    /// Attach a channel for user-facing notifications
    pub fn set_notification_producer(&mut self, producer: NotificationProducer) {
        self.notifications = Some(producer);
    }

    pub fn settings(&self) -> &MetronomeSettings {
        &self.settings
    }

    pub fn is_playing(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Start at `now_ms`; the first click is returned immediately
    pub fn start(&mut self, now_ms: f64) -> Vec<PulseEvent> {
        if self.is_playing() {
            return Vec::new();
        }

        self.bpm = self.settings.bpm;
        self.next_beat = 0;
        self.current_beat = 0;
        self.elapsed_seconds = 0;
        self.next_second_at = None;
        self.next_beat_at = now_ms;
        self.trainer = self.settings.speed_trainer.map(|_| SpeedTrainerState {
            current_bpm: self.bpm,
            current_loop: 0,
            current_repeat: 0,
        });

        if self.settings.count_in > 0 {
            self.phase = Phase::CountingIn;
            self.count_in_left = self.settings.count_in;
        } else {
            self.enter_running(now_ms);
        }

        log::info!("Metronome started at {} BPM", self.bpm);
        self.tick(now_ms)
    }

    pub fn stop(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.halt();
        log::info!("Metronome stopped");
        self.publish_state();
    }

    pub fn toggle(&mut self, now_ms: f64) -> Vec<PulseEvent> {
        if self.is_playing() {
            self.stop();
            Vec::new()
        } else {
            self.start(now_ms)
        }
    }

    /// Change the tempo
    ///
    /// While running (and not driven by the speed trainer) the next beat
    /// moves to `now_ms` plus one interval at the new rate. The beat index
    /// is kept. During a count-in the new tempo takes over once Running
    /// begins.
    pub fn set_bpm(&mut self, bpm: u32, now_ms: f64) {
        let bpm = clamp_bpm_u32(bpm);
        self.settings.bpm = bpm;

        let trainer_active = self.trainer.is_some() && self.is_playing();
        if trainer_active {
            log::debug!("Speed trainer owns the tempo, new base {} BPM", bpm);
            return;
        }
        if self.phase == Phase::CountingIn {
            log::debug!("Tempo {} BPM deferred until the count-in ends", bpm);
            return;
        }

        self.bpm = bpm;
        if self.phase == Phase::Running {
            self.next_beat_at = now_ms + self.interval_ms();
        }
        self.publish_state();
    }

    /// Replace the settings; a running session restarts with them at `now_ms`
    pub fn configure(&mut self, settings: MetronomeSettings, now_ms: f64) -> Vec<PulseEvent> {
        let was_playing = self.is_playing();
        self.halt();
        self.settings = settings.normalized();
        self.accents = accent_beats(&self.settings.grouping);
        self.bpm = self.settings.bpm;

        if was_playing {
            self.start(now_ms)
        } else {
            self.publish_state();
            Vec::new()
        }
    }

    /// Emit every pulse due at or before `now_ms`, in time order
    pub fn tick(&mut self, now_ms: f64) -> Vec<PulseEvent> {
        let mut events = Vec::new();
        if !self.is_playing() {
            return events;
        }

        let interval = self.interval_ms();
        if now_ms - self.next_beat_at > interval {
            log::warn!(
                "Metronome beat {:.1} ms late, resyncing",
                now_ms - self.next_beat_at
            );
            notify(
                &mut self.notifications,
                Notification::warning(
                    NotificationCategory::Metronome,
                    "Timing drift detected, metronome resynced".to_string(),
                ),
            );
            self.next_beat_at = now_ms;
        }

        while self.is_playing() {
            let second_due = self.next_second_at.filter(|t| *t <= now_ms);
            let beat_due = Some(self.next_beat_at).filter(|t| *t <= now_ms);
            match (second_due, beat_due) {
                (Some(second), Some(beat)) if second <= beat => {
                    self.fire_second(second, &mut events)
                }
                (Some(second), None) => self.fire_second(second, &mut events),
                (_, Some(beat)) => self.fire_beat(beat, &mut events),
                (None, None) => break,
            }
        }

        if !events.is_empty() {
            self.publish_state();
        }
        events
    }

    pub fn state(&self) -> MetronomeState {
        MetronomeState {
            bpm: self.bpm,
            current_beat: self.current_beat,
            is_playing: self.is_playing(),
            is_counting_in: self.phase == Phase::CountingIn,
            count_in_remaining: self.count_in_shown,
            elapsed_seconds: self.elapsed_seconds,
            speed_trainer: self.trainer,
        }
    }

    pub fn state_reader(&self) -> SnapshotReader<MetronomeState> {
        self.publisher.reader()
    }

    fn interval_ms(&self) -> f64 {
        60_000.0 / self.bpm.max(1) as f64
    }

    fn click_kind(&self, beat: u32) -> ClickKind {
        if beat == 0 {
            ClickKind::Downbeat
        } else if self.accents.contains(&beat) {
            ClickKind::Accent
        } else {
            ClickKind::Normal
        }
    }

    fn enter_running(&mut self, at_ms: f64) {
        self.phase = Phase::Running;
        if self.trainer.is_none() {
            self.bpm = self.settings.bpm;
        }
        self.count_in_left = 0;
        self.count_in_shown = 0;
        self.next_beat = 0;
        self.next_second_at = Some(at_ms + 1000.0);
    }

    fn halt(&mut self) {
        self.phase = Phase::Idle;
        self.next_second_at = None;
        self.count_in_left = 0;
        self.count_in_shown = 0;
    }

    fn finish(&mut self, at_ms: f64, reason: CompletionReason, events: &mut Vec<PulseEvent>) {
        events.push(PulseEvent::new(at_ms, Pulse::Completed { reason }));
        self.halt();
        log::info!("Metronome session completed ({:?})", reason);
        notify(
            &mut self.notifications,
            Notification::info(
                NotificationCategory::Metronome,
                "Practice session complete".to_string(),
            ),
        );
    }

    fn fire_second(&mut self, at_ms: f64, events: &mut Vec<PulseEvent>) {
        self.elapsed_seconds += 1;
        events.push(PulseEvent::new(
            at_ms,
            Pulse::Second {
                elapsed: self.elapsed_seconds,
            },
        ));
        self.next_second_at = Some(at_ms + 1000.0);

        let timer_done = self
            .settings
            .timer_seconds
            .is_some_and(|limit| self.elapsed_seconds >= limit);
        if timer_done {
            self.finish(at_ms, CompletionReason::Timer, events);
        }
    }

    fn fire_beat(&mut self, at_ms: f64, events: &mut Vec<PulseEvent>) {
        if self.phase == Phase::CountingIn {
            if self.count_in_left > 0 {
                events.push(PulseEvent::new(
                    at_ms,
                    Pulse::CountIn {
                        remaining: self.count_in_left,
                    },
                ));
                self.count_in_shown = self.count_in_left;
                self.count_in_left -= 1;
                self.next_beat_at = at_ms + self.interval_ms();
                return;
            }
            self.enter_running(at_ms);
        }

        let beat = self.next_beat;
        events.push(PulseEvent::new(
            at_ms,
            Pulse::Click {
                beat,
                kind: self.click_kind(beat),
            },
        ));
        self.current_beat = beat;
        self.next_beat += 1;

        if self.next_beat >= self.settings.beats_per_measure {
            self.next_beat = 0;
            if self.complete_measure(at_ms, events) {
                return;
            }
        }

        self.next_beat_at = at_ms + self.interval_ms();
    }

    /// Speed trainer bookkeeping after the last beat of a measure.
    /// Returns true when the session completed.
    fn complete_measure(&mut self, at_ms: f64, events: &mut Vec<PulseEvent>) -> bool {
        let (Some(settings), Some(trainer)) = (self.settings.speed_trainer, self.trainer.as_mut())
        else {
            return false;
        };

        trainer.current_repeat += 1;
        if trainer.current_repeat < settings.repeats_per_loop {
            return false;
        }

        trainer.current_repeat = 0;
        trainer.current_loop += 1;
        if settings.loops.is_some_and(|loops| trainer.current_loop >= loops) {
            self.finish(at_ms, CompletionReason::SpeedTrainer, events);
            return true;
        }

        let bpm = clamp_bpm_u32(trainer.current_bpm.saturating_add(settings.bpm_increment));
        trainer.current_bpm = bpm;
        self.bpm = bpm;
        events.push(PulseEvent::new(at_ms, Pulse::TempoChanged { bpm }));
        log::info!("Speed trainer: loop {} now at {} BPM", trainer.current_loop, bpm);
        false
    }

    fn publish_state(&self) {
        self.publisher.publish(self.state());
    }
}

impl Default for MetronomeEngine {
    fn default() -> Self {
        Self::new(MetronomeSettings::default())
    }
}

/// Pre-rendered click buffers, one per click kind
#[derive(Debug, Clone)]
pub struct ClickSound {
    downbeat: Arc<SampleBuffer>,
    accent: Arc<SampleBuffer>,
    normal: Arc<SampleBuffer>,
    count_in: Arc<SampleBuffer>,
    volume: f32,
}

impl ClickSound {
    const CLICK_DURATION_MS: f32 = 10.0;

    pub fn new(sample_rate: u32, volume: f32) -> Self {
        let render = |name: &str, frequency: f32, amplitude: f32| {
            Arc::new(SampleBuffer::new(
                name,
                sample_rate,
                Self::generate_click(sample_rate as f32, frequency, amplitude),
            ))
        };

        Self {
            downbeat: render("click-downbeat", 1500.0, 0.7),
            accent: render("click-accent", 1200.0, 0.6),
            normal: render("click-normal", 800.0, 0.4),
            count_in: render("click-count-in", 1000.0, 0.5),
            volume: volume.clamp(0.0, 1.0),
        }
    }

    /// Sine burst with a fast exponential decay
    fn generate_click(sample_rate: f32, frequency: f32, amplitude: f32) -> Vec<f32> {
        let num_samples = ((Self::CLICK_DURATION_MS / 1000.0) * sample_rate) as usize;
        let phase_increment = 2.0 * PI * frequency / sample_rate;

        (0..num_samples)
            .map(|i| {
                let t = i as f32 / num_samples as f32;
                let envelope = (-t * 8.0).exp();
                (i as f32 * phase_increment).sin() * envelope * amplitude
            })
            .collect()
    }

    pub fn buffer(&self, kind: ClickKind) -> &Arc<SampleBuffer> {
        match kind {
            ClickKind::Downbeat => &self.downbeat,
            ClickKind::Accent => &self.accent,
            ClickKind::Normal => &self.normal,
            ClickKind::CountIn => &self.count_in,
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Source for an audible pulse, started at `start_time` on the backend clock
    pub fn source_for(&self, event: &PulseEvent, start_time: f64) -> Option<ScheduledSource> {
        let kind = event.click_kind()?;
        Some(ScheduledSource {
            buffer: Arc::clone(self.buffer(kind)),
            start_time,
            gain: self.volume,
            pan: 0.0,
            label: "click".to_string(),
        })
    }

    /// Queue the click for `event` on `backend`
    ///
    /// `origin_seconds` is the backend time matching 0 ms on the engine
    /// clock. Starts in the past are pulled up to the backend's now.
    pub fn schedule<B: AudioBackend>(
        &self,
        backend: &mut B,
        event: &PulseEvent,
        origin_seconds: f64,
    ) -> bool {
        let start_time = (origin_seconds + event.at_ms / 1000.0).max(backend.now());
        match self.source_for(event, start_time) {
            Some(source) => {
                backend.schedule_source(source);
                true
            }
            None => false,
        }
    }
}
