// Mix bus and offline render backend
//
// Signal flow: each source (track gain + equal-power pan) -> sum ->
// fixed compressor -> live master gain -> stereo out.

use crate::audio::buffer::SampleBuffer;
use crate::audio::clock::{AudioBackend, ScheduledSource};
use crate::audio::dsp_utils::{Compressor, CompressorParams, OnePoleSmoother, equal_power_pan};
use crate::audio::timing::AudioTiming;
use std::collections::VecDeque;
use std::sync::Arc;

const MASTER_SMOOTHING_MS: f32 = 10.0;
const RENDER_CHUNK_FRAMES: usize = 512;

/// A buffer currently sounding on the bus
struct BusVoice {
    buffer: Arc<SampleBuffer>,
    position: f64,
    step: f64,
    left_gain: f32,
    right_gain: f32,
}

impl BusVoice {
    fn is_finished(&self) -> bool {
        self.position >= self.buffer.len() as f64
    }
}

/// Stereo bus: per-source gain/pan, compressor, master gain
pub struct MixBus {
    sample_rate: f32,
    voices: Vec<BusVoice>,
    compressor: Compressor,
    master_gain: f32,
    master_smoother: OnePoleSmoother,
}

impl MixBus {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            voices: Vec::new(),
            compressor: Compressor::new(CompressorParams::default(), sample_rate),
            master_gain: 1.0,
            master_smoother: OnePoleSmoother::new(1.0, MASTER_SMOOTHING_MS, sample_rate),
        }
    }

    /// Start a source now. Buffers at another rate are played back with
    /// linear interpolation at the matching speed.
    pub fn start_voice(&mut self, source: &ScheduledSource) {
        if source.buffer.is_empty() || source.buffer.sample_rate == 0 {
            return;
        }
        let (left, right) = equal_power_pan(source.pan);
        let gain = source.gain.max(0.0);
        self.voices.push(BusVoice {
            buffer: Arc::clone(&source.buffer),
            position: 0.0,
            step: source.buffer.sample_rate as f64 / self.sample_rate as f64,
            left_gain: left * gain,
            right_gain: right * gain,
        });
    }

    pub fn set_master_gain(&mut self, gain: f32) {
        self.master_gain = gain.clamp(0.0, 1.0);
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Produce one stereo frame
    pub fn next_frame(&mut self) -> (f32, f32) {
        let mut left = 0.0;
        let mut right = 0.0;

        for voice in &mut self.voices {
            let sample = voice.buffer.sample_at(voice.position);
            left += sample * voice.left_gain;
            right += sample * voice.right_gain;
            voice.position += voice.step;
        }
        self.voices.retain(|v| !v.is_finished());

        let (left, right) = self.compressor.process(left, right);
        let master = self.master_smoother.process(self.master_gain);
        (left * master, right * master)
    }

    /// Silence everything (already started sources are cut)
    pub fn reset(&mut self) {
        self.voices.clear();
        self.compressor.reset();
        self.master_smoother.reset(self.master_gain);
    }
}

/// Record of a source the backend accepted
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEntry {
    pub label: String,
    pub start_time: f64,
    pub gain: f32,
    pub pan: f32,
}

/// Offline `AudioBackend`: counts rendered frames as its clock and
/// mixes scheduled sources through a `MixBus`.
///
/// Accepted sources are only recorded when built `with_history()`.
pub struct RenderClock {
    timing: AudioTiming,
    bus: MixBus,
    pending: VecDeque<(u64, ScheduledSource)>,
    history: Vec<ScheduledEntry>,
    record_history: bool,
    available: bool,
    scratch: Vec<f32>,
}

impl RenderClock {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            timing: AudioTiming::new(sample_rate),
            bus: MixBus::new(sample_rate as f32),
            pending: VecDeque::new(),
            history: Vec::new(),
            record_history: false,
            available: true,
            scratch: vec![0.0; RENDER_CHUNK_FRAMES * 2],
        }
    }

    /// Keep a record of every accepted source (tests, offline renders)
    pub fn with_history(mut self) -> Self {
        self.record_history = true;
        self
    }

    /// A backend that reports no audio capability
    pub fn unavailable(sample_rate: f64) -> Self {
        Self {
            available: false,
            ..Self::new(sample_rate)
        }
    }

    /// Shared frame counter (for readers on other threads)
    pub fn timing(&self) -> AudioTiming {
        self.timing.clone()
    }

    pub fn bus(&self) -> &MixBus {
        &self.bus
    }

    /// Render interleaved stereo into `output`, starting due sources
    /// on their exact frame.
    pub fn render(&mut self, output: &mut [f32]) {
        let frames = output.len() / 2;
        let start = self.timing.current_sample();

        for (i, frame) in output.chunks_exact_mut(2).enumerate() {
            let now = start + i as u64;
            while let Some((due, _)) = self.pending.front() {
                if *due > now {
                    break;
                }
                if let Some((_, source)) = self.pending.pop_front() {
                    self.bus.start_voice(&source);
                }
            }
            let (left, right) = self.bus.next_frame();
            frame[0] = left;
            frame[1] = right;
        }

        self.timing.advance(frames);
    }

    /// Run the clock forward by `seconds`, discarding the audio
    pub fn advance(&mut self, seconds: f64) {
        let mut remaining = self.timing.seconds_to_samples(seconds) as usize;
        let mut scratch = std::mem::take(&mut self.scratch);
        while remaining > 0 {
            let frames = remaining.min(RENDER_CHUNK_FRAMES);
            self.render(&mut scratch[..frames * 2]);
            remaining -= frames;
        }
        self.scratch = scratch;
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn history(&self) -> &[ScheduledEntry] {
        &self.history
    }

    pub fn take_history(&mut self) -> Vec<ScheduledEntry> {
        std::mem::take(&mut self.history)
    }

    /// Drop sources that have not started yet
    pub fn cancel_pending(&mut self) {
        self.pending.clear();
    }
}

impl AudioBackend for RenderClock {
    fn now(&self) -> f64 {
        self.timing.current_seconds()
    }

    fn schedule_source(&mut self, source: ScheduledSource) {
        let due = self.timing.seconds_to_samples(source.start_time);
        if self.record_history {
            self.history.push(ScheduledEntry {
                label: source.label.clone(),
                start_time: source.start_time,
                gain: source.gain,
                pan: source.pan,
            });
        }

        // Keep pending sorted by start frame
        let index = self.pending.partition_point(|(frame, _)| *frame <= due);
        self.pending.insert(index, (due, source));
    }

    fn set_master_gain(&mut self, gain: f32) {
        self.bus.set_master_gain(gain);
    }

    fn is_available(&self) -> bool {
        self.available
    }
}
