// Tuner module - microphone input, pitch detection and note mapping

pub mod detector;
pub mod notes;

pub use detector::PitchDetector;
pub use notes::{DetectedNote, NOTE_NAMES, frequency_to_note, note_frequency};

use crate::config::TunerConfig;
use crate::error::{PracticeError, PracticeResult};
use crate::messaging::snapshot::{SnapshotPublisher, SnapshotReader};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Observer, Producer, Split};

/// Source of mono analysis windows (a microphone, a file, a test signal)
pub trait InputStream {
    fn sample_rate(&self) -> f64;

    /// Whether capture is possible at all
    fn is_available(&self) -> bool {
        true
    }

    /// Fill `window` with the next samples. Returns false (and consumes
    /// nothing) until a whole window is buffered.
    fn read_window(&mut self, window: &mut [f32]) -> bool;
}

/// Write side of a `RingInput`, fed from the audio callback
pub struct RingInputWriter {
    producer: ringbuf::HeapProd<f32>,
}

impl RingInputWriter {
    /// Push captured samples; returns how many fit
    pub fn push(&mut self, samples: &[f32]) -> usize {
        let written = self.producer.push_slice(samples);
        if written < samples.len() {
            log::debug!("Tuner input full, dropped {} samples", samples.len() - written);
        }
        written
    }
}

/// Lock-free ring buffer input
pub struct RingInput {
    consumer: ringbuf::HeapCons<f32>,
    sample_rate: f64,
}

impl RingInput {
    pub fn new(capacity: usize, sample_rate: f64) -> (RingInputWriter, RingInput) {
        let (producer, consumer) = HeapRb::<f32>::new(capacity).split();
        (
            RingInputWriter { producer },
            RingInput {
                consumer,
                sample_rate,
            },
        )
    }

    pub fn buffered(&self) -> usize {
        self.consumer.occupied_len()
    }
}

impl InputStream for RingInput {
    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn read_window(&mut self, window: &mut [f32]) -> bool {
        if self.consumer.occupied_len() < window.len() {
            return false;
        }
        self.consumer.pop_slice(window) == window.len()
    }
}

/// Tuner session: pulls windows from an input and publishes the current note
pub struct Tuner<S: InputStream> {
    stream: S,
    detector: PitchDetector,
    window: Vec<f32>,
    note: SnapshotPublisher<Option<DetectedNote>>,
}

impl<S: InputStream> Tuner<S> {
    /// Attach to an input stream; fails when capture is unavailable
    pub fn attach(stream: S, config: TunerConfig) -> PracticeResult<Self> {
        if !stream.is_available() {
            return Err(PracticeError::Environment(
                "Microphone not available".to_string(),
            ));
        }

        log::info!(
            "Tuner attached at {} Hz, {} sample windows",
            stream.sample_rate(),
            config.buffer_size
        );
        let window = vec![0.0; config.buffer_size.max(1)];
        let detector = PitchDetector::new(config, stream.sample_rate());
        Ok(Self {
            stream,
            detector,
            window,
            note: SnapshotPublisher::new(None),
        })
    }

    /// Analyse every complete window buffered so far.
    /// Returns the note surfaced by the last window, if any.
    pub fn process(&mut self) -> Option<DetectedNote> {
        let mut latest = None;
        let mut analysed = false;
        while self.stream.read_window(&mut self.window) {
            latest = self.detector.analyze(&self.window);
            analysed = true;
        }

        if analysed && latest != self.note.current() {
            self.note.publish(latest.clone());
        }
        latest
    }

    /// Last published note
    pub fn current_note(&self) -> Option<DetectedNote> {
        self.note.current()
    }

    pub fn note_reader(&self) -> SnapshotReader<Option<DetectedNote>> {
        self.note.reader()
    }

    pub fn detector(&self) -> &PitchDetector {
        &self.detector
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Release the input
    pub fn detach(self) -> S {
        log::info!("Tuner detached");
        self.stream
    }
}
