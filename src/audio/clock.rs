// Audio clock abstraction
// A monotonic clock that can start buffers at a future timestamp

use crate::audio::buffer::SampleBuffer;
use std::sync::Arc;

/// A buffer start request handed to the backend
#[derive(Debug, Clone)]
pub struct ScheduledSource {
    pub buffer: Arc<SampleBuffer>,
    /// Start time in the backend clock's coordinates (seconds)
    pub start_time: f64,
    /// Linear gain applied before the bus compressor
    pub gain: f32,
    /// Stereo position, -1.0 left .. 1.0 right
    pub pan: f32,
    /// Who asked for it (track id, "click", ...)
    pub label: String,
}

/// The external audio clock + source scheduler the engines depend on
pub trait AudioBackend {
    /// Sample-accurate current time in seconds. Never goes backwards.
    fn now(&self) -> f64;

    /// Queue a buffer to start at `source.start_time`
    fn schedule_source(&mut self, source: ScheduledSource);

    /// Live master gain after the bus compressor
    fn set_master_gain(&mut self, gain: f32);

    /// Whether audio output exists at all
    fn is_available(&self) -> bool {
        true
    }
}

impl<B: AudioBackend + ?Sized> AudioBackend for Box<B> {
    fn now(&self) -> f64 {
        (**self).now()
    }

    fn schedule_source(&mut self, source: ScheduledSource) {
        (**self).schedule_source(source)
    }

    fn set_master_gain(&mut self, gain: f32) {
        (**self).set_master_gain(gain)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}
