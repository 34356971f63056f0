// Audio module - clock abstraction, decoded buffers and the mix bus

pub mod buffer;
pub mod clock;
pub mod dsp_utils;
pub mod mixer;
pub mod timing;

pub use buffer::SampleBuffer;
pub use clock::{AudioBackend, ScheduledSource};
pub use mixer::{MixBus, RenderClock, ScheduledEntry};
pub use timing::AudioTiming;
