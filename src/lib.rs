// MyMusic Practice - Library exports for the demo binary, tests and benchmarks

pub mod audio;
pub mod config;
pub mod error;
pub mod messaging;
pub mod project;
pub mod sampler;
pub mod sequencer;
pub mod tuner;

// Re-export commonly used types for convenience
pub use audio::{AudioBackend, AudioTiming, RenderClock, SampleBuffer, ScheduledSource};
pub use config::EngineConfig;
pub use error::{PracticeError, PracticeResult};
pub use messaging::{Notification, create_notification_channel};
pub use sampler::{BufferCache, FileSampleFetcher, SampleFetcher};
pub use sequencer::{
    ClickKind, ClickSound, DrumProject, DrumScheduler, DrumSection, DrumTrack, MetronomeEngine,
    MetronomeSettings, MetronomeState, PlaybackCursor, Pulse, PulseEvent, SpeedTrainerSettings,
    TapTempo, Tempo, TransportState,
};
pub use tuner::{DetectedNote, InputStream, PitchDetector, RingInput, Tuner};
