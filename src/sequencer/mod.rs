// Sequencer module
// Tempo helpers, drum project model, lookahead scheduler, metronome and tap tempo

pub mod metronome;
pub mod pattern;
pub mod scheduler;
pub mod tap_tempo;
pub mod timeline;
pub mod transport;

pub use metronome::{
    ClickKind, ClickSound, CompletionReason, MetronomeEngine, MetronomeSettings, MetronomeState,
    Pulse, PulseEvent, SpeedTrainerSettings, SpeedTrainerState, accent_beats,
};
pub use pattern::{DrumProject, DrumSection, DrumTrack, should_play_track, swing_offset};
pub use scheduler::{DrumScheduler, SchedulerStats};
pub use tap_tempo::TapTempo;
pub use timeline::{MAX_BPM, MIN_BPM, Tempo, clamp_bpm, tempo_name};
pub use transport::{PlaybackCursor, PlaybackState, TransportState};
