// Error taxonomy shared by the scheduler, metronome, tuner and project codec
// Every variant renders as a human-readable string for the UI

use thiserror::Error;

/// Errors surfaced to callers of the practice engines
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PracticeError {
    /// Missing or invalid setup (no tracks, bad config file). Blocks the
    /// operation, never fatal.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A sample could not be fetched or decoded. Playback is aborted before
    /// anything is scheduled; retrying is safe.
    #[error("Resource error: {0}")]
    Resource(String),

    /// Audio output or microphone capture is not available.
    #[error("Audio environment error: {0}")]
    Environment(String),

    /// Shared state failed schema validation.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl PracticeError {
    /// The guidance error returned when play is pressed on an empty project
    pub fn no_tracks() -> Self {
        PracticeError::Configuration(
            "No tracks loaded. Add at least one track before pressing play.".to_string(),
        )
    }

    /// Short category label for logs
    pub fn category(&self) -> &'static str {
        match self {
            PracticeError::Configuration(_) => "configuration",
            PracticeError::Resource(_) => "resource",
            PracticeError::Environment(_) => "environment",
            PracticeError::Validation(_) => "validation",
        }
    }
}

pub type PracticeResult<T> = Result<T, PracticeError>;
