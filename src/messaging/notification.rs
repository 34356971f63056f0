// Notifications surfaced to the UI (errors, fallbacks, timing degradation)

use crate::error::PracticeError;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// Which engine produced the notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationCategory {
    Scheduler,
    Metronome,
    Project,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub category: NotificationCategory,
    pub message: String,
    pub timestamp: u64, // Unix timestamp in milliseconds
}

impl Notification {
    pub fn new(level: NotificationLevel, category: NotificationCategory, message: String) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        Self {
            level,
            category,
            message,
            timestamp,
        }
    }

    pub fn info(category: NotificationCategory, message: String) -> Self {
        Self::new(NotificationLevel::Info, category, message)
    }

    pub fn warning(category: NotificationCategory, message: String) -> Self {
        Self::new(NotificationLevel::Warning, category, message)
    }

    /// Wrap an engine error. Validation problems are only warnings: the
    /// caller has already fallen back to a usable project.
    pub fn from_error(category: NotificationCategory, error: &PracticeError) -> Self {
        let level = match error {
            PracticeError::Validation(_) => NotificationLevel::Warning,
            _ => NotificationLevel::Error,
        };
        Self::new(level, category, error.to_string())
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        };
        let category = match self.category {
            NotificationCategory::Scheduler => "drum loop",
            NotificationCategory::Metronome => "metronome",
            NotificationCategory::Project => "project",
        };
        write!(f, "[{}] {}: {}", level, category, self.message)
    }
}
