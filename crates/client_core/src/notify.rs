use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use tracing::{error, info, warn};

/// Shown when a failure escapes every caller and reaches the top level.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
    Info,
    Warning,
}

impl NotificationLevel {
    pub fn default_duration(self) -> Duration {
        match self {
            Self::Success | Self::Info => Duration::from_millis(3000),
            Self::Error => Duration::from_millis(5000),
            Self::Warning => Duration::from_millis(4000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub duration: Duration,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            duration: level.default_duration(),
        }
    }
}

/// Sink for transient user-facing notifications.
///
/// The presentation layer decides how these are rendered; the core only
/// reports into it.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);

    fn success(&self, message: &str) {
        self.notify(Notification::new(NotificationLevel::Success, message));
    }

    fn error(&self, message: &str) {
        self.notify(Notification::new(NotificationLevel::Error, message));
    }

    fn info(&self, message: &str) {
        self.notify(Notification::new(NotificationLevel::Info, message));
    }

    fn warning(&self, message: &str) {
        self.notify(Notification::new(NotificationLevel::Warning, message));
    }
}

/// Writes notifications to the tracing log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        let duration_ms = notification.duration.as_millis() as u64;
        match notification.level {
            NotificationLevel::Error => {
                error!(duration_ms, "notify: {}", notification.message)
            }
            NotificationLevel::Warning => {
                warn!(duration_ms, "notify: {}", notification.message)
            }
            NotificationLevel::Success | NotificationLevel::Info => {
                info!(duration_ms, "notify: {}", notification.message)
            }
        }
    }
}

/// Keeps every notification in memory until drained.
#[derive(Default)]
pub struct RecordingNotifier {
    entries: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.entries.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_use_their_display_durations() {
        let notifier = RecordingNotifier::new();
        notifier.success("Saved");
        notifier.error("Nope");
        notifier.warning("Careful");
        notifier.info("FYI");

        let durations: Vec<_> = notifier
            .drain()
            .into_iter()
            .map(|n| (n.level, n.duration.as_millis()))
            .collect();
        assert_eq!(
            durations,
            vec![
                (NotificationLevel::Success, 3000),
                (NotificationLevel::Error, 5000),
                (NotificationLevel::Warning, 4000),
                (NotificationLevel::Info, 3000),
            ]
        );
        assert!(notifier.snapshot().is_empty());
    }
}
