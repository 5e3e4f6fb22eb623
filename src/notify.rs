//! User-visible notifications (toasts).

use std::sync::{Arc, Mutex};

use crate::error::Error;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Something finished successfully.
    Success,
    /// An action failed or was rejected.
    Error,
}

/// One message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub level: Level,
    /// Short headline.
    pub title: String,
    /// Human-readable details.
    pub message: String,
}

impl Notification {
    /// A success notification.
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            title: title.into(),
            message: message.into(),
        }
    }

    /// The failure notification for `error`.
    #[must_use]
    pub fn from_error(error: &Error) -> Self {
        Self {
            level: Level::Error,
            title: error.title().to_string(),
            message: error.user_message(),
        }
    }
}

/// Displays notifications to the user.
pub trait Notifier: Send + Sync {
    /// Show one notification.
    fn notify(&self, notification: Notification);
}

/// Forwards notifications to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, n: Notification) {
        match n.level {
            Level::Success => tracing::info!(title = %n.title, "{}", n.message),
            Level::Error => tracing::error!(title = %n.title, "{}", n.message),
        }
    }
}

/// Keeps every notification in memory, in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    seen: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn all(&self) -> Vec<Notification> {
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded notifications at `level`.
    #[must_use]
    pub fn count(&self, level: Level) -> usize {
        self.all().iter().filter(|n| n.level == level).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_error_uses_title_and_refined_message() {
        let n = Notification::from_error(&Error::AuthRequired);
        assert_eq!(n.level, Level::Error);
        assert_eq!(n.title, "Sign in required");
        assert!(n.message.contains("signed in"));
    }

    #[test]
    fn recorder_counts_by_level() {
        let rec = RecordingNotifier::new();
        rec.notify(Notification::success("Done", "ok"));
        rec.notify(Notification::from_error(&Error::AuthRequired));
        assert_eq!(rec.count(Level::Success), 1);
        assert_eq!(rec.count(Level::Error), 1);
        assert_eq!(rec.all().len(), 2);
    }
}
