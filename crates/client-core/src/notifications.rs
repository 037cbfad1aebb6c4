//! User-visible notifications
//!
//! Each [`NotificationCategory`] has at most one pending notification. A new
//! one replaces (dismisses) the previous notification of the same category;
//! categories are independent of each other.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::info;

/// Identifier handed out by a [`UserNotifier`]
pub type NotificationId = u64;

/// Vibration used for incoming chat messages
pub const MESSAGE_VIBRATION: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationCategory {
    CallError,
    RegistrationError,
    MessageReceived,
    LogUpload,
}

/// What happens when the user taps a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationAction {
    OpenConversation { sip_address: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserNotification {
    pub category: NotificationCategory,
    pub title: String,
    pub caption: Option<String>,
    pub message: String,
    pub action: Option<NotificationAction>,
}

impl UserNotification {
    pub fn new(category: NotificationCategory, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category,
            title: title.into(),
            caption: None,
            message: message.into(),
            action: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_action(mut self, action: NotificationAction) -> Self {
        self.action = Some(action);
        self
    }
}

/// Presents notifications to the user (toasts, banners, vibration)
pub trait UserNotifier: Send + Sync {
    fn show(&self, notification: &UserNotification) -> NotificationId;

    fn dismiss(&self, id: NotificationId);

    fn vibrate(&self, _duration: Duration) {}
}

/// Notifier that only logs
#[derive(Debug, Default)]
pub struct LoggingNotifier {
    next_id: AtomicU64,
}

impl UserNotifier for LoggingNotifier {
    fn show(&self, notification: &UserNotification) -> NotificationId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        info!(id, category = ?notification.category, title = %notification.title,
            "{}", notification.message);
        id
    }

    fn dismiss(&self, id: NotificationId) {
        info!(id, "Notification dismissed");
    }
}

/// Keeps one pending notification per category
pub struct NotificationCenter {
    notifier: Arc<dyn UserNotifier>,
    pending: Mutex<HashMap<NotificationCategory, NotificationId>>,
}

impl NotificationCenter {
    pub fn new(notifier: Arc<dyn UserNotifier>) -> Self {
        Self {
            notifier,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Show `notification`, replacing any pending one of its category
    pub fn replace(&self, notification: UserNotification) -> NotificationId {
        let mut pending = self.pending.lock();
        if let Some(previous) = pending.remove(&notification.category) {
            self.notifier.dismiss(previous);
        }
        let id = self.notifier.show(&notification);
        pending.insert(notification.category, id);
        id
    }

    /// Dismiss the pending notification of `category`, if any
    pub fn dismiss(&self, category: NotificationCategory) {
        if let Some(id) = self.pending.lock().remove(&category) {
            self.notifier.dismiss(id);
        }
    }

    pub fn pending(&self, category: NotificationCategory) -> Option<NotificationId> {
        self.pending.lock().get(&category).copied()
    }

    pub fn vibrate(&self, duration: Duration) {
        self.notifier.vibrate(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        next: AtomicU64,
        dismissed: Mutex<Vec<NotificationId>>,
    }

    impl UserNotifier for Recorder {
        fn show(&self, _notification: &UserNotification) -> NotificationId {
            self.next.fetch_add(1, Ordering::SeqCst) + 1
        }

        fn dismiss(&self, id: NotificationId) {
            self.dismissed.lock().push(id);
        }
    }

    #[test]
    fn test_replace_dismisses_same_category_only() {
        let recorder = Arc::new(Recorder::default());
        let center = NotificationCenter::new(recorder.clone());

        let first = center.replace(UserNotification::new(NotificationCategory::CallError, "a", "1"));
        let other = center.replace(UserNotification::new(NotificationCategory::LogUpload, "b", "2"));
        assert!(recorder.dismissed.lock().is_empty());

        let second = center.replace(UserNotification::new(NotificationCategory::CallError, "a", "3"));
        assert_eq!(*recorder.dismissed.lock(), vec![first]);
        assert_eq!(center.pending(NotificationCategory::CallError), Some(second));
        assert_eq!(center.pending(NotificationCategory::LogUpload), Some(other));

        center.dismiss(NotificationCategory::LogUpload);
        assert_eq!(center.pending(NotificationCategory::LogUpload), None);
    }
}
