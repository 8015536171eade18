pub mod toast;

use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    error,
    info,
};

pub use toast::{
    Toast,
    ToastQueue,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: NotificationKind::Success, title: title.into(), message: message.into() }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: NotificationKind::Error, title: title.into(), message: message.into() }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: NotificationKind::Info, title: title.into(), message: message.into() }
    }
}

/// Where operation outcomes get reported. Fire-and-forget.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log instead of showing them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Error => {
                error!(title = %notification.title, "{}", notification.message)
            }
            NotificationKind::Success | NotificationKind::Info => {
                info!(title = %notification.title, "{}", notification.message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_wire_shape() {
        let value = serde_json::to_value(Notification::error("Add failed", "Keyword already exists"))
            .unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "error", "title": "Add failed", "message": "Keyword already exists"})
        );
    }
}
