use serde::{Deserialize, Serialize};

/// A user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Icon reference (URL or path); sinks fall back to their own default
    pub icon: Option<String>,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            icon: None,
        }
    }

    pub fn with_icon(mut self, icon: Option<String>) -> Self {
        self.icon = icon;
        self
    }
}

/// Where notifications are displayed.
///
/// Display is best-effort: `show` never fails from the caller's point of
/// view. A sink without permission simply shows nothing.
pub trait NotificationSink: Send + Sync {
    fn show(&self, notification: &Notification);
}
