use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use super::traits::{Notification, NotificationSink};

/// Icon used when a notification does not carry its own.
pub const DEFAULT_ICON: &str = "/favicon.ico";

/// Notification permission, mirroring the browser's three-state model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPermission {
    /// Not asked yet
    #[default]
    Default,
    Granted,
    Denied,
}

/// Wraps a sink and forwards only while permission is `Granted`.
///
/// `request_permission` resolves a `Default` permission to the answer the
/// user (or the embedding front-end) gives; a `Denied` permission is final.
pub struct PermissionGatedSink<S> {
    inner: S,
    permission: Mutex<NotificationPermission>,
    prompt_answer: NotificationPermission,
}

impl<S: NotificationSink> PermissionGatedSink<S> {
    /// Start in `Default` state; a later prompt resolves to `prompt_answer`.
    pub fn new(inner: S, prompt_answer: NotificationPermission) -> Self {
        Self {
            inner,
            permission: Mutex::new(NotificationPermission::Default),
            prompt_answer,
        }
    }

    /// A sink that already has permission.
    pub fn granted(inner: S) -> Self {
        let sink = Self::new(inner, NotificationPermission::Granted);
        sink.set_permission(NotificationPermission::Granted);
        sink
    }

    pub fn permission(&self) -> NotificationPermission {
        *self.permission.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_permission(&self, permission: NotificationPermission) {
        *self.permission.lock().unwrap_or_else(|e| e.into_inner()) = permission;
    }

    /// Ask for permission if it has not been decided yet.
    pub fn request_permission(&self) -> NotificationPermission {
        let mut permission = self.permission.lock().unwrap_or_else(|e| e.into_inner());
        if *permission == NotificationPermission::Default {
            *permission = self.prompt_answer;
        }
        *permission
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: NotificationSink> NotificationSink for PermissionGatedSink<S> {
    fn show(&self, notification: &Notification) {
        if self.permission() != NotificationPermission::Granted {
            debug!("Notification '{}' suppressed: permission not granted", notification.title);
            return;
        }
        if notification.icon.is_some() {
            self.inner.show(notification);
        } else {
            let with_icon = notification.clone().with_icon(Some(DEFAULT_ICON.to_string()));
            self.inner.show(&with_icon);
        }
    }
}
