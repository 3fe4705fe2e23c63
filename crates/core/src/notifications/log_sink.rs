use log::info;

use super::traits::{Notification, NotificationSink};

/// Sink that writes notifications to the log (used by the terminal front-end).
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn show(&self, notification: &Notification) {
        info!("[notification] {}: {}", notification.title, notification.body);
    }
}
