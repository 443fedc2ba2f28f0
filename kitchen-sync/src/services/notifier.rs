//! Notifier that logs and keeps every notification

use crate::orders::traits::{Notification, Notifier};
use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().clone()
    }

    /// Drain everything recorded so far
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.seen.lock())
    }

    pub fn new_order_alerts(&self) -> usize {
        self.seen
            .lock()
            .iter()
            .filter(|n| matches!(n, Notification::NewOrders { .. }))
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        match &notification {
            Notification::NewOrders { tenant_id, delta, .. } => {
                tracing::info!(tenant_id = %tenant_id, delta, "New orders");
            }
            Notification::ManualActionRequired { message } => {
                tracing::warn!("{}", message);
            }
            other => tracing::debug!(notification = ?other, "Notification"),
        }
        self.seen.lock().push(notification);
    }
}
