//! Notification gateways that stop short of a real mail transport.

use std::sync::Arc;

use eduid_core::error::NotificationError;
use eduid_core::gateway::NotificationGateway;
use eduid_core::models::notification::Notification;
use tokio::sync::Mutex;
use tracing::info;

/// Logs each notification instead of delivering it.
///
/// Only template keys are logged; values carry credentials.
#[derive(Debug, Clone, Default)]
pub struct LogNotificationGateway;

impl NotificationGateway for LogNotificationGateway {
    async fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        let fields: Vec<&str> = notification
            .template_data
            .keys()
            .map(String::as_str)
            .collect();
        info!(
            kind = %notification.kind,
            to = %notification.to_email,
            fields = ?fields,
            "Notification accepted for delivery"
        );
        Ok(())
    }
}

/// Collects notifications in memory; can be switched to reject every
/// send.
#[derive(Debug, Clone, Default)]
pub struct OutboxNotificationGateway {
    sent: Arc<Mutex<Vec<Notification>>>,
    failing: bool,
}

impl OutboxNotificationGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// An outbox whose transport is down.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }
}

impl NotificationGateway for OutboxNotificationGateway {
    async fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        if self.failing {
            return Err(NotificationError {
                kind: notification.kind.to_string(),
                recipient: notification.to_email,
                reason: "mail transport unavailable".into(),
            });
        }
        self.sent.lock().await.push(notification);
        Ok(())
    }
}
