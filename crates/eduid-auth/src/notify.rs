//! Fire-and-forget notification dispatch.
//!
//! Callers hand notifications to a bounded queue and return at once.
//! A supervised worker delivers each one on its own task, with a cap on
//! concurrent sends and a deadline per send. Delivery failures,
//! timeouts and panics are logged and dropped, never surfaced.

use std::sync::Arc;
use std::time::Duration;

use eduid_core::error::NotificationError;
use eduid_core::gateway::NotificationGateway;
use eduid_core::models::notification::{Notification, NotificationKind};
use eduid_core::models::profile::UserProfile;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::error::Elapsed;
use tracing::{debug, error, info, warn};

use crate::config::IdentityConfig;

/// Sending half of the notification queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::Sender<Notification>,
}

/// Handle on the delivery worker. The worker stops once every
/// [`NotificationDispatcher`] clone is dropped and the queue drains.
#[derive(Debug)]
pub struct NotificationWorker {
    handle: JoinHandle<()>,
}

impl NotificationDispatcher {
    /// Spawn the delivery worker on the current runtime.
    ///
    /// Once `notification_max_in_flight` sends are pending the worker
    /// stops taking from the queue, so a stalled transport fills the
    /// queue and further notifications are dropped.
    pub fn start<N: NotificationGateway>(gateway: N, config: &IdentityConfig) -> (Self, NotificationWorker) {
        let (sender, receiver) = mpsc::channel(config.notification_queue_capacity.max(1));
        let limits = DeliveryLimits {
            max_in_flight: config.notification_max_in_flight.max(1),
            send_timeout: Duration::from_secs(config.notification_send_timeout_secs),
        };
        let handle = tokio::spawn(deliver(Arc::new(gateway), receiver, limits));
        (Self { sender }, NotificationWorker { handle })
    }

    /// Queue a notification without waiting. Dropped with a warning
    /// when the queue is full or the worker is gone.
    pub fn dispatch(&self, notification: Notification) {
        match self.sender.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(n)) => {
                warn!(kind = %n.kind, to = %n.to_email, "Notification queue full, dropping notification");
            }
            Err(TrySendError::Closed(n)) => {
                warn!(kind = %n.kind, to = %n.to_email, "Notification worker stopped, dropping notification");
            }
        }
    }
}

impl NotificationWorker {
    /// Wait for queued and in-flight deliveries to finish.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            error!(error = %e, "Notification worker terminated abnormally");
        }
    }
}

/// Template field names shared with the mail renderer.
pub mod fields {
    pub const FULL_NAME: &str = "full_name";
    pub const USERNAME: &str = "username";
    pub const TEMPORARY_PASSWORD: &str = "temporary_password";
    pub const RESET_TOKEN: &str = "reset_token";
}

fn addressed(kind: NotificationKind, profile: &UserProfile) -> Option<Notification> {
    let Some(email) = profile.email.as_deref() else {
        debug!(user_id = %profile.id, %kind, "Identity has no email, skipping notification");
        return None;
    };
    Some(
        Notification::new(kind, email)
            .with(fields::FULL_NAME, profile.display_name())
            .with(fields::USERNAME, profile.username.as_str()),
    )
}

/// Welcome mail carrying the temporary password and a reset token.
pub fn temporary_credentials(
    profile: &UserProfile,
    temporary_password: &str,
    reset_token: &str,
) -> Option<Notification> {
    addressed(NotificationKind::TemporaryCredentials, profile).map(|n| {
        n.with(fields::TEMPORARY_PASSWORD, temporary_password)
            .with(fields::RESET_TOKEN, reset_token)
    })
}

pub fn password_reset(profile: &UserProfile, reset_token: &str) -> Option<Notification> {
    addressed(NotificationKind::PasswordReset, profile).map(|n| n.with(fields::RESET_TOKEN, reset_token))
}

pub fn password_changed(profile: &UserProfile) -> Option<Notification> {
    addressed(NotificationKind::PasswordChanged, profile)
}

struct DeliveryLimits {
    max_in_flight: usize,
    send_timeout: Duration,
}

type Delivery = (Notification, Result<Result<(), NotificationError>, Elapsed>);

async fn deliver<N: NotificationGateway>(
    gateway: Arc<N>,
    mut receiver: mpsc::Receiver<Notification>,
    limits: DeliveryLimits,
) {
    let permits = Arc::new(Semaphore::new(limits.max_in_flight));
    let mut in_flight: JoinSet<Delivery> = JoinSet::new();

    loop {
        // Take a slot before taking a message; the queue absorbs the rest.
        let permit = match Arc::clone(&permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!(error = %e, "Notification permits closed");
                break;
            }
        };
        let Some(notification) = receiver.recv().await else {
            break;
        };

        let gateway = Arc::clone(&gateway);
        let send_timeout = limits.send_timeout;
        in_flight.spawn(async move {
            let _permit = permit;
            let result = tokio::time::timeout(send_timeout, gateway.send(notification.clone())).await;
            (notification, result)
        });
        while let Some(done) = in_flight.try_join_next() {
            record(done);
        }
    }

    while let Some(done) = in_flight.join_next().await {
        record(done);
    }
    info!("Notification worker stopped");
}

fn record(done: Result<Delivery, JoinError>) {
    match done {
        Ok((n, Ok(Ok(())))) => debug!(kind = %n.kind, to = %n.to_email, "Notification delivered"),
        Ok((_, Ok(Err(e)))) => {
            warn!(kind = %e.kind, to = %e.recipient, reason = %e.reason, "Notification delivery failed");
        }
        Ok((n, Err(_))) => {
            warn!(kind = %n.kind, to = %n.to_email, "Notification delivery timed out");
        }
        Err(e) => error!(error = %e, "Notification delivery task panicked"),
    }
}
