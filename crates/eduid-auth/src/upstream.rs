//! Bounded, deadline-carrying access to upstream services.

use std::sync::Arc;
use std::time::Duration;

use eduid_core::error::{EduIdError, EduIdResult};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::config::IdentityConfig;

/// Service name used for identity provider calls.
pub const IDENTITY_PROVIDER: &str = "identity-provider";
/// Service name used for institution lookups.
pub const INSTITUTION_SERVICE: &str = "institution-service";

/// Wraps every upstream call in a shared concurrency limit and a
/// per-call timeout. Idempotent reads may additionally be retried with
/// exponential backoff on transient failures.
///
/// A timed-out call future is dropped, cancelling the request.
#[derive(Debug, Clone)]
pub struct UpstreamGuard {
    permits: Arc<Semaphore>,
    call_timeout: Duration,
    retry_attempts: u32,
    retry_base_delay: Duration,
}

impl UpstreamGuard {
    pub fn new(
        max_concurrency: usize,
        call_timeout: Duration,
        retry_attempts: u32,
        retry_base_delay: Duration,
    ) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
            call_timeout,
            retry_attempts,
            retry_base_delay,
        }
    }

    pub fn from_config(config: &IdentityConfig) -> Self {
        Self::new(
            config.upstream_max_concurrency,
            Duration::from_secs(config.upstream_call_timeout_secs),
            config.read_retry_attempts,
            Duration::from_millis(config.read_retry_base_delay_ms),
        )
    }

    /// Run one upstream call. Never retried.
    pub async fn call<T>(
        &self,
        service: &'static str,
        operation: &'static str,
        call: impl Future<Output = EduIdResult<T>>,
    ) -> EduIdResult<T> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| EduIdError::Internal("upstream limiter closed".into()))?;

        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(service, operation, timeout = ?self.call_timeout, "Upstream call timed out");
                Err(EduIdError::Timeout {
                    service: service.into(),
                    operation: operation.into(),
                })
            }
        }
    }

    /// Run an idempotent read, retrying transient failures.
    ///
    /// The permit is released between attempts.
    pub async fn read<T, F, Fut>(
        &self,
        service: &'static str,
        operation: &'static str,
        mut read: F,
    ) -> EduIdResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = EduIdResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match self.call(service, operation, read()).await {
                Err(err) if err.is_transient() && attempt < self.retry_attempts => {
                    let delay = self.retry_base_delay * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    debug!(service, operation, attempt, error = %err, ?delay, "Retrying upstream read");
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}
