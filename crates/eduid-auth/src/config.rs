//! Identity service configuration.

use serde::Deserialize;

/// Configuration for the identity orchestrator.
///
/// Missing fields take the values of [`IdentityConfig::default`] when
/// deserialized.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Deadline for any single upstream call in seconds (default: 10).
    pub upstream_call_timeout_secs: u64,
    /// Upstream calls allowed in flight at once across all requests
    /// (default: 16).
    pub upstream_max_concurrency: usize,
    /// Extra attempts for idempotent reads after a transient failure
    /// (default: 2).
    pub read_retry_attempts: u32,
    /// First retry delay in milliseconds; doubles per attempt
    /// (default: 100).
    pub read_retry_base_delay_ms: u64,
    /// Minimum length of a new permanent credential (default: 8).
    pub min_password_length: usize,
    /// Pending notifications before new ones are dropped (default: 256).
    pub notification_queue_capacity: usize,
    /// Notifications handed to the mail transport at once (default: 8).
    pub notification_max_in_flight: usize,
    /// Deadline for one mail transport send in seconds (default: 10).
    pub notification_send_timeout_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            upstream_call_timeout_secs: 10,
            upstream_max_concurrency: 16,
            read_retry_attempts: 2,
            read_retry_base_delay_ms: 100,
            min_password_length: 8,
            notification_queue_capacity: 256,
            notification_max_in_flight: 8,
            notification_send_timeout_secs: 10,
        }
    }
}
