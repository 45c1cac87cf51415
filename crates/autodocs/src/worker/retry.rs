use std::time::Duration;

use crate::config::RetrySettings;

/// Run-level retry policy for rate-limited jobs.
///
/// Linear backoff: the n-th reschedule (0-based) waits `base × (n + 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base: Duration) -> Self {
        Self { max_retries, base }
    }

    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(
            settings.max_retries,
            Duration::from_secs(settings.backoff_base_secs),
        )
    }

    /// Delay before the retry that follows `retries` earlier retries.
    pub fn delay_for(&self, retries: u32) -> Duration {
        self.base.saturating_mul(retries.saturating_add(1))
    }

    /// Whether a task that has been retried `retries` times may run again.
    pub fn can_retry(&self, retries: u32) -> bool {
        retries < self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}
