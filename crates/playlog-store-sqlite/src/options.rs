//! Tuning knobs for [`crate::SqliteStore`].

use std::time::Duration;

use serde::Deserialize;

/// Connection and write-retry settings. Every field has a default so the
/// struct can be nested, partially specified, in a larger config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
  /// How long SQLite itself waits on a locked database before giving up.
  pub busy_timeout_ms:  u64,
  /// Extra attempts for a write that still finds the database locked.
  pub write_retries:    u32,
  /// Delay before retry `n` is `n * retry_backoff_ms`.
  pub retry_backoff_ms: u64,
}

impl Default for StoreOptions {
  fn default() -> Self {
    Self { busy_timeout_ms: 5_000, write_retries: 5, retry_backoff_ms: 20 }
  }
}

impl StoreOptions {
  pub fn busy_timeout(&self) -> Duration {
    Duration::from_millis(self.busy_timeout_ms)
  }

  pub fn backoff(&self, attempt: u32) -> Duration {
    Duration::from_millis(self.retry_backoff_ms * u64::from(attempt))
  }
}
