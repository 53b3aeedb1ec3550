//! Error type for `playlog-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] playlog_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("playbook not found: {0}")]
  PlaybookNotFound(uuid::Uuid),

  /// A stored column held a value this version cannot interpret.
  #[error("decode error: {0}")]
  Decode(String),
}

impl Error {
  /// Whether the failure came from another connection holding the database
  /// lock, in which case the write can be retried.
  pub fn is_contention(&self) -> bool {
    matches!(
      self,
      Self::Database(tokio_rusqlite::Error::Rusqlite(
        rusqlite::Error::SqliteFailure(e, _)
      )) if matches!(
        e.code,
        rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
      )
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
