//! Error type for `playlog-recorder`.

use strum::Display;
use thiserror::Error;
use uuid::Uuid;

/// Which level of the run hierarchy an operation needed to be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Scope {
  Playbook,
  Play,
}

#[derive(Debug, Error)]
pub enum Error {
  /// The caller sent a notification out of order, e.g. a play start before
  /// any playbook start.
  #[error("no active {0}")]
  NoActiveRun(Scope),

  /// The engine reported a status outside `ok|failed|skipped|unreachable`.
  #[error("invalid task status: {0:?}")]
  InvalidStatus(String),

  #[error("unknown task reference: {0}")]
  TaskNotFound(Uuid),

  #[error("persistence unavailable: {0}")]
  PersistenceUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn persistence<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::PersistenceUnavailable(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
