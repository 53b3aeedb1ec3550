//! Error types for `playlog-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid task status: {0:?}")]
  InvalidStatus(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
