//! Free-form key/value annotations attached to a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recorded annotation. `(playbook_id, key)` is unique: writing an existing
/// key replaces `value` in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Data {
  pub data_id:     Uuid,
  pub playbook_id: Uuid,
  pub key:         String,
  pub value:       String,
  /// Time of the most recent write.
  pub recorded_at: DateTime<Utc>,
}

/// What the annotation directive reports back to the run. A failure here is
/// a failed step in the run report, not an aborted run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOutcome {
  pub failed:  bool,
  pub message: String,
}

impl RecordOutcome {
  pub fn recorded() -> Self {
    Self { failed: false, message: "data recorded".to_owned() }
  }

  pub fn failure(message: impl Into<String>) -> Self {
    Self { failed: true, message: message.into() }
  }
}
