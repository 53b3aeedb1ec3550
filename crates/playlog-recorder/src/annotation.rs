//! The key/value annotation directive.
//!
//! Annotations never abort a run. Missing arguments and a missing run are
//! reported back as a failed [`RecordOutcome`], and [`RunRecorder::record_directive`]
//! folds persistence errors into one as well.

use playlog_core::{annotation::RecordOutcome, store::RunStore};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{Error, Result, RunRecorder};

const NO_ACTIVE_RUN: &str = "no playbook is being recorded";

/// The `key` and `value` arguments of an annotation directive, as written in
/// the task that invoked it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordArgs {
  pub key:   Option<String>,
  pub value: Option<String>,
}

impl RecordArgs {
  /// Extract `key` and `value` from the directive's argument map.
  ///
  /// `null` counts as absent. Non-string values are stored as their JSON
  /// text, so `value: 3` records `"3"`.
  pub fn from_args(args: &Map<String, Value>) -> Self {
    Self { key: arg_text(args, "key"), value: arg_text(args, "value") }
  }
}

fn arg_text(args: &Map<String, Value>, name: &str) -> Option<String> {
  match args.get(name)? {
    Value::Null => None,
    Value::String(s) => Some(s.clone()),
    other => Some(other.to_string()),
  }
}

fn present(arg: Option<&str>) -> Option<&str> { arg.filter(|s| !s.is_empty()) }

impl<S: RunStore> RunRecorder<S> {
  /// Attach `value` under `key` to the current playbook, replacing any value
  /// already recorded for that key in this run.
  ///
  /// Returns `Err` only when the store fails; every caller mistake is a
  /// failed outcome and nothing is written.
  pub async fn record(
    &self,
    key: Option<&str>,
    value: Option<&str>,
  ) -> Result<RecordOutcome> {
    let Some(key) = present(key) else {
      return Ok(RecordOutcome::failure("key is required"));
    };
    let Some(value) = present(value) else {
      return Ok(RecordOutcome::failure("value is required"));
    };
    let Some(playbook_id) = self.current_playbook() else {
      return Ok(RecordOutcome::failure(NO_ACTIVE_RUN));
    };

    let data = self
      .store
      .upsert_data(playbook_id, key.to_owned(), value.to_owned())
      .await
      .map_err(Error::persistence)?;

    debug!(playbook_id = %playbook_id, key = %data.key, "recorded data");
    Ok(RecordOutcome::recorded())
  }

  /// Run the annotation directive as the engine invokes it: from its raw
  /// argument map, reporting every failure in the outcome.
  pub async fn record_directive(&self, args: &Map<String, Value>) -> RecordOutcome {
    let args = RecordArgs::from_args(args);
    let outcome = match self
      .record(args.key.as_deref(), args.value.as_deref())
      .await
    {
      Ok(outcome) => outcome,
      Err(e) => RecordOutcome::failure(format!("failed to record data: {e}")),
    };

    if outcome.failed {
      warn!(reason = %outcome.message, key = ?args.key, "annotation failed");
    }
    outcome
  }
}
