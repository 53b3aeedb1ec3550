//! Hosts and what happened on them: per-task results and end-of-run stats.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::Error;

// ─── Host ────────────────────────────────────────────────────────────────────

/// A target machine. Hosts are shared by every run and deduplicated by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
  pub host_id: Uuid,
  pub name:    String,
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Outcome of one task on one host.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskStatus {
  Ok,
  Failed,
  Skipped,
  Unreachable,
}

impl TaskStatus {
  /// Parse the status string carried by a result notification.
  pub fn parse(s: &str) -> Result<Self, Error> {
    Self::from_str(s).map_err(|_| Error::InvalidStatus(s.to_owned()))
  }

  pub fn as_str(self) -> &'static str { self.into() }
}

// ─── TaskResult ──────────────────────────────────────────────────────────────

/// One reported outcome of a task on a host. Immutable once written; a task
/// may report several times for the same host (loops), each its own row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
  pub result_id:   Uuid,
  pub task_id:     Uuid,
  pub host_id:     Uuid,
  pub status:      TaskStatus,
  pub changed:     bool,
  /// Raw result payload from the engine, if it sent one.
  pub details:     Option<serde_json::Value>,
  pub recorded_at: DateTime<Utc>,
}

/// Input to [`crate::store::RunStore::insert_result`].
#[derive(Debug, Clone)]
pub struct NewTaskResult {
  pub task_id: Uuid,
  pub host_id: Uuid,
  pub status:  TaskStatus,
  pub changed: bool,
  pub details: Option<serde_json::Value>,
}

// ─── Stats ───────────────────────────────────────────────────────────────────

/// Aggregate counters for one host over a whole run, as summarised by the
/// orchestration engine. Missing counters deserialise as zero.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(default)]
pub struct HostSummary {
  pub ok:          u32,
  pub failed:      u32,
  pub changed:     u32,
  pub skipped:     u32,
  pub unreachable: u32,
}

/// One row per (playbook, host), written at the end of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
  pub playbook_id: Uuid,
  pub host_id:     Uuid,
  pub counts:      HostSummary,
  pub recorded_at: DateTime<Utc>,
}
