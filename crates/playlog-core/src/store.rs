//! The `RunStore` trait: the persistence boundary of the recorder.
//!
//! The trait is implemented by storage backends (e.g. `playlog-store-sqlite`).
//! The recorder and the read API depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  annotation::Data,
  result::{Host, HostSummary, NewTaskResult, Stats, TaskResult},
  run::{NewTask, Play, Playbook, Task},
};

/// Abstraction over a run-history backend.
///
/// Plays, tasks and results are append-only. The only rows ever rewritten are
/// `Stats` (keyed by playbook and host) and `Data` (keyed by playbook and
/// key); both are upserts that a backend must make atomic under concurrent
/// callers, either through a single writer or a uniqueness constraint.
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded async runtimes.
pub trait RunStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Run hierarchy ─────────────────────────────────────────────────────

  /// Create a new playbook run. Never deduplicated by path.
  fn create_playbook(
    &self,
    path: String,
  ) -> impl Future<Output = Result<Playbook, Self::Error>> + Send + '_;

  /// Stamp the run as complete.
  fn complete_playbook(
    &self,
    playbook_id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Append a play as the next child of `playbook_id`.
  fn create_play(
    &self,
    playbook_id: Uuid,
    name: String,
  ) -> impl Future<Output = Result<Play, Self::Error>> + Send + '_;

  /// Append a task as the next child of `input.play_id`.
  fn create_task(
    &self,
    input: NewTask,
  ) -> impl Future<Output = Result<Task, Self::Error>> + Send + '_;

  // ── Hosts and outcomes ────────────────────────────────────────────────

  /// Return the host named `name`, creating it if this is its first
  /// appearance anywhere.
  fn ensure_host(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Host, Self::Error>> + Send + '_;

  /// Append an immutable result row.
  fn insert_result(
    &self,
    input: NewTaskResult,
  ) -> impl Future<Output = Result<TaskResult, Self::Error>> + Send + '_;

  /// Insert or replace the stats row for `(playbook_id, host_id)`.
  fn upsert_stats(
    &self,
    playbook_id: Uuid,
    host_id: Uuid,
    counts: HostSummary,
  ) -> impl Future<Output = Result<Stats, Self::Error>> + Send + '_;

  /// Insert the annotation `key`, or replace its value if the run already
  /// has one.
  fn upsert_data(
    &self,
    playbook_id: Uuid,
    key: String,
    value: String,
  ) -> impl Future<Output = Result<Data, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn get_playbook(
    &self,
    playbook_id: Uuid,
  ) -> impl Future<Output = Result<Option<Playbook>, Self::Error>> + Send + '_;

  /// All playbook runs, most recently started first.
  fn list_playbooks(
    &self,
  ) -> impl Future<Output = Result<Vec<Playbook>, Self::Error>> + Send + '_;

  fn get_play(
    &self,
    play_id: Uuid,
  ) -> impl Future<Output = Result<Option<Play>, Self::Error>> + Send + '_;

  /// Plays of a run in sequence order.
  fn list_plays(
    &self,
    playbook_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Play>, Self::Error>> + Send + '_;

  fn get_task(
    &self,
    task_id: Uuid,
  ) -> impl Future<Output = Result<Option<Task>, Self::Error>> + Send + '_;

  /// Tasks of a play in sequence order.
  fn list_tasks(
    &self,
    play_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Task>, Self::Error>> + Send + '_;

  /// Results of a task in the order they were recorded.
  fn list_results(
    &self,
    task_id: Uuid,
  ) -> impl Future<Output = Result<Vec<TaskResult>, Self::Error>> + Send + '_;

  /// Every known host, ordered by name.
  fn list_hosts(
    &self,
  ) -> impl Future<Output = Result<Vec<Host>, Self::Error>> + Send + '_;

  fn list_stats(
    &self,
    playbook_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Stats>, Self::Error>> + Send + '_;

  fn get_data(
    &self,
    playbook_id: Uuid,
    key: String,
  ) -> impl Future<Output = Result<Option<Data>, Self::Error>> + Send + '_;

  /// Annotations of a run ordered by key.
  fn list_data(
    &self,
    playbook_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Data>, Self::Error>> + Send + '_;
}
