//! [`RunRecorder`] turns lifecycle notifications into persisted entities.

use std::{collections::BTreeMap, sync::Arc};

use chrono::Utc;
use playlog_core::{
  result::{HostSummary, NewTaskResult, Stats, TaskResult, TaskStatus},
  run::{NewTask, Play, Playbook, Task, TaskDescriptor},
  store::RunStore,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result, Scope,
  context::{RunContext, RunState, Snapshot},
};

/// Records one playbook run into `S`.
///
/// Start notifications must arrive sequentially; `on_result` and `record` may
/// be called concurrently from any number of tasks.
pub struct RunRecorder<S> {
  pub(crate) store:   Arc<S>,
  pub(crate) context: RunContext,
}

impl<S: RunStore> RunRecorder<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store, context: RunContext::new() }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn snapshot(&self) -> Snapshot { self.context.snapshot() }

  pub fn state(&self) -> RunState { self.snapshot().state }

  pub fn current_playbook(&self) -> Option<Uuid> {
    self.snapshot().playbook_id
  }

  pub fn current_play(&self) -> Option<Uuid> { self.snapshot().play_id }

  pub fn current_task(&self) -> Option<Uuid> { self.snapshot().task_id }

  // ── Start notifications ───────────────────────────────────────────────────

  /// Open a new run. Every call creates a new playbook row, even for a path
  /// that was run before.
  pub async fn on_playbook_start(&self, path: &str) -> Result<Playbook> {
    let previous = self.snapshot();
    if let (RunState::Running, Some(open)) =
      (previous.state, previous.playbook_id)
    {
      warn!(
        playbook_id = %open,
        "playbook started before the previous run finished; leaving it incomplete"
      );
    }

    let playbook = self
      .store
      .create_playbook(path.to_owned())
      .await
      .map_err(Error::persistence)?;

    self.context.begin_playbook(playbook.playbook_id);
    info!(playbook_id = %playbook.playbook_id, path, "recording playbook");
    Ok(playbook)
  }

  /// Append a play to the current playbook and make it current.
  pub async fn on_play_start(&self, name: &str) -> Result<Play> {
    let playbook_id = self
      .current_playbook()
      .ok_or(Error::NoActiveRun(Scope::Playbook))?;

    let play = self
      .store
      .create_play(playbook_id, name.to_owned())
      .await
      .map_err(Error::persistence)?;

    self.context.begin_play(play.play_id);
    info!(
      play_id = %play.play_id,
      sequence = play.sequence,
      play = name,
      "recording play"
    );
    Ok(play)
  }

  /// Append a task to the current play and make it current.
  pub async fn on_task_start(
    &self,
    descriptor: &TaskDescriptor,
    is_conditional: bool,
  ) -> Result<Task> {
    self.start_task(descriptor, is_conditional, false).await
  }

  /// Like [`Self::on_task_start`], for handler tasks.
  pub async fn on_handler_task_start(
    &self,
    descriptor: &TaskDescriptor,
  ) -> Result<Task> {
    self.start_task(descriptor, false, true).await
  }

  async fn start_task(
    &self,
    descriptor: &TaskDescriptor,
    is_conditional: bool,
    is_handler: bool,
  ) -> Result<Task> {
    let play_id = self
      .current_play()
      .ok_or(Error::NoActiveRun(Scope::Play))?;

    let mut input = NewTask::from_descriptor(play_id, descriptor);
    input.is_conditional = is_conditional;
    input.is_handler = is_handler;

    let task = self
      .store
      .create_task(input)
      .await
      .map_err(Error::persistence)?;

    debug!(
      task_id = %task.task_id,
      sequence = task.sequence,
      task = %task.name,
      location = %task.location,
      is_handler,
      "recording task"
    );
    self.context.begin_task(task.clone());
    Ok(task)
  }

  // ── Results ───────────────────────────────────────────────────────────────

  /// Record one host's outcome for the task identified by `task_ref`.
  ///
  /// The task is resolved from `task_ref` alone, never from the current-task
  /// pointer. Repeated results for the same task and host each get their own
  /// row.
  pub async fn on_result(
    &self,
    task_ref: Uuid,
    host_name: &str,
    status: &str,
    changed: bool,
    details: Option<serde_json::Value>,
  ) -> Result<TaskResult> {
    let status = TaskStatus::parse(status)
      .map_err(|_| Error::InvalidStatus(status.to_owned()))?;

    let task = self.resolve_task(task_ref).await?;

    let host = self
      .store
      .ensure_host(host_name.to_owned())
      .await
      .map_err(Error::persistence)?;

    let result = self
      .store
      .insert_result(NewTaskResult {
        task_id: task.task_id,
        host_id: host.host_id,
        status,
        changed,
        details,
      })
      .await
      .map_err(Error::persistence)?;

    debug!(
      task_id = %task.task_id,
      host = host_name,
      %status,
      changed,
      "recorded result"
    );
    Ok(result)
  }

  async fn resolve_task(&self, task_ref: Uuid) -> Result<Task> {
    if let Some(task) = self.context.task(task_ref) {
      return Ok(task);
    }
    // Not opened through this recorder, e.g. a task recorded before a restart.
    self
      .store
      .get_task(task_ref)
      .await
      .map_err(Error::persistence)?
      .ok_or(Error::TaskNotFound(task_ref))
  }

  // ── End of run ────────────────────────────────────────────────────────────

  /// Write one stats row per host, exactly as summarised, then close the run.
  pub async fn on_stats(
    &self,
    summary: &BTreeMap<String, HostSummary>,
  ) -> Result<Vec<Stats>> {
    let playbook_id = self
      .current_playbook()
      .ok_or(Error::NoActiveRun(Scope::Playbook))?;

    let mut written = Vec::with_capacity(summary.len());
    for (host_name, counts) in summary {
      let host = self
        .store
        .ensure_host(host_name.clone())
        .await
        .map_err(Error::persistence)?;
      let stats = self
        .store
        .upsert_stats(playbook_id, host.host_id, *counts)
        .await
        .map_err(Error::persistence)?;
      written.push(stats);
    }

    self
      .store
      .complete_playbook(playbook_id, Utc::now())
      .await
      .map_err(Error::persistence)?;

    self.context.finish();
    info!(
      playbook_id = %playbook_id,
      hosts = written.len(),
      "playbook run complete"
    );
    Ok(written)
  }
}
