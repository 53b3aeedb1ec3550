//! The lifecycle-notification contract between an orchestration engine and
//! whatever records its runs.

use std::{collections::BTreeMap, convert::Infallible, future::Future};

use playlog_core::{result::HostSummary, run::TaskDescriptor, store::RunStore};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::{Error, RunRecorder};

/// One host's report for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerResult {
  /// The `task_ref` of the task this result belongs to.
  pub task_ref: Uuid,
  pub host:     String,
  /// One of `ok`, `failed`, `skipped`, `unreachable`; anything else is
  /// rejected.
  pub status:   String,
  #[serde(default)]
  pub changed:  bool,
  #[serde(default)]
  pub details:  Option<serde_json::Value>,
}

impl RunnerResult {
  pub fn new(
    task_ref: Uuid,
    host: impl Into<String>,
    status: impl Into<String>,
    changed: bool,
  ) -> Self {
    Self {
      task_ref,
      host: host.into(),
      status: status.into(),
      changed,
      details: None,
    }
  }
}

/// Receiver of the notifications an orchestration engine emits during a run.
///
/// Start notifications arrive one at a time in run order. `runner_result` may
/// be called concurrently for hosts running in parallel. `playbook_stats` is
/// the last notification of a run.
pub trait LifecycleSink: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn playbook_start<'a>(
    &'a self,
    path: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn play_start<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn task_start<'a>(
    &'a self,
    task: &'a TaskDescriptor,
    is_conditional: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn handler_task_start<'a>(
    &'a self,
    task: &'a TaskDescriptor,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn runner_result<'a>(
    &'a self,
    result: &'a RunnerResult,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn playbook_stats<'a>(
    &'a self,
    summary: &'a BTreeMap<String, HostSummary>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── RunRecorder ─────────────────────────────────────────────────────────────

impl<S: RunStore> LifecycleSink for RunRecorder<S> {
  type Error = Error;

  async fn playbook_start(&self, path: &str) -> Result<(), Error> {
    self.on_playbook_start(path).await.map(drop)
  }

  async fn play_start(&self, name: &str) -> Result<(), Error> {
    self.on_play_start(name).await.map(drop)
  }

  async fn task_start(
    &self,
    task: &TaskDescriptor,
    is_conditional: bool,
  ) -> Result<(), Error> {
    self.on_task_start(task, is_conditional).await.map(drop)
  }

  async fn handler_task_start(&self, task: &TaskDescriptor) -> Result<(), Error> {
    self.on_handler_task_start(task).await.map(drop)
  }

  async fn runner_result(&self, result: &RunnerResult) -> Result<(), Error> {
    self
      .on_result(
        result.task_ref,
        &result.host,
        &result.status,
        result.changed,
        result.details.clone(),
      )
      .await
      .map(drop)
  }

  async fn playbook_stats(
    &self,
    summary: &BTreeMap<String, HostSummary>,
  ) -> Result<(), Error> {
    self.on_stats(summary).await.map(drop)
  }
}

// ─── Isolated ────────────────────────────────────────────────────────────────

/// Wraps a sink so that recording failures are logged instead of returned.
///
/// This is the shape an engine plugin wants: a broken database must not stop
/// the automation run it is observing.
pub struct Isolated<L> {
  inner: L,
}

impl<L: LifecycleSink> Isolated<L> {
  pub fn new(inner: L) -> Self { Self { inner } }

  pub fn inner(&self) -> &L { &self.inner }

  pub fn into_inner(self) -> L { self.inner }
}

impl<L: LifecycleSink> LifecycleSink for Isolated<L> {
  type Error = Infallible;

  async fn playbook_start(&self, path: &str) -> Result<(), Infallible> {
    if let Err(e) = self.inner.playbook_start(path).await {
      error!(error = %e, path, "failed to record playbook start");
    }
    Ok(())
  }

  async fn play_start(&self, name: &str) -> Result<(), Infallible> {
    if let Err(e) = self.inner.play_start(name).await {
      error!(error = %e, play = name, "failed to record play start");
    }
    Ok(())
  }

  async fn task_start(
    &self,
    task: &TaskDescriptor,
    is_conditional: bool,
  ) -> Result<(), Infallible> {
    if let Err(e) = self.inner.task_start(task, is_conditional).await {
      error!(
        error = %e,
        task_ref = %task.task_ref,
        task = %task.name,
        "failed to record task start"
      );
    }
    Ok(())
  }

  async fn handler_task_start(
    &self,
    task: &TaskDescriptor,
  ) -> Result<(), Infallible> {
    if let Err(e) = self.inner.handler_task_start(task).await {
      error!(
        error = %e,
        task_ref = %task.task_ref,
        task = %task.name,
        "failed to record handler start"
      );
    }
    Ok(())
  }

  async fn runner_result(&self, result: &RunnerResult) -> Result<(), Infallible> {
    if let Err(e) = self.inner.runner_result(result).await {
      error!(
        error = %e,
        task_ref = %result.task_ref,
        host = %result.host,
        "failed to record result"
      );
    }
    Ok(())
  }

  async fn playbook_stats(
    &self,
    summary: &BTreeMap<String, HostSummary>,
  ) -> Result<(), Infallible> {
    if let Err(e) = self.inner.playbook_stats(summary).await {
      error!(error = %e, hosts = summary.len(), "failed to record stats");
    }
    Ok(())
  }
}
