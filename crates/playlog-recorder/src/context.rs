//! The run context tracker: which playbook, play and task are open right now.
//!
//! Pointers are written only by start notifications, which the engine emits
//! one at a time from its coordinating thread. Readers on concurrent result
//! and annotation paths take a copied [`Snapshot`], so no lock is ever held
//! across an `.await`.

use std::{
  collections::HashMap,
  sync::{PoisonError, RwLock},
};

use playlog_core::run::Task;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of the run a recorder is tracking.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
  #[default]
  NotStarted,
  Running,
  /// The end-of-run stats were recorded; all pointers are cleared.
  Completed,
}

/// A consistent copy of the tracker's pointers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
  pub state:       RunState,
  pub playbook_id: Option<Uuid>,
  pub play_id:     Option<Uuid>,
  pub task_id:     Option<Uuid>,
}

/// Current-ancestry pointers plus an id-keyed index of the tasks opened in
/// this run.
///
/// The index is what result notifications resolve through: a result names its
/// task explicitly and is never attributed via the current-task pointer, which
/// may already have moved on by the time a slow host reports.
#[derive(Debug, Default)]
pub struct RunContext {
  pointers: RwLock<Snapshot>,
  tasks:    RwLock<HashMap<Uuid, Task>>,
}

impl RunContext {
  pub fn new() -> Self { Self::default() }

  pub fn snapshot(&self) -> Snapshot {
    *self.pointers.read().unwrap_or_else(PoisonError::into_inner)
  }

  /// Look a task of this run up by id.
  pub fn task(&self, task_id: Uuid) -> Option<Task> {
    self
      .tasks
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&task_id)
      .cloned()
  }

  pub(crate) fn begin_playbook(&self, playbook_id: Uuid) {
    *self.pointers.write().unwrap_or_else(PoisonError::into_inner) = Snapshot {
      state:       RunState::Running,
      playbook_id: Some(playbook_id),
      play_id:     None,
      task_id:     None,
    };
    self
      .tasks
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .clear();
  }

  pub(crate) fn begin_play(&self, play_id: Uuid) {
    let mut p = self.pointers.write().unwrap_or_else(PoisonError::into_inner);
    p.play_id = Some(play_id);
    p.task_id = None;
  }

  pub(crate) fn begin_task(&self, task: Task) {
    let task_id = task.task_id;
    // Index first so a result racing the pointer update can already resolve.
    self
      .tasks
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(task_id, task);
    self
      .pointers
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .task_id = Some(task_id);
  }

  /// Close the run. The task index is kept so stragglers still resolve.
  pub(crate) fn finish(&self) {
    *self.pointers.write().unwrap_or_else(PoisonError::into_inner) = Snapshot {
      state: RunState::Completed,
      ..Snapshot::default()
    };
  }
}
