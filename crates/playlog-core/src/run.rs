//! The run hierarchy: playbook → play → task.
//!
//! Every entity in this module is created by a lifecycle start notification
//! and appended under its parent. Sequence numbers are assigned by the store
//! when the row is inserted and never change afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Playbook ────────────────────────────────────────────────────────────────

/// One recorded run of a playbook file; the root of the hierarchy.
///
/// The same path may appear many times, once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playbook {
  pub playbook_id:  Uuid,
  pub path:         String,
  pub started_at:   DateTime<Utc>,
  /// Set when the end-of-run statistics were recorded. `None` for a run
  /// that is still going or was interrupted.
  pub completed_at: Option<DateTime<Utc>>,
}

impl Playbook {
  pub fn is_complete(&self) -> bool { self.completed_at.is_some() }
}

// ─── Play ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Play {
  pub play_id:     Uuid,
  pub playbook_id: Uuid,
  pub name:        String,
  /// 1-based position within the playbook.
  pub sequence:    i64,
  pub started_at:  DateTime<Utc>,
}

// ─── Source location ─────────────────────────────────────────────────────────

/// Where a task is defined, as reported by the orchestration engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
  pub file: String,
  pub line: Option<u32>,
}

impl SourceLocation {
  /// Parse the engine's `file:line` form.
  ///
  /// The split happens at the last `:` and only when what follows is a line
  /// number, so Windows drive letters and paths containing colons survive
  /// intact.
  pub fn parse(path: &str) -> Self {
    if let Some((file, line)) = path.rsplit_once(':')
      && !line.is_empty()
      && line.bytes().all(|b| b.is_ascii_digit())
      && let Ok(line) = line.parse::<u32>()
    {
      return Self { file: file.to_owned(), line: Some(line) };
    }
    Self { file: path.to_owned(), line: None }
  }
}

impl std::fmt::Display for SourceLocation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self.line {
      Some(line) => write!(f, "{}:{line}", self.file),
      None => f.write_str(&self.file),
    }
  }
}

// ─── Task ────────────────────────────────────────────────────────────────────

/// The task-start payload emitted by the orchestration engine.
///
/// `task_ref` is the engine's handle for the task. It becomes the recorded
/// task's id, and every result notification for the task carries it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
  pub task_ref: Uuid,
  pub name:     String,
  /// Module or action the task invokes, e.g. `"copy"`.
  pub action:   String,
  /// Definition site in `file:line` form.
  pub path:     String,
}

impl TaskDescriptor {
  pub fn new(
    name: impl Into<String>,
    action: impl Into<String>,
    path: impl Into<String>,
  ) -> Self {
    Self {
      task_ref: Uuid::new_v4(),
      name:     name.into(),
      action:   action.into(),
      path:     path.into(),
    }
  }

  pub fn location(&self) -> SourceLocation { SourceLocation::parse(&self.path) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
  pub task_id:        Uuid,
  pub play_id:        Uuid,
  pub name:           String,
  pub action:         String,
  pub location:       SourceLocation,
  /// 1-based position within the play.
  pub sequence:       i64,
  /// Informational only; the recorder treats conditional tasks like any other.
  pub is_conditional: bool,
  /// Handler tasks are announced through their own start notification.
  pub is_handler:     bool,
  pub started_at:     DateTime<Utc>,
}

/// Input to [`crate::store::RunStore::create_task`].
/// The sequence and start time are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewTask {
  pub task_id:        Uuid,
  pub play_id:        Uuid,
  pub name:           String,
  pub action:         String,
  pub location:       SourceLocation,
  pub is_conditional: bool,
  pub is_handler:     bool,
}

impl NewTask {
  pub fn from_descriptor(play_id: Uuid, descriptor: &TaskDescriptor) -> Self {
    Self {
      task_id: descriptor.task_ref,
      play_id,
      name: descriptor.name.clone(),
      action: descriptor.action.clone(),
      location: descriptor.location(),
      is_conditional: false,
      is_handler: false,
    }
  }
}
