//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings and UUIDs as hyphenated
//! lowercase strings. The only JSON column is a result's `details`.

use chrono::{DateTime, Utc};
use playlog_core::{
  annotation::Data,
  result::{Host, HostSummary, Stats, TaskResult, TaskStatus},
  run::{Play, Playbook, SourceLocation, Task},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Counters ─────────────────────────────────────────────────────────────────

fn decode_count(column: &str, n: i64) -> Result<u32> {
  u32::try_from(n)
    .map_err(|_| Error::Decode(format!("{column} out of range: {n}")))
}

fn decode_line(n: Option<i64>) -> Result<Option<u32>> {
  n.map(|n| decode_count("line", n)).transpose()
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `playbooks` row.
pub struct RawPlaybook {
  pub playbook_id:  String,
  pub path:         String,
  pub started_at:   String,
  pub completed_at: Option<String>,
}

impl RawPlaybook {
  pub const COLUMNS: &'static str =
    "playbook_id, path, started_at, completed_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      playbook_id:  row.get(0)?,
      path:         row.get(1)?,
      started_at:   row.get(2)?,
      completed_at: row.get(3)?,
    })
  }

  pub fn into_playbook(self) -> Result<Playbook> {
    Ok(Playbook {
      playbook_id:  decode_uuid(&self.playbook_id)?,
      path:         self.path,
      started_at:   decode_dt(&self.started_at)?,
      completed_at: self.completed_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw values read directly from a `plays` row.
pub struct RawPlay {
  pub play_id:     String,
  pub playbook_id: String,
  pub name:        String,
  pub sequence:    i64,
  pub started_at:  String,
}

impl RawPlay {
  pub const COLUMNS: &'static str =
    "play_id, playbook_id, name, sequence, started_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      play_id:     row.get(0)?,
      playbook_id: row.get(1)?,
      name:        row.get(2)?,
      sequence:    row.get(3)?,
      started_at:  row.get(4)?,
    })
  }

  pub fn into_play(self) -> Result<Play> {
    Ok(Play {
      play_id:     decode_uuid(&self.play_id)?,
      playbook_id: decode_uuid(&self.playbook_id)?,
      name:        self.name,
      sequence:    self.sequence,
      started_at:  decode_dt(&self.started_at)?,
    })
  }
}

/// Raw values read directly from a `tasks` row.
pub struct RawTask {
  pub task_id:        String,
  pub play_id:        String,
  pub name:           String,
  pub action:         String,
  pub file:           String,
  pub line:           Option<i64>,
  pub sequence:       i64,
  pub is_conditional: bool,
  pub is_handler:     bool,
  pub started_at:     String,
}

impl RawTask {
  pub const COLUMNS: &'static str = "task_id, play_id, name, action, file, \
                                     line, sequence, is_conditional, \
                                     is_handler, started_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      task_id:        row.get(0)?,
      play_id:        row.get(1)?,
      name:           row.get(2)?,
      action:         row.get(3)?,
      file:           row.get(4)?,
      line:           row.get(5)?,
      sequence:       row.get(6)?,
      is_conditional: row.get(7)?,
      is_handler:     row.get(8)?,
      started_at:     row.get(9)?,
    })
  }

  pub fn into_task(self) -> Result<Task> {
    Ok(Task {
      task_id:        decode_uuid(&self.task_id)?,
      play_id:        decode_uuid(&self.play_id)?,
      name:           self.name,
      action:         self.action,
      location:       SourceLocation {
        file: self.file,
        line: decode_line(self.line)?,
      },
      sequence:       self.sequence,
      is_conditional: self.is_conditional,
      is_handler:     self.is_handler,
      started_at:     decode_dt(&self.started_at)?,
    })
  }
}

/// Raw values read directly from a `hosts` row.
pub struct RawHost {
  pub host_id: String,
  pub name:    String,
}

impl RawHost {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { host_id: row.get(0)?, name: row.get(1)? })
  }

  pub fn into_host(self) -> Result<Host> {
    Ok(Host { host_id: decode_uuid(&self.host_id)?, name: self.name })
  }
}

/// Raw values read directly from a `task_results` row.
pub struct RawTaskResult {
  pub result_id:   String,
  pub task_id:     String,
  pub host_id:     String,
  pub status:      String,
  pub changed:     bool,
  pub details:     Option<String>,
  pub recorded_at: String,
}

impl RawTaskResult {
  pub const COLUMNS: &'static str =
    "result_id, task_id, host_id, status, changed, details, recorded_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      result_id:   row.get(0)?,
      task_id:     row.get(1)?,
      host_id:     row.get(2)?,
      status:      row.get(3)?,
      changed:     row.get(4)?,
      details:     row.get(5)?,
      recorded_at: row.get(6)?,
    })
  }

  pub fn into_result(self) -> Result<TaskResult> {
    Ok(TaskResult {
      result_id:   decode_uuid(&self.result_id)?,
      task_id:     decode_uuid(&self.task_id)?,
      host_id:     decode_uuid(&self.host_id)?,
      status:      TaskStatus::parse(&self.status)?,
      changed:     self.changed,
      details:     self
        .details
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw values read directly from a `stats` row.
pub struct RawStats {
  pub playbook_id: String,
  pub host_id:     String,
  pub ok:          i64,
  pub failed:      i64,
  pub changed:     i64,
  pub skipped:     i64,
  pub unreachable: i64,
  pub recorded_at: String,
}

impl RawStats {
  pub const COLUMNS: &'static str = "playbook_id, host_id, ok, failed, \
                                     changed, skipped, unreachable, \
                                     recorded_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      playbook_id: row.get(0)?,
      host_id:     row.get(1)?,
      ok:          row.get(2)?,
      failed:      row.get(3)?,
      changed:     row.get(4)?,
      skipped:     row.get(5)?,
      unreachable: row.get(6)?,
      recorded_at: row.get(7)?,
    })
  }

  pub fn into_stats(self) -> Result<Stats> {
    Ok(Stats {
      playbook_id: decode_uuid(&self.playbook_id)?,
      host_id:     decode_uuid(&self.host_id)?,
      counts:      HostSummary {
        ok:          decode_count("ok", self.ok)?,
        failed:      decode_count("failed", self.failed)?,
        changed:     decode_count("changed", self.changed)?,
        skipped:     decode_count("skipped", self.skipped)?,
        unreachable: decode_count("unreachable", self.unreachable)?,
      },
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw values read directly from a `data` row.
pub struct RawData {
  pub data_id:     String,
  pub playbook_id: String,
  pub key:         String,
  pub value:       String,
  pub recorded_at: String,
}

impl RawData {
  pub const COLUMNS: &'static str =
    "data_id, playbook_id, key, value, recorded_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      data_id:     row.get(0)?,
      playbook_id: row.get(1)?,
      key:         row.get(2)?,
      value:       row.get(3)?,
      recorded_at: row.get(4)?,
    })
  }

  pub fn into_data(self) -> Result<Data> {
    Ok(Data {
      data_id:     decode_uuid(&self.data_id)?,
      playbook_id: decode_uuid(&self.playbook_id)?,
      key:         self.key,
      value:       self.value,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}
