//! [`SqliteStore`]: the SQLite implementation of [`RunStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use playlog_core::{
  annotation::Data,
  result::{Host, HostSummary, NewTaskResult, Stats, TaskResult},
  run::{NewTask, Play, Playbook, Task},
  store::RunStore,
};

use crate::{
  Error, Result, StoreOptions,
  encode::{
    RawData, RawHost, RawPlay, RawPlaybook, RawStats, RawTask, RawTaskResult,
    decode_uuid, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A run-history store backed by a single SQLite file.
///
/// Cloning is cheap. The inner connection is reference-counted and every
/// clone shares the same connection thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  options: StoreOptions,
}

impl SqliteStore {
  /// Open (or create) a store at `path` with default options.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(path, StoreOptions::default()).await
  }

  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open_with(
    path: impl AsRef<Path>,
    options: StoreOptions,
  ) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, options };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, options: StoreOptions::default() };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let busy_timeout = self.options.busy_timeout();
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a read on the connection thread.
  async fn read<F, R>(&self, f: F) -> Result<R>
  where
    F: FnOnce(&mut rusqlite::Connection) -> rusqlite::Result<R> + Send + 'static,
    R: Send + 'static,
  {
    Ok(self.conn.call(move |conn| Ok(f(conn)?)).await?)
  }

  /// Run a write on the connection thread, retrying while another process
  /// holds the database lock.
  async fn write<F, R>(&self, op: &'static str, f: F) -> Result<R>
  where
    F: FnOnce(&mut rusqlite::Connection) -> rusqlite::Result<R>
      + Clone
      + Send
      + 'static,
    R: Send + 'static,
  {
    let mut attempt = 0;
    loop {
      let f = f.clone();
      match self.read(f).await {
        Err(e) if e.is_contention() && attempt < self.options.write_retries => {
          attempt += 1;
          tracing::debug!(op, attempt, "database locked, retrying write");
          tokio::time::sleep(self.options.backoff(attempt)).await;
        }
        other => return other,
      }
    }
  }
}

// ─── RunStore impl ───────────────────────────────────────────────────────────

impl RunStore for SqliteStore {
  type Error = Error;

  // ── Run hierarchy ─────────────────────────────────────────────────────────

  async fn create_playbook(&self, path: String) -> Result<Playbook> {
    let playbook = Playbook {
      playbook_id:  Uuid::new_v4(),
      path,
      started_at:   Utc::now(),
      completed_at: None,
    };

    let id_str = encode_uuid(playbook.playbook_id);
    let path   = playbook.path.clone();
    let at_str = encode_dt(playbook.started_at);

    self
      .write("create_playbook", move |conn| {
        conn.execute(
          "INSERT INTO playbooks (playbook_id, path, started_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, path, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(playbook)
  }

  async fn complete_playbook(
    &self,
    playbook_id: Uuid,
    at:          DateTime<Utc>,
  ) -> Result<()> {
    let id_str = encode_uuid(playbook_id);
    let at_str = encode_dt(at);

    let updated = self
      .write("complete_playbook", move |conn| {
        conn.execute(
          "UPDATE playbooks SET completed_at = ?2 WHERE playbook_id = ?1",
          rusqlite::params![id_str, at_str],
        )
      })
      .await?;

    if updated == 0 {
      return Err(Error::PlaybookNotFound(playbook_id));
    }
    Ok(())
  }

  async fn create_play(&self, playbook_id: Uuid, name: String) -> Result<Play> {
    let play_id         = Uuid::new_v4();
    let started_at      = Utc::now();
    let play_id_str     = encode_uuid(play_id);
    let playbook_id_str = encode_uuid(playbook_id);
    let name_col        = name.clone();
    let at_str          = encode_dt(started_at);

    // The sequence is computed inside the INSERT so it is assigned atomically
    // on the connection thread.
    let sequence: i64 = self
      .write("create_play", move |conn| {
        conn.query_row(
          "INSERT INTO plays (play_id, playbook_id, name, sequence, started_at)
           SELECT ?1, ?2, ?3, COALESCE(MAX(sequence), 0) + 1, ?4
           FROM plays WHERE playbook_id = ?2
           RETURNING sequence",
          rusqlite::params![play_id_str, playbook_id_str, name_col, at_str],
          |row| row.get(0),
        )
      })
      .await?;

    Ok(Play { play_id, playbook_id, name, sequence, started_at })
  }

  async fn create_task(&self, input: NewTask) -> Result<Task> {
    let task_id     = input.task_id;
    let started_at  = Utc::now();
    let task_id_str = encode_uuid(task_id);
    let play_id_str = encode_uuid(input.play_id);
    let name        = input.name.clone();
    let action      = input.action.clone();
    let file        = input.location.file.clone();
    let line        = input.location.line;
    let conditional = input.is_conditional;
    let handler     = input.is_handler;
    let at_str      = encode_dt(started_at);

    let sequence: i64 = self
      .write("create_task", move |conn| {
        conn.query_row(
          "INSERT INTO tasks (
             task_id, play_id, name, action, file, line,
             sequence, is_conditional, is_handler, started_at
           )
           SELECT ?1, ?2, ?3, ?4, ?5, ?6,
                  COALESCE(MAX(sequence), 0) + 1, ?7, ?8, ?9
           FROM tasks WHERE play_id = ?2
           RETURNING sequence",
          rusqlite::params![
            task_id_str,
            play_id_str,
            name,
            action,
            file,
            line,
            conditional,
            handler,
            at_str,
          ],
          |row| row.get(0),
        )
      })
      .await?;

    Ok(Task {
      task_id,
      play_id: input.play_id,
      name: input.name,
      action: input.action,
      location: input.location,
      sequence,
      is_conditional: input.is_conditional,
      is_handler: input.is_handler,
      started_at,
    })
  }

  // ── Hosts and outcomes ────────────────────────────────────────────────────

  async fn ensure_host(&self, name: String) -> Result<Host> {
    let new_id_str = encode_uuid(Uuid::new_v4());

    let raw = self
      .write("ensure_host", move |conn| {
        conn.execute(
          "INSERT INTO hosts (host_id, name) VALUES (?1, ?2)
           ON CONFLICT (name) DO NOTHING",
          rusqlite::params![new_id_str, name],
        )?;
        conn.query_row(
          "SELECT host_id, name FROM hosts WHERE name = ?1",
          rusqlite::params![name],
          RawHost::from_row,
        )
      })
      .await?;

    raw.into_host()
  }

  async fn insert_result(&self, input: NewTaskResult) -> Result<TaskResult> {
    let result = TaskResult {
      result_id:   Uuid::new_v4(),
      task_id:     input.task_id,
      host_id:     input.host_id,
      status:      input.status,
      changed:     input.changed,
      details:     input.details,
      recorded_at: Utc::now(),
    };

    let result_id_str = encode_uuid(result.result_id);
    let task_id_str   = encode_uuid(result.task_id);
    let host_id_str   = encode_uuid(result.host_id);
    let status_str    = result.status.as_str();
    let changed       = result.changed;
    let details_str   = result
      .details
      .as_ref()
      .map(serde_json::to_string)
      .transpose()?;
    let at_str        = encode_dt(result.recorded_at);

    self
      .write("insert_result", move |conn| {
        conn.execute(
          "INSERT INTO task_results (
             result_id, task_id, host_id, status, changed, details, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            result_id_str,
            task_id_str,
            host_id_str,
            status_str,
            changed,
            details_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(result)
  }

  async fn upsert_stats(
    &self,
    playbook_id: Uuid,
    host_id:     Uuid,
    counts:      HostSummary,
  ) -> Result<Stats> {
    let stats = Stats { playbook_id, host_id, counts, recorded_at: Utc::now() };

    let playbook_id_str = encode_uuid(playbook_id);
    let host_id_str     = encode_uuid(host_id);
    let at_str          = encode_dt(stats.recorded_at);

    self
      .write("upsert_stats", move |conn| {
        conn.execute(
          "INSERT INTO stats (
             playbook_id, host_id, ok, failed, changed, skipped, unreachable,
             recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
           ON CONFLICT (playbook_id, host_id) DO UPDATE SET
             ok          = excluded.ok,
             failed      = excluded.failed,
             changed     = excluded.changed,
             skipped     = excluded.skipped,
             unreachable = excluded.unreachable,
             recorded_at = excluded.recorded_at",
          rusqlite::params![
            playbook_id_str,
            host_id_str,
            counts.ok,
            counts.failed,
            counts.changed,
            counts.skipped,
            counts.unreachable,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(stats)
  }

  async fn upsert_data(
    &self,
    playbook_id: Uuid,
    key:         String,
    value:       String,
  ) -> Result<Data> {
    let recorded_at     = Utc::now();
    let new_id_str      = encode_uuid(Uuid::new_v4());
    let playbook_id_str = encode_uuid(playbook_id);
    let key_col         = key.clone();
    let value_col       = value.clone();
    let at_str          = encode_dt(recorded_at);

    // On conflict the existing row keeps its id; RETURNING reports whichever
    // row now holds the key.
    let id_str: String = self
      .write("upsert_data", move |conn| {
        conn.query_row(
          "INSERT INTO data (data_id, playbook_id, key, value, recorded_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (playbook_id, key) DO UPDATE SET
             value       = excluded.value,
             recorded_at = excluded.recorded_at
           RETURNING data_id",
          rusqlite::params![new_id_str, playbook_id_str, key_col, value_col, at_str],
          |row| row.get(0),
        )
      })
      .await?;

    Ok(Data {
      data_id: decode_uuid(&id_str)?,
      playbook_id,
      key,
      value,
      recorded_at,
    })
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_playbook(&self, playbook_id: Uuid) -> Result<Option<Playbook>> {
    let id_str = encode_uuid(playbook_id);
    let sql    = format!(
      "SELECT {} FROM playbooks WHERE playbook_id = ?1",
      RawPlaybook::COLUMNS
    );

    let raw = self
      .read(move |conn| {
        conn
          .query_row(&sql, rusqlite::params![id_str], RawPlaybook::from_row)
          .optional()
      })
      .await?;

    raw.map(RawPlaybook::into_playbook).transpose()
  }

  async fn list_playbooks(&self) -> Result<Vec<Playbook>> {
    let sql = format!(
      "SELECT {} FROM playbooks ORDER BY started_at DESC, rowid DESC",
      RawPlaybook::COLUMNS
    );

    let raws = self
      .read(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawPlaybook::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPlaybook::into_playbook).collect()
  }

  async fn get_play(&self, play_id: Uuid) -> Result<Option<Play>> {
    let id_str = encode_uuid(play_id);
    let sql    =
      format!("SELECT {} FROM plays WHERE play_id = ?1", RawPlay::COLUMNS);

    let raw = self
      .read(move |conn| {
        conn
          .query_row(&sql, rusqlite::params![id_str], RawPlay::from_row)
          .optional()
      })
      .await?;

    raw.map(RawPlay::into_play).transpose()
  }

  async fn list_plays(&self, playbook_id: Uuid) -> Result<Vec<Play>> {
    let id_str = encode_uuid(playbook_id);
    let sql    = format!(
      "SELECT {} FROM plays WHERE playbook_id = ?1 ORDER BY sequence",
      RawPlay::COLUMNS
    );

    let raws = self
      .read(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawPlay::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPlay::into_play).collect()
  }

  async fn get_task(&self, task_id: Uuid) -> Result<Option<Task>> {
    let id_str = encode_uuid(task_id);
    let sql    =
      format!("SELECT {} FROM tasks WHERE task_id = ?1", RawTask::COLUMNS);

    let raw = self
      .read(move |conn| {
        conn
          .query_row(&sql, rusqlite::params![id_str], RawTask::from_row)
          .optional()
      })
      .await?;

    raw.map(RawTask::into_task).transpose()
  }

  async fn list_tasks(&self, play_id: Uuid) -> Result<Vec<Task>> {
    let id_str = encode_uuid(play_id);
    let sql    = format!(
      "SELECT {} FROM tasks WHERE play_id = ?1 ORDER BY sequence",
      RawTask::COLUMNS
    );

    let raws = self
      .read(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawTask::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTask::into_task).collect()
  }

  async fn list_results(&self, task_id: Uuid) -> Result<Vec<TaskResult>> {
    let id_str = encode_uuid(task_id);
    let sql    = format!(
      "SELECT {} FROM task_results WHERE task_id = ?1 ORDER BY rowid",
      RawTaskResult::COLUMNS
    );

    let raws = self
      .read(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawTaskResult::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTaskResult::into_result).collect()
  }

  async fn list_hosts(&self) -> Result<Vec<Host>> {
    let raws = self
      .read(|conn| {
        let mut stmt =
          conn.prepare("SELECT host_id, name FROM hosts ORDER BY name")?;
        let rows = stmt
          .query_map([], RawHost::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawHost::into_host).collect()
  }

  async fn list_stats(&self, playbook_id: Uuid) -> Result<Vec<Stats>> {
    let id_str = encode_uuid(playbook_id);
    let sql    = format!(
      "SELECT {} FROM stats WHERE playbook_id = ?1 ORDER BY rowid",
      RawStats::COLUMNS
    );

    let raws = self
      .read(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawStats::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStats::into_stats).collect()
  }

  async fn get_data(&self, playbook_id: Uuid, key: String) -> Result<Option<Data>> {
    let id_str = encode_uuid(playbook_id);
    let sql    = format!(
      "SELECT {} FROM data WHERE playbook_id = ?1 AND key = ?2",
      RawData::COLUMNS
    );

    let raw = self
      .read(move |conn| {
        conn
          .query_row(&sql, rusqlite::params![id_str, key], RawData::from_row)
          .optional()
      })
      .await?;

    raw.map(RawData::into_data).transpose()
  }

  async fn list_data(&self, playbook_id: Uuid) -> Result<Vec<Data>> {
    let id_str = encode_uuid(playbook_id);
    let sql    = format!(
      "SELECT {} FROM data WHERE playbook_id = ?1 ORDER BY key",
      RawData::COLUMNS
    );

    let raws = self
      .read(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawData::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawData::into_data).collect()
  }
}
