//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::Arc;

use chrono::Utc;
use playlog_core::{
  result::{HostSummary, NewTaskResult, TaskStatus},
  run::{NewTask, SourceLocation, TaskDescriptor},
  store::RunStore,
};
use uuid::Uuid;

use crate::{Error, SqliteStore, StoreOptions};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn task_input(play_id: Uuid, name: &str) -> NewTask {
  NewTask::from_descriptor(
    play_id,
    &TaskDescriptor::new(name, "command", "/p.yml:10"),
  )
}

// ─── Run hierarchy ───────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_playbook() {
  let s = store().await;

  let pb = s.create_playbook("/p.yml".into()).await.unwrap();
  assert_eq!(pb.path, "/p.yml");
  assert!(!pb.is_complete());

  let fetched = s.get_playbook(pb.playbook_id).await.unwrap().unwrap();
  assert_eq!(fetched.playbook_id, pb.playbook_id);
  assert_eq!(fetched.path, "/p.yml");
  assert!(fetched.completed_at.is_none());
}

#[tokio::test]
async fn get_playbook_missing_returns_none() {
  let s = store().await;
  assert!(s.get_playbook(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn same_path_creates_separate_runs() {
  let s = store().await;
  let first = s.create_playbook("/p.yml".into()).await.unwrap();
  let second = s.create_playbook("/p.yml".into()).await.unwrap();
  assert_ne!(first.playbook_id, second.playbook_id);

  let all = s.list_playbooks().await.unwrap();
  assert_eq!(all.len(), 2);
  // Newest first.
  assert_eq!(all[0].playbook_id, second.playbook_id);
}

#[tokio::test]
async fn complete_playbook_stamps_time() {
  let s = store().await;
  let pb = s.create_playbook("/p.yml".into()).await.unwrap();

  s.complete_playbook(pb.playbook_id, Utc::now()).await.unwrap();

  let fetched = s.get_playbook(pb.playbook_id).await.unwrap().unwrap();
  assert!(fetched.is_complete());
}

#[tokio::test]
async fn complete_unknown_playbook_errors() {
  let s = store().await;
  let err = s
    .complete_playbook(Uuid::new_v4(), Utc::now())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::PlaybookNotFound(_)));
}

#[tokio::test]
async fn plays_are_sequenced_per_playbook() {
  let s = store().await;
  let a = s.create_playbook("/a.yml".into()).await.unwrap();
  let b = s.create_playbook("/b.yml".into()).await.unwrap();

  let a1 = s.create_play(a.playbook_id, "first".into()).await.unwrap();
  let b1 = s.create_play(b.playbook_id, "other".into()).await.unwrap();
  let a2 = s.create_play(a.playbook_id, "second".into()).await.unwrap();

  assert_eq!(a1.sequence, 1);
  assert_eq!(a2.sequence, 2);
  assert_eq!(b1.sequence, 1);

  let plays = s.list_plays(a.playbook_id).await.unwrap();
  let names: Vec<_> = plays.iter().map(|p| p.name.as_str()).collect();
  assert_eq!(names, ["first", "second"]);
}

#[tokio::test]
async fn play_under_unknown_playbook_is_rejected() {
  let s = store().await;
  let err = s
    .create_play(Uuid::new_v4(), "orphan".into())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Database(_)));
}

#[tokio::test]
async fn tasks_roundtrip_with_location() {
  let s = store().await;
  let pb = s.create_playbook("/p.yml".into()).await.unwrap();
  let play = s.create_play(pb.playbook_id, "deploy".into()).await.unwrap();

  let mut input = task_input(play.play_id, "restart");
  input.is_conditional = true;
  input.is_handler = true;
  let t1 = s.create_task(task_input(play.play_id, "install")).await.unwrap();
  let t2 = s.create_task(input).await.unwrap();
  assert_eq!((t1.sequence, t2.sequence), (1, 2));

  let fetched = s.get_task(t2.task_id).await.unwrap().unwrap();
  assert_eq!(fetched.name, "restart");
  assert_eq!(fetched.action, "command");
  assert_eq!(fetched.location, SourceLocation {
    file: "/p.yml".into(),
    line: Some(10),
  });
  assert!(fetched.is_conditional);
  assert!(fetched.is_handler);

  let tasks = s.list_tasks(play.play_id).await.unwrap();
  assert_eq!(tasks.len(), 2);
  assert_eq!(tasks[0].task_id, t1.task_id);
}

// ─── Hosts and results ───────────────────────────────────────────────────────

#[tokio::test]
async fn hosts_are_deduplicated_by_name() {
  let s = store().await;
  let h1 = s.ensure_host("web1".into()).await.unwrap();
  let h2 = s.ensure_host("web1".into()).await.unwrap();
  let other = s.ensure_host("db1".into()).await.unwrap();

  assert_eq!(h1.host_id, h2.host_id);
  assert_ne!(h1.host_id, other.host_id);

  let names: Vec<_> = s
    .list_hosts()
    .await
    .unwrap()
    .into_iter()
    .map(|h| h.name)
    .collect();
  assert_eq!(names, ["db1", "web1"]);
}

#[tokio::test]
async fn results_append_even_for_same_task_and_host() {
  let s = store().await;
  let pb = s.create_playbook("/p.yml".into()).await.unwrap();
  let play = s.create_play(pb.playbook_id, "deploy".into()).await.unwrap();
  let task = s.create_task(task_input(play.play_id, "loop")).await.unwrap();
  let host = s.ensure_host("web1".into()).await.unwrap();

  for (status, changed) in [(TaskStatus::Ok, true), (TaskStatus::Skipped, false)] {
    s.insert_result(NewTaskResult {
      task_id: task.task_id,
      host_id: host.host_id,
      status,
      changed,
      details: Some(serde_json::json!({ "item": status.as_str() })),
    })
    .await
    .unwrap();
  }

  let results = s.list_results(task.task_id).await.unwrap();
  assert_eq!(results.len(), 2);
  assert_eq!(results[0].status, TaskStatus::Ok);
  assert!(results[0].changed);
  assert_eq!(results[1].status, TaskStatus::Skipped);
  assert_eq!(
    results[1].details,
    Some(serde_json::json!({ "item": "skipped" }))
  );
}

#[tokio::test]
async fn result_for_unknown_task_is_rejected() {
  let s = store().await;
  let host = s.ensure_host("web1".into()).await.unwrap();

  let err = s
    .insert_result(NewTaskResult {
      task_id: Uuid::new_v4(),
      host_id: host.host_id,
      status:  TaskStatus::Ok,
      changed: false,
      details: None,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Database(_)));
}

// ─── Upserts ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn stats_upsert_replaces_counts() {
  let s = store().await;
  let pb = s.create_playbook("/p.yml".into()).await.unwrap();
  let host = s.ensure_host("web1".into()).await.unwrap();

  let partial = HostSummary { ok: 1, ..Default::default() };
  let full = HostSummary { ok: 3, changed: 2, failed: 1, skipped: 4, unreachable: 0 };

  s.upsert_stats(pb.playbook_id, host.host_id, partial).await.unwrap();
  s.upsert_stats(pb.playbook_id, host.host_id, full).await.unwrap();

  let stats = s.list_stats(pb.playbook_id).await.unwrap();
  assert_eq!(stats.len(), 1);
  assert_eq!(stats[0].counts, full);
  assert_eq!(stats[0].host_id, host.host_id);
}

#[tokio::test]
async fn data_upsert_keeps_one_row_with_latest_value() {
  let s = store().await;
  let pb = s.create_playbook("/p.yml".into()).await.unwrap();

  let first = s
    .upsert_data(pb.playbook_id, "k".into(), "v1".into())
    .await
    .unwrap();
  let second = s
    .upsert_data(pb.playbook_id, "k".into(), "v2".into())
    .await
    .unwrap();

  // Updated in place, not re-inserted.
  assert_eq!(first.data_id, second.data_id);

  let all = s.list_data(pb.playbook_id).await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].value, "v2");

  let one = s
    .get_data(pb.playbook_id, "k".into())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(one.value, "v2");
}

#[tokio::test]
async fn data_keys_are_scoped_per_playbook() {
  let s = store().await;
  let a = s.create_playbook("/a.yml".into()).await.unwrap();
  let b = s.create_playbook("/b.yml".into()).await.unwrap();

  s.upsert_data(a.playbook_id, "k".into(), "a".into()).await.unwrap();
  s.upsert_data(b.playbook_id, "k".into(), "b".into()).await.unwrap();

  let a_val = s.get_data(a.playbook_id, "k".into()).await.unwrap().unwrap();
  let b_val = s.get_data(b.playbook_id, "k".into()).await.unwrap().unwrap();
  assert_eq!(a_val.value, "a");
  assert_eq!(b_val.value, "b");
  assert!(s.get_data(a.playbook_id, "nope".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn concurrent_data_upserts_converge() {
  let s = Arc::new(store().await);
  let pb = s.create_playbook("/p.yml".into()).await.unwrap();

  let mut handles = Vec::new();
  for i in 0..32 {
    let s = s.clone();
    let id = pb.playbook_id;
    handles.push(tokio::spawn(async move {
      s.upsert_data(id, "shared".into(), format!("v{i}")).await
    }));
  }
  for h in handles {
    h.await.unwrap().unwrap();
  }

  let all = s.list_data(pb.playbook_id).await.unwrap();
  assert_eq!(all.len(), 1);
  assert!(all[0].value.starts_with('v'));
}

#[tokio::test]
async fn file_store_reopens_with_existing_rows() {
  let dir = std::env::temp_dir().join(format!("playlog-{}", Uuid::new_v4()));
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("runs.sqlite");

  let pb = {
    let s = SqliteStore::open_with(&path, StoreOptions::default())
      .await
      .unwrap();
    s.create_playbook("/p.yml".into()).await.unwrap()
  };

  let s = SqliteStore::open(&path).await.unwrap();
  assert!(s.get_playbook(pb.playbook_id).await.unwrap().is_some());

  std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn get_play_by_id() {
  let s = store().await;
  let pb = s.create_playbook("/p.yml".into()).await.unwrap();
  let play = s.create_play(pb.playbook_id, "deploy".into()).await.unwrap();

  let fetched = s.get_play(play.play_id).await.unwrap().unwrap();
  assert_eq!(fetched.name, "deploy");
  assert_eq!(fetched.playbook_id, pb.playbook_id);
  assert!(s.get_play(Uuid::new_v4()).await.unwrap().is_none());
}

// ─── Lock contention ─────────────────────────────────────────────────────────

/// A file store that gives up on a locked database immediately, leaving
/// contention handling to the write retries.
async fn file_store(write_retries: u32) -> (SqliteStore, std::path::PathBuf) {
  let dir = std::env::temp_dir().join(format!("playlog-{}", Uuid::new_v4()));
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("runs.sqlite");
  let options = StoreOptions {
    busy_timeout_ms: 0,
    write_retries,
    retry_backoff_ms: 20,
  };
  let s = SqliteStore::open_with(&path, options).await.unwrap();
  (s, dir)
}

/// Take the write lock from a second connection, as another process would.
fn hold_write_lock(path: &std::path::Path) -> rusqlite::Connection {
  let other = rusqlite::Connection::open(path).unwrap();
  other.execute_batch("BEGIN IMMEDIATE").unwrap();
  other
}

#[tokio::test]
async fn locked_write_is_retried_until_lock_clears() {
  let (s, dir) = file_store(5).await;
  let other = hold_write_lock(&dir.join("runs.sqlite"));

  let holder = std::thread::spawn(move || {
    std::thread::sleep(std::time::Duration::from_millis(100));
    other.execute_batch("COMMIT").unwrap();
  });

  // Backoff totals 20+40+60+80+100 ms, longer than the lock is held.
  let pb = s.create_playbook("/p.yml".into()).await.unwrap();
  holder.join().unwrap();

  assert_eq!(pb.path, "/p.yml");
  assert!(s.get_playbook(pb.playbook_id).await.unwrap().is_some());
  std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn locked_write_without_retries_surfaces_contention() {
  let (s, dir) = file_store(0).await;
  let other = hold_write_lock(&dir.join("runs.sqlite"));

  let err = s.create_playbook("/p.yml".into()).await.unwrap_err();
  assert!(err.is_contention(), "unexpected error: {err}");
  assert!(matches!(err, Error::Database(_)));

  other.execute_batch("ROLLBACK").unwrap();
  assert!(s.list_playbooks().await.unwrap().is_empty());
  std::fs::remove_dir_all(&dir).ok();
}
