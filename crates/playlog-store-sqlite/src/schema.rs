//! SQL schema for the playlog SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS playbooks (
    playbook_id  TEXT PRIMARY KEY,
    path         TEXT NOT NULL,
    started_at   TEXT NOT NULL,
    completed_at TEXT
);

CREATE TABLE IF NOT EXISTS plays (
    play_id     TEXT PRIMARY KEY,
    playbook_id TEXT NOT NULL REFERENCES playbooks(playbook_id),
    name        TEXT NOT NULL,
    sequence    INTEGER NOT NULL,
    started_at  TEXT NOT NULL,
    UNIQUE (playbook_id, sequence)
);

CREATE TABLE IF NOT EXISTS tasks (
    task_id        TEXT PRIMARY KEY,
    play_id        TEXT NOT NULL REFERENCES plays(play_id),
    name           TEXT NOT NULL,
    action         TEXT NOT NULL,
    file           TEXT NOT NULL,
    line           INTEGER,
    sequence       INTEGER NOT NULL,
    is_conditional INTEGER NOT NULL DEFAULT 0,
    is_handler     INTEGER NOT NULL DEFAULT 0,
    started_at     TEXT NOT NULL,
    UNIQUE (play_id, sequence)
);

-- Hosts are global, not per run.
CREATE TABLE IF NOT EXISTS hosts (
    host_id TEXT PRIMARY KEY,
    name    TEXT NOT NULL,
    UNIQUE (name)
);

-- Results are strictly append-only; several rows per (task, host) are legal.
CREATE TABLE IF NOT EXISTS task_results (
    result_id   TEXT PRIMARY KEY,
    task_id     TEXT NOT NULL REFERENCES tasks(task_id),
    host_id     TEXT NOT NULL REFERENCES hosts(host_id),
    status      TEXT NOT NULL
                CHECK (status IN ('ok', 'failed', 'skipped', 'unreachable')),
    changed     INTEGER NOT NULL DEFAULT 0,
    details     TEXT,            -- raw engine payload as JSON, or NULL
    recorded_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS stats (
    playbook_id TEXT NOT NULL REFERENCES playbooks(playbook_id),
    host_id     TEXT NOT NULL REFERENCES hosts(host_id),
    ok          INTEGER NOT NULL DEFAULT 0,
    failed      INTEGER NOT NULL DEFAULT 0,
    changed     INTEGER NOT NULL DEFAULT 0,
    skipped     INTEGER NOT NULL DEFAULT 0,
    unreachable INTEGER NOT NULL DEFAULT 0,
    recorded_at TEXT NOT NULL,
    PRIMARY KEY (playbook_id, host_id)
);

CREATE TABLE IF NOT EXISTS data (
    data_id     TEXT PRIMARY KEY,
    playbook_id TEXT NOT NULL REFERENCES playbooks(playbook_id),
    key         TEXT NOT NULL,
    value       TEXT NOT NULL,
    recorded_at TEXT NOT NULL,
    UNIQUE (playbook_id, key)
);

CREATE INDEX IF NOT EXISTS playbooks_started_idx ON playbooks(started_at);
CREATE INDEX IF NOT EXISTS results_task_idx      ON task_results(task_id);
CREATE INDEX IF NOT EXISTS results_host_idx      ON task_results(host_id);

PRAGMA user_version = 1;
";
