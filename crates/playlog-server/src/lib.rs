//! HTTP front for a recorded run history: configuration and router assembly
//! for the `playlog-server` binary.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use playlog_store_sqlite::{SqliteStore, StoreOptions};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

/// Prefix of the environment variables that override the config file,
/// e.g. `PLAYLOG_PORT=9000` or `PLAYLOG_STORE__WRITE_RETRIES=10`.
pub const ENV_PREFIX: &str = "PLAYLOG";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `playlog.toml`.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  /// SQLite database file. A leading `~/` is expanded.
  pub store_path: PathBuf,
  pub store:      StoreOptions,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_owned(),
      port:       8080,
      store_path: PathBuf::from("~/.local/share/playlog/playlog.db"),
      store:      StoreOptions::default(),
    }
  }
}

impl ServerConfig {
  /// Read `path` if it exists, then apply `PLAYLOG_*` environment overrides.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    Self::load_with(path, environment())
  }

  pub(crate) fn load_with(
    path: &Path,
    env: config::Environment,
  ) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(env)
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// The `PLAYLOG_*` override source; `__` separates nested keys.
pub(crate) fn environment() -> config::Environment {
  config::Environment::with_prefix(ENV_PREFIX)
    .prefix_separator("_")
    .separator("__")
    .try_parsing(true)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The read API mounted under `/api`, with request tracing.
pub fn app(store: Arc<SqliteStore>) -> Router {
  Router::new()
    .nest("/api", playlog_api::api_router(store))
    .layer(TraceLayer::new_for_http())
}
