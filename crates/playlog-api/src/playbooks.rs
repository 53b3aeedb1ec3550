//! Handlers for `/playbooks` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/playbooks` | Newest run first |
//! | `GET`  | `/playbooks/:id` | 404 if not found |
//! | `GET`  | `/playbooks/:id/plays` | In start order |
//! | `GET`  | `/playbooks/:id/stats` | One entry per host |
//! | `GET`  | `/playbooks/:id/data` | Annotations, by key |
//! | `GET`  | `/playbooks/:id/data/:key` | 404 if the key was never recorded |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use playlog_core::{
  annotation::Data,
  result::Stats,
  run::{Play, Playbook},
  store::RunStore,
};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Runs ─────────────────────────────────────────────────────────────────────

/// `GET /playbooks`
pub async fn list<S: RunStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Playbook>>, ApiError> {
  let playbooks = store.list_playbooks().await.map_err(ApiError::store)?;
  Ok(Json(playbooks))
}

/// `GET /playbooks/:id`
pub async fn get_one<S: RunStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Playbook>, ApiError> {
  find(&*store, id).await.map(Json)
}

/// `GET /playbooks/:id/plays`
pub async fn plays<S: RunStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Play>>, ApiError> {
  find(&*store, id).await?;
  let plays = store.list_plays(id).await.map_err(ApiError::store)?;
  Ok(Json(plays))
}

/// `GET /playbooks/:id/stats`
pub async fn stats<S: RunStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Stats>>, ApiError> {
  find(&*store, id).await?;
  let stats = store.list_stats(id).await.map_err(ApiError::store)?;
  Ok(Json(stats))
}

// ─── Annotations ──────────────────────────────────────────────────────────────

/// `GET /playbooks/:id/data`
pub async fn data<S: RunStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Data>>, ApiError> {
  find(&*store, id).await?;
  let data = store.list_data(id).await.map_err(ApiError::store)?;
  Ok(Json(data))
}

/// `GET /playbooks/:id/data/:key`
pub async fn data_one<S: RunStore>(
  State(store): State<Arc<S>>,
  Path((id, key)): Path<(Uuid, String)>,
) -> Result<Json<Data>, ApiError> {
  let data = store
    .get_data(id, key.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("data {key:?} in playbook {id}")))?;
  Ok(Json(data))
}

async fn find<S: RunStore>(store: &S, id: Uuid) -> Result<Playbook, ApiError> {
  store
    .get_playbook(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("playbook {id}")))
}
