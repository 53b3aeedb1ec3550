//! Handlers for tasks and their per-host results.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/plays/:id/tasks` | In start order; 404 for an unknown play |
//! | `GET`  | `/tasks/:id` | 404 if not found |
//! | `GET`  | `/tasks/:id/results` | In recording order, loop items included |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use playlog_core::{result::TaskResult, run::Task, store::RunStore};
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /plays/:id/tasks`
pub async fn list<S: RunStore>(
  State(store): State<Arc<S>>,
  Path(play_id): Path<Uuid>,
) -> Result<Json<Vec<Task>>, ApiError> {
  store
    .get_play(play_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("play {play_id}")))?;
  let tasks = store.list_tasks(play_id).await.map_err(ApiError::store)?;
  Ok(Json(tasks))
}

/// `GET /tasks/:id`
pub async fn get_one<S: RunStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
  let task = store
    .get_task(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("task {id}")))?;
  Ok(Json(task))
}

/// `GET /tasks/:id/results`
pub async fn results<S: RunStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<TaskResult>>, ApiError> {
  store
    .get_task(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("task {id}")))?;
  let results = store.list_results(id).await.map_err(ApiError::store)?;
  Ok(Json(results))
}
