//! Handler for `GET /hosts`.

use std::sync::Arc;

use axum::{Json, extract::State};
use playlog_core::{result::Host, store::RunStore};

use crate::error::ApiError;

/// `GET /hosts`: every host ever recorded, ordered by name.
pub async fn list<S: RunStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Host>>, ApiError> {
  let hosts = store.list_hosts().await.map_err(ApiError::store)?;
  Ok(Json(hosts))
}
