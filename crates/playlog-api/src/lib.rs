//! Read-only JSON API over recorded playbook runs.
//!
//! Exposes an axum [`Router`] backed by any [`playlog_core::store::RunStore`].
//! Rendering, auth and TLS are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", playlog_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod hosts;
pub mod playbooks;
pub mod tasks;

use std::sync::Arc;

use axum::{Router, routing::get};
use playlog_core::store::RunStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: RunStore + 'static,
{
  Router::new()
    // Playbooks
    .route("/playbooks", get(playbooks::list::<S>))
    .route("/playbooks/{id}", get(playbooks::get_one::<S>))
    .route("/playbooks/{id}/plays", get(playbooks::plays::<S>))
    .route("/playbooks/{id}/stats", get(playbooks::stats::<S>))
    .route("/playbooks/{id}/data", get(playbooks::data::<S>))
    .route("/playbooks/{id}/data/{key}", get(playbooks::data_one::<S>))
    // Tasks
    .route("/plays/{id}/tasks", get(tasks::list::<S>))
    .route("/tasks/{id}", get(tasks::get_one::<S>))
    .route("/tasks/{id}/results", get(tasks::results::<S>))
    // Hosts
    .route("/hosts", get(hosts::list::<S>))
    .with_state(store)
}
