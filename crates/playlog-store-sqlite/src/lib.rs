//! SQLite backend for the playlog run recorder.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. That thread is also the single writer
//! which makes the `Stats` and `Data` upserts atomic.

mod encode;
mod schema;
mod store;

pub mod error;
pub mod options;

pub use error::{Error, Result};
pub use options::StoreOptions;
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
