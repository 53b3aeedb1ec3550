//! The run-recording engine.
//!
//! Consumes the lifecycle notifications an orchestration engine emits during a
//! playbook run and turns them into a persisted run history through any
//! [`playlog_core::store::RunStore`]:
//!
//! - [`RunContext`] tracks the currently open playbook, play and task.
//! - [`RunRecorder`] creates entities from start notifications, attributes
//!   per-host results to the task named by each result, and writes the
//!   end-of-run stats.
//! - [`RunRecorder::record`] is the key/value annotation directive.
//!
//! One recorder records one run at a time. Independent concurrent runs each
//! get their own recorder over a shared store.

mod annotation;
mod context;
mod lifecycle;
mod recorder;

pub mod error;

pub use annotation::RecordArgs;
pub use context::{RunContext, RunState, Snapshot};
pub use error::{Error, Result, Scope};
pub use lifecycle::{Isolated, LifecycleSink, RunnerResult};
pub use recorder::RunRecorder;
