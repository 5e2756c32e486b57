// src/exec/mod.rs

//! Execution layer.
//!
//! - [`context`] defines the `ExecutionContext` contract task bodies use to
//!   run commands and move file bundles around.
//! - [`local`] implements it on the local machine with `tokio::process`.
//! - [`stash`] builds and restores content-addressed file bundles.
//! - [`task_runner`] runs one task body and reports its outcome.
//! - [`backend`] provides the `ExecutorBackend` trait and the production
//!   `TaskExecutor`, which tests can replace with a fake implementation.

pub mod backend;
pub mod context;
pub mod local;
pub mod stash;
pub mod task_runner;

pub use backend::{ExecutorBackend, TaskExecutor};
pub use context::{ContextFactory, ExecutionContext, SharedContextFactory, StashHandle};
pub use local::{LocalContext, LocalContextFactory};
