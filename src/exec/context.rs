// src/exec/context.rs

//! Execution context contract consumed by task bodies.

use std::path::PathBuf;
use std::sync::Arc;

use crate::errors::Result;
use crate::types::BoxFuture;

/// Handle to a bundle of files captured by [`ExecutionContext::stash`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StashHandle {
    /// Content digest of the bundle.
    pub id: String,
    /// Where the bundle lives on disk.
    pub path: PathBuf,
    /// Number of files in the bundle.
    pub files: usize,
}

/// Environment a task runs its commands in.
///
/// `run` must fail with [`crate::errors::MiniciError::ToolExecution`] on a
/// non-zero exit, carrying whatever stdout had been produced.
pub trait ExecutionContext: Send + Sync {
    /// Bundle files matching `pattern` for a later `unstash`.
    fn stash<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, Result<StashHandle>>;

    /// Materialise a previously stashed bundle into this context.
    fn unstash<'a>(&'a self, handle: &'a StashHandle) -> BoxFuture<'a, Result<()>>;

    /// Run a shell command and return its stdout.
    fn run<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<Vec<u8>>>;
}

/// Creates one fresh execution context per task.
pub trait ContextFactory: Send + Sync {
    fn create(&self, task: &str) -> Result<Box<dyn ExecutionContext>>;
}

impl<F> ContextFactory for F
where
    F: Fn(&str) -> Result<Box<dyn ExecutionContext>> + Send + Sync,
{
    fn create(&self, task: &str) -> Result<Box<dyn ExecutionContext>> {
        self(task)
    }
}

pub type SharedContextFactory = Arc<dyn ContextFactory>;
