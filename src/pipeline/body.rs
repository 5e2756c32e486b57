// src/pipeline/body.rs

//! The unit of work the executor runs for each task.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::dag::TaskName;
use crate::exec::ExecutionContext;
use crate::pipeline::RunState;
use crate::pipeline::template::TemplateVars;
use crate::types::BoxFuture;

/// Everything a task body gets to work with.
pub struct TaskContext {
    pub name: TaskName,
    pub state: Arc<RunState>,
    /// Execution context owned by this task alone.
    pub exec: Box<dyn ExecutionContext>,
}

impl TaskContext {
    pub fn new(name: TaskName, state: Arc<RunState>, exec: Box<dyn ExecutionContext>) -> Self {
        Self { name, state, exec }
    }

    /// Template values as currently known to the run.
    pub fn template_vars(&self) -> TemplateVars<'_> {
        TemplateVars {
            commit: self.state.commit(),
            image: self.state.image(),
            repo: self.state.repo(),
        }
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("name", &self.name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Body of a task.
///
/// Returning an error fails only this task; the scheduler skips its
/// dependents and leaves independent branches running.
pub trait TaskBody: Send + Sync {
    fn run<'a>(&'a self, ctx: TaskContext) -> BoxFuture<'a, anyhow::Result<()>>;

    /// Name of the check run this task concludes, if any. Such checks are
    /// opened when the run starts.
    fn check_name(&self) -> Option<&str> {
        None
    }

    fn details_url(&self) -> Option<&str> {
        None
    }

    /// Whether this task reduces the statuses of the whole run. Such a
    /// task must transitively wait for every other task.
    fn concludes_run(&self) -> bool {
        false
    }
}

/// Adapter turning a closure into a [`TaskBody`].
pub struct FnTask<F> {
    f: F,
}

/// Wrap an async closure as a task body.
pub fn task_fn<F, Fut>(f: F) -> FnTask<F>
where
    F: Fn(TaskContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    FnTask { f }
}

impl<F, Fut> TaskBody for FnTask<F>
where
    F: Fn(TaskContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn run<'a>(&'a self, ctx: TaskContext) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin((self.f)(ctx))
    }
}
