// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of spawning task bodies
//! itself. This makes it easy to swap in a fake executor in tests while
//! keeping the production implementation in [`TaskExecutor`].

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::dag::{ScheduledTask, TaskName};
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::errors::{Error, Result};
use crate::exec::context::SharedContextFactory;
use crate::exec::task_runner::run_task;
use crate::pipeline::{RunState, TaskBody, TaskContext};
use crate::types::BoxFuture;

/// Trait abstracting how scheduled tasks are executed.
///
/// Implementations must eventually emit exactly one
/// `RuntimeEvent::TaskCompleted` per dispatched task.
pub trait ExecutorBackend: Send {
    /// Dispatch the given tasks for execution. Must not wait for them.
    fn spawn_ready_tasks(&mut self, tasks: Vec<ScheduledTask>) -> BoxFuture<'_, Result<()>>;
}

/// Production executor: runs each task body on its own Tokio task with a
/// fresh execution context.
pub struct TaskExecutor {
    bodies: HashMap<TaskName, Arc<dyn TaskBody>>,
    state: Arc<RunState>,
    contexts: SharedContextFactory,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl TaskExecutor {
    pub fn new(
        bodies: HashMap<TaskName, Arc<dyn TaskBody>>,
        state: Arc<RunState>,
        contexts: SharedContextFactory,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            bodies,
            state,
            contexts,
            runtime_tx,
        }
    }
}

impl ExecutorBackend for TaskExecutor {
    fn spawn_ready_tasks(&mut self, tasks: Vec<ScheduledTask>) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            for task in tasks {
                let prepared = self
                    .bodies
                    .get(&task.name)
                    .cloned()
                    .ok_or_else(|| format!("no body registered for task '{}'", task.name))
                    .and_then(|body| {
                        self.contexts
                            .create(&task.name)
                            .map(|exec| (body, exec))
                            .map_err(|e| format!("creating execution context: {e}"))
                    });

                match prepared {
                    Ok((body, exec)) => {
                        let ctx = TaskContext::new(task.name.clone(), Arc::clone(&self.state), exec);
                        let tx = self.runtime_tx.clone();
                        debug!(task = %task.name, "dispatching task body");
                        tokio::spawn(run_task(task, body, ctx, tx));
                    }
                    Err(reason) => {
                        error!(task = %task.name, reason = %reason, "cannot start task");
                        self.runtime_tx
                            .send(RuntimeEvent::TaskCompleted {
                                task: task.name,
                                outcome: TaskOutcome::Failed(reason),
                            })
                            .await
                            .map_err(Error::from)?;
                    }
                }
            }
            Ok(())
        })
    }
}
