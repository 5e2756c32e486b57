// src/exec/task_runner.rs

//! Individual task body runner.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::pipeline::{TaskBody, TaskContext};

/// Run a single task body and report its outcome to the runtime.
///
/// The body runs on its own Tokio task so that a panic fails only this task:
/// an error or panic becomes `TaskOutcome::Failed`, never a runtime abort.
pub async fn run_task(
    task: ScheduledTask,
    body: Arc<dyn TaskBody>,
    ctx: TaskContext,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    info!(task = %task.name, run_always = task.run_always, "starting task");

    let handle = tokio::spawn(async move { body.run(ctx).await });

    let outcome = match handle.await {
        Ok(Ok(())) => {
            info!(task = %task.name, "task succeeded");
            TaskOutcome::Success
        }
        Ok(Err(err)) => {
            error!(task = %task.name, error = %format!("{err:#}"), "task failed");
            TaskOutcome::Failed(format!("{err:#}"))
        }
        Err(join_err) => {
            error!(task = %task.name, error = %join_err, "task body panicked");
            TaskOutcome::Failed(format!("task body panicked: {join_err}"))
        }
    };

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.name.clone(),
            outcome,
        })
        .await
        .is_err()
    {
        error!(task = %task.name, "runtime gone; dropping task completion");
    }
}
