// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::{CompletionPolicy, ScheduledTask, Scheduler, SchedulerStep};
use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::pipeline::RunState;

use super::{RunReport, RuntimeEvent};

/// Drives the scheduler in response to `RuntimeEvent`s and delegates task
/// execution to an `ExecutorBackend`.
///
/// The runtime is the only writer of the task-status registry in
/// [`RunState`]; it publishes statuses before dispatching, so a task always
/// sees its predecessors' final statuses.
pub struct Runtime<E: ExecutorBackend> {
    scheduler: Scheduler,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    state: Arc<RunState>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        scheduler: Scheduler,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
        state: Arc<RunState>,
    ) -> Self {
        Self {
            scheduler,
            event_rx,
            executor,
            state,
        }
    }

    /// Main event loop. Returns once every task has a terminal status.
    pub async fn run(mut self) -> Result<RunReport> {
        info!("minici runtime started");

        let step = self.scheduler.start();
        self.apply(step).await?;

        while !self.scheduler.is_finished() {
            let event = self.event_rx.recv().await.ok_or_else(|| {
                anyhow!("runtime event channel closed while tasks were still pending")
            })?;

            debug!(?event, "runtime received event");

            match event {
                RuntimeEvent::TaskCompleted { task, outcome } => {
                    let step = self.scheduler.handle_completion(&task, outcome);
                    self.apply(step).await?;
                }
            }
        }

        let report = RunReport {
            statuses: self.scheduler.statuses(),
        };
        info!(conclusion = %report.conclusion(), "runtime exiting; run finished");
        Ok(report)
    }

    async fn apply(&mut self, step: SchedulerStep) -> Result<()> {
        self.state.record_statuses(self.scheduler.statuses());

        if !step.newly_skipped.is_empty() {
            info!(skipped = ?step.newly_skipped, "tasks skipped");
        }
        if step.newly_scheduled.is_empty() {
            return Ok(());
        }

        let graph = self.scheduler.graph();
        let tasks: Vec<ScheduledTask> = step
            .newly_scheduled
            .into_iter()
            .map(|name| ScheduledTask {
                run_always: graph.policy_of(&name) == CompletionPolicy::Always,
                name,
            })
            .collect();

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        debug!(?names, "spawning ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}
