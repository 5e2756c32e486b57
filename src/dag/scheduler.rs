// src/dag/scheduler.rs

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::dag::graph::TaskGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::StateManager;
use crate::dag::task_info::{TaskName, TaskStatus};
use crate::engine::TaskOutcome;

/// Scheduler holds the immutable graph plus the mutable status of each task.
///
/// It is responsible for:
/// - deciding when a task is eligible (all predecessors terminal)
/// - applying each task's completion policy (run or skip)
/// - recording task outcomes
/// - noticing when every task is terminal
///
/// It is synchronous and performs no IO; the engine drives it.
#[derive(Debug)]
pub struct Scheduler {
    graph: TaskGraph,
    statuses: HashMap<TaskName, TaskStatus>,
    started: bool,
}

impl Scheduler {
    pub fn new(graph: TaskGraph) -> Self {
        let statuses = graph
            .tasks()
            .map(|name| (name.to_string(), TaskStatus::Pending))
            .collect();
        Self {
            graph,
            statuses,
            started: false,
        }
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Current status of the given task.
    pub fn status_of(&self, task: &str) -> Option<TaskStatus> {
        self.statuses.get(task).copied()
    }

    /// Snapshot of every task's status, ordered by name.
    pub fn statuses(&self) -> BTreeMap<TaskName, TaskStatus> {
        self.statuses
            .iter()
            .map(|(name, status)| (name.clone(), *status))
            .collect()
    }

    /// Returns `true` once every task has a terminal status.
    pub fn is_finished(&self) -> bool {
        self.statuses.values().all(TaskStatus::is_terminal)
    }

    /// Start the run: schedule every task without predecessors.
    ///
    /// Calling this more than once has no further effect.
    pub fn start(&mut self) -> SchedulerStep {
        if self.started {
            warn!("scheduler already started; ignoring");
            return SchedulerStep::default();
        }
        self.started = true;
        info!(tasks = self.graph.len(), "scheduler: starting run");
        self.advance()
    }

    /// Record the outcome of a running task and schedule whatever became
    /// eligible as a result.
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        match self.statuses.get_mut(task) {
            Some(status) if *status == TaskStatus::Running => {
                *status = match outcome {
                    TaskOutcome::Success => TaskStatus::Success,
                    TaskOutcome::Failed(_) => TaskStatus::Failure,
                };
                match &outcome {
                    TaskOutcome::Success => debug!(task = %task, "task completed successfully"),
                    TaskOutcome::Failed(reason) => warn!(
                        task = %task,
                        reason = %reason,
                        "task failed; dependents without run_always will be skipped"
                    ),
                }
            }
            Some(status) => {
                warn!(
                    task = %task,
                    status = %status,
                    "completion for task that is not running; ignoring"
                );
                return SchedulerStep::default();
            }
            None => {
                warn!(task = %task, "completion for unknown task; ignoring");
                return SchedulerStep::default();
            }
        }

        self.advance()
    }

    fn advance(&mut self) -> SchedulerStep {
        let mut manager = StateManager::new(&self.graph, &mut self.statuses);
        let (newly_scheduled, newly_skipped) = manager.advance();
        let run_just_finished = manager.all_tasks_terminal();

        if run_just_finished {
            info!("scheduler: all tasks terminal; run finished");
        }

        SchedulerStep {
            newly_scheduled,
            newly_skipped,
            run_just_finished,
        }
    }
}
