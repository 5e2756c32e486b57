// src/dag/state_manager.rs

//! Per-run status transitions for tasks in the scheduler.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::dag::graph::TaskGraph;
use crate::dag::task_info::{Readiness, TaskName, TaskStatus};

/// Applies completion policies to pending tasks.
pub struct StateManager<'a> {
    graph: &'a TaskGraph,
    statuses: &'a mut HashMap<TaskName, TaskStatus>,
}

impl<'a> StateManager<'a> {
    pub fn new(graph: &'a TaskGraph, statuses: &'a mut HashMap<TaskName, TaskStatus>) -> Self {
        Self { graph, statuses }
    }

    /// Decide the readiness of a task from its predecessors' statuses.
    pub fn readiness_of(&self, task: &str) -> Readiness {
        let preds = self
            .graph
            .dependencies_of(task)
            .iter()
            .map(|dep| self.status(dep));
        self.graph.policy_of(task).evaluate(preds)
    }

    /// Move every pending task whose predecessors are terminal to either
    /// `Running` or `Skipped`.
    ///
    /// Tasks are visited in topological order, so a skip cascades to its
    /// dependents within the same call. Returns `(scheduled, skipped)`.
    pub fn advance(&mut self) -> (Vec<TaskName>, Vec<TaskName>) {
        let mut scheduled = Vec::new();
        let mut skipped = Vec::new();
        let graph = self.graph;

        for name in graph.tasks() {
            if self.status(name) != TaskStatus::Pending {
                continue;
            }

            match self.readiness_of(name) {
                Readiness::Wait => {}
                Readiness::Run => {
                    info!(task = %name, "predecessors terminal; scheduling task");
                    self.statuses.insert(name.to_string(), TaskStatus::Running);
                    scheduled.push(name.to_string());
                }
                Readiness::Skip => {
                    info!(task = %name, "upstream did not succeed; skipping task");
                    self.statuses.insert(name.to_string(), TaskStatus::Skipped);
                    skipped.push(name.to_string());
                }
            }
        }

        debug!(?scheduled, ?skipped, "state manager advanced");
        (scheduled, skipped)
    }

    /// Check if all tasks are in a terminal state.
    pub fn all_tasks_terminal(&self) -> bool {
        self.statuses.values().all(TaskStatus::is_terminal)
    }

    fn status(&self, task: &str) -> TaskStatus {
        self.statuses
            .get(task)
            .copied()
            .unwrap_or(TaskStatus::Pending)
    }
}
