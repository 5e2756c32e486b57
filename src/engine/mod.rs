// src/engine/mod.rs

//! Orchestration engine for minici.
//!
//! The synchronous [`crate::dag::Scheduler`] decides what runs; the async
//! [`runtime::Runtime`] shell dispatches scheduled tasks to an executor
//! backend and feeds completion events back into the scheduler until every
//! task is terminal.

use std::collections::BTreeMap;

use crate::conclusion::Conclusion;
use crate::dag::{TaskName, TaskStatus};

/// Outcome of a task body for the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// The body returned an error or panicked.
    Failed(String),
}

/// Events flowing into the runtime from the executor.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A task body finished with a concrete outcome.
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
}

/// Terminal statuses of every task once a run is over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub statuses: BTreeMap<TaskName, TaskStatus>,
}

impl RunReport {
    pub fn status_of(&self, task: &str) -> Option<TaskStatus> {
        self.statuses.get(task).copied()
    }

    /// Overall verdict: success iff every task succeeded.
    pub fn conclusion(&self) -> Conclusion {
        Conclusion::from_statuses(self.statuses.values().copied())
    }
}

pub mod runtime;

pub use runtime::Runtime;
