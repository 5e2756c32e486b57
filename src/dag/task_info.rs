// src/dag/task_info.rs

//! Task declarations, completion policies and per-run status.

use std::fmt;

use serde::Serialize;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Status of a task within the single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting for predecessors to reach a terminal status.
    Pending,
    /// Dispatched to the executor.
    Running,
    Success,
    Failure,
    /// Not run because an upstream task did not succeed.
    Skipped,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Success | TaskStatus::Failure | TaskStatus::Skipped
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Success => "success",
            TaskStatus::Failure => "failure",
            TaskStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// When a task may run once its predecessors are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionPolicy {
    /// Run only if every predecessor succeeded; otherwise skip.
    #[default]
    OnSuccess,
    /// Run regardless of predecessor outcomes (finalization, reporting).
    Always,
}

/// Decision for a pending task given its predecessors' statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Some predecessor has not finished yet.
    Wait,
    Run,
    Skip,
}

impl CompletionPolicy {
    pub fn evaluate<I>(&self, predecessors: I) -> Readiness
    where
        I: IntoIterator<Item = TaskStatus>,
    {
        let mut all_succeeded = true;
        for status in predecessors {
            if !status.is_terminal() {
                return Readiness::Wait;
            }
            if status != TaskStatus::Success {
                all_succeeded = false;
            }
        }

        match self {
            CompletionPolicy::Always => Readiness::Run,
            CompletionPolicy::OnSuccess if all_succeeded => Readiness::Run,
            CompletionPolicy::OnSuccess => Readiness::Skip,
        }
    }
}

/// Declaration of a task: its name, predecessors and completion policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: TaskName,
    /// Direct predecessors, in declaration order.
    pub after: Vec<TaskName>,
    pub policy: CompletionPolicy,
}

impl TaskSpec {
    pub fn new(name: impl Into<TaskName>) -> Self {
        Self {
            name: name.into(),
            after: Vec::new(),
            policy: CompletionPolicy::OnSuccess,
        }
    }

    pub fn after(mut self, dep: impl Into<TaskName>) -> Self {
        let dep = dep.into();
        if !self.after.contains(&dep) {
            self.after.push(dep);
        }
        self
    }

    pub fn run_always(mut self) -> Self {
        self.policy = CompletionPolicy::Always;
        self
    }

    pub fn is_run_always(&self) -> bool {
        self.policy == CompletionPolicy::Always
    }
}

/// Description of a task that the scheduler wants the executor to run now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub run_always: bool,
}
