// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::task_info::TaskName;

/// Structured result of a single scheduler "step".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStep {
    /// Tasks that became eligible and were marked `Running`.
    pub newly_scheduled: Vec<TaskName>,
    /// Tasks that were marked `Skipped` because an upstream task did not
    /// succeed.
    pub newly_skipped: Vec<TaskName>,
    /// Whether this step left every task in a terminal status.
    pub run_just_finished: bool,
}
