// src/dag/mod.rs

//! Task graph representation and scheduling.
//!
//! - [`graph`] validates declared tasks into an acyclic [`TaskGraph`].
//! - [`task_info`] holds task declarations, statuses and completion policies.
//! - [`state_manager`] applies completion policies to pending tasks.
//! - [`scheduler`] contains the per-run state machine that decides
//!   which tasks run, which are skipped, and when the run is over.
//! - [`scheduler_step`] defines the result type for scheduler steps.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use graph::TaskGraph;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{
    CompletionPolicy, Readiness, ScheduledTask, TaskName, TaskSpec, TaskStatus,
};
