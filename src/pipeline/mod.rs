// src/pipeline/mod.rs

//! Pipelines: a validated task graph plus one body per task.
//!
//! A [`Pipeline`] is assembled either in code through [`PipelineBuilder`]
//! or from a pipeline file (see [`crate::config`]). Running it opens every
//! check the pipeline reports, drives the engine until all tasks are
//! terminal and returns the [`RunReport`].

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::annotate::Dialect;
use crate::config::{PipelineFile, TaskKind};
use crate::dag::{Scheduler, TaskGraph, TaskName, TaskSpec};
use crate::engine::{RunReport, Runtime, RuntimeEvent};
use crate::errors::{MiniciError, Result};
use crate::exec::{ExecutorBackend, SharedContextFactory, TaskExecutor};

pub mod body;
pub mod state;
pub mod tasks;
pub mod template;

pub use body::{FnTask, TaskBody, TaskContext, task_fn};
pub use state::RunState;
pub use tasks::{CheckTask, CommandTask, FinalizeTask, SetupTask};
pub use template::{Template, TemplateVars};

const EVENT_CHANNEL_CAPACITY: usize = 64;

pub struct Pipeline {
    graph: TaskGraph,
    bodies: HashMap<TaskName, Arc<dyn TaskBody>>,
}

#[derive(Default)]
pub struct PipelineBuilder {
    tasks: Vec<(TaskSpec, Arc<dyn TaskBody>)>,
}

impl PipelineBuilder {
    pub fn task(self, spec: TaskSpec, body: impl TaskBody + 'static) -> Self {
        self.task_arc(spec, Arc::new(body))
    }

    pub fn task_arc(mut self, spec: TaskSpec, body: Arc<dyn TaskBody>) -> Self {
        self.tasks.push((spec, body));
        self
    }

    /// Validate the graph. Two tasks reporting the same check are rejected.
    pub fn build(self) -> Result<Pipeline> {
        let mut bodies: HashMap<TaskName, Arc<dyn TaskBody>> =
            HashMap::with_capacity(self.tasks.len());
        let mut checks: HashMap<String, TaskName> = HashMap::new();
        let mut specs = Vec::with_capacity(self.tasks.len());

        for (spec, body) in self.tasks {
            if let Some(check) = body.check_name() {
                if let Some(owner) = checks.insert(check.to_string(), spec.name.clone()) {
                    return Err(MiniciError::Config(format!(
                        "check '{check}' is reported by both '{owner}' and '{}'",
                        spec.name
                    )));
                }
            }
            bodies.insert(spec.name.clone(), body);
            specs.push(spec);
        }

        let graph = TaskGraph::build(specs)?;
        for (name, body) in &bodies {
            if body.concludes_run() {
                ensure_awaits_everything(&graph, name)?;
            }
        }
        Ok(Pipeline { graph, bodies })
    }
}

/// A run-concluding task started before a sibling finished would report a
/// verdict that misses it.
pub(crate) fn ensure_awaits_everything(graph: &TaskGraph, name: &str) -> Result<()> {
    let missing = graph.not_awaited_by(name);
    if missing.is_empty() {
        return Ok(());
    }
    Err(MiniciError::Config(format!(
        "task '{name}' concludes the run but does not wait for: {}",
        missing.join(", ")
    )))
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Bodies for a validated pipeline file.
    pub fn from_config(cfg: &PipelineFile) -> Result<Self> {
        let mut builder = Pipeline::builder();
        for name in cfg.graph().tasks() {
            let (Some(spec), Some(task)) = (cfg.graph().spec(name), cfg.task.get(name)) else {
                continue;
            };
            let cmd = task.cmd.as_deref().map(Template::parse).transpose()?;
            let body: Arc<dyn TaskBody> = match (task.kind, cmd) {
                (TaskKind::Setup, cmd) => Arc::new(SetupTask {
                    stash: cfg.pipeline.stash.clone(),
                    image: Template::parse(&cfg.pipeline.image)?,
                    cmd,
                }),
                (TaskKind::Command, Some(cmd)) => Arc::new(CommandTask { cmd }),
                (TaskKind::Check, Some(cmd)) => {
                    let check = task.check_name(name).unwrap_or(name).to_string();
                    let dialect = Dialect::for_check(&check)
                        .ok_or_else(|| MiniciError::UnknownCheck(check.clone()))?;
                    Arc::new(CheckTask {
                        check,
                        dialect,
                        cmd,
                        fail_on_tool_error: task.fail_on_tool_error,
                        details_url: task.details_url.clone(),
                    })
                }
                (TaskKind::Finalize, _) => Arc::new(FinalizeTask {
                    umbrella: cfg.pipeline.umbrella_check.clone(),
                    details_url: task.details_url.clone(),
                }),
                (kind, None) => {
                    return Err(MiniciError::Config(format!(
                        "task '{name}' of kind {kind:?} needs a `cmd`"
                    )));
                }
            };
            builder = builder.task_arc(spec.clone(), body);
        }
        builder.build()
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Checks reported by this pipeline, in topological order, with their
    /// details URL.
    pub fn checks(&self) -> Vec<(&str, Option<&str>)> {
        self.graph
            .tasks()
            .filter_map(|task| self.bodies.get(task))
            .filter_map(|body| body.check_name().map(|name| (name, body.details_url())))
            .collect()
    }

    /// Run every task with fresh contexts from `contexts`.
    pub async fn run(
        &self,
        state: Arc<RunState>,
        contexts: SharedContextFactory,
    ) -> Result<RunReport> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let executor = TaskExecutor::new(self.bodies.clone(), Arc::clone(&state), contexts, tx);
        self.run_with(state, executor, rx).await
    }

    /// Run with a caller-supplied executor backend.
    pub async fn run_with<E: ExecutorBackend>(
        &self,
        state: Arc<RunState>,
        executor: E,
        event_rx: mpsc::Receiver<RuntimeEvent>,
    ) -> Result<RunReport> {
        self.open_checks(&state).await;

        let scheduler = Scheduler::new(self.graph.clone());
        let report = Runtime::new(scheduler, event_rx, executor, Arc::clone(&state))
            .run()
            .await?;

        if let Some(client) = state.checks() {
            let left_open = client.unconcluded();
            if !left_open.is_empty() {
                warn!(checks = ?left_open, "check runs left in progress at end of run");
            }
        }
        Ok(report)
    }

    /// Open every reported check so reviewers see them queued up front.
    /// Failures are logged; the owning task retries when it starts.
    async fn open_checks(&self, state: &RunState) {
        let Some(client) = state.checks() else {
            return;
        };
        for (check, details_url) in self.checks() {
            match client.start(check, details_url).await {
                Ok(id) => info!(check = %check, check_run_id = id, "check opened"),
                Err(err) => warn!(check = %check, error = %err, "could not open check"),
            }
        }
    }
}
