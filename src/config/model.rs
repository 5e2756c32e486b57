// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::dag::TaskGraph;

/// Pipeline file as read from TOML, before validation.
///
/// ```toml
/// [pipeline]
/// umbrella_check = "ci"
/// image = "minici:{commit}"
///
/// [task.setup]
/// kind = "setup"
/// cmd = "docker build . -t {image}"
///
/// [task.mypy]
/// kind = "check"
/// cmd = "docker run {image} mypy ."
/// after = ["setup"]
///
/// [task.finally]
/// kind = "finalize"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPipelineFile {
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// Keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineSection {
    /// Check run concluded by the finalize task.
    #[serde(default = "default_umbrella_check")]
    pub umbrella_check: String,

    /// Glob selecting the files setup captures.
    #[serde(default = "default_stash")]
    pub stash: String,

    /// Image tag template fixed by setup.
    #[serde(default = "default_image")]
    pub image: String,

    /// Directory commands run in. Relative paths resolve against the
    /// pipeline file's directory.
    #[serde(default)]
    pub workdir: Option<PathBuf>,

    /// Per-command time limit in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_umbrella_check() -> String {
    "ci".to_string()
}

fn default_stash() -> String {
    "*".to_string()
}

fn default_image() -> String {
    "minici:{commit}".to_string()
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            umbrella_check: default_umbrella_check(),
            stash: default_stash(),
            image: default_image(),
            workdir: None,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Setup,
    #[default]
    Command,
    Check,
    Finalize,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    #[serde(default)]
    pub kind: TaskKind,

    #[serde(default)]
    pub cmd: Option<String>,

    /// Tasks that must reach a terminal status first.
    #[serde(default)]
    pub after: Vec<String>,

    #[serde(default)]
    pub run_always: bool,

    /// Check run name for `kind = "check"`. Defaults to the task name.
    #[serde(default)]
    pub check: Option<String>,

    #[serde(default = "default_fail_on_tool_error")]
    pub fail_on_tool_error: bool,

    #[serde(default)]
    pub details_url: Option<String>,
}

fn default_fail_on_tool_error() -> bool {
    true
}

impl TaskConfig {
    /// Check name reported by this task, if it reports one.
    pub fn check_name<'a>(&'a self, task_name: &'a str) -> Option<&'a str> {
        match self.kind {
            TaskKind::Check => Some(self.check.as_deref().unwrap_or(task_name)),
            _ => None,
        }
    }
}

/// Validated pipeline file.
///
/// Only obtainable through `TryFrom<RawPipelineFile>`, which guarantees an
/// acyclic graph, known placeholders and a parser for every check.
#[derive(Debug, Clone)]
pub struct PipelineFile {
    pub pipeline: PipelineSection,
    pub task: BTreeMap<String, TaskConfig>,
    graph: TaskGraph,
}

impl PipelineFile {
    pub(crate) fn new_unchecked(
        pipeline: PipelineSection,
        task: BTreeMap<String, TaskConfig>,
        graph: TaskGraph,
    ) -> Self {
        Self {
            pipeline,
            task,
            graph,
        }
    }

    /// Graph with finalize dependencies filled in.
    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }
}
