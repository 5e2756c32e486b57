use std::collections::BTreeMap;

use minici::config::{PipelineFile, PipelineSection, RawPipelineFile, TaskConfig, TaskKind};
use minici::errors::Result;

/// Builder for `PipelineFile` to simplify test setup.
pub struct PipelineFileBuilder {
    config: RawPipelineFile,
}

impl PipelineFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawPipelineFile {
                pipeline: PipelineSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_umbrella_check(mut self, name: &str) -> Self {
        self.config.pipeline.umbrella_check = name.to_string();
        self
    }

    pub fn raw(self) -> RawPipelineFile {
        self.config
    }

    pub fn try_build(self) -> Result<PipelineFile> {
        PipelineFile::try_from(self.config)
    }

    pub fn build(self) -> PipelineFile {
        self.try_build()
            .expect("Failed to build valid pipeline from builder")
    }
}

impl Default for PipelineFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            task: TaskConfig {
                kind,
                cmd: None,
                after: Vec::new(),
                run_always: false,
                check: None,
                fail_on_tool_error: true,
                details_url: None,
            },
        }
    }

    pub fn command(cmd: &str) -> Self {
        Self::new(TaskKind::Command).cmd(cmd)
    }

    pub fn check(cmd: &str) -> Self {
        Self::new(TaskKind::Check).cmd(cmd)
    }

    pub fn setup(cmd: &str) -> Self {
        Self::new(TaskKind::Setup).cmd(cmd)
    }

    pub fn finalize() -> Self {
        Self::new(TaskKind::Finalize)
    }

    pub fn cmd(mut self, cmd: &str) -> Self {
        self.task.cmd = Some(cmd.to_string());
        self
    }

    pub fn after(mut self, deps: &[&str]) -> Self {
        self.task.after = deps.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn run_always(mut self) -> Self {
        self.task.run_always = true;
        self
    }

    pub fn check_name(mut self, name: &str) -> Self {
        self.task.check = Some(name.to_string());
        self
    }

    pub fn tolerate_tool_errors(mut self) -> Self {
        self.task.fail_on_tool_error = false;
        self
    }

    pub fn details_url(mut self, url: &str) -> Self {
        self.task.details_url = Some(url.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// The canonical pipeline: setup, build, lint + typecheck, finalize.
pub fn standard_pipeline() -> PipelineFileBuilder {
    PipelineFileBuilder::new()
        .with_task("setup", TaskConfigBuilder::setup("docker build . -t {image}").build())
        .with_task(
            "build",
            TaskConfigBuilder::command("docker run {image} make")
                .after(&["setup"])
                .build(),
        )
        .with_task(
            "pylint",
            TaskConfigBuilder::check("docker run {image} pylint src")
                .after(&["build"])
                .build(),
        )
        .with_task(
            "mypy",
            TaskConfigBuilder::check("docker run {image} mypy src")
                .after(&["build"])
                .build(),
        )
        .with_task("finally", TaskConfigBuilder::finalize().build())
}
