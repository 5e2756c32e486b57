// src/pipeline/tasks.rs

//! Built-in task bodies used by config-driven pipelines.

use anyhow::Context;
use tracing::{info, warn};

use crate::annotate::Dialect;
use crate::checks::CheckLifecycle;
use crate::conclusion::Conclusion;
use crate::dag::TaskStatus;
use crate::pipeline::template::{Template, TemplateVars};
use crate::pipeline::{TaskBody, TaskContext};
use crate::types::BoxFuture;

/// Restore the source bundle produced by setup, if there is one.
async fn unstash_source(ctx: &TaskContext) -> anyhow::Result<()> {
    match ctx.state.source() {
        Some(handle) => ctx
            .exec
            .unstash(handle)
            .await
            .with_context(|| format!("restoring sources {}", handle.id)),
        None => Ok(()),
    }
}

async fn run_rendered(ctx: &TaskContext, cmd: &Template) -> anyhow::Result<Vec<u8>> {
    let command = cmd.render(&ctx.template_vars())?;
    info!(task = %ctx.name, command = %command, "running command");
    Ok(ctx.exec.run(&command).await?)
}

/// Captures the sources, fixes the image tag and runs the build command.
///
/// The only writer of the source bundle and image tag.
#[derive(Debug, Clone)]
pub struct SetupTask {
    pub stash: String,
    pub image: Template,
    pub cmd: Option<Template>,
}

impl TaskBody for SetupTask {
    fn run<'a>(&'a self, ctx: TaskContext) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let handle = ctx
                .exec
                .stash(&self.stash)
                .await
                .with_context(|| format!("stashing sources matching `{}`", self.stash))?;
            info!(task = %ctx.name, bundle = %handle.id, files = handle.files, "sources stashed");
            ctx.state.set_source(handle)?;

            let image = self.image.render(&TemplateVars {
                commit: ctx.state.commit(),
                image: None,
                repo: ctx.state.repo(),
            })?;
            ctx.state.set_image(image)?;

            if let Some(cmd) = &self.cmd {
                run_rendered(&ctx, cmd).await?;
            }
            Ok(())
        })
    }
}

/// Runs a command against the restored sources.
#[derive(Debug, Clone)]
pub struct CommandTask {
    pub cmd: Template,
}

impl TaskBody for CommandTask {
    fn run<'a>(&'a self, ctx: TaskContext) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            unstash_source(&ctx).await?;
            run_rendered(&ctx, &self.cmd).await?;
            Ok(())
        })
    }
}

/// Runs an analysis tool and reports its diagnostics as a check run.
#[derive(Debug, Clone)]
pub struct CheckTask {
    pub check: String,
    pub dialect: Dialect,
    pub cmd: Template,
    /// Fail the task when the tool exits non-zero, after reporting.
    pub fail_on_tool_error: bool,
    pub details_url: Option<String>,
}

impl TaskBody for CheckTask {
    fn run<'a>(&'a self, ctx: TaskContext) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            if let Some(client) = ctx.state.checks() {
                if client.lifecycle(&self.check) == CheckLifecycle::Absent {
                    client.start(&self.check, self.details_url.as_deref()).await?;
                }
            }
            unstash_source(&ctx).await?;

            let (stdout, tool_error) = match run_rendered(&ctx, &self.cmd).await {
                Ok(stdout) => (stdout, None),
                Err(err) => {
                    let partial = err
                        .downcast_ref::<crate::errors::MiniciError>()
                        .and_then(|e| e.partial_output())
                        .map(<[u8]>::to_vec);
                    match partial {
                        Some(stdout) => (stdout, Some(err)),
                        None => return Err(err),
                    }
                }
            };

            let batch = self.dialect.parse_output(&stdout)?;
            let conclusion = match ctx.state.checks() {
                Some(client) => client.conclude_with_batch(&self.check, &batch).await?,
                None => {
                    let conclusion = Conclusion::from_batch(&batch);
                    info!(
                        task = %ctx.name,
                        check = %self.check,
                        annotations = batch.len(),
                        conclusion = %conclusion,
                        "check evaluated locally"
                    );
                    conclusion
                }
            };

            match tool_error {
                Some(err) if self.fail_on_tool_error => Err(err.context(format!(
                    "check `{}` concluded {conclusion}",
                    self.check
                ))),
                Some(err) => {
                    warn!(task = %ctx.name, error = %err, "ignoring tool exit status");
                    Ok(())
                }
                None => Ok(()),
            }
        })
    }

    fn check_name(&self) -> Option<&str> {
        Some(&self.check)
    }

    fn details_url(&self) -> Option<&str> {
        self.details_url.as_deref()
    }
}

/// Concludes the umbrella check from every other task's terminal status.
#[derive(Debug, Clone)]
pub struct FinalizeTask {
    pub umbrella: String,
    pub details_url: Option<String>,
}

impl TaskBody for FinalizeTask {
    fn run<'a>(&'a self, ctx: TaskContext) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let statuses = ctx.state.task_statuses();
            let others: Vec<TaskStatus> = statuses
                .iter()
                .filter(|(name, status)| **name != ctx.name && status.is_terminal())
                .map(|(_, status)| *status)
                .collect();
            let conclusion = Conclusion::from_statuses(others);

            match ctx.state.checks() {
                Some(client) => client.conclude(&self.umbrella, conclusion).await?,
                None => info!(check = %self.umbrella, conclusion = %conclusion, "overall verdict"),
            }
            Ok(())
        })
    }

    fn check_name(&self) -> Option<&str> {
        Some(&self.umbrella)
    }

    fn details_url(&self) -> Option<&str> {
        self.details_url.as_deref()
    }

    fn concludes_run(&self) -> bool {
        true
    }
}
