// src/config/validate.rs

use std::collections::BTreeSet;

use crate::annotate::Dialect;
use crate::config::model::{PipelineFile, RawPipelineFile, TaskConfig, TaskKind};
use crate::dag::{TaskGraph, TaskSpec};
use crate::errors::{MiniciError, Result};
use crate::pipeline::{Template, ensure_awaits_everything};

impl TryFrom<RawPipelineFile> for PipelineFile {
    type Error = MiniciError;

    fn try_from(raw: RawPipelineFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let graph = TaskGraph::build(task_specs(&raw))?;
        for (name, task) in &raw.task {
            if task.kind == TaskKind::Finalize {
                ensure_awaits_everything(&graph, name)?;
            }
        }
        Ok(PipelineFile::new_unchecked(raw.pipeline, raw.task, graph))
    }
}

fn validate_raw_config(cfg: &RawPipelineFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_pipeline_section(cfg)?;
    for (name, task) in &cfg.task {
        validate_task(cfg, name, task)?;
    }
    validate_roles(cfg)?;
    Ok(())
}

fn config_err(msg: impl Into<String>) -> MiniciError {
    MiniciError::Config(msg.into())
}

fn ensure_has_tasks(cfg: &RawPipelineFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(config_err(
            "pipeline must contain at least one [task.<name>] section",
        ));
    }
    Ok(())
}

fn validate_pipeline_section(cfg: &RawPipelineFile) -> Result<()> {
    let section = &cfg.pipeline;
    if section.umbrella_check.trim().is_empty() {
        return Err(config_err("[pipeline].umbrella_check must not be empty"));
    }
    if section.stash.trim().is_empty() {
        return Err(config_err("[pipeline].stash must not be empty"));
    }
    if section.timeout_secs == Some(0) {
        return Err(config_err("[pipeline].timeout_secs must be >= 1 (got 0)"));
    }
    let image = Template::parse(&section.image)?;
    if image.uses("image") {
        return Err(config_err("[pipeline].image cannot refer to {image}"));
    }
    Ok(())
}

fn validate_task(cfg: &RawPipelineFile, name: &str, task: &TaskConfig) -> Result<()> {
    if task.after.iter().any(|dep| dep == name) {
        return Err(config_err(format!(
            "task '{name}' cannot depend on itself in `after`"
        )));
    }
    if task.check.is_some() && task.kind != TaskKind::Check {
        return Err(config_err(format!(
            "task '{name}' sets `check` but is not of kind \"check\""
        )));
    }

    match (task.kind, &task.cmd) {
        (TaskKind::Command | TaskKind::Check, None) => {
            return Err(config_err(format!("task '{name}' needs a `cmd`")));
        }
        (TaskKind::Finalize, Some(_)) => {
            return Err(config_err(format!(
                "finalize task '{name}' cannot have a `cmd`"
            )));
        }
        _ => {}
    }

    if let Some(cmd) = &task.cmd {
        let template = Template::parse(cmd)?;
        let has_setup = cfg.task.values().any(|t| t.kind == TaskKind::Setup);
        if template.uses("image") && !has_setup {
            return Err(config_err(format!(
                "task '{name}' uses {{image}} but no setup task produces one"
            )));
        }
    }

    if let Some(check) = task.check_name(name) {
        if Dialect::for_check(check).is_none() {
            return Err(MiniciError::UnknownCheck(check.to_string()));
        }
        if check == cfg.pipeline.umbrella_check {
            return Err(config_err(format!(
                "check '{check}' of task '{name}' clashes with the umbrella check"
            )));
        }
    }
    Ok(())
}

fn validate_roles(cfg: &RawPipelineFile) -> Result<()> {
    let of_kind = |kind: TaskKind| {
        cfg.task
            .iter()
            .filter(move |(_, t)| t.kind == kind)
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
    };

    let setups = of_kind(TaskKind::Setup);
    if setups.len() > 1 {
        return Err(config_err(format!(
            "only one setup task is allowed (found {})",
            setups.join(", ")
        )));
    }

    let finalizers = of_kind(TaskKind::Finalize);
    let checks = of_kind(TaskKind::Check);
    if finalizers.len() > 1 {
        return Err(config_err(format!(
            "only one finalize task is allowed (found {})",
            finalizers.join(", ")
        )));
    }
    if !checks.is_empty() && finalizers.is_empty() {
        return Err(config_err(
            "pipelines with check tasks need exactly one finalize task",
        ));
    }

    let mut seen = BTreeSet::new();
    for (name, task) in &cfg.task {
        if let Some(check) = task.check_name(name) {
            if !seen.insert(check) {
                return Err(config_err(format!(
                    "check '{check}' is reported by more than one task"
                )));
            }
        }
    }
    Ok(())
}

/// Task declarations for the graph. A finalize task with no explicit
/// `after` waits for every other task and always runs.
pub(crate) fn task_specs(cfg: &RawPipelineFile) -> Vec<TaskSpec> {
    cfg.task
        .iter()
        .map(|(name, task)| {
            let mut spec = TaskSpec::new(name.as_str());
            let deps: Vec<&str> = if task.kind == TaskKind::Finalize && task.after.is_empty() {
                cfg.task
                    .keys()
                    .filter(|other| *other != name)
                    .map(String::as_str)
                    .collect()
            } else {
                task.after.iter().map(String::as_str).collect()
            };
            for dep in deps {
                spec = spec.after(dep);
            }
            if task.run_always || task.kind == TaskKind::Finalize {
                spec = spec.run_always();
            }
            spec
        })
        .collect()
}
