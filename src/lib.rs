// src/lib.rs

pub mod annotate;
pub mod checks;
pub mod cli;
pub mod conclusion;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod pipeline;
pub mod types;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::annotate::input::{open_source, parse_source};
use crate::annotate::{AnnotationBatch, Dialect};
use crate::checks::CheckRunClient;
use crate::cli::{CliArgs, Command};
use crate::conclusion::Conclusion;
use crate::config::{PipelineFile, RemoteConfig, load_and_validate};
use crate::engine::RunReport;
use crate::errors::MiniciError;
use crate::exec::{LocalContext, LocalContextFactory};
use crate::pipeline::{Pipeline, RunState};

/// High-level entry point used by `main.rs`.
///
/// Returns a failing exit code when a pipeline run does not conclude
/// successfully.
pub async fn run(args: CliArgs) -> Result<ExitCode> {
    let remote = RemoteConfig::from(args.remote);
    let cwd = std::env::current_dir().context("resolving working directory")?;

    match args.command {
        Command::List => {
            let client = remote.connect(&cwd).await?;
            let runs = client.list().await?;
            println!("{}", serde_json::to_string_pretty(&runs)?);
        }
        Command::Start { name, details_url } => {
            let client = remote.connect(&cwd).await?;
            let id = client.start(&name, details_url.as_deref()).await?;
            println!("{id}");
        }
        Command::Conclude {
            name,
            conclusion,
            from,
        } => {
            let client = remote.connect(&cwd).await?;
            let conclusion = conclude(&client, &name, conclusion, from.as_deref()).await?;
            println!("{conclusion}");
        }
        Command::Parse { dialect, source } => {
            let batch = parse_source(dialect, &source)?;
            print_parse(&batch)?;
        }
        Command::Run {
            config,
            dry_run,
            offline,
        } => {
            let cfg = load_and_validate(&config)
                .with_context(|| format!("loading pipeline {}", config.display()))?;
            if dry_run {
                print_dry_run(&cfg);
                return Ok(ExitCode::SUCCESS);
            }
            let report = run_pipeline(&cfg, &config, &remote, offline).await?;
            print_report(&report);
            if !report.conclusion().is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Direct mode when a verdict is given, derived mode otherwise.
async fn conclude(
    client: &CheckRunClient,
    name: &str,
    conclusion: Option<Conclusion>,
    from: Option<&str>,
) -> Result<Conclusion> {
    match (conclusion, from) {
        (Some(conclusion), _) => {
            client.conclude(name, conclusion).await?;
            Ok(conclusion)
        }
        (None, Some(source)) => {
            let dialect =
                Dialect::for_check(name).ok_or_else(|| MiniciError::UnknownCheck(name.into()))?;
            let batch = dialect.parse_reader(open_source(source)?)?;
            Ok(client.conclude_with_batch(name, &batch).await?)
        }
        (None, None) => Err(MiniciError::Config(
            "conclude needs --conclusion or --from".to_string(),
        )
        .into()),
    }
}

#[derive(Serialize)]
struct ParseOutput<'a> {
    #[serde(flatten)]
    batch: &'a AnnotationBatch,
    conclusion: Conclusion,
}

fn print_parse(batch: &AnnotationBatch) -> Result<()> {
    let out = ParseOutput {
        batch,
        conclusion: Conclusion::from_batch(batch),
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

/// Directory commands run in: `[pipeline].workdir` relative to the
/// pipeline file, else the file's own directory.
fn workdir_for(cfg: &PipelineFile, config_path: &Path) -> PathBuf {
    let base = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    match &cfg.pipeline.workdir {
        Some(dir) if dir.is_absolute() => dir.clone(),
        Some(dir) => base.join(dir),
        None => base,
    }
}

async fn run_pipeline(
    cfg: &PipelineFile,
    config_path: &Path,
    remote: &RemoteConfig,
    offline: bool,
) -> Result<RunReport> {
    let workdir = workdir_for(cfg, config_path);
    let pipeline = Pipeline::from_config(cfg)?;

    let state = if offline {
        let commit = remote.resolve_commit(&workdir).await?;
        let state = RunState::new(commit);
        match remote.repo.clone() {
            Some(repo) => state.with_repo(repo),
            None => state,
        }
    } else {
        let client = remote.connect(&workdir).await?;
        RunState::new(client.context().commit()).with_checks(Arc::new(client))
    };
    info!(commit = %state.commit(), workdir = %workdir.display(), offline, "starting pipeline");

    let template = LocalContext::new(&workdir)
        .with_timeout(cfg.pipeline.timeout_secs.map(Duration::from_secs));
    let contexts = Arc::new(LocalContextFactory::new(template));

    Ok(pipeline.run(Arc::new(state), contexts).await?)
}

fn print_report(report: &RunReport) {
    println!("minici run finished: {}", report.conclusion());
    for (task, status) in &report.statuses {
        println!("  {task}: {status}");
    }
}

/// Print tasks in execution order without running anything.
fn print_dry_run(cfg: &PipelineFile) {
    println!("minici dry-run");
    println!("  pipeline.umbrella_check = {}", cfg.pipeline.umbrella_check);
    println!("  pipeline.image = {}", cfg.pipeline.image);
    println!();

    let graph = cfg.graph();
    println!("tasks ({}):", graph.len());
    for name in graph.tasks() {
        let Some(task) = cfg.task.get(name) else {
            continue;
        };
        println!("  - {name} ({:?})", task.kind);
        if let Some(cmd) = &task.cmd {
            println!("      cmd: {cmd}");
        }
        let deps = graph.dependencies_of(name);
        if !deps.is_empty() {
            println!("      after: {deps:?}");
        }
        if let Some(check) = task.check_name(name) {
            println!("      check: {check}");
        }
        if graph.policy_of(name) == crate::dag::CompletionPolicy::Always {
            println!("      run_always: true");
        }
    }

    debug!("dry-run complete (no execution)");
}
