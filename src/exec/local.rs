// src/exec/local.rs

//! Execution context running commands on the local machine.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{MiniciError, Result};
use crate::exec::context::{ContextFactory, ExecutionContext, StashHandle};
use crate::exec::stash::{self, STASH_DIR, WORK_DIR};
use crate::types::BoxFuture;

/// Runs commands through the platform shell inside `root`.
///
/// With a private work directory, `unstash` restores bundles there and
/// every later command runs in it. Stashing always reads `root`.
#[derive(Debug, Clone)]
pub struct LocalContext {
    root: PathBuf,
    stash_root: PathBuf,
    workdir: Option<PathBuf>,
    restored: OnceLock<PathBuf>,
    timeout: Option<Duration>,
}

impl LocalContext {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let stash_root = root.join(STASH_DIR);
        Self {
            root,
            stash_root,
            workdir: None,
            restored: OnceLock::new(),
            timeout: None,
        }
    }

    /// Restore bundles into `dir` instead of `root`. The directory is
    /// emptied on every unstash.
    pub fn with_workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    /// Store bundles somewhere other than `<root>/.minici/stash`.
    pub fn with_stash_root(mut self, stash_root: impl Into<PathBuf>) -> Self {
        self.stash_root = stash_root.into();
        self
    }

    /// Fail commands that run longer than `limit`.
    pub fn with_timeout(mut self, limit: Option<Duration>) -> Self {
        self.timeout = limit;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory commands run in: the restored work directory once sources
    /// were unstashed into it, `root` otherwise.
    pub fn current_dir(&self) -> &Path {
        self.restored.get().map_or(self.root.as_path(), PathBuf::as_path)
    }

    async fn run_command(&self, command: &str) -> Result<Vec<u8>> {
        let cwd = self.current_dir();
        info!(cmd = %command, cwd = ?cwd, "running command");

        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(command);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(command);
            c
        };

        cmd.current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning `{command}`"))?;

        // Always consume stderr so buffers don't fill; log at debug.
        if let Some(stderr) = child.stderr.take() {
            let label = command.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(cmd = %label, "stderr: {}", line);
                }
            });
        }

        let mut stdout = child.stdout.take();
        let collect = async {
            let mut buf = Vec::new();
            if let Some(out) = stdout.as_mut() {
                out.read_to_end(&mut buf).await?;
            }
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, buf))
        };

        let (status, output) = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, collect)
                .await
                .map_err(|_| anyhow::anyhow!("`{command}` timed out after {limit:?}"))??,
            None => collect.await?,
        };

        let code = status.code().unwrap_or(-1);
        info!(cmd = %command, exit_code = code, bytes = output.len(), "command exited");

        if status.success() {
            Ok(output)
        } else {
            Err(MiniciError::ToolExecution {
                command: command.to_string(),
                code,
                stdout: output,
            })
        }
    }
}

impl ExecutionContext for LocalContext {
    fn stash<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, Result<StashHandle>> {
        Box::pin(async move {
            let root = self.root.clone();
            let stash_root = self.stash_root.clone();
            let pattern = pattern.to_string();
            let handle = tokio::task::spawn_blocking(move || {
                stash::create_bundle(&root, &stash_root, &pattern)
            })
            .await
            .context("stash worker panicked")??;
            Ok(handle)
        })
    }

    fn unstash<'a>(&'a self, handle: &'a StashHandle) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let handle = handle.clone();
            let private = self.workdir.clone();
            let dest = private.clone().unwrap_or_else(|| self.root.clone());
            let target = dest.clone();
            tokio::task::spawn_blocking(move || {
                if private.is_some() && target.exists() {
                    fs::remove_dir_all(&target)
                        .with_context(|| format!("clearing work dir {:?}", target))?;
                }
                fs::create_dir_all(&target)
                    .with_context(|| format!("creating work dir {:?}", target))?;
                stash::copy_bundle(&handle, &target)
            })
            .await
            .context("unstash worker panicked")??;

            if self.restored.set(dest).is_err() {
                debug!(root = ?self.current_dir(), "sources restored again");
            }
            Ok(())
        })
    }

    fn run<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(self.run_command(command))
    }
}

/// Hands every task a [`LocalContext`] on the shared checkout with its own
/// work directory under `<root>/.minici/work`.
#[derive(Debug, Clone)]
pub struct LocalContextFactory {
    template: LocalContext,
}

impl LocalContextFactory {
    pub fn new(template: LocalContext) -> Self {
        Self { template }
    }
}

impl ContextFactory for LocalContextFactory {
    fn create(&self, task: &str) -> Result<Box<dyn ExecutionContext>> {
        let workdir = self.template.root.join(WORK_DIR).join(dir_name(task));
        debug!(task = %task, workdir = ?workdir, "creating local execution context");
        Ok(Box::new(
            LocalContext {
                restored: OnceLock::new(),
                ..self.template.clone()
            }
            .with_workdir(workdir),
        ))
    }
}

/// Task names are free-form; keep only path-safe characters.
fn dir_name(task: &str) -> String {
    task.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = LocalContext::new(dir.path());
        let out = ctx.run("echo hello").await.unwrap();
        assert_eq!(String::from_utf8_lossy(&out).trim(), "hello");
    }

    #[tokio::test]
    async fn failure_keeps_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = LocalContext::new(dir.path());
        let err = ctx
            .run("echo 'a.py:1: error: boom'; exit 3")
            .await
            .unwrap_err();
        match err {
            MiniciError::ToolExecution { code, stdout, .. } => {
                assert_eq!(code, 3);
                assert_eq!(String::from_utf8_lossy(&stdout).trim(), "a.py:1: error: boom");
            }
            other => panic!("expected ToolExecution, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn timeout_is_an_ordinary_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = LocalContext::new(dir.path()).with_timeout(Some(Duration::from_millis(100)));
        let err = ctx.run("sleep 5").await.unwrap_err();
        assert!(matches!(err, MiniciError::Other(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn tasks_restore_sources_into_private_dirs() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("app.py"), "x = 1\n").unwrap();
        let factory = LocalContextFactory::new(LocalContext::new(root.path()));

        let setup = factory.create("setup").unwrap();
        let handle = setup.stash("*.py").await.unwrap();

        let pylint = factory.create("pylint").unwrap();
        let mypy = factory.create("mypy").unwrap();
        pylint.unstash(&handle).await.unwrap();
        mypy.unstash(&handle).await.unwrap();

        // Each task edits only its own copy.
        pylint.run("echo changed > app.py").await.unwrap();
        let seen = mypy.run("cat app.py; pwd").await.unwrap();
        let seen = String::from_utf8_lossy(&seen);
        assert!(seen.starts_with("x = 1"), "got {seen}");
        assert!(seen.contains(".minici/work/mypy"), "got {seen}");
        assert_eq!(
            std::fs::read_to_string(root.path().join("app.py")).unwrap(),
            "x = 1\n"
        );
    }

    #[test]
    fn work_dirs_are_path_safe() {
        assert_eq!(dir_name("lint/py 3.12"), "lint_py_3_12");
        assert_eq!(dir_name("mypy"), "mypy");
    }

    #[tokio::test]
    async fn stash_then_unstash_into_another_context() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("setup.py"), "x = 1\n").unwrap();

        let origin = LocalContext::new(src.path());
        let handle = origin.stash("*").await.unwrap();

        let target = LocalContext::new(dest.path());
        target.unstash(&handle).await.unwrap();
        assert!(dest.path().join("setup.py").is_file());
    }
}
