// src/pipeline/state.rs

//! Per-run registry shared by every task.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use crate::checks::{CheckContext, CheckRunClient};
use crate::dag::{TaskName, TaskStatus};
use crate::errors::{MiniciError, Result};
use crate::exec::StashHandle;

/// Values produced during a run and read by later tasks.
///
/// Each produced value (source bundle, image tag) has exactly one writer;
/// a second write is rejected. Task statuses are written only by the
/// runtime.
pub struct RunState {
    commit: String,
    repo: Option<String>,
    checks: Option<Arc<CheckRunClient>>,
    source: OnceLock<StashHandle>,
    image: OnceLock<String>,
    statuses: Mutex<BTreeMap<TaskName, TaskStatus>>,
}

impl RunState {
    pub fn new(commit: impl Into<String>) -> Self {
        Self {
            commit: commit.into(),
            repo: None,
            checks: None,
            source: OnceLock::new(),
            image: OnceLock::new(),
            statuses: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = Some(repo.into());
        self
    }

    /// Report check results through `client`. Also sets the repository.
    pub fn with_checks(mut self, client: Arc<CheckRunClient>) -> Self {
        self.repo = Some(client.context().repo().to_string());
        self.checks = Some(client);
        self
    }

    pub fn commit(&self) -> &str {
        &self.commit
    }

    pub fn repo(&self) -> Option<&str> {
        self.repo.as_deref()
    }

    pub fn checks(&self) -> Option<&Arc<CheckRunClient>> {
        self.checks.as_ref()
    }

    pub fn check_context(&self) -> Option<&CheckContext> {
        self.checks.as_deref().map(CheckRunClient::context)
    }

    pub fn set_source(&self, handle: StashHandle) -> Result<()> {
        self.source
            .set(handle)
            .map_err(|_| MiniciError::Config("source bundle was already recorded".to_string()))
    }

    pub fn source(&self) -> Option<&StashHandle> {
        self.source.get()
    }

    pub fn set_image(&self, image: impl Into<String>) -> Result<()> {
        self.image
            .set(image.into())
            .map_err(|_| MiniciError::Config("image tag was already recorded".to_string()))
    }

    pub fn image(&self) -> Option<&str> {
        self.image.get().map(String::as_str)
    }

    /// Snapshot of the statuses published by the runtime.
    pub fn task_statuses(&self) -> BTreeMap<TaskName, TaskStatus> {
        self.statuses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub(crate) fn record_statuses(&self, statuses: BTreeMap<TaskName, TaskStatus>) {
        *self
            .statuses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = statuses;
    }
}

impl fmt::Debug for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunState")
            .field("commit", &self.commit)
            .field("repo", &self.repo)
            .field("reporting", &self.checks.is_some())
            .field("source", &self.source.get())
            .field("image", &self.image.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn produced_values_have_a_single_writer() {
        let state = RunState::new("abc123");
        state.set_image("minici:abc123").unwrap();
        assert!(state.set_image("other").is_err());
        assert_eq!(state.image(), Some("minici:abc123"));

        let handle = StashHandle {
            id: "d1".into(),
            path: PathBuf::from("/tmp/d1"),
            files: 2,
        };
        state.set_source(handle.clone()).unwrap();
        assert!(state.set_source(handle.clone()).is_err());
        assert_eq!(state.source(), Some(&handle));
    }

    #[test]
    fn statuses_are_replaced_wholesale() {
        let state = RunState::new("abc123");
        assert!(state.task_statuses().is_empty());

        let mut statuses = BTreeMap::new();
        statuses.insert("build".to_string(), TaskStatus::Running);
        state.record_statuses(statuses.clone());
        statuses.insert("build".to_string(), TaskStatus::Success);
        state.record_statuses(statuses);

        assert_eq!(state.task_statuses()["build"], TaskStatus::Success);
    }
}
