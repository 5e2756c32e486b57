// src/checks/context.rs

use std::fmt;

use crate::checks::auth::Credential;
use crate::errors::{MiniciError, Result};

/// Identity of the commit being checked plus the credential to report with.
///
/// Created once per run and read-only afterwards.
#[derive(Clone)]
pub struct CheckContext {
    repo: String,
    commit: String,
    credential: Credential,
}

impl CheckContext {
    /// Build a context, rejecting empty identifiers.
    pub fn new(
        repo: impl Into<String>,
        commit: impl Into<String>,
        credential: Credential,
    ) -> Result<Self> {
        let repo = repo.into();
        let commit = commit.into();
        if repo.trim().is_empty() {
            return Err(MiniciError::Config("repository identifier is empty".into()));
        }
        if commit.trim().is_empty() {
            return Err(MiniciError::Config("commit identifier is empty".into()));
        }
        Ok(Self {
            repo,
            commit,
            credential,
        })
    }

    /// Repository as `owner/name`.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn commit(&self) -> &str {
        &self.commit
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }
}

impl fmt::Debug for CheckContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckContext")
            .field("repo", &self.repo)
            .field("commit", &self.commit)
            .field("credential", &self.credential)
            .finish()
    }
}
