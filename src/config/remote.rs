// src/config/remote.rs

//! Settings for talking to the remote review system.
//!
//! Values come from CLI flags or their environment fallbacks (`REPO`,
//! `SHA`, `TOKEN`, `APP_INSTALLATION_ID`, `APP_JWT`, `GITHUB_API_URL`).
//! Everything is checked before the first remote call.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tokio::process::Command;
use tracing::debug;

use crate::checks::{
    CheckContext, CheckRunClient, CredentialSource, DEFAULT_API_URL, GithubCheckRunApi,
    InstallationToken, PresignedAssertion, StaticToken,
};
use crate::errors::{MiniciError, Result};

#[derive(Clone, Default)]
pub struct RemoteConfig {
    pub repo: Option<String>,
    pub sha: Option<String>,
    pub token: Option<String>,
    pub installation_id: Option<String>,
    pub app_jwt: Option<String>,
    pub api_url: Option<String>,
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("repo", &self.repo)
            .field("sha", &self.sha)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("installation_id", &self.installation_id)
            .field("app_jwt", &self.app_jwt.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .finish()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl RemoteConfig {
    pub fn api_url(&self) -> &str {
        non_empty(&self.api_url).unwrap_or(DEFAULT_API_URL)
    }

    pub fn require_repo(&self) -> Result<&str> {
        non_empty(&self.repo).ok_or_else(|| {
            MiniciError::Config("repository not set (use --repo or REPO=owner/name)".into())
        })
    }

    /// The configured commit, or `HEAD` of the git checkout at `workdir`.
    pub async fn resolve_commit(&self, workdir: &Path) -> Result<String> {
        if let Some(sha) = non_empty(&self.sha) {
            return Ok(sha.to_string());
        }
        debug!(workdir = %workdir.display(), "SHA not set; asking git for HEAD");
        let output = Command::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(workdir)
            .output()
            .await
            .map_err(|e| MiniciError::Config(format!("commit not set and git unavailable: {e}")))?;
        let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() || sha.is_empty() {
            return Err(MiniciError::Config(
                "commit not set (use --sha or SHA=<commit>) and no git HEAD found".into(),
            ));
        }
        Ok(sha)
    }

    /// Pick the credential path: a direct token wins over an app
    /// installation.
    pub fn credential_source(&self, http: &reqwest::Client) -> Result<Box<dyn CredentialSource>> {
        if let Some(token) = non_empty(&self.token) {
            return Ok(Box::new(StaticToken::new(token)));
        }
        match (non_empty(&self.installation_id), non_empty(&self.app_jwt)) {
            (Some(id), Some(jwt)) => Ok(Box::new(InstallationToken::new(
                http.clone(),
                self.api_url(),
                id,
                Box::new(PresignedAssertion::new(jwt)),
            ))),
            (Some(_), None) => Err(MiniciError::Config(
                "APP_INSTALLATION_ID is set but APP_JWT is missing".into(),
            )),
            _ => Err(MiniciError::Config(
                "no credential: set TOKEN, or APP_INSTALLATION_ID with APP_JWT".into(),
            )),
        }
    }

    /// Validate every input, obtain a credential and build the client.
    pub async fn connect(&self, workdir: &Path) -> Result<CheckRunClient> {
        let repo = self.require_repo()?.to_string();
        let commit = self.resolve_commit(workdir).await?;
        let http = reqwest::Client::builder().build()?;
        let source = self.credential_source(&http)?;

        let credential = source.obtain().await?;
        let ctx = CheckContext::new(repo, commit, credential)?;
        let api = GithubCheckRunApi::new(http, self.api_url());
        Ok(CheckRunClient::new(ctx, Arc::new(api)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RemoteConfig {
        RemoteConfig {
            repo: Some("octo/app".into()),
            sha: Some("abc123".into()),
            token: Some("t0ken".into()),
            ..RemoteConfig::default()
        }
    }

    #[test]
    fn missing_repo_is_a_config_error() {
        let cfg = RemoteConfig {
            repo: Some("  ".into()),
            ..config()
        };
        assert!(matches!(cfg.require_repo(), Err(MiniciError::Config(_))));
    }

    #[tokio::test]
    async fn explicit_sha_skips_git() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(config().resolve_commit(dir.path()).await.unwrap(), "abc123");
    }

    #[tokio::test]
    async fn missing_sha_outside_a_checkout_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = RemoteConfig {
            sha: None,
            ..config()
        };
        let err = cfg.resolve_commit(dir.path()).await.unwrap_err();
        assert!(matches!(err, MiniciError::Config(_)));
    }

    #[test]
    fn credential_paths() {
        let http = reqwest::Client::new();
        assert!(config().credential_source(&http).is_ok());

        let app = RemoteConfig {
            token: None,
            installation_id: Some("42".into()),
            app_jwt: Some("jwt".into()),
            ..config()
        };
        assert!(app.credential_source(&http).is_ok());

        let half = RemoteConfig {
            app_jwt: None,
            ..app.clone()
        };
        assert!(matches!(
            half.credential_source(&http),
            Err(MiniciError::Config(_))
        ));

        let none = RemoteConfig {
            token: None,
            ..RemoteConfig::default()
        };
        assert!(none.credential_source(&http).is_err());
    }

    #[test]
    fn debug_hides_secrets() {
        let shown = format!("{:?}", config());
        assert!(!shown.contains("t0ken"));
        assert_eq!(config().api_url(), DEFAULT_API_URL);
    }
}
