// src/checks/auth.rs

//! Bearer credentials for the remote review system.
//!
//! Two sources are supported: a token supplied directly by the environment,
//! or a short-lived installation token exchanged for a signed app
//! assertion. Producing the signed assertion is left to an
//! [`AssertionSigner`].

use std::fmt;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, info};

use crate::checks::github::{ACCEPT, USER_AGENT, ensure_success};
use crate::errors::Result;
use crate::types::BoxFuture;

/// How long an installation token stays valid.
pub const INSTALLATION_TOKEN_LIFETIME: Duration = Duration::from_secs(600);

/// An opaque bearer token, optionally with a validity window.
#[derive(Clone)]
pub struct Credential {
    token: String,
    obtained_at: Instant,
    valid_for: Option<Duration>,
}

impl Credential {
    /// A token with no known expiry.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            obtained_at: Instant::now(),
            valid_for: None,
        }
    }

    /// A token valid for `valid_for` from now.
    pub fn expiring(token: impl Into<String>, valid_for: Duration) -> Self {
        Self {
            valid_for: Some(valid_for),
            ..Self::new(token)
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_expired(&self) -> bool {
        self.valid_for
            .is_some_and(|window| self.obtained_at.elapsed() >= window)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("valid_for", &self.valid_for)
            .finish()
    }
}

/// Capability: obtain a bearer credential.
pub trait CredentialSource: Send + Sync {
    fn obtain(&self) -> BoxFuture<'_, Result<Credential>>;
}

/// A token taken as-is from configuration.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl CredentialSource for StaticToken {
    fn obtain(&self) -> BoxFuture<'_, Result<Credential>> {
        Box::pin(async move {
            debug!("using directly supplied token");
            Ok(Credential::new(self.0.clone()))
        })
    }
}

/// Produces the signed identity assertion for an app.
pub trait AssertionSigner: Send + Sync {
    fn sign(&self) -> Result<String>;
}

/// An assertion signed ahead of time and handed over through configuration.
#[derive(Clone)]
pub struct PresignedAssertion(String);

impl PresignedAssertion {
    pub fn new(assertion: impl Into<String>) -> Self {
        Self(assertion.into())
    }
}

impl AssertionSigner for PresignedAssertion {
    fn sign(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    token: String,
}

/// Exchanges an app assertion for an installation token.
pub struct InstallationToken {
    http: reqwest::Client,
    api_url: String,
    installation_id: String,
    signer: Box<dyn AssertionSigner>,
}

impl InstallationToken {
    pub fn new(
        http: reqwest::Client,
        api_url: &str,
        installation_id: impl Into<String>,
        signer: Box<dyn AssertionSigner>,
    ) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            installation_id: installation_id.into(),
            signer,
        }
    }
}

impl CredentialSource for InstallationToken {
    fn obtain(&self) -> BoxFuture<'_, Result<Credential>> {
        Box::pin(async move {
            let assertion = self.signer.sign()?;
            let url = format!(
                "{}/app/installations/{}/access_tokens",
                self.api_url, self.installation_id
            );
            debug!(url = %url, "exchanging app assertion for installation token");

            let response = self
                .http
                .post(&url)
                .bearer_auth(assertion)
                .header(reqwest::header::ACCEPT, ACCEPT)
                .header(reqwest::header::USER_AGENT, USER_AGENT)
                .send()
                .await?;
            let body: AccessTokenResponse = ensure_success(response).await?.json().await?;

            info!(
                installation_id = %self.installation_id,
                "obtained installation token"
            );
            Ok(Credential::expiring(body.token, INSTALLATION_TOKEN_LIFETIME))
        })
    }
}
