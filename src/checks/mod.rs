// src/checks/mod.rs

//! Check-run reporting against the remote review system.

pub mod api;
pub mod auth;
pub mod client;
pub mod context;
pub mod github;

pub use api::{CheckRunApi, CheckRunId, CheckRunSummary, RemoteStatus};
pub use auth::{
    AssertionSigner, Credential, CredentialSource, InstallationToken, PresignedAssertion,
    StaticToken,
};
pub use client::{CheckLifecycle, CheckRunClient};
pub use context::CheckContext;
pub use github::{DEFAULT_API_URL, GithubCheckRunApi};
