// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MiniciError {
    /// Required input missing or invalid. Raised before any remote call.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Non-2xx response from the remote review system.
    #[error("Remote request to {url} failed with HTTP {status}: {body}")]
    Network {
        status: u16,
        url: String,
        body: String,
    },

    /// An analysed command exited non-zero. `stdout` holds whatever the
    /// command printed before exiting so diagnostics can still be parsed.
    #[error("Command `{command}` exited with status {code}")]
    ToolExecution {
        command: String,
        code: i32,
        stdout: Vec<u8>,
    },

    /// A parser met a severity token it does not know how to map.
    #[error("Unsupported {dialect} severity `{token}` in line: {line}")]
    UnsupportedInput {
        dialect: &'static str,
        token: String,
        line: String,
    },

    #[error("Cycle detected in task graph involving task '{0}'")]
    Cycle(String),

    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    MissingDependency { task: String, dependency: String },

    /// `conclude` was called for a check that was never started.
    #[error("Check '{0}' was never started for this commit")]
    CheckNotStarted(String),

    /// No annotation parser is registered for the given check name.
    #[error("No output parser known for check '{0}'")]
    UnknownCheck(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MiniciError {
    /// Captured stdout of a failed tool invocation, if this is one.
    pub fn partial_output(&self) -> Option<&[u8]> {
        match self {
            MiniciError::ToolExecution { stdout, .. } => Some(stdout),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, MiniciError>;
