// src/cli.rs

//! CLI argument parsing using `clap`.

use std::fmt;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::annotate::Dialect;
use crate::annotate::input::STDIN_SENTINEL;
use crate::conclusion::Conclusion;
use crate::config::RemoteConfig;

/// Command-line arguments for `minici`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "minici",
    version,
    about = "Run CI task pipelines and report results as check runs.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MINICI_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(flatten)]
    pub remote: RemoteArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Where and as whom to report.
#[derive(Clone, Args)]
pub struct RemoteArgs {
    /// Repository as `owner/name`.
    #[arg(long, env = "REPO", global = true)]
    pub repo: Option<String>,

    /// Commit to report on. Defaults to `git rev-parse HEAD`.
    #[arg(long, env = "SHA", global = true)]
    pub sha: Option<String>,

    /// Bearer token for the check-runs API.
    #[arg(long, env = "TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// App installation to obtain a token for (with `--app-jwt`).
    #[arg(long, env = "APP_INSTALLATION_ID", global = true)]
    pub installation_id: Option<String>,

    /// Pre-signed app assertion.
    #[arg(long, env = "APP_JWT", global = true, hide_env_values = true)]
    pub app_jwt: Option<String>,

    #[arg(long, env = "GITHUB_API_URL", global = true, value_name = "URL")]
    pub api_url: Option<String>,
}

impl From<RemoteArgs> for RemoteConfig {
    fn from(args: RemoteArgs) -> Self {
        RemoteConfig {
            repo: args.repo,
            sha: args.sha,
            token: args.token,
            installation_id: args.installation_id,
            app_jwt: args.app_jwt,
            api_url: args.api_url,
        }
    }
}

impl fmt::Debug for RemoteArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&RemoteConfig::from(self.clone()), f)
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the check runs registered for the commit (JSON).
    List,

    /// Open a check run, reusing an existing one of the same name.
    Start {
        name: String,
        #[arg(long, value_name = "URL")]
        details_url: Option<String>,
    },

    /// Complete a check run with an explicit verdict or from tool output.
    Conclude {
        name: String,
        #[arg(long, conflicts_with = "from", required_unless_present = "from")]
        conclusion: Option<Conclusion>,
        /// Tool output to parse; `-` reads stdin.
        #[arg(long, value_name = "PATH")]
        from: Option<String>,
    },

    /// Parse tool output offline and print annotations plus verdict (JSON).
    Parse {
        /// `mypy`/`typecheck` or `pylint`/`lint`.
        dialect: Dialect,
        #[arg(default_value = STDIN_SENTINEL)]
        source: String,
    },

    /// Run a pipeline file.
    Run {
        #[arg(long, value_name = "PATH", default_value = "minici.toml")]
        config: PathBuf,

        /// Validate and print the plan without running anything.
        #[arg(long)]
        dry_run: bool,

        /// Run without reporting check runs.
        #[arg(long)]
        offline: bool,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
