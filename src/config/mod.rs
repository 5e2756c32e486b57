// src/config/mod.rs

//! Configuration for minici.
//!
//! - `model.rs`: the TOML-backed pipeline file.
//! - `loader.rs`: reading a pipeline file from disk.
//! - `validate.rs`: graph, placeholder and role checks.
//! - `remote.rs`: repository, commit and credential inputs.

pub mod loader;
pub mod model;
pub mod remote;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_from_str};
pub use model::{PipelineFile, PipelineSection, RawPipelineFile, TaskConfig, TaskKind};
pub use remote::RemoteConfig;
