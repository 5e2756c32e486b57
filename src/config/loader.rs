// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{PipelineFile, RawPipelineFile};
use crate::errors::Result;

/// Read and deserialize a pipeline file without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPipelineFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    load_from_str(&contents)
}

pub fn load_from_str(contents: &str) -> Result<RawPipelineFile> {
    Ok(toml::from_str(contents)?)
}

/// Read, deserialize and validate a pipeline file.
///
/// Fails on unknown `after` references, cycles, unknown template
/// placeholders, checks without a parser and missing or duplicate
/// setup/finalize roles.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PipelineFile> {
    PipelineFile::try_from(load_from_path(path)?)
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("minici.toml")
}
