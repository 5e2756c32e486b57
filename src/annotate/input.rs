// src/annotate/input.rs

//! Tool-output ingestion from a file path or `-` for stdin.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use anyhow::Context;

use crate::annotate::{AnnotationBatch, Dialect};
use crate::errors::Result;

/// Sentinel path meaning "read standard input".
pub const STDIN_SENTINEL: &str = "-";

/// Open a tool-output source for line-by-line reading.
pub fn open_source(source: &str) -> Result<Box<dyn BufRead>> {
    if source == STDIN_SENTINEL {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let path = Path::new(source);
    let file = File::open(path).with_context(|| format!("opening tool output {:?}", path))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Parse the tool output at `source` with the given dialect.
pub fn parse_source(dialect: Dialect, source: &str) -> Result<AnnotationBatch> {
    let reader = open_source(source)?;
    dialect.parse_reader(reader)
}
