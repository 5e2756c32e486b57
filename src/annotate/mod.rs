// src/annotate/mod.rs

//! Tool-output annotation parsing.
//!
//! Raw output of an analysis tool is turned into an [`AnnotationBatch`]:
//! an ordered list of single-line diagnostics ready to be attached to a
//! check run.
//!
//! - [`location`] holds the shared `path:line` prefix parser.
//! - [`typecheck`] parses type-checker style lines (`path:line: error: msg`).
//! - [`lint`] parses linter style lines (`path:line: [CODE(rule)] msg`).
//! - [`input`] reads tool output from a file or stdin.
//!
//! Lines that do not match a dialect's grammar are skipped. A recognised
//! line carrying an unknown severity token is an error, never dropped.

pub mod input;
pub mod lint;
pub mod location;
pub mod typecheck;

use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

use serde::Serialize;

use crate::errors::{MiniciError, Result};

pub use location::{Location, parse_location};

/// Severity of a single diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationLevel {
    Failure,
    Warning,
    Notice,
}

impl AnnotationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationLevel::Failure => "failure",
            AnnotationLevel::Warning => "warning",
            AnnotationLevel::Notice => "notice",
        }
    }
}

impl fmt::Display for AnnotationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A severity token that a dialect has no mapping for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedLevel(pub String);

/// One positioned diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    #[serde(flatten)]
    pub location: Location,
    pub level: AnnotationLevel,
    pub message: String,
    /// Short title, e.g. the linter rule name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Parsed output of one tool run, in source-line order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationBatch {
    pub title: String,
    pub summary: String,
    pub annotations: Vec<Annotation>,
}

impl AnnotationBatch {
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            annotations: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Iterate over the severities present in the batch.
    pub fn levels(&self) -> impl Iterator<Item = AnnotationLevel> + '_ {
        self.annotations.iter().map(|a| a.level)
    }
}

/// Known tool-output dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Type-checker style: `path:line: error: message`.
    TypeCheck,
    /// Linter style: `path:line: [CODE(rule)] message`.
    Lint,
}

impl Dialect {
    /// Select the parser responsible for a named check run.
    pub fn for_check(check_name: &str) -> Option<Dialect> {
        check_name.parse().ok()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::TypeCheck => "typecheck",
            Dialect::Lint => "lint",
        }
    }

    fn empty_batch(&self) -> AnnotationBatch {
        match self {
            Dialect::TypeCheck => AnnotationBatch::new("Mypy", "Result of mypy checks"),
            Dialect::Lint => AnnotationBatch::new("Pylint", "Result of pylint checks"),
        }
    }

    /// Parse a single line. `Ok(None)` means the line is not a diagnostic.
    pub fn parse_line(&self, line: &str) -> Result<Option<Annotation>> {
        let line = line.trim_end_matches(['\r', '\n']);
        match self {
            Dialect::TypeCheck => typecheck::parse_line(line),
            Dialect::Lint => lint::parse_line(line),
        }
    }

    /// Consume a sequence of lines once and collect every diagnostic.
    pub fn parse_lines<I, S>(&self, lines: I) -> Result<AnnotationBatch>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut batch = self.empty_batch();
        for line in lines {
            if let Some(annotation) = self.parse_line(line.as_ref())? {
                batch.annotations.push(annotation);
            }
        }
        Ok(batch)
    }

    /// Like [`Dialect::parse_lines`], reading from a buffered reader.
    ///
    /// Invalid UTF-8 is replaced rather than rejected, as in
    /// [`Dialect::parse_output`].
    pub fn parse_reader<R: BufRead>(&self, mut reader: R) -> Result<AnnotationBatch> {
        let mut batch = self.empty_batch();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            if let Some(annotation) = self.parse_line(&String::from_utf8_lossy(&buf))? {
                batch.annotations.push(annotation);
            }
        }
        Ok(batch)
    }

    /// Parse raw captured command output (either line framing).
    pub fn parse_output(&self, output: &[u8]) -> Result<AnnotationBatch> {
        self.parse_lines(String::from_utf8_lossy(output).lines())
    }

    pub(crate) fn unsupported(&self, token: &str, line: &str) -> MiniciError {
        MiniciError::UnsupportedInput {
            dialect: self.name(),
            token: token.to_string(),
            line: line.to_string(),
        }
    }
}

impl FromStr for Dialect {
    type Err = MiniciError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mypy" | "typecheck" => Ok(Dialect::TypeCheck),
            "pylint" | "lint" => Ok(Dialect::Lint),
            other => Err(MiniciError::UnknownCheck(other.to_string())),
        }
    }
}
