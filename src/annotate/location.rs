// src/annotate/location.rs

//! Shared `path:line` prefix parsing.

use serde::Serialize;

/// Position of a diagnostic: file path plus 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    pub path: String,
    pub line: u32,
}

impl Location {
    pub fn new(path: impl Into<String>, line: u32) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }
}

/// Split a tool-output line into its location and the remaining text.
///
/// The location is everything before the first `": "`, shaped as
/// `path:line` with an optional `:column` suffix (the column is validated
/// but dropped). Returns `None` for lines without a usable prefix; those are
/// banners, summaries or blank lines, not errors.
pub fn parse_location(line: &str) -> Option<(Location, &str)> {
    let (loc, rest) = line.split_once(": ")?;
    let (path, line_part) = loc.split_once(':')?;
    if path.is_empty() {
        return None;
    }

    let line_no = match line_part.split_once(':') {
        Some((line_no, column)) => {
            if !is_number(column) {
                return None;
            }
            line_no
        }
        None => line_part,
    };

    if !is_number(line_no) {
        return None;
    }

    // Overflowing or zero line numbers cannot be attached to a file.
    let line_no: u32 = line_no.parse().ok().filter(|n| *n > 0)?;
    Some((Location::new(path, line_no), rest))
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
