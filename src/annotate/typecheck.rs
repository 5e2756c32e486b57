// src/annotate/typecheck.rs

//! Type-checker dialect: `path:line: <level>: <message>`.

use crate::annotate::{Annotation, AnnotationLevel, Dialect, UnsupportedLevel, parse_location};
use crate::errors::Result;

/// Map a type-checker level token to a severity.
///
/// Only `error` is known. Anything else is reported back to the caller
/// instead of being guessed.
pub fn level_from_token(token: &str) -> std::result::Result<AnnotationLevel, UnsupportedLevel> {
    match token {
        "error" => Ok(AnnotationLevel::Failure),
        other => Err(UnsupportedLevel(other.to_string())),
    }
}

pub(crate) fn parse_line(line: &str) -> Result<Option<Annotation>> {
    let Some((location, rest)) = parse_location(line) else {
        return Ok(None);
    };
    let Some((token, message)) = rest.split_once(": ") else {
        return Ok(None);
    };

    let level = level_from_token(token.trim())
        .map_err(|UnsupportedLevel(token)| Dialect::TypeCheck.unsupported(&token, line))?;

    Ok(Some(Annotation {
        location,
        level,
        message: message.to_string(),
        title: None,
    }))
}
