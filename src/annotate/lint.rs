// src/annotate/lint.rs

//! Linter dialect.
//!
//! The message id and rule name follow the location either bracketed,
//! `path:line: [W0611(unused-import)] message`, or bare,
//! `path:line:col: W0611 (unused-import) message`.

use crate::annotate::{Annotation, AnnotationLevel, Dialect, UnsupportedLevel, parse_location};
use crate::errors::Result;

/// Map the first character of a message id to a severity.
pub fn level_from_code(code: &str) -> std::result::Result<AnnotationLevel, UnsupportedLevel> {
    match code.chars().next() {
        Some('E') | Some('F') => Ok(AnnotationLevel::Failure),
        Some('W') => Ok(AnnotationLevel::Warning),
        Some('R') | Some('C') => Ok(AnnotationLevel::Notice),
        _ => Err(UnsupportedLevel(code.to_string())),
    }
}

/// Message id, rule name and message text of a linter diagnostic.
#[derive(Debug, PartialEq, Eq)]
struct MessageSpec<'a> {
    code: &'a str,
    rule: &'a str,
    message: &'a str,
}

/// Split `CODE(rule)` into its parts.
fn split_code_and_rule(spec: &str) -> Option<(&str, &str)> {
    let (code, tail) = spec.split_once('(')?;
    let (rule, _) = tail.split_once(')')?;
    let code = code.trim();
    let rule = rule.trim();
    if code.is_empty() || code.contains(char::is_whitespace) || rule.is_empty() {
        return None;
    }
    Some((code, rule))
}

fn split_bracketed(rest: &str) -> Option<MessageSpec<'_>> {
    let (_, after_open) = rest.split_once('[')?;
    let (spec, message) = after_open.split_once(']')?;
    let (code, rule) = split_code_and_rule(spec)?;
    Some(MessageSpec {
        code,
        rule,
        message: message.trim(),
    })
}

/// Without brackets only a real message id (`W0611`) marks a diagnostic, so
/// prose that happens to contain parentheses is not mistaken for one.
fn looks_like_message_id(code: &str) -> bool {
    let mut chars = code.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && !chars.as_str().is_empty()
        && chars.all(|c| c.is_ascii_digit())
}

fn split_bare(rest: &str) -> Option<MessageSpec<'_>> {
    let close = rest.find(')')?;
    let (code, rule) = split_code_and_rule(&rest[..=close])?;
    if !looks_like_message_id(code) {
        return None;
    }
    Some(MessageSpec {
        code,
        rule,
        message: rest[close + 1..].trim(),
    })
}

pub(crate) fn parse_line(line: &str) -> Result<Option<Annotation>> {
    let Some((location, rest)) = parse_location(line) else {
        return Ok(None);
    };

    // Brackets in the message text do not select the bracketed form.
    let spec = if rest.trim_start().starts_with('[') {
        split_bracketed(rest)
    } else {
        split_bare(rest)
    };
    let Some(spec) = spec else {
        return Ok(None);
    };

    let level = level_from_code(spec.code)
        .map_err(|UnsupportedLevel(token)| Dialect::Lint.unsupported(&token, line))?;

    Ok(Some(Annotation {
        location,
        level,
        message: spec.message.to_string(),
        title: Some(spec.rule.to_string()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::Location;
    use crate::errors::MiniciError;

    #[test]
    fn bracketed_form() {
        let annotation = parse_line("src/app.py:7: [E1101(no-member)] Module has no member")
            .unwrap()
            .unwrap();
        assert_eq!(annotation.location, Location::new("src/app.py", 7));
        assert_eq!(annotation.level, AnnotationLevel::Failure);
        assert_eq!(annotation.title.as_deref(), Some("no-member"));
        assert_eq!(annotation.message, "Module has no member");
    }

    #[test]
    fn bare_form_with_column() {
        let annotation = parse_line("src/x.py:5:1: W0611 (unused-import) foo imported but unused")
            .unwrap()
            .unwrap();
        assert_eq!(annotation.location, Location::new("src/x.py", 5));
        assert_eq!(annotation.level, AnnotationLevel::Warning);
        assert_eq!(annotation.title.as_deref(), Some("unused-import"));
        assert_eq!(annotation.message, "foo imported but unused");
    }

    #[test]
    fn brackets_inside_a_bare_message() {
        let annotation = parse_line(
            "src/app.py:3:0: W0102 (dangerous-default-value) Dangerous default value [] as argument",
        )
        .unwrap()
        .unwrap();
        assert_eq!(annotation.level, AnnotationLevel::Warning);
        assert_eq!(annotation.title.as_deref(), Some("dangerous-default-value"));
        assert_eq!(annotation.message, "Dangerous default value [] as argument");

        let annotation = parse_line("src/app.py:4: [W0102(dangerous-default-value), f] Default [] used")
            .unwrap()
            .unwrap();
        assert_eq!(annotation.message, "Default [] used");
    }

    #[test]
    fn severity_mapping() {
        let cases = [
            ("E0001", AnnotationLevel::Failure),
            ("F0002", AnnotationLevel::Failure),
            ("W0611", AnnotationLevel::Warning),
            ("R0913", AnnotationLevel::Notice),
            ("C0114", AnnotationLevel::Notice),
        ];
        for (code, expected) in cases {
            assert_eq!(level_from_code(code), Ok(expected), "code {code}");
        }
        assert_eq!(level_from_code("I0021"), Err(UnsupportedLevel("I0021".into())));
    }

    #[test]
    fn unmapped_code_is_an_error() {
        let err = parse_line("src/app.py:1: [I0021(useless-suppression)] meh").unwrap_err();
        assert!(matches!(
            err,
            MiniciError::UnsupportedInput { dialect: "lint", ref token, .. } if token == "I0021"
        ));
    }

    #[test]
    fn lines_without_message_id_are_skipped() {
        for line in [
            "************* Module app",
            "Your code has been rated at 9.50/10",
            "src/app.py:1: just prose",
            "src/app.py:1: something (in parens) else",
            "src/app.py:1: [unterminated(rule) text",
            "src/app.py:1: [W0611] missing rule name",
        ] {
            assert!(parse_line(line).unwrap().is_none(), "expected skip for {line:?}");
        }
    }
}
