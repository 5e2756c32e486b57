// src/pipeline/template.rs

//! `{placeholder}` substitution in command strings.

use regex::Regex;

use crate::errors::{MiniciError, Result};

/// Placeholders a command template may use.
pub const PLACEHOLDERS: &[&str] = &["commit", "image", "repo"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Placeholder(String),
}

/// A parsed command template such as `docker build . -t {image}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    raw: String,
    parts: Vec<Part>,
}

/// Values substituted into templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars<'a> {
    pub commit: &'a str,
    pub image: Option<&'a str>,
    pub repo: Option<&'a str>,
}

impl Template {
    /// Parse a template, rejecting unknown placeholders.
    pub fn parse(raw: &str) -> Result<Self> {
        let re = Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").map_err(anyhow::Error::from)?;
        let mut parts = Vec::new();
        let mut last = 0;

        for caps in re.captures_iter(raw) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if !PLACEHOLDERS.contains(&name.as_str()) {
                return Err(MiniciError::Config(format!(
                    "unknown placeholder {{{}}} in `{raw}` (known: {})",
                    name.as_str(),
                    PLACEHOLDERS.join(", ")
                )));
            }
            if whole.start() > last {
                parts.push(Part::Literal(raw[last..whole.start()].to_string()));
            }
            parts.push(Part::Placeholder(name.as_str().to_string()));
            last = whole.end();
        }
        if last < raw.len() {
            parts.push(Part::Literal(raw[last..].to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn uses(&self, placeholder: &str) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, Part::Placeholder(name) if name == placeholder))
    }

    /// Substitute values. Fails if the template needs a value the run has
    /// not produced yet.
    pub fn render(&self, vars: &TemplateVars<'_>) -> Result<String> {
        let mut out = String::with_capacity(self.raw.len());
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Placeholder(name) => {
                    let value = match name.as_str() {
                        "commit" => Some(vars.commit),
                        "image" => vars.image,
                        "repo" => vars.repo,
                        _ => None,
                    };
                    let value = value.ok_or_else(|| {
                        MiniciError::Config(format!(
                            "`{}` needs {{{name}}} but no value is available yet",
                            self.raw
                        ))
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_known_placeholders() {
        let t = Template::parse("docker build . -t {image} --label sha={commit}").unwrap();
        let vars = TemplateVars {
            commit: "abc",
            image: Some("minici:abc"),
            repo: None,
        };
        assert_eq!(
            t.render(&vars).unwrap(),
            "docker build . -t minici:abc --label sha=abc"
        );
        assert!(t.uses("image"));
    }

    #[test]
    fn unknown_placeholder_is_rejected() {
        let err = Template::parse("echo {branch}").unwrap_err();
        assert!(matches!(err, MiniciError::Config(ref m) if m.contains("branch")));
    }

    #[test]
    fn missing_value_is_an_error() {
        let t = Template::parse("docker run {image} mypy .").unwrap();
        let vars = TemplateVars {
            commit: "abc",
            image: None,
            repo: Some("octo/app"),
        };
        assert!(t.render(&vars).is_err());
    }

    #[test]
    fn only_identifier_braces_are_placeholders() {
        let err = Template::parse("for f in *.py; do echo ${f}; done").unwrap_err();
        assert!(matches!(err, MiniciError::Config(_)));
        let t = Template::parse("awk '{ print $1 }'").unwrap();
        assert_eq!(
            t.render(&TemplateVars::default()).unwrap(),
            "awk '{ print $1 }'"
        );
    }
}
