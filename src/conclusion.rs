// src/conclusion.rs

//! Reduction of diagnostics or task statuses into a single verdict.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::annotate::{AnnotationBatch, AnnotationLevel};
use crate::dag::TaskStatus;
use crate::errors::MiniciError;

/// Final verdict of a completed check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conclusion {
    Success,
    Failure,
    Neutral,
}

impl Conclusion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Conclusion::Success => "success",
            Conclusion::Failure => "failure",
            Conclusion::Neutral => "neutral",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Conclusion::Success)
    }

    /// Verdict for a batch of diagnostics.
    ///
    /// Warnings produce `Failure`, same as failures. Only notices alone
    /// produce `Neutral`.
    pub fn from_batch(batch: &AnnotationBatch) -> Self {
        Self::from_levels(batch.levels())
    }

    pub fn from_levels<I>(levels: I) -> Self
    where
        I: IntoIterator<Item = AnnotationLevel>,
    {
        let mut has_failure = false;
        let mut has_warning = false;
        let mut has_notice = false;

        for level in levels {
            match level {
                AnnotationLevel::Failure => has_failure = true,
                AnnotationLevel::Warning => has_warning = true,
                AnnotationLevel::Notice => has_notice = true,
            }
        }

        if has_failure || has_warning {
            Conclusion::Failure
        } else if has_notice {
            Conclusion::Neutral
        } else {
            Conclusion::Success
        }
    }

    /// Verdict for a set of terminal task statuses: success iff all succeeded.
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = TaskStatus>,
    {
        if statuses.into_iter().all(|s| s == TaskStatus::Success) {
            Conclusion::Success
        } else {
            Conclusion::Failure
        }
    }
}

impl fmt::Display for Conclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Conclusion {
    type Err = MiniciError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "success" => Ok(Conclusion::Success),
            "failure" => Ok(Conclusion::Failure),
            "neutral" => Ok(Conclusion::Neutral),
            other => Err(MiniciError::Config(format!(
                "invalid conclusion: {other} (expected \"success\", \"failure\" or \"neutral\")"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AnnotationLevel::*;

    #[test]
    fn batch_verdicts() {
        assert_eq!(Conclusion::from_levels([]), Conclusion::Success);
        assert_eq!(Conclusion::from_levels([Notice]), Conclusion::Neutral);
        assert_eq!(Conclusion::from_levels([Notice, Warning]), Conclusion::Failure);
        assert_eq!(Conclusion::from_levels([Warning]), Conclusion::Failure);
        assert_eq!(Conclusion::from_levels([Notice, Failure]), Conclusion::Failure);
    }

    #[test]
    fn status_verdicts() {
        use TaskStatus as S;
        assert_eq!(Conclusion::from_statuses([]), Conclusion::Success);
        assert_eq!(
            Conclusion::from_statuses([S::Success, S::Success]),
            Conclusion::Success
        );
        assert_eq!(
            Conclusion::from_statuses([S::Success, S::Skipped]),
            Conclusion::Failure
        );
        assert_eq!(
            Conclusion::from_statuses([S::Failure, S::Success]),
            Conclusion::Failure
        );
    }

    #[test]
    fn parses_cli_values() {
        assert_eq!("Neutral".parse::<Conclusion>().unwrap(), Conclusion::Neutral);
        assert!("cancelled".parse::<Conclusion>().is_err());
    }
}
