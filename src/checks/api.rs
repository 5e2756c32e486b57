// src/checks/api.rs

//! Wire types and the transport seam for check-run calls.

use serde::{Deserialize, Serialize};

use crate::annotate::Annotation;
use crate::checks::CheckContext;
use crate::errors::Result;
use crate::types::BoxFuture;

/// The remote system accepts at most this many annotations per update.
pub const MAX_ANNOTATIONS_PER_REQUEST: usize = 50;

/// Remote identifier of a check run.
pub type CheckRunId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateCheckRun {
    pub name: String,
    pub head_sha: String,
    pub status: RemoteStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    Queued,
    InProgress,
    Completed,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRunSummary {
    pub id: CheckRunId,
    pub name: String,
    pub status: RemoteStatus,
    #[serde(default)]
    pub conclusion: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListCheckRuns {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub check_runs: Vec<CheckRunSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateCheckRun {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RemoteStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<CheckRunOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckRunOutput {
    pub title: String,
    pub summary: String,
    pub annotations: Vec<WireAnnotation>,
}

/// One annotation in the remote system's shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireAnnotation {
    pub path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub annotation_level: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl From<&Annotation> for WireAnnotation {
    fn from(a: &Annotation) -> Self {
        Self {
            path: a.location.path.clone(),
            start_line: a.location.line,
            end_line: a.location.line,
            annotation_level: a.level.as_str().to_string(),
            message: a.message.clone(),
            title: a.title.clone(),
        }
    }
}

/// Transport for check-run operations.
///
/// The production implementation talks HTTP; tests swap in an in-memory
/// fake.
pub trait CheckRunApi: Send + Sync {
    fn create(
        &self,
        ctx: &CheckContext,
        req: CreateCheckRun,
    ) -> BoxFuture<'_, Result<CheckRunSummary>>;

    /// All check runs registered against the context's commit.
    fn list(&self, ctx: &CheckContext) -> BoxFuture<'_, Result<Vec<CheckRunSummary>>>;

    fn update(
        &self,
        ctx: &CheckContext,
        id: CheckRunId,
        req: UpdateCheckRun,
    ) -> BoxFuture<'_, Result<CheckRunSummary>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::{AnnotationLevel, Location};

    #[test]
    fn update_omits_absent_fields() {
        let body = serde_json::to_value(UpdateCheckRun {
            status: Some(RemoteStatus::Completed),
            conclusion: Some("success".into()),
            output: None,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"status": "completed", "conclusion": "success"})
        );
    }

    #[test]
    fn unknown_remote_status_is_tolerated() {
        let summary: CheckRunSummary = serde_json::from_value(serde_json::json!({
            "id": 7, "name": "mypy", "status": "waiting", "conclusion": null
        }))
        .unwrap();
        assert_eq!(summary.status, RemoteStatus::Other);
    }

    #[test]
    fn annotation_spans_a_single_line() {
        let a = Annotation {
            location: Location::new("src/x.py", 5),
            level: AnnotationLevel::Warning,
            message: "foo imported but unused".into(),
            title: Some("unused-import".into()),
        };
        let wire = WireAnnotation::from(&a);
        assert_eq!((wire.start_line, wire.end_line), (5, 5));
        assert_eq!(wire.annotation_level, "warning");
    }
}
