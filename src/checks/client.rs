// src/checks/client.rs

//! Local view of the check runs for one commit.
//!
//! The client is the only writer to remote check-run resources during a
//! run. It opens checks idempotently (always consulting the remote listing
//! first) and completes them either with an explicit verdict or with the
//! verdict derived from parsed tool output.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::annotate::{AnnotationBatch, Dialect};
use crate::checks::CheckContext;
use crate::checks::api::{
    CheckRunApi, CheckRunId, CheckRunOutput, CheckRunSummary, CreateCheckRun,
    MAX_ANNOTATIONS_PER_REQUEST, RemoteStatus, UpdateCheckRun, WireAnnotation,
};
use crate::conclusion::Conclusion;
use crate::errors::{MiniciError, Result};

/// Where a named check stands, as far as this process knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckLifecycle {
    Absent,
    InProgress,
    /// `None` when the remote reported a verdict outside [`Conclusion`].
    Completed(Option<Conclusion>),
}

#[derive(Debug, Clone, Copy)]
struct LocalCheck {
    id: CheckRunId,
    lifecycle: CheckLifecycle,
}

impl LocalCheck {
    fn from_remote(run: &CheckRunSummary) -> Self {
        let lifecycle = match run.status {
            RemoteStatus::Completed => CheckLifecycle::Completed(
                run.conclusion.as_deref().and_then(|c| c.parse().ok()),
            ),
            _ => CheckLifecycle::InProgress,
        };
        Self {
            id: run.id,
            lifecycle,
        }
    }
}

pub struct CheckRunClient {
    ctx: CheckContext,
    api: Arc<dyn CheckRunApi>,
    runs: Mutex<HashMap<String, LocalCheck>>,
}

impl CheckRunClient {
    pub fn new(ctx: CheckContext, api: Arc<dyn CheckRunApi>) -> Self {
        Self {
            ctx,
            api,
            runs: Mutex::new(HashMap::new()),
        }
    }

    pub fn context(&self) -> &CheckContext {
        &self.ctx
    }

    /// Every check run the remote holds for this commit.
    pub async fn list(&self) -> Result<Vec<CheckRunSummary>> {
        self.api.list(&self.ctx).await
    }

    /// Open `name`, reusing an existing check run for this commit if there
    /// is one. Never creates a duplicate.
    pub async fn start(&self, name: &str, details_url: Option<&str>) -> Result<CheckRunId> {
        let existing = self.api.list(&self.ctx).await?;

        let local = match first_match(name, &existing) {
            Some(run) => {
                info!(check = %name, check_run_id = run.id, "reusing existing check run");
                LocalCheck::from_remote(run)
            }
            None => {
                let created = self
                    .api
                    .create(
                        &self.ctx,
                        CreateCheckRun {
                            name: name.to_string(),
                            head_sha: self.ctx.commit().to_string(),
                            status: RemoteStatus::InProgress,
                            details_url: details_url.map(str::to_string),
                        },
                    )
                    .await?;
                info!(check = %name, check_run_id = created.id, "created check run");
                LocalCheck {
                    id: created.id,
                    lifecycle: CheckLifecycle::InProgress,
                }
            }
        };

        self.record(name, local);
        Ok(local.id)
    }

    /// Complete `name` with an explicit verdict.
    pub async fn conclude(&self, name: &str, conclusion: Conclusion) -> Result<()> {
        let id = self.resolve(name).await?;
        self.api
            .update(
                &self.ctx,
                id,
                UpdateCheckRun {
                    status: Some(RemoteStatus::Completed),
                    conclusion: Some(conclusion.as_str().to_string()),
                    output: None,
                },
            )
            .await?;
        self.mark_completed(name, id, conclusion);
        Ok(())
    }

    /// Parse raw tool output with the parser registered for `name` and
    /// complete the check with the derived verdict.
    pub async fn conclude_from_lines<I, S>(&self, name: &str, lines: I) -> Result<Conclusion>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let dialect = Dialect::for_check(name).ok_or_else(|| MiniciError::UnknownCheck(name.into()))?;
        let batch = dialect.parse_lines(lines)?;
        self.conclude_with_batch(name, &batch).await
    }

    /// Complete `name` with the verdict of `batch`, attaching the batch as
    /// the check's output.
    pub async fn conclude_with_batch(
        &self,
        name: &str,
        batch: &AnnotationBatch,
    ) -> Result<Conclusion> {
        let id = self.resolve(name).await?;
        let conclusion = Conclusion::from_batch(batch);

        let updates = batch_updates(batch, conclusion);
        debug!(
            check = %name,
            check_run_id = id,
            annotations = batch.len(),
            requests = updates.len(),
            "sending check output"
        );
        for update in updates {
            self.api.update(&self.ctx, id, update).await?;
        }

        self.mark_completed(name, id, conclusion);
        Ok(conclusion)
    }

    pub fn lifecycle(&self, name: &str) -> CheckLifecycle {
        self.lock()
            .get(name)
            .map_or(CheckLifecycle::Absent, |c| c.lifecycle)
    }

    /// Checks opened through this client that never reached `completed`.
    pub fn unconcluded(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .lock()
            .iter()
            .filter(|(_, c)| c.lifecycle == CheckLifecycle::InProgress)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Id of the check run for `name`: local registry first, then the
    /// remote listing.
    async fn resolve(&self, name: &str) -> Result<CheckRunId> {
        let cached = self.lock().get(name).copied();
        let local = match cached {
            Some(local) => local,
            None => {
                let existing = self.api.list(&self.ctx).await?;
                let run = first_match(name, &existing)
                    .ok_or_else(|| MiniciError::CheckNotStarted(name.to_string()))?;
                let local = LocalCheck::from_remote(run);
                self.record(name, local);
                local
            }
        };

        if let CheckLifecycle::Completed(previous) = local.lifecycle {
            warn!(
                check = %name,
                check_run_id = local.id,
                previous = ?previous,
                "check run already completed; overwriting its verdict"
            );
        }
        Ok(local.id)
    }

    fn mark_completed(&self, name: &str, id: CheckRunId, conclusion: Conclusion) {
        info!(check = %name, check_run_id = id, conclusion = %conclusion, "check run completed");
        self.record(
            name,
            LocalCheck {
                id,
                lifecycle: CheckLifecycle::Completed(Some(conclusion)),
            },
        );
    }

    fn record(&self, name: &str, local: LocalCheck) {
        self.lock().insert(name.to_string(), local);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, LocalCheck>> {
        self.runs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// First run named `name` in remote order. More than one is logged.
fn first_match<'a>(name: &str, runs: &'a [CheckRunSummary]) -> Option<&'a CheckRunSummary> {
    let mut matches = runs.iter().filter(|r| r.name == name);
    let first = matches.next()?;
    let extra: Vec<CheckRunId> = matches.map(|r| r.id).collect();
    if !extra.is_empty() {
        warn!(
            check = %name,
            check_run_id = first.id,
            ignored = ?extra,
            "several check runs share this name; using the first"
        );
    }
    Some(first)
}

/// Requests completing a check with `batch` as output. Annotations are
/// split to respect the per-request limit; only the last request carries
/// the status change.
fn batch_updates(batch: &AnnotationBatch, conclusion: Conclusion) -> Vec<UpdateCheckRun> {
    let summary = format!("{} ({} annotations)", batch.summary, batch.len());
    let wire: Vec<WireAnnotation> = batch.annotations.iter().map(WireAnnotation::from).collect();

    let mut chunks: Vec<Vec<WireAnnotation>> = wire
        .chunks(MAX_ANNOTATIONS_PER_REQUEST)
        .map(<[WireAnnotation]>::to_vec)
        .collect();
    if chunks.is_empty() {
        chunks.push(Vec::new());
    }

    let last = chunks.len() - 1;
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, annotations)| {
            let output = Some(CheckRunOutput {
                title: batch.title.clone(),
                summary: summary.clone(),
                annotations,
            });
            if i == last {
                UpdateCheckRun {
                    status: Some(RemoteStatus::Completed),
                    conclusion: Some(conclusion.as_str().to_string()),
                    output,
                }
            } else {
                UpdateCheckRun {
                    output,
                    ..UpdateCheckRun::default()
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::{Annotation, AnnotationLevel, Location};

    fn batch_of(n: u32) -> AnnotationBatch {
        let mut batch = AnnotationBatch::new("Mypy", "Result of mypy checks");
        for line in 1..=n {
            batch.annotations.push(Annotation {
                location: Location::new("src/app.py", line),
                level: AnnotationLevel::Failure,
                message: "bad type".into(),
                title: None,
            });
        }
        batch
    }

    #[test]
    fn empty_batch_completes_in_one_request() {
        let updates = batch_updates(&batch_of(0), Conclusion::Success);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].status, Some(RemoteStatus::Completed));
        assert_eq!(updates[0].conclusion.as_deref(), Some("success"));
        let output = updates[0].output.as_ref().unwrap();
        assert_eq!(output.summary, "Result of mypy checks (0 annotations)");
    }

    #[test]
    fn large_batches_are_split_and_completed_last() {
        let updates = batch_updates(&batch_of(120), Conclusion::Failure);
        let sizes: Vec<usize> = updates
            .iter()
            .map(|u| u.output.as_ref().unwrap().annotations.len())
            .collect();
        assert_eq!(sizes, vec![50, 50, 20]);
        assert!(updates[..2].iter().all(|u| u.status.is_none() && u.conclusion.is_none()));
        assert_eq!(updates[2].status, Some(RemoteStatus::Completed));
        assert_eq!(updates[2].conclusion.as_deref(), Some("failure"));
    }

    #[test]
    fn first_match_follows_remote_order() {
        let run = |id, name: &str| CheckRunSummary {
            id,
            name: name.into(),
            status: RemoteStatus::InProgress,
            conclusion: None,
        };
        let runs = vec![run(3, "pylint"), run(9, "mypy"), run(4, "mypy")];
        assert_eq!(first_match("mypy", &runs).map(|r| r.id), Some(9));
        assert!(first_match("ci", &runs).is_none());
    }
}
