use std::sync::{Arc, Mutex};

use minici::checks::api::{
    CheckRunApi, CheckRunId, CheckRunSummary, CreateCheckRun, RemoteStatus, UpdateCheckRun,
};
use minici::checks::{CheckContext, CheckRunClient, Credential};
use minici::errors::{MiniciError, Result};
use minici::types::BoxFuture;

/// One call observed by [`FakeCheckRunApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Create(CreateCheckRun),
    List,
    Update(CheckRunId, UpdateCheckRun),
}

#[derive(Debug, Default)]
struct FakeState {
    runs: Vec<CheckRunSummary>,
    next_id: CheckRunId,
    calls: Vec<ApiCall>,
    fail_next: Option<u16>,
}

/// In-memory stand-in for the check-runs API of a single commit.
///
/// Runs are listed in creation order. Cloning shares the same state.
#[derive(Debug, Clone, Default)]
pub struct FakeCheckRunApi {
    state: Arc<Mutex<FakeState>>,
}

impl FakeCheckRunApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a run as if another process had created it.
    pub fn with_existing(self, name: &str, status: RemoteStatus) -> Self {
        {
            let mut st = self.state.lock().unwrap();
            st.next_id += 1;
            let id = st.next_id;
            st.runs.push(CheckRunSummary {
                id,
                name: name.to_string(),
                status,
                conclusion: None,
            });
        }
        self
    }

    /// Make the next call fail with the given HTTP status.
    pub fn fail_next(&self, status: u16) {
        self.state.lock().unwrap().fail_next = Some(status);
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn runs(&self) -> Vec<CheckRunSummary> {
        self.state.lock().unwrap().runs.clone()
    }

    pub fn run_named(&self, name: &str) -> Option<CheckRunSummary> {
        self.runs().into_iter().find(|r| r.name == name)
    }

    pub fn creates(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ApiCall::Create(_)))
            .count()
    }

    pub fn updates_for(&self, id: CheckRunId) -> Vec<UpdateCheckRun> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ApiCall::Update(target, update) if target == id => Some(update),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ApiCall) -> Result<std::sync::MutexGuard<'_, FakeState>> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(call);
        if let Some(status) = st.fail_next.take() {
            return Err(MiniciError::Network {
                status,
                url: "fake://check-runs".to_string(),
                body: "scripted failure".to_string(),
            });
        }
        Ok(st)
    }
}

impl CheckRunApi for FakeCheckRunApi {
    fn create(
        &self,
        _ctx: &CheckContext,
        req: CreateCheckRun,
    ) -> BoxFuture<'_, Result<CheckRunSummary>> {
        let result = self.record(ApiCall::Create(req.clone())).map(|mut st| {
            st.next_id += 1;
            let run = CheckRunSummary {
                id: st.next_id,
                name: req.name,
                status: req.status,
                conclusion: None,
            };
            st.runs.push(run.clone());
            run
        });
        Box::pin(async move { result })
    }

    fn list(&self, _ctx: &CheckContext) -> BoxFuture<'_, Result<Vec<CheckRunSummary>>> {
        let result = self.record(ApiCall::List).map(|st| st.runs.clone());
        Box::pin(async move { result })
    }

    fn update(
        &self,
        _ctx: &CheckContext,
        id: CheckRunId,
        req: UpdateCheckRun,
    ) -> BoxFuture<'_, Result<CheckRunSummary>> {
        let result = self
            .record(ApiCall::Update(id, req.clone()))
            .and_then(|mut st| {
                let run = st
                    .runs
                    .iter_mut()
                    .find(|r| r.id == id)
                    .ok_or_else(|| MiniciError::Network {
                        status: 404,
                        url: format!("fake://check-runs/{id}"),
                        body: "Not Found".to_string(),
                    })?;
                if let Some(status) = req.status {
                    run.status = status;
                }
                if req.conclusion.is_some() {
                    run.conclusion = req.conclusion;
                }
                Ok(run.clone())
            });
        Box::pin(async move { result })
    }
}

/// Context for `octo/app` at commit `abc123`.
pub fn test_context() -> CheckContext {
    CheckContext::new("octo/app", "abc123", Credential::new("test-token"))
        .expect("static test context is valid")
}

/// A client reporting to `api`.
pub fn client_for(api: &FakeCheckRunApi) -> Arc<CheckRunClient> {
    Arc::new(CheckRunClient::new(test_context(), Arc::new(api.clone())))
}
