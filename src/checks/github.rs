// src/checks/github.rs

//! HTTP transport for the check-runs REST API.

use reqwest::{Response, header};
use tracing::{debug, trace};

use crate::checks::CheckContext;
use crate::checks::api::{
    CheckRunApi, CheckRunId, CheckRunSummary, CreateCheckRun, ListCheckRuns, UpdateCheckRun,
};
use crate::errors::{MiniciError, Result};
use crate::types::BoxFuture;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub(crate) const ACCEPT: &str = "application/vnd.github+json";
pub(crate) const USER_AGENT: &str = concat!("minici/", env!("CARGO_PKG_VERSION"));
const PAGE_SIZE: usize = 100;

/// Turn a non-2xx response into [`MiniciError::Network`].
pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(MiniciError::Network {
        status: status.as_u16(),
        url,
        body,
    })
}

#[derive(Debug, Clone)]
pub struct GithubCheckRunApi {
    http: reqwest::Client,
    base_url: String,
}

impl GithubCheckRunApi {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(
        &self,
        method: reqwest::Method,
        ctx: &CheckContext,
        path: &str,
    ) -> reqwest::RequestBuilder {
        let url = format!("{}/repos/{}/{}", self.base_url, ctx.repo(), path);
        trace!(%method, url = %url, "check-run request");
        self.http
            .request(method, url)
            .header(
                header::AUTHORIZATION,
                format!("token {}", ctx.credential().token()),
            )
            .header(header::ACCEPT, ACCEPT)
            .header(header::USER_AGENT, USER_AGENT)
    }
}

impl CheckRunApi for GithubCheckRunApi {
    fn create(
        &self,
        ctx: &CheckContext,
        req: CreateCheckRun,
    ) -> BoxFuture<'_, Result<CheckRunSummary>> {
        let builder = self.request(reqwest::Method::POST, ctx, "check-runs").json(&req);
        Box::pin(async move {
            let response = ensure_success(builder.send().await?).await?;
            Ok(response.json().await?)
        })
    }

    fn list(&self, ctx: &CheckContext) -> BoxFuture<'_, Result<Vec<CheckRunSummary>>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let mut runs = Vec::new();
            let mut page = 1usize;
            loop {
                let path = format!(
                    "commits/{}/check-runs?per_page={PAGE_SIZE}&page={page}",
                    ctx.commit()
                );
                let response = self
                    .request(reqwest::Method::GET, &ctx, &path)
                    .send()
                    .await?;
                let body: ListCheckRuns = ensure_success(response).await?.json().await?;
                let received = body.check_runs.len();
                runs.extend(body.check_runs);

                if received < PAGE_SIZE || runs.len() as u64 >= body.total_count {
                    break;
                }
                page += 1;
            }
            debug!(commit = %ctx.commit(), count = runs.len(), "listed check runs");
            Ok(runs)
        })
    }

    fn update(
        &self,
        ctx: &CheckContext,
        id: CheckRunId,
        req: UpdateCheckRun,
    ) -> BoxFuture<'_, Result<CheckRunSummary>> {
        let builder = self
            .request(reqwest::Method::PATCH, ctx, &format!("check-runs/{id}"))
            .json(&req);
        Box::pin(async move {
            let response = ensure_success(builder.send().await?).await?;
            Ok(response.json().await?)
        })
    }
}
