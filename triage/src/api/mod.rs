//! Transport-neutral request handlers
//!
//! [`IssueApi`] turns client requests into service calls and turns the
//! outcome, success or failure, into an [`ApiResponse`]. Nothing here knows
//! about sockets; an HTTP server, the CLI or a test can all drive it.
//!
//! | Operation       | Success                                      |
//! |-----------------|----------------------------------------------|
//! | `list`          | 200 page body                                |
//! | `get`           | 200 issue body                               |
//! | `create`        | 201 issue body                               |
//! | `update`        | 200 issue body                               |
//! | `delete`        | 200 `{"message": "Issue deleted successfully"}` |
//! | `bulk_create`   | 200 array of issue bodies                    |
//!
//! Failures use the envelope produced by [`ApiResponse::from_error`].

/// Response bodies and the error-to-status mapping
pub mod responses;

pub use responses::{ApiResponse, IssueListResponse, IssueResponse};

use crate::error::{Result, TriageError};
use crate::issues::{
    IssueDraft, IssueId, IssuePatch, IssueService, IssueStore, ListIssuesQuery,
};
use chrono::Utc;
use responses::{timestamp, to_body};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

/// Name reported by the health endpoints
pub const SERVICE_NAME: &str = "issue-tracker";

/// Request handlers over an [`IssueService`]
pub struct IssueApi<S: IssueStore + ?Sized> {
    service: IssueService<S>,
}

impl<S: IssueStore + ?Sized> IssueApi<S> {
    /// Wrap a service
    pub fn new(service: IssueService<S>) -> Self {
        Self { service }
    }

    /// The wrapped service
    pub fn service(&self) -> &IssueService<S> {
        &self.service
    }

    /// List issues matching `query`
    pub async fn list(&self, query: &ListIssuesQuery) -> ApiResponse {
        match self.service.list(query).await {
            Ok(page) => to_body(&IssueListResponse::from(&page)),
            Err(e) => e.into(),
        }
    }

    /// Fetch one issue
    pub async fn get(&self, id: &str) -> ApiResponse {
        match self.service.get(&IssueId::from(id)).await {
            Ok(issue) => to_body(&IssueResponse::from(&issue)),
            Err(e) => e.into(),
        }
    }

    /// Create an issue from a JSON request body
    pub async fn create(&self, body: Value) -> ApiResponse {
        let draft: IssueDraft = match parse_body(body) {
            Ok(draft) => draft,
            Err(e) => return e.into(),
        };
        match self.service.create_from_draft(draft).await {
            Ok(issue) => match serde_json::to_value(IssueResponse::from(&issue)) {
                Ok(body) => ApiResponse::created(body),
                Err(e) => TriageError::Json(e).into(),
            },
            Err(e) => e.into(),
        }
    }

    /// Apply a JSON partial update to an issue
    pub async fn update(&self, id: &str, body: Value) -> ApiResponse {
        let patch: IssuePatch = match parse_body(body) {
            Ok(patch) => patch,
            Err(e) => return e.into(),
        };
        match self.service.update_from_patch(&IssueId::from(id), patch).await {
            Ok(issue) => to_body(&IssueResponse::from(&issue)),
            Err(e) => e.into(),
        }
    }

    /// Delete an issue
    pub async fn delete(&self, id: &str) -> ApiResponse {
        match self.service.delete(&IssueId::from(id)).await {
            Ok(()) => ApiResponse::ok(json!({ "message": "Issue deleted successfully" })),
            Err(e) => e.into(),
        }
    }

    /// Create every issue in a JSON array, or none of them
    pub async fn bulk_create(&self, body: Value) -> ApiResponse {
        let drafts: Vec<IssueDraft> = match parse_body(body) {
            Ok(drafts) => drafts,
            Err(e) => return e.into(),
        };
        match self.service.bulk_create_from_drafts(drafts).await {
            Ok(issues) => to_body(&issues.iter().map(IssueResponse::from).collect::<Vec<_>>()),
            Err(e) => e.into(),
        }
    }

    /// Liveness check
    pub fn health(&self) -> ApiResponse {
        ApiResponse::ok(json!({
            "status": "ok",
            "timestamp": timestamp(Utc::now()),
            "service": SERVICE_NAME,
            "version": crate::VERSION,
        }))
    }

    /// Liveness check that also touches the store
    pub async fn health_detailed(&self) -> ApiResponse {
        let (storage, issue_count) = match self.service.store().list_all().await {
            Ok(issues) => ("connected", Some(issues.len())),
            Err(e) => {
                debug!("Health check could not read the store: {}", e);
                ("unavailable", None)
            }
        };
        let healthy = issue_count.is_some();
        ApiResponse {
            status: if healthy { 200 } else { 503 },
            body: json!({
                "status": if healthy { "ok" } else { "degraded" },
                "timestamp": timestamp(Utc::now()),
                "service": SERVICE_NAME,
                "version": crate::VERSION,
                "components": {
                    "storage": storage,
                    "api": "operational",
                },
                "issueCount": issue_count,
            }),
        }
    }

    /// Service banner
    pub fn root(&self) -> ApiResponse {
        ApiResponse::ok(json!({
            "message": "Issue Tracker API",
            "version": crate::VERSION,
            "health": "/health",
        }))
    }
}

/// Decode a request body; shape errors are the client's fault
fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T> {
    serde_json::from_value(body).map_err(|e| TriageError::validation("body", e.to_string()))
}
