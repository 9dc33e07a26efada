//! Response bodies and the error-to-status mapping

use crate::error::TriageError;
use crate::issues::{FilterOptions, Issue, IssuePage, IssuePriority, IssueStatus, Pagination};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::error;

/// Error code for a missing issue
pub const ISSUE_NOT_FOUND: &str = "ISSUE_NOT_FOUND";
/// Error code for rejected input
pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
/// Error code for everything the client cannot fix
pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";

/// A status code and a JSON body, ready to hand to any transport
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP-style status code
    pub status: u16,
    /// JSON body
    pub body: Value,
}

impl ApiResponse {
    /// 200 with `body`
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    /// 201 with `body`
    pub fn created(body: Value) -> Self {
        Self { status: 201, body }
    }

    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Map a library error onto a status and an error envelope
    pub fn from_error(err: &TriageError) -> Self {
        let timestamp = timestamp(Utc::now());
        match err {
            TriageError::IssueNotFound(_) => Self {
                status: 404,
                body: json!({
                    "error": {
                        "code": ISSUE_NOT_FOUND,
                        "message": err.to_string(),
                        "timestamp": timestamp,
                    }
                }),
            },
            TriageError::Validation { field, reason } => Self {
                status: 422,
                body: json!({
                    "error": {
                        "code": VALIDATION_ERROR,
                        "message": reason,
                        "field": field,
                        "timestamp": timestamp,
                    }
                }),
            },
            other => {
                error!("Request failed: {}", other);
                Self {
                    status: 500,
                    body: json!({
                        "error": {
                            "code": INTERNAL_SERVER_ERROR,
                            "message": "An unexpected error occurred",
                            "details": other.to_string(),
                            "timestamp": timestamp,
                        }
                    }),
                }
            }
        }
    }

    /// The `error.code` of an error body, if this is one
    pub fn error_code(&self) -> Option<&str> {
        self.body.get("error")?.get("code")?.as_str()
    }
}

impl From<TriageError> for ApiResponse {
    fn from(err: TriageError) -> Self {
        Self::from_error(&err)
    }
}

/// RFC 3339 with a `Z` suffix and millisecond precision
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Client-facing shape of an issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    /// Issue id
    pub id: String,
    /// Title
    pub title: String,
    /// Description, `null` when unset
    pub description: Option<String>,
    /// Status wire name
    pub status: IssueStatus,
    /// Priority wire name
    pub priority: IssuePriority,
    /// Assignee, `null` when unassigned
    pub assignee: Option<String>,
    /// Reporter, `null` when unset
    pub reporter: Option<String>,
    /// Labels, always an array
    pub labels: Vec<String>,
    /// Due date, `null` when unset
    pub due_date: Option<DateTime<Utc>>,
    /// Estimate in hours, `null` when unset
    pub estimated_hours: Option<f64>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl From<&Issue> for IssueResponse {
    fn from(issue: &Issue) -> Self {
        Self {
            id: issue.id.to_string(),
            title: issue.title.clone(),
            description: issue.description.clone(),
            status: issue.status,
            priority: issue.priority,
            assignee: issue.assignee.clone(),
            reporter: issue.reporter.clone(),
            labels: issue.labels.clone(),
            due_date: issue.due_date,
            estimated_hours: issue.estimated_hours,
            created_at: issue.created_at,
            updated_at: issue.updated_at,
        }
    }
}

/// Client-facing shape of a list page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueListResponse {
    /// Issues on the page
    pub issues: Vec<IssueResponse>,
    /// Page position, with snake_case keys
    pub pagination: Pagination,
    /// Filter choices, with camelCase keys
    pub filters: FilterOptions,
}

impl From<&IssuePage> for IssueListResponse {
    fn from(page: &IssuePage) -> Self {
        Self {
            issues: page.issues.iter().map(IssueResponse::from).collect(),
            pagination: page.pagination,
            filters: page.filters.clone(),
        }
    }
}

/// Serialize a body that is known to be representable as JSON
pub(crate) fn to_body<T: Serialize>(value: &T) -> ApiResponse {
    match serde_json::to_value(value) {
        Ok(body) => ApiResponse::ok(body),
        Err(e) => ApiResponse::from_error(&TriageError::Json(e)),
    }
}
