//! Issue records and everything that operates on them
//!
//! An [`Issue`] is the only entity in the system. It is owned by an
//! [`IssueStore`]; the [`IssueService`] is the only code that creates,
//! mutates or removes issues, and it goes through the
//! [`validation`] layer for every piece of client input.
//!
//! ```text
//!   IssueService ──▶ IssueQueryEngine ──▶ IssueStore (memory | filesystem)
//!        │
//!        └── validation (IssueDraft / IssuePatch ──▶ NewIssue / IssueChanges)
//! ```
//!
//! ## Basic Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use triage::config::Config;
//! use triage::issues::{InMemoryIssueStore, IssueDraft, IssueService, ListIssuesQuery};
//!
//! # async fn example() -> triage::Result<()> {
//! let service = IssueService::new(Arc::new(InMemoryIssueStore::new()), Config::default());
//!
//! let draft = IssueDraft {
//!     title: Some("Login button does nothing".to_string()),
//!     priority: Some("high".to_string()),
//!     ..Default::default()
//! };
//! let issue = service.create_from_draft(draft).await?;
//! assert!(issue.id.as_str().starts_with("iss-"));
//!
//! let page = service.list(&ListIssuesQuery::default()).await?;
//! assert_eq!(page.pagination.total_items, 1);
//! # Ok(())
//! # }
//! ```

/// JSON-document issue store
pub mod filesystem;
/// In-memory issue store with failure injection
pub mod memory;
/// Filtering, sorting, pagination and filter-option metadata
pub mod query;
/// Orchestration of create/read/update/delete/list
pub mod service;
/// The record store abstraction
pub mod storage;
/// Input validation for create and update requests
pub mod validation;

pub use filesystem::FileSystemIssueStore;
pub use memory::{InMemoryIssueStore, InMemoryStoreConfig};
pub use query::{
    FilterOptions, IssueFilter, IssuePage, IssueQueryEngine, ListIssuesQuery, Pagination,
    SortField, SortOrder, SortSpec,
};
pub use service::IssueService;
pub use storage::{IssueStore, QuerySnapshot};
pub use validation::{FieldUpdate, IssueChanges, IssueDraft, IssuePatch, IssueValidator, NewIssue};

use crate::error::{Result, TriageError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of hex digits that follow the prefix in a generated id
pub const ISSUE_ID_HEX_DIGITS: usize = 8;

/// Type-safe wrapper for issue ids
///
/// Generated ids look like `iss-1a2b3c4d`. Ids supplied by clients for
/// lookups are wrapped as-is; an id that was never generated simply does not
/// match anything.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueId(String);

impl IssueId {
    /// Wrap an existing id string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random candidate id with the given prefix
    pub fn generate(prefix: &str) -> Self {
        let value: u32 = rand::random();
        Self(format!("{prefix}{value:0width$x}", width = ISSUE_ID_HEX_DIGITS))
    }

    /// Whether this id has the shape produced by [`IssueId::generate`]
    pub fn is_generated_with(&self, prefix: &str) -> bool {
        self.0
            .strip_prefix(prefix)
            .map(|rest| {
                rest.len() == ISSUE_ID_HEX_DIGITS
                    && rest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
            })
            .unwrap_or(false)
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IssueId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for IssueId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Workflow state of an issue
///
/// The declaration order is the sort rank.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum IssueStatus {
    /// Newly reported, nobody working on it
    #[default]
    Open,
    /// Being worked on
    InProgress,
    /// Fix delivered, awaiting confirmation
    Resolved,
    /// Done
    Closed,
}

impl IssueStatus {
    /// Every status, in rank order
    pub const ALL: [IssueStatus; 4] = [
        IssueStatus::Open,
        IssueStatus::InProgress,
        IssueStatus::Resolved,
        IssueStatus::Closed,
    ];

    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Open => "open",
            IssueStatus::InProgress => "in-progress",
            IssueStatus::Resolved => "resolved",
            IssueStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                TriageError::validation(
                    "status",
                    format!("'{s}' is not one of open, in-progress, resolved, closed"),
                )
            })
    }
}

/// Urgency of an issue
///
/// The declaration order is the sort rank.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum IssuePriority {
    /// Can wait
    Low,
    /// Normal
    #[default]
    Medium,
    /// Should be picked up soon
    High,
    /// Drop everything
    Critical,
}

impl IssuePriority {
    /// Every priority, in rank order
    pub const ALL: [IssuePriority; 4] = [
        IssuePriority::Low,
        IssuePriority::Medium,
        IssuePriority::High,
        IssuePriority::Critical,
    ];

    /// Wire name of the priority
    pub fn as_str(&self) -> &'static str {
        match self {
            IssuePriority::Low => "low",
            IssuePriority::Medium => "medium",
            IssuePriority::High => "high",
            IssuePriority::Critical => "critical",
        }
    }
}

impl fmt::Display for IssuePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssuePriority {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str() == s)
            .ok_or_else(|| {
                TriageError::validation(
                    "priority",
                    format!("'{s}' is not one of low, medium, high, critical"),
                )
            })
    }
}

/// A tracked work item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Unique, immutable identifier
    pub id: IssueId,
    /// Short summary, trimmed and never blank
    pub title: String,
    /// Longer free-form text
    pub description: Option<String>,
    /// Workflow state
    pub status: IssueStatus,
    /// Urgency
    pub priority: IssuePriority,
    /// Email-like handle of the person working on it
    pub assignee: Option<String>,
    /// Email-like handle of the person who reported it
    pub reporter: Option<String>,
    /// Free-form tags, in client order
    #[serde(default)]
    pub labels: Vec<String>,
    /// When the work is due
    pub due_date: Option<DateTime<Utc>>,
    /// Expected effort in hours
    pub estimated_hours: Option<f64>,
    /// When the issue was created
    pub created_at: DateTime<Utc>,
    /// When the issue was last mutated
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    /// Materialize a validated draft under a freshly assigned id
    pub fn from_new(id: IssueId, new: NewIssue, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: new.title,
            description: new.description,
            status: new.status,
            priority: new.priority,
            assignee: new.assignee,
            reporter: new.reporter,
            labels: new.labels,
            due_date: new.due_date,
            estimated_hours: new.estimated_hours,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a validated partial update and refresh `updated_at`.
    ///
    /// `updated_at` never moves backwards, even if the wall clock does.
    pub fn apply_changes(&mut self, changes: IssueChanges, now: DateTime<Utc>) {
        changes.title.apply_required(&mut self.title);
        changes.description.apply_optional(&mut self.description);
        changes.status.apply_required(&mut self.status);
        changes.priority.apply_required(&mut self.priority);
        changes.assignee.apply_optional(&mut self.assignee);
        changes.reporter.apply_optional(&mut self.reporter);
        match changes.labels {
            FieldUpdate::Keep => {}
            FieldUpdate::Clear => self.labels.clear(),
            FieldUpdate::Set(labels) => self.labels = labels,
        }
        changes.due_date.apply_optional(&mut self.due_date);
        changes.estimated_hours.apply_optional(&mut self.estimated_hours);

        self.updated_at = now.max(self.updated_at);
    }
}
