//! The record store abstraction
//!
//! The service never touches persistence directly; it talks to an
//! [`IssueStore`]. Each method is expected to run as one atomic unit: a
//! reader never observes half of an `insert_many`, and a failed call leaves
//! the store unchanged.
//!
//! Ids are never reused. A store remembers the ids of deleted issues and
//! rejects inserts that collide with a live or retired id with
//! [`TriageError::DuplicateIssueId`](crate::error::TriageError::DuplicateIssueId).

use crate::error::Result;
use crate::issues::query::{FilterOptions, IssueFilter, SortSpec};
use crate::issues::{Issue, IssueId};
use async_trait::async_trait;

/// Durable storage for issues
#[async_trait]
pub trait IssueStore: Send + Sync {
    /// Store a new issue
    async fn insert(&self, issue: Issue) -> Result<Issue>;

    /// Store several new issues; either all are stored or none
    async fn insert_many(&self, issues: Vec<Issue>) -> Result<Vec<Issue>>;

    /// Look up an issue by id
    async fn get_by_id(&self, id: &IssueId) -> Result<Option<Issue>>;

    /// Matching issues, sorted, starting at `offset`, at most `limit` of them
    async fn query(
        &self,
        filter: &IssueFilter,
        sort: SortSpec,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Issue>>;

    /// Number of matching issues
    async fn count(&self, filter: &IssueFilter) -> Result<usize>;

    /// Count, page and filter options of a list request, all taken from one
    /// read of the store
    async fn snapshot(
        &self,
        filter: &IssueFilter,
        sort: SortSpec,
        offset: usize,
        limit: usize,
    ) -> Result<QuerySnapshot>;

    /// Replace a stored issue. Fails with `IssueNotFound` if it is gone.
    async fn update(&self, issue: Issue) -> Result<Issue>;

    /// Remove an issue. Returns whether there was one to remove.
    async fn delete(&self, id: &IssueId) -> Result<bool>;

    /// Every stored issue, in no particular order
    async fn list_all(&self) -> Result<Vec<Issue>>;

    /// Whether the id belongs to a live issue or to a deleted one
    async fn id_taken(&self, id: &IssueId) -> Result<bool>;
}

/// The parts of a list result that must agree with each other
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySnapshot {
    /// Matching issues across all pages
    pub total: usize,
    /// The requested window of matching issues, sorted
    pub issues: Vec<Issue>,
    /// Distinct values over every stored issue
    pub options: FilterOptions,
}

/// Build a [`QuerySnapshot`] from a full set of issues
pub(crate) fn snapshot_of<'a>(
    issues: impl Iterator<Item = &'a Issue> + Clone,
    filter: &IssueFilter,
    sort: SortSpec,
    offset: usize,
    limit: usize,
) -> QuerySnapshot {
    let options = FilterOptions::from_issues(issues.clone());
    let mut matching: Vec<&Issue> = issues.filter(|issue| filter.matches(issue)).collect();
    let total = matching.len();
    matching.sort_by(|a, b| sort.compare(a, b));
    QuerySnapshot {
        total,
        issues: matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect(),
        options,
    }
}

/// Run an in-memory query over a full set of issues.
///
/// Shared by the stores that keep or load every record anyway.
pub(crate) fn select(
    issues: impl Iterator<Item = Issue>,
    filter: &IssueFilter,
    sort: SortSpec,
    offset: usize,
    limit: usize,
) -> Vec<Issue> {
    let mut matching: Vec<Issue> = issues.filter(|issue| filter.matches(issue)).collect();
    matching.sort_by(|a, b| sort.compare(a, b));
    matching.into_iter().skip(offset).take(limit).collect()
}
