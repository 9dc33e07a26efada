//! Filtering, sorting and pagination of issue lists
//!
//! A [`ListIssuesQuery`] is what a client asks for. The engine resolves it
//! against the [`Config`] bounds into an [`IssueFilter`], a [`SortSpec`] and a
//! page window, and asks the store for one snapshot holding the matching
//! count, the requested slice and the [`FilterOptions`] computed over the
//! *whole* store, so that pickers only offer values that currently occur and
//! the three always describe the same state.
//!
//! The filter-option scan reads every record on every list call. That keeps
//! the values fresh without any bookkeeping, and is the known scaling limit
//! of this engine.

use crate::config::Config;
use crate::error::{Result, TriageError};
use crate::issues::storage::IssueStore;
use crate::issues::{Issue, IssuePriority, IssueStatus};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::debug;

/// Fields a list can be sorted by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortField {
    /// Issue id
    Id,
    /// Title, byte-wise
    Title,
    /// Status rank (open < in-progress < resolved < closed)
    Status,
    /// Priority rank (low < medium < high < critical)
    Priority,
    /// Assignee; unassigned first when ascending
    Assignee,
    /// Reporter; unset first when ascending
    Reporter,
    /// Due date; unset first when ascending
    DueDate,
    /// Estimate; unset first when ascending
    EstimatedHours,
    /// Creation time
    CreatedAt,
    /// Last modification time
    #[default]
    UpdatedAt,
}

impl SortField {
    /// Every sortable field
    pub const ALL: [SortField; 10] = [
        SortField::Id,
        SortField::Title,
        SortField::Status,
        SortField::Priority,
        SortField::Assignee,
        SortField::Reporter,
        SortField::DueDate,
        SortField::EstimatedHours,
        SortField::CreatedAt,
        SortField::UpdatedAt,
    ];

    /// Canonical snake_case name
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Title => "title",
            SortField::Status => "status",
            SortField::Priority => "priority",
            SortField::Assignee => "assignee",
            SortField::Reporter => "reporter",
            SortField::DueDate => "due_date",
            SortField::EstimatedHours => "estimated_hours",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }

    /// Look up a field by its snake_case or camelCase name
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .trim()
            .chars()
            .filter(|c| *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().replace('_', "") == normalized)
    }

    /// Resolve a requested name, falling back to [`SortField::UpdatedAt`]
    pub fn resolve(name: Option<&str>) -> Self {
        match name {
            None => Self::default(),
            Some(name) => Self::from_name(name).unwrap_or_else(|| {
                debug!("Unknown sort field '{}', sorting by updated_at", name);
                Self::default()
            }),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Smallest first
    Asc,
    /// Largest first
    #[default]
    Desc,
}

impl SortOrder {
    /// Resolve a requested direction, falling back to [`SortOrder::Desc`]
    pub fn resolve(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some(name) if name.eq_ignore_ascii_case("asc") => SortOrder::Asc,
            Some(name) if name.eq_ignore_ascii_case("desc") => SortOrder::Desc,
            Some(name) => {
                debug!("Unknown sort order '{}', sorting descending", name);
                SortOrder::Desc
            }
            None => SortOrder::Desc,
        }
    }
}

/// A total order over issues
///
/// Ties on the chosen field are broken by id, ascending, in both directions,
/// so every store returns the same sequence for the same data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortSpec {
    /// Primary sort key
    pub field: SortField,
    /// Direction of the primary key
    pub order: SortOrder,
}

impl SortSpec {
    /// Create a sort specification
    pub fn new(field: SortField, order: SortOrder) -> Self {
        Self { field, order }
    }

    /// Compare two issues under this specification
    pub fn compare(&self, a: &Issue, b: &Issue) -> Ordering {
        let primary = match self.field {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Title => a.title.cmp(&b.title),
            SortField::Status => a.status.cmp(&b.status),
            SortField::Priority => a.priority.cmp(&b.priority),
            SortField::Assignee => a.assignee.cmp(&b.assignee),
            SortField::Reporter => a.reporter.cmp(&b.reporter),
            SortField::DueDate => a.due_date.cmp(&b.due_date),
            SortField::EstimatedHours => compare_hours(a.estimated_hours, b.estimated_hours),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        };
        let primary = match self.order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

fn compare_hours(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.total_cmp(&y),
    }
}

/// Which issues a list includes
///
/// Dimensions combine with AND; values inside one dimension combine with OR.
/// An empty set places no constraint on its dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFilter {
    /// Case-insensitive substring of the title or the description
    pub search: Option<String>,
    /// Accepted statuses
    pub statuses: BTreeSet<IssueStatus>,
    /// Accepted priorities
    pub priorities: BTreeSet<IssuePriority>,
    /// Accepted assignees, compared exactly
    pub assignees: BTreeSet<String>,
}

impl IssueFilter {
    /// A filter that accepts everything
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether the filter constrains nothing
    pub fn is_unconstrained(&self) -> bool {
        self.search.is_none()
            && self.statuses.is_empty()
            && self.priorities.is_empty()
            && self.assignees.is_empty()
    }

    /// Whether `issue` passes every dimension of the filter
    pub fn matches(&self, issue: &Issue) -> bool {
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_title = issue.title.to_lowercase().contains(&needle);
            let in_description = issue
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !in_title && !in_description {
                return false;
            }
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&issue.status) {
            return false;
        }
        if !self.priorities.is_empty() && !self.priorities.contains(&issue.priority) {
            return false;
        }
        if !self.assignees.is_empty()
            && !issue
                .assignee
                .as_ref()
                .is_some_and(|a| self.assignees.contains(a))
        {
            return false;
        }
        true
    }
}

/// A list request as a client sends it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListIssuesQuery {
    /// Substring to look for in title or description
    pub search: Option<String>,
    /// Accepted statuses (wire names)
    pub status: Vec<String>,
    /// Accepted priorities (wire names)
    pub priority: Vec<String>,
    /// Accepted assignees
    pub assignee: Vec<String>,
    /// Field name to sort by; unknown names sort by `updated_at`
    #[serde(alias = "sort_by")]
    pub sort_by: Option<String>,
    /// `asc` or `desc`; anything else sorts descending
    #[serde(alias = "sort_order")]
    pub sort_order: Option<String>,
    /// 1-based page number; defaults to 1
    pub page: Option<usize>,
    /// Items per page; defaults to the configured page size
    #[serde(alias = "page_size")]
    pub page_size: Option<usize>,
}

/// A list request after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedListQuery {
    /// Which issues to include
    pub filter: IssueFilter,
    /// How to order them
    pub sort: SortSpec,
    /// 1-based page number
    pub page: usize,
    /// Items per page
    pub page_size: usize,
}

impl ListIssuesQuery {
    /// Validate the request against the configured page bounds
    pub fn resolve(&self, config: &Config) -> Result<ResolvedListQuery> {
        let page = self.page.unwrap_or(1);
        if page < 1 {
            return Err(TriageError::validation("page", "must be at least 1"));
        }
        let page_size = self.page_size.unwrap_or(config.default_page_size);
        // A hand-built Config may carry a zero minimum
        let min_page_size = config.min_page_size.max(1);
        if page_size < min_page_size || page_size > config.max_page_size {
            return Err(TriageError::validation(
                "pageSize",
                format!(
                    "must be between {} and {}",
                    min_page_size, config.max_page_size
                ),
            ));
        }

        let filter = IssueFilter {
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            statuses: self
                .status
                .iter()
                .map(|s| s.parse::<IssueStatus>())
                .collect::<Result<_>>()?,
            priorities: self
                .priority
                .iter()
                .map(|p| p.parse::<IssuePriority>())
                .collect::<Result<_>>()?,
            assignees: self
                .assignee
                .iter()
                .map(|a| a.trim())
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect(),
        };

        Ok(ResolvedListQuery {
            filter,
            sort: SortSpec::new(
                SortField::resolve(self.sort_by.as_deref()),
                SortOrder::resolve(self.sort_order.as_deref()),
            ),
            page,
            page_size,
        })
    }
}

/// Position of a page within the filtered result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// 1-based page number that was requested
    pub current_page: usize,
    /// Items per page
    pub page_size: usize,
    /// Matching issues across all pages
    pub total_items: usize,
    /// Number of pages, at least 1
    pub total_pages: usize,
    /// Whether a later page exists
    pub has_next: bool,
    /// Whether an earlier page exists
    pub has_prev: bool,
}

impl Pagination {
    /// Compute pagination metadata. A zero `page_size` counts as one.
    pub fn new(current_page: usize, page_size: usize, total_items: usize) -> Self {
        let total_pages = total_items.div_ceil(page_size.max(1)).max(1);
        Self {
            current_page,
            page_size,
            total_items,
            total_pages,
            has_next: current_page < total_pages,
            has_prev: current_page > 1,
        }
    }

    /// Index of the first item on this page
    pub fn offset(&self) -> usize {
        self.current_page
            .saturating_sub(1)
            .saturating_mul(self.page_size)
    }
}

/// Distinct values currently in use across the whole store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    /// Statuses that occur, in rank order
    pub available_statuses: Vec<IssueStatus>,
    /// Priorities that occur, in rank order
    pub available_priorities: Vec<IssuePriority>,
    /// Non-empty assignees that occur, sorted
    pub available_assignees: Vec<String>,
}

impl FilterOptions {
    /// Collect the distinct values of `issues`
    pub fn from_issues<'a>(issues: impl IntoIterator<Item = &'a Issue>) -> Self {
        let mut statuses = BTreeSet::new();
        let mut priorities = BTreeSet::new();
        let mut assignees = BTreeSet::new();
        for issue in issues {
            statuses.insert(issue.status);
            priorities.insert(issue.priority);
            if let Some(assignee) = issue.assignee.as_deref().filter(|a| !a.is_empty()) {
                assignees.insert(assignee.to_string());
            }
        }
        Self {
            available_statuses: statuses.into_iter().collect(),
            available_priorities: priorities.into_iter().collect(),
            available_assignees: assignees.into_iter().collect(),
        }
    }
}

/// One page of a list result
#[derive(Debug, Clone, PartialEq)]
pub struct IssuePage {
    /// The issues on this page, in sort order
    pub issues: Vec<Issue>,
    /// Where this page sits in the filtered result
    pub pagination: Pagination,
    /// Values available for filtering, over the unfiltered store
    pub filters: FilterOptions,
}

/// Builds list pages on top of an [`IssueStore`]
pub struct IssueQueryEngine<'a, S: IssueStore + ?Sized> {
    store: &'a S,
    config: &'a Config,
}

impl<'a, S: IssueStore + ?Sized> IssueQueryEngine<'a, S> {
    /// Create an engine over `store`
    pub fn new(store: &'a S, config: &'a Config) -> Self {
        Self { store, config }
    }

    /// Resolve a list request into a page
    pub async fn run(&self, query: &ListIssuesQuery) -> Result<IssuePage> {
        let resolved = query.resolve(self.config)?;
        debug!(
            "Listing issues: filter={:?} sort={:?} page={} page_size={}",
            resolved.filter, resolved.sort, resolved.page, resolved.page_size
        );

        let offset = resolved
            .page
            .saturating_sub(1)
            .saturating_mul(resolved.page_size);
        let snapshot = self
            .store
            .snapshot(&resolved.filter, resolved.sort, offset, resolved.page_size)
            .await?;
        let pagination = Pagination::new(resolved.page, resolved.page_size, snapshot.total);

        Ok(IssuePage {
            issues: snapshot.issues,
            pagination,
            filters: snapshot.options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::memory::InMemoryIssueStore;
    use crate::issues::storage::select;
    use crate::issues::{IssueId, NewIssue};
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn issue(n: u32, title: &str) -> Issue {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(n as i64);
        Issue::from_new(
            IssueId::new(format!("iss-{n:08x}")),
            NewIssue::titled(title),
            created,
        )
    }

    fn with(mut issue: Issue, f: impl FnOnce(&mut Issue)) -> Issue {
        f(&mut issue);
        issue
    }

    fn ids(issues: &[Issue]) -> Vec<&str> {
        issues.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn test_sort_field_names() {
        assert_eq!(SortField::from_name("due_date"), Some(SortField::DueDate));
        assert_eq!(SortField::from_name("dueDate"), Some(SortField::DueDate));
        assert_eq!(SortField::from_name("CreatedAt"), Some(SortField::CreatedAt));
        assert_eq!(SortField::from_name("bogus"), None);
        assert_eq!(SortField::resolve(Some("bogus")), SortField::UpdatedAt);
        assert_eq!(SortField::resolve(None), SortField::UpdatedAt);
    }

    #[test]
    fn test_sort_order_resolution() {
        assert_eq!(SortOrder::resolve(Some("ASC")), SortOrder::Asc);
        assert_eq!(SortOrder::resolve(Some("desc")), SortOrder::Desc);
        assert_eq!(SortOrder::resolve(Some("sideways")), SortOrder::Desc);
        assert_eq!(SortOrder::resolve(None), SortOrder::Desc);
    }

    #[test]
    fn test_sort_ties_broken_by_id_in_both_directions() {
        let a = with(issue(2, "Same"), |i| i.priority = IssuePriority::High);
        let b = with(issue(1, "Same"), |i| i.priority = IssuePriority::High);
        let c = with(issue(3, "Other"), |i| i.priority = IssuePriority::Low);

        let asc = select(
            vec![a.clone(), b.clone(), c.clone()].into_iter(),
            &IssueFilter::all(),
            SortSpec::new(SortField::Priority, SortOrder::Asc),
            0,
            10,
        );
        assert_eq!(ids(&asc), vec!["iss-00000003", "iss-00000001", "iss-00000002"]);

        let desc = select(
            vec![a, b, c].into_iter(),
            &IssueFilter::all(),
            SortSpec::new(SortField::Priority, SortOrder::Desc),
            0,
            10,
        );
        assert_eq!(ids(&desc), vec!["iss-00000001", "iss-00000002", "iss-00000003"]);
    }

    #[test]
    fn test_missing_values_sort_first_ascending() {
        let none = issue(1, "No estimate");
        let small = with(issue(2, "Small"), |i| i.estimated_hours = Some(1.0));
        let big = with(issue(3, "Big"), |i| i.estimated_hours = Some(8.0));

        let sorted = select(
            vec![big, none, small].into_iter(),
            &IssueFilter::all(),
            SortSpec::new(SortField::EstimatedHours, SortOrder::Asc),
            0,
            10,
        );
        assert_eq!(ids(&sorted), vec!["iss-00000001", "iss-00000002", "iss-00000003"]);
    }

    #[test]
    fn test_search_matches_title_or_description_case_insensitively() {
        let filter = IssueFilter {
            search: Some("LOGIN".to_string()),
            ..IssueFilter::default()
        };
        let by_title = issue(1, "Login fails");
        let by_description = with(issue(2, "Auth"), |i| {
            i.description = Some("the login page hangs".to_string())
        });
        let neither = issue(3, "Dark mode");

        assert!(filter.matches(&by_title));
        assert!(filter.matches(&by_description));
        assert!(!filter.matches(&neither));
    }

    #[test]
    fn test_filters_are_and_across_and_or_within() {
        let filter = IssueFilter {
            statuses: [IssueStatus::Open, IssueStatus::InProgress].into(),
            priorities: [IssuePriority::High].into(),
            ..IssueFilter::default()
        };
        let open_high = with(issue(1, "a"), |i| i.priority = IssuePriority::High);
        let progress_high = with(issue(2, "b"), |i| {
            i.status = IssueStatus::InProgress;
            i.priority = IssuePriority::High;
        });
        let open_low = with(issue(3, "c"), |i| i.priority = IssuePriority::Low);
        let closed_high = with(issue(4, "d"), |i| {
            i.status = IssueStatus::Closed;
            i.priority = IssuePriority::High;
        });

        assert!(filter.matches(&open_high));
        assert!(filter.matches(&progress_high));
        assert!(!filter.matches(&open_low));
        assert!(!filter.matches(&closed_high));
    }

    #[test]
    fn test_assignee_filter_excludes_unassigned() {
        let filter = IssueFilter {
            assignees: ["a@example.com".to_string()].into(),
            ..IssueFilter::default()
        };
        let assigned = with(issue(1, "x"), |i| i.assignee = Some("a@example.com".into()));
        let other = with(issue(2, "y"), |i| i.assignee = Some("b@example.com".into()));
        let unassigned = issue(3, "z");

        assert!(filter.matches(&assigned));
        assert!(!filter.matches(&other));
        assert!(!filter.matches(&unassigned));
    }

    #[test]
    fn test_resolve_rejects_bad_page_bounds() {
        let config = Config::default();

        let zero_page = ListIssuesQuery {
            page: Some(0),
            ..Default::default()
        };
        assert!(zero_page.resolve(&config).unwrap_err().is_validation());

        for size in [9, 101] {
            let query = ListIssuesQuery {
                page_size: Some(size),
                ..Default::default()
            };
            assert!(query.resolve(&config).unwrap_err().is_validation());
        }
    }

    #[test]
    fn test_zero_page_size_rejected_even_when_config_allows_it() {
        let config = Config {
            min_page_size: 0,
            ..Config::default()
        };
        let query = ListIssuesQuery {
            page_size: Some(0),
            ..Default::default()
        };
        match query.resolve(&config).unwrap_err() {
            TriageError::Validation { field, .. } => assert_eq!(field, "pageSize"),
            other => panic!("unexpected error: {other:?}"),
        }

        let degenerate = Pagination::new(1, 0, 5);
        assert_eq!(degenerate.total_pages, 5);
    }

    #[test]
    fn test_resolve_rejects_unknown_filter_values() {
        let config = Config::default();
        for status in ["stale", "Open", "CLOSED"] {
            let query = ListIssuesQuery {
                status: vec!["open".into(), status.into()],
                ..Default::default()
            };
            match query.resolve(&config).unwrap_err() {
                TriageError::Validation { field, .. } => assert_eq!(field, "status"),
                other => panic!("unexpected error: {other:?}"),
            }
        }

        let query = ListIssuesQuery {
            priority: vec!["High".into()],
            ..Default::default()
        };
        assert!(query.resolve(&config).unwrap_err().is_validation());
    }

    #[test]
    fn test_resolve_defaults() {
        let config = Config::default();
        let resolved = ListIssuesQuery {
            search: Some("   ".into()),
            ..Default::default()
        }
        .resolve(&config)
        .unwrap();

        assert_eq!(resolved.page, 1);
        assert_eq!(resolved.page_size, 20);
        assert!(resolved.filter.is_unconstrained());
        assert_eq!(resolved.sort, SortSpec::new(SortField::UpdatedAt, SortOrder::Desc));
    }

    #[test]
    fn test_query_deserializes_from_camel_and_snake_case() {
        let camel: ListIssuesQuery =
            serde_json::from_str(r#"{"sortBy": "title", "pageSize": 10, "status": ["open"]}"#)
                .unwrap();
        let snake: ListIssuesQuery =
            serde_json::from_str(r#"{"sort_by": "title", "page_size": 10, "status": ["open"]}"#)
                .unwrap();
        assert_eq!(camel, snake);
        assert_eq!(camel.page_size, Some(10));
    }

    #[test]
    fn test_pagination_math() {
        let empty = Pagination::new(1, 10, 0);
        assert_eq!(empty.total_pages, 1);
        assert!(!empty.has_next);
        assert!(!empty.has_prev);

        let middle = Pagination::new(2, 10, 25);
        assert_eq!(middle.total_pages, 3);
        assert_eq!(middle.offset(), 10);
        assert!(middle.has_next);
        assert!(middle.has_prev);

        let beyond = Pagination::new(7, 10, 25);
        assert!(!beyond.has_next);
        assert!(beyond.has_prev);
        assert_eq!(beyond.offset(), 60);
    }

    #[test]
    fn test_filter_options_dedup_and_order() {
        let issues = vec![
            with(issue(1, "a"), |i| {
                i.status = IssueStatus::Closed;
                i.assignee = Some("zed@example.com".into());
            }),
            with(issue(2, "b"), |i| i.assignee = Some("amy@example.com".into())),
            with(issue(3, "c"), |i| {
                i.priority = IssuePriority::Critical;
                i.assignee = Some("zed@example.com".into());
            }),
            issue(4, "d"),
        ];
        let options = FilterOptions::from_issues(&issues);

        assert_eq!(
            options.available_statuses,
            vec![IssueStatus::Open, IssueStatus::Closed]
        );
        assert_eq!(
            options.available_priorities,
            vec![IssuePriority::Medium, IssuePriority::Critical]
        );
        assert_eq!(
            options.available_assignees,
            vec!["amy@example.com", "zed@example.com"]
        );
    }

    #[tokio::test]
    async fn test_engine_filter_options_ignore_active_filter() {
        let store = InMemoryIssueStore::new();
        let config = Config::default();
        store
            .insert_many(vec![
                with(issue(1, "Crash on start"), |i| i.assignee = Some("a@x.io".into())),
                with(issue(2, "Typo"), |i| {
                    i.status = IssueStatus::Resolved;
                    i.priority = IssuePriority::Low;
                    i.assignee = Some("b@x.io".into());
                }),
            ])
            .await
            .unwrap();

        let page = IssueQueryEngine::new(&store, &config)
            .run(&ListIssuesQuery {
                search: Some("crash".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.issues.len(), 1);
        assert_eq!(page.pagination.total_items, 1);
        assert_eq!(
            page.filters.available_statuses,
            vec![IssueStatus::Open, IssueStatus::Resolved]
        );
        assert_eq!(page.filters.available_assignees, vec!["a@x.io", "b@x.io"]);
    }

    #[tokio::test]
    async fn test_engine_page_beyond_end_is_empty() {
        let store = InMemoryIssueStore::new();
        let config = Config::default();
        store
            .insert_many((1..=12).map(|n| issue(n, "item")).collect())
            .await
            .unwrap();

        let page = IssueQueryEngine::new(&store, &config)
            .run(&ListIssuesQuery {
                page: Some(5),
                page_size: Some(10),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(page.issues.is_empty());
        assert_eq!(page.pagination.total_items, 12);
        assert_eq!(page.pagination.total_pages, 2);
        assert!(!page.pagination.has_next);
        assert!(page.pagination.has_prev);
    }

    fn arb_issue() -> impl Strategy<Value = Issue> {
        (
            0u32..10_000,
            0usize..4,
            0usize..4,
            prop::option::of(0usize..3),
            prop::option::of(0.0f64..40.0),
            prop::bool::ANY,
        )
            .prop_map(|(n, status, priority, assignee, hours, keyword)| {
                with(issue(n, if keyword { "needle bug" } else { "plain" }), |i| {
                    i.status = IssueStatus::ALL[status];
                    i.priority = IssuePriority::ALL[priority];
                    i.assignee = assignee.map(|a| format!("dev{a}@example.com"));
                    i.estimated_hours = hours;
                })
            })
    }

    fn unique_issues() -> impl Strategy<Value = Vec<Issue>> {
        prop::collection::vec(arb_issue(), 0..80).prop_map(|issues| {
            let mut seen = HashSet::new();
            issues
                .into_iter()
                .filter(|i| seen.insert(i.id.clone()))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_pages_partition_the_filtered_set(
            issues in unique_issues(),
            page_size in 10usize..=30,
            field in 0usize..SortField::ALL.len(),
            ascending in prop::bool::ANY,
            only_needles in prop::bool::ANY,
        ) {
            let filter = IssueFilter {
                search: only_needles.then(|| "NEEDLE".to_string()),
                ..IssueFilter::default()
            };
            let order = if ascending { SortOrder::Asc } else { SortOrder::Desc };
            let sort = SortSpec::new(SortField::ALL[field], order);

            let expected: Vec<Issue> = select(issues.clone().into_iter(), &filter, sort, 0, usize::MAX);
            let pagination = Pagination::new(1, page_size, expected.len());

            let mut seen = Vec::new();
            for page in 1..=pagination.total_pages {
                let window = Pagination::new(page, page_size, expected.len());
                let chunk = select(issues.clone().into_iter(), &filter, sort, window.offset(), page_size);
                prop_assert!(chunk.len() <= page_size);
                seen.extend(chunk);
            }

            prop_assert_eq!(ids(&seen), ids(&expected));
            let distinct: HashSet<_> = seen.iter().map(|i| i.id.clone()).collect();
            prop_assert_eq!(distinct.len(), seen.len());
        }

        #[test]
        fn prop_sort_is_a_total_order(a in arb_issue(), b in arb_issue(), field in 0usize..SortField::ALL.len()) {
            let spec = SortSpec::new(SortField::ALL[field], SortOrder::Asc);
            prop_assert_eq!(spec.compare(&a, &b), spec.compare(&b, &a).reverse());
            if a.id != b.id {
                prop_assert_ne!(spec.compare(&a, &b), Ordering::Equal);
            }
        }
    }
}
