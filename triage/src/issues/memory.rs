//! In-memory issue store
//!
//! Keeps every issue in a `HashMap` behind a single `RwLock`, so each trait
//! call sees and produces a consistent snapshot. Suitable for tests and for
//! embedding the service without touching disk.
//!
//! The store can be told to fail specific operations, to refuse inserts past
//! a capacity, or to sleep before every operation. That lets callers exercise
//! their error paths without a broken disk.

use crate::error::{Result, TriageError};
use crate::issues::query::{IssueFilter, SortSpec};
use crate::issues::storage::{select, snapshot_of, IssueStore, QuerySnapshot};
use crate::issues::{Issue, IssueId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Failure injection and limits for [`InMemoryIssueStore`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryStoreConfig {
    /// Fail `insert` and `insert_many`
    pub fail_insert: bool,
    /// Fail `get_by_id` and `id_taken`
    pub fail_get: bool,
    /// Fail `query`, `count` and `snapshot`
    pub fail_query: bool,
    /// Fail `update`
    pub fail_update: bool,
    /// Fail `delete`
    pub fail_delete: bool,
    /// Fail `list_all`
    pub fail_list: bool,
    /// Refuse inserts that would take the store past this many issues
    pub max_issues: Option<usize>,
    /// Sleep this long before every operation
    pub operation_delay_ms: Option<u64>,
}

#[derive(Debug, Default)]
struct MemoryState {
    issues: HashMap<IssueId, Issue>,
    retired: HashSet<IssueId>,
}

impl MemoryState {
    fn check_new(&self, id: &IssueId) -> Result<()> {
        if self.issues.contains_key(id) || self.retired.contains(id) {
            return Err(TriageError::DuplicateIssueId(id.to_string()));
        }
        Ok(())
    }
}

/// An [`IssueStore`] that lives entirely in memory
#[derive(Debug, Clone)]
pub struct InMemoryIssueStore {
    state: Arc<RwLock<MemoryState>>,
    config: Arc<RwLock<InMemoryStoreConfig>>,
}

impl InMemoryIssueStore {
    /// Create an empty store that never fails
    pub fn new() -> Self {
        Self::with_config(InMemoryStoreConfig::default())
    }

    /// Create an empty store with failure injection
    pub fn with_config(config: InMemoryStoreConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState::default())),
            config: Arc::new(RwLock::new(config)),
        }
    }

    /// Swap the failure configuration, for example after seeding data
    pub async fn set_config(&self, config: InMemoryStoreConfig) {
        *self.config.write().await = config;
    }

    /// Number of live issues
    pub async fn len(&self) -> usize {
        self.state.read().await.issues.len()
    }

    /// Whether there are no live issues
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.issues.is_empty()
    }

    async fn enter(&self, fails: impl FnOnce(&InMemoryStoreConfig) -> bool, op: &str) -> Result<()> {
        let config = self.config.read().await.clone();
        if let Some(delay_ms) = config.operation_delay_ms {
            tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
        }
        if fails(&config) {
            return Err(TriageError::Storage(format!(
                "Simulated {op} failure in memory store"
            )));
        }
        Ok(())
    }

    async fn check_capacity(&self, current: usize, adding: usize) -> Result<()> {
        if let Some(max) = self.config.read().await.max_issues {
            if current + adding > max {
                return Err(TriageError::Storage(format!(
                    "Memory store at capacity limit of {max} issues"
                )));
            }
        }
        Ok(())
    }
}

impl Default for InMemoryIssueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IssueStore for InMemoryIssueStore {
    async fn insert(&self, issue: Issue) -> Result<Issue> {
        self.enter(|c| c.fail_insert, "insert").await?;
        let mut state = self.state.write().await;
        state.check_new(&issue.id)?;
        self.check_capacity(state.issues.len(), 1).await?;
        state.issues.insert(issue.id.clone(), issue.clone());
        Ok(issue)
    }

    async fn insert_many(&self, issues: Vec<Issue>) -> Result<Vec<Issue>> {
        self.enter(|c| c.fail_insert, "insert").await?;
        let mut state = self.state.write().await;

        let mut batch = HashSet::new();
        for issue in &issues {
            state.check_new(&issue.id)?;
            if !batch.insert(&issue.id) {
                return Err(TriageError::DuplicateIssueId(issue.id.to_string()));
            }
        }
        self.check_capacity(state.issues.len(), issues.len()).await?;

        for issue in &issues {
            state.issues.insert(issue.id.clone(), issue.clone());
        }
        Ok(issues)
    }

    async fn get_by_id(&self, id: &IssueId) -> Result<Option<Issue>> {
        self.enter(|c| c.fail_get, "get").await?;
        Ok(self.state.read().await.issues.get(id).cloned())
    }

    async fn query(
        &self,
        filter: &IssueFilter,
        sort: SortSpec,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Issue>> {
        self.enter(|c| c.fail_query, "query").await?;
        let state = self.state.read().await;
        Ok(select(
            state.issues.values().cloned(),
            filter,
            sort,
            offset,
            limit,
        ))
    }

    async fn count(&self, filter: &IssueFilter) -> Result<usize> {
        self.enter(|c| c.fail_query, "count").await?;
        let state = self.state.read().await;
        Ok(state.issues.values().filter(|i| filter.matches(i)).count())
    }

    async fn snapshot(
        &self,
        filter: &IssueFilter,
        sort: SortSpec,
        offset: usize,
        limit: usize,
    ) -> Result<QuerySnapshot> {
        self.enter(|c| c.fail_query, "query").await?;
        let state = self.state.read().await;
        Ok(snapshot_of(
            state.issues.values(),
            filter,
            sort,
            offset,
            limit,
        ))
    }

    async fn update(&self, issue: Issue) -> Result<Issue> {
        self.enter(|c| c.fail_update, "update").await?;
        let mut state = self.state.write().await;
        match state.issues.get_mut(&issue.id) {
            Some(stored) => {
                *stored = issue.clone();
                Ok(issue)
            }
            None => Err(TriageError::issue_not_found(&issue.id)),
        }
    }

    async fn delete(&self, id: &IssueId) -> Result<bool> {
        self.enter(|c| c.fail_delete, "delete").await?;
        let mut state = self.state.write().await;
        if state.issues.remove(id).is_some() {
            state.retired.insert(id.clone());
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn list_all(&self) -> Result<Vec<Issue>> {
        self.enter(|c| c.fail_list, "list").await?;
        Ok(self.state.read().await.issues.values().cloned().collect())
    }

    async fn id_taken(&self, id: &IssueId) -> Result<bool> {
        self.enter(|c| c.fail_get, "get").await?;
        let state = self.state.read().await;
        Ok(state.issues.contains_key(id) || state.retired.contains(id))
    }
}
