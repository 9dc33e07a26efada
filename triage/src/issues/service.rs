//! Issue lifecycle orchestration
//!
//! [`IssueService`] owns the identity and timestamp rules. It assigns ids,
//! stamps `created_at`/`updated_at`, applies partial updates and hands the
//! result to the [`IssueStore`]. Every mutating call has committed its store
//! write before it returns.

use crate::config::Config;
use crate::error::{Result, TriageError};
use crate::issues::query::{IssuePage, IssueQueryEngine, ListIssuesQuery};
use crate::issues::storage::IssueStore;
use crate::issues::validation::{IssueChanges, IssueDraft, IssuePatch, IssueValidator, NewIssue};
use crate::issues::{Issue, IssueId};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Create, read, update, delete and list issues over a store
pub struct IssueService<S: IssueStore + ?Sized> {
    store: Arc<S>,
    config: Config,
}

impl<S: IssueStore + ?Sized> Clone for IssueService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: IssueStore + ?Sized> IssueService<S> {
    /// Create a service over `store`
    pub fn new(store: Arc<S>, config: Config) -> Self {
        Self { store, config }
    }

    /// The configuration the service validates and paginates with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Fetch one issue
    pub async fn get(&self, id: &IssueId) -> Result<Issue> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| TriageError::issue_not_found(id))
    }

    /// Store a validated issue under a fresh id
    pub async fn create(&self, new: NewIssue) -> Result<Issue> {
        let now = Utc::now();

        for attempt in 1..=self.config.max_id_attempts {
            let id = IssueId::generate(&self.config.id_prefix);
            if self.store.id_taken(&id).await? {
                debug!("Id {} already taken (attempt {})", id, attempt);
                continue;
            }
            match self.store.insert(Issue::from_new(id, new.clone(), now)).await {
                Ok(stored) => {
                    info!("Created issue {}: {}", stored.id, stored.title);
                    return Ok(stored);
                }
                Err(TriageError::DuplicateIssueId(id)) => {
                    debug!("Id {} taken concurrently (attempt {})", id, attempt);
                }
                Err(e) => return Err(e),
            }
        }

        Err(self.exhausted_ids())
    }

    /// Apply a validated partial update
    pub async fn update(&self, id: &IssueId, changes: IssueChanges) -> Result<Issue> {
        let mut issue = self.get(id).await?;
        issue.apply_changes(changes, Utc::now());
        let stored = self.store.update(issue).await?;
        info!("Updated issue {}", stored.id);
        Ok(stored)
    }

    /// Remove an issue; its id is never handed out again
    pub async fn delete(&self, id: &IssueId) -> Result<()> {
        if self.store.delete(id).await? {
            info!("Deleted issue {}", id);
            Ok(())
        } else {
            Err(TriageError::issue_not_found(id))
        }
    }

    /// Store several validated issues at once; all are stored or none
    pub async fn bulk_create(&self, batch: Vec<NewIssue>) -> Result<Vec<Issue>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        for attempt in 1..=self.config.max_id_attempts {
            let ids = self.fresh_ids(batch.len()).await?;
            let now = Utc::now();
            let issues: Vec<Issue> = ids
                .into_iter()
                .zip(batch.iter().cloned())
                .map(|(id, new)| Issue::from_new(id, new, now))
                .collect();

            match self.store.insert_many(issues).await {
                Ok(stored) => {
                    info!("Created {} issues in bulk", stored.len());
                    return Ok(stored);
                }
                Err(TriageError::DuplicateIssueId(id)) => {
                    debug!("Bulk id {} taken concurrently (attempt {})", id, attempt);
                }
                Err(e) => return Err(e),
            }
        }

        Err(self.exhausted_ids())
    }

    /// Filter, sort and paginate
    pub async fn list(&self, query: &ListIssuesQuery) -> Result<IssuePage> {
        IssueQueryEngine::new(self.store.as_ref(), &self.config)
            .run(query)
            .await
    }

    /// Validate a raw create request, then [`create`](Self::create) it
    pub async fn create_from_draft(&self, draft: IssueDraft) -> Result<Issue> {
        let new = IssueValidator::new(&self.config).validate_draft(draft)?;
        self.create(new).await
    }

    /// Validate a raw update request, then [`update`](Self::update) with it
    pub async fn update_from_patch(&self, id: &IssueId, patch: IssuePatch) -> Result<Issue> {
        let changes = IssueValidator::new(&self.config).validate_patch(patch)?;
        self.update(id, changes).await
    }

    /// Validate every draft, then [`bulk_create`](Self::bulk_create) them.
    ///
    /// The first invalid draft rejects the batch; its field is reported as
    /// `issues[<index>].<field>`.
    pub async fn bulk_create_from_drafts(&self, drafts: Vec<IssueDraft>) -> Result<Vec<Issue>> {
        let validator = IssueValidator::new(&self.config);
        let batch = drafts
            .into_iter()
            .enumerate()
            .map(|(index, draft)| {
                validator
                    .validate_draft(draft)
                    .map_err(|e| e.within(&format!("issues[{index}]")))
            })
            .collect::<Result<Vec<_>>>()?;
        self.bulk_create(batch).await
    }

    /// Draw `count` ids that are distinct from each other and unused in the store
    async fn fresh_ids(&self, count: usize) -> Result<Vec<IssueId>> {
        let mut ids = Vec::with_capacity(count);
        let mut seen = HashSet::with_capacity(count);
        while ids.len() < count {
            let mut assigned = false;
            for _ in 0..self.config.max_id_attempts {
                let id = IssueId::generate(&self.config.id_prefix);
                if seen.contains(&id) || self.store.id_taken(&id).await? {
                    continue;
                }
                seen.insert(id.clone());
                ids.push(id);
                assigned = true;
                break;
            }
            if !assigned {
                return Err(self.exhausted_ids());
            }
        }
        Ok(ids)
    }

    fn exhausted_ids(&self) -> TriageError {
        warn!(
            "Gave up generating an issue id after {} attempts",
            self.config.max_id_attempts
        );
        TriageError::Storage(format!(
            "Could not generate a unique issue id after {} attempts",
            self.config.max_id_attempts
        ))
    }
}
