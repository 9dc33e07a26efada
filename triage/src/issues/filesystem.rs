//! Filesystem issue store
//!
//! All issues live in a single pretty-printed JSON document:
//!
//! ```json
//! {
//!   "issues": [ { "id": "iss-1a2b3c4d", "title": "...", ... } ],
//!   "retired_ids": [ "iss-00c0ffee" ]
//! }
//! ```
//!
//! Every mutation takes an exclusive lock on a sibling `issues.json.lock`
//! file, loads the document, changes it, writes it to a uniquely named
//! temporary file in the same directory and renames that over the original.
//! The lock serializes writers across store instances and across processes;
//! the rename means readers see either the old document or the new one, never
//! a partial write. Reads load the file fresh on every call.
//!
//! A missing document is an empty store; the file and its directory are
//! created on the first write.

use crate::config::Config;
use crate::error::{ErrorContext, Result, TriageError};
use crate::issues::query::{IssueFilter, SortSpec};
use crate::issues::storage::{select, snapshot_of, IssueStore, QuerySnapshot};
use crate::issues::{Issue, IssueId};
use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Default, Serialize, Deserialize)]
struct IssueDocument {
    #[serde(default)]
    issues: Vec<Issue>,
    #[serde(default)]
    retired_ids: Vec<IssueId>,
}

impl IssueDocument {
    fn id_taken(&self, id: &IssueId) -> bool {
        self.issues.iter().any(|i| &i.id == id) || self.retired_ids.contains(id)
    }
}

/// Held for the whole load-modify-save of one mutation
struct WriteGuard<'a> {
    _local: MutexGuard<'a, ()>,
    file: File,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        // Closing the file releases the lock too
        let _ = FileExt::unlock(&self.file);
    }
}

/// An [`IssueStore`] backed by one JSON file
pub struct FileSystemIssueStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSystemIssueStore {
    /// Create a store over the document at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Create a store over the configured data directory
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.issues_file())
    }

    /// Location of the backing document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location of the file writers lock
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    fn directory(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    async fn lock(&self) -> Result<WriteGuard<'_>> {
        let local = self.write_lock.lock().await;

        let directory = self.directory().to_path_buf();
        tokio::fs::create_dir_all(&directory)
            .await
            .with_context(|| format!("Failed to create '{}'", directory.display()))?;

        let lock_path = self.lock_path();
        let file = tokio::task::spawn_blocking(move || -> std::io::Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(false)
                .open(&lock_path)?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(|e| TriageError::Storage(format!("Lock task failed: {e}")))?
        .with_context(|| format!("Failed to lock '{}'", self.lock_path().display()))?;

        Ok(WriteGuard {
            _local: local,
            file,
        })
    }

    async fn load(&self) -> Result<IssueDocument> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(IssueDocument::default()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read '{}'", self.path.display()))
            }
        };
        if content.trim().is_empty() {
            return Ok(IssueDocument::default());
        }
        serde_json::from_str(&content).map_err(|e| {
            TriageError::Storage(format!(
                "Issue document '{}' is corrupt: {e}",
                self.path.display()
            ))
        })
    }

    /// Replace the document. Callers hold the [`WriteGuard`].
    async fn save(&self, document: &IssueDocument) -> Result<()> {
        let content = serde_json::to_string_pretty(document)?;
        let directory = self.directory().to_path_buf();
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || replace_file(&directory, &path, content.as_bytes()))
            .await
            .map_err(|e| TriageError::Storage(format!("Write task failed: {e}")))??;

        debug!(
            "Saved {} issues to {}",
            document.issues.len(),
            self.path.display()
        );
        Ok(())
    }
}

fn replace_file(directory: &Path, path: &Path, content: &[u8]) -> Result<()> {
    let mut temp = NamedTempFile::new_in(directory)
        .with_context(|| format!("Failed to create a temporary file in '{}'", directory.display()))?;
    temp.write_all(content)
        .and_then(|()| temp.as_file().sync_all())
        .with_context(|| format!("Failed to write '{}'", temp.path().display()))?;
    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to move the new document into place at '{}'", path.display()))?;
    Ok(())
}

#[async_trait]
impl IssueStore for FileSystemIssueStore {
    async fn insert(&self, issue: Issue) -> Result<Issue> {
        let _guard = self.lock().await?;
        let mut document = self.load().await?;
        if document.id_taken(&issue.id) {
            return Err(TriageError::DuplicateIssueId(issue.id.to_string()));
        }
        document.issues.push(issue.clone());
        self.save(&document).await?;
        Ok(issue)
    }

    async fn insert_many(&self, issues: Vec<Issue>) -> Result<Vec<Issue>> {
        let _guard = self.lock().await?;
        let mut document = self.load().await?;

        let mut batch = HashSet::new();
        for issue in &issues {
            if document.id_taken(&issue.id) || !batch.insert(&issue.id) {
                return Err(TriageError::DuplicateIssueId(issue.id.to_string()));
            }
        }

        document.issues.extend(issues.iter().cloned());
        self.save(&document).await?;
        Ok(issues)
    }

    async fn get_by_id(&self, id: &IssueId) -> Result<Option<Issue>> {
        let document = self.load().await?;
        Ok(document.issues.into_iter().find(|i| &i.id == id))
    }

    async fn query(
        &self,
        filter: &IssueFilter,
        sort: SortSpec,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Issue>> {
        let document = self.load().await?;
        Ok(select(
            document.issues.into_iter(),
            filter,
            sort,
            offset,
            limit,
        ))
    }

    async fn count(&self, filter: &IssueFilter) -> Result<usize> {
        let document = self.load().await?;
        Ok(document.issues.iter().filter(|i| filter.matches(i)).count())
    }

    async fn snapshot(
        &self,
        filter: &IssueFilter,
        sort: SortSpec,
        offset: usize,
        limit: usize,
    ) -> Result<QuerySnapshot> {
        let document = self.load().await?;
        Ok(snapshot_of(
            document.issues.iter(),
            filter,
            sort,
            offset,
            limit,
        ))
    }

    async fn update(&self, issue: Issue) -> Result<Issue> {
        let _guard = self.lock().await?;
        let mut document = self.load().await?;
        let stored = document
            .issues
            .iter_mut()
            .find(|i| i.id == issue.id)
            .ok_or_else(|| TriageError::issue_not_found(&issue.id))?;
        *stored = issue.clone();
        self.save(&document).await?;
        Ok(issue)
    }

    async fn delete(&self, id: &IssueId) -> Result<bool> {
        let _guard = self.lock().await?;
        let mut document = self.load().await?;
        let before = document.issues.len();
        document.issues.retain(|i| &i.id != id);
        if document.issues.len() == before {
            return Ok(false);
        }
        document.retired_ids.push(id.clone());
        self.save(&document).await?;
        Ok(true)
    }

    async fn list_all(&self) -> Result<Vec<Issue>> {
        Ok(self.load().await?.issues)
    }

    async fn id_taken(&self, id: &IssueId) -> Result<bool> {
        Ok(self.load().await?.id_taken(id))
    }
}
