//! # Triage
//!
//! An issue-tracking core: validated issue records, pluggable storage,
//! filtered and paginated listing, and transport-neutral request handlers.
//!
//! ## Features
//!
//! - **Issues**: create, read, partially update, delete and bulk-create
//! - **Listing**: free-text search, multi-value filters, sorting, pagination
//!   and filter-option metadata
//! - **Storage**: an in-memory store and a single-document JSON file store
//!   behind one async trait
//! - **API**: status codes and camelCase JSON bodies for any transport
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use triage::prelude::*;
//!
//! # async fn example() -> triage::Result<()> {
//! let config = Config::load();
//! let store = Arc::new(FileSystemIssueStore::from_config(&config));
//! let api = IssueApi::new(IssueService::new(store, config));
//!
//! let response = api
//!     .create(serde_json::json!({ "title": "Search is slow", "priority": "high" }))
//!     .await;
//! assert_eq!(response.status, 201);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

/// Transport-neutral request handlers
pub mod api;

/// Configuration loading and validation
pub mod config;

/// Error types and context helpers
pub mod error;

/// Issue records, validation, storage, querying and the service
pub mod issues;

pub use api::{ApiResponse, IssueApi};
pub use config::Config;
pub use error::{Result, TriageError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::api::{ApiResponse, IssueApi, IssueResponse};
    pub use crate::config::Config;
    pub use crate::error::{ErrorContext, Result, TriageError};
    pub use crate::issues::{
        FileSystemIssueStore, InMemoryIssueStore, Issue, IssueDraft, IssueId, IssuePatch,
        IssuePriority, IssueService, IssueStatus, IssueStore, ListIssuesQuery,
    };
}
