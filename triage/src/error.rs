//! Unified error handling for the Triage library
//!
//! Every fallible operation in the crate returns [`Result`], whose error side is
//! [`TriageError`]. The variants fall into three groups that callers treat
//! differently:
//!
//! - **Validation**: the caller sent something malformed; fixable by the user.
//! - **Not found**: the referenced issue does not exist.
//! - **Everything else**: storage, IO and serialization failures that the
//!   caller cannot fix and that are surfaced as server errors.

use crate::config::ConfigError;
use std::fmt;
use std::io;
use thiserror::Error;

/// The main error type for the Triage library
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TriageError {
    /// Input failed a field constraint
    #[error("Invalid value for field '{field}': {reason}")]
    Validation {
        /// Name of the offending field, as seen by the client
        field: String,
        /// Human readable explanation of the violated constraint
        reason: String,
    },

    /// Issue not found
    #[error("Issue with ID '{0}' not found")]
    IssueNotFound(String),

    /// An insert collided with a live or retired issue id
    #[error("Issue ID '{0}' is already taken")]
    DuplicateIssueId(String),

    /// Storage backend error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Generic error with context
    #[error("{message}")]
    Context {
        /// What was being attempted
        message: String,
        /// The underlying failure
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl TriageError {
    /// Build a validation error for `field`
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Build a not-found error for an issue id
    pub fn issue_not_found(id: impl fmt::Display) -> Self {
        Self::IssueNotFound(id.to_string())
    }

    /// Whether this error is a user-fixable validation failure
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Whether this error means the referenced issue does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::IssueNotFound(_))
    }

    /// Prefix the field path of a validation error, e.g. `title` -> `issues[2].title`.
    ///
    /// Other variants pass through unchanged.
    pub fn within(self, prefix: &str) -> Self {
        match self {
            Self::Validation { field, reason } => Self::Validation {
                field: format!("{prefix}.{field}"),
                reason,
            },
            other => other,
        }
    }
}

/// Result type alias for Triage operations
pub type Result<T> = std::result::Result<T, TriageError>;

/// Extension trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context<S: Into<String>>(self, msg: S) -> Result<T>;

    /// Add context with a closure that's only called on error
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<S: Into<String>>(self, msg: S) -> Result<T> {
        self.map_err(|e| TriageError::Context {
            message: msg.into(),
            source: Box::new(e),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| TriageError::Context {
            message: f().into(),
            source: Box::new(e),
        })
    }
}

/// Error chain formatter for detailed error reporting
pub struct ErrorChain<'a>(&'a dyn std::error::Error);

impl fmt::Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error: {}", self.0)?;

        let mut current = self.0.source();
        let mut level = 1;

        while let Some(err) = current {
            writeln!(f, "{:indent$}Caused by: {}", "", err, indent = level * 2)?;
            current = err.source();
            level += 1;
        }

        Ok(())
    }
}

/// Extension trait for error types to format the full error chain
pub trait ErrorChainExt {
    /// Format the full error chain
    fn error_chain(&self) -> ErrorChain<'_>;
}

impl<E: std::error::Error> ErrorChainExt for E {
    fn error_chain(&self) -> ErrorChain<'_> {
        ErrorChain(self)
    }
}
