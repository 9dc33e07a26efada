//! Error handling for the triage CLI
//!
//! Errors keep their cause chain and carry the exit code the process should
//! end with.

use crate::exit_codes::{EXIT_FAILURE, EXIT_INVALID_INPUT, EXIT_SUCCESS};
use std::error::Error;
use std::fmt;
use triage::ApiResponse;

/// CLI-specific result type that preserves error information
pub type CliResult<T> = Result<T, CliError>;

/// CLI error type that includes both error information and suggested exit code
#[derive(Debug)]
pub struct CliError {
    pub message: String,
    pub exit_code: i32,
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl CliError {
    /// Create a new CLI error with a message and exit code
    pub fn new(message: impl Into<String>, exit_code: i32) -> Self {
        Self {
            message: message.into(),
            exit_code,
            source: None,
        }
    }

    /// Create a CLI error from another error with a specific exit code
    pub fn from_error<E: Error + Send + Sync + 'static>(error: E, exit_code: i32) -> Self {
        Self {
            message: error.to_string(),
            exit_code,
            source: Some(Box::new(error)),
        }
    }

    /// Create a CLI error with exit code 1 (general error)
    pub fn general<E: Error + Send + Sync + 'static>(error: E) -> Self {
        Self::from_error(error, EXIT_FAILURE)
    }

    /// Create a CLI error with exit code 2 (rejected input)
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(message, EXIT_INVALID_INPUT)
    }

    /// Turn an error envelope from the API layer into a CLI error
    pub fn from_response(response: &ApiResponse) -> Self {
        let error = &response.body["error"];
        let message = error["message"]
            .as_str()
            .unwrap_or("Request failed")
            .to_string();

        match response.status {
            422 => {
                let field = error["field"].as_str().unwrap_or("input");
                Self::new(format!("{field}: {message}"), EXIT_INVALID_INPUT)
            }
            404 => Self::new(message, EXIT_FAILURE),
            _ => match error["details"].as_str() {
                Some(details) => Self::new(format!("{message}: {details}"), EXIT_FAILURE),
                None => Self::new(message, EXIT_FAILURE),
            },
        }
    }

    /// Get the full error chain as a formatted string
    pub fn full_chain(&self) -> String {
        let mut result = self.message.clone();

        let mut current_source = self.source();
        while let Some(err) = current_source {
            result.push_str(&format!("\n  Caused by: {}", err));
            current_source = err.source();
        }

        result
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

impl From<anyhow::Error> for CliError {
    fn from(error: anyhow::Error) -> Self {
        let message = format!("{error:#}");
        Self {
            message,
            exit_code: EXIT_FAILURE,
            source: Some(error.into()),
        }
    }
}

/// Extension trait for converting results to CLI results
pub trait IntoCliResult<T> {
    fn cli_error(self, exit_code: i32) -> CliResult<T>;
    fn cli_general_error(self) -> CliResult<T>;
}

impl<T, E: Error + Send + Sync + 'static> IntoCliResult<T> for Result<T, E> {
    fn cli_error(self, exit_code: i32) -> CliResult<T> {
        self.map_err(|e| CliError::from_error(e, exit_code))
    }

    fn cli_general_error(self) -> CliResult<T> {
        self.map_err(CliError::general)
    }
}

/// Convert a CliResult to an exit code, printing the full error chain if needed
pub fn handle_cli_result<T>(result: CliResult<T>) -> i32 {
    match result {
        Ok(_) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e.full_chain());
            e.exit_code
        }
    }
}
