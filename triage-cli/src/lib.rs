//! Triage CLI Library
//!
//! Command-line definitions, issue subcommands, error handling and exit codes
//! for the `triage` binary.

/// Command-line interface definitions and argument parsing
pub mod cli;
/// Errors that carry an exit code
pub mod error;
/// Exit codes used by the CLI application
pub mod exit_codes;
/// Issue subcommand handlers and output rendering
pub mod issue;
