//! Exit code constants for CLI commands
//!
//! - 0: Success
//! - 1: The command failed (missing issue, storage or IO trouble)
//! - 2: The input was rejected (validation, malformed import file)

/// Successful execution
pub const EXIT_SUCCESS: i32 = 0;

/// General failure, including a referenced issue that does not exist
pub const EXIT_FAILURE: i32 = 1;

/// Input that failed validation
pub const EXIT_INVALID_INPUT: i32 = 2;
