//! Error types for mutation testing

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a mutation run
///
/// Trial-level problems (a harness that cannot start, an ambiguous failure)
/// are not errors; they are recorded as `Errored` outcomes instead.
#[derive(Debug, Error)]
pub enum MutationError {
    /// Failed to read source or test file
    #[error("Failed to read file '{}': {error}", file.display())]
    FileReadError { file: PathBuf, error: String },

    /// Failed to parse source file as Rust
    #[error("Failed to parse '{}' as Rust: {error}", file.display())]
    ParseError { file: PathBuf, error: String },

    /// Path has no file name component
    #[error("'{}' does not name a file", file.display())]
    NotAFile { file: PathBuf },

    /// Transient workspace could not be created, emptied or removed
    #[error("Workspace error: {error}")]
    WorkspaceError { error: String },

    /// Failed to write a file into the workspace
    #[error("Failed to write '{}': {error}", file.display())]
    WriteError { file: PathBuf, error: String },

    /// Operator asked to mutate a node outside its swap table
    #[error("Operator '{operator}' does not support '{found}' (candidate #{candidate})")]
    UnsupportedOperator {
        operator: String,
        found: String,
        candidate: usize,
    },

    /// Failed to locate or apply/revert a mutation
    #[error("Failed to apply mutation: {reason}")]
    FailedToApply { reason: String },

    /// Tree did not render identically after a revert
    #[error("Source did not restore after reverting candidate #{candidate} ({snippet})")]
    RestoreMismatch { candidate: usize, snippet: String },

    /// Unmutated sources already fail the test suite
    #[error("Baseline test run failed on unmutated sources:\n{output}")]
    BaselineFailed { output: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

/// Result type for mutation operations
pub type Result<T> = std::result::Result<T, MutationError>;
