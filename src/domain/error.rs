//! Domain-level errors (no external dependencies)

use std::path::PathBuf;
use thiserror::Error;

/// Domain errors represent violations of the build layout rules.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("cannot resolve repository root from {path}: {reason}")]
    PathResolution { path: PathBuf, reason: String },

    #[error("invalid layout for {field}: {reason}")]
    InvalidLayout { field: &'static str, reason: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
