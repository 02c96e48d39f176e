//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::{DomainError, FragmentKind};

/// Application errors wrap domain errors and add pipeline-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("documentation generator unavailable: {reason}")]
    CollaboratorUnavailable { reason: String },

    #[error("generating {kind} failed: {message}")]
    Generation { kind: FragmentKind, message: String },

    #[error("{context}")]
    Filesystem {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("render failed: {message}")]
    Render {
        message: String,
        /// `None` when the renderer never started or was killed by a signal
        exit_code: Option<i32>,
        /// Output captured before the failure, empty when spawning failed
        output: String,
        spawned: bool,
    },

    #[error("config error: {message}")]
    Config { message: String },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
