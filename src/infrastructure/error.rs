//! Infrastructure-level errors (wraps application errors)

use thiserror::Error;

use crate::application::ApplicationError;

/// Infrastructure errors wrap application errors and add I/O-level concerns.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl InfraError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Failures reported by a fragment generator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    /// The generator cannot be located or started.
    #[error("{0}")]
    Unavailable(String),

    /// The generator ran and reported a failure.
    #[error("{0}")]
    Failed(String),
}
