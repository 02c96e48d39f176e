//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        CliError::from(ApplicationError::Domain(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        use crate::exitcode;

        match self {
            CliError::Usage(_) => exitcode::USAGE,
            CliError::Infra(InfraError::Io { .. }) => exitcode::IOERR,
            CliError::Infra(InfraError::Application(e)) => match e {
                ApplicationError::Domain(_) | ApplicationError::Config { .. } => exitcode::CONFIG,
                ApplicationError::CollaboratorUnavailable { .. } => exitcode::UNAVAILABLE,
                ApplicationError::Generation { .. } => exitcode::SOFTWARE,
                ApplicationError::Filesystem { .. } => exitcode::IOERR,
                ApplicationError::Render { spawned: false, .. } => exitcode::OSERR,
                ApplicationError::Render { .. } => exitcode::SOFTWARE,
            },
        }
    }

    /// Output the renderer produced before failing, if any.
    pub fn render_output(&self) -> Option<&str> {
        match self {
            CliError::Infra(InfraError::Application(ApplicationError::Render { output, .. }))
                if !output.is_empty() =>
            {
                Some(output.as_str())
            }
            _ => None,
        }
    }
}
