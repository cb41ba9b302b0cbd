//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),

    #[error("{failed} of {total} stands failed")]
    BatchFailed { failed: usize, total: usize },
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Exit code for an application error.
pub fn application_exit_code(e: &ApplicationError) -> i32 {
    match e {
        ApplicationError::Domain(_) => exitcode::DATAERR,
        ApplicationError::Upstream { .. } => exitcode::UNAVAILABLE,
        ApplicationError::Config { .. } => exitcode::CONFIG,
        ApplicationError::OperationFailed { .. } => exitcode::IOERR,
    }
}

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => exitcode::USAGE,
            CliError::BatchFailed { .. } => exitcode::DATAERR,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => exitcode::IOERR,
                InfraError::Http { .. } => exitcode::SOFTWARE,
                InfraError::Application(e) => application_exit_code(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainError, StandIdentity};
    use crate::infrastructure::traits::UpstreamError;

    #[test]
    fn given_domain_error_when_mapping_then_dataerr() {
        let err: CliError = ApplicationError::from(DomainError::InputMismatch {
            stand: StandIdentity::new("1", "2", "3"),
            aois: 2,
            tree_sets: 1,
        })
        .into();
        assert_eq!(err.exit_code(), exitcode::DATAERR);
    }

    #[test]
    fn given_upstream_error_when_mapping_then_unavailable() {
        let err: CliError = ApplicationError::Upstream {
            stand: StandIdentity::new("1", "2", "3"),
            source: UpstreamError::Status {
                endpoint: "/filepath".into(),
                status: 500,
                body: String::new(),
            },
        }
        .into();
        assert_eq!(err.exit_code(), exitcode::UNAVAILABLE);
    }

    #[test]
    fn given_config_error_when_mapping_then_config() {
        let err: CliError = ApplicationError::Config {
            message: "bad".into(),
        }
        .into();
        assert_eq!(err.exit_code(), exitcode::CONFIG);
    }

    #[test]
    fn given_usage_error_when_mapping_then_usage() {
        assert_eq!(CliError::Usage("x".into()).exit_code(), exitcode::USAGE);
    }
}
