//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::{DomainError, StandIdentity};
use crate::infrastructure::traits::UpstreamError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{stand}: upstream service failed: {source}")]
    Upstream {
        stand: StandIdentity,
        #[source]
        source: UpstreamError,
    },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("{context}: {source}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    /// Wrap a collaborator failure with the stand it was serving.
    pub fn upstream(stand: &StandIdentity) -> impl FnOnce(UpstreamError) -> Self + '_ {
        move |source| Self::Upstream {
            stand: stand.clone(),
            source,
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
