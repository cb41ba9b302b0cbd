//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::entities::StandIdentity;

/// Failure measuring a single geometry layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("geometry is empty")]
    Empty,

    #[error("invalid geometry: {reason}")]
    Invalid { reason: String },

    #[error("cannot reproject geometry: {reason}")]
    Unprojectable { reason: String },

    #[error("expected a single feature, found {count}")]
    MultipleFeatures { count: usize },
}

/// Domain errors represent estimation failures for one stand.
/// Every variant tied to a stand names it, so batch runs can report failures independently.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("{stand}: mismatched number of AOIs ({aois}) and tree sets ({tree_sets})")]
    InputMismatch {
        stand: StandIdentity,
        aois: usize,
        tree_sets: usize,
    },

    #[error("{stand}: insufficient data: {reason}")]
    InsufficientData {
        stand: StandIdentity,
        reason: String,
    },

    #[error("{stand}: plot {plot}: {source}")]
    Geometry {
        stand: StandIdentity,
        plot: usize,
        #[source]
        source: GeometryError,
    },

    #[error("{stand}: total validated acreage is {total_acres}, cannot compute trees per acre")]
    DivisionByZero {
        stand: StandIdentity,
        total_acres: f64,
    },

    #[error("{stand}: invalid stand acreage {acres}")]
    InvalidStandAcreage { stand: StandIdentity, acres: f64 },

    #[error("confidence level must lie strictly between 0 and 1, got {0}")]
    InvalidConfidenceLevel(f64),
}

impl DomainError {
    /// Stand the error occurred for, if any.
    pub fn stand(&self) -> Option<&StandIdentity> {
        match self {
            DomainError::InputMismatch { stand, .. }
            | DomainError::InsufficientData { stand, .. }
            | DomainError::Geometry { stand, .. }
            | DomainError::DivisionByZero { stand, .. }
            | DomainError::InvalidStandAcreage { stand, .. } => Some(stand),
            DomainError::InvalidConfidenceLevel(_) => None,
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
