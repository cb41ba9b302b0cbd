//! Domain entities: core data structures

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// Opaque identifiers that together address one survey unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StandIdentity {
    pub client_id: String,
    pub project_id: String,
    pub stand_id: String,
}

impl StandIdentity {
    pub fn new(
        client_id: impl Into<String>,
        project_id: impl Into<String>,
        stand_id: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            project_id: project_id.into(),
            stand_id: stand_id.into(),
        }
    }
}

impl fmt::Display for StandIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.client_id, self.project_id, self.stand_id)
    }
}

/// Parses `client/project/stand`.
impl FromStr for StandIdentity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').map(str::trim).collect();
        match parts.as_slice() {
            [client, project, stand]
                if !client.is_empty() && !project.is_empty() && !stand.is_empty() =>
            {
                Ok(Self::new(*client, *project, *stand))
            }
            _ => Err(format!("expected CLIENT/PROJECT/STAND, got '{}'", s)),
        }
    }
}

/// Measurement of one validation plot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotObservation {
    pub validated_acres: f64,
    pub tree_count: u64,
}

/// Stand-level sums and means over all plot observations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateMetrics {
    pub total_validated_acres: f64,
    pub total_trees: u64,
    pub plot_tree_average: f64,
}

/// Requested two-sided confidence level, strictly inside (0, 1).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ConfidenceLevel(f64);

impl ConfidenceLevel {
    pub const DEFAULT: f64 = 0.95;

    pub fn new(level: f64) -> Result<Self, DomainError> {
        if level.is_finite() && level > 0.0 && level < 1.0 {
            Ok(Self(level))
        } else {
            Err(DomainError::InvalidConfidenceLevel(level))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for ConfidenceLevel {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

/// Final stand estimate.
///
/// `confidence_interval` is the upper bound of the interval around the mean
/// per-plot tree count, not a margin on `tpa`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TpaReport {
    pub tpa: f64,
    pub confidence_interval: f64,
    pub confidence_level: f64,
}

/// Positional series for the diagnostic chart.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PlotData {
    pub indices: Vec<usize>,
    pub acreages: Vec<f64>,
    pub tree_counts: Vec<u64>,
}

impl PlotData {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
