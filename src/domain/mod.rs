//! Domain layer: entities and estimation logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod aggregate;
pub mod entities;
pub mod error;
pub mod estimate;
pub mod geometry;
pub mod projection;
pub mod report;

pub use aggregate::{ensure_paired, PlotAggregator};
pub use entities::*;
pub use error::{DomainError, DomainResult, GeometryError};
pub use estimate::{estimate, z_score};
pub use geometry::{
    AoiLayer, GeometryMeasurer, MultiFeaturePolicy, PlotBoundary, TreeFeatures, TreeLayer,
    SQ_METERS_PER_ACRE,
};
pub use projection::Projection;
pub use report::{build_plot_data, chart_title, format_report};
