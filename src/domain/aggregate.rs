//! Pairs AOIs with tree layers and aggregates per-plot measurements.

use itertools::Itertools;
use tracing::debug;

use crate::domain::entities::{AggregateMetrics, PlotObservation, StandIdentity};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::geometry::{GeometryMeasurer, PlotBoundary, TreeFeatures};

/// Fail fast when the AOI and tree sequences cannot be paired by index.
pub fn ensure_paired(stand: &StandIdentity, aois: usize, tree_sets: usize) -> DomainResult<()> {
    if aois != tree_sets {
        return Err(DomainError::InputMismatch {
            stand: stand.clone(),
            aois,
            tree_sets,
        });
    }
    Ok(())
}

impl AggregateMetrics {
    /// Sums and mean over all observations, zero-tree plots included.
    pub fn from_observations(
        stand: &StandIdentity,
        observations: &[PlotObservation],
    ) -> DomainResult<Self> {
        if observations.is_empty() {
            return Err(DomainError::InsufficientData {
                stand: stand.clone(),
                reason: "no validation plots".to_string(),
            });
        }
        let total_validated_acres: f64 = observations.iter().map(|o| o.validated_acres).sum();
        let total_trees: u64 = observations.iter().map(|o| o.tree_count).sum();
        let plot_tree_average = total_trees as f64 / observations.len() as f64;

        Ok(Self {
            total_validated_acres,
            total_trees,
            plot_tree_average,
        })
    }
}

/// Builds the per-plot table for a stand.
pub struct PlotAggregator<'a> {
    measurer: &'a GeometryMeasurer,
}

impl<'a> PlotAggregator<'a> {
    pub fn new(measurer: &'a GeometryMeasurer) -> Self {
        Self { measurer }
    }

    /// Measure every plot, preserving input order, and compute stand metrics.
    pub fn aggregate<B, T>(
        &self,
        stand: &StandIdentity,
        aois: &[B],
        tree_sets: &[T],
    ) -> DomainResult<(Vec<PlotObservation>, AggregateMetrics)>
    where
        B: PlotBoundary,
        T: TreeFeatures,
    {
        ensure_paired(stand, aois.len(), tree_sets.len())?;

        let observations = aois
            .iter()
            .zip_eq(tree_sets)
            .enumerate()
            .map(|(plot, (aoi, trees))| {
                let validated_acres = self.measurer.measure_acreage(aoi).map_err(|source| {
                    DomainError::Geometry {
                        stand: stand.clone(),
                        plot,
                        source,
                    }
                })?;
                let tree_count = self.measurer.count_points(trees);
                debug!(
                    "{}: plot {} acres={:.4} trees={}",
                    stand, plot, validated_acres, tree_count
                );
                Ok(PlotObservation {
                    validated_acres,
                    tree_count,
                })
            })
            .collect::<DomainResult<Vec<_>>>()?;

        let metrics = AggregateMetrics::from_observations(stand, &observations)?;
        Ok((observations, metrics))
    }
}
