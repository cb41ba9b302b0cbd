//! Stand TPA estimation service
//!
//! Drives one stand through lookup, measurement, estimation, reporting and
//! persistence. Every failure aborts that stand's run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{
    build_plot_data, chart_title, ensure_paired, estimate, format_report, AggregateMetrics,
    AoiLayer, ConfidenceLevel, DomainError, PlotAggregator, PlotBoundary, PlotData,
    PlotObservation, StandIdentity, TpaReport, TreeFeatures, TreeLayer,
};
use crate::infrastructure::geojson::{parse_aoi_layer, parse_tree_layer};
use crate::infrastructure::traits::{
    ChartRenderer, FileSystem, ReportPaths, StandCatalog, StandInfo, ValidationPaths,
};

/// Everything computed for one stand.
#[derive(Debug, Clone, Serialize)]
pub struct StandEstimate {
    pub stand: StandIdentity,
    pub observations: Vec<PlotObservation>,
    pub metrics: AggregateMetrics,
    pub report: TpaReport,
    /// Canonical report string, e.g. `7.50±19.62 @ 95%`
    pub summary: String,
    pub plot_data: PlotData,
}

impl StandEstimate {
    pub fn chart_title(&self) -> String {
        chart_title(&self.stand, &self.summary)
    }
}

/// Per-invocation options.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub confidence: ConfidenceLevel,
    /// Store the TPA value back into the stand database
    pub persist: bool,
}

/// Outcome of one stand in a batch.
#[derive(Debug)]
pub struct StandOutcome {
    pub stand: StandIdentity,
    pub result: ApplicationResult<StandEstimate>,
}

/// Resolved lookup data for a stand.
#[derive(Debug, Clone, Serialize)]
pub struct StandDescription {
    pub stand: StandIdentity,
    pub paths: ValidationPaths,
    pub info: StandInfo,
}

/// Service computing stand-level trees per acre.
pub struct TpaService {
    fs: Arc<dyn FileSystem>,
    catalog: Arc<dyn StandCatalog>,
    renderer: Arc<dyn ChartRenderer>,
    settings: Arc<Settings>,
}

/// Stand acreage recorded in the metadata store must be positive.
fn validate_stand_acreage(stand: &StandIdentity, info: &StandInfo) -> ApplicationResult<()> {
    if !(info.acres > 0.0) {
        return Err(DomainError::InvalidStandAcreage {
            stand: stand.clone(),
            acres: info.acres,
        }
        .into());
    }
    Ok(())
}

impl TpaService {
    /// Create a new TPA service.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        catalog: Arc<dyn StandCatalog>,
        renderer: Arc<dyn ChartRenderer>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            fs,
            catalog,
            renderer,
            settings,
        }
    }

    fn read(&self, stand: &StandIdentity, what: &str, path: &Path) -> ApplicationResult<String> {
        self.fs
            .read_to_string(path)
            .with_path_context(stand, &format!("read {}", what), path)
    }

    fn load_aoi(&self, stand: &StandIdentity, path: &Path) -> ApplicationResult<AoiLayer> {
        let content = self.read(stand, "AOI", path)?;
        parse_aoi_layer(&content).map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: parse AOI {}", stand, path.display()),
            source: Box::new(e),
        })
    }

    fn load_trees(&self, stand: &StandIdentity, path: &Path) -> ApplicationResult<TreeLayer> {
        let content = self.read(stand, "tree points", path)?;
        parse_tree_layer(&content).map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: parse tree points {}", stand, path.display()),
            source: Box::new(e),
        })
    }

    /// Estimate from already-loaded layers, paired by index.
    pub fn estimate_layers<B, T>(
        &self,
        stand: &StandIdentity,
        aois: &[B],
        tree_sets: &[T],
        confidence: ConfidenceLevel,
    ) -> ApplicationResult<StandEstimate>
    where
        B: PlotBoundary,
        T: TreeFeatures,
    {
        let measurer = self.settings.measurer()?;
        let aggregator = PlotAggregator::new(&measurer);
        let (observations, metrics) = aggregator.aggregate(stand, aois, tree_sets)?;
        let report = estimate(stand, &observations, &metrics, confidence)?;
        let summary = format_report(&report);
        let plot_data = build_plot_data(&observations);

        info!("{}: {} over {} plots", stand, summary, observations.len());
        Ok(StandEstimate {
            stand: stand.clone(),
            observations,
            metrics,
            report,
            summary,
            plot_data,
        })
    }

    /// Estimate from local GeoJSON files, paired by index.
    #[instrument(skip_all, fields(stand = %stand))]
    pub fn estimate_files(
        &self,
        stand: &StandIdentity,
        aoi_paths: &[PathBuf],
        tree_paths: &[PathBuf],
        confidence: ConfidenceLevel,
    ) -> ApplicationResult<StandEstimate> {
        ensure_paired(stand, aoi_paths.len(), tree_paths.len())?;

        let aois = aoi_paths
            .iter()
            .map(|p| self.load_aoi(stand, p))
            .collect::<ApplicationResult<Vec<_>>>()?;
        let tree_sets = tree_paths
            .iter()
            .map(|p| self.load_trees(stand, p))
            .collect::<ApplicationResult<Vec<_>>>()?;
        debug!("loaded {} plot pairs", aois.len());

        self.estimate_layers(stand, &aois, &tree_sets, confidence)
    }

    /// Write the report text and the rendered chart.
    pub fn write_artifacts(
        &self,
        estimate: &StandEstimate,
        report_path: Option<&Path>,
        chart_path: Option<&Path>,
    ) -> ApplicationResult<()> {
        let stand = &estimate.stand;
        if let Some(path) = report_path {
            self.fs
                .ensure_parent(path)
                .with_path_context(stand, "create directory for", path)?;
            self.fs
                .write(path, &estimate.summary)
                .with_path_context(stand, "write report", path)?;
            debug!("report written to {}", path.display());
        }
        if let Some(path) = chart_path {
            let svg = self
                .renderer
                .render(&estimate.chart_title(), &estimate.plot_data);
            self.fs
                .ensure_parent(path)
                .with_path_context(stand, "create directory for", path)?;
            self.fs
                .write(path, &svg)
                .with_path_context(stand, "write chart", path)?;
            debug!("chart written to {}", path.display());
        }
        Ok(())
    }

    /// Resolve validation paths and stand metadata.
    #[instrument(skip_all, fields(stand = %stand))]
    pub fn describe(&self, stand: &StandIdentity) -> ApplicationResult<StandDescription> {
        let paths = self
            .catalog
            .validation_paths(stand)
            .map_err(ApplicationError::upstream(stand))?;
        let info = self
            .catalog
            .stand_info(stand)
            .map_err(ApplicationError::upstream(stand))?;
        Ok(StandDescription {
            stand: stand.clone(),
            paths,
            info,
        })
    }

    /// Full pipeline for one stand through the catalog.
    #[instrument(skip_all, fields(stand = %stand))]
    pub fn run(&self, stand: &StandIdentity, options: RunOptions) -> ApplicationResult<StandEstimate> {
        let paths = self
            .catalog
            .validation_paths(stand)
            .map_err(ApplicationError::upstream(stand))?;
        ensure_paired(stand, paths.aoi.len(), paths.points.len())?;

        let info = self
            .catalog
            .stand_info(stand)
            .map_err(ApplicationError::upstream(stand))?;
        validate_stand_acreage(stand, &info)?;

        let ReportPaths {
            tpa_report,
            tpa_rd_plot,
        } = self
            .catalog
            .report_paths(stand)
            .map_err(ApplicationError::upstream(stand))?;

        let estimate = self.estimate_files(stand, &paths.aoi, &paths.points, options.confidence)?;
        self.write_artifacts(&estimate, Some(&tpa_report), Some(&tpa_rd_plot))?;

        if options.persist {
            self.catalog
                .set_validation_tpa(stand, estimate.report.tpa)
                .map_err(ApplicationError::upstream(stand))?;
            info!("{}: stored VAL_TPA={:.4}", stand, estimate.report.tpa);
        } else {
            debug!("{}: persistence disabled, VAL_TPA not stored", stand);
        }
        Ok(estimate)
    }

    /// Run many stands in parallel; each succeeds or fails on its own.
    pub fn run_batch(
        &self,
        stands: &[StandIdentity],
        options: RunOptions,
        jobs: Option<usize>,
    ) -> ApplicationResult<Vec<StandOutcome>> {
        let run_all = || {
            stands
                .par_iter()
                .map(|stand| {
                    let result = self.run(stand, options);
                    if let Err(e) = &result {
                        warn!("{}", e);
                    }
                    StandOutcome {
                        stand: stand.clone(),
                        result,
                    }
                })
                .collect::<Vec<_>>()
        };

        match jobs {
            Some(n) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| ApplicationError::OperationFailed {
                        context: format!("build worker pool with {} threads", n),
                        source: Box::new(e),
                    })?;
                Ok(pool.install(run_all))
            }
            None => Ok(run_all()),
        }
    }
}

/// Parse a batch file: one `client,project,stand` per line; blanks and `#` comments skipped.
pub fn parse_stand_list(content: &str) -> Result<Vec<StandIdentity>, String> {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(lineno, line)| {
            let parts: Vec<&str> = line.split(',').map(str::trim).collect();
            match parts.as_slice() {
                [client, project, stand]
                    if !client.is_empty() && !project.is_empty() && !stand.is_empty() =>
                {
                    Ok(StandIdentity::new(*client, *project, *stand))
                }
                _ => Err(format!(
                    "line {}: expected client,project,stand, got '{}'",
                    lineno, line
                )),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_stand_list_when_parsing_then_skips_blanks_and_comments() {
        let content = "# client,project,stand\n1,2,3\n\n  4 , 5 , 6  \n";
        let stands = parse_stand_list(content).unwrap();
        assert_eq!(
            stands,
            vec![StandIdentity::new("1", "2", "3"), StandIdentity::new("4", "5", "6")]
        );
    }

    #[test]
    fn given_malformed_line_when_parsing_stand_list_then_reports_line_number() {
        let err = parse_stand_list("1,2,3\n1,2\n").unwrap_err();
        assert!(err.starts_with("line 2:"), "{}", err);
    }

    #[test]
    fn given_non_positive_acres_when_validating_then_invalid_stand_acreage() {
        let stand = StandIdentity::new("1", "2", "3");
        let info = StandInfo {
            acres: 0.0,
            extra: Default::default(),
        };
        let err = validate_stand_acreage(&stand, &info).unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::InvalidStandAcreage { .. })
        ));
    }
}
