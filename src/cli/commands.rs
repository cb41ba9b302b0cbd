//! Command dispatch: resolves settings, wires services, renders results

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::{
    parse_stand_list, RunOptions, StandEstimate, StandOutcome, TpaService,
};
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands, StandArgs};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::domain::{ConfidenceLevel, StandIdentity};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => config_show(cli.config.as_deref()),
            ConfigCommands::Path => config_path(),
        },
        Some(command) => {
            let settings = Settings::load(cli.config.as_deref())?;
            let container = ServiceContainer::new(settings)?;
            dispatch(&container, command)
        }
        None => {
            Cli::command()
                .print_help()
                .map_err(|e| InfraError::io("print help", e))?;
            Ok(())
        }
    }
}

fn dispatch(container: &ServiceContainer, command: &Commands) -> CliResult<()> {
    let service = container.tpa_service();
    match command {
        Commands::Run {
            stand,
            confidence,
            no_persist,
            json,
        } => {
            let options = run_options(&container.settings, *confidence, *no_persist)?;
            cmd_run(&service, stand, options, *json)
        }
        Commands::Batch {
            file,
            confidence,
            no_persist,
            jobs,
        } => {
            let options = run_options(&container.settings, *confidence, *no_persist)?;
            cmd_batch(container, &service, file, options, *jobs)
        }
        Commands::Estimate {
            aoi,
            trees,
            stand,
            confidence,
            report,
            chart,
            json,
        } => {
            let level = resolve_confidence(&container.settings, *confidence)?;
            cmd_estimate(
                &service,
                stand,
                aoi,
                trees,
                level,
                report.as_deref(),
                chart.as_deref(),
                *json,
            )
        }
        Commands::Paths { stand } => cmd_paths(&service, stand),
        Commands::Config { .. } | Commands::Completion { .. } => Err(CliError::Usage(
            "command does not need services".into(),
        )),
    }
}

/// Per-invocation level wins over the configured default.
fn resolve_confidence(settings: &Settings, flag: Option<f64>) -> CliResult<ConfidenceLevel> {
    match flag {
        Some(value) => {
            ConfidenceLevel::new(value).map_err(|e| CliError::InvalidArgs(e.to_string()))
        }
        None => Ok(settings.confidence()?),
    }
}

fn run_options(settings: &Settings, flag: Option<f64>, no_persist: bool) -> CliResult<RunOptions> {
    Ok(RunOptions {
        confidence: resolve_confidence(settings, flag)?,
        persist: !no_persist,
    })
}

fn print_json(estimate: &StandEstimate) -> CliResult<()> {
    let json =
        serde_json::to_string_pretty(estimate).map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: serialize estimate", estimate.stand),
            source: Box::new(e),
        })?;
    output::info(&json);
    Ok(())
}

fn print_estimate(estimate: &StandEstimate) {
    output::action(&estimate.stand.to_string(), &estimate.summary);
    output::detail(&format!(
        "{} plots, {:.2} validated acres, {} trees",
        estimate.observations.len(),
        estimate.metrics.total_validated_acres,
        estimate.metrics.total_trees
    ));
}

#[instrument(skip(service))]
fn cmd_run(
    service: &TpaService,
    stand: &StandArgs,
    options: RunOptions,
    json: bool,
) -> CliResult<()> {
    let stand = stand.identity();
    let estimate = service.run(&stand, options)?;
    if json {
        return print_json(&estimate);
    }
    print_estimate(&estimate);
    if options.persist {
        output::success(&format!("{}: VAL_TPA stored", stand));
    }
    Ok(())
}

fn cmd_batch(
    container: &ServiceContainer,
    service: &TpaService,
    file: &Path,
    options: RunOptions,
    jobs: Option<usize>,
) -> CliResult<()> {
    if jobs == Some(0) {
        return Err(CliError::InvalidArgs("--jobs must be at least 1".into()));
    }
    if !container.fs.exists(file) {
        return Err(CliError::Usage(format!(
            "stand list not found: {}",
            file.display()
        )));
    }
    let content = container
        .fs
        .read_to_string(file)
        .map_err(|e| InfraError::io(format!("read stand list {}", file.display()), e))?;
    let stands = parse_stand_list(&content)
        .map_err(|e| CliError::InvalidArgs(format!("{}: {}", file.display(), e)))?;
    if stands.is_empty() {
        return Err(CliError::Usage(format!(
            "{}: no stands listed",
            file.display()
        )));
    }
    debug!("batch of {} stands", stands.len());

    let outcomes = service.run_batch(&stands, options, jobs)?;
    report_batch(&outcomes)
}

fn report_batch(outcomes: &[StandOutcome]) -> CliResult<()> {
    output::header(&format!("Batch: {} stands", outcomes.len()));
    let mut failed = 0;
    for outcome in outcomes {
        match &outcome.result {
            Ok(estimate) => output::success(&format!("{}: {}", outcome.stand, estimate.summary)),
            Err(e) => {
                failed += 1;
                output::failure(e);
            }
        }
    }
    if failed > 0 {
        return Err(CliError::BatchFailed {
            failed,
            total: outcomes.len(),
        });
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_estimate(
    service: &TpaService,
    stand: &StandIdentity,
    aoi: &[PathBuf],
    trees: &[PathBuf],
    level: ConfidenceLevel,
    report: Option<&Path>,
    chart: Option<&Path>,
    json: bool,
) -> CliResult<()> {
    let estimate = service.estimate_files(stand, aoi, trees, level)?;
    service.write_artifacts(&estimate, report, chart)?;
    if json {
        return print_json(&estimate);
    }
    print_estimate(&estimate);
    for (label, path) in [("report", report), ("chart", chart)] {
        if let Some(path) = path {
            output::detail(&format!("{} written to {}", label, path.display()));
        }
    }
    Ok(())
}

fn cmd_paths(service: &TpaService, stand: &StandArgs) -> CliResult<()> {
    let description = service.describe(&stand.identity())?;
    output::header(&description.stand);
    output::action("ACRES", &description.info.acres);
    for (i, (aoi, points)) in description
        .paths
        .aoi
        .iter()
        .zip(description.paths.points.iter())
        .enumerate()
    {
        output::detail(&format!("[{}] {} | {}", i, aoi.display(), points.display()));
    }
    let (aois, points) = (description.paths.aoi.len(), description.paths.points.len());
    if aois != points {
        output::warning(&format!(
            "{} AOI files but {} tree point files",
            aois, points
        ));
    }
    Ok(())
}

fn config_show(config_file: Option<&Path>) -> CliResult<()> {
    let settings = Settings::load(config_file)?;
    output::info(&settings.to_toml()?);
    Ok(())
}

fn config_path() -> CliResult<()> {
    match global_config_path() {
        Some(path) => {
            let state = if path.exists() { "exists" } else { "not found" };
            output::action("global", &format!("{} ({})", path.display(), state));
        }
        None => output::warning("no config directory available on this platform"),
    }
    Ok(())
}
