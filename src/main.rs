//! Plansync CLI entrypoint.
//!
//! This is the main entrypoint for the plansync command-line tool.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use plansync::cli::{Cli, Commands, OutputFormat, OutputFormatter, PlanSummary};
use plansync::config::{
    CONFIG_TEMPLATE, ConfigParser, ConfigValidator, DEFAULT_CONFIG_FILES, PlanSyncConfig,
    find_config_file,
};
use plansync::device::{DeviceHandle, SimulatedDevice, SimulationMode, TransferOp};
use plansync::document::{self, DocumentFormat, PlanDocument};
use plansync::error::{PlanSyncError, RemoteError, Result};
use plansync::resource::{CASCADE_ORDER, ResourceKind};
use plansync::store::{LocalPlanStore, PlanStore};
use plansync::sync::{SyncHistoryEntry, SyncOrchestrator, SyncOutcome};

use clap::Parser;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// System id given to the simulated vehicle.
const SIMULATED_DEVICE_ID: u8 = 1;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, matches!(cli.output, OutputFormat::Json));

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let formatter = OutputFormatter::new(cli.output);
    match runtime.block_on(run(cli, &formatter)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", formatter.error(&e.to_string()));
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// Logs go to stderr so that stdout only carries command output; with JSON
/// output the logs are JSON lines as well.
fn init_logging(verbose: bool, json: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Main async entry point.
async fn run(cli: Cli, formatter: &OutputFormatter) -> Result<()> {
    if let Commands::Init { path, force } = &cli.command {
        return cmd_init(path, *force, formatter);
    }

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Validate { file } => cmd_validate(&config, &file, formatter).await,
        Commands::Inspect { file } => cmd_inspect(&config, &file, formatter).await,
        Commands::Convert { input, output } => {
            cmd_convert(&config, &input, &output, formatter).await
        }
        Commands::Upload { file, fail_stage } => {
            cmd_upload(&config, &file, fail_stage.map(ResourceKind::from), formatter).await
        }
        Commands::List => cmd_list(&config, formatter).await,
        Commands::Download { output, seed } => {
            cmd_download(&config, &output, &seed, formatter).await
        }
    }
}

/// Writes a template configuration.
fn cmd_init(path: &Path, force: bool, formatter: &OutputFormatter) -> Result<()> {
    info!("Initializing plansync in: {}", path.display());

    let config_path = path.join(DEFAULT_CONFIG_FILES[0]);
    if !force && config_path.exists() {
        eprintln!(
            "{}",
            formatter.warning(&format!(
                "Configuration file already exists: {} (use --force to overwrite)",
                config_path.display()
            ))
        );
        return Ok(());
    }

    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    std::fs::write(&config_path, CONFIG_TEMPLATE)?;

    let config = ConfigParser::new().parse_yaml(CONFIG_TEMPLATE, Some(&config_path))?;
    let plan_dir = path.join(&config.storage.plan_dir);
    if !plan_dir.exists() {
        std::fs::create_dir_all(&plan_dir)?;
    }

    println!("{}", formatter.format_written(&config_path));
    Ok(())
}

/// Checks a plan file.
async fn cmd_validate(config: &PlanSyncConfig, file: &Path, formatter: &OutputFormatter) -> Result<()> {
    let summary = read_summary(config, file).await?;
    println!("{}", formatter.format_validation(&summary));
    Ok(())
}

/// Shows the sections of a plan file.
async fn cmd_inspect(config: &PlanSyncConfig, file: &Path, formatter: &OutputFormatter) -> Result<()> {
    let summary = read_summary(config, file).await?;
    println!("{}", formatter.format_plan(&summary));
    Ok(())
}

/// Converts any accepted format into a plan file.
async fn cmd_convert(
    config: &PlanSyncConfig,
    input: &Path,
    output: &Path,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (bytes, format) = read_input(input).await?;
    if !format.is_legacy() {
        warn!("{} is already a plan file, rewriting it", input.display());
    }

    let mut orchestrator = offline_orchestrator(config);
    orchestrator.load_document_as(&bytes, format)?;
    let written = orchestrator.save_file(output).await?;

    println!("{}", formatter.format_written(&plan_store(config).resolve(&written)));
    Ok(())
}

/// Lists the plan directory.
async fn cmd_list(config: &PlanSyncConfig, formatter: &OutputFormatter) -> Result<()> {
    let store = plan_store(config);
    let files = store.list().await?;
    println!("{}", formatter.format_listing(store.base_dir(), &files));
    Ok(())
}

/// Sends a plan to a simulated vehicle.
async fn cmd_upload(
    config: &PlanSyncConfig,
    file: &Path,
    fail_stage: Option<ResourceKind>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (bytes, format) = read_input(file).await?;

    let device = Arc::new(simulated_device(config));
    if let Some(kind) = fail_stage {
        device.script_failure(kind, TransferOp::Store, format!("{kind} rejected by vehicle"));
    }

    let handle: DeviceHandle = device.clone();
    let entry = SyncOrchestrator::send_plan_to_device(handle, &bytes, format).await?;
    println!("{}", formatter.format_sync(&entry));

    for kind in CASCADE_ORDER {
        debug!("Vehicle {kind}: {}", device.dataset(kind));
    }
    into_result(entry)
}

/// Reads the plan back from a simulated vehicle seeded with `seed`.
async fn cmd_download(
    config: &PlanSyncConfig,
    output: &Path,
    seed: &Path,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (bytes, format) = read_input(seed).await?;
    let seeded = parse_any(config, &bytes, format)?;

    let device = Arc::new(simulated_device(config));
    for (kind, section) in seeded.sections() {
        device.set_dataset(kind, section.clone());
    }

    let handle: DeviceHandle = device;
    let (_active, active_rx) = watch::channel(Some(handle));

    let mut orchestrator = offline_orchestrator(config);
    orchestrator.start(true, active_rx);
    orchestrator.run_until_idle().await;
    orchestrator.load_from_device()?;
    orchestrator.run_until_idle().await;

    let entry = orchestrator
        .history()
        .last()
        .cloned()
        .ok_or_else(|| PlanSyncError::internal("load cascade left no history"))?;
    println!("{}", formatter.format_sync(&entry));
    into_result(entry)?;

    let written = orchestrator.save_file(output).await?;
    println!("{}", formatter.format_written(&plan_store(config).resolve(&written)));
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Loads, overrides and validates the configuration.
///
/// Falls back to defaults when no file is given and none is found.
fn load_config(config_path: Option<&PathBuf>) -> Result<PlanSyncConfig> {
    let config_file = match config_path {
        Some(path) => Some(path.clone()),
        None => find_config_file(".").ok(),
    };

    let config = if let Some(config_file) = config_file {
        debug!("Loading configuration from: {}", config_file.display());
        let parser = ConfigParser::new().with_base_path(
            config_file
                .parent()
                .unwrap_or_else(|| Path::new(".")),
        );
        parser.load_dotenv()?;
        parser.load_with_env(&config_file)?
    } else {
        debug!("No configuration file found, using defaults");
        ConfigParser::new().load_dotenv()?;
        ConfigParser::defaults_with_env()
    };

    let result = ConfigValidator::new().validate(&config)?;
    for warning in &result.warnings {
        warn!("{warning}");
    }
    Ok(config)
}

/// Store rooted at the configured plan directory.
fn plan_store(config: &PlanSyncConfig) -> LocalPlanStore {
    LocalPlanStore::with_base_dir(&config.storage.plan_dir)
}

/// Reads a file named on the command line and picks its format from the
/// extension, falling back to the content.
async fn read_input(path: &Path) -> Result<(Vec<u8>, DocumentFormat)> {
    let bytes = LocalPlanStore::current_dir()?.read(path).await?;
    let format = match DocumentFormat::from_path(path) {
        Ok(format) => format,
        Err(e) => {
            debug!("{e}, sniffing {}", path.display());
            DocumentFormat::sniff(&bytes)?
        }
    };
    Ok((bytes, format))
}

fn parse_any(config: &PlanSyncConfig, bytes: &[u8], format: DocumentFormat) -> Result<PlanDocument> {
    let loaded = document::parse(bytes, format)?;
    Ok(loaded.into_plan(&config.document.ground_station))
}

async fn read_summary(config: &PlanSyncConfig, file: &Path) -> Result<PlanSummary> {
    let (bytes, format) = read_input(file).await?;
    let plan = parse_any(config, &bytes, format)?;
    Ok(PlanSummary::new(file, format, &plan)?)
}

fn offline_orchestrator(config: &PlanSyncConfig) -> SyncOrchestrator {
    SyncOrchestrator::new(
        config.document.ground_station.clone(),
        config.offline_editing.profile(),
    )
    .with_store(Arc::new(plan_store(config)))
}

fn simulated_device(config: &PlanSyncConfig) -> SimulatedDevice {
    SimulatedDevice::new(
        SIMULATED_DEVICE_ID,
        config.offline_editing.profile(),
        SimulationMode::Auto {
            latency: config.simulator.latency(),
        },
    )
}

/// Turns a failed cascade into an error.
fn into_result(entry: SyncHistoryEntry) -> Result<()> {
    match entry.outcome {
        SyncOutcome::Finished => Ok(()),
        SyncOutcome::Failed { kind, reason } => Err(RemoteError::StageFailed {
            kind,
            op: entry.direction.op(),
            reason,
        }
        .into()),
        SyncOutcome::Abandoned => Err(PlanSyncError::internal(format!(
            "{} cascade {} was abandoned",
            entry.direction, entry.cascade
        ))),
    }
}
