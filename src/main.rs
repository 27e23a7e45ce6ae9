//! idp-planner CLI entrypoint.
//!
//! This is the main entrypoint for the idp-planner command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use idp_planner::cli::{Cli, Commands, OutputFormatter};
use idp_planner::config::{find_config_file, ConfigParser, ConfigValidator, PlannerConfig};
use idp_planner::eks::{EksClient, IdentityProviderClient};
use idp_planner::error::Result;
use idp_planner::reconciler::Reconciler;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// `RUST_LOG` takes precedence over the verbosity flag.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point. Returns whether the command succeeded.
async fn run(cli: Cli) -> Result<bool> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Validate { warnings } => {
            cmd_validate(cli.config.as_ref(), warnings, &formatter).map(|()| true)
        }
        Commands::Plan { current, live } => {
            cmd_plan(cli.config.as_ref(), current.as_deref(), live, &formatter)
                .await
                .map(|()| true)
        }
        Commands::Apply { yes, dry_run } => {
            cmd_apply(cli.config.as_ref(), yes, dry_run, &formatter).await
        }
        Commands::Status => cmd_status(cli.config.as_ref(), &formatter).await.map(|()| true),
    }
}

/// Validate configuration.
fn cmd_validate(
    config_path: Option<&PathBuf>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config_file = resolve_config_path(config_path)?;
    info!("Validating configuration: {}", config_file.display());

    let parser = parser_for(&config_file);
    parser.load_dotenv()?;

    let config = parser.load_file(&config_file)?;
    let result = ConfigValidator::new().validate(&config)?;

    emit(&formatter.format_validation(&result, show_warnings))?;
    Ok(())
}

/// Show the plan for the configured identity provider.
async fn cmd_plan(
    config_path: Option<&PathBuf>,
    snapshot: Option<&Path>,
    live: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, parser) = load_config(config_path)?;

    let report = if live {
        let client = create_eks_client(&config).await;
        Reconciler::new(&config, client).plan_only().await?
    } else {
        let current = snapshot
            .map(|path| parser.load_snapshot(path))
            .transpose()?;
        debug!("Planning offline against {:?}", current.as_ref().map(|c| &c.name));

        let client: Arc<dyn IdentityProviderClient> =
            Arc::new(EksClient::offline(config.cluster.region.as_deref()));
        Reconciler::new(&config, client).plan_with(current)?
    };

    emit(&formatter.format_plan(&report))?;
    Ok(())
}

/// Run one reconciliation pass.
async fn cmd_apply(
    config_path: Option<&PathBuf>,
    auto_approve: bool,
    dry_run: bool,
    formatter: &OutputFormatter,
) -> Result<bool> {
    let (config, _parser) = load_config(config_path)?;
    let client = create_eks_client(&config).await;
    let reconciler = Reconciler::new(&config, client).with_dry_run(dry_run);

    let report = reconciler.plan_only().await?;

    if report.is_converged() {
        eprintln!("No changes to apply.");
        return Ok(true);
    }

    emit(&formatter.format_plan(&report))?;

    if !auto_approve && !dry_run {
        eprint!("Do you want to apply this plan? [y/N]: ");
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            eprintln!("Apply cancelled.");
            return Ok(true);
        }
    }

    let result = reconciler.execute(report).await;
    emit(&formatter.format_reconciliation(&result))?;

    Ok(result.success)
}

/// Show the identity provider currently associated with the cluster.
async fn cmd_status(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let (config, _parser) = load_config(config_path)?;
    let client = create_eks_client(&config).await;

    let current = client.find_current(&config.cluster.name).await?;

    emit(&formatter.format_status(&config.cluster.name, current.as_ref()))?;
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

/// Creates a parser rooted at the configuration file's directory.
fn parser_for(config_file: &Path) -> ConfigParser {
    ConfigParser::new().with_base_path(config_file.parent().unwrap_or_else(|| Path::new(".")))
}

/// Loads and validates the configuration.
fn load_config(config_path: Option<&PathBuf>) -> Result<(PlannerConfig, ConfigParser)> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading configuration from: {}", config_file.display());

    let parser = parser_for(&config_file);
    parser.load_dotenv()?;

    let config = parser.load_with_env(&config_file)?;
    ConfigValidator::new().validate(&config)?;

    Ok((config, parser))
}

/// Creates an EKS client for the configured region.
async fn create_eks_client(config: &PlannerConfig) -> Arc<dyn IdentityProviderClient> {
    Arc::new(EksClient::from_env(config.cluster.region.as_deref()).await)
}

/// Writes command output to stdout.
fn emit(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{output}")?;
    stdout.flush()?;
    Ok(())
}
