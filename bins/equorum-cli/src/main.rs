//! equorum-cli — Deploy a revenue series and replay scenarios against it.
//!
//! `run` deploys the series described by the configuration, replays a JSON
//! scenario and prints the final state. `params` validates a configuration
//! and prints the series it would deploy.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use equorum_sim::series::ledger_address;
use equorum_sim::units::format_units;
use equorum_sim::{Scenario, SimConfig, run_scenario};

/// Scenario used when `run` is given no `--scenario`.
const DEMO_SCENARIO: &str = include_str!("../scenarios/demo.json");

/// Equorum revenue-series simulator.
#[derive(Parser)]
#[command(name = "equorum-cli")]
#[command(version, about = "Proportional revenue sharing for claim-token holders.")]
struct Cli {
    /// Log level filter (overridden by RUST_LOG).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format: "text" or "json".
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a series and replay a scenario against it.
    Run(RunArgs),
    /// Validate a configuration and print the series parameters.
    Params(ParamsArgs),
}

#[derive(Args)]
struct RunArgs {
    /// TOML configuration file. Defaults and EQUORUM_* variables apply.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON scenario file (default: built-in demo).
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,

    /// Exit with an error if any step failed.
    #[arg(long)]
    strict: bool,
}

#[derive(Args)]
struct ParamsArgs {
    /// TOML configuration file. Defaults and EQUORUM_* variables apply.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Params(args) => params(args),
    }
}

/// Replay a scenario and print the report.
fn run(args: RunArgs) -> Result<()> {
    let config = SimConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let scenario = match &args.scenario {
        Some(path) => Scenario::from_path(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?,
        None => Scenario::from_json(DEMO_SCENARIO).context("Built-in scenario is invalid")?,
    };

    let report = run_scenario(&config, &scenario).context("Failed to deploy series")?;
    info!(steps = report.steps.len(), failed = report.failed_steps(), "scenario finished");
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }

    if !report.checks.all_pass() {
        bail!("Invariant check failed: {:?}", report.checks);
    }
    if args.strict && report.failed_steps() > 0 {
        bail!("{} of {} steps failed", report.failed_steps(), report.steps.len());
    }
    Ok(())
}

/// Print the parameters a configuration deploys.
fn params(args: ParamsArgs) -> Result<()> {
    let config = SimConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let params = config.series_params()?;
    let owner = config.owner_address()?;
    let ledger = ledger_address(&params);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&params)?);
        return Ok(());
    }

    println!("Name:         {}", params.name);
    println!("Symbol:       {}", params.symbol);
    println!("Protocol:     {}", params.protocol);
    println!("Owner:        {owner}");
    println!("Ledger:       {ledger}");
    println!("Router:       {}", params.router);
    println!("Share:        {} bps", params.share_bps);
    println!("Maturity:     {} days", params.maturity_duration_secs / equorum_core::constants::SECONDS_PER_DAY);
    println!("Supply:       {}", format_units(params.total_supply));
    println!("Min. deposit: {}", format_units(params.minimum_distribution));
    Ok(())
}

fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}
