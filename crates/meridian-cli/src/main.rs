//! Meridian plan explainer.
//!
//! Plans a scan with a sort on top from a scenario file and prints the
//! explain text or the serialized plan.
//!
//! # Usage
//!
//! ```bash
//! # Explain at the configured level
//! meridian-explain orders.toml
//!
//! # Extended explain with a runtime configuration
//! meridian-explain --config planner.toml --level extended orders.toml
//!
//! # Serialized plan as JSON
//! meridian-explain --format json orders.toml
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use meridian_common::config::{ExplainLevel, PlannerConfig};

mod scenario;

use scenario::Scenario;

/// Meridian plan explainer
#[derive(Parser, Debug)]
#[command(
    name = "meridian-explain",
    version,
    about = "Explain the physical plan of a scan + sort scenario"
)]
struct Args {
    /// Scenario file
    #[arg(value_name = "SCENARIO")]
    scenario: PathBuf,

    /// Planner configuration file
    #[arg(long, value_name = "FILE", env = "MERIDIAN_CONFIG")]
    config: Option<PathBuf>,

    /// Explain level; overrides the configured one
    #[arg(short = 'l', long, value_enum)]
    level: Option<LevelArg>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: FormatArg,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

/// Explain level argument
#[derive(Debug, Clone, Copy, ValueEnum)]
enum LevelArg {
    /// Node ids and names only
    Minimal,
    /// Predicates, ordering, limit and offset
    Standard,
    /// Cost and statistics diagnostics
    Extended,
}

impl From<LevelArg> for ExplainLevel {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::Minimal => ExplainLevel::Minimal,
            LevelArg::Standard => ExplainLevel::Standard,
            LevelArg::Extended => ExplainLevel::Extended,
        }
    }
}

/// Output format argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    /// Explain text
    Text,
    /// Serialized plan as JSON
    Json,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    let config = load_config(&args)?;
    let output = explain(&args.scenario, &config, args.format)?;
    print!("{output}");
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("meridian_cli=debug,meridian_planner=debug")
    } else {
        EnvFilter::new("meridian_cli=warn,meridian_planner=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<PlannerConfig> {
    let mut config = match &args.config {
        Some(path) => PlannerConfig::from_file(path)?,
        None => PlannerConfig::default(),
    };

    if let Some(level) = args.level {
        config.query.explain_level = level.into();
    }

    Ok(config)
}

/// Plans the scenario at `path` and renders it.
fn explain(path: &Path, config: &PlannerConfig, format: FormatArg) -> Result<String> {
    info!("Explaining scenario: {}", path.display());

    let scenario = Scenario::from_file(path)?;
    let plan = scenario.plan(config)?;

    let output = match format {
        FormatArg::Text => plan.explain(config.query.explain_level),
        FormatArg::Json => {
            let mut json = serde_json::to_string_pretty(&plan.to_wire()?)?;
            json.push('\n');
            json
        }
    };
    Ok(output)
}
