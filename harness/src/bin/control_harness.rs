//! CLI for the control mapper contract harness.
//!
//! Subcommands:
//! - `list`: List bundled controls.
//! - `run`: Run every harness phase against a bundled control.
//!
//! Exit codes: 0 = contract satisfied, 1 = violations found, 2 = error.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use control_kit_controls::{builtin_registry, control_root};
use control_kit_harness::{
    ConfigOverrides, ContractHarness, ControlLayout, DirectoryFixtures, HarnessConfig,
    HarnessError,
};

#[derive(Parser)]
#[command(
    name = "control-harness",
    about = "Contract validation harness for control mappers"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List bundled controls.
    List,
    /// Run the harness against a bundled control.
    Run {
        /// Control name (see `list`).
        control: String,
        /// Directory holding `testing/payloads` and `inputs/data`.
        /// Defaults to the control's bundled fixtures.
        #[arg(long, env = "CONTROL_HARNESS_CONTROL_ROOT")]
        control_root: Option<PathBuf>,
        /// Report format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Per-invocation timeout in milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Maximum concurrent invocations in the corpus phase.
        #[arg(long)]
        parallelism: Option<usize>,
        /// Budget for the performance phase in milliseconds.
        #[arg(long)]
        perf_budget_ms: Option<u64>,
        /// Number of findings in the performance occurrence.
        #[arg(long)]
        perf_findings: Option<usize>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::List => run_list(),
        Commands::Run {
            control,
            control_root,
            format,
            timeout_ms,
            parallelism,
            perf_budget_ms,
            perf_findings,
        } => {
            let overrides = ConfigOverrides {
                timeout_ms,
                parallelism,
                perf_budget_ms,
                perf_findings,
            };
            match run_harness(&control, control_root, format, &overrides) {
                Ok(code) => code,
                Err(e) => {
                    eprintln!("Error: {:#}", e);
                    2
                }
            }
        }
    };

    process::exit(exit_code);
}

fn run_list() -> i32 {
    for name in builtin_registry().names() {
        println!("{}", name);
    }
    0
}

fn run_harness(
    name: &str,
    root: Option<PathBuf>,
    format: OutputFormat,
    overrides: &ConfigOverrides,
) -> Result<i32> {
    let registry = builtin_registry();
    let control = registry.get(name).ok_or_else(|| {
        HarnessError::unknown_control(format!(
            "{} (available: {})",
            name,
            registry.names().join(", ")
        ))
    })?;

    let config = HarnessConfig::resolve(overrides).context("invalid harness configuration")?;
    let layout = ControlLayout::new(root.unwrap_or_else(|| control_root(name)));
    let fixtures = DirectoryFixtures::for_layout(&layout);

    let harness = ContractHarness::new(config).context("invalid harness configuration")?;
    let report = harness.run(control, &fixtures);

    match format {
        OutputFormat::Text => print!("{}", report),
        OutputFormat::Json => {
            let json = report
                .to_json_pretty()
                .context("cannot serialize report")?;
            println!("{}", json);
        }
    }

    Ok(if report.is_success() { 0 } else { 1 })
}
