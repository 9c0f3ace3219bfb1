//! Accrue CLI
//!
//! Replays staking scenarios against reward pools and prints the payouts.

mod runner;
mod scenario;

use clap::{Parser, Subcommand};
use runner::Runner;
use scenario::Scenario;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "accrue")]
#[command(version)]
#[command(about = "Accrue - lazy staking reward accrual", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario file
    Simulate {
        /// Scenario TOML
        scenario: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Version information
    Version,
}

/// Crates whose spans and events the default filter admits
const LOG_TARGETS: [&str; 4] = ["accrue_core", "accrue_pool", "accrue_factory", "accrue"];

/// `RUST_LOG` wins when set; otherwise only Accrue's own crates log, at
/// `info` (`debug` with `--verbose`, which includes settlement math).
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives: Vec<String> = LOG_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect();
        EnvFilter::new(format!("warn,{}", directives.join(",")))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(verbose)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Simulate { scenario, json } => {
            tracing::info!("Loading scenario {:?}", scenario);
            let scenario = Scenario::load(&scenario)?;
            let report = Runner::new(scenario)?.run()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render());
            }

            if !report.succeeded() {
                anyhow::bail!(
                    "{} of {} steps failed",
                    report.summary.failed,
                    report.summary.steps
                );
            }
        }

        Commands::Version => {
            println!("Accrue v{}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Features:");
            println!("  - Lazy accumulator settlement (Q96 / Q128 fixed point)");
            println!("  - Duration-amortized and fixed-window emission");
            println!("  - Pool factory with batched, genesis-gated funding");
        }
    }

    Ok(())
}
