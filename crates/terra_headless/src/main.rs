//! Headless scenario runner.
//!
//! Plays scenarios without a client attached. Designed for balance sweeps
//! and CI determinism checks.
//!
//! # Usage
//!
//! ```bash
//! # Run a single scenario and print its summary
//! cargo run -p terra_headless -- run --scenario scenarios/coastal_skirmish.ron
//!
//! # Replay one seed several times and compare
//! cargo run -p terra_headless -- verify --seed 42 --runs 4
//!
//! # Sweep 100 seeds
//! cargo run -p terra_headless -- batch --count 100 --output results/batch.json
//! ```
//!
//! Output (stdout): JSON
//! Logs (stderr): `RUST_LOG` filter, or `--verbose` for debug

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use terra_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    runner::run_scenario,
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "terra_headless")]
#[command(about = "Headless scenario runner for batch sweeps and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario once and print its summary
    Run {
        /// Scenario file to load (default: built-in coastal skirmish)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Override the scenario's seed
        #[arg(long)]
        seed: Option<u64>,

        /// Override the number of ticks
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// Replay one seed several times and compare every tick
    Verify {
        /// Scenario file to load (default: built-in coastal skirmish)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Seed to replay
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Number of runs to compare
        #[arg(short, long, default_value = "3")]
        runs: u32,
    },

    /// Run a scenario over a range of seeds
    Batch {
        /// Scenario file to load (default: built-in coastal skirmish)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of games to run
        #[arg(short, long, default_value = "16")]
        count: u32,

        /// Maximum parallel games (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output file for results (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for results)
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Some(Commands::Run {
            scenario,
            seed,
            ticks,
        }) => {
            cmd_run(scenario.as_deref(), seed, ticks);
        }
        Some(Commands::Verify {
            scenario,
            seed,
            runs,
        }) => {
            cmd_verify(scenario.as_deref(), seed, runs);
        }
        Some(Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
        }) => {
            cmd_batch(scenario.as_deref(), count, parallel, output, seed);
        }
        None => {
            cmd_run(None, None, None);
        }
    }
}

/// Load the scenario at `path`, or the built-in one. Exits on failure.
fn load_scenario(path: Option<&Path>) -> Scenario {
    let Some(path) = path else {
        return Scenario::coastal_skirmish();
    };
    match Scenario::load(path) {
        Ok(scenario) => {
            tracing::info!("Loaded scenario '{}' from {}", scenario.name, path.display());
            scenario
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Run a single scenario
fn cmd_run(path: Option<&Path>, seed: Option<u64>, ticks: Option<u64>) {
    let mut scenario = load_scenario(path);
    if let Some(ticks) = ticks {
        scenario.ticks = ticks;
    }

    let summary = match run_scenario(&scenario, seed) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    match summary.to_json() {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error: failed to encode summary: {e}");
            std::process::exit(1);
        }
    }
}

/// Verify determinism
fn cmd_verify(path: Option<&Path>, seed: u64, runs: u32) {
    let scenario = load_scenario(path);
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs)",
        scenario.name,
        seed,
        runs
    );

    match verify_determinism(&scenario, seed, runs) {
        Ok(report) => {
            eprintln!(
                "PASS: All {} runs agree after {} ticks (hash {:016x})",
                report.runs, report.ticks, report.final_hash
            );
        }
        Err(e) => {
            eprintln!("FAIL: {e}");
            std::process::exit(1);
        }
    }
}

/// Run a seed sweep
fn cmd_batch(path: Option<&Path>, count: u32, parallel: u32, output: Option<PathBuf>, seed: u64) {
    let scenario = load_scenario(path);
    let mut config = BatchConfig::new(&scenario.name, count).with_seed(seed);
    config.parallel_games = parallel;
    if let Some(output) = output.clone() {
        config = config.with_output(output);
    }

    let results = run_batch(&scenario, config);

    eprintln!(
        "Completed {} games ({} failed) in {:.1}s, {} distinct outcomes",
        results.games.len(),
        results.errors.len(),
        results.duration_seconds,
        results.summary.distinct_outcomes
    );

    match output {
        Some(path) => {
            if let Err(e) = results.save(&path) {
                eprintln!("Error: failed to save results to {}: {e}", path.display());
                std::process::exit(1);
            }
            eprintln!("Results saved to {}", path.display());
        }
        None => match serde_json::to_string_pretty(&results) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: failed to encode results: {e}");
                std::process::exit(1);
            }
        },
    }

    if !results.errors.is_empty() {
        std::process::exit(1);
    }
}
