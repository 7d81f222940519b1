//! Batch runs and replay verification.
//!
//! Runs one scenario across many seeds in parallel using rayon, and
//! checks that repeated runs of a single seed stay in lockstep.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use terra_core::error::GameError;

use crate::runner::{RunSummary, ScenarioRunner};
use crate::scenario::{Scenario, ScenarioError};

/// Configuration for a batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario name, for the record
    pub scenario: String,
    /// Number of games to run
    pub game_count: u32,
    /// Maximum parallel games (0 = use rayon default)
    pub parallel_games: u32,
    /// Where to write the results, if anywhere
    pub output: Option<PathBuf>,
    /// Seed of the first game; game `i` uses `seed_start + i`
    pub seed_start: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: "Coastal Skirmish".to_string(),
            game_count: 16,
            parallel_games: 0,
            output: None,
            seed_start: 0,
        }
    }
}

impl BatchConfig {
    /// Create config for a specific scenario
    pub fn new(scenario: &str, game_count: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            game_count,
            ..Default::default()
        }
    }

    /// Set output file
    #[must_use]
    pub fn with_output(mut self, path: PathBuf) -> Self {
        self.output = Some(path);
        self
    }

    /// Set seed start
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }
}

/// Aggregate figures over every game of a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Games that completed
    pub total_games: usize,
    /// Number of different final state hashes
    pub distinct_outcomes: usize,
    /// Events of each type, summed over all games
    pub event_totals: BTreeMap<String, u64>,
    /// Mean gold left per player name
    pub mean_gold: BTreeMap<String, f64>,
    /// Mean number of units left per player name
    pub mean_units: BTreeMap<String, f64>,
}

impl BatchSummary {
    /// Aggregate `games`.
    #[must_use]
    pub fn from_games(games: &[RunSummary]) -> Self {
        let mut summary = Self {
            total_games: games.len(),
            distinct_outcomes: games
                .iter()
                .map(|g| g.state_hash)
                .collect::<BTreeSet<_>>()
                .len(),
            ..Self::default()
        };
        if games.is_empty() {
            return summary;
        }

        for game in games {
            for (name, count) in &game.events {
                *summary.event_totals.entry(name.clone()).or_default() += *count as u64;
            }
            for player in &game.players {
                *summary.mean_gold.entry(player.name.clone()).or_default() += player.gold as f64;
                *summary.mean_units.entry(player.name.clone()).or_default() +=
                    player.units.values().sum::<usize>() as f64;
            }
        }
        let n = games.len() as f64;
        for value in summary
            .mean_gold
            .values_mut()
            .chain(summary.mean_units.values_mut())
        {
            *value /= n;
        }
        summary
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual game summaries, in seed order
    pub games: Vec<RunSummary>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Error during batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Game index
    pub game_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Run `scenario` once per seed of the batch
pub fn run_batch(scenario: &Scenario, config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    info!(
        "Starting batch run: {} games of '{}'",
        config.game_count, config.scenario
    );

    // Configure thread pool if specified
    if config.parallel_games > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let results: Vec<Result<RunSummary, BatchError>> = (0..config.game_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            ScenarioRunner::new(scenario, Some(seed))
                .map(ScenarioRunner::run)
                .map_err(|e| {
                    warn!("Game {} failed: {}", i, e);
                    BatchError {
                        game_index: i,
                        seed,
                        message: e.to_string(),
                    }
                })
        })
        .collect();

    let (games, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let games: Vec<RunSummary> = games.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} games in {:.1}s ({} distinct outcomes)",
        games.len(),
        duration_seconds,
        summary.distinct_outcomes
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Error from [`verify_determinism`].
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The scenario could not be set up.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    /// The runs drifted apart, or their snapshots could not be taken.
    #[error(transparent)]
    Game(#[from] GameError),
}

/// Outcome of a successful [`verify_determinism`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Runs compared
    pub runs: u32,
    /// Ticks each run was stepped
    pub ticks: u64,
    /// State hash every run ended on
    pub final_hash: u64,
}

/// Run `scenario` with `seed` `runs` times in lockstep.
///
/// State hashes are compared after every tick and the encoded snapshots
/// after the last one.
pub fn verify_determinism(scenario: &Scenario, seed: u64, runs: u32) -> Result<VerifyReport, VerifyError> {
    let mut runners = (0..runs.max(2))
        .map(|_| ScenarioRunner::new(scenario, Some(seed)))
        .collect::<Result<Vec<_>, _>>()?;

    let desync = |tick, local_hash, remote_hash| GameError::DesyncDetected {
        tick,
        local_hash,
        remote_hash,
    };

    while !runners[0].is_finished() {
        let mut hashes = runners.iter_mut().map(|r| {
            let tick = r.step().tick;
            (tick, r.simulation().state_hash())
        });
        let Some((tick, local)) = hashes.next() else {
            break;
        };
        if let Some((_, remote)) = hashes.find(|&(_, h)| h != local) {
            return Err(desync(tick, local, remote).into());
        }
    }

    let reference = runners[0].simulation();
    let (tick, local) = (reference.get_tick(), reference.state_hash());
    let snapshot = reference.snapshot()?;
    for other in &runners[1..] {
        if other.simulation().snapshot()? != snapshot {
            return Err(desync(tick, local, other.simulation().state_hash()).into());
        }
    }

    info!(runs = runners.len(), tick, final_hash = local, "runs agree");
    Ok(VerifyReport {
        runs: runners.len() as u32,
        ticks: tick,
        final_hash: local,
    })
}
