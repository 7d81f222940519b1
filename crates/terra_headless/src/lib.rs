//! Headless scenario runner for balance sweeps and CI verification.
//!
//! Runs the deterministic simulation without any client attached:
//!
//! - **Scenario runs**: Load a RON scenario, play its scripted orders and
//!   print a JSON summary
//! - **Batch sweeps**: Play one scenario over a range of seeds in parallel
//! - **Determinism checks**: Replay a seed several times in lockstep and
//!   compare state hashes and snapshots
//!
//! Logs go to stderr; stdout carries JSON only.
//!
//! # Example
//!
//! ```bash
//! # Run the built-in scenario
//! cargo run -p terra_headless -- run
//!
//! # Run a scenario file with another seed
//! cargo run -p terra_headless -- run --scenario scenarios/coastal_skirmish.ron --seed 7
//!
//! # Verify determinism
//! cargo run -p terra_headless -- verify --runs 4
//! ```

pub mod batch;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults, VerifyReport};
pub use runner::{run_scenario, RunSummary, ScenarioRunner};
pub use scenario::{Order, Scenario, ScenarioError};
