//! Error types for the simulation core.
//!
//! Only the IO-adjacent surface is fallible: config parsing, map
//! construction and snapshots. Gameplay outcomes such as "cannot build
//! here" or "no path" are ordinary return values, never errors.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for the simulation core.
#[derive(Debug, Error)]
pub enum GameError {
    /// Failed to parse a configuration document.
    #[error("Failed to parse config: {0}")]
    ConfigParse(String),

    /// Failed to read a data file.
    #[error("Failed to read '{path}': {message}")]
    Io {
        /// Path to the file that failed to load.
        path: String,
        /// Error message.
        message: String,
    },

    /// Map dimensions or contents are unusable.
    #[error("Invalid map: {0}")]
    InvalidMap(String),

    /// A coordinate fell outside the map.
    #[error("Coordinate ({x}, {y}) is outside the {width}x{height} map")]
    OutOfBounds {
        /// Requested x.
        x: i64,
        /// Requested y.
        y: i64,
        /// Map width.
        width: u32,
        /// Map height.
        height: u32,
    },

    /// Unknown player identifier.
    #[error("Unknown player: {0}")]
    UnknownPlayer(u16),

    /// Snapshot encoding or decoding failed.
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Desync detected between two simulations.
    #[error("Desync detected at tick {tick}: local hash {local_hash}, remote hash {remote_hash}")]
    DesyncDetected {
        /// Tick where desync occurred.
        tick: u64,
        /// Local simulation hash.
        local_hash: u64,
        /// Remote simulation hash.
        remote_hash: u64,
    },
}
