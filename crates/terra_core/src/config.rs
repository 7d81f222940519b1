//! Game configuration.
//!
//! Every balance number the executions read lives here. Configs are
//! plain data deserialized from RON; every section has defaults so a
//! config file only needs to name what it changes.
//!
//! # Example RON
//!
//! ```ron
//! GameConfig(
//!     seed: 42,
//!     spawn_phase_ticks: 10,
//!     bomber: (payload: 3, drop_cadence: 5, speed: 2),
//!     pathfinding: (
//!         limits: (iterations_per_call: 500, max_tries: 40),
//!     ),
//! )
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::pathfinding::{RecomputePolicy, SearchLimits};
use crate::units::UnitKind;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Master seed for every random decision in the game.
    pub seed: u64,
    /// Number of ticks at the start of the game reserved for placement.
    pub spawn_phase_ticks: u64,
    /// How many extra ticks a unit spawn may be retried before the
    /// execution gives up. Zero fails on the first rejection.
    pub spawn_retry_limit: u32,
    /// Search budgets and route caching.
    pub pathfinding: PathfindingConfig,
    /// Cost and health per unit kind.
    pub units: BTreeMap<UnitKind, UnitStats>,
    /// Spawn-phase city placement.
    pub spawn: SpawnConfig,
    /// Structure construction.
    pub construction: ConstructionConfig,
    /// Fighter behaviour.
    pub fighter: FighterConfig,
    /// Bomber behaviour.
    pub bomber: BomberConfig,
    /// Bomb flight and blast.
    pub bomb: BlastConfig,
    /// Missile flight and blast.
    pub missile: BlastConfig,
    /// Cannon rounds.
    pub shell: ProjectileConfig,
    /// Air defense batteries.
    pub air_defense: AirDefenseConfig,
    /// Interceptors launched by air defense.
    pub interceptor: ProjectileConfig,
    /// Warship behaviour.
    pub warship: WarshipConfig,
    /// Transport ship behaviour.
    pub transport: TransportConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            spawn_phase_ticks: 0,
            spawn_retry_limit: 0,
            pathfinding: PathfindingConfig::default(),
            units: default_unit_stats(),
            spawn: SpawnConfig::default(),
            construction: ConstructionConfig::default(),
            fighter: FighterConfig::default(),
            bomber: BomberConfig::default(),
            bomb: BlastConfig {
                speed: 4,
                damage: 150,
                radius: 2,
            },
            missile: BlastConfig {
                speed: 6,
                damage: 600,
                radius: 6,
            },
            shell: ProjectileConfig {
                speed: 4,
                lifetime_ticks: 30,
            },
            air_defense: AirDefenseConfig::default(),
            interceptor: ProjectileConfig {
                speed: 3,
                lifetime_ticks: 60,
            },
            warship: WarshipConfig::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl GameConfig {
    /// Parse a config from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ConfigParse`] if the text is not a valid config.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| GameError::ConfigParse(e.to_string()))
    }

    /// Load a config from a RON file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Io`] if the file cannot be read and
    /// [`GameError::ConfigParse`] if it does not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| GameError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_ron_str(&text)
    }

    /// Cost and health of a unit kind. Unlisted kinds are free with one
    /// hit point.
    #[must_use]
    pub fn unit_stats(&self, kind: UnitKind) -> UnitStats {
        self.units.get(&kind).copied().unwrap_or_default()
    }
}

/// Search budgets shared by every path finder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PathfindingConfig {
    /// Per-call iterations and total tries.
    pub limits: SearchLimits,
    /// When cached routes are discarded.
    pub recompute: RecomputePolicy,
}

/// Price and durability of a unit kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStats {
    /// Gold charged when built.
    pub cost: u64,
    /// Maximum health.
    pub health: u32,
}

impl Default for UnitStats {
    fn default() -> Self {
        Self { cost: 0, health: 1 }
    }
}

fn default_unit_stats() -> BTreeMap<UnitKind, UnitStats> {
    [
        (UnitKind::Airfield, 500, 1000),
        (UnitKind::AirDefense, 300, 800),
        (UnitKind::Port, 300, 800),
        (UnitKind::City, 0, 2000),
        (UnitKind::MissileSilo, 600, 1000),
        (UnitKind::Construction, 0, 200),
        (UnitKind::Fighter, 100, 100),
        (UnitKind::Bomber, 150, 150),
        (UnitKind::Bomb, 0, 1),
        (UnitKind::Missile, 200, 20),
        (UnitKind::Interceptor, 0, 1),
        (UnitKind::Shell, 0, 1),
        (UnitKind::Warship, 250, 400),
        (UnitKind::TransportShip, 50, 100),
    ]
    .into_iter()
    .map(|(kind, cost, health)| (kind, UnitStats { cost, health }))
    .collect()
}

/// Spawn-phase city placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Troops stationed in a newly placed city.
    pub city_troops: u32,
    /// Gold granted to a player when their city is placed.
    pub starting_gold: u64,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            city_troops: 100,
            starting_gold: 1000,
        }
    }
}

/// Structure construction timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstructionConfig {
    /// Ticks between placing a construction site and the finished structure.
    pub duration_ticks: u32,
}

impl Default for ConstructionConfig {
    fn default() -> Self {
        Self { duration_ticks: 20 }
    }
}

/// Fighter patrol and dogfight tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FighterConfig {
    /// Tiles moved per tick.
    pub speed: u32,
    /// Patrol tiles are drawn within this distance of the home airfield.
    pub patrol_range: u32,
    /// Random draws before a patrol tile search gives up for the tick.
    pub patrol_attempts: u32,
    /// Radius scanned for targets.
    pub targeting_range: u32,
    /// Inner radius of the dogfight band.
    pub dogfight_inner: u32,
    /// Outer radius of the dogfight band.
    pub dogfight_outer: u32,
    /// Orbit points are never closer to the target than this.
    pub min_safe_distance: u32,
    /// Shells are fired within this distance.
    pub attack_range: u32,
    /// Ticks between shells.
    pub fire_cadence: u32,
    /// Distance at which an orbit point counts as reached.
    pub reached_distance: u32,
    /// Damage per shell.
    pub shell_damage: u32,
}

impl Default for FighterConfig {
    fn default() -> Self {
        Self {
            speed: 2,
            patrol_range: 60,
            patrol_attempts: 32,
            targeting_range: 40,
            dogfight_inner: 4,
            dogfight_outer: 6,
            min_safe_distance: 3,
            attack_range: 8,
            fire_cadence: 5,
            reached_distance: 1,
            shell_damage: 25,
        }
    }
}

/// Bomber payload runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BomberConfig {
    /// Tiles moved per tick.
    pub speed: u32,
    /// Bombs carried.
    pub payload: u32,
    /// Ticks between drops while over a target.
    pub drop_cadence: u32,
    /// Radius scanned for a replacement target.
    pub targeting_range: u32,
}

impl Default for BomberConfig {
    fn default() -> Self {
        Self {
            speed: 2,
            payload: 3,
            drop_cadence: 5,
            targeting_range: 30,
        }
    }
}

/// Parabolic payload flight and detonation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlastConfig {
    /// Tiles of arc travelled per tick.
    pub speed: u32,
    /// Damage dealt to every unit in the blast.
    pub damage: u32,
    /// Blast radius in tiles.
    pub radius: u32,
}

impl Default for BlastConfig {
    fn default() -> Self {
        Self {
            speed: 4,
            damage: 100,
            radius: 2,
        }
    }
}

/// Straight-line projectile flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileConfig {
    /// Tiles moved per tick.
    pub speed: u32,
    /// Ticks before the projectile expires without hitting.
    pub lifetime_ticks: u32,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            speed: 4,
            lifetime_ticks: 30,
        }
    }
}

/// Air defense battery tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AirDefenseConfig {
    /// Radius scanned for incoming missiles and bombers.
    pub range: u32,
    /// Ticks between interceptor launches.
    pub cooldown_ticks: u32,
}

impl Default for AirDefenseConfig {
    fn default() -> Self {
        Self {
            range: 25,
            cooldown_ticks: 10,
        }
    }
}

/// Warship patrol and gunnery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarshipConfig {
    /// Tiles moved per tick.
    pub speed: u32,
    /// Patrol tiles are drawn within this distance of the patrol centre.
    pub patrol_range: u32,
    /// Random draws before a patrol tile search gives up for the tick.
    pub patrol_attempts: u32,
    /// Radius scanned for targets.
    pub targeting_range: u32,
    /// Shells are fired within this distance.
    pub attack_range: u32,
    /// Ticks between shells.
    pub fire_cadence: u32,
    /// Damage per shell.
    pub shell_damage: u32,
}

impl Default for WarshipConfig {
    fn default() -> Self {
        Self {
            speed: 1,
            patrol_range: 30,
            patrol_attempts: 50,
            targeting_range: 25,
            attack_range: 10,
            fire_cadence: 10,
            shell_damage: 50,
        }
    }
}

/// Transport ship movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Tiles moved per tick.
    pub speed: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { speed: 1 }
    }
}
