//! Scenario loading and configuration.
//!
//! Scenarios define the initial game state for headless runs: the map as
//! ASCII rows, the game config, players with their starting resources and
//! structures, and a list of orders issued at given ticks.
//!
//! # Example RON
//!
//! ```ron
//! Scenario(
//!     name: "Strait",
//!     map: [
//!         "########",
//!         "~~~~~~~~",
//!         "########",
//!     ],
//!     ticks: 100,
//!     players: [
//!         (id: 1, name: "red", gold: 1000, spawn: Some((1, 0))),
//!         (id: 2, name: "blue", gold: 1000, spawn: Some((6, 2))),
//!     ],
//!     structures: [(owner: 1, kind: Port, at: (3, 0))],
//!     orders: [
//!         (tick: 5, player: 1, order: LaunchWarship(from: (3, 0))),
//!     ],
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use terra_core::config::GameConfig;
use terra_core::error::GameError;
use terra_core::map::{GameMap, GridMap, TileRef};
use terra_core::players::{Player, PlayerId};
use terra_core::units::UnitKind;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The scenario is well-formed but does not describe a playable game.
    #[error("Invalid scenario: {0}")]
    Invalid(#[from] GameError),
    /// A structure entry names something that is not a structure.
    #[error("{0:?} cannot be placed as a starting structure")]
    NotAStructure(UnitKind),
}

/// Lattice coordinates as written in scenario files.
pub type Coord = (u32, u32);

/// A player taking part in the scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSetup {
    /// Player identifier.
    pub id: u16,
    /// Display name.
    pub name: String,
    /// Starting gold.
    #[serde(default)]
    pub gold: u64,
    /// Starting troop pool.
    #[serde(default)]
    pub troops: u32,
    /// Where the player places their city during the spawn phase.
    #[serde(default)]
    pub spawn: Option<Coord>,
    /// Allied player identifiers.
    #[serde(default)]
    pub allies: Vec<u16>,
}

/// A structure standing at the start of the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructurePlacement {
    /// Owning player.
    pub owner: u16,
    /// Structure kind.
    pub kind: UnitKind,
    /// Location.
    pub at: Coord,
}

/// Something a player asks for during the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    /// Put up a structure through a construction site.
    Build {
        /// Structure kind.
        kind: UnitKind,
        /// Site.
        at: Coord,
    },
    /// Launch a fighter from the airfield nearest `from`.
    LaunchFighter {
        /// Requested launch point.
        from: Coord,
    },
    /// Launch a bomber from the airfield nearest `from`.
    LaunchBomber {
        /// Requested launch point.
        from: Coord,
        /// Tile of the unit to bomb; the bomber picks its own target if
        /// nothing stands there.
        #[serde(default)]
        target: Option<Coord>,
    },
    /// Fire a missile from the silo nearest `from`.
    LaunchMissile {
        /// Requested launch point.
        from: Coord,
        /// Ground zero.
        target: Coord,
    },
    /// Ship troops from the port nearest `from` to a shore tile.
    SendTransport {
        /// Requested launch point.
        from: Coord,
        /// Landing tile.
        to: Coord,
        /// Troops to embark.
        troops: u32,
    },
    /// Launch a warship from the port nearest `from`.
    LaunchWarship {
        /// Requested launch point.
        from: Coord,
    },
    /// Take over whatever unit stands at `at`.
    Capture {
        /// Tile of the unit to capture.
        at: Coord,
    },
}

impl Order {
    /// Every coordinate the order refers to.
    fn coords(&self) -> Vec<Coord> {
        match *self {
            Self::Build { at, .. } | Self::Capture { at } => vec![at],
            Self::LaunchFighter { from } | Self::LaunchWarship { from } => vec![from],
            Self::LaunchBomber { from, target } => std::iter::once(from).chain(target).collect(),
            Self::LaunchMissile { from, target } => vec![from, target],
            Self::SendTransport { from, to, .. } => vec![from, to],
        }
    }
}

/// An order issued by a player at a given tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedOrder {
    /// Tick on which the order is queued.
    pub tick: u64,
    /// Issuing player.
    pub player: u16,
    /// What to do.
    pub order: Order,
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Map rows, see [`GridMap::from_ascii`].
    pub map: Vec<String>,
    /// Game tunables.
    #[serde(default)]
    pub config: GameConfig,
    /// Number of ticks to run.
    pub ticks: u64,
    /// Participants.
    pub players: Vec<PlayerSetup>,
    /// Structures standing at tick 0.
    #[serde(default)]
    pub structures: Vec<StructurePlacement>,
    /// Orders, in any order; they are issued by tick.
    #[serde(default)]
    pub orders: Vec<TimedOrder>,
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Build the map.
    pub fn build_map(&self) -> Result<GridMap, ScenarioError> {
        Ok(GridMap::from_ascii(self.map.as_slice())?)
    }

    /// Check every reference against the map and the player list.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let map = self.build_map()?;
        let known = |id: u16| self.players.iter().any(|p| p.id == id);

        for player in &self.players {
            if let Some(spawn) = player.spawn {
                tile_at(&map, spawn)?;
            }
            if let Some(&ally) = player.allies.iter().find(|&&a| !known(a)) {
                return Err(GameError::UnknownPlayer(ally).into());
            }
        }
        for structure in &self.structures {
            if !known(structure.owner) {
                return Err(GameError::UnknownPlayer(structure.owner).into());
            }
            if !structure.kind.is_structure() || structure.kind == UnitKind::Construction {
                return Err(ScenarioError::NotAStructure(structure.kind));
            }
            tile_at(&map, structure.at)?;
        }
        for order in &self.orders {
            if !known(order.player) {
                return Err(GameError::UnknownPlayer(order.player).into());
            }
            for coord in order.order.coords() {
                tile_at(&map, coord)?;
            }
        }
        Ok(())
    }

    /// The players as the simulation sees them, allies not yet applied.
    #[must_use]
    pub fn initial_players(&self) -> Vec<Player> {
        self.players
            .iter()
            .map(|setup| {
                let mut player = Player::new(PlayerId(setup.id), setup.name.clone());
                player.gold = setup.gold;
                player.troops = setup.troops;
                player
            })
            .collect()
    }

    /// Copy of the config with the seed replaced.
    #[must_use]
    pub fn config_with_seed(&self, seed: Option<u64>) -> GameConfig {
        let mut config = self.config.clone();
        if let Some(seed) = seed {
            config.seed = seed;
        }
        config
    }

    /// Two coastal cities facing each other across a sea, with an air,
    /// missile and naval exchange.
    #[must_use]
    pub fn coastal_skirmish() -> Self {
        let land = "#".repeat(48);
        let sea = "~".repeat(48);
        let mut map = vec![land.clone(); 14];
        map.extend(std::iter::repeat(sea).take(12));
        map.extend(std::iter::repeat(land).take(14));

        let config = GameConfig {
            spawn_phase_ticks: 5,
            spawn_retry_limit: 3,
            ..GameConfig::default()
        };

        Self {
            name: "Coastal Skirmish".to_string(),
            description: "Two shores, one strait: fighters, bombers, a missile and ships"
                .to_string(),
            map,
            config,
            ticks: 400,
            players: vec![
                PlayerSetup {
                    id: 1,
                    name: "red".to_string(),
                    gold: 2000,
                    troops: 400,
                    spawn: Some((10, 4)),
                    allies: Vec::new(),
                },
                PlayerSetup {
                    id: 2,
                    name: "blue".to_string(),
                    gold: 2000,
                    troops: 400,
                    spawn: Some((36, 35)),
                    allies: Vec::new(),
                },
            ],
            structures: vec![
                StructurePlacement::new(1, UnitKind::Airfield, (6, 6)),
                StructurePlacement::new(1, UnitKind::Port, (12, 13)),
                StructurePlacement::new(1, UnitKind::MissileSilo, (4, 2)),
                StructurePlacement::new(2, UnitKind::Airfield, (40, 33)),
                StructurePlacement::new(2, UnitKind::Port, (34, 26)),
                StructurePlacement::new(2, UnitKind::AirDefense, (38, 36)),
            ],
            orders: vec![
                TimedOrder::new(6, 1, Order::LaunchFighter { from: (6, 6) }),
                TimedOrder::new(6, 2, Order::LaunchFighter { from: (40, 33) }),
                TimedOrder::new(
                    10,
                    1,
                    Order::LaunchBomber {
                        from: (6, 6),
                        target: Some((40, 33)),
                    },
                ),
                TimedOrder::new(12, 2, Order::LaunchWarship { from: (34, 26) }),
                TimedOrder::new(
                    20,
                    1,
                    Order::SendTransport {
                        from: (12, 13),
                        to: (30, 26),
                        troops: 150,
                    },
                ),
                TimedOrder::new(
                    30,
                    1,
                    Order::LaunchMissile {
                        from: (4, 2),
                        target: (36, 35),
                    },
                ),
                TimedOrder::new(
                    40,
                    2,
                    Order::Build {
                        kind: UnitKind::AirDefense,
                        at: (34, 36),
                    },
                ),
            ],
        }
    }
}

impl StructurePlacement {
    /// Shorthand constructor.
    #[must_use]
    pub fn new(owner: u16, kind: UnitKind, at: Coord) -> Self {
        Self { owner, kind, at }
    }
}

impl TimedOrder {
    /// Shorthand constructor.
    #[must_use]
    pub fn new(tick: u64, player: u16, order: Order) -> Self {
        Self {
            tick,
            player,
            order,
        }
    }
}

/// Resolve scenario coordinates on `map`.
pub fn tile_at(map: &dyn GameMap, (x, y): Coord) -> Result<TileRef, GameError> {
    map.try_tile_ref(i64::from(x), i64::from(y))
        .ok_or(GameError::OutOfBounds {
            x: i64::from(x),
            y: i64::from(y),
            width: map.width(),
            height: map.height(),
        })
}
