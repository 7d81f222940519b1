//! Test fixtures and helpers.
//!
//! Pre-built maps, worlds and simulations for consistent testing.

use terra_core::config::GameConfig;
use terra_core::execution::UnitSource;
use terra_core::executions::{
    BomberExecution, ConstructionExecution, FighterExecution, SpawnExecution,
    TransportShipExecution, WarshipExecution,
};
use terra_core::map::{GridMap, TerrainType};
use terra_core::players::{Player, PlayerId};
use terra_core::simulation::Simulation;
use terra_core::units::{UnitId, UnitKind};
use terra_core::world::World;

/// First fixture player.
pub const RED: PlayerId = PlayerId(1);

/// Second fixture player.
pub const BLUE: PlayerId = PlayerId(2);

/// A map of nothing but plains.
///
/// # Panics
///
/// Panics if either dimension is zero.
#[must_use]
pub fn plains(width: u32, height: u32) -> GridMap {
    GridMap::filled(width, height, TerrainType::Plains).expect("fixture map dimensions")
}

/// A map of nothing but ocean.
///
/// # Panics
///
/// Panics if either dimension is zero.
#[must_use]
pub fn open_sea(width: u32, height: u32) -> GridMap {
    GridMap::filled(width, height, TerrainType::Ocean).expect("fixture map dimensions")
}

/// Plains in the first `land_rows` rows, ocean below.
///
/// Row `land_rows - 1` is the shoreline.
///
/// # Panics
///
/// Panics if either dimension is zero or `land_rows >= height`.
#[must_use]
pub fn coast(width: u32, height: u32, land_rows: u32) -> GridMap {
    assert!(land_rows < height, "coast needs at least one row of sea");
    let mut map = open_sea(width, height);
    for y in 0..land_rows {
        for x in 0..width {
            map.set_terrain(x, y, TerrainType::Plains);
        }
    }
    map
}

/// A world with [`RED`] and [`BLUE`], each holding `gold` and `troops`.
#[must_use]
pub fn two_player_world(map: GridMap, config: GameConfig, gold: u64, troops: u32) -> World {
    let mut world = World::new(Box::new(map), config);
    for (id, name) in [(RED, "red"), (BLUE, "blue")] {
        let mut player = Player::new(id, name);
        player.gold = gold;
        player.troops = troops;
        world.add_player(player);
    }
    world
}

/// Place a structure for free and return its id.
pub fn place(world: &mut World, owner: PlayerId, kind: UnitKind, x: u32, y: u32) -> UnitId {
    let tile = world.map().tile_ref(x, y);
    world.place_unit(owner, kind, tile)
}

/// Layout of the [`skirmish`] map.
pub mod layout {
    /// Map width.
    pub const WIDTH: u32 = 64;
    /// Map height.
    pub const HEIGHT: u32 = 48;
    /// Rows of land; the rest is sea.
    pub const LAND_ROWS: u32 = 32;
    /// Shoreline row.
    pub const SHORE: u32 = LAND_ROWS - 1;
    /// Red's column.
    pub const RED_X: u32 = 12;
    /// Blue's column.
    pub const BLUE_X: u32 = 52;
}

/// A two-player coastal skirmish exercising every unit-driving execution.
///
/// Both players place a city during a two-tick spawn phase and start
/// with an airfield and a port. Red launches a fighter, a bomber aimed at
/// blue's airfield and a transport toward blue's shore. Blue launches a
/// fighter and a warship and builds an air defense battery by its city.
#[must_use]
pub fn skirmish(seed: u64) -> Simulation {
    use layout::{BLUE_X, HEIGHT, LAND_ROWS, RED_X, SHORE, WIDTH};

    let config = GameConfig {
        seed,
        spawn_phase_ticks: 2,
        ..GameConfig::default()
    };
    let world = two_player_world(coast(WIDTH, HEIGHT, LAND_ROWS), config, 0, 300);
    let mut sim = Simulation::from_world(world);

    let mut airfields = Vec::new();
    for (player, x) in [(RED, RED_X), (BLUE, BLUE_X)] {
        let city = sim.world().map().tile_ref(x, 16);
        sim.add_execution(SpawnExecution::new(player, city));
        airfields.push(place(sim.world_mut(), player, UnitKind::Airfield, x, 12));
        place(sim.world_mut(), player, UnitKind::Port, x, SHORE);

        let airfield = sim.world().map().tile_ref(x, 12);
        sim.add_execution(FighterExecution::new(UnitSource::spawn(player, airfield)));
    }

    let red_field = sim.world().map().tile_ref(RED_X, 12);
    let red_port = sim.world().map().tile_ref(RED_X, SHORE);
    let blue_port = sim.world().map().tile_ref(BLUE_X, SHORE);
    let blue_shore = sim.world().map().tile_ref(BLUE_X - 4, SHORE);
    let battery = sim.world().map().tile_ref(BLUE_X - 2, 16);

    sim.add_execution(BomberExecution::new(
        UnitSource::spawn(RED, red_field),
        Some(airfields[1]),
    ));
    sim.add_execution(TransportShipExecution::new(
        UnitSource::spawn(RED, red_port),
        blue_shore,
        150,
    ));
    sim.add_execution(WarshipExecution::new(UnitSource::spawn(BLUE, blue_port)));
    sim.add_execution(ConstructionExecution::new(BLUE, UnitKind::AirDefense, battery));
    sim
}

#[cfg(test)]
mod tests {
    use super::*;
    use terra_core::map::GameMap;

    #[test]
    fn test_coast_has_shoreline() {
        let map = coast(8, 6, 3);
        assert!(map.is_shore(map.tile_ref(4, 2)));
        assert!(!map.is_shore(map.tile_ref(4, 1)));
        assert!(map.is_water(map.tile_ref(4, 3)));
    }

    #[test]
    fn test_two_player_world() {
        let world = two_player_world(plains(4, 4), GameConfig::default(), 500, 20);
        assert_eq!(world.players().len(), 2);
        assert_eq!(world.players().get(BLUE).map(|p| p.gold), Some(500));
        assert_eq!(world.players().get(RED).map(|p| p.troops), Some(20));
    }

    #[test]
    fn test_skirmish_builds_both_sides() {
        let mut sim = skirmish(3);
        sim.run(5);
        for player in [RED, BLUE] {
            assert_eq!(sim.world().player_units(player, UnitKind::City).len(), 1);
            assert_eq!(sim.world().player_units(player, UnitKind::Fighter).len(), 1);
        }
        assert_eq!(sim.world().player_units(RED, UnitKind::Bomber).len(), 1);
        assert_eq!(sim.world().player_units(BLUE, UnitKind::Warship).len(), 1);
    }
}
