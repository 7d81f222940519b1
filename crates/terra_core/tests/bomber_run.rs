//! A full bomber sortie driven through the public simulation API.
//!
//! Red's airfield sits ten tiles west of a blue city. The bomber carries
//! three bombs, drops one every five ticks while over the city and then
//! flies home and lands.

use terra_core::config::{BomberConfig, GameConfig};
use terra_core::execution::UnitSource;
use terra_core::executions::BomberExecution;
use terra_core::map::{GameMap, TileRef};
use terra_core::simulation::Simulation;
use terra_core::units::{UnitId, UnitKind};
use terra_core::world::GameEvent;
use terra_test_utils::fixtures::{self, BLUE, RED};

struct Sortie {
    sim: Simulation,
    city: UnitId,
    airfield: TileRef,
}

fn sortie() -> Sortie {
    let config = GameConfig {
        bomber: BomberConfig {
            payload: 3,
            drop_cadence: 5,
            speed: 2,
            ..BomberConfig::default()
        },
        ..GameConfig::default()
    };
    let mut world = fixtures::two_player_world(fixtures::plains(48, 32), config, 1000, 0);
    fixtures::place(&mut world, RED, UnitKind::Airfield, 10, 16);
    let city = fixtures::place(&mut world, BLUE, UnitKind::City, 20, 16);
    let airfield = world.map().tile_ref(10, 16);
    world.drain_events();

    let mut sim = Simulation::from_world(world);
    sim.add_execution(BomberExecution::new(
        UnitSource::spawn(RED, airfield),
        Some(city),
    ));
    Sortie {
        sim,
        city,
        airfield,
    }
}

/// Events of interest, tagged with the tick that produced them.
fn timeline(sim: &mut Simulation, ticks: u64) -> Vec<(u64, GameEvent)> {
    (0..ticks)
        .flat_map(|_| {
            let tick = sim.tick();
            tick.events.into_iter().map(move |e| (tick.tick, e))
        })
        .filter(|(_, e)| {
            matches!(
                e,
                GameEvent::PayloadDropped { .. }
                    | GameEvent::ReturningToBase { .. }
                    | GameEvent::UnitDeleted {
                        kind: UnitKind::Bomber,
                        ..
                    }
            )
        })
        .collect()
}

#[test]
fn bomber_drops_full_payload_then_lands() {
    let Sortie { mut sim, city, .. } = sortie();
    let city_tile = sim.world().unit(city).map(|u| u.tile);

    let events = timeline(&mut sim, 40);

    let drops: Vec<u64> = events
        .iter()
        .filter_map(|(tick, e)| match e {
            GameEvent::PayloadDropped { target, tile, .. } => {
                assert_eq!(*target, city);
                assert_eq!(Some(*tile), city_tile);
                Some(*tick)
            }
            _ => None,
        })
        .collect();
    assert_eq!(drops, vec![5, 10, 15]);

    let returning: Vec<u64> = events
        .iter()
        .filter(|(_, e)| matches!(e, GameEvent::ReturningToBase { .. }))
        .map(|(tick, _)| *tick)
        .collect();
    assert_eq!(returning, vec![15]);

    let landed: Vec<u64> = events
        .iter()
        .filter(|(_, e)| matches!(e, GameEvent::UnitDeleted { .. }))
        .map(|(tick, _)| *tick)
        .collect();
    assert_eq!(landed, vec![20]);

    assert!(sim.world().player_units(RED, UnitKind::Bomber).is_empty());
    assert_eq!(sim.scheduler().live_count(), 0);
}

#[test]
fn bomber_lands_on_its_airfield() {
    let Sortie {
        mut sim, airfield, ..
    } = sortie();
    sim.run(20);
    let bomber = sim.world().player_units(RED, UnitKind::Bomber)[0].tile;
    assert_eq!(sim.world().map().manhattan_dist(bomber, airfield), 2);

    sim.tick();
    assert!(sim.world().player_units(RED, UnitKind::Bomber).is_empty());
}

#[test]
fn each_bomb_damages_the_city_once() {
    let Sortie { mut sim, city, .. } = sortie();
    sim.run(40);

    let blast = sim.world().config().bomb;
    let health = sim.world().unit(city).map(|u| u.health);
    assert_eq!(health, Some(2000 - 3 * blast.damage));
    assert!(sim.world().player_units(RED, UnitKind::Bomb).is_empty());
}

#[test]
fn bomber_is_charged_for() {
    let Sortie { mut sim, .. } = sortie();
    sim.tick();
    let cost = sim.world().config().unit_stats(UnitKind::Bomber).cost;
    let gold = sim.world().players().get(RED).map(|p| p.gold);
    assert_eq!(gold, Some(1000 - cost));
}
