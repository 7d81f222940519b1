//! Lockstep determinism of full skirmishes.

use terra_core::simulation::WorldSnapshot;
use terra_core::units::UnitKind;
use terra_core::world::GameEvent;
use terra_test_utils::determinism::{
    find_first_divergence, run_parallel_simulations_scoped, verify_determinism,
    verify_serialization_determinism,
};
use terra_test_utils::fixtures::{skirmish, BLUE, RED};

#[test]
fn skirmish_replays_identically() {
    let result = verify_determinism(
        3,
        300,
        || skirmish(2024),
        |s| {
            s.tick();
        },
        |s| s.state_hash(),
    );
    result.assert_deterministic();
}

#[test]
fn skirmish_events_never_diverge() {
    assert_eq!(find_first_divergence(|| skirmish(99), 250), None);
}

#[test]
fn skirmish_snapshots_roundtrip_mid_battle() {
    for ticks in [0, 25, 120] {
        assert!(
            verify_serialization_determinism(|| skirmish(5), ticks),
            "snapshot at tick {ticks} did not roundtrip"
        );
    }
}

#[test]
fn skirmish_runs_identically_across_threads() {
    run_parallel_simulations_scoped(|| skirmish(31), 6, 250).assert_deterministic();
}

#[test]
fn snapshot_restores_unit_positions() {
    let mut sim = skirmish(17);
    sim.run(90);
    let snapshot = WorldSnapshot::decode(&sim.snapshot().unwrap()).unwrap();

    for player in [RED, BLUE] {
        for kind in [UnitKind::Fighter, UnitKind::Warship, UnitKind::City] {
            let live: Vec<_> = sim
                .world()
                .player_units(player, kind)
                .into_iter()
                .map(|u| (u.id, u.tile, u.health))
                .collect();
            let restored: Vec<_> = snapshot
                .units
                .iter()
                .filter(|u| u.owner == player && u.kind == kind)
                .map(|u| (u.id, u.tile, u.health))
                .collect();
            assert_eq!(live, restored);
        }
    }
}

#[test]
fn skirmish_event_log_is_reproducible() {
    let log = |seed| {
        let mut sim = skirmish(seed);
        sim.run(200)
    };
    let first: Vec<GameEvent> = log(64);
    assert_eq!(first, log(64));
    assert!(first
        .iter()
        .any(|e| matches!(e, GameEvent::UnitBuilt { kind: UnitKind::AirDefense, .. })));
}
