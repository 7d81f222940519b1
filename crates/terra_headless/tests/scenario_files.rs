//! Shipped scenario files load, validate and replay deterministically.

use std::path::PathBuf;

use terra_headless::batch::verify_determinism;
use terra_headless::runner::run_scenario;
use terra_headless::scenario::Scenario;
use proptest::prelude::*;
use terra_test_utils::determinism::strategies::arb_seed;

fn scenario_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(name)
}

#[test]
fn shipped_skirmish_matches_builtin() {
    let loaded = Scenario::load(scenario_path("coastal_skirmish.ron")).unwrap();
    let builtin = Scenario::coastal_skirmish();

    assert_eq!(loaded.name, builtin.name);
    assert_eq!(loaded.map, builtin.map);
    assert_eq!(loaded.config, builtin.config);
    assert_eq!(loaded.players, builtin.players);
    assert_eq!(loaded.structures, builtin.structures);
    assert_eq!(loaded.orders, builtin.orders);
    assert_eq!(loaded.ticks, builtin.ticks);
}

#[test]
fn shipped_skirmish_summary_is_stable() {
    let scenario = Scenario::load(scenario_path("coastal_skirmish.ron")).unwrap();
    let first = run_scenario(&scenario, Some(3)).unwrap();
    let second = run_scenario(&scenario, Some(3)).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.ticks, scenario.ticks);
    assert!(first.events.get("unit_built").copied().unwrap_or(0) >= 4);
}

#[test]
fn shipped_skirmish_replays_in_lockstep() {
    let mut scenario = Scenario::load(scenario_path("coastal_skirmish.ron")).unwrap();
    scenario.ticks = 150;
    let report = verify_determinism(&scenario, 77, 3).unwrap();
    assert_eq!(report.ticks, 150);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn any_seed_replays_identically(seed in arb_seed()) {
        let mut scenario = Scenario::coastal_skirmish();
        scenario.ticks = 60;
        let report = verify_determinism(&scenario, seed, 2);
        prop_assert!(report.is_ok());
    }
}
