//! Scenario runner.
//!
//! Turns a [`Scenario`] into a [`Simulation`], feeds it the scripted
//! orders tick by tick and summarises the outcome.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use terra_core::execution::UnitSource;
use terra_core::executions::{
    AirDefenseExecution, BomberExecution, ConstructionExecution, FighterExecution,
    MissileExecution, SpawnExecution, TransportShipExecution, WarshipExecution,
};
use terra_core::map::TileRef;
use terra_core::players::PlayerId;
use terra_core::simulation::{Simulation, TickEvents};
use terra_core::units::{UnitId, UnitKind};
use terra_core::world::{GameEvent, World};

use crate::scenario::{tile_at, Order, Scenario, ScenarioError, TimedOrder};

/// Build the tick-0 simulation for `scenario`.
///
/// `seed` replaces the scenario's configured seed when given.
pub fn build_simulation(scenario: &Scenario, seed: Option<u64>) -> Result<Simulation, ScenarioError> {
    let map = scenario.build_map()?;
    let mut sim = Simulation::new(Box::new(map), scenario.config_with_seed(seed));

    for player in scenario.initial_players() {
        sim.world_mut().add_player(player);
    }
    for setup in &scenario.players {
        for &ally in &setup.allies {
            let (a, b) = (PlayerId(setup.id), PlayerId(ally));
            if !sim.world_mut().players_mut().ally(a, b) {
                tracing::warn!(player = %a, ally = %b, "alliance ignored");
            }
        }
    }

    let mut batteries = Vec::new();
    for structure in &scenario.structures {
        let tile = tile_at(sim.world().map(), structure.at)?;
        let id = sim
            .world_mut()
            .place_unit(PlayerId(structure.owner), structure.kind, tile);
        if structure.kind == UnitKind::AirDefense {
            batteries.push(id);
        }
    }
    for battery in batteries {
        sim.add_execution(AirDefenseExecution::new(battery));
    }

    for setup in &scenario.players {
        if let Some(spawn) = setup.spawn {
            let tile = tile_at(sim.world().map(), spawn)?;
            sim.add_execution(SpawnExecution::new(PlayerId(setup.id), tile));
        }
    }

    // Setup is not part of the game's event log.
    sim.world_mut().drain_events();
    Ok(sim)
}

/// An advisory as reported in a [`RunSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryRecord {
    /// Tick that produced it.
    pub tick: u64,
    /// Recipient.
    pub player: u16,
    /// Text.
    pub message: String,
}

/// Final state of one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    /// Player identifier.
    pub id: u16,
    /// Display name.
    pub name: String,
    /// Gold left.
    pub gold: u64,
    /// Troop pool.
    pub troops: u32,
    /// Units owned, by kind.
    pub units: BTreeMap<String, usize>,
}

/// Outcome of a scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Scenario name.
    pub scenario: String,
    /// Seed the world RNG was started from.
    pub seed: u64,
    /// Ticks simulated.
    pub ticks: u64,
    /// State hash after the last tick.
    pub state_hash: u64,
    /// Executions still running at the end.
    pub live_executions: usize,
    /// Per-player final state, in id order.
    pub players: Vec<PlayerSummary>,
    /// Number of events of each type.
    pub events: BTreeMap<String, usize>,
    /// Every advisory, in emission order.
    pub advisories: Vec<AdvisoryRecord>,
}

impl RunSummary {
    /// Pretty JSON for stdout.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Stable name of an event variant.
#[must_use]
pub fn event_name(event: &GameEvent) -> &'static str {
    match event {
        GameEvent::UnitBuilt { .. } => "unit_built",
        GameEvent::UnitDestroyed { .. } => "unit_destroyed",
        GameEvent::UnitDeleted { .. } => "unit_deleted",
        GameEvent::UnitCaptured { .. } => "unit_captured",
        GameEvent::PayloadDropped { .. } => "payload_dropped",
        GameEvent::ReturningToBase { .. } => "returning_to_base",
        GameEvent::Detonation { .. } => "detonation",
        GameEvent::TroopsLanded { .. } => "troops_landed",
        GameEvent::TransportFailed { .. } => "transport_failed",
        GameEvent::Advisory { .. } => "advisory",
    }
}

/// Drives one scenario to completion.
pub struct ScenarioRunner {
    name: String,
    seed: u64,
    ticks: u64,
    sim: Simulation,
    orders: Vec<TimedOrder>,
    next_order: usize,
    event_counts: BTreeMap<String, usize>,
    advisories: Vec<AdvisoryRecord>,
}

impl ScenarioRunner {
    /// Prepare a run of `scenario`, optionally overriding its seed.
    pub fn new(scenario: &Scenario, seed: Option<u64>) -> Result<Self, ScenarioError> {
        let sim = build_simulation(scenario, seed)?;
        let mut orders = scenario.orders.clone();
        // Stable: orders for the same tick keep their file order.
        orders.sort_by_key(|o| o.tick);

        Ok(Self {
            name: scenario.name.clone(),
            seed: sim.world().config().seed,
            ticks: scenario.ticks,
            sim,
            orders,
            next_order: 0,
            event_counts: BTreeMap::new(),
            advisories: Vec::new(),
        })
    }

    /// The simulation being driven.
    #[must_use]
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Whether the scripted number of ticks has been simulated.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.sim.get_tick() >= self.ticks
    }

    /// Issue the orders due this tick, then advance one tick.
    pub fn step(&mut self) -> TickEvents {
        let now = self.sim.get_tick();
        while let Some(order) = self.orders.get(self.next_order) {
            if order.tick > now {
                break;
            }
            let order = order.clone();
            self.next_order += 1;
            issue(&mut self.sim, &order);
        }

        let events = self.sim.tick();
        for event in &events.events {
            *self.event_counts.entry(event_name(event).to_string()).or_default() += 1;
            if let GameEvent::Advisory { player, message } = event {
                self.advisories.push(AdvisoryRecord {
                    tick: events.tick,
                    player: player.0,
                    message: message.clone(),
                });
            }
        }
        events
    }

    /// Run the remaining ticks and summarise.
    #[must_use]
    pub fn run(mut self) -> RunSummary {
        tracing::info!(scenario = %self.name, seed = self.seed, ticks = self.ticks, "run started");
        while !self.is_finished() {
            self.step();
        }
        let summary = self.summary();
        tracing::info!(
            scenario = %summary.scenario,
            state_hash = summary.state_hash,
            live = summary.live_executions,
            "run finished"
        );
        summary
    }

    /// Summary of the state reached so far.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let world = self.sim.world();
        let players = world
            .players()
            .iter()
            .map(|player| {
                let mut units = BTreeMap::new();
                for unit in world.units().iter().filter(|u| u.owner == player.id) {
                    *units.entry(format!("{:?}", unit.kind)).or_default() += 1;
                }
                PlayerSummary {
                    id: player.id.0,
                    name: player.name.clone(),
                    gold: player.gold,
                    troops: player.troops,
                    units,
                }
            })
            .collect();

        RunSummary {
            scenario: self.name.clone(),
            seed: self.seed,
            ticks: self.sim.get_tick(),
            state_hash: self.sim.state_hash(),
            live_executions: self.sim.scheduler().live_count(),
            players,
            events: self.event_counts.clone(),
            advisories: self.advisories.clone(),
        }
    }
}

/// Run `scenario` from start to finish.
pub fn run_scenario(scenario: &Scenario, seed: Option<u64>) -> Result<RunSummary, ScenarioError> {
    Ok(ScenarioRunner::new(scenario, seed)?.run())
}

/// First unit standing on `tile` that `player` could act against.
fn hostile_unit_at(world: &World, player: PlayerId, tile: TileRef) -> Option<UnitId> {
    world
        .units_in_range(tile, 0)
        .into_iter()
        .find(|u| !world.is_friendly(player, u.owner))
        .map(|u| u.id)
}

/// Queue the execution carrying out `order`.
///
/// Coordinates were checked when the scenario was loaded.
fn issue(sim: &mut Simulation, order: &TimedOrder) {
    let player = PlayerId(order.player);
    let tile = |sim: &Simulation, at| match tile_at(sim.world().map(), at) {
        Ok(tile) => tile,
        Err(e) => panic!("order coordinates escaped validation: {e}"),
    };
    tracing::debug!(tick = order.tick, player = %player, order = ?order.order, "issuing order");

    match order.order {
        Order::Build { kind, at } => {
            let at = tile(sim, at);
            sim.add_execution(ConstructionExecution::new(player, kind, at));
        }
        Order::LaunchFighter { from } => {
            let from = tile(sim, from);
            sim.add_execution(FighterExecution::new(UnitSource::spawn(player, from)));
        }
        Order::LaunchBomber { from, target } => {
            let from = tile(sim, from);
            let target = target.and_then(|t| {
                let t = tile(sim, t);
                hostile_unit_at(sim.world(), player, t)
            });
            sim.add_execution(BomberExecution::new(UnitSource::spawn(player, from), target));
        }
        Order::LaunchMissile { from, target } => {
            let (from, target) = (tile(sim, from), tile(sim, target));
            sim.add_execution(MissileExecution::new(UnitSource::spawn(player, from), target));
        }
        Order::SendTransport { from, to, troops } => {
            let (from, to) = (tile(sim, from), tile(sim, to));
            sim.add_execution(TransportShipExecution::new(
                UnitSource::spawn(player, from),
                to,
                troops,
            ));
        }
        Order::LaunchWarship { from } => {
            let from = tile(sim, from);
            sim.add_execution(WarshipExecution::new(UnitSource::spawn(player, from)));
        }
        Order::Capture { at } => {
            let at = tile(sim, at);
            let world = sim.world_mut();
            match hostile_unit_at(world, player, at) {
                Some(unit) => {
                    world.capture_unit(unit, player);
                }
                None => world.advise(player, format!("nothing to capture at {at}")),
            }
        }
    }
}
