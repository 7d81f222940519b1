//! Mutable game state shared by every execution.
//!
//! [`World`] owns the map, the unit registry, the player table, the
//! config and the master RNG. Executions only ever reach game state
//! through it, so it is the single place where placement rules, damage
//! and ownership changes are applied and reported as [`GameEvent`]s.

use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::map::{GameMap, TileRef};
use crate::players::{Player, PlayerId, PlayerRegistry};
use crate::units::{Unit, UnitId, UnitKind, UnitStorage};

/// Something observable that happened during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A unit entered the registry.
    UnitBuilt {
        /// New unit.
        unit: UnitId,
        /// Its kind.
        kind: UnitKind,
        /// Its owner.
        owner: PlayerId,
        /// Where it was placed.
        tile: TileRef,
    },
    /// A unit's health reached zero.
    UnitDestroyed {
        /// Destroyed unit.
        unit: UnitId,
        /// Its kind.
        kind: UnitKind,
        /// Its owner at the time.
        owner: PlayerId,
    },
    /// A unit was removed without being destroyed (landed, expired,
    /// detonated, returned home).
    UnitDeleted {
        /// Removed unit.
        unit: UnitId,
        /// Its kind.
        kind: UnitKind,
        /// Its owner at the time.
        owner: PlayerId,
    },
    /// A unit changed hands.
    UnitCaptured {
        /// Captured unit.
        unit: UnitId,
        /// Its kind.
        kind: UnitKind,
        /// Previous owner.
        from: PlayerId,
        /// New owner.
        to: PlayerId,
    },
    /// A bomber released one unit of payload.
    PayloadDropped {
        /// Dropping bomber.
        bomber: UnitId,
        /// Unit being bombed.
        target: UnitId,
        /// Drop point.
        tile: TileRef,
    },
    /// An aircraft turned for home.
    ReturningToBase {
        /// Returning unit.
        unit: UnitId,
    },
    /// A bomb or missile went off.
    Detonation {
        /// What detonated.
        kind: UnitKind,
        /// Who fired it.
        owner: PlayerId,
        /// Ground zero.
        tile: TileRef,
        /// Blast radius in tiles.
        radius: u32,
    },
    /// A transport put troops ashore.
    TroopsLanded {
        /// Landing player.
        owner: PlayerId,
        /// Landing tile.
        tile: TileRef,
        /// Troops landed.
        troops: u32,
    },
    /// A transport could not reach its destination; troops were refunded.
    TransportFailed {
        /// Owner of the transport.
        owner: PlayerId,
        /// Troops returned to the player.
        troops: u32,
    },
    /// A message for one player, e.g. a rejected build.
    Advisory {
        /// Recipient.
        player: PlayerId,
        /// Human-readable text.
        message: String,
    },
}

/// Authoritative game state.
pub struct World {
    map: Box<dyn GameMap>,
    config: GameConfig,
    units: UnitStorage,
    players: PlayerRegistry,
    rng: ChaCha8Rng,
    tick: u64,
    events: Vec<GameEvent>,
}

impl World {
    /// Create an empty world. The master RNG is seeded from `config.seed`.
    #[must_use]
    pub fn new(map: Box<dyn GameMap>, config: GameConfig) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            map,
            config,
            units: UnitStorage::new(),
            players: PlayerRegistry::new(),
            tick: 0,
            events: Vec::new(),
        }
    }

    /// The map.
    #[must_use]
    pub fn map(&self) -> &dyn GameMap {
        self.map.as_ref()
    }

    /// The game configuration.
    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// All units.
    #[must_use]
    pub fn units(&self) -> &UnitStorage {
        &self.units
    }

    /// All players.
    #[must_use]
    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    /// Mutable access to the player table.
    pub fn players_mut(&mut self) -> &mut PlayerRegistry {
        &mut self.players
    }

    /// Add or replace a player.
    pub fn add_player(&mut self, player: Player) {
        self.players.insert(player);
    }

    /// Index of the tick currently being processed.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn advance_tick(&mut self) {
        self.tick += 1;
    }

    /// Whether the current tick falls in the placement phase.
    #[must_use]
    pub fn is_spawn_phase(&self) -> bool {
        self.tick < self.config.spawn_phase_ticks
    }

    /// Draw a seed for a per-execution RNG from the master stream.
    ///
    /// Executions are initialized in a deterministic order, so each one
    /// receives the same seed on every client.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.gen()
    }

    /// Record an event for this tick.
    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take every event recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Send an advisory message to a player.
    pub fn advise(&mut self, player: PlayerId, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(player = %player, text = %message, "advisory");
        self.emit(GameEvent::Advisory { player, message });
    }

    fn contains_tile(&self, tile: TileRef) -> bool {
        u64::from(tile.0) < u64::from(self.map.width()) * u64::from(self.map.height())
    }

    /// Whether no structure stands on `tile`.
    #[must_use]
    pub fn is_free_site(&self, tile: TileRef) -> bool {
        !self
            .units
            .iter()
            .any(|u| u.tile == tile && u.kind.is_structure())
    }

    /// Where a unit of `kind` requested at `tile` would be placed, if
    /// `owner` may build it at all.
    ///
    /// Aircraft launch from the owner's nearest airfield, ships from the
    /// nearest port and missiles from the nearest silo. Structures need a
    /// free land tile (a shore tile for ports). Projectiles appear where
    /// they are fired.
    #[must_use]
    pub fn can_build(&self, owner: PlayerId, kind: UnitKind, tile: TileRef) -> Option<TileRef> {
        let player = self.players.get(owner)?;
        if !self.contains_tile(tile) || player.gold < self.config.unit_stats(kind).cost {
            return None;
        }

        let launch_site = |site| self.nearest_player_unit(owner, site, tile).map(|u| u.tile);
        match kind {
            UnitKind::Fighter | UnitKind::Bomber => launch_site(UnitKind::Airfield),
            UnitKind::Warship | UnitKind::TransportShip => launch_site(UnitKind::Port),
            UnitKind::Missile => launch_site(UnitKind::MissileSilo),
            UnitKind::Port => (self.map.is_shore(tile) && self.is_free_site(tile)).then_some(tile),
            structure if structure.is_structure() => {
                (self.map.is_land(tile) && self.is_free_site(tile)).then_some(tile)
            }
            _ => Some(tile),
        }
    }

    /// Build a unit, charging its cost to `owner`.
    ///
    /// Callers check [`can_build`](Self::can_build) first and pass the
    /// tile it returned.
    pub fn build_unit(&mut self, owner: PlayerId, kind: UnitKind, tile: TileRef) -> UnitId {
        let cost = self.config.unit_stats(kind).cost;
        if let Some(player) = self.players.get_mut(owner) {
            player.gold = player.gold.saturating_sub(cost);
        }
        self.place_unit(owner, kind, tile)
    }

    /// Insert a unit without charging for it.
    pub fn place_unit(&mut self, owner: PlayerId, kind: UnitKind, tile: TileRef) -> UnitId {
        let health = self.config.unit_stats(kind).health;
        let id = self.units.insert(Unit::new(kind, owner, tile, health));
        tracing::debug!(unit = id, ?kind, owner = %owner, tile = %tile, "unit built");
        self.emit(GameEvent::UnitBuilt {
            unit: id,
            kind,
            owner,
            tile,
        });
        id
    }

    /// Charge for `kind` and place a construction site for it.
    pub fn begin_construction(&mut self, owner: PlayerId, kind: UnitKind, tile: TileRef) -> UnitId {
        let cost = self.config.unit_stats(kind).cost;
        if let Some(player) = self.players.get_mut(owner) {
            player.gold = player.gold.saturating_sub(cost);
        }
        let id = self.place_unit(owner, UnitKind::Construction, tile);
        if let Some(site) = self.units.get_mut(id) {
            site.constructing = Some(kind);
        }
        id
    }

    /// Look up a unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    /// Whether the unit is still in the registry.
    #[must_use]
    pub fn is_alive(&self, id: UnitId) -> bool {
        self.units.contains(id)
    }

    /// Same player, or allied.
    #[must_use]
    pub fn is_friendly(&self, a: PlayerId, b: PlayerId) -> bool {
        self.players.is_friendly(a, b)
    }

    /// Apply damage. Returns true if this destroyed the unit.
    pub fn damage_unit(&mut self, id: UnitId, amount: u32) -> bool {
        let Some(unit) = self.units.get_mut(id) else {
            return false;
        };
        unit.health = unit.health.saturating_sub(amount);
        if unit.health > 0 {
            return false;
        }

        if let Some(unit) = self.units.remove(id) {
            tracing::debug!(unit = id, kind = ?unit.kind, "unit destroyed");
            self.emit(GameEvent::UnitDestroyed {
                unit: id,
                kind: unit.kind,
                owner: unit.owner,
            });
        }
        true
    }

    /// Set or clear what a unit is engaging.
    pub fn set_target(&mut self, id: UnitId, target: Option<UnitId>) {
        if let Some(unit) = self.units.get_mut(id) {
            unit.target = target;
        }
    }

    /// Relocate a unit.
    pub fn move_unit(&mut self, id: UnitId, tile: TileRef) {
        if let Some(unit) = self.units.get_mut(id) {
            unit.tile = tile;
        }
    }

    /// Set the troops a unit carries.
    pub fn set_troops(&mut self, id: UnitId, troops: u32) {
        if let Some(unit) = self.units.get_mut(id) {
            unit.troops = troops;
        }
    }

    /// Remove a unit without destroying it.
    pub fn delete_unit(&mut self, id: UnitId) -> Option<Unit> {
        let unit = self.units.remove(id)?;
        self.emit(GameEvent::UnitDeleted {
            unit: id,
            kind: unit.kind,
            owner: unit.owner,
        });
        Some(unit)
    }

    /// Transfer a unit to another player. Clears its target.
    ///
    /// Returns false if the unit is gone, the player is unknown, or the
    /// unit already belongs to them.
    pub fn capture_unit(&mut self, id: UnitId, new_owner: PlayerId) -> bool {
        if !self.players.contains(new_owner) {
            return false;
        }
        let Some(unit) = self.units.get_mut(id) else {
            return false;
        };
        if unit.owner == new_owner {
            return false;
        }

        let from = unit.owner;
        let kind = unit.kind;
        unit.owner = new_owner;
        unit.target = None;
        tracing::info!(unit = id, ?kind, from = %from, to = %new_owner, "unit captured");
        self.emit(GameEvent::UnitCaptured {
            unit: id,
            kind,
            from,
            to: new_owner,
        });
        true
    }

    /// Units within `range` tiles (Euclidean) of `tile`, in id order.
    #[must_use]
    pub fn units_in_range(&self, tile: TileRef, range: u32) -> Vec<&Unit> {
        let range_sq = u64::from(range) * u64::from(range);
        self.units
            .iter()
            .filter(|u| self.map.euclidean_dist_squared(u.tile, tile) <= range_sq)
            .collect()
    }

    /// Units of one kind owned by `owner`, in id order.
    #[must_use]
    pub fn player_units(&self, owner: PlayerId, kind: UnitKind) -> Vec<&Unit> {
        self.units
            .iter()
            .filter(|u| u.owner == owner && u.kind == kind)
            .collect()
    }

    /// The unit of `kind` owned by `owner` nearest to `tile`; ties go to
    /// the lower id.
    #[must_use]
    pub fn nearest_player_unit(
        &self,
        owner: PlayerId,
        kind: UnitKind,
        tile: TileRef,
    ) -> Option<&Unit> {
        self.units
            .iter()
            .filter(|u| u.owner == owner && u.kind == kind)
            .min_by_key(|u| (self.map.euclidean_dist_squared(u.tile, tile), u.id))
    }

    /// Targets already engaged by `kind` units friendly to `owner`, other
    /// than `exclude`.
    #[must_use]
    pub fn claimed_targets(
        &self,
        owner: PlayerId,
        kind: UnitKind,
        exclude: Option<UnitId>,
    ) -> BTreeSet<UnitId> {
        self.units
            .iter()
            .filter(|u| u.kind == kind && Some(u.id) != exclude)
            .filter(|u| self.is_friendly(owner, u.owner))
            .filter_map(|u| u.target)
            .collect()
    }

    /// Add troops to a player's pool.
    pub fn add_troops(&mut self, player: PlayerId, troops: u32) {
        if let Some(p) = self.players.get_mut(player) {
            p.troops = p.troops.saturating_add(troops);
        }
    }

    /// Withdraw up to `troops` from a player's pool; returns the amount taken.
    pub fn take_troops(&mut self, player: PlayerId, troops: u32) -> u32 {
        let Some(p) = self.players.get_mut(player) else {
            return 0;
        };
        let taken = troops.min(p.troops);
        p.troops -= taken;
        taken
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("tick", &self.tick)
            .field("map", &(self.map.width(), self.map.height()))
            .field("units", &self.units.len())
            .field("players", &self.players.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::GridMap;

    const RED: PlayerId = PlayerId(1);
    const BLUE: PlayerId = PlayerId(2);

    fn world() -> World {
        let map = GridMap::from_ascii(&[
            "~~~~~~~~", //
            "~~######", //
            "~~######", //
            "~~######", //
        ])
        .unwrap();
        let mut world = World::new(Box::new(map), GameConfig::default());
        let mut red = Player::new(RED, "red");
        red.gold = 1_000;
        red.troops = 50;
        world.add_player(red);
        world.add_player(Player::new(BLUE, "blue"));
        world
    }

    fn tile(world: &World, x: u32, y: u32) -> TileRef {
        world.map().tile_ref(x, y)
    }

    #[test]
    fn test_structures_need_free_land() {
        let mut world = world();
        let land = tile(&world, 4, 2);
        assert_eq!(world.can_build(RED, UnitKind::Airfield, land), Some(land));
        assert_eq!(world.can_build(RED, UnitKind::Airfield, tile(&world, 0, 0)), None);

        world.build_unit(RED, UnitKind::City, land);
        assert_eq!(world.can_build(RED, UnitKind::Airfield, land), None);
    }

    #[test]
    fn test_port_needs_shore() {
        let world = world();
        let shore = tile(&world, 2, 1);
        assert_eq!(world.can_build(RED, UnitKind::Port, shore), Some(shore));
        assert_eq!(world.can_build(RED, UnitKind::Port, tile(&world, 5, 3)), None);
    }

    #[test]
    fn test_aircraft_launch_from_nearest_airfield() {
        let mut world = world();
        let far = tile(&world, 7, 3);
        let near = tile(&world, 3, 1);
        world.place_unit(RED, UnitKind::Airfield, far);
        world.place_unit(RED, UnitKind::Airfield, near);
        world.place_unit(BLUE, UnitKind::Airfield, tile(&world, 0, 0));

        assert_eq!(world.can_build(RED, UnitKind::Bomber, tile(&world, 1, 0)), Some(near));
        assert_eq!(world.can_build(BLUE, UnitKind::Fighter, far), None, "blue cannot afford");
    }

    #[test]
    fn test_unaffordable_or_unknown_player_rejected() {
        let world = world();
        assert_eq!(world.can_build(BLUE, UnitKind::Airfield, tile(&world, 4, 2)), None);
        assert_eq!(world.can_build(PlayerId(9), UnitKind::Shell, tile(&world, 0, 0)), None);
    }

    #[test]
    fn test_build_charges_and_emits() {
        let mut world = world();
        let id = world.build_unit(RED, UnitKind::Airfield, tile(&world, 4, 2));
        assert_eq!(world.players().get(RED).unwrap().gold, 500);
        assert_eq!(world.unit(id).unwrap().health, 1000);
        assert!(matches!(
            world.drain_events().as_slice(),
            [GameEvent::UnitBuilt { kind: UnitKind::Airfield, .. }]
        ));
        assert!(world.drain_events().is_empty());
    }

    #[test]
    fn test_damage_destroys_at_zero() {
        let mut world = world();
        let id = world.place_unit(BLUE, UnitKind::Fighter, tile(&world, 0, 0));
        world.drain_events();
        assert!(!world.damage_unit(id, 60));
        assert_eq!(world.unit(id).unwrap().health, 40);
        assert!(world.damage_unit(id, 60));
        assert!(!world.is_alive(id));
        assert!(matches!(
            world.drain_events().as_slice(),
            [GameEvent::UnitDestroyed { .. }]
        ));
        assert!(!world.damage_unit(id, 1));
    }

    #[test]
    fn test_capture_changes_owner_and_clears_target() {
        let mut world = world();
        let id = world.place_unit(RED, UnitKind::Warship, tile(&world, 0, 0));
        world.set_target(id, Some(99));
        assert!(world.capture_unit(id, BLUE));
        let unit = world.unit(id).unwrap();
        assert_eq!(unit.owner, BLUE);
        assert_eq!(unit.target, None);
        assert!(!world.capture_unit(id, BLUE));
        assert!(!world.capture_unit(id, PlayerId(9)));
    }

    #[test]
    fn test_range_queries() {
        let mut world = world();
        let a = world.place_unit(RED, UnitKind::Fighter, tile(&world, 0, 0));
        let b = world.place_unit(RED, UnitKind::Fighter, tile(&world, 3, 0));
        let c = world.place_unit(BLUE, UnitKind::Fighter, tile(&world, 4, 0));

        let ids: Vec<_> = world
            .units_in_range(tile(&world, 0, 0), 3)
            .iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec![a, b]);

        let nearest = world
            .nearest_player_unit(RED, UnitKind::Fighter, tile(&world, 7, 0))
            .unwrap();
        assert_eq!(nearest.id, b);
        assert_eq!(world.player_units(BLUE, UnitKind::Fighter).len(), 1);

        world.set_target(b, Some(c));
        assert_eq!(
            world.claimed_targets(RED, UnitKind::Fighter, Some(a)),
            BTreeSet::from([c])
        );
        assert!(world.claimed_targets(RED, UnitKind::Fighter, Some(b)).is_empty());
        assert!(world.claimed_targets(BLUE, UnitKind::Fighter, None).is_empty());
    }

    #[test]
    fn test_troop_pool() {
        let mut world = world();
        assert_eq!(world.take_troops(RED, 80), 50);
        assert_eq!(world.take_troops(RED, 10), 0);
        world.add_troops(RED, 7);
        assert_eq!(world.players().get(RED).unwrap().troops, 7);
    }

    #[test]
    fn test_seeds_follow_config_seed() {
        let mut a = world();
        let mut b = world();
        assert_eq!(a.next_seed(), b.next_seed());
    }

    #[test]
    fn test_construction_site_records_kind() {
        let mut world = world();
        let site = world.begin_construction(RED, UnitKind::AirDefense, tile(&world, 5, 2));
        let unit = world.unit(site).unwrap();
        assert_eq!(unit.kind, UnitKind::Construction);
        assert_eq!(unit.constructing, Some(UnitKind::AirDefense));
        assert_eq!(world.players().get(RED).unwrap().gold, 700);
    }
}
