//! Unit registry records.
//!
//! Units are plain data owned by [`UnitStorage`]. Executions refer to them
//! by [`UnitId`] and treat a missing id as the unit having been destroyed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::map::TileRef;
use crate::players::PlayerId;

/// Unique identifier for a unit. Never reused within a game.
pub type UnitId = u64;

/// Every kind of unit the simulation knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    /// Launches fighters and bombers; home base for air units.
    Airfield,
    /// Launches interceptors at incoming missiles and bombers.
    AirDefense,
    /// Home base for ships.
    Port,
    /// Population centre, placed during the spawn phase.
    City,
    /// Launches missiles.
    MissileSilo,
    /// Placeholder for a structure being built.
    Construction,
    /// Air superiority unit.
    Fighter,
    /// Carries bombs to enemy structures.
    Bomber,
    /// Unguided payload dropped by a bomber.
    Bomb,
    /// Long-range arcing strike.
    Missile,
    /// Short-lived air defense projectile.
    Interceptor,
    /// Cannon round fired by fighters and warships.
    Shell,
    /// Armed patrol ship.
    Warship,
    /// Carries troops across water.
    TransportShip,
}

impl UnitKind {
    /// Returns true for stationary structures.
    #[must_use]
    pub const fn is_structure(self) -> bool {
        matches!(
            self,
            Self::Airfield
                | Self::AirDefense
                | Self::Port
                | Self::City
                | Self::MissileSilo
                | Self::Construction
        )
    }

    /// Returns true for aircraft.
    #[must_use]
    pub const fn is_air(self) -> bool {
        matches!(self, Self::Fighter | Self::Bomber)
    }

    /// Returns true for ships.
    #[must_use]
    pub const fn is_ship(self) -> bool {
        matches!(self, Self::Warship | Self::TransportShip)
    }

    /// Returns true for projectiles.
    #[must_use]
    pub const fn is_projectile(self) -> bool {
        matches!(
            self,
            Self::Bomb | Self::Missile | Self::Interceptor | Self::Shell
        )
    }

    /// Whether other units may select this kind as a target.
    ///
    /// Missiles can be shot down; the other projectiles cannot.
    #[must_use]
    pub const fn is_targetable(self) -> bool {
        !matches!(self, Self::Bomb | Self::Interceptor | Self::Shell)
    }
}

/// A unit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique identifier.
    pub id: UnitId,
    /// What the unit is.
    pub kind: UnitKind,
    /// Current owner. Changes on capture.
    pub owner: PlayerId,
    /// Current position.
    pub tile: TileRef,
    /// Current health. The unit is destroyed at zero.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Unit this one is currently engaging.
    pub target: Option<UnitId>,
    /// Troops carried (transports) or stationed (cities).
    pub troops: u32,
    /// Structure a [`UnitKind::Construction`] placeholder will become.
    pub constructing: Option<UnitKind>,
}

impl Unit {
    /// Create a unit at full health. The id is assigned on insertion.
    #[must_use]
    pub fn new(kind: UnitKind, owner: PlayerId, tile: TileRef, max_health: u32) -> Self {
        Self {
            id: 0,
            kind,
            owner,
            tile,
            health: max_health,
            max_health,
            target: None,
            troops: 0,
            constructing: None,
        }
    }
}

/// Storage for all units in the simulation.
///
/// Backed by a `BTreeMap` so both iteration and serialization follow id
/// order on every client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStorage {
    units: BTreeMap<UnitId, Unit>,
    next_id: UnitId,
}

impl UnitStorage {
    /// Create empty unit storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Insert a new unit and return its id.
    pub fn insert(&mut self, mut unit: Unit) -> UnitId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        unit.id = id;
        self.units.insert(id, unit);
        id
    }

    /// Remove a unit by id.
    pub fn remove(&mut self, id: UnitId) -> Option<Unit> {
        self.units.remove(&id)
    }

    /// Get a unit by id.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Get a mutable reference to a unit by id.
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Check if a unit exists.
    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    /// Number of live units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Unit ids in ascending order.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<UnitId> {
        self.units.keys().copied().collect()
    }

    /// Iterate over units in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(kind: UnitKind) -> Unit {
        Unit::new(kind, PlayerId(1), TileRef(0), 10)
    }

    #[test]
    fn test_ids_are_sequential_and_never_reused() {
        let mut storage = UnitStorage::new();
        let a = storage.insert(unit(UnitKind::City));
        let b = storage.insert(unit(UnitKind::Port));
        assert_eq!((a, b), (1, 2));

        storage.remove(b);
        let c = storage.insert(unit(UnitKind::Fighter));
        assert_eq!(c, 3);
        assert_eq!(storage.sorted_ids(), vec![1, 3]);
    }

    #[test]
    fn test_default_storage_starts_at_one() {
        let mut storage = UnitStorage::default();
        assert_eq!(storage.insert(unit(UnitKind::City)), 1);
    }

    #[test]
    fn test_insert_assigns_id_and_full_health() {
        let mut storage = UnitStorage::new();
        let id = storage.insert(unit(UnitKind::Warship));
        let stored = storage.get(id).unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.health, stored.max_health);
    }

    #[test]
    fn test_kind_classes() {
        assert!(UnitKind::Airfield.is_structure());
        assert!(UnitKind::Bomber.is_air());
        assert!(UnitKind::TransportShip.is_ship());
        assert!(UnitKind::Missile.is_projectile());
        assert!(UnitKind::Missile.is_targetable());
        assert!(!UnitKind::Shell.is_targetable());
    }
}
