//! Player table and alliance queries.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Unique identifier for a player.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct PlayerId(pub u16);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

/// A participant in the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Unique identifier.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Spendable gold.
    pub gold: u64,
    /// Troops available for transports and cities.
    pub troops: u32,
    /// Players this one is allied with.
    pub allies: BTreeSet<PlayerId>,
}

impl Player {
    /// Create a player with no resources and no allies.
    #[must_use]
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            gold: 0,
            troops: 0,
            allies: BTreeSet::new(),
        }
    }
}

/// All players in the game, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRegistry {
    players: BTreeMap<PlayerId, Player>,
}

impl PlayerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a player.
    pub fn insert(&mut self, player: Player) {
        self.players.insert(player.id, player);
    }

    /// Get a player.
    #[must_use]
    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Get a mutable reference to a player.
    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Check if a player exists.
    #[must_use]
    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    /// Player ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<PlayerId> {
        self.players.keys().copied().collect()
    }

    /// Iterate over players in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Number of players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Make two players allies of each other.
    ///
    /// Returns `false` if either player is unknown.
    pub fn ally(&mut self, a: PlayerId, b: PlayerId) -> bool {
        if a == b || !self.contains(a) || !self.contains(b) {
            return false;
        }
        if let Some(player) = self.players.get_mut(&a) {
            player.allies.insert(b);
        }
        if let Some(player) = self.players.get_mut(&b) {
            player.allies.insert(a);
        }
        true
    }

    /// Same player, or allied.
    #[must_use]
    pub fn is_friendly(&self, a: PlayerId, b: PlayerId) -> bool {
        a == b || self.get(a).is_some_and(|p| p.allies.contains(&b))
    }
}
