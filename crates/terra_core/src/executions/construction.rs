//! Structure construction.

use super::AirDefenseExecution;
use crate::execution::{Execution, ExecutionContext};
use crate::map::TileRef;
use crate::players::PlayerId;
use crate::units::{UnitId, UnitKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConstructionState {
    Planned,
    Building { site: UnitId, remaining: u32 },
    Done,
}

/// Builds a structure over `construction.duration_ticks` ticks.
///
/// The cost is paid up front and a construction site holds the tile
/// until the real structure replaces it. If the site is destroyed the
/// structure is never built. A site captured mid-build completes for
/// its new owner.
#[derive(Debug)]
pub struct ConstructionExecution {
    owner: PlayerId,
    kind: UnitKind,
    tile: TileRef,
    state: ConstructionState,
}

impl ConstructionExecution {
    /// Build `kind` at `tile` for `owner`.
    #[must_use]
    pub fn new(owner: PlayerId, kind: UnitKind, tile: TileRef) -> Self {
        Self {
            owner,
            kind,
            tile,
            state: ConstructionState::Planned,
        }
    }
}

impl Execution for ConstructionExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>) {
        let world = &mut *ctx.world;
        if !self.kind.is_structure() || self.kind == UnitKind::Construction {
            world.advise(self.owner, format!("{:?} is not a structure", self.kind));
            self.state = ConstructionState::Done;
            return;
        }
        match world.can_build(self.owner, self.kind, self.tile) {
            Some(tile) => {
                let site = world.begin_construction(self.owner, self.kind, tile);
                self.tile = tile;
                self.state = ConstructionState::Building {
                    site,
                    remaining: world.config().construction.duration_ticks,
                };
            }
            None => {
                world.advise(self.owner, format!("cannot build {:?} at {}", self.kind, self.tile));
                self.state = ConstructionState::Done;
            }
        }
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>) {
        let ConstructionState::Building { site, remaining } = self.state else {
            return;
        };
        let Some(owner) = ctx.world.unit(site).map(|u| u.owner) else {
            tracing::debug!(site, kind = ?self.kind, "construction site lost");
            self.state = ConstructionState::Done;
            return;
        };

        let remaining = remaining.saturating_sub(1);
        if remaining > 0 {
            self.state = ConstructionState::Building { site, remaining };
            return;
        }

        ctx.world.delete_unit(site);
        let structure = ctx.world.place_unit(owner, self.kind, self.tile);
        tracing::info!(unit = structure, kind = ?self.kind, owner = %owner, "construction complete");
        if self.kind == UnitKind::AirDefense {
            ctx.spawn(AirDefenseExecution::new(structure));
        }
        self.state = ConstructionState::Done;
    }

    fn is_active(&self) -> bool {
        self.state != ConstructionState::Done
    }

    fn name(&self) -> &'static str {
        "construction"
    }
}
