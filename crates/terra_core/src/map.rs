//! Map collaborator: tile references, coordinates and terrain.
//!
//! The core only ever talks to the map through [`GameMap`]. [`GridMap`]
//! is the reference implementation used by tests, benches and the
//! headless runner.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Opaque reference to a tile in the map's coordinate space.
///
/// Equality is exact; there is no floating tolerance anywhere in the
/// tile model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileRef(pub u32);

impl std::fmt::Display for TileRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tile#{}", self.0)
    }
}

/// Terrain classification for a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TerrainType {
    /// Open sea.
    #[default]
    Ocean,
    /// Inland water.
    Lake,
    /// Flat land (cost: 1).
    Plains,
    /// Hills (cost: 2).
    Highland,
    /// Mountains (cost: 3).
    Mountain,
}

impl TerrainType {
    /// Returns true for ocean and lake tiles.
    #[must_use]
    pub const fn is_water(self) -> bool {
        matches!(self, Self::Ocean | Self::Lake)
    }

    /// Returns true for every non-water tile.
    #[must_use]
    pub const fn is_land(self) -> bool {
        !self.is_water()
    }

    /// Parse the single-character map notation used by [`GridMap::from_ascii`].
    #[must_use]
    pub const fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '~' | '.' => Some(Self::Ocean),
            'o' => Some(Self::Lake),
            '#' => Some(Self::Plains),
            'h' => Some(Self::Highland),
            '^' => Some(Self::Mountain),
            _ => None,
        }
    }
}

/// Read-only view of the game map.
///
/// Implementors supply dimensions, terrain and the tile encoding; the
/// distance and neighbour queries have default implementations built on
/// those.
pub trait GameMap: Send + Sync {
    /// Map width in tiles.
    fn width(&self) -> u32;

    /// Map height in tiles.
    fn height(&self) -> u32;

    /// Terrain of a tile.
    fn terrain(&self, tile: TileRef) -> TerrainType;

    /// Encode lattice coordinates as a tile reference.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside the map.
    fn tile_ref(&self, x: u32, y: u32) -> TileRef {
        assert!(
            x < self.width() && y < self.height(),
            "tile_ref({x}, {y}) outside {}x{} map",
            self.width(),
            self.height()
        );
        TileRef(y * self.width() + x)
    }

    /// X coordinate of a tile.
    fn x(&self, tile: TileRef) -> u32 {
        tile.0 % self.width()
    }

    /// Y coordinate of a tile.
    fn y(&self, tile: TileRef) -> u32 {
        tile.0 / self.width()
    }

    /// Check whether signed coordinates fall inside the map.
    fn is_valid_coord(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < i64::from(self.width()) && y < i64::from(self.height())
    }

    /// Encode signed coordinates, returning `None` outside the map.
    fn try_tile_ref(&self, x: i64, y: i64) -> Option<TileRef> {
        self.is_valid_coord(x, y)
            .then(|| self.tile_ref(x as u32, y as u32))
    }

    /// Encode signed coordinates, clamping them onto the map.
    fn clamped_tile_ref(&self, x: i64, y: i64) -> TileRef {
        let cx = x.clamp(0, i64::from(self.width()) - 1) as u32;
        let cy = y.clamp(0, i64::from(self.height()) - 1) as u32;
        self.tile_ref(cx, cy)
    }

    /// Orthogonal neighbours in a fixed order: east, south, west, north.
    fn neighbors(&self, tile: TileRef) -> Vec<TileRef> {
        let x = i64::from(self.x(tile));
        let y = i64::from(self.y(tile));
        [(1, 0), (0, 1), (-1, 0), (0, -1)]
            .iter()
            .filter_map(|&(dx, dy)| self.try_tile_ref(x + dx, y + dy))
            .collect()
    }

    /// Manhattan distance between two tiles.
    fn manhattan_dist(&self, a: TileRef, b: TileRef) -> u32 {
        self.x(a).abs_diff(self.x(b)) + self.y(a).abs_diff(self.y(b))
    }

    /// Squared Euclidean distance between two tiles.
    fn euclidean_dist_squared(&self, a: TileRef, b: TileRef) -> u64 {
        let dx = u64::from(self.x(a).abs_diff(self.x(b)));
        let dy = u64::from(self.y(a).abs_diff(self.y(b)));
        dx * dx + dy * dy
    }

    /// Returns true if the tile is water.
    fn is_water(&self, tile: TileRef) -> bool {
        self.terrain(tile).is_water()
    }

    /// Returns true if the tile is land.
    fn is_land(&self, tile: TileRef) -> bool {
        self.terrain(tile).is_land()
    }

    /// Returns true for land tiles touching water.
    fn is_shore(&self, tile: TileRef) -> bool {
        self.is_land(tile) && self.neighbors(tile).into_iter().any(|n| self.is_water(n))
    }
}

/// Dense row-major grid map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridMap {
    /// Grid width in tiles.
    width: u32,
    /// Grid height in tiles.
    height: u32,
    /// Terrain stored in row-major order.
    tiles: Vec<TerrainType>,
}

impl GridMap {
    /// Create a map filled with a single terrain type.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidMap`] if either dimension is zero.
    pub fn filled(width: u32, height: u32, terrain: TerrainType) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(GameError::InvalidMap(format!(
                "dimensions must be positive, got {width}x{height}"
            )));
        }

        Ok(Self {
            width,
            height,
            tiles: vec![terrain; (width as usize) * (height as usize)],
        })
    }

    /// Parse a map from rows of terrain symbols.
    ///
    /// `~`/`.` ocean, `o` lake, `#` plains, `h` highland, `^` mountain.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidMap`] for empty input, ragged rows or
    /// unknown symbols.
    pub fn from_ascii<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.as_ref().chars().count());
        if width == 0 || height == 0 {
            return Err(GameError::InvalidMap("empty map".into()));
        }

        let mut tiles = Vec::with_capacity(width * height);
        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.chars().count() != width {
                return Err(GameError::InvalidMap(format!(
                    "row {y} has {} tiles, expected {width}",
                    row.chars().count()
                )));
            }
            for (x, symbol) in row.chars().enumerate() {
                let terrain = TerrainType::from_symbol(symbol).ok_or_else(|| {
                    GameError::InvalidMap(format!("unknown symbol '{symbol}' at ({x}, {y})"))
                })?;
                tiles.push(terrain);
            }
        }

        Ok(Self {
            width: width as u32,
            height: height as u32,
            tiles,
        })
    }

    /// Overwrite the terrain at a coordinate.
    ///
    /// Returns `false` if out of bounds.
    pub fn set_terrain(&mut self, x: u32, y: u32, terrain: TerrainType) -> bool {
        if x < self.width && y < self.height {
            let index = (y as usize) * (self.width as usize) + (x as usize);
            self.tiles[index] = terrain;
            true
        } else {
            false
        }
    }
}

impl GameMap for GridMap {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn terrain(&self, tile: TileRef) -> TerrainType {
        self.tiles
            .get(tile.0 as usize)
            .copied()
            .unwrap_or_default()
    }
}
