//! Tile map trait and rectangular grid implementation.

use cartage_core::Coord;

/// Terrain class of one tile.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum Terrain {
    Land,
    Water,
}

/// What a mover can traverse.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum Movecaps {
    /// Land movers: carriers, transport workers.
    Walk,
    /// Water movers: ships.
    Swim,
}

/// Read-only map queries the engine needs.
///
/// Static terrain only — dynamic obstacles (other agents, reserved tiles)
/// are supplied to the search as a predicate by the caller, so the map stays
/// free of world knowledge.
pub trait TileMap {
    fn width(&self) -> u16;
    fn height(&self) -> u16;

    fn in_bounds(&self, c: Coord) -> bool {
        c.x >= 0 && c.y >= 0 && (c.x as u16) < self.width() && (c.y as u16) < self.height()
    }

    /// Terrain of an in-bounds tile.  Out-of-bounds queries may panic.
    fn terrain(&self, c: Coord) -> Terrain;

    /// `true` if a mover with `caps` may stand on `c`.
    fn passable(&self, c: Coord, caps: Movecaps) -> bool {
        self.in_bounds(c)
            && match caps {
                Movecaps::Walk => self.terrain(c) == Terrain::Land,
                Movecaps::Swim => self.terrain(c) == Terrain::Water,
            }
    }

    /// Cost of one step between adjacent tiles, in ms.
    fn step_cost_ms(&self, from: Coord, to: Coord) -> u64;
}

/// Rectangular tile map with uniform step cost.
pub struct GridMap {
    width: u16,
    height: u16,
    tiles: Vec<Terrain>,
    step_ms: u64,
}

impl GridMap {
    /// All-land map of the given size.
    pub fn all_land(width: u16, height: u16, step_ms: u64) -> Self {
        Self {
            width,
            height,
            tiles: vec![Terrain::Land; width as usize * height as usize],
            step_ms,
        }
    }

    pub fn set_terrain(&mut self, c: Coord, t: Terrain) {
        assert!(self.in_bounds(c), "set_terrain out of bounds: {c}");
        let idx = c.y as usize * self.width as usize + c.x as usize;
        self.tiles[idx] = t;
    }

    /// Flood a rectangle (inclusive corners) with water.
    pub fn set_water_rect(&mut self, from: Coord, to: Coord) {
        for y in from.y..=to.y {
            for x in from.x..=to.x {
                self.set_terrain(Coord::new(x, y), Terrain::Water);
            }
        }
    }
}

impl TileMap for GridMap {
    fn width(&self) -> u16 {
        self.width
    }

    fn height(&self) -> u16 {
        self.height
    }

    fn terrain(&self, c: Coord) -> Terrain {
        self.tiles[c.y as usize * self.width as usize + c.x as usize]
    }

    fn step_cost_ms(&self, _from: Coord, _to: Coord) -> u64 {
        self.step_ms
    }
}
