//! Map coordinate type.
//!
//! The map is a rectangular grid of tiles.  Movement steps to any of the
//! eight neighbouring tiles, so step distance between two coordinates is the
//! Chebyshev distance.

use std::fmt;

/// A tile position on the map.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Coord {
    pub x: i16,
    pub y: i16,
}

impl Coord {
    #[inline]
    pub fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    /// Number of 8-directional steps between `self` and `other`.
    #[inline]
    pub fn step_distance(self, other: Coord) -> u32 {
        let dx = (self.x as i32 - other.x as i32).unsigned_abs();
        let dy = (self.y as i32 - other.y as i32).unsigned_abs();
        dx.max(dy)
    }

    /// The eight neighbouring coordinates in a fixed clockwise order
    /// starting north.  Deterministic iteration order matters: path search
    /// tie-breaks depend on it.
    pub fn neighbors(self) -> [Coord; 8] {
        let Coord { x, y } = self;
        [
            Coord::new(x, y - 1),
            Coord::new(x + 1, y - 1),
            Coord::new(x + 1, y),
            Coord::new(x + 1, y + 1),
            Coord::new(x, y + 1),
            Coord::new(x - 1, y + 1),
            Coord::new(x - 1, y),
            Coord::new(x - 1, y - 1),
        ]
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
