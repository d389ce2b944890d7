//! Walkable paths.
//!
//! A `Path` is a start coordinate plus the sequence of tiles visited after
//! it; every consecutive pair is one map step.  The edit operations
//! (`truncate`, `trim_start`, `reverse`) exist because lane splitting and
//! mid-route redirection cut existing paths rather than re-searching.

use cartage_core::Coord;

use crate::grid::TileMap;

#[derive(Clone, Debug, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Path {
    start: Coord,
    steps: Vec<Coord>,
}

impl Path {
    /// A zero-length path at `start`.
    pub fn trivial(start: Coord) -> Self {
        Self { start, steps: Vec::new() }
    }

    /// Build from an explicit tile sequence.
    ///
    /// # Panics
    /// Panics in debug mode if any consecutive pair is not one step apart.
    pub fn from_steps(start: Coord, steps: Vec<Coord>) -> Self {
        debug_assert!(
            std::iter::once(start)
                .chain(steps.iter().copied())
                .zip(steps.iter().copied())
                .all(|(a, b)| a.step_distance(b) == 1),
            "path steps must be adjacent"
        );
        Self { start, steps }
    }

    #[inline]
    pub fn start(&self) -> Coord {
        self.start
    }

    #[inline]
    pub fn end(&self) -> Coord {
        self.steps.last().copied().unwrap_or(self.start)
    }

    /// Number of steps (0 for a trivial path).
    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Tile reached after step `i` (0-based).
    #[inline]
    pub fn step(&self, i: usize) -> Coord {
        self.steps[i]
    }

    /// All tiles on the path including the start.
    pub fn tiles(&self) -> impl Iterator<Item = Coord> + '_ {
        std::iter::once(self.start).chain(self.steps.iter().copied())
    }

    /// Index of `c` on the path (0 = start), or `None` if not on it.
    pub fn position_of(&self, c: Coord) -> Option<usize> {
        self.tiles().position(|t| t == c)
    }

    /// Keep only the first `n` steps.
    pub fn truncate(&mut self, n: usize) {
        self.steps.truncate(n);
    }

    /// Drop the first `n` steps; the path then starts where step `n` ended.
    pub fn trim_start(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        assert!(n <= self.steps.len(), "trim_start past path end");
        self.start = self.steps[n - 1];
        self.steps.drain(..n);
    }

    /// Reverse direction in place.
    pub fn reverse(&mut self) {
        let new_start = self.end();
        let mut tiles: Vec<Coord> = self.tiles().collect();
        tiles.reverse();
        tiles.remove(0);
        self.start = new_start;
        self.steps = tiles;
    }

    /// Total walking cost over `map`, in ms.
    pub fn cost_ms(&self, map: &impl TileMap) -> u64 {
        let mut prev = self.start;
        let mut total = 0;
        for &next in &self.steps {
            total += map.step_cost_ms(prev, next);
            prev = next;
        }
        total
    }
}
