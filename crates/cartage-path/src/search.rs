//! Path search with progressive passability relaxation.
//!
//! The base search is a plain uniform-cost (Dijkstra) expansion over the
//! tile grid with a deterministic tie-break — search internals are
//! deliberately unremarkable.  What the engine actually depends on is
//! [`search_with_relaxation`]: dynamically blocked tiles (other agents,
//! reserved ground) often clear up by the time the mover gets there, so a
//! failed exact search is retried after randomly unblocking cached blockers
//! near the destination, and finally with blocking checks disabled
//! entirely.  Only then is the route reported as impossible.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use rustc_hash::FxHashMap;

use cartage_core::{Coord, SimRng};

use crate::error::PathError;
use crate::grid::{Movecaps, TileMap};
use crate::path::Path;

/// Expansion budget granted per point of persistence.
const NODES_PER_PERSISTENCE: usize = 64;

/// Uniform-cost search from `start` to `end`.
///
/// `blocked` is consulted for every tile except `start` and `end` — the
/// destination is always considered enterable so a mover can reach a goal
/// that is itself occupied.  `persistence` bounds the number of expanded
/// nodes (`0` = unbounded).
pub fn find_path(
    map: &impl TileMap,
    start: Coord,
    end: Coord,
    persistence: u32,
    caps: Movecaps,
    mut blocked: impl FnMut(Coord) -> bool,
) -> Result<Path, PathError> {
    if !map.passable(start, caps) {
        return Err(PathError::BadStart(start));
    }
    if start == end {
        return Ok(Path::trivial(start));
    }

    let budget = if persistence == 0 {
        usize::MAX
    } else {
        persistence as usize * NODES_PER_PERSISTENCE
    };

    let mut dist: FxHashMap<Coord, u64> = FxHashMap::default();
    let mut came_from: FxHashMap<Coord, Coord> = FxHashMap::default();

    // Min-heap of (cost, coord); the Coord secondary key makes expansion
    // order deterministic when costs tie.
    let mut heap: BinaryHeap<Reverse<(u64, Coord)>> = BinaryHeap::new();
    dist.insert(start, 0);
    heap.push(Reverse((0, start)));

    let mut expanded = 0usize;

    while let Some(Reverse((cost, node))) = heap.pop() {
        if node == end {
            return Ok(reconstruct(start, end, &came_from));
        }
        if cost > dist[&node] {
            continue; // stale heap entry
        }
        expanded += 1;
        if expanded > budget {
            break;
        }

        for next in node.neighbors() {
            if !map.passable(next, caps) {
                continue;
            }
            if next != end && blocked(next) {
                continue;
            }
            let new_cost = cost + map.step_cost_ms(node, next);
            if dist.get(&next).is_none_or(|&d| new_cost < d) {
                dist.insert(next, new_cost);
                came_from.insert(next, node);
                heap.push(Reverse((new_cost, next)));
            }
        }
    }

    Err(PathError::NoRoute { from: start, to: end })
}

fn reconstruct(start: Coord, end: Coord, came_from: &FxHashMap<Coord, Coord>) -> Path {
    let mut steps = vec![end];
    let mut cur = end;
    while let Some(&prev) = came_from.get(&cur) {
        if prev == start {
            break;
        }
        steps.push(prev);
        cur = prev;
    }
    steps.reverse();
    Path::from_steps(start, steps)
}

// ── Relaxation ladder ─────────────────────────────────────────────────────────

/// Cache of blocked-tile verdicts ordered by distance to the destination.
///
/// Tiles close to the goal are the ones worth gambling on: unblocking them
/// lets a subsequent search get closer even if the first tiles it tried were
/// genuinely occupied.
struct BlockedTracker<'a> {
    is_blocked: &'a dyn Fn(Coord) -> bool,
    end: Coord,
    // Keyed by (distance to end, coord) so iteration visits near tiles first.
    nodes: BTreeMap<(u32, Coord), bool>,
    nrblocked: u32,
    disabled: bool,
}

impl<'a> BlockedTracker<'a> {
    fn new(is_blocked: &'a dyn Fn(Coord) -> bool, end: Coord) -> Self {
        Self { is_blocked, end, nodes: BTreeMap::new(), nrblocked: 0, disabled: false }
    }

    fn check(&mut self, c: Coord) -> bool {
        if self.disabled {
            return false;
        }
        let key = (c.step_distance(self.end), c);
        if let Some(&b) = self.nodes.get(&key) {
            return b;
        }
        let b = (self.is_blocked)(c);
        self.nodes.insert(key, b);
        if b {
            self.nrblocked += 1;
        }
        b
    }

    /// Randomly clear cached blockers, preferring tiles near the goal.
    ///
    /// Each blocked tile is unblocked with probability
    /// `unblockprob / origblocked`, and every success lowers `unblockprob`
    /// by `decrement` — so the first (nearest) tiles are the most likely to
    /// clear and the willingness to gamble fades with distance.
    fn unblock(&mut self, rng: &mut SimRng, decrement: u32) {
        let origblocked = self.nrblocked.max(1);
        let mut unblockprob = self.nrblocked as i64;
        for (_, v) in self.nodes.iter_mut() {
            if unblockprob <= 0 {
                break;
            }
            if *v && (rng.gen_range(0..origblocked) as i64) < unblockprob {
                *v = false;
                self.nrblocked -= 1;
                unblockprob -= decrement as i64;
            }
        }
    }
}

/// [`find_path`] with the escalation ladder:
///
/// 1. exact search honoring `is_blocked`;
/// 2. on failure, randomly unblock cached blockers near `end` and retry;
/// 3. on failure, disable blocking checks entirely and retry;
/// 4. report [`PathError::NoRoute`].
///
/// Steps 2 and 3 are skipped when no blocked tile was ever encountered —
/// the route is then genuinely impossible and retrying cannot help.
pub fn search_with_relaxation(
    map: &impl TileMap,
    start: Coord,
    end: Coord,
    persistence: u32,
    caps: Movecaps,
    is_blocked: &dyn Fn(Coord) -> bool,
    rng: &mut SimRng,
    unblock_decrement: u32,
) -> Result<Path, PathError> {
    let mut tracker = BlockedTracker::new(is_blocked, end);

    match find_path(map, start, end, persistence, caps, |c| tracker.check(c)) {
        Ok(path) => return Ok(path),
        Err(e @ PathError::BadStart(_)) => return Err(e),
        Err(PathError::NoRoute { .. }) => {}
    }
    if tracker.nrblocked == 0 {
        return Err(PathError::NoRoute { from: start, to: end });
    }

    tracker.unblock(rng, unblock_decrement);
    if let Ok(path) = find_path(map, start, end, persistence, caps, |c| tracker.check(c)) {
        return Ok(path);
    }
    if tracker.nrblocked == 0 {
        return Err(PathError::NoRoute { from: start, to: end });
    }

    tracker.disabled = true;
    find_path(map, start, end, persistence, caps, |c| tracker.check(c))
}
