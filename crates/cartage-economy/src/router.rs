//! Next-hop routing over the hub graph.
//!
//! Dijkstra over hubs, where edges are lanes (cost = walking cost plus the
//! busyness bias) and, between maritime hubs of the same fleet, sea links.
//! The router answers one question: standing at `from` with a ware destined
//! for `dest`, what is the first hop?  It is re-run whenever a ware lands
//! on a hub, so routes adapt to incremental network edits without any
//! cached state to invalidate.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;

use cartage_core::{DockId, HubId, LaneId};

use crate::world::World;

/// The first hop out of a hub.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NextStep {
    /// Cross `lane` to the neighboring hub `to`.
    Lane { lane: LaneId, to: HubId },
    /// Hand over to the local dock for sea transport.
    Dock(DockId),
}

/// Edge taken to reach a hub during the search.
#[derive(Copy, Clone)]
struct Via {
    prev: HubId,
    step: NextStep,
}

/// First hop from `from` toward `dest`, or `None` if unreachable.
pub fn route_next_step(world: &World, from: HubId, dest: HubId) -> Option<NextStep> {
    debug_assert_ne!(from, dest);
    search(world, from, dest, false).map(|via| first_hop(from, dest, via))
}

/// `true` if `dest` can be reached from `from` at all (lanes and sea links).
pub fn hub_reachable(world: &World, from: HubId, dest: HubId) -> bool {
    from == dest || search(world, from, dest, false).is_some()
}

/// `true` if `dest` can be reached from `from` over lanes alone.
pub fn hub_reachable_by_road(world: &World, from: HubId, dest: HubId) -> bool {
    from == dest || search(world, from, dest, true).is_some()
}

fn first_hop(from: HubId, dest: HubId, via: FxHashMap<HubId, Via>) -> NextStep {
    let mut cur = dest;
    loop {
        let v = via[&cur];
        if v.prev == from {
            return v.step;
        }
        cur = v.prev;
    }
}

/// Dijkstra; returns the predecessor map when `dest` was reached.
fn search(world: &World, from: HubId, dest: HubId, road_only: bool) -> Option<FxHashMap<HubId, Via>> {
    let now = world.clock.now();
    let mut dist: FxHashMap<HubId, u64> = FxHashMap::default();
    let mut via: FxHashMap<HubId, Via> = FxHashMap::default();
    // (cost, hub) — HubId's Ord makes tie-breaking deterministic.
    let mut heap: BinaryHeap<Reverse<(u64, HubId)>> = BinaryHeap::new();

    dist.insert(from, 0);
    heap.push(Reverse((0, from)));

    while let Some(Reverse((cost, node))) = heap.pop() {
        if node == dest {
            return Some(via);
        }
        if cost > dist[&node] {
            continue;
        }
        let Some(hub) = world.hubs.get(node) else {
            continue;
        };

        let mut relax = |to: HubId, edge_cost: u64, step: NextStep,
                         dist: &mut FxHashMap<HubId, u64>,
                         via: &mut FxHashMap<HubId, Via>,
                         heap: &mut BinaryHeap<Reverse<(u64, HubId)>>| {
            let new_cost = cost + edge_cost;
            if dist.get(&to).is_none_or(|&d| new_cost < d) {
                dist.insert(to, new_cost);
                via.insert(to, Via { prev: node, step });
                heap.push(Reverse((new_cost, to)));
            }
        };

        for &lane_id in hub.lanes.iter().filter(|l| !l.is_invalid()) {
            let Some(lane) = world.lanes.get(lane_id) else {
                continue;
            };
            let to = lane.other_hub(node);
            relax(
                to,
                lane.cost_ms(world, now),
                NextStep::Lane { lane: lane_id, to },
                &mut dist,
                &mut via,
                &mut heap,
            );
        }

        if road_only {
            continue;
        }
        if let Some(dock_id) = hub.dock {
            let Some(dock) = world.docks.get(dock_id) else {
                continue;
            };
            let Some(fleet) = world.fleets.get(dock.fleet) else {
                continue;
            };
            for &other_dock_id in &fleet.docks {
                if other_dock_id == dock_id {
                    continue;
                }
                let Some(other) = world.docks.get(other_dock_id) else {
                    continue;
                };
                relax(
                    other.hub,
                    sea_cost(world, dock_id, other_dock_id),
                    NextStep::Dock(dock_id),
                    &mut dist,
                    &mut via,
                    &mut heap,
                );
            }
        }
    }
    None
}

/// Estimated shipping cost between two docks.
fn sea_cost(world: &World, a: DockId, b: DockId) -> u64 {
    let pa = world.dock(a).positions[0];
    let pb = world.dock(b).positions[0];
    let dist = pa.step_distance(pb) as u64;
    // Loading overhead keeps short hops from beating a direct lane.
    (dist + 10) * world.tuning.walk_step_ms
}
