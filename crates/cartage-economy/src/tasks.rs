//! The concrete agent behaviors.
//!
//! Every task is a stateless unit struct implementing `Task<World>`; all
//! per-entry state lives in the `TaskState` scratch slots.  By convention
//! each update checks the pending signal before anything else.
//!
//! Scratch conventions are documented per task; the shared ones:
//!
//! | Slot     | Meaning                                        |
//! |----------|------------------------------------------------|
//! | `ivar1`  | step index / phase discriminant                |
//! | `objvar` | the request or object the task works for       |
//! | `path`   | the route a movement task walks                |

use log::{debug, trace, warn};

use cartage_agent::{despawn, Step, Task, TaskState};
use cartage_core::{AgentId, DepotId, HubId, RequestId};
use cartage_path::{find_path, search_with_relaxation, Movecaps, Path, TileMap};

use crate::request;
use crate::ware::WareLocation;
use crate::world::World;
use crate::{dock, hub};

pub const IDLE_NAME: &str = "idle";
pub const RETIRE_NAME: &str = "retire";
pub const FULFILL_NAME: &str = "fulfill";
pub const WALK_ROUTE_NAME: &str = "walk-route";
pub const LANE_WORK_NAME: &str = "lane-work";
pub const HAUL_NAME: &str = "haul";
pub const SHIP_WORK_NAME: &str = "ship-work";
pub const VOYAGE_NAME: &str = "voyage";

pub static IDLE: IdleTask = IdleTask;
pub static RETIRE: RetireTask = RetireTask;
pub static FULFILL: FulfillTask = FulfillTask;
pub static WALK_ROUTE: WalkRouteTask = WalkRouteTask;
pub static LANE_WORK: LaneWorkTask = LaneWorkTask;
pub static HAUL: HaulTask = HaulTask;
pub static SHIP_WORK: ShipWorkTask = ShipWorkTask;
pub static VOYAGE: VoyageTask = VoyageTask;

/// Resolve a task by its persistent name (saved stacks, hub-job programs).
pub fn task_by_name(name: &str) -> Option<&'static dyn Task<World>> {
    Some(match name {
        IDLE_NAME => &IDLE,
        RETIRE_NAME => &RETIRE,
        FULFILL_NAME => &FULFILL,
        WALK_ROUTE_NAME => &WALK_ROUTE,
        LANE_WORK_NAME => &LANE_WORK,
        HAUL_NAME => &HAUL,
        SHIP_WORK_NAME => &SHIP_WORK,
        VOYAGE_NAME => &VOYAGE,
        _ => return None,
    })
}

/// Seed a walk entry for `path`.
pub fn walk_route_state(path: Path) -> TaskState<World> {
    let mut state = TaskState::new(&WALK_ROUTE);
    state.path = Some(path);
    state
}

/// Sub-route of `path` between two tile indices, reversed if needed.
fn subpath(path: &Path, from_idx: usize, to_idx: usize) -> Path {
    let mut p = path.clone();
    if from_idx <= to_idx {
        p.truncate(to_idx);
        p.trim_start(from_idx);
    } else {
        p.truncate(from_idx);
        p.trim_start(to_idx);
        p.reverse();
    }
    p
}

/// Nearest depot to `pos`, ties broken by arena slot order.
fn nearest_depot(world: &World, pos: cartage_core::Coord) -> Option<DepotId> {
    world
        .depots
        .iter()
        .filter_map(|(id, d)| world.hubs.get(d.hub).map(|h| (h.pos.step_distance(pos), id)))
        .min()
        .map(|(_, id)| id)
}

// ── idle ──────────────────────────────────────────────────────────────────────

/// Wait a time or indefinitely.  Any signal interrupts it.
///
/// `ivar1`: remaining timeout in ms; `0` waits forever, `-1` means the
/// timeout elapsed and the next update pops.
pub struct IdleTask;

impl Task<World> for IdleTask {
    fn name(&self) -> &'static str {
        IDLE_NAME
    }
    fn unique(&self) -> bool {
        true
    }
    fn update(&self, world: &mut World, agent: AgentId, state: &mut TaskState<World>) -> Step<World> {
        let a = world.agents.get_mut(agent).expect("idle without agent");
        if a.has_signal() {
            a.clear_signal();
            return Step::Pop;
        }
        match state.ivar1 {
            0 => Step::Idle,
            -1 => Step::Pop,
            ms => {
                state.ivar1 = -1;
                Step::Wait(ms as u64)
            }
        }
    }
}

// ── retire ────────────────────────────────────────────────────────────────────

/// A loose worker returns to storage: it melts into the nearest depot and
/// its agent leaves the world.
pub struct RetireTask;

impl Task<World> for RetireTask {
    fn name(&self) -> &'static str {
        RETIRE_NAME
    }
    fn unique(&self) -> bool {
        true
    }
    fn update(&self, world: &mut World, agent: AgentId, _state: &mut TaskState<World>) -> Step<World> {
        if let Some(a) = world.agents.get_mut(agent) {
            a.clear_signal();
        }
        let pos = world.agents.get(agent).expect("retire without agent").pos;
        if let (Some(role), Some(depot_id)) = (world.worker_role(agent), nearest_depot(world, pos))
        {
            world.depot_mut(depot_id).add_worker(role, 1);
            trace!("{agent}: retired into {depot_id}");
        } else {
            warn!("{agent}: retiring with nowhere to go");
        }
        world.agent_data.remove(&agent);
        despawn(world, agent);
        Step::Pop
    }
}

// ── walk-route ────────────────────────────────────────────────────────────────

/// Move along a precomputed path, one map step per act.
///
/// `path`: the route; `ivar1`: next step index.  Pops on arrival or when a
/// signal interrupts the walk (the parent task sees the pending signal).
pub struct WalkRouteTask;

impl Task<World> for WalkRouteTask {
    fn name(&self) -> &'static str {
        WALK_ROUTE_NAME
    }
    fn unique(&self) -> bool {
        true
    }
    fn update(&self, world: &mut World, agent: AgentId, state: &mut TaskState<World>) -> Step<World> {
        if world.agents.get(agent).expect("walk without agent").has_signal() {
            return Step::Pop;
        }
        let Some(path) = state.path.as_ref() else {
            return Step::Pop; // zero-length route, instant success
        };
        let i = state.ivar1 as usize;
        if i >= path.len() {
            return Step::Pop; // arrived
        }

        let next = path.step(i);
        let a = world.agents.get_mut(agent).expect("walk without agent");
        debug_assert!(a.pos.step_distance(next) <= 1, "route step not adjacent");
        let cost = world.map.step_cost_ms(a.pos, next);
        a.pos = next;
        let now = world.clock.now();
        world.agents.get_mut(agent).expect("walk without agent").walk_end = now.offset(cost);
        state.ivar1 += 1;
        Step::Wait(cost)
    }
}

// ── fulfill ───────────────────────────────────────────────────────────────────

/// Walk to a request's target hub and complete the request there.
///
/// `objvar`: the request handle; `ivar1`: 0 = plan route, 1 = walking done;
/// `ivar2`: set once the request was completed (suppresses the reopen in
/// `on_pop`).
pub struct FulfillTask;

impl Task<World> for FulfillTask {
    fn name(&self) -> &'static str {
        FULFILL_NAME
    }
    fn unique(&self) -> bool {
        true
    }
    fn update(&self, world: &mut World, agent: AgentId, state: &mut TaskState<World>) -> Step<World> {
        if world.agents.get(agent).expect("fulfill without agent").has_signal() {
            return Step::Pop;
        }
        let rid = RequestId::from_any(state.objvar);

        if state.ivar1 == 0 {
            let Some(req) = world.requests.get(rid) else {
                return Step::Pop; // withdrawn before we even left
            };
            let Some(target) = world.hubs.get(req.target_hub).map(|h| h.pos) else {
                return Step::Pop;
            };
            let pos = world.agents.get(agent).expect("fulfill without agent").pos;
            state.ivar1 = 1;
            if pos == target {
                state.ivar2 = 1;
                request::complete_worker_request(world, rid, agent);
                return Step::Pop;
            }
            // Split borrow: the rng lives beside the map, not inside it.
            let World { map, rng, tuning, .. } = world;
            match search_with_relaxation(
                map,
                pos,
                target,
                0,
                Movecaps::Walk,
                &|_| false,
                rng,
                tuning.unblock_decrement,
            ) {
                Ok(route) => {
                    return Step::Push { state: walk_route_state(route), delay_ms: 1 };
                }
                Err(e) => {
                    // Not started; the request goes back on the market and
                    // this worker retires.
                    debug!("{agent}: cannot reach request target: {e}");
                    return Step::Pop;
                }
            }
        }

        // Walked the whole route: complete on the spot.
        state.ivar2 = 1;
        request::complete_worker_request(world, rid, agent);
        Step::Pop
    }

    fn on_pop(&self, world: &mut World, _agent: AgentId, state: &mut TaskState<World>) {
        if state.ivar2 == 0 {
            request::reopen_request(world, RequestId::from_any(state.objvar));
        }
    }
}

// ── lane-work ─────────────────────────────────────────────────────────────────

/// The carrier's standing behavior: park at the lane's idle position,
/// answer pending wares on either end hub, haul them across.
pub struct LaneWorkTask;

impl Task<World> for LaneWorkTask {
    fn name(&self) -> &'static str {
        LANE_WORK_NAME
    }
    fn unique(&self) -> bool {
        true
    }
    fn update(&self, world: &mut World, agent: AgentId, _state: &mut TaskState<World>) -> Step<World> {
        world.agents.get_mut(agent).expect("carrier without agent").clear_signal();

        let Some(data) = world.carrier_data(agent) else {
            // No employment record: this agent has no business ferrying.
            despawn(world, agent);
            return Step::Pop;
        };
        let lane_id = data.lane;
        let Some(lane) = world.lanes.get(lane_id) else {
            // Lane vanished under us; go back into storage.
            return Step::Push { state: TaskState::new(&RETIRE), delay_ms: 1 };
        };
        let hubs = lane.hubs;
        let idle_pos = lane.idle_pos();
        let lane_path = lane.path.clone();

        // A pending ware on either end means work.
        for end in 0..2 {
            let (from, to) = (hubs[end], hubs[1 - end]);
            let waiting = world.hubs.get(from).is_some_and(|h| h.has_pending_ware(to));
            if waiting {
                let mut state = TaskState::new(&HAUL);
                state.ivar1 = end as i32;
                trace!("{agent}: ware pending at {from}, hauling");
                return Step::Push { state, delay_ms: 1 };
            }
        }

        // Nothing to do: park in the middle of the lane.
        let pos = world.agents.get(agent).expect("carrier without agent").pos;
        if pos != idle_pos {
            if let Some(cur) = lane_path.position_of(pos) {
                let route = subpath(&lane_path, cur, world.lane(lane_id).idle_index as usize);
                return Step::Push { state: walk_route_state(route), delay_ms: 1 };
            }
            // Off the lane somehow; walk back onto it directly.
            if let Ok(route) = find_path(&world.map, pos, idle_pos, 0, Movecaps::Walk, |_| false) {
                return Step::Push { state: walk_route_state(route), delay_ms: 1 };
            }
        }
        Step::Idle
    }
}

// ── haul ──────────────────────────────────────────────────────────────────────

/// One ferry trip: commit to a pending ware, walk over, pick it up, carry
/// it to the opposite hub, set it down (waiting for capacity if the target
/// is full).
///
/// `ivar1`: pickup end (0/1); `ivar2`: phase — 0 commit & walk, 1 pick up &
/// carry, 2 set down; `ivar3`: 1 while registered in the target hub's
/// capacity-wait list.
pub struct HaulTask;

impl HaulTask {
    fn lane_ends(world: &World, agent: AgentId, pickup_end: usize) -> Option<(HubId, HubId, cartage_core::LaneId)> {
        let data = world.carrier_data(agent)?;
        let lane = world.lanes.get(data.lane)?;
        Some((lane.hubs[pickup_end], lane.hubs[1 - pickup_end], data.lane))
    }
}

impl Task<World> for HaulTask {
    fn name(&self) -> &'static str {
        HAUL_NAME
    }
    fn unique(&self) -> bool {
        true
    }
    fn update(&self, world: &mut World, agent: AgentId, state: &mut TaskState<World>) -> Step<World> {
        // "wakeup" (capacity freed) resumes the set-down phase; any other
        // signal aborts the trip.
        {
            let a = world.agents.get_mut(agent).expect("haul without agent");
            if a.has_signal() {
                if a.signal == "wakeup" {
                    a.clear_signal();
                    state.ivar3 = 0;
                } else {
                    return Step::Pop;
                }
            }
        }

        let pickup_end = state.ivar1 as usize;
        let Some((pickup, dest, lane_id)) = Self::lane_ends(world, agent, pickup_end) else {
            return Step::Pop;
        };
        let lane_path = world.lane(lane_id).path.clone();
        let pos = world.agents.get(agent).expect("haul without agent").pos;

        match state.ivar2 {
            // Commit to the ware and head for its hub.
            0 => {
                if !world.hub_mut(pickup).ack_pickup(dest) {
                    return Step::Pop; // someone else got there first
                }
                state.ivar2 = 1;
                let target_idx = if pickup_end == 0 { 0 } else { lane_path.len() };
                let cur = lane_path.position_of(pos).unwrap_or(0);
                let route = subpath(&lane_path, cur, target_idx);
                Step::Push { state: walk_route_state(route), delay_ms: 1 }
            }

            // At the pickup hub: shoulder the ware, carry it across.
            1 => {
                let Some(ware_id) = hub::fetch_pending_ware(world, pickup, dest) else {
                    return Step::Pop; // it evaporated while we walked
                };
                world.ware_mut(ware_id).location = WareLocation::Carried(agent);
                world.carrier_data_mut(agent).expect("haul without employment").carried =
                    Some(ware_id);
                trace!("{agent}: picked up {ware_id} at {pickup}");
                state.ivar2 = 2;
                let target_idx = if pickup_end == 0 { lane_path.len() } else { 0 };
                let cur = lane_path.position_of(pos).unwrap_or(0);
                let route = subpath(&lane_path, cur, target_idx);
                Step::Push { state: walk_route_state(route), delay_ms: 1 }
            }

            // At the destination hub: set the ware down, or wait for room.
            _ => {
                let Some(ware_id) =
                    world.carrier_data(agent).and_then(|d| d.carried)
                else {
                    return Step::Pop;
                };
                if world.hub(dest).has_capacity() {
                    world.carrier_data_mut(agent).expect("haul without employment").carried = None;
                    hub::add_ware(world, dest, ware_id);
                    trace!("{agent}: dropped {ware_id} at {dest}");
                    return Step::Pop;
                }
                if state.ivar3 == 0 {
                    state.ivar3 = 1;
                    hub::wait_for_capacity(world, dest, agent);
                    trace!("{agent}: {dest} full, waiting for capacity");
                }
                Step::Idle
            }
        }
    }

    fn on_pop(&self, world: &mut World, agent: AgentId, state: &mut TaskState<World>) {
        let pickup_end = state.ivar1 as usize;
        let ends = Self::lane_ends(world, agent, pickup_end);
        if state.ivar3 == 1 {
            if let Some((_, dest, _)) = ends {
                hub::skip_wait_for_capacity(world, dest, agent);
            }
        }
        // An aborted trip must not strand the ware on the carrier's back.
        let carried = world.carrier_data_mut(agent).and_then(|d| d.carried.take());
        if let Some(ware_id) = carried {
            let target = ends
                .map(|(pickup, dest, _)| {
                    if world.hub(dest).has_capacity() { dest } else { pickup }
                })
                .filter(|&h| world.hub(h).has_capacity());
            match target {
                Some(h) => hub::add_ware(world, h, ware_id),
                None => {
                    // Both ends jammed: the ware goes back into storage.
                    let kind = world.ware(ware_id).kind;
                    world.wares.remove(ware_id);
                    let pos = world.agents.get(agent).map(|a| a.pos).unwrap_or_default();
                    if let Some(d) = nearest_depot(world, pos) {
                        world.depot_mut(d).add_stock(kind, 1);
                    }
                }
            }
        }
    }
}

// ── ship-work ─────────────────────────────────────────────────────────────────

/// The ship's standing behavior: sail to whatever dock the fleet assigned,
/// report arrival, idle otherwise.
///
/// `ivar1`: 1 while a sail leg is on the stack (the next update handles
/// arrival).
pub struct ShipWorkTask;

impl ShipWorkTask {
    /// After mooring: either start the outbound voyage (expedition handed
    /// over) or wait for the fleet's next assignment.
    fn after_arrival(&self, world: &mut World, agent: AgentId) -> Step<World> {
        let launch = world
            .ship_data_mut(agent)
            .map(|s| std::mem::take(&mut s.expedition))
            .unwrap_or(false);
        if launch {
            Step::Push { state: TaskState::new(&VOYAGE), delay_ms: 1 }
        } else {
            Step::Idle
        }
    }
}

impl Task<World> for ShipWorkTask {
    fn name(&self) -> &'static str {
        SHIP_WORK_NAME
    }
    fn unique(&self) -> bool {
        true
    }
    fn update(&self, world: &mut World, agent: AgentId, state: &mut TaskState<World>) -> Step<World> {
        world.agents.get_mut(agent).expect("ship without agent").clear_signal();
        let Some(data) = world.ship_data(agent) else {
            despawn(world, agent);
            return Step::Pop;
        };
        let dest = data.dest;

        if state.ivar1 == 1 {
            // A sail leg just finished (or failed).
            state.ivar1 = 0;
            if let Some(dock_id) = dest {
                world.ship_data_mut(agent).expect("checked above").dest = None;
                if world.docks.contains(dock_id) {
                    dock::ship_arrived(world, dock_id, agent);
                }
            }
            return self.after_arrival(world, agent);
        }

        let Some(dock_id) = dest else {
            return Step::Idle;
        };
        let Some(target) = world.docks.get(dock_id).map(|d| d.positions[0]) else {
            world.ship_data_mut(agent).expect("checked above").dest = None;
            return Step::Idle;
        };
        let pos = world.agents.get(agent).expect("ship without agent").pos;
        if pos == target {
            world.ship_data_mut(agent).expect("checked above").dest = None;
            dock::ship_arrived(world, dock_id, agent);
            return self.after_arrival(world, agent);
        }
        match find_path(&world.map, pos, target, 0, Movecaps::Swim, |_| false) {
            Ok(route) => {
                state.ivar1 = 1;
                Step::Push { state: walk_route_state(route), delay_ms: 1 }
            }
            Err(e) => {
                // The mooring may clear up; try again in a while.
                debug!("{agent}: no sea route to {dock_id}: {e}");
                Step::Wait(5_000)
            }
        }
    }
}

// ── voyage ────────────────────────────────────────────────────────────────────

/// Outbound expedition: the ship is on its own from here.  The cargo stays
/// aboard; further exploration is outside this engine's concern.
pub struct VoyageTask;

impl Task<World> for VoyageTask {
    fn name(&self) -> &'static str {
        VOYAGE_NAME
    }
    fn unique(&self) -> bool {
        true
    }
    fn update(&self, world: &mut World, agent: AgentId, _state: &mut TaskState<World>) -> Step<World> {
        if let Some(a) = world.agents.get_mut(agent) {
            a.clear_signal();
        }
        Step::Idle
    }
}
