//! Lanes: the edges of the routing graph.
//!
//! A lane connects exactly two hubs along a fixed walkable path and owns
//! carrier slots.  Each empty slot keeps one worker-fulfillment request
//! outstanding; the arriving worker is assigned into the slot and starts
//! ferrying wares back and forth.  A busyness counter, bumped whenever a
//! ware appears with no idle carrier and decaying over time, biases route
//! costs so loaded lanes look more expensive.

use log::{debug, trace};

use cartage_agent::{despawn, schedule_act, AgentHost};
use cartage_core::{AgentId, HubId, LaneId, Note, RequestId, RoleId, Tick, WareId};
use cartage_path::{find_path, Movecaps, Path};

use crate::request::{self, RequestKind, RequestRole};
use crate::world::{AgentData, CarrierData, World};
use crate::{hub, EconomyError, EconomyResult};

/// One carrier slot: an outstanding request or an assigned carrier, never
/// both.
pub struct CarrierSlot {
    pub carrier: AgentId,
    pub request: RequestId,
}

impl CarrierSlot {
    fn empty() -> Self {
        Self { carrier: AgentId::INVALID, request: RequestId::INVALID }
    }
}

pub struct Lane {
    /// Start and end hubs.  The path runs from `hubs[0]`'s position to
    /// `hubs[1]`'s.
    pub hubs: [HubId; 2],
    pub path: Path,
    /// Index into the path where idle carriers park.  Chosen from the path
    /// parity so a single carrier sits as close to the middle as possible.
    pub idle_index: u32,
    pub carrier_role: RoleId,
    pub slots: Vec<CarrierSlot>,
    /// Raw busyness counter as of `busyness_last_update`.  Only ever moves
    /// toward zero between updates; read through
    /// [`effective_busyness`](Self::effective_busyness).
    pub busyness: u32,
    pub busyness_last_update: Tick,
}

impl Lane {
    /// Which end (0 or 1) `h` is, if it is an endpoint at all.
    pub fn end_of(&self, h: HubId) -> Option<usize> {
        self.hubs.iter().position(|x| *x == h)
    }

    /// The hub opposite `h`.
    pub fn other_hub(&self, h: HubId) -> HubId {
        debug_assert!(self.hubs.contains(&h));
        if self.hubs[0] == h {
            self.hubs[1]
        } else {
            self.hubs[0]
        }
    }

    /// Busyness with lazy time decay applied.
    pub fn effective_busyness(&self, now: Tick, decay_ms: u64) -> u32 {
        if decay_ms == 0 {
            return self.busyness;
        }
        let decayed = now.since(self.busyness_last_update) / decay_ms;
        self.busyness.saturating_sub(decayed.min(u32::MAX as u64) as u32)
    }

    /// Walking cost of this lane plus the busyness bias.
    pub fn cost_ms(&self, world: &World, now: Tick) -> u64 {
        let base = self.path.cost_ms(&world.map);
        let busy = self.effective_busyness(now, world.tuning.busyness_decay_ms) as u64;
        base + busy * world.tuning.busyness_cost_bias_ms
    }

    /// The coordinate where idle carriers park.
    pub fn idle_pos(&self) -> cartage_core::Coord {
        if self.idle_index == 0 {
            self.path.start()
        } else {
            self.path.step(self.idle_index as usize - 1)
        }
    }
}

// ── Construction ──────────────────────────────────────────────────────────────

/// Build a lane between two hubs, searching a walkable path between them.
pub fn create_lane(
    world: &mut World,
    a: HubId,
    b: HubId,
    carrier_role: RoleId,
) -> EconomyResult<LaneId> {
    let from = world.hub(a).pos;
    let to = world.hub(b).pos;
    let path = find_path(&world.map, from, to, 0, Movecaps::Walk, |_| false)
        .map_err(|_| EconomyError::NoLaneRoute(a, b))?;
    create_lane_with_path(world, a, b, path, carrier_role)
}

/// Build a lane along an already-known path (used by splitting).
pub fn create_lane_with_path(
    world: &mut World,
    a: HubId,
    b: HubId,
    path: Path,
    carrier_role: RoleId,
) -> EconomyResult<LaneId> {
    debug_assert_eq!(path.start(), world.hub(a).pos);
    debug_assert_eq!(path.end(), world.hub(b).pos);

    // Odd-length paths have no exact middle; the index rounds toward the
    // start so the carrier leans to the first hub.
    let idle_index = (path.len() / 2) as u32;
    let now = world.now();
    let lane_id = world.lanes.insert(Lane {
        hubs: [a, b],
        path,
        idle_index,
        carrier_role,
        slots: vec![CarrierSlot::empty()],
        busyness: 0,
        busyness_last_update: now,
    });

    if !world.hub_mut(a).attach_lane(lane_id) {
        world.lanes.remove(lane_id);
        return Err(EconomyError::HubFull(a));
    }
    if !world.hub_mut(b).attach_lane(lane_id) {
        world.hub_mut(a).detach_lane(lane_id);
        world.lanes.remove(lane_id);
        return Err(EconomyError::HubFull(b));
    }

    let at = world.lane(lane_id).idle_pos();
    world.notes.publish(Note::StructureGained { at });
    debug!("created {lane_id} between {a} and {b}");

    request::rebuild_economies(world);

    let slot_count = world.lane(lane_id).slots.len();
    for slot in 0..slot_count as u32 {
        request_carrier(world, lane_id, slot);
    }
    Ok(lane_id)
}

/// Issue the worker-fulfillment request for an empty carrier slot.
pub fn request_carrier(world: &mut World, lane_id: LaneId, slot: u32) {
    let lane = world.lane(lane_id);
    let s = &lane.slots[slot as usize];
    assert!(
        s.carrier.is_invalid() && s.request.is_invalid(),
        "{lane_id} slot {slot}: carrier and request are exclusive"
    );
    let target = lane.hubs[0];
    let role = lane.carrier_role;
    let request = request::create_request(
        world,
        RequestKind::Worker(role),
        target,
        RequestRole::LaneSlot { lane: lane_id, slot },
    );
    world.lane_mut(lane_id).slots[slot as usize].request = request;
    trace!("{lane_id} slot {slot}: carrier requested ({request})");
}

/// The requested worker arrived: put it into the slot and start the ferry
/// behavior.  Returns `false` if the lane vanished while the worker walked.
pub fn assign_carrier(world: &mut World, lane_id: LaneId, slot: u32, agent: AgentId) -> bool {
    let Some(lane) = world.lanes.get_mut(lane_id) else {
        return false;
    };
    let role = lane.carrier_role;
    let s = &mut lane.slots[slot as usize];
    s.request = RequestId::INVALID;
    s.carrier = agent;
    world.agent_data.insert(
        agent,
        AgentData::Carrier(CarrierData { role, lane: lane_id, slot, carried: None }),
    );
    if let Some(a) = world.agents.get_mut(agent) {
        a.default_task = &crate::tasks::LANE_WORK;
    }
    debug!("{lane_id} slot {slot}: {agent} assigned as carrier");
    true
}

// ── Dispatch nudging ──────────────────────────────────────────────────────────

/// A ware became pending at `from`: wake an idle carrier, or bump busyness
/// if everyone is occupied.  Returns `true` if a carrier was nudged.
pub fn notify_ware(world: &mut World, lane_id: LaneId, _from: HubId) -> bool {
    let now = world.now();
    let decay = world.tuning.busyness_decay_ms;

    let carriers: Vec<AgentId> = world
        .lane(lane_id)
        .slots
        .iter()
        .filter(|s| !s.carrier.is_invalid())
        .map(|s| s.carrier)
        .collect();

    for carrier in carriers {
        let idle = world
            .agents
            .get(carrier)
            .and_then(|a| a.top_state())
            .is_some_and(|s| s.task.name() == crate::tasks::LANE_WORK_NAME);
        if idle {
            trace!("{lane_id}: nudging idle carrier {carrier}");
            schedule_act(world, carrier, 10);
            return true;
        }
    }

    let lane = world.lane_mut(lane_id);
    let busy = lane.effective_busyness(now, decay);
    lane.busyness = busy + 1;
    lane.busyness_last_update = now;
    trace!("{lane_id}: busyness now {}", lane.busyness);
    false
}

// ── Teardown / splitting ──────────────────────────────────────────────────────

/// Destroy a lane, tearing down its carriers gracefully: carried wares are
/// set down (on the start hub if it has room, else into a depot), carriers
/// return to a depot of their economy, and outstanding slot requests are
/// canceled.
pub fn destroy_lane(world: &mut World, lane_id: LaneId) {
    let lane = world
        .lanes
        .remove(lane_id)
        .unwrap_or_else(|| panic!("unknown lane {lane_id}"));
    let [a, b] = lane.hubs;
    let at = lane.idle_pos();

    for slot in &lane.slots {
        if !slot.request.is_invalid() && world.requests.contains(slot.request) {
            request::cancel_request(world, slot.request);
        }
        if !slot.carrier.is_invalid() {
            release_carrier(world, slot.carrier, a);
        }
    }

    if let Some(h) = world.hubs.get_mut(a) {
        h.detach_lane(lane_id);
    }
    if let Some(h) = world.hubs.get_mut(b) {
        h.detach_lane(lane_id);
    }
    world.notes.publish(Note::StructureLost { at });
    debug!("destroyed {lane_id}");
    request::rebuild_economies(world);
}

/// Return a carrier to storage: any carried ware is set down, the worker
/// goes back into a depot, and the agent leaves the world.
fn release_carrier(world: &mut World, carrier: AgentId, home_hub: HubId) {
    let Some(AgentData::Carrier(data)) = world.agent_data.remove(&carrier) else {
        despawn(world, carrier);
        return;
    };
    if let Some(ware_id) = data.carried {
        set_down_ware(world, ware_id, home_hub);
    }
    if let Some(depot_id) = request::find_depot_in_economy(world, world.hub(home_hub).economy) {
        world.depot_mut(depot_id).add_worker(data.role, 1);
    }
    despawn(world, carrier);
}

/// Put a loose ware somewhere sensible: the hub if it has room, else the
/// economy's depot stock, else gone.
fn set_down_ware(world: &mut World, ware_id: WareId, hub_id: HubId) {
    if world.hub(hub_id).has_capacity() {
        hub::add_ware(world, hub_id, ware_id);
        return;
    }
    let kind = world.ware(ware_id).kind;
    world.wares.remove(ware_id);
    if let Some(depot_id) = request::find_depot_in_economy(world, world.hub(hub_id).economy) {
        world.depot_mut(depot_id).add_stock(kind, 1);
    }
}

/// Split a lane by inserting a new hub at `at` (a tile on the lane's path
/// interior).  The old lane is torn down gracefully and two shorter lanes
/// take its place, each requesting fresh carriers.
pub fn split_lane(
    world: &mut World,
    lane_id: LaneId,
    at: cartage_core::Coord,
) -> EconomyResult<(HubId, LaneId, LaneId)> {
    let lane = world.lane(lane_id);
    let [a, b] = lane.hubs;
    let role = lane.carrier_role;
    let split_idx = lane
        .path
        .position_of(at)
        .filter(|&i| i > 0 && i < lane.path.len())
        .ok_or(EconomyError::NoLaneRoute(a, b))?;

    let mut first = lane.path.clone();
    first.truncate(split_idx);
    let mut second = lane.path.clone();
    second.trim_start(split_idx);

    destroy_lane(world, lane_id);
    let mid = hub::create_hub(world, at);
    let l1 = create_lane_with_path(world, a, mid, first, role)?;
    let l2 = create_lane_with_path(world, mid, b, second, role)?;
    debug!("split {lane_id} at {at} into {l1} and {l2}");
    Ok((mid, l1, l2))
}
