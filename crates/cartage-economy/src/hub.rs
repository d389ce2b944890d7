//! Hub nodes: the vertices of the routing graph.
//!
//! A hub holds a small bounded store of in-transit wares, up to six lane
//! slots, an optionally attached depot and dock, a capacity-wait queue of
//! agents blocked on space, and "hub jobs" — one-shot worker requests that
//! dispatch the arriving worker into a named behavior.

use log::{debug, trace};

use cartage_agent::send_signal;
use cartage_core::{AgentId, DepotId, DockId, EconomyId, HubId, LaneId, Note, RoleId, WareId};

use crate::lane;
use crate::request::{self, RequestKind, RequestRole};
use crate::ware::{self, WareLocation};
use crate::world::World;

/// Lane slots per hub.
pub const MAX_LANES: usize = 6;

/// One ware resting on a hub.
pub struct RestingWare {
    pub ware: WareId,
    /// `true` while the ware waits for a carrier; cleared by `ack_pickup`
    /// when a carrier commits to it.
    pub pending: bool,
    /// Higher wins when a carrier becomes available.
    pub priority: i32,
    /// The neighboring hub this ware leaves toward, once routing resolved
    /// it.  `None` = unresolved; the ware is not dispatchable.
    pub nextstep: Option<HubId>,
    /// FIFO tie-break among equal priorities.
    pub seq: u64,
}

/// A one-shot worker request bound to a named behavior program.
pub struct HubJob {
    pub request: cartage_core::RequestId,
    pub program: String,
}

pub struct Hub {
    pub pos: cartage_core::Coord,
    pub economy: EconomyId,
    pub capacity: u32,
    pub wares: Vec<RestingWare>,
    pub lanes: [LaneId; MAX_LANES],
    pub depot: Option<DepotId>,
    pub dock: Option<DockId>,
    /// Agents blocked because this hub is full, woken one at a time as
    /// wares leave.
    pub capacity_wait: Vec<AgentId>,
    pub jobs: Vec<HubJob>,
    /// Source of `RestingWare::seq`.  Public so persistence can restore it;
    /// world code never writes it directly.
    pub next_seq: u64,
}

impl Hub {
    pub fn new(pos: cartage_core::Coord, capacity: u32) -> Self {
        Self {
            pos,
            economy: EconomyId::INVALID,
            capacity,
            wares: Vec::new(),
            lanes: [LaneId::INVALID; MAX_LANES],
            depot: None,
            dock: None,
            capacity_wait: Vec::new(),
            jobs: Vec::new(),
            next_seq: 0,
        }
    }

    /// `true` if another ware may rest here.
    pub fn has_capacity(&self) -> bool {
        (self.wares.len() as u32) < self.capacity
    }

    pub fn ware_count(&self) -> usize {
        self.wares.len()
    }

    pub fn has_lane(&self) -> bool {
        self.lanes.iter().any(|l| !l.is_invalid())
    }

    /// The lane connecting this hub to `other`, if one exists.
    pub fn lane_to(&self, world_lanes: &cartage_core::Arena<LaneId, lane::Lane>, other: HubId) -> Option<LaneId> {
        self.lanes
            .iter()
            .filter(|l| !l.is_invalid())
            .copied()
            .find(|&l| {
                world_lanes
                    .get(l)
                    .is_some_and(|ln| ln.hubs.contains(&other))
            })
    }

    /// Occupy a free lane slot.  Returns `false` if all six are taken.
    pub fn attach_lane(&mut self, lane: LaneId) -> bool {
        for slot in &mut self.lanes {
            if slot.is_invalid() {
                *slot = lane;
                return true;
            }
        }
        false
    }

    pub fn detach_lane(&mut self, lane: LaneId) {
        for slot in &mut self.lanes {
            if *slot == lane {
                *slot = LaneId::INVALID;
            }
        }
    }

    /// `true` if any ware is waiting for a carrier toward `to`.
    pub fn has_pending_ware(&self, to: HubId) -> bool {
        self.wares
            .iter()
            .any(|w| w.pending && w.nextstep == Some(to))
    }

    /// A carrier commits to the best pending ware toward `to`.
    ///
    /// Returns `false` if nothing is pending that way; the carrier should
    /// not come.
    pub fn ack_pickup(&mut self, to: HubId) -> bool {
        match best_entry(&self.wares, to, |w| w.pending) {
            Some(i) => {
                self.wares[i].pending = false;
                true
            }
            None => false,
        }
    }

    /// A carrier releases a commitment made with [`ack_pickup`].
    pub fn cancel_pickup(&mut self, to: HubId) -> bool {
        match best_entry(&self.wares, to, |w| !w.pending && w.nextstep == Some(to)) {
            Some(i) => {
                self.wares[i].pending = true;
                true
            }
            None => false,
        }
    }
}

/// Index of the highest-priority entry toward `to` satisfying `extra`,
/// FIFO among equal priorities.
fn best_entry(wares: &[RestingWare], to: HubId, extra: impl Fn(&RestingWare) -> bool) -> Option<usize> {
    wares
        .iter()
        .enumerate()
        .filter(|(_, w)| w.nextstep == Some(to) && extra(w))
        .max_by(|(_, a), (_, b)| {
            a.priority
                .cmp(&b.priority)
                .then(b.seq.cmp(&a.seq)) // lower seq wins → reversed
        })
        .map(|(i, _)| i)
}

// ── Construction / teardown ───────────────────────────────────────────────────

/// Create a hub in its own fresh economy.
pub fn create_hub(world: &mut World, pos: cartage_core::Coord) -> HubId {
    let capacity = world.tuning.hub_capacity;
    let hub = world.hubs.insert(Hub::new(pos, capacity));
    let economy = request::create_economy(world, vec![hub]);
    world.hub_mut(hub).economy = economy;
    world.notes.publish(Note::StructureGained { at: pos });
    debug!("created {hub} at {pos} in {economy}");
    hub
}

/// Remove a hub: its lanes are destroyed, resting wares vanish with it,
/// and waiting agents receive a "fail" signal.
pub fn destroy_hub(world: &mut World, hub_id: HubId) {
    let lanes: Vec<LaneId> = world
        .hub(hub_id)
        .lanes
        .iter()
        .filter(|l| !l.is_invalid())
        .copied()
        .collect();
    for l in lanes {
        lane::destroy_lane(world, l);
    }

    let hub = world.hubs.remove(hub_id).unwrap_or_else(|| panic!("unknown hub {hub_id}"));
    for entry in &hub.wares {
        world.wares.remove(entry.ware);
    }
    for agent in &hub.capacity_wait {
        send_signal(world, *agent, "fail");
    }
    for job in &hub.jobs {
        if world.requests.contains(job.request) {
            request::cancel_request(world, job.request);
        }
    }
    world.notes.publish(Note::StructureLost { at: hub.pos });
    request::rebuild_economies(world);
}

// ── Ware handling ─────────────────────────────────────────────────────────────

/// Store a ware on the hub.  The entry starts unresolved; routing follows
/// immediately via [`ware::update_ware`].
///
/// # Panics
/// Panics if the hub is full — capacity is enforced by the caller via
/// [`Hub::has_capacity`], so overflow is a defect.
pub fn add_ware(world: &mut World, hub_id: HubId, ware_id: WareId) {
    let hub = world.hub_mut(hub_id);
    assert!(hub.has_capacity(), "add_ware on full hub {hub_id}");
    let seq = hub.next_seq;
    hub.next_seq += 1;
    hub.wares.push(RestingWare {
        ware: ware_id,
        pending: false,
        priority: 0,
        nextstep: None,
        seq,
    });
    world.ware_mut(ware_id).location = WareLocation::Hub(hub_id);
    trace!("{ware_id} rests on {hub_id}");
    ware::update_ware(world, ware_id);
}

/// Routing resolved a next hop for `ware_id`: mark it pending dispatch and
/// nudge the lane.
pub fn call_carrier(world: &mut World, hub_id: HubId, ware_id: WareId, to: HubId, lane_id: LaneId) {
    let priority = world.ware(ware_id).priority;
    let hub = world.hub_mut(hub_id);
    let entry = hub
        .wares
        .iter_mut()
        .find(|w| w.ware == ware_id)
        .unwrap_or_else(|| panic!("call_carrier: {ware_id} is not resting on {hub_id}"));
    entry.pending = true;
    entry.priority = priority;
    entry.nextstep = Some(to);
    trace!("{hub_id}: {ware_id} pending toward {to} (priority {priority})");
    lane::notify_ware(world, lane_id, hub_id);
}

/// Forget any dispatch state for `ware_id` (kept resting, unresolved).
pub fn clear_dispatch(world: &mut World, hub_id: HubId, ware_id: WareId) {
    let hub = world.hub_mut(hub_id);
    if let Some(entry) = hub.wares.iter_mut().find(|w| w.ware == ware_id) {
        entry.pending = false;
        entry.nextstep = None;
    }
}

/// Remove and return the best dispatchable ware toward `to`.
///
/// Considers both pending and already-acked entries so a carrier that
/// acked, walked over, and fetches is served the ware it reserved.  Frees
/// one capacity slot, waking one waiting agent.
pub fn fetch_pending_ware(world: &mut World, hub_id: HubId, to: HubId) -> Option<WareId> {
    let hub = world.hub_mut(hub_id);
    let i = best_entry(&hub.wares, to, |_| true)?;
    let entry = hub.wares.remove(i);
    trace!("{hub_id}: dispatching {} toward {to}", entry.ware);
    wake_up_capacity_queue(world, hub_id);
    Some(entry.ware)
}

/// Remove a ware from the hub without dispatching it (consumed, absorbed,
/// or transferred to a dock).  Frees one capacity slot.
pub fn remove_ware(world: &mut World, hub_id: HubId, ware_id: WareId) {
    let hub = world.hub_mut(hub_id);
    let before = hub.wares.len();
    hub.wares.retain(|w| w.ware != ware_id);
    assert!(hub.wares.len() < before, "remove_ware: {ware_id} not on {hub_id}");
    wake_up_capacity_queue(world, hub_id);
}

// ── Capacity waits ────────────────────────────────────────────────────────────

/// Register `agent` as blocked on this hub's capacity.  It will receive a
/// "wakeup" signal when a slot frees up.
pub fn wait_for_capacity(world: &mut World, hub_id: HubId, agent: AgentId) {
    world.hub_mut(hub_id).capacity_wait.push(agent);
}

/// Remove `agent` from the capacity-wait list (it gave up).  Tolerates a
/// hub that died while the agent waited.
pub fn skip_wait_for_capacity(world: &mut World, hub_id: HubId, agent: AgentId) {
    if let Some(hub) = world.hubs.get_mut(hub_id) {
        hub.capacity_wait.retain(|a| *a != agent);
    }
}

/// Wake exactly one waiting agent, oldest first.
pub fn wake_up_capacity_queue(world: &mut World, hub_id: HubId) {
    let hub = world.hub_mut(hub_id);
    if hub.capacity_wait.is_empty() {
        return;
    }
    let agent = hub.capacity_wait.remove(0);
    trace!("{hub_id}: waking {agent} from capacity wait");
    send_signal(world, agent, "wakeup");
}

// ── Hub jobs ──────────────────────────────────────────────────────────────────

/// Attach a one-shot job: request a worker of `role` and, once it arrives,
/// run the named behavior program on it.
pub fn add_hub_job(world: &mut World, hub_id: HubId, role: RoleId, program: &str) {
    assert!(
        crate::tasks::task_by_name(program).is_some(),
        "unknown hub job program '{program}'"
    );
    let request = request::create_request(
        world,
        RequestKind::Worker(role),
        hub_id,
        RequestRole::HubJob { hub: hub_id },
    );
    world.hub_mut(hub_id).jobs.push(HubJob { request, program: program.to_string() });
    debug!("{hub_id}: job '{program}' posted ({request})");
}

/// A job's worker arrived: dispatch it into the job's program and drop the
/// job.  Returns `false` if the job vanished (hub rebuilt) — the worker
/// falls back to retiring.
pub fn dispatch_job(world: &mut World, hub_id: HubId, request: cartage_core::RequestId, agent: AgentId) -> bool {
    let Some(hub) = world.hubs.get_mut(hub_id) else {
        return false;
    };
    let Some(i) = hub.jobs.iter().position(|j| j.request == request) else {
        return false;
    };
    let job = hub.jobs.remove(i);
    let task = crate::tasks::task_by_name(&job.program)
        .unwrap_or_else(|| panic!("unknown hub job program '{}'", job.program));
    debug!("{hub_id}: dispatching {agent} into '{}'", job.program);
    cartage_agent::push_task(world, agent, cartage_agent::TaskState::new(task), 1);
    true
}
