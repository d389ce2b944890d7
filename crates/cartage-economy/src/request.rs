//! Fulfillment requests, economies, and the balance step.
//!
//! A request is an outstanding ask for one ware or one worker, owned by
//! whatever issued it (a supply queue, a lane slot, a hub job, an
//! embarkation slot).  Requests never time out: transient lack of supply is
//! queued state, not an error.  Each economy — a connected component of the
//! hub graph — periodically matches its open requests against depot stock;
//! fulfillments complete synchronously in the tick that finishes them.

use std::collections::VecDeque;

use log::{debug, trace};

use rustc_hash::{FxHashMap, FxHashSet};

use cartage_agent::{despawn, push_task, spawn, AgentHost, TaskState};
use cartage_core::{
    AgentId, DepotId, EconomyId, HubId, Note, RequestId, RoleId, Tick, WareKindId,
};

use crate::world::{AgentData, Timer, WorkerData, World};
use crate::{dock, embark, hub, lane, supply_queue, tasks, ware};

// ── Types ─────────────────────────────────────────────────────────────────────

/// What a request asks for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RequestKind {
    Ware(WareKindId),
    Worker(RoleId),
}

/// Who issued the request — a closed set, so fulfillment dispatch is total
/// and requests can persist.  A completion that names a request the world
/// does not know is a defect and panics.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RequestRole {
    SupplyQueue { queue: cartage_core::QueueId },
    LaneSlot { lane: cartage_core::LaneId, slot: u32 },
    HubJob { hub: HubId },
    EmbarkWorker { dock: cartage_core::DockId, slot: u32 },
}

/// An outstanding fulfillment request.
pub struct Request {
    pub kind: RequestKind,
    /// Where the fulfillment should arrive.
    pub target_hub: HubId,
    pub role: RequestRole,
    pub economy: EconomyId,
    pub created: Tick,
    /// A delivery timer or courier is under way.
    pub in_delivery: bool,
    /// Depot the reserved ware/worker came from (for returns on cancel).
    pub source_depot: DepotId,
    /// Worker agent en route, for worker requests in delivery.
    pub courier: AgentId,
    /// An out-of-stock note was already published for this request.
    pub starve_noted: bool,
}

/// A connected component of the hub graph sharing supply.
pub struct Economy {
    /// Member hubs, ascending slot order.
    pub hubs: Vec<HubId>,
    /// Open requests in registration order.
    pub requests: Vec<RequestId>,
    /// A balance timer is pending.
    pub balance_scheduled: bool,
}

// ── Economy bookkeeping ───────────────────────────────────────────────────────

pub fn create_economy(world: &mut World, hubs: Vec<HubId>) -> EconomyId {
    world.economies.insert(Economy { hubs, requests: Vec::new(), balance_scheduled: false })
}

/// First depot of an economy, in member-hub order.
pub fn find_depot_in_economy(world: &World, economy: EconomyId) -> Option<DepotId> {
    let econ = world.economies.get(economy)?;
    econ.hubs.iter().find_map(|&h| world.hubs.get(h).and_then(|hub| hub.depot))
}

fn ensure_balance_scheduled(world: &mut World, economy: EconomyId) {
    let interval = world.tuning.balance_interval_ms;
    let now = world.now();
    let Some(econ) = world.economies.get_mut(economy) else {
        return;
    };
    if econ.balance_scheduled {
        return;
    }
    econ.balance_scheduled = true;
    world.schedule_timer(now.offset(interval), Timer::Balance { economy });
}

// ── Request lifecycle ─────────────────────────────────────────────────────────

/// Issue a request.  It stays outstanding until fulfilled or canceled —
/// there are no timeouts.
pub fn create_request(
    world: &mut World,
    kind: RequestKind,
    target_hub: HubId,
    role: RequestRole,
) -> RequestId {
    let economy = world.hub(target_hub).economy;
    let created = world.now();
    let id = world.requests.insert(Request {
        kind,
        target_hub,
        role,
        economy,
        created,
        in_delivery: false,
        source_depot: DepotId::INVALID,
        courier: AgentId::INVALID,
        starve_noted: false,
    });
    world
        .economies
        .get_mut(economy)
        .unwrap_or_else(|| panic!("request targets hub of dead economy {economy}"))
        .requests
        .push(id);
    trace!("{id}: {kind:?} for {target_hub} ({role:?})");
    ensure_balance_scheduled(world, economy);
    id
}

/// Withdraw a request.  Anything already reserved for it goes back to its
/// source depot; a courier already walking is recalled.  Canceling an
/// already-gone request is a no-op (teardown paths may race).
pub fn cancel_request(world: &mut World, id: RequestId) {
    let Some(req) = world.requests.remove(id) else {
        return;
    };
    if let Some(econ) = world.economies.get_mut(req.economy) {
        econ.requests.retain(|r| *r != id);
    }
    if !req.in_delivery {
        return;
    }
    match req.kind {
        RequestKind::Ware(kind) => {
            // The delivery timer will find the request gone and do nothing.
            if let Some(d) = world.depots.get_mut(req.source_depot) {
                d.add_stock(kind, 1);
            }
        }
        RequestKind::Worker(role) => {
            if world.agents.contains(req.courier) {
                world.agent_data.remove(&req.courier);
                despawn(world, req.courier);
                if let Some(d) = world.depots.get_mut(req.source_depot) {
                    d.add_worker(role, 1);
                }
            }
        }
    }
    trace!("{id}: canceled");
}

/// Fulfillment failed mid-flight (courier route failure): put the request
/// back on the open market.
pub fn reopen_request(world: &mut World, id: RequestId) {
    if let Some(req) = world.requests.get_mut(id) {
        req.in_delivery = false;
        req.source_depot = DepotId::INVALID;
        req.courier = AgentId::INVALID;
        let economy = req.economy;
        ensure_balance_scheduled(world, economy);
    }
}

// ── Balance: matching requests to stock ───────────────────────────────────────

/// One matching pass for `economy`: pair open requests with depot stock in
/// registration order, reserving goods and dispatching couriers.
pub fn balance(world: &mut World, economy: EconomyId) {
    let Some(econ) = world.economies.get_mut(economy) else {
        return; // economy dissolved since the timer was set
    };
    econ.balance_scheduled = false;
    let request_ids = econ.requests.clone();
    let depot_ids: Vec<DepotId> = econ
        .hubs
        .clone()
        .into_iter()
        .filter_map(|h| world.hubs.get(h).and_then(|hub| hub.depot))
        .collect();

    for rid in request_ids {
        let Some(req) = world.requests.get(rid) else {
            continue;
        };
        if req.in_delivery {
            continue;
        }
        match req.kind {
            RequestKind::Ware(kind) => match_ware(world, rid, kind, &depot_ids),
            RequestKind::Worker(role) => match_worker(world, rid, role, &depot_ids),
        }
    }

    if world.economies.get(economy).is_some_and(|e| !e.requests.is_empty()) {
        ensure_balance_scheduled(world, economy);
    }
}

fn match_ware(world: &mut World, rid: RequestId, kind: WareKindId, depots: &[DepotId]) {
    let supplier = depots
        .iter()
        .copied()
        .find(|&d| world.depots.get(d).is_some_and(|dep| dep.stock(kind) > 0));
    let Some(depot_id) = supplier else {
        starve_note(world, rid, kind, depots);
        return;
    };

    world.depot_mut(depot_id).take_stock(kind, 1);
    let (target, depot_hub) = {
        let req = world.requests.get(rid).expect("checked above");
        (req.target_hub, world.depots.get(depot_id).expect("checked above").hub)
    };
    let dist = world.hub(depot_hub).pos.step_distance(world.hub(target).pos) as u64;
    let travel = (dist + 1) * world.tuning.delivery_ms_per_step;
    let at = world.now().offset(travel);

    let req = world.requests.get_mut(rid).expect("checked above");
    req.in_delivery = true;
    req.source_depot = depot_id;
    req.starve_noted = false;
    world.schedule_timer(at, Timer::Deliver { request: rid });
    trace!("{rid}: ware reserved from {depot_id}, arriving at {at}");
}

fn match_worker(world: &mut World, rid: RequestId, role: RoleId, depots: &[DepotId]) {
    let supplier = depots
        .iter()
        .copied()
        .find(|&d| world.depots.get(d).is_some_and(|dep| dep.workers(role) > 0));
    let Some(depot_id) = supplier else {
        return;
    };

    world.depot_mut(depot_id).take_worker(role, 1);
    let start = world.hub(world.depots.get(depot_id).expect("checked above").hub).pos;

    let agent = spawn(world, start, &tasks::RETIRE);
    world.agent_data.insert(agent, AgentData::Worker(WorkerData { role }));
    let mut state = TaskState::new(&tasks::FULFILL);
    state.objvar = rid.erase();
    push_task(world, agent, state, 1);

    let req = world.requests.get_mut(rid).expect("checked above");
    req.in_delivery = true;
    req.source_depot = depot_id;
    req.courier = agent;
    trace!("{rid}: courier {agent} dispatched from {depot_id}");
}

fn starve_note(world: &mut World, rid: RequestId, kind: WareKindId, depots: &[DepotId]) {
    let Some(&depot) = depots.first() else {
        return;
    };
    let req = world.requests.get_mut(rid).expect("caller holds a live id");
    if !req.starve_noted {
        req.starve_noted = true;
        world.notes.publish(Note::OutOfStock { depot, ware: kind });
    }
}

// ── Completion ────────────────────────────────────────────────────────────────

/// A reserved ware finished traveling.  Fired by the delivery timer; if the
/// request was canceled in the meantime this is a silent no-op (the goods
/// were already returned by the cancel).
pub fn deliver_ware(world: &mut World, rid: RequestId) {
    let Some(req) = world.requests.remove(rid) else {
        return;
    };
    if let Some(econ) = world.economies.get_mut(req.economy) {
        econ.requests.retain(|r| *r != rid);
    }
    debug!("{rid}: ware delivered");
    match req.role {
        RequestRole::SupplyQueue { queue } => supply_queue::on_ware_arrived(world, queue),
        other => panic!("ware delivery bound to non-queue request role {other:?}"),
    }
}

/// A courier reached the request's target.  Runs synchronously within the
/// arriving tick.
///
/// # Panics
///
/// Panics if `rid` is not a registered request — a completion for a request
/// the world does not know indicates an internal defect.
pub fn complete_worker_request(world: &mut World, rid: RequestId, agent: AgentId) {
    let Some(req) = world.requests.remove(rid) else {
        panic!("fulfillment callback references unregistered request {rid}");
    };
    if let Some(econ) = world.economies.get_mut(req.economy) {
        econ.requests.retain(|r| *r != rid);
    }
    debug!("{rid}: fulfilled by {agent}");
    match req.role {
        RequestRole::LaneSlot { lane: lane_id, slot } => {
            // If the lane vanished while the worker walked, it simply
            // retires through its default task.
            let _ = lane::assign_carrier(world, lane_id, slot, agent);
        }
        RequestRole::HubJob { hub: hub_id } => {
            let _ = hub::dispatch_job(world, hub_id, rid, agent);
        }
        RequestRole::EmbarkWorker { dock: dock_id, slot } => {
            embark::worker_arrived(world, dock_id, slot, agent);
        }
        RequestRole::SupplyQueue { .. } => {
            panic!("worker completion on a ware request {rid}");
        }
    }
}

// ── Economy reassignment ──────────────────────────────────────────────────────

/// Recompute connected components and reassign every economy-scoped object.
///
/// This is the one operation that touches state across components in a
/// single step; it runs atomically within the current tick with no event
/// processing in between.  Open requests *move* to their hub's new economy
/// — they are never canceled by a reassignment.
pub fn rebuild_economies(world: &mut World) {
    let hub_ids: Vec<HubId> = world.hubs.ids().collect();

    // Connected components over lanes and same-fleet dock links, seeded in
    // ascending hub order so component identity is deterministic.
    let mut seen: FxHashSet<HubId> = FxHashSet::default();
    let mut components: Vec<Vec<HubId>> = Vec::new();
    for &start in &hub_ids {
        if seen.contains(&start) {
            continue;
        }
        let mut comp = Vec::new();
        let mut queue: VecDeque<HubId> = VecDeque::new();
        queue.push_back(start);
        seen.insert(start);
        while let Some(h) = queue.pop_front() {
            comp.push(h);
            for n in neighbors_of(world, h) {
                if seen.insert(n) {
                    queue.push_back(n);
                }
            }
        }
        comp.sort_unstable();
        components.push(comp);
    }

    // Assign economy ids: the lowest member keeps its old economy when it
    // is still free; everyone else gets a fresh one.
    let old_ids: Vec<EconomyId> = world.economies.ids().collect();
    let mut used: FxHashSet<EconomyId> = FxHashSet::default();
    let mut assignment: FxHashMap<HubId, EconomyId> = FxHashMap::default();
    for comp in &components {
        let candidate = world.hub(comp[0]).economy;
        let id = if world.economies.contains(candidate) && !used.contains(&candidate) {
            let econ = world.economies.get_mut(candidate).expect("checked above");
            econ.hubs = comp.clone();
            econ.requests.clear();
            candidate
        } else {
            create_economy(world, comp.clone())
        };
        used.insert(id);
        for &h in comp {
            assignment.insert(h, id);
        }
    }
    for id in old_ids {
        if !used.contains(&id) {
            world.economies.remove(id);
        }
    }
    for (&h, &e) in &assignment {
        world.hub_mut(h).economy = e;
    }
    debug!("economies rebuilt: {} components", components.len());

    // Move open requests to their target hub's new economy.  Requests whose
    // target hub disappeared are canceled — their owner is gone with it.
    let request_ids: Vec<RequestId> = world.requests.ids().collect();
    for rid in request_ids {
        let target = world.requests.get(rid).expect("just listed").target_hub;
        match world.hubs.get(target) {
            Some(hub) => {
                let economy = hub.economy;
                world.requests.get_mut(rid).expect("just listed").economy = economy;
                world
                    .economies
                    .get_mut(economy)
                    .expect("assigned above")
                    .requests
                    .push(rid);
                ensure_balance_scheduled(world, economy);
            }
            None => cancel_request(world, rid),
        }
    }

    // Re-evaluate queues (a queue stranded without a request re-issues one
    // in its new economy) and re-route everything in motion.
    let queue_ids: Vec<cartage_core::QueueId> = world.queues.ids().collect();
    for q in queue_ids {
        supply_queue::update_queue(world, q);
    }
    ware::reroute_all_wares(world);
    let dock_ids: Vec<cartage_core::DockId> = world.docks.ids().collect();
    for d in dock_ids {
        dock::refresh_waiting(world, d);
    }
}

/// Hubs directly connected to `h` by a lane or a same-fleet dock link.
fn neighbors_of(world: &World, h: HubId) -> Vec<HubId> {
    let Some(hub) = world.hubs.get(h) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for &lane_id in hub.lanes.iter().filter(|l| !l.is_invalid()) {
        if let Some(lane) = world.lanes.get(lane_id) {
            out.push(lane.other_hub(h));
        }
    }
    if let Some(dock_id) = hub.dock {
        if let Some(dock) = world.docks.get(dock_id) {
            if let Some(fleet) = world.fleets.get(dock.fleet) {
                for &other in &fleet.docks {
                    if other != dock_id {
                        if let Some(od) = world.docks.get(other) {
                            out.push(od.hub);
                        }
                    }
                }
            }
        }
    }
    out
}
