//! Embarkation: one-shot expedition mustering at a dock.
//!
//! Created when an expedition is requested, the embarkation issues one
//! supply queue per required good (sized from the depot's expedition bill)
//! and one worker request per required role.  It reports ready only when
//! every queue is at target and every worker has arrived; a visiting empty
//! ship then takes everything in one hand-over and the embarkation tears
//! itself down.  Cancellation at any point returns all accumulated goods
//! and workers to the depot.

use log::debug;

use cartage_agent::despawn;
use cartage_core::{AgentId, DockId, Note, QueueId, RequestId, RoleId};

use crate::dock::{DockPayload, ShippingItem};
use crate::request::{self, RequestKind, RequestRole};
use crate::supply_queue::{self, QueueOwner};
use crate::ware::{Ware, WareLocation};
use crate::world::World;
use crate::{fleet, tasks};

/// One required worker: an outstanding request or an arrived agent.
pub struct EmbarkSlot {
    pub role: RoleId,
    pub request: RequestId,
    pub agent: AgentId,
}

impl EmbarkSlot {
    pub fn arrived(&self) -> bool {
        !self.agent.is_invalid()
    }
}

/// The mustering state owned by a dock.
pub struct Embark {
    pub queues: Vec<QueueId>,
    pub workers: Vec<EmbarkSlot>,
}

/// Issue all queues and worker requests for an expedition at `dock_id`.
pub fn start(world: &mut World, dock_id: DockId) {
    let dock = world.dock(dock_id);
    assert!(dock.embark.is_none(), "embarkation already running at {dock_id}");
    let hub = dock.hub;
    let depot_id = dock.depot;
    let (bill, roles) = {
        let depot = world.depots.get(depot_id).expect("dock without depot");
        (depot.expedition_bill.clone(), depot.expedition_roles.clone())
    };

    let mut queues = Vec::with_capacity(bill.len());
    for (kind, count) in bill {
        queues.push(supply_queue::create_queue(
            world,
            QueueOwner::Embark(dock_id),
            hub,
            kind,
            count,
            count,
        ));
    }

    let mut workers = Vec::with_capacity(roles.len());
    for (i, role) in roles.into_iter().enumerate() {
        let request = request::create_request(
            world,
            RequestKind::Worker(role),
            hub,
            RequestRole::EmbarkWorker { dock: dock_id, slot: i as u32 },
        );
        workers.push(EmbarkSlot { role, request, agent: AgentId::INVALID });
    }

    world.dock_mut(dock_id).embark = Some(Embark { queues, workers });
    debug!("{dock_id}: expedition mustering started");
    // A bill of nothing is ready immediately.
    check_ready(world, dock_id);
}

/// A requested worker reached the dock: park it and re-check readiness.
pub fn worker_arrived(world: &mut World, dock_id: DockId, slot: u32, agent: AgentId) {
    let Some(dock) = world.docks.get_mut(dock_id) else {
        return; // dock died while the worker walked; it retires
    };
    let Some(embark) = dock.embark.as_mut() else {
        return;
    };
    let s = &mut embark.workers[slot as usize];
    s.request = RequestId::INVALID;
    s.agent = agent;

    // Workers wait at the dock doing nothing until hand-over or cancel.
    if let Some(a) = world.agents.get_mut(agent) {
        a.default_task = &tasks::IDLE;
    }
    debug!("{dock_id}: expedition worker {agent} arrived (slot {slot})");
    check_ready(world, dock_id);
}

/// Flip `embark_ready` once everything has arrived, notifying the fleet.
pub fn check_ready(world: &mut World, dock_id: DockId) {
    let Some(dock) = world.docks.get(dock_id) else {
        return;
    };
    let Some(embark) = dock.embark.as_ref() else {
        return;
    };
    if dock.embark_ready {
        return;
    }

    let queues_full = embark
        .queues
        .iter()
        .all(|&q| world.queues.get(q).is_some_and(|queue| queue.satisfied()));
    let workers_here = embark.workers.iter().all(EmbarkSlot::arrived);
    if !(queues_full && workers_here) {
        return;
    }

    world.dock_mut(dock_id).embark_ready = true;
    debug!("{dock_id}: expedition ready");
    let fleet_id = world.dock(dock_id).fleet;
    fleet::update(world, fleet_id);
}

/// Transfer the fully mustered expedition onto `ship` in one shot and tear
/// the embarkation down.
///
/// # Panics
/// Panics if called without a ready embarkation — the dock checks
/// readiness before handing anything over.
pub fn hand_over(world: &mut World, dock_id: DockId, ship: AgentId) {
    let embark = world
        .dock_mut(dock_id)
        .embark
        .take()
        .expect("hand_over without an embarkation");
    world.dock_mut(dock_id).embark_ready = false;

    for queue in embark.queues {
        let (kind, count) = supply_queue::drain_for_handover(world, queue);
        for _ in 0..count {
            let ware = world.wares.insert(Ware {
                kind,
                location: WareLocation::Ship(ship),
                destination: None,
                priority: 0,
            });
            world
                .ship_data_mut(ship)
                .expect("hand_over to non-ship")
                .cargo
                .push(ShippingItem { payload: DockPayload::Ware(ware), destination: None });
        }
        supply_queue::destroy_queue(world, queue);
    }

    for slot in embark.workers {
        assert!(slot.arrived(), "hand_over with missing expedition worker");
        world.agent_data.remove(&slot.agent);
        despawn(world, slot.agent);
        world
            .ship_data_mut(ship)
            .expect("hand_over to non-ship")
            .cargo
            .push(ShippingItem {
                payload: DockPayload::Worker { agent: AgentId::INVALID, role: slot.role },
                destination: None,
            });
    }
    world.ship_data_mut(ship).expect("hand_over to non-ship").expedition = true;
    debug!("{dock_id}: expedition handed over to {ship}");
}

/// Abort the expedition: goods return to the depot, arrived workers are
/// released back into it, outstanding requests die.
pub fn cancel(world: &mut World, dock_id: DockId) {
    let Some(embark) = world.dock_mut(dock_id).embark.take() else {
        return;
    };
    world.dock_mut(dock_id).embark_ready = false;
    let depot_id = world.dock(dock_id).depot;

    for queue in embark.queues {
        // destroy_queue returns the stored fill to the owning depot.
        supply_queue::destroy_queue(world, queue);
    }
    for slot in embark.workers {
        if !slot.request.is_invalid() {
            request::cancel_request(world, slot.request);
        }
        if slot.arrived() && world.agents.contains(slot.agent) {
            world.agent_data.remove(&slot.agent);
            despawn(world, slot.agent);
            if let Some(d) = world.depots.get_mut(depot_id) {
                d.add_worker(slot.role, 1);
            }
        }
    }
    world.notes.publish(Note::EmbarkationCanceled { dock: dock_id });
    debug!("{dock_id}: expedition canceled");
}
