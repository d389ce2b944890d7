//! Whole-world write/read.
//!
//! Writing walks every arena in slot order, translating handles to file
//! indices through an [`ObjectSaver`].  Reading runs in two phases, the way
//! object graphs with forward references have to: first every record gets a
//! placeholder object (populating the [`ObjectLoader`] tables), then a
//! second pass resolves all cross-references.  Map, registry, and tuning
//! are supplied by the caller — they are configuration, not world state.

use log::debug;

use cartage_agent::{Agent, TaskState};
use cartage_core::{
    AgentId, AnyHandle, HubId, LaneId, RequestId, RoleId, Tick, TuningConfig, WareKindId,
};
use cartage_economy::depot::Depot;
use cartage_economy::dock::{Dock, DockPayload, ShippingItem};
use cartage_economy::embark::{Embark, EmbarkSlot};
use cartage_economy::hub::{Hub, HubJob, RestingWare};
use cartage_economy::lane::{CarrierSlot, Lane};
use cartage_economy::request::{Economy, Request, RequestKind, RequestRole};
use cartage_economy::supply_queue::{QueueOwner, SupplyQueue};
use cartage_economy::tasks;
use cartage_economy::ware::{Ware, WareLocation};
use cartage_economy::world::{AgentData, CarrierData, Event, ShipData, Timer, WorkerData};
use cartage_economy::World;
use cartage_path::GridMap;

use crate::error::{SaveError, SaveResult};
use crate::records::*;
use crate::tables::{ObjectLoader, ObjectSaver};

/// Bumped whenever the record layout changes incompatibly.
pub const FORMAT_VERSION: u8 = 1;

// ── Name translation ──────────────────────────────────────────────────────────

fn ware_name(world: &World, kind: WareKindId) -> SaveResult<String> {
    world
        .registry
        .ware(kind)
        .map(|w| w.name.clone())
        .ok_or_else(|| SaveError::UnknownKind(kind.to_string()))
}

fn role_name(world: &World, role: RoleId) -> SaveResult<String> {
    world
        .registry
        .role(role)
        .map(|r| r.name.clone())
        .ok_or_else(|| SaveError::UnknownRole(role.to_string()))
}

fn ware_id(world: &World, name: &str) -> SaveResult<WareKindId> {
    world
        .registry
        .ware_by_name(name)
        .ok_or_else(|| SaveError::UnknownKind(name.to_string()))
}

fn role_id(world: &World, name: &str) -> SaveResult<RoleId> {
    world
        .registry
        .role_by_name(name)
        .ok_or_else(|| SaveError::UnknownRole(name.to_string()))
}

// ── Write ─────────────────────────────────────────────────────────────────────

/// Serialize the whole world into a versioned binary blob.
pub fn write_world(world: &World) -> SaveResult<Vec<u8>> {
    let saver = ObjectSaver::new(world);
    let record = build_record(world, &saver)?;
    bincode::serialize(&record).map_err(|e| SaveError::Encode(e.to_string()))
}

fn build_record(world: &World, s: &ObjectSaver) -> SaveResult<WorldRecord> {
    let mut rec = WorldRecord {
        version: FORMAT_VERSION,
        clock_now: world.clock.now().0,
        hubs: Vec::new(),
        lanes: Vec::new(),
        depots: Vec::new(),
        wares: Vec::new(),
        docks: Vec::new(),
        fleets: Vec::new(),
        queues: Vec::new(),
        requests: Vec::new(),
        economies: Vec::new(),
        agents: Vec::new(),
        timeline: Vec::new(),
    };

    for (_, hub) in world.hubs.iter() {
        rec.hubs.push(HubRecord {
            pos: hub.pos,
            economy: s.economy(hub.economy).ok_or(SaveError::MissingObject("hub economy"))?,
            capacity: hub.capacity,
            wares: hub
                .wares
                .iter()
                .map(|w| -> SaveResult<RestingWareRecord> {
                    Ok(RestingWareRecord {
                        ware: s.ware(w.ware).ok_or(SaveError::MissingObject("resting ware"))?,
                        pending: w.pending,
                        priority: w.priority,
                        nextstep: w.nextstep.and_then(|h| s.hub(h)),
                        seq: w.seq,
                    })
                })
                .collect::<SaveResult<_>>()?,
            next_seq: hub.next_seq,
            lanes: hub.lanes.iter().map(|&l| s.lane(l)).collect(),
            depot: hub.depot.and_then(|d| s.depot(d)),
            dock: hub.dock.and_then(|d| s.dock(d)),
            capacity_wait: hub.capacity_wait.iter().filter_map(|&a| s.agent(a)).collect(),
            jobs: hub
                .jobs
                .iter()
                .map(|j| -> SaveResult<HubJobRecord> {
                    Ok(HubJobRecord {
                        request: s.request(j.request).ok_or(SaveError::MissingObject("job request"))?,
                        program: j.program.clone(),
                    })
                })
                .collect::<SaveResult<_>>()?,
        });
    }

    for (_, lane) in world.lanes.iter() {
        rec.lanes.push(LaneRecord {
            hubs: [
                s.hub(lane.hubs[0]).ok_or(SaveError::MissingObject("lane hub"))?,
                s.hub(lane.hubs[1]).ok_or(SaveError::MissingObject("lane hub"))?,
            ],
            path: lane.path.clone(),
            idle_index: lane.idle_index,
            carrier_role: role_name(world, lane.carrier_role)?,
            slots: lane
                .slots
                .iter()
                .map(|slot| CarrierSlotRecord {
                    carrier: s.agent(slot.carrier),
                    request: s.request(slot.request),
                })
                .collect(),
            busyness: lane.busyness,
            busyness_last_update: lane.busyness_last_update.0,
        });
    }

    for (_, depot) in world.depots.iter() {
        let named = |entries: Vec<(WareKindId, u32)>| -> SaveResult<Vec<(String, u32)>> {
            let mut v = entries
                .into_iter()
                .map(|(k, n)| Ok((ware_name(world, k)?, n)))
                .collect::<SaveResult<Vec<_>>>()?;
            v.sort();
            Ok(v)
        };
        rec.depots.push(DepotRecord {
            hub: s.hub(depot.hub).ok_or(SaveError::MissingObject("depot hub"))?,
            stock: named(depot.stock_entries())?,
            workers: {
                let mut v = depot
                    .worker_entries()
                    .into_iter()
                    .map(|(r, n)| Ok((role_name(world, r)?, n)))
                    .collect::<SaveResult<Vec<_>>>()?;
                v.sort();
                v
            },
            expedition_bill: depot
                .expedition_bill
                .iter()
                .map(|&(k, n)| Ok((ware_name(world, k)?, n)))
                .collect::<SaveResult<_>>()?,
            expedition_roles: depot
                .expedition_roles
                .iter()
                .map(|&r| role_name(world, r))
                .collect::<SaveResult<_>>()?,
        });
    }

    for (_, ware) in world.wares.iter() {
        rec.wares.push(WareRecord {
            kind: ware_name(world, ware.kind)?,
            location: match ware.location {
                WareLocation::Hub(h) => WareLocationRecord::Hub(
                    s.hub(h).ok_or(SaveError::MissingObject("ware hub"))?,
                ),
                WareLocation::Carried(a) => WareLocationRecord::Carried(
                    s.agent(a).ok_or(SaveError::MissingObject("ware carrier"))?,
                ),
                WareLocation::Dock(d) => WareLocationRecord::Dock(
                    s.dock(d).ok_or(SaveError::MissingObject("ware dock"))?,
                ),
                WareLocation::Ship(a) => WareLocationRecord::Ship(
                    s.agent(a).ok_or(SaveError::MissingObject("ware ship"))?,
                ),
            },
            destination: ware.destination.and_then(|h| s.hub(h)),
            priority: ware.priority,
        });
    }

    for (_, dock) in world.docks.iter() {
        rec.docks.push(DockRecord {
            hub: s.hub(dock.hub).ok_or(SaveError::MissingObject("dock hub"))?,
            positions: dock.positions.clone(),
            depot: s.depot(dock.depot).ok_or(SaveError::MissingObject("dock depot"))?,
            fleet: s.fleet(dock.fleet).ok_or(SaveError::MissingObject("dock fleet"))?,
            need_ship: dock.need_ship,
            waiting: dock
                .waiting
                .iter()
                .map(|item| shipping_item_record(world, s, item))
                .collect::<SaveResult<_>>()?,
            embark: dock
                .embark
                .as_ref()
                .map(|e| -> SaveResult<EmbarkRecord> {
                    Ok(EmbarkRecord {
                        queues: e
                            .queues
                            .iter()
                            .map(|&q| s.queue(q).ok_or(SaveError::MissingObject("embark queue")))
                            .collect::<SaveResult<_>>()?,
                        workers: e
                            .workers
                            .iter()
                            .map(|slot| -> SaveResult<EmbarkSlotRecord> {
                                Ok(EmbarkSlotRecord {
                                    role: role_name(world, slot.role)?,
                                    request: s.request(slot.request),
                                    agent: s.agent(slot.agent),
                                })
                            })
                            .collect::<SaveResult<_>>()?,
                    })
                })
                .transpose()?,
            embark_ready: dock.embark_ready,
        });
    }

    for (_, fleet) in world.fleets.iter() {
        rec.fleets.push(FleetRecord {
            ships: fleet.ships.iter().filter_map(|&a| s.agent(a)).collect(),
            docks: fleet.docks.iter().filter_map(|&d| s.dock(d)).collect(),
        });
    }

    for (_, queue) in world.queues.iter() {
        rec.queues.push(QueueRecord {
            owner: match queue.owner {
                QueueOwner::Embark(d) => QueueOwnerRecord::Embark(
                    s.dock(d).ok_or(SaveError::MissingObject("queue dock"))?,
                ),
                QueueOwner::Depot(d) => QueueOwnerRecord::Depot(
                    s.depot(d).ok_or(SaveError::MissingObject("queue depot"))?,
                ),
            },
            hub: s.hub(queue.hub).ok_or(SaveError::MissingObject("queue hub"))?,
            kind: ware_name(world, queue.kind)?,
            max_size: queue.max_size,
            target_fill: queue.target_fill,
            filled: queue.filled,
            request: s.request(queue.request),
        });
    }

    for (_, req) in world.requests.iter() {
        rec.requests.push(RequestRecord {
            kind: match req.kind {
                RequestKind::Ware(k) => RequestKindRecord::Ware(ware_name(world, k)?),
                RequestKind::Worker(r) => RequestKindRecord::Worker(role_name(world, r)?),
            },
            target_hub: s.hub(req.target_hub).ok_or(SaveError::MissingObject("request hub"))?,
            role: match req.role {
                RequestRole::SupplyQueue { queue } => RequestRoleRecord::SupplyQueue {
                    queue: s.queue(queue).ok_or(SaveError::MissingObject("request queue"))?,
                },
                RequestRole::LaneSlot { lane, slot } => RequestRoleRecord::LaneSlot {
                    lane: s.lane(lane).ok_or(SaveError::MissingObject("request lane"))?,
                    slot,
                },
                RequestRole::HubJob { hub } => RequestRoleRecord::HubJob {
                    hub: s.hub(hub).ok_or(SaveError::MissingObject("request job hub"))?,
                },
                RequestRole::EmbarkWorker { dock, slot } => RequestRoleRecord::EmbarkWorker {
                    dock: s.dock(dock).ok_or(SaveError::MissingObject("request dock"))?,
                    slot,
                },
            },
            economy: s.economy(req.economy).ok_or(SaveError::MissingObject("request economy"))?,
            created: req.created.0,
            in_delivery: req.in_delivery,
            source_depot: s.depot(req.source_depot),
            courier: s.agent(req.courier),
            starve_noted: req.starve_noted,
        });
    }

    for (_, econ) in world.economies.iter() {
        rec.economies.push(EconomyRecord {
            hubs: econ.hubs.iter().filter_map(|&h| s.hub(h)).collect(),
            requests: econ.requests.iter().filter_map(|&r| s.request(r)).collect(),
            balance_scheduled: econ.balance_scheduled,
        });
    }

    for (id, agent) in world.agents.iter() {
        rec.agents.push(AgentRecord {
            pos: agent.pos,
            walk_end: agent.walk_end.0,
            signal: agent.signal.clone(),
            act_gen: agent.act_gen,
            default_task: agent.default_task.name().to_string(),
            stack: agent
                .stack
                .iter()
                .map(|st| TaskStateRecord {
                    task: st.task.name().to_string(),
                    ivar1: st.ivar1,
                    ivar2: st.ivar2,
                    ivar3: st.ivar3,
                    svar: st.svar.clone(),
                    objvar_request: s.request(RequestId::from_any(st.objvar)),
                    coords: st.coords,
                    path: st.path.clone(),
                })
                .collect(),
            data: match world.agent_data.get(&id) {
                None => None,
                Some(AgentData::Carrier(c)) => Some(AgentDataRecord::Carrier {
                    role: role_name(world, c.role)?,
                    lane: s.lane(c.lane).ok_or(SaveError::MissingObject("carrier lane"))?,
                    slot: c.slot,
                    carried: c.carried.and_then(|w| s.ware(w)),
                }),
                Some(AgentData::Worker(w)) => Some(AgentDataRecord::Worker {
                    role: role_name(world, w.role)?,
                }),
                Some(AgentData::Ship(ship)) => Some(AgentDataRecord::Ship {
                    fleet: s.fleet(ship.fleet).ok_or(SaveError::MissingObject("ship fleet"))?,
                    capacity: ship.capacity,
                    cargo: ship
                        .cargo
                        .iter()
                        .map(|item| shipping_item_record(world, s, item))
                        .collect::<SaveResult<_>>()?,
                    dest: ship.dest.and_then(|d| s.dock(d)),
                    expedition: ship.expedition,
                }),
            },
        });
    }

    for (at, event) in world.timeline.snapshot() {
        let kind = match event {
            Event::Act { agent, gen } => match s.agent(agent) {
                Some(a) => EventKindRecord::Act { agent: a, gen },
                None => continue, // wake-up for an agent that no longer exists
            },
            Event::Timer(Timer::Deliver { request }) => match s.request(request) {
                Some(r) => EventKindRecord::Deliver { request: r },
                None => continue,
            },
            Event::Timer(Timer::Balance { economy }) => match s.economy(economy) {
                Some(e) => EventKindRecord::Balance { economy: e },
                None => continue,
            },
        };
        rec.timeline.push(EventRecord { at: at.0, event: kind });
    }

    Ok(rec)
}

fn shipping_item_record(
    world: &World,
    s: &ObjectSaver,
    item: &ShippingItem,
) -> SaveResult<ShippingItemRecord> {
    Ok(ShippingItemRecord {
        payload: match item.payload {
            DockPayload::Ware(w) => DockPayloadRecord::Ware(
                s.ware(w).ok_or(SaveError::MissingObject("shipping ware"))?,
            ),
            DockPayload::Worker { agent, role } => DockPayloadRecord::Worker {
                agent: s.agent(agent),
                role: role_name(world, role)?,
            },
        },
        destination: item.destination.and_then(|d| s.dock(d)),
    })
}

// ── Read ──────────────────────────────────────────────────────────────────────

/// Reconstruct a world from `bytes`.
///
/// `map`, `registry`, `tuning`, and `seed` are external configuration —
/// the save only carries simulation state.  Any reference to an unknown
/// kind, role, task, or object index aborts the whole load.
pub fn read_world(
    bytes: &[u8],
    map: GridMap,
    registry: cartage_core::Registry,
    tuning: TuningConfig,
    seed: u64,
) -> SaveResult<World> {
    let rec: WorldRecord =
        bincode::deserialize(bytes).map_err(|e| SaveError::Decode(e.to_string()))?;
    if rec.version != FORMAT_VERSION {
        return Err(SaveError::Version { found: rec.version, supported: FORMAT_VERSION });
    }

    let mut world = World::new(map, registry, tuning, seed);
    world.clock.advance_to(Tick(rec.clock_now));

    // ── Phase 1: placeholders, in record order ────────────────────────────
    //
    // Every record gets a live object now so the loader tables are total
    // before any reference is resolved.

    let mut l = ObjectLoader::default();

    for h in &rec.hubs {
        l.hubs.push(world.hubs.insert(Hub::new(h.pos, h.capacity)));
    }
    for lane in &rec.lanes {
        let carrier_role = role_id(&world, &lane.carrier_role)?;
        l.lanes.push(world.lanes.insert(Lane {
            hubs: [HubId::INVALID; 2],
            path: lane.path.clone(),
            idle_index: lane.idle_index,
            carrier_role,
            slots: Vec::new(),
            busyness: lane.busyness,
            busyness_last_update: Tick(lane.busyness_last_update),
        }));
    }
    for d in &rec.depots {
        let hub = l.hub(d.hub)?;
        l.depots.push(world.depots.insert(Depot::new(hub)));
    }
    for w in &rec.wares {
        let kind = ware_id(&world, &w.kind)?;
        l.wares.push(world.wares.insert(Ware {
            kind,
            location: WareLocation::Hub(HubId::INVALID),
            destination: None,
            priority: w.priority,
        }));
    }
    for d in &rec.docks {
        l.docks.push(world.docks.insert(Dock {
            hub: HubId::INVALID,
            positions: d.positions.clone(),
            depot: cartage_core::DepotId::INVALID,
            fleet: cartage_core::FleetId::INVALID,
            need_ship: d.need_ship,
            waiting: Vec::new(),
            embark: None,
            embark_ready: d.embark_ready,
        }));
    }
    for _ in &rec.fleets {
        l.fleets.push(world.fleets.insert(cartage_economy::fleet::Fleet {
            ships: Vec::new(),
            docks: Vec::new(),
        }));
    }
    for q in &rec.queues {
        let kind = ware_id(&world, &q.kind)?;
        l.queues.push(world.queues.insert(SupplyQueue {
            owner: QueueOwner::Depot(cartage_core::DepotId::INVALID),
            hub: HubId::INVALID,
            kind,
            max_size: q.max_size,
            target_fill: q.target_fill,
            filled: q.filled,
            request: RequestId::INVALID,
        }));
    }
    for r in &rec.requests {
        let kind = match &r.kind {
            RequestKindRecord::Ware(name) => RequestKind::Ware(ware_id(&world, name)?),
            RequestKindRecord::Worker(name) => RequestKind::Worker(role_id(&world, name)?),
        };
        l.requests.push(world.requests.insert(Request {
            kind,
            target_hub: HubId::INVALID,
            role: RequestRole::SupplyQueue { queue: cartage_core::QueueId::INVALID },
            economy: cartage_core::EconomyId::INVALID,
            created: Tick(r.created),
            in_delivery: r.in_delivery,
            source_depot: cartage_core::DepotId::INVALID,
            courier: AgentId::INVALID,
            starve_noted: r.starve_noted,
        }));
    }
    for e in &rec.economies {
        l.economies.push(world.economies.insert(Economy {
            hubs: Vec::new(),
            requests: Vec::new(),
            balance_scheduled: e.balance_scheduled,
        }));
    }
    for a in &rec.agents {
        let default_task = tasks::task_by_name(&a.default_task)
            .ok_or_else(|| SaveError::UnknownTask(a.default_task.clone()))?;
        l.agents.push(world.agents.insert(Agent::new(a.pos, default_task)));
    }

    // ── Phase 2: resolve references ───────────────────────────────────────

    for (i, h) in rec.hubs.iter().enumerate() {
        let id = l.hubs[i];
        let economy = l.economy(h.economy)?;
        let wares = h
            .wares
            .iter()
            .map(|w| -> SaveResult<RestingWare> {
                Ok(RestingWare {
                    ware: l.ware(w.ware)?,
                    pending: w.pending,
                    priority: w.priority,
                    nextstep: w.nextstep.map(|n| l.hub(n)).transpose()?,
                    seq: w.seq,
                })
            })
            .collect::<SaveResult<Vec<_>>>()?;
        let mut lanes = [LaneId::INVALID; cartage_economy::hub::MAX_LANES];
        for (slot, lane) in h.lanes.iter().enumerate().take(lanes.len()) {
            if let Some(idx) = lane {
                lanes[slot] = l.lane(*idx)?;
            }
        }
        let depot = h.depot.map(|d| l.depot(d)).transpose()?;
        let dock = h.dock.map(|d| l.dock(d)).transpose()?;
        let capacity_wait = h
            .capacity_wait
            .iter()
            .map(|&a| l.agent(a))
            .collect::<SaveResult<Vec<_>>>()?;
        let jobs = h
            .jobs
            .iter()
            .map(|j| -> SaveResult<HubJob> {
                Ok(HubJob { request: l.request(j.request)?, program: j.program.clone() })
            })
            .collect::<SaveResult<Vec<_>>>()?;

        let hub = world.hub_mut(id);
        hub.economy = economy;
        hub.wares = wares;
        hub.next_seq = h.next_seq;
        hub.lanes = lanes;
        hub.depot = depot;
        hub.dock = dock;
        hub.capacity_wait = capacity_wait;
        hub.jobs = jobs;
    }

    for (i, lane_rec) in rec.lanes.iter().enumerate() {
        let id = l.lanes[i];
        let hubs = [l.hub(lane_rec.hubs[0])?, l.hub(lane_rec.hubs[1])?];
        let slots = lane_rec
            .slots
            .iter()
            .map(|slot| -> SaveResult<CarrierSlot> {
                Ok(CarrierSlot {
                    carrier: match slot.carrier {
                        Some(a) => l.agent(a)?,
                        None => AgentId::INVALID,
                    },
                    request: match slot.request {
                        Some(r) => l.request(r)?,
                        None => RequestId::INVALID,
                    },
                })
            })
            .collect::<SaveResult<Vec<_>>>()?;
        let lane = world.lane_mut(id);
        lane.hubs = hubs;
        lane.slots = slots;
    }

    for (i, d) in rec.depots.iter().enumerate() {
        let id = l.depots[i];
        for (name, n) in &d.stock {
            let kind = ware_id(&world, name)?;
            world.depot_mut(id).add_stock(kind, *n);
        }
        for (name, n) in &d.workers {
            let role = role_id(&world, name)?;
            world.depot_mut(id).add_worker(role, *n);
        }
        let bill = d
            .expedition_bill
            .iter()
            .map(|(name, n)| Ok((ware_id(&world, name)?, *n)))
            .collect::<SaveResult<Vec<_>>>()?;
        let roles = d
            .expedition_roles
            .iter()
            .map(|name| role_id(&world, name))
            .collect::<SaveResult<Vec<_>>>()?;
        let depot = world.depot_mut(id);
        depot.expedition_bill = bill;
        depot.expedition_roles = roles;
    }

    for (i, w) in rec.wares.iter().enumerate() {
        let id = l.wares[i];
        let location = match &w.location {
            WareLocationRecord::Hub(h) => WareLocation::Hub(l.hub(*h)?),
            WareLocationRecord::Carried(a) => WareLocation::Carried(l.agent(*a)?),
            WareLocationRecord::Dock(d) => WareLocation::Dock(l.dock(*d)?),
            WareLocationRecord::Ship(a) => WareLocation::Ship(l.agent(*a)?),
        };
        let destination = w.destination.map(|h| l.hub(h)).transpose()?;
        let ware = world.ware_mut(id);
        ware.location = location;
        ware.destination = destination;
    }

    for (i, d) in rec.docks.iter().enumerate() {
        let id = l.docks[i];
        let hub = l.hub(d.hub)?;
        let depot = l.depot(d.depot)?;
        let fleet = l.fleet(d.fleet)?;
        let waiting = d
            .waiting
            .iter()
            .map(|item| resolve_shipping_item(&world, &l, item))
            .collect::<SaveResult<Vec<_>>>()?;
        let embark = d
            .embark
            .as_ref()
            .map(|e| -> SaveResult<Embark> {
                Ok(Embark {
                    queues: e.queues.iter().map(|&q| l.queue(q)).collect::<SaveResult<_>>()?,
                    workers: e
                        .workers
                        .iter()
                        .map(|slot| -> SaveResult<EmbarkSlot> {
                            Ok(EmbarkSlot {
                                role: role_id(&world, &slot.role)?,
                                request: match slot.request {
                                    Some(r) => l.request(r)?,
                                    None => RequestId::INVALID,
                                },
                                agent: match slot.agent {
                                    Some(a) => l.agent(a)?,
                                    None => AgentId::INVALID,
                                },
                            })
                        })
                        .collect::<SaveResult<_>>()?,
                })
            })
            .transpose()?;
        let dock = world.dock_mut(id);
        dock.hub = hub;
        dock.depot = depot;
        dock.fleet = fleet;
        dock.waiting = waiting;
        dock.embark = embark;
    }

    for (i, f) in rec.fleets.iter().enumerate() {
        let id = l.fleets[i];
        let ships = f.ships.iter().map(|&a| l.agent(a)).collect::<SaveResult<Vec<_>>>()?;
        let docks = f.docks.iter().map(|&d| l.dock(d)).collect::<SaveResult<Vec<_>>>()?;
        let fleet = world.fleet_mut(id);
        fleet.ships = ships;
        fleet.docks = docks;
    }

    for (i, q) in rec.queues.iter().enumerate() {
        let id = l.queues[i];
        let owner = match q.owner {
            QueueOwnerRecord::Embark(d) => QueueOwner::Embark(l.dock(d)?),
            QueueOwnerRecord::Depot(d) => QueueOwner::Depot(l.depot(d)?),
        };
        let hub = l.hub(q.hub)?;
        let request = match q.request {
            Some(r) => l.request(r)?,
            None => RequestId::INVALID,
        };
        let queue = world.queues.get_mut(id).expect("phase-1 insert");
        queue.owner = owner;
        queue.hub = hub;
        queue.request = request;
    }

    for (i, r) in rec.requests.iter().enumerate() {
        let id = l.requests[i];
        let target_hub = l.hub(r.target_hub)?;
        let role = match r.role {
            RequestRoleRecord::SupplyQueue { queue } => {
                RequestRole::SupplyQueue { queue: l.queue(queue)? }
            }
            RequestRoleRecord::LaneSlot { lane, slot } => {
                RequestRole::LaneSlot { lane: l.lane(lane)?, slot }
            }
            RequestRoleRecord::HubJob { hub } => RequestRole::HubJob { hub: l.hub(hub)? },
            RequestRoleRecord::EmbarkWorker { dock, slot } => {
                RequestRole::EmbarkWorker { dock: l.dock(dock)?, slot }
            }
        };
        let economy = l.economy(r.economy)?;
        let source_depot = match r.source_depot {
            Some(d) => l.depot(d)?,
            None => cartage_core::DepotId::INVALID,
        };
        let courier = match r.courier {
            Some(a) => l.agent(a)?,
            None => AgentId::INVALID,
        };
        let req = world.requests.get_mut(id).expect("phase-1 insert");
        req.target_hub = target_hub;
        req.role = role;
        req.economy = economy;
        req.source_depot = source_depot;
        req.courier = courier;
    }

    for (i, e) in rec.economies.iter().enumerate() {
        let id = l.economies[i];
        let hubs = e.hubs.iter().map(|&h| l.hub(h)).collect::<SaveResult<Vec<_>>>()?;
        let requests = e.requests.iter().map(|&r| l.request(r)).collect::<SaveResult<Vec<_>>>()?;
        let econ = world.economies.get_mut(id).expect("phase-1 insert");
        econ.hubs = hubs;
        econ.requests = requests;
    }

    for (i, a) in rec.agents.iter().enumerate() {
        let id = l.agents[i];
        let stack = a
            .stack
            .iter()
            .map(|st| -> SaveResult<TaskState<World>> {
                let task = tasks::task_by_name(&st.task)
                    .ok_or_else(|| SaveError::UnknownTask(st.task.clone()))?;
                let mut state = TaskState::new(task);
                state.ivar1 = st.ivar1;
                state.ivar2 = st.ivar2;
                state.ivar3 = st.ivar3;
                state.svar = st.svar.clone();
                state.objvar = match st.objvar_request {
                    Some(r) => l.request(r)?.erase(),
                    None => AnyHandle::INVALID,
                };
                state.coords = st.coords;
                state.path = st.path.clone();
                Ok(state)
            })
            .collect::<SaveResult<Vec<_>>>()?;
        let data = match &a.data {
            None => None,
            Some(AgentDataRecord::Carrier { role, lane, slot, carried }) => {
                Some(AgentData::Carrier(CarrierData {
                    role: role_id(&world, role)?,
                    lane: l.lane(*lane)?,
                    slot: *slot,
                    carried: carried.map(|w| l.ware(w)).transpose()?,
                }))
            }
            Some(AgentDataRecord::Worker { role }) => {
                Some(AgentData::Worker(WorkerData { role: role_id(&world, role)? }))
            }
            Some(AgentDataRecord::Ship { fleet, capacity, cargo, dest, expedition }) => {
                Some(AgentData::Ship(ShipData {
                    fleet: l.fleet(*fleet)?,
                    capacity: *capacity,
                    cargo: cargo
                        .iter()
                        .map(|item| resolve_shipping_item(&world, &l, item))
                        .collect::<SaveResult<_>>()?,
                    dest: dest.map(|d| l.dock(d)).transpose()?,
                    expedition: *expedition,
                }))
            }
        };
        if let Some(data) = data {
            world.agent_data.insert(id, data);
        }
        let agent = world.agents.get_mut(id).expect("phase-1 insert");
        agent.walk_end = Tick(a.walk_end);
        agent.signal = a.signal.clone();
        agent.act_gen = a.act_gen;
        agent.stack = stack;
    }

    // ── Timeline ──────────────────────────────────────────────────────────

    for ev in &rec.timeline {
        let event = match ev.event {
            EventKindRecord::Act { agent, gen } => Event::Act { agent: l.agent(agent)?, gen },
            EventKindRecord::Deliver { request } => {
                Event::Timer(Timer::Deliver { request: l.request(request)? })
            }
            EventKindRecord::Balance { economy } => {
                Event::Timer(Timer::Balance { economy: l.economy(economy)? })
            }
        };
        world.timeline.push(Tick(ev.at), event);
    }

    debug!(
        "world loaded: {} hubs, {} lanes, {} agents, {} queued events",
        rec.hubs.len(),
        rec.lanes.len(),
        rec.agents.len(),
        rec.timeline.len()
    );
    Ok(world)
}

fn resolve_shipping_item(
    world: &World,
    l: &ObjectLoader,
    item: &ShippingItemRecord,
) -> SaveResult<ShippingItem> {
    Ok(ShippingItem {
        payload: match &item.payload {
            DockPayloadRecord::Ware(w) => DockPayload::Ware(l.ware(*w)?),
            DockPayloadRecord::Worker { agent, role } => DockPayload::Worker {
                agent: match agent {
                    Some(a) => l.agent(*a)?,
                    None => AgentId::INVALID,
                },
                role: role_id(world, role)?,
            },
        },
        destination: item.destination.map(|d| l.dock(d)).transpose()?,
    })
}
