//! Maritime hubs: docks bridging the road network to ship transport.
//!
//! A dock behaves like a hub whose "lanes" are a shared fleet.  Goods and
//! workers awaiting sea transport sit in the dock's waiting list; whenever
//! an item's destination stops being reachable it is returned to the
//! attached depot and unregistered.  `ship_arrived` is the single point
//! where a visiting ship is unloaded, handed a completed expedition, or
//! partially loaded.

use log::{debug, trace};

use cartage_agent::despawn;
use cartage_core::{AgentId, DepotId, DockId, HubId, Note, RoleId, WareId};
use cartage_path::{Movecaps, TileMap};

use crate::ware::WareLocation;
use crate::world::World;
use crate::{embark, fleet, request, router, EconomyError, EconomyResult};

/// What a shipping item carries.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DockPayload {
    Ware(WareId),
    /// A worker awaiting or undergoing transport.  `agent` is live while
    /// the worker waits at a dock and `INVALID` while it rides a ship.
    Worker { agent: AgentId, role: RoleId },
}

/// A good or worker in the sea-transport pipeline.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ShippingItem {
    pub payload: DockPayload,
    pub destination: Option<DockId>,
}

pub struct Dock {
    /// Land-side hub (which holds `dock: Some(self)` back-reference).
    pub hub: HubId,
    /// Water tiles where ships moor.  All must be water-connected.
    pub positions: Vec<cartage_core::Coord>,
    /// Attached warehouse.
    pub depot: DepotId,
    pub fleet: cartage_core::FleetId,
    /// A ship should visit.  Toggled idempotently; every change triggers a
    /// fleet re-evaluation.
    pub need_ship: bool,
    pub waiting: Vec<ShippingItem>,
    pub embark: Option<embark::Embark>,
    /// The embarkation is fully supplied and waits for an empty ship.
    pub embark_ready: bool,
}

impl Dock {
    /// Number of waiting items.
    pub fn count_waiting(&self) -> usize {
        self.waiting.len()
    }

    /// Number of waiting items of one ware kind.
    pub fn count_waiting_ware(&self, world: &World, kind: cartage_core::WareKindId) -> usize {
        self.waiting
            .iter()
            .filter(|item| match item.payload {
                DockPayload::Ware(w) => world.wares.get(w).is_some_and(|ware| ware.kind == kind),
                DockPayload::Worker { .. } => false,
            })
            .count()
    }
}

// ── Construction / teardown ───────────────────────────────────────────────────

/// Create a dock on `hub` with the given mooring positions.
///
/// The dock founds its own fleet and immediately merges with any fleet it
/// can reach over water, which is how separate port economies join up.
pub fn create_dock(
    world: &mut World,
    hub_id: HubId,
    positions: Vec<cartage_core::Coord>,
    depot: DepotId,
) -> EconomyResult<DockId> {
    assert!(!positions.is_empty(), "a dock needs at least one mooring position");
    for &p in &positions {
        if !world.map.passable(p, Movecaps::Swim) {
            return Err(EconomyError::NotWater(p));
        }
    }
    assert!(world.hub(hub_id).dock.is_none(), "{hub_id} already has a dock");

    let at = positions[0];
    let dock_id = world.docks.insert(Dock {
        hub: hub_id,
        positions,
        depot,
        fleet: cartage_core::FleetId::INVALID,
        need_ship: false,
        waiting: Vec::new(),
        embark: None,
        embark_ready: false,
    });
    world.hub_mut(hub_id).dock = Some(dock_id);
    let fleet_id = fleet::create_fleet(world, dock_id);
    world.dock_mut(dock_id).fleet = fleet_id;
    fleet::merge_reachable_fleets(world, fleet_id);
    world.notes.publish(Note::StructureGained { at });
    debug!("created {dock_id} on {hub_id}");
    request::rebuild_economies(world);
    Ok(dock_id)
}

/// Tear a dock down: waiting items return to the depot, any expedition is
/// canceled, and the fleet forgets the dock.
pub fn destroy_dock(world: &mut World, dock_id: DockId) {
    if world.dock(dock_id).embark.is_some() {
        let _ = cancel_expedition(world, dock_id);
    }
    let items: Vec<ShippingItem> = std::mem::take(&mut world.dock_mut(dock_id).waiting);
    let depot = world.dock(dock_id).depot;
    for item in items {
        return_item_to_depot(world, depot, item);
    }

    let dock = world.docks.remove(dock_id).expect("checked above");
    if let Some(h) = world.hubs.get_mut(dock.hub) {
        h.dock = None;
    }
    fleet::remove_dock(world, dock.fleet, dock_id);
    world.notes.publish(Note::StructureLost { at: dock.positions[0] });
    debug!("destroyed {dock_id}");
    request::rebuild_economies(world);
}

// ── Waiting items ─────────────────────────────────────────────────────────────

/// Register a good or worker for sea transport.
///
/// The destination dock is resolved immediately (for wares, from the
/// ware's destination hub); an item with no valid destination goes
/// straight back to the depot.
pub fn add_shipping_item(
    world: &mut World,
    dock_id: DockId,
    payload: DockPayload,
    destination: Option<DockId>,
) {
    let destination = match payload {
        DockPayload::Ware(ware_id) => {
            let dest_hub = world.ware(ware_id).destination;
            dest_hub.and_then(|d| find_dest_dock(world, dock_id, d))
        }
        DockPayload::Worker { .. } => destination,
    };

    let item = ShippingItem { payload, destination };
    if destination.is_none() {
        trace!("{dock_id}: item has no sea destination, returning to depot");
        let depot = world.dock(dock_id).depot;
        return_item_to_depot(world, depot, item);
        return;
    }

    if let DockPayload::Ware(ware_id) = payload {
        world.ware_mut(ware_id).location = WareLocation::Dock(dock_id);
    }
    world.dock_mut(dock_id).waiting.push(item);
    set_need_ship(world, dock_id, true);
}

/// Re-validate one waiting item after a routing-relevant change.  Items
/// whose destination became unreachable are returned to the depot and
/// unregistered.
pub fn update_shipping_item(world: &mut World, dock_id: DockId, index: usize) {
    let item = world.dock(dock_id).waiting[index];

    let new_dest = match item.payload {
        DockPayload::Ware(ware_id) => world
            .wares
            .get(ware_id)
            .and_then(|w| w.destination)
            .and_then(|d| find_dest_dock(world, dock_id, d)),
        DockPayload::Worker { .. } => item.destination.filter(|&d| {
            world.docks.contains(d) && world.docks.get(d).is_some_and(|dd| {
                dd.fleet == world.dock(dock_id).fleet
            })
        }),
    };

    match new_dest {
        Some(d) => {
            world.dock_mut(dock_id).waiting[index].destination = Some(d);
            set_need_ship(world, dock_id, true);
        }
        None => {
            let item = world.dock_mut(dock_id).waiting.swap_remove(index);
            let depot = world.dock(dock_id).depot;
            return_item_to_depot(world, depot, item);
            if world.dock(dock_id).waiting.is_empty() {
                set_need_ship(world, dock_id, false);
            }
        }
    }
}

/// Re-validate the whole waiting list (called after economy reassignment).
pub fn refresh_waiting(world: &mut World, dock_id: DockId) {
    // Backwards so swap_remove never skips an entry.
    let mut i = world.dock(dock_id).waiting.len();
    while i > 0 {
        i -= 1;
        update_shipping_item(world, dock_id, i);
    }
}

/// Destination dock for a ware heading to `dest_hub`: a same-fleet dock
/// whose hub reaches the destination over roads.  First match in fleet
/// order wins.
fn find_dest_dock(world: &World, from: DockId, dest_hub: HubId) -> Option<DockId> {
    let fleet_id = world.dock(from).fleet;
    let fleet = world.fleets.get(fleet_id)?;
    fleet
        .docks
        .iter()
        .copied()
        .filter(|&d| d != from)
        .find(|&d| {
            world
                .docks
                .get(d)
                .is_some_and(|dd| router::hub_reachable_by_road(world, dd.hub, dest_hub))
        })
}

/// Hand an item back to the attached warehouse.
fn return_item_to_depot(world: &mut World, depot: DepotId, item: ShippingItem) {
    match item.payload {
        DockPayload::Ware(ware_id) => {
            if let Some(ware) = world.wares.remove(ware_id) {
                if let Some(d) = world.depots.get_mut(depot) {
                    d.add_stock(ware.kind, 1);
                }
            }
        }
        DockPayload::Worker { agent, role } => {
            if world.agents.contains(agent) {
                world.agent_data.remove(&agent);
                despawn(world, agent);
            }
            if let Some(d) = world.depots.get_mut(depot) {
                d.add_worker(role, 1);
            }
        }
    }
}

// ── Ship interface ────────────────────────────────────────────────────────────

/// Toggle the "a ship should visit" flag.  Setting the current value is a
/// no-op; every actual change triggers exactly one fleet re-evaluation.
pub fn set_need_ship(world: &mut World, dock_id: DockId, need: bool) {
    let dock = world.dock_mut(dock_id);
    if dock.need_ship == need {
        return;
    }
    dock.need_ship = need;
    let fleet_id = dock.fleet;
    trace!("{dock_id}: need_ship = {need}");
    fleet::update(world, fleet_id);
}

/// A ship moored at this dock.
///
/// Order of business:
/// 1. completely unload everything destined here;
/// 2. if a fully supplied embarkation waits and the ship is now empty,
///    hand the whole expedition over in one shot and send the ship out;
/// 3. otherwise load waiting items up to the ship's free capacity,
///    returning any item whose destination died to the depot.
pub fn ship_arrived(world: &mut World, dock_id: DockId, ship: AgentId) {
    debug!("{dock_id}: ship {ship} arrived");
    unload_for_here(world, dock_id, ship);

    if world.dock(dock_id).embark_ready {
        assert!(
            world.dock(dock_id).embark.is_some(),
            "{dock_id}: embark_ready without an embarkation"
        );
        let empty = world.ship_data(ship).is_some_and(|s| s.cargo.is_empty());
        if empty {
            // hand_over flags the ship; its behavior starts the outbound
            // voyage on its next update.
            embark::hand_over(world, dock_id, ship);
            let fleet_id = world.dock(dock_id).fleet;
            fleet::update(world, fleet_id);
            return;
        }
    }

    load_waiting(world, dock_id, ship);
    let fleet_id = world.dock(dock_id).fleet;
    fleet::update(world, fleet_id);
}

/// Phase 1 of `ship_arrived`: every cargo item destined here leaves the
/// ship and lands in the depot.
fn unload_for_here(world: &mut World, dock_id: DockId, ship: AgentId) {
    let Some(data) = world.ship_data_mut(ship) else {
        panic!("{ship} is not a ship");
    };
    let (here, rest): (Vec<ShippingItem>, Vec<ShippingItem>) = data
        .cargo
        .drain(..)
        .partition(|item| item.destination == Some(dock_id));
    data.cargo = rest;

    let depot = world.dock(dock_id).depot;
    for item in here {
        match item.payload {
            DockPayload::Ware(ware_id) => {
                // Delivered across the sea: absorb into the warehouse and
                // let the economy route it onward from there.
                if let Some(ware) = world.wares.remove(ware_id) {
                    if let Some(d) = world.depots.get_mut(depot) {
                        d.add_stock(ware.kind, 1);
                    }
                }
            }
            DockPayload::Worker { role, .. } => {
                if let Some(d) = world.depots.get_mut(depot) {
                    d.add_worker(role, 1);
                }
            }
        }
    }
}

/// Phase 3 of `ship_arrived`: load as many waiting items as fit.
fn load_waiting(world: &mut World, dock_id: DockId, ship: AgentId) {
    loop {
        let free = {
            let Some(data) = world.ship_data(ship) else {
                return;
            };
            data.capacity as usize - data.cargo.len()
        };
        if free == 0 || world.dock(dock_id).waiting.is_empty() {
            break;
        }

        let idx = world.dock(dock_id).waiting.len() - 1;
        // Destination may have died while the item waited.
        let valid = {
            let item = world.dock(dock_id).waiting[idx];
            item.destination.is_some_and(|d| world.docks.contains(d))
        };
        let item = world.dock_mut(dock_id).waiting.pop().expect("checked non-empty");
        if !valid {
            let depot = world.dock(dock_id).depot;
            return_item_to_depot(world, depot, item);
            continue;
        }

        let loaded = match item.payload {
            DockPayload::Ware(ware_id) => {
                world.ware_mut(ware_id).location = WareLocation::Ship(ship);
                item
            }
            DockPayload::Worker { agent, role } => {
                // The worker boards: its agent leaves the world and rides
                // as cargo.
                if world.agents.contains(agent) {
                    world.agent_data.remove(&agent);
                    despawn(world, agent);
                }
                ShippingItem {
                    payload: DockPayload::Worker { agent: AgentId::INVALID, role },
                    destination: item.destination,
                }
            }
        };
        world.ship_data_mut(ship).expect("checked above").cargo.push(loaded);
        trace!("{dock_id}: loaded item onto {ship}");
    }

    if world.dock(dock_id).waiting.is_empty() {
        set_need_ship(world, dock_id, false);
    }
}

// ── Expeditions ───────────────────────────────────────────────────────────────

/// Begin assembling an expedition at this dock.
pub fn start_expedition(world: &mut World, dock_id: DockId) -> EconomyResult<()> {
    if world.dock(dock_id).embark.is_some() {
        return Err(EconomyError::ExpeditionInProgress);
    }
    embark::start(world, dock_id);
    Ok(())
}

/// Abort the expedition (if any), returning everything collected so far.
pub fn cancel_expedition(world: &mut World, dock_id: DockId) -> EconomyResult<()> {
    if world.dock(dock_id).embark.is_none() {
        return Err(EconomyError::NoExpedition);
    }
    embark::cancel(world, dock_id);
    Ok(())
}
