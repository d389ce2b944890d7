//! Ware instances and re-routing.

use log::trace;

use cartage_core::{AgentId, DockId, HubId, WareId, WareKindId};

use crate::router::{self, NextStep};
use crate::world::World;
use crate::{dock, hub};

/// Where a ware physically is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WareLocation {
    /// Resting on a hub.
    Hub(HubId),
    /// On a carrier's back.
    Carried(AgentId),
    /// Waiting at a dock for sea transport.
    Dock(DockId),
    /// Aboard a ship.
    Ship(AgentId),
}

/// A single good moving through the network.
pub struct Ware {
    pub kind: WareKindId,
    pub location: WareLocation,
    /// Final hub this ware wants to reach.  `None` = at rest, no routing.
    pub destination: Option<HubId>,
    /// Dispatch priority; higher wins when a carrier picks among pending
    /// wares.
    pub priority: i32,
}

/// Create a ware resting on `at` and route it toward `destination`.
///
/// The caller must have checked [`Hub::has_capacity`](crate::hub::Hub::has_capacity);
/// exceeding hub capacity is a defect, not a runtime condition.
pub fn spawn_ware(
    world: &mut World,
    kind: WareKindId,
    at: HubId,
    destination: Option<HubId>,
) -> WareId {
    let ware = world.wares.insert(Ware {
        kind,
        location: WareLocation::Hub(at),
        destination,
        priority: 0,
    });
    hub::add_ware(world, at, ware);
    ware
}

/// Re-evaluate a hub-resting ware's route and dispatch accordingly.
///
/// Called when the ware first lands on a hub and again whenever the network
/// changes shape.  Three outcomes:
///
/// - arrived: absorbed into the hub's depot (or left at rest);
/// - next hop over a lane: the hub calls a carrier;
/// - next hop is the local dock: the ware becomes a shipping item.
///
/// An unroutable destination leaves the ware resting unresolved — transient
/// unavailability, retried after the next structural change.
pub fn update_ware(world: &mut World, ware_id: WareId) {
    let ware = world.ware(ware_id);
    let WareLocation::Hub(at) = ware.location else {
        return; // carried / shipped wares are re-routed on arrival
    };
    let Some(dest) = ware.destination else {
        return;
    };

    if dest == at {
        arrive(world, ware_id, at);
        return;
    }

    match router::route_next_step(world, at, dest) {
        Some(NextStep::Lane { lane, to }) => {
            hub::call_carrier(world, at, ware_id, to, lane);
        }
        Some(NextStep::Dock(local_dock)) => {
            trace!("{ware_id}: over water via {local_dock}");
            hub::remove_ware(world, at, ware_id);
            dock::add_shipping_item(world, local_dock, dock::DockPayload::Ware(ware_id), None);
        }
        None => {
            trace!("{ware_id}: no route from {at} to {dest}, resting");
            hub::clear_dispatch(world, at, ware_id);
        }
    }
}

/// The ware reached its destination hub.
fn arrive(world: &mut World, ware_id: WareId, at: HubId) {
    if let Some(depot_id) = world.hub(at).depot {
        let kind = world.ware(ware_id).kind;
        hub::remove_ware(world, at, ware_id);
        world.wares.remove(ware_id);
        world.depot_mut(depot_id).add_stock(kind, 1);
        trace!("{ware_id}: absorbed into {depot_id}");
    } else {
        // Destination hub without storage: the ware rests here, done.
        hub::clear_dispatch(world, at, ware_id);
    }
}

/// Re-route every hub-resting ware.  Used after economy reassignment so
/// wares stranded by a missing link pick up new routes.
pub fn reroute_all_wares(world: &mut World) {
    let ids: Vec<WareId> = world
        .wares
        .iter()
        .filter(|(_, w)| matches!(w.location, WareLocation::Hub(_)))
        .map(|(id, _)| id)
        .collect();
    for id in ids {
        update_ware(world, id);
    }
}
