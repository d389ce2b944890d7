//! Supply queues: per-owner, per-good micro-stores with a target fill.
//!
//! A queue keeps at most one fulfillment request outstanding, re-issued on
//! every state change while the fill is below target and canceled the
//! moment it is not.  Each fulfillment delivers exactly one unit, so the
//! invariant is easy to state: a request exists iff `filled < target`.

use log::trace;

use cartage_core::{DepotId, DockId, HubId, QueueId, RequestId, WareKindId};

use crate::embark;
use crate::request::{self, RequestKind, RequestRole};
use crate::world::World;

/// Who owns a queue (and receives its goods back on teardown).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum QueueOwner {
    /// An embarkation mustering goods at a dock.
    Embark(DockId),
    /// A depot stocking itself directly.
    Depot(DepotId),
}

pub struct SupplyQueue {
    pub owner: QueueOwner,
    /// Hub deliveries arrive at.
    pub hub: HubId,
    pub kind: WareKindId,
    /// Store capacity.
    pub max_size: u32,
    /// Desired fill level, `<= max_size`.
    pub target_fill: u32,
    pub filled: u32,
    /// The outstanding request, or `INVALID` when none.
    pub request: RequestId,
}

impl SupplyQueue {
    /// `true` when the queue is at (or beyond) its target.
    pub fn satisfied(&self) -> bool {
        self.filled >= self.target_fill
    }

    pub fn has_request(&self) -> bool {
        !self.request.is_invalid()
    }
}

/// Create a queue and immediately evaluate it (issuing the first request
/// if the target is above zero).
pub fn create_queue(
    world: &mut World,
    owner: QueueOwner,
    hub: HubId,
    kind: WareKindId,
    max_size: u32,
    target_fill: u32,
) -> QueueId {
    assert!(target_fill <= max_size, "target_fill exceeds max_size");
    let id = world.queues.insert(SupplyQueue {
        owner,
        hub,
        kind,
        max_size,
        target_fill,
        filled: 0,
        request: RequestId::INVALID,
    });
    update_queue(world, id);
    id
}

/// Re-evaluate the request invariant after any state change.
pub fn update_queue(world: &mut World, id: QueueId) {
    let Some(q) = world.queues.get(id) else {
        return;
    };
    let (hub, kind) = (q.hub, q.kind);
    let below = q.filled < q.target_fill;
    let has_request = q.has_request() && world.requests.contains(q.request);

    if below && !has_request {
        let request = request::create_request(
            world,
            RequestKind::Ware(kind),
            hub,
            RequestRole::SupplyQueue { queue: id },
        );
        world.queues.get_mut(id).expect("checked above").request = request;
        trace!("{id}: below target, request {request} issued");
    } else if !below && has_request {
        let request = q.request;
        world.queues.get_mut(id).expect("checked above").request = RequestId::INVALID;
        request::cancel_request(world, request);
        trace!("{id}: at target, request withdrawn");
    } else if !has_request {
        // A canceled request may leave a stale id behind.
        world.queues.get_mut(id).expect("checked above").request = RequestId::INVALID;
    }
}

/// One unit arrived via the queue's request.  Invoked by the delivery path
/// after the request object is already closed.
pub fn on_ware_arrived(world: &mut World, id: QueueId) {
    let Some(q) = world.queues.get_mut(id) else {
        return; // owner torn down while the delivery traveled
    };
    q.request = RequestId::INVALID;
    q.filled = (q.filled + 1).min(q.max_size);
    let owner = q.owner;
    trace!("{id}: arrival, filled {}/{}", q.filled, q.target_fill);

    // Owner callback first (it may check "am I fully supplied"), then the
    // invariant re-evaluation.
    if let QueueOwner::Embark(dock_id) = owner {
        embark::check_ready(world, dock_id);
    }
    update_queue(world, id);
}

/// Externally set the fill level (e.g. direct insertion past the target).
/// Never creates goods from nothing at the callers' level of abstraction —
/// they are accountable for what they insert.
pub fn set_filled(world: &mut World, id: QueueId, filled: u32) {
    let q = world.queues.get_mut(id).unwrap_or_else(|| panic!("unknown queue {id}"));
    assert!(filled <= q.max_size, "fill beyond max_size");
    q.filled = filled;
    update_queue(world, id);
}

/// Adjust the store capacity.  Shrinking below the current fill does not
/// discard goods already stored; the target is clamped to the new size.
pub fn set_max_fill(world: &mut World, id: QueueId, max_size: u32) {
    let q = world.queues.get_mut(id).unwrap_or_else(|| panic!("unknown queue {id}"));
    q.max_size = max_size;
    q.target_fill = q.target_fill.min(max_size);
    update_queue(world, id);
}

/// Adjust the desired fill level (clamped to the capacity).
pub fn set_target_fill(world: &mut World, id: QueueId, target_fill: u32) {
    let q = world.queues.get_mut(id).unwrap_or_else(|| panic!("unknown queue {id}"));
    q.target_fill = target_fill.min(q.max_size);
    update_queue(world, id);
}

/// Tear a queue down: the outstanding request is canceled and stored goods
/// go back to the owner's depot.
pub fn destroy_queue(world: &mut World, id: QueueId) {
    let Some(q) = world.queues.remove(id) else {
        return;
    };
    if q.has_request() {
        request::cancel_request(world, q.request);
    }
    if q.filled > 0 {
        let depot_id = match q.owner {
            QueueOwner::Depot(d) => Some(d),
            QueueOwner::Embark(dock_id) => world.docks.get(dock_id).map(|d| d.depot),
        };
        if let Some(d) = depot_id {
            if let Some(depot) = world.depots.get_mut(d) {
                depot.add_stock(q.kind, q.filled);
            }
        }
    }
    trace!("{id}: destroyed");
}

/// Take everything out of the queue without a depot return (ship handover).
pub fn drain_for_handover(world: &mut World, id: QueueId) -> (WareKindId, u32) {
    let q = world.queues.get_mut(id).unwrap_or_else(|| panic!("unknown queue {id}"));
    let out = (q.kind, q.filled);
    q.filled = 0;
    out
}
