//! Object saver/loader indirection tables.
//!
//! The saver walks every arena once, in slot order, handing each live
//! object a dense file index.  References are then translated through the
//! table: a stale handle simply has no entry and serializes as `None`.
//! The loader is the inverse: record index → the handle freshly created
//! for that record during reconstruction.

use rustc_hash::FxHashMap;

use cartage_core::{
    AgentId, DepotId, DockId, EconomyId, FleetId, HubId, LaneId, QueueId, RequestId, WareId,
};
use cartage_economy::World;

use crate::error::{SaveError, SaveResult};

/// Live handle → dense file index, one table per object family.
pub struct ObjectSaver {
    pub hubs: FxHashMap<HubId, u32>,
    pub lanes: FxHashMap<LaneId, u32>,
    pub depots: FxHashMap<DepotId, u32>,
    pub wares: FxHashMap<WareId, u32>,
    pub docks: FxHashMap<DockId, u32>,
    pub fleets: FxHashMap<FleetId, u32>,
    pub queues: FxHashMap<QueueId, u32>,
    pub requests: FxHashMap<RequestId, u32>,
    pub economies: FxHashMap<EconomyId, u32>,
    pub agents: FxHashMap<AgentId, u32>,
}

fn index_all<I: cartage_core::ids::ArenaId + std::hash::Hash + Eq>(
    ids: impl Iterator<Item = I>,
) -> FxHashMap<I, u32> {
    ids.enumerate().map(|(i, id)| (id, i as u32)).collect()
}

impl ObjectSaver {
    /// Pre-index every live object of `world`.
    pub fn new(world: &World) -> Self {
        Self {
            hubs: index_all(world.hubs.ids()),
            lanes: index_all(world.lanes.ids()),
            depots: index_all(world.depots.ids()),
            wares: index_all(world.wares.ids()),
            docks: index_all(world.docks.ids()),
            fleets: index_all(world.fleets.ids()),
            queues: index_all(world.queues.ids()),
            requests: index_all(world.requests.ids()),
            economies: index_all(world.economies.ids()),
            agents: index_all(world.agents.ids()),
        }
    }

    // Lookups return `None` for stale handles — the record then carries
    // "no object", mirroring what a resolver would see live.

    pub fn hub(&self, id: HubId) -> Option<u32> {
        self.hubs.get(&id).copied()
    }
    pub fn lane(&self, id: LaneId) -> Option<u32> {
        self.lanes.get(&id).copied()
    }
    pub fn depot(&self, id: DepotId) -> Option<u32> {
        self.depots.get(&id).copied()
    }
    pub fn ware(&self, id: WareId) -> Option<u32> {
        self.wares.get(&id).copied()
    }
    pub fn dock(&self, id: DockId) -> Option<u32> {
        self.docks.get(&id).copied()
    }
    pub fn fleet(&self, id: FleetId) -> Option<u32> {
        self.fleets.get(&id).copied()
    }
    pub fn queue(&self, id: QueueId) -> Option<u32> {
        self.queues.get(&id).copied()
    }
    pub fn request(&self, id: RequestId) -> Option<u32> {
        self.requests.get(&id).copied()
    }
    pub fn economy(&self, id: EconomyId) -> Option<u32> {
        self.economies.get(&id).copied()
    }
    pub fn agent(&self, id: AgentId) -> Option<u32> {
        self.agents.get(&id).copied()
    }
}

/// File index → freshly created handle, populated while the loader inserts
/// placeholder objects in record order.
#[derive(Default)]
pub struct ObjectLoader {
    pub hubs: Vec<HubId>,
    pub lanes: Vec<LaneId>,
    pub depots: Vec<DepotId>,
    pub wares: Vec<WareId>,
    pub docks: Vec<DockId>,
    pub fleets: Vec<FleetId>,
    pub queues: Vec<QueueId>,
    pub requests: Vec<RequestId>,
    pub economies: Vec<EconomyId>,
    pub agents: Vec<AgentId>,
}

fn resolve<I: Copy>(table: &[I], index: u32, what: &'static str) -> SaveResult<I> {
    table
        .get(index as usize)
        .copied()
        .ok_or(SaveError::MissingObject(what))
}

impl ObjectLoader {
    pub fn hub(&self, i: u32) -> SaveResult<HubId> {
        resolve(&self.hubs, i, "hub")
    }
    pub fn lane(&self, i: u32) -> SaveResult<LaneId> {
        resolve(&self.lanes, i, "lane")
    }
    pub fn depot(&self, i: u32) -> SaveResult<DepotId> {
        resolve(&self.depots, i, "depot")
    }
    pub fn ware(&self, i: u32) -> SaveResult<WareId> {
        resolve(&self.wares, i, "ware")
    }
    pub fn dock(&self, i: u32) -> SaveResult<DockId> {
        resolve(&self.docks, i, "dock")
    }
    pub fn fleet(&self, i: u32) -> SaveResult<FleetId> {
        resolve(&self.fleets, i, "fleet")
    }
    pub fn queue(&self, i: u32) -> SaveResult<QueueId> {
        resolve(&self.queues, i, "queue")
    }
    pub fn request(&self, i: u32) -> SaveResult<RequestId> {
        resolve(&self.requests, i, "request")
    }
    pub fn economy(&self, i: u32) -> SaveResult<EconomyId> {
        resolve(&self.economies, i, "economy")
    }
    pub fn agent(&self, i: u32) -> SaveResult<AgentId> {
        resolve(&self.agents, i, "agent")
    }
}
