//! Depots: warehouse stock and idle workers.
//!
//! The depot is the supply side of the balance step and the place returned
//! goods and released workers land.  It also carries the bill of goods an
//! expedition from its dock must muster.

use rustc_hash::FxHashMap;

use cartage_core::{DepotId, HubId, RoleId, WareKindId};

use crate::world::World;

pub struct Depot {
    /// Hub this depot is attached to.
    pub hub: HubId,
    stock: FxHashMap<WareKindId, u32>,
    idle_workers: FxHashMap<RoleId, u32>,
    /// Goods an expedition mustered here must collect, per kind.
    pub expedition_bill: Vec<(WareKindId, u32)>,
    /// Worker roles an expedition mustered here must collect.
    pub expedition_roles: Vec<RoleId>,
}

impl Depot {
    /// An empty depot for `hub`.  [`create_depot`] is the normal entry
    /// point; this exists so persistence can rebuild depots in place.
    pub fn new(hub: HubId) -> Self {
        Self {
            hub,
            stock: FxHashMap::default(),
            idle_workers: FxHashMap::default(),
            expedition_bill: Vec::new(),
            expedition_roles: Vec::new(),
        }
    }

    pub fn stock(&self, kind: WareKindId) -> u32 {
        self.stock.get(&kind).copied().unwrap_or(0)
    }

    pub fn workers(&self, role: RoleId) -> u32 {
        self.idle_workers.get(&role).copied().unwrap_or(0)
    }

    pub fn add_stock(&mut self, kind: WareKindId, n: u32) {
        *self.stock.entry(kind).or_insert(0) += n;
    }

    /// Remove up to `n` units; returns how many were actually taken.
    pub fn take_stock(&mut self, kind: WareKindId, n: u32) -> u32 {
        let have = self.stock.entry(kind).or_insert(0);
        let taken = n.min(*have);
        *have -= taken;
        taken
    }

    pub fn add_worker(&mut self, role: RoleId, n: u32) {
        *self.idle_workers.entry(role).or_insert(0) += n;
    }

    pub fn take_worker(&mut self, role: RoleId, n: u32) -> u32 {
        let have = self.idle_workers.entry(role).or_insert(0);
        let taken = n.min(*have);
        *have -= taken;
        taken
    }

    /// Non-zero stock entries in ascending kind order (for persistence and
    /// deterministic reporting).
    pub fn stock_entries(&self) -> Vec<(WareKindId, u32)> {
        let mut entries: Vec<(WareKindId, u32)> =
            self.stock.iter().filter(|(_, &n)| n > 0).map(|(&k, &n)| (k, n)).collect();
        entries.sort_unstable();
        entries
    }

    /// Non-zero idle-worker entries in ascending role order.
    pub fn worker_entries(&self) -> Vec<(RoleId, u32)> {
        let mut entries: Vec<(RoleId, u32)> =
            self.idle_workers.iter().filter(|(_, &n)| n > 0).map(|(&r, &n)| (r, n)).collect();
        entries.sort_unstable();
        entries
    }
}

/// Attach a depot to `hub`.
///
/// # Panics
/// Panics if the hub already has one — a hub owns at most one store.
pub fn create_depot(world: &mut World, hub: HubId) -> DepotId {
    assert!(world.hub(hub).depot.is_none(), "{hub} already has a depot");
    let id = world.depots.insert(Depot::new(hub));
    world.hub_mut(hub).depot = Some(id);
    id
}

/// Detach and drop a depot.  Its contents vanish with it; queues and
/// requests that pointed here are the caller's concern.
pub fn destroy_depot(world: &mut World, id: DepotId) {
    if let Some(depot) = world.depots.remove(id) {
        if let Some(hub) = world.hubs.get_mut(depot.hub) {
            hub.depot = None;
        }
    }
}
