//! Fleets: ship pools serving a set of docks.
//!
//! A fleet is the maritime counterpart of the lane network: docks register
//! demand (`need_ship`, a ready expedition) and `update` pairs it with idle
//! ships.  Updates are cheap and idempotent, so every state change that
//! could affect pairing simply calls `update` again.

use log::{debug, trace};

use cartage_agent::{schedule_act, spawn};
use cartage_core::{AgentId, Coord, DockId, FleetId};
use cartage_path::{find_path, Movecaps, TileMap};

use crate::world::{AgentData, ShipData, World};
use crate::tasks;

pub struct Fleet {
    /// Member ships in admission order.
    pub ships: Vec<AgentId>,
    /// Served docks in admission order.
    pub docks: Vec<DockId>,
}

/// Found a fleet containing just `dock`.
pub fn create_fleet(world: &mut World, dock: DockId) -> FleetId {
    world.fleets.insert(Fleet { ships: Vec::new(), docks: vec![dock] })
}

/// Build a ship at `pos` (a water tile) and add it to the fleet.
pub fn create_ship(world: &mut World, fleet_id: FleetId, pos: Coord) -> AgentId {
    assert!(world.map.passable(pos, Movecaps::Swim), "ship spawned on dry land at {pos}");
    let capacity = world.tuning.ship_capacity;
    let ship = spawn(world, pos, &tasks::SHIP_WORK);
    world.agent_data.insert(
        ship,
        AgentData::Ship(ShipData {
            fleet: fleet_id,
            capacity,
            cargo: Vec::new(),
            dest: None,
            expedition: false,
        }),
    );
    world.fleet_mut(fleet_id).ships.push(ship);
    debug!("{fleet_id}: ship {ship} launched at {pos}");
    update(world, fleet_id);
    ship
}

/// Merge every fleet whose docks are water-reachable from `fleet_id`'s
/// docks into it.  Ships and docks transfer wholesale; the loser fleet is
/// dissolved.
pub fn merge_reachable_fleets(world: &mut World, fleet_id: FleetId) {
    let my_docks = world.fleet_mut(fleet_id).docks.clone();
    let Some(&my_dock) = my_docks.first() else {
        return;
    };
    let my_pos = world.dock(my_dock).positions[0];

    let other_fleets: Vec<FleetId> =
        world.fleets.ids().filter(|f| *f != fleet_id).collect();
    for other in other_fleets {
        let Some(&other_dock) = world.fleets.get(other).and_then(|f| f.docks.first()) else {
            continue;
        };
        let other_pos = world.dock(other_dock).positions[0];
        let reachable =
            find_path(&world.map, my_pos, other_pos, 0, Movecaps::Swim, |_| false).is_ok();
        if reachable {
            absorb(world, fleet_id, other);
        }
    }
}

fn absorb(world: &mut World, winner: FleetId, loser: FleetId) {
    let Some(loser_fleet) = world.fleets.remove(loser) else {
        return;
    };
    debug!("{winner}: absorbing {loser}");
    for dock in &loser_fleet.docks {
        if let Some(d) = world.docks.get_mut(*dock) {
            d.fleet = winner;
        }
    }
    for ship in &loser_fleet.ships {
        if let Some(s) = world.ship_data_mut(*ship) {
            s.fleet = winner;
        }
    }
    let w = world.fleet_mut(winner);
    w.docks.extend(loser_fleet.docks);
    w.ships.extend(loser_fleet.ships);
}

/// Drop a dock from its fleet; an empty fleet dissolves.
pub fn remove_dock(world: &mut World, fleet_id: FleetId, dock: DockId) {
    let Some(fleet) = world.fleets.get_mut(fleet_id) else {
        return;
    };
    fleet.docks.retain(|d| *d != dock);
    if fleet.docks.is_empty() && fleet.ships.is_empty() {
        world.fleets.remove(fleet_id);
    } else {
        update(world, fleet_id);
    }
}

/// Re-evaluate ship/dock pairing.
///
/// 1. A ship with cargo heads for its first cargo item's destination.
/// 2. Idle, empty ships are assigned to docks asking for service
///    (`need_ship` or a ready expedition), in dock order.
///
/// Ships that received a destination are woken; the pairing itself never
/// moves anyone, so calling this redundantly is harmless.
pub fn update(world: &mut World, fleet_id: FleetId) {
    let Some(fleet) = world.fleets.get(fleet_id) else {
        return;
    };
    let ships = fleet.ships.clone();
    let docks = fleet.docks.clone();

    // Cargo first: deliveries beat new pickups.
    for &ship in &ships {
        let Some(data) = world.ship_data(ship) else {
            continue;
        };
        if data.dest.is_none() {
            if let Some(dest) = data.cargo.iter().find_map(|i| i.destination) {
                world.ship_data_mut(ship).expect("just read").dest = Some(dest);
                trace!("{fleet_id}: {ship} carries cargo for {dest}");
                schedule_act(world, ship, 10);
            }
        }
    }

    // Then service calls.
    let mut needy: Vec<DockId> = docks
        .iter()
        .copied()
        .filter(|&d| {
            world
                .docks
                .get(d)
                .is_some_and(|dock| dock.need_ship || dock.embark_ready)
        })
        .collect();
    for &ship in &ships {
        if needy.is_empty() {
            break;
        }
        let idle = world
            .ship_data(ship)
            .is_some_and(|s| s.dest.is_none() && s.cargo.is_empty());
        if !idle {
            continue;
        }
        let dock = needy.remove(0);
        world.ship_data_mut(ship).expect("just read").dest = Some(dock);
        trace!("{fleet_id}: {ship} assigned to service {dock}");
        schedule_act(world, ship, 10);
    }
}
