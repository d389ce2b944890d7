//! Round-trip tests: write → read → the observable state is identical, and
//! the loaded world keeps simulating.

use cartage_agent::act;
use cartage_core::{Coord, Registry, TuningConfig};
use cartage_economy::supply_queue::QueueOwner;
use cartage_economy::world::{dispatch_timer, Event};
use cartage_economy::{depot, dock, fleet, hub, lane, supply_queue, ware, World};
use cartage_path::GridMap;

use crate::world_io::{read_world, write_world, FORMAT_VERSION};
use crate::SaveError;

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn registry() -> Registry {
    let mut reg = Registry::new();
    reg.add_ware("log");
    reg.add_ware("plank");
    reg.add_role("carrier");
    reg.add_role("builder");
    reg
}

fn map() -> GridMap {
    let mut map = GridMap::all_land(32, 16, 1_800);
    map.set_water_rect(Coord::new(0, 12), Coord::new(31, 15));
    map
}

fn fresh_world() -> World {
    World::new(map(), registry(), TuningConfig::default(), 42)
}

fn run_for(world: &mut World, ms: u64) {
    let until = world.clock.now().offset(ms);
    while let Some((tick, event)) = world.timeline.pop_due(until) {
        world.clock.advance_to(tick);
        match event {
            Event::Act { agent, gen } => act(world, agent, gen),
            Event::Timer(timer) => dispatch_timer(world, timer),
        }
    }
    world.clock.advance_to(until);
}

/// A world with some of everything: lanes with carriers, a mid-flight
/// supply queue, a port with a mustering expedition and a ship.
fn busy_world() -> World {
    let mut world = fresh_world();
    let log = world.registry.ware_by_name("log").unwrap();
    let plank = world.registry.ware_by_name("plank").unwrap();
    let carrier = world.registry.role_by_name("carrier").unwrap();
    let builder = world.registry.role_by_name("builder").unwrap();

    let a = hub::create_hub(&mut world, Coord::new(1, 1));
    let b = hub::create_hub(&mut world, Coord::new(6, 1));
    let da = depot::create_depot(&mut world, a);
    {
        let d = world.depot_mut(da);
        d.add_stock(log, 8);
        d.add_stock(plank, 4);
        d.add_worker(carrier, 3);
        d.add_worker(builder, 2);
    }
    lane::create_lane(&mut world, a, b, carrier).unwrap();

    let port_hub = hub::create_hub(&mut world, Coord::new(10, 11));
    let port_depot = depot::create_depot(&mut world, port_hub);
    {
        let d = world.depot_mut(port_depot);
        d.add_stock(log, 6);
        d.add_worker(builder, 1);
        d.expedition_bill = vec![(log, 2)];
        d.expedition_roles = vec![builder];
    }
    let dk = dock::create_dock(&mut world, port_hub, vec![Coord::new(10, 12)], port_depot).unwrap();
    let fleet_id = world.dock(dk).fleet;
    fleet::create_ship(&mut world, fleet_id, Coord::new(14, 13));

    supply_queue::create_queue(&mut world, QueueOwner::Depot(da), a, plank, 8, 3);
    dock::start_expedition(&mut world, dk).unwrap();
    ware::spawn_ware(&mut world, log, a, Some(b));

    // Let everything get properly mid-flight: carriers assigned, queues
    // part-filled, couriers walking.
    run_for(&mut world, 15_000);
    world
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn roundtrip_is_byte_stable() {
    let world = busy_world();
    let bytes = write_world(&world).unwrap();
    let loaded = read_world(&bytes, map(), registry(), TuningConfig::default(), 42).unwrap();
    let bytes2 = write_world(&loaded).unwrap();
    assert_eq!(bytes, bytes2, "write(read(write(w))) must be byte-identical");
}

#[test]
fn roundtrip_preserves_observable_state() {
    let world = busy_world();
    let bytes = write_world(&world).unwrap();
    let loaded = read_world(&bytes, map(), registry(), TuningConfig::default(), 42).unwrap();

    assert_eq!(loaded.clock.now(), world.clock.now());
    assert_eq!(loaded.hubs.len(), world.hubs.len());
    assert_eq!(loaded.lanes.len(), world.lanes.len());
    assert_eq!(loaded.agents.len(), world.agents.len());
    assert_eq!(loaded.requests.len(), world.requests.len());
    assert_eq!(loaded.timeline.len(), world.timeline.len());

    // Queue fills and request presence.
    let queues: Vec<_> = world.queues.iter().map(|(_, q)| (q.filled, q.has_request())).collect();
    let loaded_queues: Vec<_> =
        loaded.queues.iter().map(|(_, q)| (q.filled, q.has_request())).collect();
    assert_eq!(queues, loaded_queues);

    // Carrier-slot occupancy.
    let slots = |w: &World| -> Vec<(bool, bool)> {
        w.lanes
            .iter()
            .flat_map(|(_, l)| {
                l.slots
                    .iter()
                    .map(|s| (!s.carrier.is_invalid(), !s.request.is_invalid()))
                    .collect::<Vec<_>>()
            })
            .collect()
    };
    assert_eq!(slots(&world), slots(&loaded));

    // Task stacks by name.
    let stacks = |w: &World| -> Vec<Vec<String>> {
        w.agents
            .iter()
            .map(|(_, a)| a.stack.iter().map(|s| s.task.name().to_string()).collect())
            .collect()
    };
    assert_eq!(stacks(&world), stacks(&loaded));

    // Dock flags and expedition progress.
    let dock_state = |w: &World| -> Vec<(bool, usize, bool, bool)> {
        w.docks
            .iter()
            .map(|(_, d)| (d.need_ship, d.waiting.len(), d.embark.is_some(), d.embark_ready))
            .collect()
    };
    assert_eq!(dock_state(&world), dock_state(&loaded));
}

#[test]
fn loaded_world_keeps_simulating() {
    let mut world = busy_world();
    let bytes = write_world(&world).unwrap();
    let mut loaded = read_world(&bytes, map(), registry(), TuningConfig::default(), 42).unwrap();

    // Drive both for the same span: the supply queue converges in both.
    run_for(&mut world, 120_000);
    run_for(&mut loaded, 120_000);

    let fills = |w: &World| -> Vec<u32> { w.queues.iter().map(|(_, q)| q.filled).collect() };
    assert_eq!(fills(&world), fills(&loaded), "loaded world evolves like the original");

    let ready = |w: &World| -> Vec<bool> { w.docks.iter().map(|(_, d)| d.embark_ready).collect() };
    assert_eq!(ready(&world), ready(&loaded));
}

#[test]
fn unknown_version_is_rejected() {
    let world = fresh_world();
    let mut bytes = write_world(&world).unwrap();
    // The version byte leads the record.
    bytes[0] = FORMAT_VERSION + 1;
    let result = read_world(&bytes, map(), registry(), TuningConfig::default(), 42);
    assert!(matches!(result, Err(SaveError::Version { .. })));
}

#[test]
fn unknown_kind_aborts_load() {
    let mut world = fresh_world();
    let log = world.registry.ware_by_name("log").unwrap();
    let h = hub::create_hub(&mut world, Coord::new(1, 1));
    ware::spawn_ware(&mut world, log, h, None);
    let bytes = write_world(&world).unwrap();

    // A registry missing the saved kind cannot resolve the reference.
    let empty = Registry::new();
    let result = read_world(&bytes, map(), empty, TuningConfig::default(), 42);
    assert!(matches!(result, Err(SaveError::UnknownKind(_))));
}

#[test]
fn garbage_fails_to_decode() {
    let result = read_world(&[1, 2, 3, 4], map(), registry(), TuningConfig::default(), 42);
    assert!(matches!(result, Err(SaveError::Decode(_))));
}

#[test]
fn survives_a_trip_through_disk() {
    let world = busy_world();
    let bytes = write_world(&world).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cartage.sav");
    std::fs::write(&path, &bytes).unwrap();
    let from_disk = std::fs::read(&path).unwrap();

    let loaded = read_world(&from_disk, map(), registry(), TuningConfig::default(), 42).unwrap();
    assert_eq!(loaded.hubs.len(), world.hubs.len());
    assert_eq!(write_world(&loaded).unwrap(), bytes);
}
