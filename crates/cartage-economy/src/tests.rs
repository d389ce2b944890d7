//! Unit tests for the economy crate.
//!
//! Each test builds a small world, drives the timeline the same way the
//! sim loop does, and asserts on the resulting state.

use cartage_agent::{act, spawn};
use cartage_core::{Coord, HubId, Registry, RoleId, TuningConfig, WareKindId};
use cartage_path::GridMap;

use crate::ware::{Ware, WareLocation};
use crate::world::{dispatch_timer, Event, World};
use crate::{depot, dock, embark, fleet, hub, lane, supply_queue, tasks, ware};

// ── Harness ───────────────────────────────────────────────────────────────────

fn test_world() -> World {
    let mut registry = Registry::new();
    registry.add_ware("log");
    registry.add_ware("plank");
    registry.add_role("carrier");
    registry.add_role("builder");
    // 32×16, land everywhere except a water band along the south edge.
    let mut map = GridMap::all_land(32, 16, 1_800);
    map.set_water_rect(Coord::new(0, 12), Coord::new(31, 15));
    World::new(map, registry, TuningConfig::default(), 42)
}

fn kind(world: &World, name: &str) -> WareKindId {
    world.registry.ware_by_name(name).unwrap()
}

fn role(world: &World, name: &str) -> RoleId {
    world.registry.role_by_name(name).unwrap()
}

/// Drain the timeline for `ms` simulated milliseconds, exactly like the
/// sim loop: events in (tick, seq) order, clock advanced to each.
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

/// Two hubs five tiles apart, connected by a lane, with a stocked depot on
/// the first.
fn hub_pair_with_lane(world: &mut World) -> (HubId, HubId) {
    let a = hub::create_hub(world, Coord::new(1, 1));
    let b = hub::create_hub(world, Coord::new(6, 1));
    let d = depot::create_depot(world, a);
    let carrier = role(world, "carrier");
    world.depot_mut(d).add_worker(carrier, 4);
    lane::create_lane(world, a, b, carrier).unwrap();
    (a, b)
}

// ── Supply queue ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod supply_queue_tests {
    use super::*;
    use crate::supply_queue::QueueOwner;

    #[test]
    fn request_iff_below_target() {
        let mut world = test_world();
        let a = hub::create_hub(&mut world, Coord::new(2, 2));
        let d = depot::create_depot(&mut world, a);

        let log = kind(&world, "log");
        let q = supply_queue::create_queue(&mut world, QueueOwner::Depot(d), a, log, 8, 6);
        assert!(world.queues.get(q).unwrap().has_request(), "below target needs a request");

        supply_queue::set_target_fill(&mut world, q, 0);
        assert!(
            !world.queues.get(q).unwrap().has_request(),
            "at target, the request is withdrawn"
        );

        supply_queue::set_target_fill(&mut world, q, 3);
        assert!(world.queues.get(q).unwrap().has_request());
    }

    #[test]
    fn supply_convergence() {
        let mut world = test_world();
        let a = hub::create_hub(&mut world, Coord::new(2, 2));
        let d = depot::create_depot(&mut world, a);
        let log = kind(&world, "log");
        world.depot_mut(d).add_stock(log, 10);

        let q = supply_queue::create_queue(&mut world, QueueOwner::Depot(d), a, log, 8, 6);
        run_for(&mut world, 120_000);

        let queue = world.queues.get(q).unwrap();
        assert_eq!(queue.filled, 6, "six fulfillments arrive one at a time");
        assert!(!queue.has_request(), "at target, no outstanding request");
        assert_eq!(world.depots.get(d).unwrap().stock(log), 4);

        // A 7th external insertion beyond target succeeds up to max_size
        // without spawning a request.
        supply_queue::set_filled(&mut world, q, 7);
        assert_eq!(world.queues.get(q).unwrap().filled, 7);
        assert!(!world.queues.get(q).unwrap().has_request());
    }

    #[test]
    fn fill_invariant_holds_throughout() {
        let mut world = test_world();
        let a = hub::create_hub(&mut world, Coord::new(2, 2));
        let d = depot::create_depot(&mut world, a);
        let log = kind(&world, "log");
        world.depot_mut(d).add_stock(log, 3);

        let q = supply_queue::create_queue(&mut world, QueueOwner::Depot(d), a, log, 8, 6);
        // Step in small slices, checking the invariant at each boundary.
        for _ in 0..40 {
            run_for(&mut world, 1_000);
            let queue = world.queues.get(q).unwrap();
            assert!(queue.filled <= queue.max_size);
            let needs = queue.filled < queue.target_fill;
            assert_eq!(
                queue.has_request() && world.requests.contains(queue.request),
                needs,
                "request exists iff below target (filled {})",
                queue.filled
            );
        }
        // Stock ran dry at 3: the queue stays below target with its request
        // outstanding forever — transient unavailability, not an error.
        assert_eq!(world.queues.get(q).unwrap().filled, 3);
        assert!(world.queues.get(q).unwrap().has_request());
    }

    #[test]
    fn destroy_returns_goods_to_depot() {
        let mut world = test_world();
        let a = hub::create_hub(&mut world, Coord::new(2, 2));
        let d = depot::create_depot(&mut world, a);
        let log = kind(&world, "log");
        world.depot_mut(d).add_stock(log, 5);

        let q = supply_queue::create_queue(&mut world, QueueOwner::Depot(d), a, log, 8, 4);
        run_for(&mut world, 60_000);
        assert_eq!(world.queues.get(q).unwrap().filled, 4);
        assert_eq!(world.depots.get(d).unwrap().stock(log), 1);

        supply_queue::destroy_queue(&mut world, q);
        assert!(!world.queues.contains(q));
        assert_eq!(
            world.depots.get(d).unwrap().stock(log),
            5,
            "queue teardown returns stored goods"
        );
        // No dangling request either.
        assert_eq!(world.requests.len(), 0);
    }
}

// ── Hub ───────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod hub_tests {
    use super::*;

    #[test]
    fn capacity_backpressure_wakes_exactly_one() {
        let mut world = test_world();
        let a = hub::create_hub(&mut world, Coord::new(2, 2));
        let capacity = world.hub(a).capacity;
        let log = kind(&world, "log");
        for _ in 0..capacity {
            assert!(world.hub(a).has_capacity());
            ware::spawn_ware(&mut world, log, a, None);
        }
        assert!(!world.hub(a).has_capacity());

        let w1 = spawn(&mut world, Coord::new(2, 2), &tasks::IDLE);
        let w2 = spawn(&mut world, Coord::new(2, 2), &tasks::IDLE);
        run_for(&mut world, 100);
        hub::wait_for_capacity(&mut world, a, w1);
        hub::wait_for_capacity(&mut world, a, w2);

        let victim = world.hub(a).wares[0].ware;
        hub::remove_ware(&mut world, a, victim);
        world.wares.remove(victim);

        assert_eq!(world.agents.get(w1).unwrap().signal, "wakeup", "first waiter woken");
        assert!(!world.agents.get(w2).unwrap().has_signal(), "second waiter untouched");
        assert_eq!(world.hub(a).capacity_wait.len(), 1);
    }

    #[test]
    fn priority_dispatch_highest_first_fifo_ties() {
        let mut world = test_world();
        let (a, b) = hub_pair_with_lane(&mut world);
        let log = kind(&world, "log");

        // Three wares toward b: priorities 1, 5, 5.  The 5s tie; the first
        // inserted must win.
        let mut ids = Vec::new();
        for priority in [1, 5, 5] {
            let w = world.wares.insert(Ware {
                kind: log,
                location: WareLocation::Hub(a),
                destination: Some(b),
                priority,
            });
            hub::add_ware(&mut world, a, w);
            ids.push(w);
        }

        assert_eq!(hub::fetch_pending_ware(&mut world, a, b), Some(ids[1]));
        assert_eq!(hub::fetch_pending_ware(&mut world, a, b), Some(ids[2]));
        assert_eq!(hub::fetch_pending_ware(&mut world, a, b), Some(ids[0]));
        assert_eq!(hub::fetch_pending_ware(&mut world, a, b), None);
    }

    #[test]
    fn ack_and_cancel_pickup() {
        let mut world = test_world();
        let (a, b) = hub_pair_with_lane(&mut world);
        let log = kind(&world, "log");
        let w = world.wares.insert(Ware {
            kind: log,
            location: WareLocation::Hub(a),
            destination: Some(b),
            priority: 0,
        });
        hub::add_ware(&mut world, a, w);

        assert!(world.hub(a).has_pending_ware(b));
        assert!(world.hub_mut(a).ack_pickup(b));
        assert!(!world.hub(a).has_pending_ware(b), "acked ware is reserved");
        assert!(world.hub_mut(a).cancel_pickup(b));
        assert!(world.hub(a).has_pending_ware(b), "canceled pickup is pending again");
        assert!(!world.hub_mut(a).ack_pickup(HubId::INVALID));
    }

    #[test]
    fn hub_job_dispatches_worker_into_program() {
        let mut world = test_world();
        let a = hub::create_hub(&mut world, Coord::new(2, 2));
        let d = depot::create_depot(&mut world, a);
        let builder = role(&world, "builder");
        world.depot_mut(d).add_worker(builder, 1);

        hub::add_hub_job(&mut world, a, builder, tasks::IDLE_NAME);
        assert_eq!(world.hub(a).jobs.len(), 1);

        run_for(&mut world, 30_000);

        assert!(world.hub(a).jobs.is_empty(), "job removed after dispatch");
        assert_eq!(world.requests.len(), 0);
        // The worker now sits in the job's program.
        let parked = world
            .agents
            .iter()
            .any(|(_, a)| a.top_state().is_some_and(|s| s.task.name() == tasks::IDLE_NAME));
        assert!(parked, "worker runs the job program");
    }
}

// ── Lane / carriage ───────────────────────────────────────────────────────────

#[cfg(test)]
mod lane_tests {
    use super::*;

    #[test]
    fn carrier_slot_filled_via_request() {
        let mut world = test_world();
        let (_a, _b) = hub_pair_with_lane(&mut world);
        let lane_id = world.lanes.ids().next().unwrap();
        {
            let slot = &world.lane(lane_id).slots[0];
            assert!(slot.carrier.is_invalid() && !slot.request.is_invalid());
        }

        run_for(&mut world, 30_000);

        let slot = &world.lane(lane_id).slots[0];
        assert!(!slot.carrier.is_invalid(), "carrier assigned");
        assert!(slot.request.is_invalid(), "slot never holds both");
    }

    #[test]
    fn ware_is_ferried_across_the_lane() {
        let mut world = test_world();
        let (a, b) = hub_pair_with_lane(&mut world);
        let db = depot::create_depot(&mut world, b);
        let log = kind(&world, "log");

        // Let the carrier arrive and park first.
        run_for(&mut world, 60_000);

        ware::spawn_ware(&mut world, log, a, Some(b));
        run_for(&mut world, 120_000);

        assert_eq!(
            world.depots.get(db).unwrap().stock(log),
            1,
            "ware crossed the lane and was absorbed at its destination"
        );
        assert_eq!(world.wares.len(), 0);
        assert_eq!(world.hub(a).ware_count(), 0);
    }

    #[test]
    fn busyness_bumps_without_idle_carrier_and_decays() {
        let mut world = test_world();
        let (a, b) = hub_pair_with_lane(&mut world);
        let lane_id = world.lanes.ids().next().unwrap();
        // No balance has run yet, so no carrier is assigned.
        let log = kind(&world, "log");
        ware::spawn_ware(&mut world, log, a, Some(b));

        let now = world.clock.now();
        let decay = world.tuning.busyness_decay_ms;
        let busy = world.lane(lane_id).effective_busyness(now, decay);
        assert_eq!(busy, 1, "no idle carrier: busyness bumped");

        let later = now.offset(decay * 3);
        assert_eq!(world.lane(lane_id).effective_busyness(later, decay), 0, "decays to zero");
    }

    #[test]
    fn split_produces_two_lanes_and_one_component() {
        let mut world = test_world();
        let (a, b) = hub_pair_with_lane(&mut world);
        let lane_id = world.lanes.ids().next().unwrap();
        // Any interior tile of the actual path will do.
        let mid = world.lane(lane_id).path.step(1);

        let (mid_hub, l1, l2) = lane::split_lane(&mut world, lane_id, mid).unwrap();
        assert!(!world.lanes.contains(lane_id));
        assert_eq!(world.hub(mid_hub).pos, mid);
        assert_eq!(world.lane(l1).hubs, [a, mid_hub]);
        assert_eq!(world.lane(l2).hubs, [mid_hub, b]);
        assert_eq!(world.economies.len(), 1, "still one connected component");

        // Both new lanes ask for carriers.
        assert!(!world.lane(l1).slots[0].request.is_invalid());
        assert!(!world.lane(l2).slots[0].request.is_invalid());
    }
}

// ── Economies ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod economy_tests {
    use super::*;
    use crate::supply_queue::QueueOwner;

    #[test]
    fn destroying_a_lane_splits_the_economy() {
        let mut world = test_world();
        let (a, b) = hub_pair_with_lane(&mut world);
        assert_eq!(world.hub(a).economy, world.hub(b).economy);

        let lane_id = world.lanes.ids().next().unwrap();
        lane::destroy_lane(&mut world, lane_id);

        assert_ne!(world.hub(a).economy, world.hub(b).economy);
        assert_eq!(world.economies.len(), 2);
    }

    #[test]
    fn reassignment_moves_requests_without_canceling() {
        let mut world = test_world();
        let (a, b) = hub_pair_with_lane(&mut world);
        let db = depot::create_depot(&mut world, b);
        // A queue at b with nothing in stock: its request stays open.
        let plank = kind(&world, "plank");
        let q = supply_queue::create_queue(&mut world, QueueOwner::Depot(db), b, plank, 4, 2);
        let rid = world.queues.get(q).unwrap().request;
        assert!(world.requests.contains(rid));
        assert_eq!(world.requests.get(rid).unwrap().economy, world.hub(a).economy);

        let lane_id = world.lanes.ids().next().unwrap();
        lane::destroy_lane(&mut world, lane_id);

        assert!(world.requests.contains(rid), "reassignment never cancels");
        assert_eq!(
            world.requests.get(rid).unwrap().economy,
            world.hub(b).economy,
            "request followed its hub into the new economy"
        );

        // Re-connecting merges back into one economy, request intact.
        let carrier = role(&world, "carrier");
        lane::create_lane(&mut world, a, b, carrier).unwrap();
        assert!(world.requests.contains(rid));
        assert_eq!(world.hub(a).economy, world.hub(b).economy);
    }

    #[test]
    fn out_of_stock_noted_once() {
        let mut world = test_world();
        let a = hub::create_hub(&mut world, Coord::new(2, 2));
        let d = depot::create_depot(&mut world, a);
        let log = kind(&world, "log");
        supply_queue::create_queue(&mut world, QueueOwner::Depot(d), a, log, 4, 2);

        run_for(&mut world, 10_000);
        let starved = world
            .notes
            .drain()
            .into_iter()
            .filter(|n| matches!(n, cartage_core::Note::OutOfStock { .. }))
            .count();
        assert_eq!(starved, 1, "starvation is reported once, not every balance pass");
    }
}

// ── Docks / fleet ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod dock_tests {
    use super::*;

    /// A port: hub at the shore, depot, dock on the water band.
    fn port(world: &mut World, x: i16) -> (HubId, cartage_core::DepotId, cartage_core::DockId) {
        let h = hub::create_hub(world, Coord::new(x, 11));
        let d = depot::create_depot(world, h);
        let dk = dock::create_dock(world, h, vec![Coord::new(x, 12)], d).unwrap();
        (h, d, dk)
    }

    #[test]
    fn dock_positions_must_be_water() {
        let mut world = test_world();
        let h = hub::create_hub(&mut world, Coord::new(4, 4));
        let d = depot::create_depot(&mut world, h);
        let r = dock::create_dock(&mut world, h, vec![Coord::new(4, 5)], d);
        assert!(r.is_err(), "land tile rejected as mooring position");
    }

    #[test]
    fn water_reachable_docks_share_a_fleet() {
        let mut world = test_world();
        let (_, _, dk1) = port(&mut world, 2);
        let (_, _, dk2) = port(&mut world, 20);
        assert_eq!(world.dock(dk1).fleet, world.dock(dk2).fleet);
        assert_eq!(world.fleets.len(), 1);
        // Fleet links join the port economies too.
        let h1 = world.dock(dk1).hub;
        let h2 = world.dock(dk2).hub;
        assert_eq!(world.hub(h1).economy, world.hub(h2).economy);
    }

    #[test]
    fn need_ship_is_idempotent() {
        let mut world = test_world();
        let (_, _, dk) = port(&mut world, 2);
        let fleet_id = world.dock(dk).fleet;
        let ship = fleet::create_ship(&mut world, fleet_id, Coord::new(5, 13));
        run_for(&mut world, 100);
        assert!(world.ship_data(ship).unwrap().dest.is_none());

        dock::set_need_ship(&mut world, dk, true);
        assert_eq!(
            world.ship_data(ship).unwrap().dest,
            Some(dk),
            "the change triggered a fleet re-evaluation"
        );

        // Pretend the assignment never happened, then set the same value
        // again: no re-evaluation may occur.
        world.ship_data_mut(ship).unwrap().dest = None;
        dock::set_need_ship(&mut world, dk, true);
        assert_eq!(world.ship_data(ship).unwrap().dest, None, "same value is a no-op");

        dock::set_need_ship(&mut world, dk, false);
        dock::set_need_ship(&mut world, dk, true);
        assert_eq!(world.ship_data(ship).unwrap().dest, Some(dk), "real change re-evaluates");
    }

    #[test]
    fn ship_ferries_ware_between_ports() {
        let mut world = test_world();
        let (h1, _d1, _dk1) = port(&mut world, 2);
        let (h2, d2, _dk2) = port(&mut world, 20);
        let fleet_id = world.dock(world.hub(h1).dock.unwrap()).fleet;
        fleet::create_ship(&mut world, fleet_id, Coord::new(5, 13));

        // A ware at port 1 destined for port 2's hub: the only route is by
        // sea, so it becomes a shipping item, sails, and lands in port 2's
        // depot.
        let log = kind(&world, "log");
        ware::spawn_ware(&mut world, log, h1, Some(h2));
        run_for(&mut world, 300_000);

        assert_eq!(world.depots.get(d2).unwrap().stock(log), 1, "ware crossed the sea");
        assert_eq!(world.dock(world.hub(h1).dock.unwrap()).count_waiting(), 0);
        assert!(!world.dock(world.hub(h1).dock.unwrap()).need_ship);
    }

    #[test]
    fn unreachable_destination_returns_to_depot() {
        let mut world = test_world();
        let (h1, d1, dk1) = port(&mut world, 2);
        // No second dock exists: the ware cannot go anywhere by sea.
        let log = kind(&world, "log");
        let far = hub::create_hub(&mut world, Coord::new(30, 1));
        ware::spawn_ware(&mut world, log, h1, Some(far));
        // Routing found no road and no fleet link, so the ware rests at h1
        // unresolved rather than becoming a shipping item.
        assert_eq!(world.hub(h1).ware_count(), 1);
        assert_eq!(world.dock(dk1).count_waiting(), 0);

        // Force it into the dock pipeline, then invalidate the destination:
        // the refresh returns it to the depot.
        let ware_id = world.hub(h1).wares[0].ware;
        hub::remove_ware(&mut world, h1, ware_id);
        world.dock_mut(dk1).waiting.push(dock::ShippingItem {
            payload: dock::DockPayload::Ware(ware_id),
            destination: None,
        });
        dock::refresh_waiting(&mut world, dk1);
        assert_eq!(world.dock(dk1).count_waiting(), 0);
        assert_eq!(world.depots.get(d1).unwrap().stock(log), 1);
    }
}

// ── Embarkation ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod embark_tests {
    use super::*;

    fn expedition_port(world: &mut World) -> (HubId, cartage_core::DepotId, cartage_core::DockId) {
        let h = hub::create_hub(world, Coord::new(2, 11));
        let d = depot::create_depot(world, h);
        let log = kind(world, "log");
        let plank = kind(world, "plank");
        let builder = role(world, "builder");
        {
            let depot = world.depot_mut(d);
            depot.add_stock(log, 10);
            depot.add_stock(plank, 10);
            depot.add_worker(builder, 2);
            depot.expedition_bill = vec![(log, 2), (plank, 1)];
            depot.expedition_roles = vec![builder];
        }
        let dk = dock::create_dock(world, h, vec![Coord::new(2, 12)], d).unwrap();
        (h, d, dk)
    }

    #[test]
    fn becomes_ready_when_fully_supplied() {
        let mut world = test_world();
        let (_, _, dk) = expedition_port(&mut world);

        dock::start_expedition(&mut world, dk).unwrap();
        assert!(world.dock(dk).embark.is_some());
        assert!(!world.dock(dk).embark_ready);

        run_for(&mut world, 120_000);
        assert!(world.dock(dk).embark_ready, "2 goods + 1 worker mustered");
    }

    #[test]
    fn empty_ship_takes_everything_in_one_handoff() {
        let mut world = test_world();
        let (_, _, dk) = expedition_port(&mut world);
        dock::start_expedition(&mut world, dk).unwrap();
        run_for(&mut world, 120_000);
        assert!(world.dock(dk).embark_ready);

        let fleet_id = world.dock(dk).fleet;
        let ship = fleet::create_ship(&mut world, fleet_id, Coord::new(6, 13));
        run_for(&mut world, 120_000);

        assert!(world.dock(dk).embark.is_none(), "coordinator destroyed after hand-off");
        assert!(!world.dock(dk).embark_ready);
        let cargo = &world.ship_data(ship).unwrap().cargo;
        assert_eq!(cargo.len(), 4, "2 logs + 1 plank + 1 builder aboard");
        // The ship is out on its voyage now.
        let top = world.agents.get(ship).unwrap().top_state().unwrap();
        assert_eq!(top.task.name(), tasks::VOYAGE_NAME);
        assert_eq!(world.queues.len(), 0, "expedition queues torn down");
    }

    #[test]
    fn cancel_returns_everything_and_leaves_no_requests() {
        let mut world = test_world();
        let (_, d, dk) = expedition_port(&mut world);
        let log = kind(&world, "log");
        let plank = kind(&world, "plank");
        let builder = role(&world, "builder");

        dock::start_expedition(&mut world, dk).unwrap();
        // Partially accumulate, then abort.
        run_for(&mut world, 8_000);
        dock::cancel_expedition(&mut world, dk).unwrap();

        assert!(world.dock(dk).embark.is_none());
        assert_eq!(world.requests.len(), 0, "no dangling fulfillment requests");
        assert_eq!(world.queues.len(), 0);
        let depot = world.depots.get(d).unwrap();
        assert_eq!(depot.stock(log), 10, "all goods back in the depot");
        assert_eq!(depot.stock(plank), 10);
        assert_eq!(depot.workers(builder), 2, "workers released back");

        let canceled = world
            .notes
            .drain()
            .iter()
            .filter(|n| matches!(n, cartage_core::Note::EmbarkationCanceled { .. }))
            .count();
        assert_eq!(canceled, 1);
    }

    #[test]
    fn cancel_without_expedition_is_an_error() {
        let mut world = test_world();
        let (_, _, dk) = expedition_port(&mut world);
        assert!(dock::cancel_expedition(&mut world, dk).is_err());
        dock::start_expedition(&mut world, dk).unwrap();
        assert!(dock::start_expedition(&mut world, dk).is_err(), "one at a time");
    }
}

// ── Embark readiness plumbing ─────────────────────────────────────────────────

#[cfg(test)]
mod readiness_tests {
    use super::*;

    #[test]
    fn empty_bill_is_ready_immediately() {
        let mut world = test_world();
        let h = hub::create_hub(&mut world, Coord::new(2, 11));
        let d = depot::create_depot(&mut world, h);
        let dk = dock::create_dock(&mut world, h, vec![Coord::new(2, 12)], d).unwrap();
        embark::start(&mut world, dk);
        assert!(world.dock(dk).embark_ready, "nothing to collect");
    }
}
