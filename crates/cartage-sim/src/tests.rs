//! End-to-end scenarios driven through the `Game` loop and commands.

use cartage_core::{Coord, HubId, Note, Registry, SimConfig, Tick, TuningConfig};
use cartage_economy::supply_queue::QueueOwner;
use cartage_economy::{depot, dock, fleet, hub, supply_queue, ware};
use cartage_path::GridMap;

use crate::command::Command;
use crate::game::Game;
use crate::observer::{NoopObserver, SimObserver};

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

fn game() -> Game {
    Game::new(map(), registry(), TuningConfig::default(), SimConfig { seed: 7 })
}

/// Collects notes and command outcomes for assertions.
#[derive(Default)]
struct Recorder {
    notes: Vec<Note>,
    rejected: Vec<Command>,
}

impl SimObserver for Recorder {
    fn on_note(&mut self, note: &Note) {
        self.notes.push(note.clone());
    }
    fn on_command(&mut self, command: &Command, accepted: bool) {
        if !accepted {
            self.rejected.push(command.clone());
        }
    }
}

/// A port hub with a stocked depot, a dock, and one ship.
fn build_port(game: &mut Game) -> (HubId, cartage_core::DepotId, cartage_core::DockId) {
    let world = &mut game.world;
    let log = world.registry.ware_by_name("log").unwrap();
    let plank = world.registry.ware_by_name("plank").unwrap();
    let builder = world.registry.role_by_name("builder").unwrap();

    let h = hub::create_hub(world, Coord::new(4, 11));
    let d = depot::create_depot(world, h);
    {
        let dep = world.depot_mut(d);
        dep.add_stock(log, 10);
        dep.add_stock(plank, 10);
        dep.add_worker(builder, 2);
        dep.expedition_bill = vec![(log, 2), (plank, 1)];
        dep.expedition_roles = vec![builder];
    }
    let dk = dock::create_dock(world, h, vec![Coord::new(4, 12)], d).unwrap();
    let fleet_id = world.dock(dk).fleet;
    fleet::create_ship(world, fleet_id, Coord::new(8, 13));
    (h, d, dk)
}

// ── Command plumbing ──────────────────────────────────────────────────────────

#[cfg(test)]
mod command_tests {
    use super::*;

    #[test]
    fn build_and_destroy_lane_via_commands() {
        let mut g = game();
        let a = hub::create_hub(&mut g.world, Coord::new(1, 1));
        let b = hub::create_hub(&mut g.world, Coord::new(6, 1));
        let carrier = g.world.registry.role_by_name("carrier").unwrap();

        g.submit_now(Command::BuildLane { a, b, carrier_role: carrier });
        g.run_for(100, &mut NoopObserver);
        assert_eq!(g.world.lanes.len(), 1);
        assert_eq!(g.world.economies.len(), 1, "lane joins the two economies");

        let lane = g.world.lanes.ids().next().unwrap();
        g.submit_now(Command::DestroyLane { lane });
        g.run_for(100, &mut NoopObserver);
        assert_eq!(g.world.lanes.len(), 0);
        assert_eq!(g.world.economies.len(), 2, "destroying the lane splits them again");
    }

    #[test]
    fn impossible_lane_is_rejected_not_fatal() {
        let mut g = game();
        // Hubs on opposite sides of a water wall: no walkable path.
        let a = hub::create_hub(&mut g.world, Coord::new(4, 4));
        let b = hub::create_hub(&mut g.world, Coord::new(30, 1));
        g.world.map.set_water_rect(Coord::new(16, 0), Coord::new(16, 15));
        let carrier = g.world.registry.role_by_name("carrier").unwrap();

        let mut rec = Recorder::default();
        g.submit_now(Command::BuildLane { a, b, carrier_role: carrier });
        g.run_for(100, &mut rec);
        assert_eq!(rec.rejected.len(), 1, "routing failure means 'not started'");
        assert_eq!(g.world.lanes.len(), 0);
    }

    #[test]
    fn set_target_fill_via_command() {
        let mut g = game();
        let a = hub::create_hub(&mut g.world, Coord::new(2, 2));
        let d = depot::create_depot(&mut g.world, a);
        let log = g.world.registry.ware_by_name("log").unwrap();
        let q = supply_queue::create_queue(&mut g.world, QueueOwner::Depot(d), a, log, 8, 0);
        assert!(!g.world.queues.get(q).unwrap().has_request());

        g.submit_now(Command::SetTargetFill { queue: q, target: 4 });
        g.run_for(100, &mut NoopObserver);
        assert!(g.world.queues.get(q).unwrap().has_request());
    }

    #[test]
    fn commands_apply_before_events_of_their_tick() {
        let mut g = game();
        let a = hub::create_hub(&mut g.world, Coord::new(1, 1));
        let b = hub::create_hub(&mut g.world, Coord::new(6, 1));
        let carrier = g.world.registry.role_by_name("carrier").unwrap();

        // The command sits in the future; nothing happens until its tick.
        g.submit(Tick(5_000), Command::BuildLane { a, b, carrier_role: carrier });
        g.run_until(Tick(4_999), &mut NoopObserver);
        assert_eq!(g.world.lanes.len(), 0);
        g.run_until(Tick(5_000), &mut NoopObserver);
        assert_eq!(g.world.lanes.len(), 1);
    }
}

// ── Expedition scenarios ──────────────────────────────────────────────────────

#[cfg(test)]
mod expedition_tests {
    use super::*;

    #[test]
    fn happy_path_one_handoff() {
        let mut g = game();
        let (_, _, dk) = build_port(&mut g);

        g.submit_now(Command::StartExpedition { dock: dk });
        g.run_for(300_000, &mut NoopObserver);

        // All three fulfillments arrived, the coordinator reported ready,
        // the empty ship took everything in one hand-off and left.
        assert!(g.world.dock(dk).embark.is_none(), "coordinator destroyed after hand-off");
        assert!(!g.world.dock(dk).embark_ready);
        let ship = g.world.fleets.iter().next().unwrap().1.ships[0];
        let cargo = &g.world.ship_data(ship).unwrap().cargo;
        assert_eq!(cargo.len(), 4, "2 + 1 goods and 1 worker aboard");
        assert_eq!(g.world.queues.len(), 0);
        assert_eq!(g.world.requests.len(), 0);
    }

    #[test]
    fn cancellation_returns_goods_and_notes() {
        let mut g = game();
        let (_, d, dk) = build_port(&mut g);
        let log = g.world.registry.ware_by_name("log").unwrap();
        let plank = g.world.registry.ware_by_name("plank").unwrap();
        let builder = g.world.registry.role_by_name("builder").unwrap();

        let mut rec = Recorder::default();
        g.submit_now(Command::StartExpedition { dock: dk });
        g.run_for(6_000, &mut rec);
        g.submit_now(Command::CancelExpedition { dock: dk });
        g.run_for(1_000, &mut rec);

        assert!(g.world.dock(dk).embark.is_none());
        assert_eq!(g.world.requests.len(), 0, "no dangling fulfillment requests");
        let depot = g.world.depots.get(d).unwrap();
        assert_eq!(depot.stock(log), 10);
        assert_eq!(depot.stock(plank), 10);
        assert_eq!(depot.workers(builder), 2);
        assert!(
            rec.notes.iter().any(|n| matches!(n, Note::EmbarkationCanceled { dock } if *dock == dk)),
            "cancellation published outward"
        );
    }

    #[test]
    fn double_start_is_rejected() {
        let mut g = game();
        let (_, _, dk) = build_port(&mut g);
        let mut rec = Recorder::default();
        g.submit_now(Command::StartExpedition { dock: dk });
        g.submit_now(Command::StartExpedition { dock: dk });
        g.run_for(1_000, &mut rec);
        assert_eq!(rec.rejected.len(), 1);
    }
}

// ── Cross-sea logistics ───────────────────────────────────────────────────────

#[cfg(test)]
mod sea_tests {
    use super::*;

    #[test]
    fn ware_routes_over_the_fleet_between_ports() {
        let mut g = game();
        let log = g.world.registry.ware_by_name("log").unwrap();

        let h1 = hub::create_hub(&mut g.world, Coord::new(2, 11));
        let d1 = depot::create_depot(&mut g.world, h1);
        let dk1 = dock::create_dock(&mut g.world, h1, vec![Coord::new(2, 12)], d1).unwrap();

        let h2 = hub::create_hub(&mut g.world, Coord::new(24, 11));
        let d2 = depot::create_depot(&mut g.world, h2);
        let _dk2 = dock::create_dock(&mut g.world, h2, vec![Coord::new(24, 12)], d2).unwrap();

        let fleet_id = g.world.dock(dk1).fleet;
        fleet::create_ship(&mut g.world, fleet_id, Coord::new(10, 13));

        ware::spawn_ware(&mut g.world, log, h1, Some(h2));
        g.run_for(400_000, &mut NoopObserver);

        assert_eq!(g.world.depots.get(d2).unwrap().stock(log), 1, "delivered across the sea");
        assert!(!g.world.dock(dk1).need_ship, "demand flag cleared after pickup");
    }
}

// ── Determinism ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod determinism_tests {
    use super::*;

    /// One full scenario: ports, lanes, an expedition, road carriage.
    fn scripted_run() -> Game {
        let mut g = game();
        let carrier = g.world.registry.role_by_name("carrier").unwrap();
        let log = g.world.registry.ware_by_name("log").unwrap();

        let (h_port, _, dk) = build_port(&mut g);
        let inland = hub::create_hub(&mut g.world, Coord::new(4, 3));
        let di = depot::create_depot(&mut g.world, inland);
        let carrier_role = carrier;
        g.world.depot_mut(di).add_worker(carrier_role, 2);

        g.submit(Tick(10), Command::BuildLane { a: inland, b: h_port, carrier_role: carrier });
        g.submit(Tick(2_000), Command::StartExpedition { dock: dk });
        g.run_for(50_000, &mut NoopObserver);

        ware::spawn_ware(&mut g.world, log, inland, Some(h_port));
        g.run_for(250_000, &mut NoopObserver);
        g
    }

    #[test]
    fn identical_runs_produce_identical_state() {
        let g1 = scripted_run();
        let g2 = scripted_run();
        let b1 = cartage_save::write_world(&g1.world).unwrap();
        let b2 = cartage_save::write_world(&g2.world).unwrap();
        assert_eq!(b1, b2, "same seed + same command log = bit-identical state");
    }
}
