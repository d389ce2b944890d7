//! Unit tests for cartage-core primitives.

#[cfg(test)]
mod ids {
    use crate::{AgentId, HubId, WareKindId};

    #[test]
    fn invalid_sentinels() {
        assert!(AgentId::INVALID.is_invalid());
        assert!(AgentId::default().is_invalid());
        assert_eq!(WareKindId::INVALID.0, u16::MAX);
    }

    #[test]
    fn erase_roundtrip() {
        let id = HubId { slot: 3, gen: 7 };
        assert_eq!(HubId::from_any(id.erase()), id);
    }

    #[test]
    fn ordering_by_slot_then_gen() {
        assert!(AgentId { slot: 0, gen: 5 } < AgentId { slot: 1, gen: 0 });
        assert!(AgentId { slot: 2, gen: 0 } < AgentId { slot: 2, gen: 1 });
    }

    #[test]
    fn display() {
        assert_eq!(HubId { slot: 4, gen: 2 }.to_string(), "HubId(4v2)");
        assert_eq!(HubId::INVALID.to_string(), "HubId(-)");
    }
}

#[cfg(test)]
mod arena {
    use crate::{Arena, HubId};

    #[test]
    fn insert_get_remove() {
        let mut arena: Arena<HubId, &str> = Arena::new();
        let a = arena.insert("a");
        let b = arena.insert("b");
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(a), Some(&"a"));
        assert_eq!(arena.remove(a), Some("a"));
        assert_eq!(arena.get(a), None, "removed handle must be stale");
        assert_eq!(arena.get(b), Some(&"b"));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn slot_reuse_invalidates_old_handle() {
        let mut arena: Arena<HubId, u32> = Arena::new();
        let a = arena.insert(1);
        arena.remove(a);
        let b = arena.insert(2);
        // Same slot, new generation.
        assert_eq!(b.slot, a.slot);
        assert_ne!(b.gen, a.gen);
        assert_eq!(arena.get(a), None);
        assert_eq!(arena.get(b), Some(&2));
    }

    #[test]
    fn double_remove_is_none() {
        let mut arena: Arena<HubId, u32> = Arena::new();
        let a = arena.insert(1);
        assert_eq!(arena.remove(a), Some(1));
        assert_eq!(arena.remove(a), None);
    }

    #[test]
    fn iteration_in_slot_order() {
        let mut arena: Arena<HubId, u32> = Arena::new();
        let a = arena.insert(10);
        let _b = arena.insert(20);
        let c = arena.insert(30);
        arena.remove(a);
        let values: Vec<u32> = arena.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![20, 30]);
        let ids: Vec<HubId> = arena.ids().collect();
        assert_eq!(ids[1], c);
    }
}

#[cfg(test)]
mod time {
    use crate::{GameClock, Tick};

    #[test]
    fn tick_arithmetic() {
        let t = Tick(10);
        assert_eq!(t + 5, Tick(15));
        assert_eq!(t.offset(3), Tick(13));
        assert_eq!(Tick(15) - Tick(10), 5u64);
        assert_eq!(Tick(10).since(Tick(15)), 0, "since saturates");
    }

    #[test]
    fn clock_advances() {
        let mut clock = GameClock::new();
        clock.advance_to(Tick(500));
        assert_eq!(clock.now(), Tick(500));
        clock.advance_to(Tick(500)); // same tick is fine
    }

    #[test]
    #[should_panic(expected = "clock moved backwards")]
    fn clock_regression_panics() {
        let mut clock = GameClock::new();
        clock.advance_to(Tick(500));
        clock.advance_to(Tick(499));
    }

    #[test]
    fn hms() {
        let mut clock = GameClock::new();
        clock.advance_to(Tick(3_661_000)); // 1h 1m 1s
        assert_eq!(clock.hms(), (1, 1, 1));
    }
}

#[cfg(test)]
mod rng {
    use crate::SimRng;

    #[test]
    fn deterministic_same_seed() {
        let mut r1 = SimRng::new(12345);
        let mut r2 = SimRng::new(12345);
        for _ in 0..100 {
            let a: u64 = r1.random();
            let b: u64 = r2.random();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn child_streams_diverge() {
        let mut root = SimRng::new(1);
        let mut c0 = root.child(0);
        let mut c1 = root.child(1);
        let a: u64 = c0.random();
        let b: u64 = c1.random();
        assert_ne!(a, b);
    }

    #[test]
    fn gen_bool_extremes() {
        let mut rng = SimRng::new(0);
        assert!(!rng.gen_bool(0.0));
        assert!(rng.gen_bool(1.0));
    }
}

#[cfg(test)]
mod registry {
    use crate::Registry;

    #[test]
    fn add_and_lookup() {
        let mut reg = Registry::new();
        let log = reg.add_ware("log");
        let plank = reg.add_ware("plank");
        let carrier = reg.add_role("carrier");
        assert_eq!(reg.ware_by_name("log"), Some(log));
        assert_eq!(reg.ware_by_name("plank"), Some(plank));
        assert_eq!(reg.ware_by_name("gold"), None);
        assert_eq!(reg.role_by_name("carrier"), Some(carrier));
        assert_eq!(reg.ware(log).unwrap().name, "log");
    }

    #[test]
    fn csv_load() {
        let mut reg = Registry::new();
        let n = reg.load_wares_csv("name\nlog\nplank\nstone\n".as_bytes()).unwrap();
        assert_eq!(n, 3);
        assert!(reg.ware_by_name("stone").is_some());
    }

    #[test]
    fn csv_duplicate_rejected() {
        let mut reg = Registry::new();
        let result = reg.load_wares_csv("name\nlog\nlog\n".as_bytes());
        assert!(result.is_err());
    }
}

#[cfg(test)]
mod notes {
    use crate::coords::Coord;
    use crate::{Note, NoteBus};

    #[test]
    fn drain_empties_bus() {
        let mut bus = NoteBus::new();
        bus.publish(Note::StructureGained { at: Coord::new(1, 2) });
        bus.publish(Note::StructureLost { at: Coord::new(1, 2) });
        assert_eq!(bus.len(), 2);
        let notes = bus.drain();
        assert_eq!(notes.len(), 2);
        assert!(bus.is_empty());
    }
}

#[cfg(test)]
mod coords {
    use crate::Coord;

    #[test]
    fn step_distance_is_chebyshev() {
        assert_eq!(Coord::new(0, 0).step_distance(Coord::new(3, 1)), 3);
        assert_eq!(Coord::new(0, 0).step_distance(Coord::new(-2, -5)), 5);
        assert_eq!(Coord::new(4, 4).step_distance(Coord::new(4, 4)), 0);
    }

    #[test]
    fn eight_distinct_neighbors() {
        let n = Coord::new(0, 0).neighbors();
        let unique: std::collections::HashSet<_> = n.iter().collect();
        assert_eq!(unique.len(), 8);
    }
}
