//! Unit tests for cartage-path.

use cartage_core::{Coord, SimRng};

use crate::grid::{GridMap, Movecaps, Terrain, TileMap};
use crate::path::Path;
use crate::search::{find_path, search_with_relaxation};
use crate::PathError;

fn open_map() -> GridMap {
    GridMap::all_land(10, 10, 1_800)
}

const NEVER: fn(Coord) -> bool = |_| false;

#[cfg(test)]
mod path_ops {
    use super::*;

    fn straight() -> Path {
        Path::from_steps(
            Coord::new(0, 0),
            vec![Coord::new(1, 0), Coord::new(2, 0), Coord::new(3, 0)],
        )
    }

    #[test]
    fn endpoints_and_len() {
        let p = straight();
        assert_eq!(p.start(), Coord::new(0, 0));
        assert_eq!(p.end(), Coord::new(3, 0));
        assert_eq!(p.len(), 3);
        assert_eq!(Path::trivial(Coord::new(5, 5)).end(), Coord::new(5, 5));
    }

    #[test]
    fn truncate_keeps_prefix() {
        let mut p = straight();
        p.truncate(1);
        assert_eq!(p.end(), Coord::new(1, 0));
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn trim_start_moves_origin() {
        let mut p = straight();
        p.trim_start(2);
        assert_eq!(p.start(), Coord::new(2, 0));
        assert_eq!(p.end(), Coord::new(3, 0));
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn reverse_swaps_endpoints() {
        let mut p = straight();
        p.reverse();
        assert_eq!(p.start(), Coord::new(3, 0));
        assert_eq!(p.end(), Coord::new(0, 0));
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn position_of_finds_tiles() {
        let p = straight();
        assert_eq!(p.position_of(Coord::new(0, 0)), Some(0));
        assert_eq!(p.position_of(Coord::new(2, 0)), Some(2));
        assert_eq!(p.position_of(Coord::new(9, 9)), None);
    }

    #[test]
    fn cost_sums_steps() {
        let p = straight();
        assert_eq!(p.cost_ms(&open_map()), 3 * 1_800);
    }
}

#[cfg(test)]
mod basic_search {
    use super::*;

    #[test]
    fn straight_line() {
        let map = open_map();
        let p = find_path(&map, Coord::new(0, 0), Coord::new(4, 0), 0, Movecaps::Walk, NEVER)
            .unwrap();
        assert_eq!(p.start(), Coord::new(0, 0));
        assert_eq!(p.end(), Coord::new(4, 0));
        // Diagonal steps cost the same, so the shortest route is 4 steps.
        assert_eq!(p.len(), 4);
    }

    #[test]
    fn trivial_when_start_is_end() {
        let map = open_map();
        let p = find_path(&map, Coord::new(3, 3), Coord::new(3, 3), 0, Movecaps::Walk, NEVER)
            .unwrap();
        assert!(p.is_empty());
    }

    #[test]
    fn water_stops_walkers() {
        let mut map = open_map();
        // Full-height water column at x = 5.
        map.set_water_rect(Coord::new(5, 0), Coord::new(5, 9));
        let r = find_path(&map, Coord::new(0, 0), Coord::new(9, 0), 0, Movecaps::Walk, NEVER);
        assert_eq!(r, Err(PathError::NoRoute { from: Coord::new(0, 0), to: Coord::new(9, 0) }));
    }

    #[test]
    fn swimmers_need_water() {
        let mut map = open_map();
        map.set_water_rect(Coord::new(0, 5), Coord::new(9, 7));
        let p = find_path(&map, Coord::new(0, 6), Coord::new(9, 6), 0, Movecaps::Swim, NEVER)
            .unwrap();
        assert_eq!(p.end(), Coord::new(9, 6));
        assert_eq!(
            find_path(&map, Coord::new(0, 0), Coord::new(3, 0), 0, Movecaps::Swim, NEVER),
            Err(PathError::BadStart(Coord::new(0, 0)))
        );
    }

    #[test]
    fn wall_forces_detour() {
        let mut map = open_map();
        // Water wall at x = 5 with a gap at y = 9.
        map.set_water_rect(Coord::new(5, 0), Coord::new(5, 8));
        let p = find_path(&map, Coord::new(0, 0), Coord::new(9, 0), 0, Movecaps::Walk, NEVER)
            .unwrap();
        assert_eq!(p.end(), Coord::new(9, 0));
        assert!(p.len() > 9, "detour must be longer than the direct route");
        assert!(p.tiles().any(|c| c.y == 9), "route must pass through the gap");
    }

    #[test]
    fn blocked_predicate_respected_except_at_destination() {
        let map = open_map();
        // Block everything except the start row; destination itself blocked.
        let dest = Coord::new(4, 0);
        let p = find_path(&map, Coord::new(0, 0), dest, 0, Movecaps::Walk, |c| {
            c.y != 0 || c == dest
        })
        .unwrap();
        assert_eq!(p.end(), dest, "destination is enterable even when blocked");
    }

    #[test]
    fn persistence_budget_limits_search() {
        let map = GridMap::all_land(100, 100, 1_800);
        // Persistence 1 = 64 expansions; the goal is ~99 steps away.
        let r = find_path(&map, Coord::new(0, 0), Coord::new(99, 99), 1, Movecaps::Walk, NEVER);
        assert!(r.is_err());
    }
}

#[cfg(test)]
mod relaxation {
    use super::*;

    #[test]
    fn exact_search_wins_when_unobstructed() {
        let map = open_map();
        let mut rng = SimRng::new(7);
        let p = search_with_relaxation(
            &map,
            Coord::new(0, 0),
            Coord::new(5, 5),
            0,
            Movecaps::Walk,
            &|_| false,
            &mut rng,
            2,
        )
        .unwrap();
        assert_eq!(p.end(), Coord::new(5, 5));
    }

    #[test]
    fn fully_blocked_ring_is_eventually_ignored() {
        let map = open_map();
        // A ring of dynamic blockers around the destination.  The exact
        // search fails; the ladder must get through it (at the latest when
        // blocking checks are disabled).
        let dest = Coord::new(7, 7);
        let blocked = move |c: Coord| c.step_distance(dest) == 1;
        let mut rng = SimRng::new(7);
        let p = search_with_relaxation(
            &map,
            Coord::new(0, 0),
            dest,
            0,
            Movecaps::Walk,
            &blocked,
            &mut rng,
            2,
        )
        .unwrap();
        assert_eq!(p.end(), dest);
    }

    #[test]
    fn terrain_walls_are_never_relaxed() {
        let mut map = open_map();
        map.set_water_rect(Coord::new(5, 0), Coord::new(5, 9));
        let mut rng = SimRng::new(7);
        let r = search_with_relaxation(
            &map,
            Coord::new(0, 0),
            Coord::new(9, 0),
            0,
            Movecaps::Walk,
            &|_| false,
            &mut rng,
            2,
        );
        assert!(r.is_err(), "relaxation only clears dynamic blockers, not terrain");
    }

    #[test]
    fn deterministic_for_same_seed() {
        let map = open_map();
        let dest = Coord::new(8, 2);
        let blocked = move |c: Coord| c.step_distance(dest) <= 2 && c != dest;
        let run = |seed| {
            let mut rng = SimRng::new(seed);
            search_with_relaxation(
                &map, Coord::new(0, 0), dest, 0, Movecaps::Walk, &blocked, &mut rng, 2,
            )
            .unwrap()
        };
        assert_eq!(run(42), run(42));
    }
}

#[cfg(test)]
mod grid {
    use super::*;

    #[test]
    fn bounds() {
        let map = open_map();
        assert!(map.in_bounds(Coord::new(0, 0)));
        assert!(map.in_bounds(Coord::new(9, 9)));
        assert!(!map.in_bounds(Coord::new(10, 0)));
        assert!(!map.in_bounds(Coord::new(-1, 0)));
    }

    #[test]
    fn terrain_assignment() {
        let mut map = open_map();
        map.set_terrain(Coord::new(3, 4), Terrain::Water);
        assert_eq!(map.terrain(Coord::new(3, 4)), Terrain::Water);
        assert!(!map.passable(Coord::new(3, 4), Movecaps::Walk));
        assert!(map.passable(Coord::new(3, 4), Movecaps::Swim));
    }
}
