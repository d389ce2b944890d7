//! `cartage-path` — tile map and path search for the cartage engine.
//!
//! # Pluggability
//!
//! The engine treats path search as a black-box service: given a start, an
//! end, a persistence budget, and a passability predicate, it returns a
//! [`Path`] or a failure.  The interesting part is not the A* internals but
//! the escalation ladder in [`search_with_relaxation`]: an exact search is
//! retried with progressively relaxed passability (randomized unblocking of
//! tentatively-blocked tiles near the destination, then no blocking checks
//! at all) before giving up.  Routing failure is an ordinary error the
//! caller decides how to handle — it is never fatal.

pub mod error;
pub mod grid;
pub mod path;
pub mod search;

#[cfg(test)]
mod tests;

pub use error::PathError;
pub use grid::{GridMap, Movecaps, Terrain, TileMap};
pub use path::Path;
pub use search::{find_path, search_with_relaxation};
