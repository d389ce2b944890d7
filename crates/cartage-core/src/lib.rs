//! `cartage-core` — foundational types for the `cartage` logistics engine.
//!
//! This crate is a dependency of every other `cartage-*` crate.  It
//! intentionally has no `cartage-*` dependencies and minimal external ones
//! (`rand`, `thiserror`, `serde`, `csv`).
//!
//! # What lives here
//!
//! | Module       | Contents                                               |
//! |--------------|--------------------------------------------------------|
//! | [`ids`]      | Generational handles: `AgentId`, `HubId`, `LaneId`, …  |
//! | [`arena`]    | `Arena<I, T>` generational slot storage                |
//! | [`coords`]   | `Coord`, step distance                                 |
//! | [`time`]     | `Tick`, `GameClock`                                    |
//! | [`rng`]      | `SimRng` (seeded, deterministic)                       |
//! | [`registry`] | Ware-kind / worker-role registry + CSV loader          |
//! | [`notes`]    | `Note`, `NoteBus` — fire-and-forget outward events     |
//! | [`config`]   | `TuningConfig`, `SimConfig`                            |
//! | [`error`]    | `CoreError`, `CoreResult`                              |

pub mod arena;
pub mod config;
pub mod coords;
pub mod error;
pub mod ids;
pub mod notes;
pub mod registry;
pub mod rng;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use arena::Arena;
pub use config::{SimConfig, TuningConfig};
pub use coords::Coord;
pub use error::{CoreError, CoreResult};
pub use ids::{
    AgentId, AnyHandle, DepotId, DockId, EconomyId, FleetId, HubId, LaneId, QueueId, RequestId,
    RoleId, WareId, WareKindId,
};
pub use notes::{Note, NoteBus};
pub use registry::{Registry, WareKind, WorkerRole};
pub use rng::SimRng;
pub use time::{GameClock, Tick};
