//! `cartage-economy` — the logistics world.
//!
//! Goods flow from producers to consumers over a capacity-bounded network:
//! hubs hold a handful of resting wares, lanes connect hubs and employ
//! carriers to ferry wares across, docks bridge the road network to ship
//! transport, and fulfillment requests asynchronously match needs (a queue
//! below target, an empty carrier slot) against depot stock.
//!
//! # Structure
//!
//! | Module         | Contents                                             |
//! |----------------|------------------------------------------------------|
//! | [`world`]      | `World` — arenas, map, clock, event timeline         |
//! | [`ware`]       | Ware instances and re-routing                        |
//! | [`hub`]        | Hub nodes: resting store, dispatch, capacity waits   |
//! | [`lane`]       | Lanes: carrier slots, busyness, splitting            |
//! | [`router`]     | Next-hop routing over the hub graph                  |
//! | [`request`]    | Fulfillment requests, economies, the balance step    |
//! | [`supply_queue`] | Target-fill queues that keep themselves stocked    |
//! | [`depot`]      | Warehouse stock and idle workers                     |
//! | [`dock`]       | Maritime hubs and shipping items                     |
//! | [`fleet`]      | Ship pools serving docks                             |
//! | [`embark`]     | One-shot expedition mustering                        |
//! | [`tasks`]      | The agent behaviors (`Task<World>` impls)            |
//!
//! # Mutation discipline
//!
//! Everything is a free function taking `&mut World` plus ids.  A hub's
//! ware list and capacity-wait list are only touched while processing an
//! event addressed to that hub or to an agent standing on it; no two hubs
//! are ever mutated as one "transaction".  The single exception is economy
//! reassignment, which re-registers queues and requests across components
//! in one atomic in-tick sweep with no event processing in between.

pub mod depot;
pub mod dock;
pub mod embark;
pub mod error;
pub mod fleet;
pub mod hub;
pub mod lane;
pub mod request;
pub mod router;
pub mod supply_queue;
pub mod tasks;
pub mod ware;
pub mod world;

#[cfg(test)]
mod tests;

pub use error::{EconomyError, EconomyResult};
pub use world::{AgentData, CarrierData, Event, ShipData, Timeline, Timer, WorkerData, World};
