//! `cartage-save` — versioned binary persistence for the cartage world.
//!
//! # Model
//!
//! Live object identities (generational handles) are never written to
//! disk.  An [`ObjectSaver`] assigns every live object a dense file index
//! in arena-iteration order; records reference each other through those
//! indices; an [`ObjectLoader`] resolves them back to freshly created
//! handles on read.  Task stacks are saved by task *name* and resolved
//! through the engine's task table.
//!
//! The record tree carries a leading version byte.  Loading an unsupported
//! version fails the whole load — a data error, reported, never patched
//! around.
//!
//! # Round-trip guarantee
//!
//! `read_world(write_world(w))` reproduces all externally observable state:
//! fills, capacities, pending-request identities, carrier-slot occupancy,
//! need-ship flags, waiting items, agent stacks, and the event timeline.
//! Writing the loaded world again yields byte-identical output, which is
//! what the round-trip tests assert.

pub mod error;
pub mod records;
pub mod tables;
pub mod world_io;

#[cfg(test)]
mod tests;

pub use error::{SaveError, SaveResult};
pub use records::WorldRecord;
pub use tables::{ObjectLoader, ObjectSaver};
pub use world_io::{read_world, write_world, FORMAT_VERSION};
