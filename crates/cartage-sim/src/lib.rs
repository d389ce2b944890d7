//! `cartage-sim` — the deterministic event loop.
//!
//! The simulation is single-threaded, cooperative, and tick-driven: one
//! discrete timeline shared by every agent and timer, drained strictly in
//! `(tick, sequence)` order.  Nothing blocks; anything that waits registers
//! a future event and returns.  Replaying the same command log against the
//! same seed reproduces the run bit for bit — the property the whole
//! engine is built around.
//!
//! Player commands enter through [`Game::submit`] and are applied
//! atomically at their scheduled tick, before that tick's events.

pub mod command;
pub mod game;
pub mod observer;

#[cfg(test)]
mod tests;

pub use command::Command;
pub use game::Game;
pub use observer::{NoopObserver, SimObserver};
