//! Observer hooks for progress reporting and outward notifications.

use cartage_core::{Note, Tick};

use crate::command::Command;

/// Callbacks invoked by [`Game::run_until`][crate::Game::run_until] at key
/// points in the loop.  All methods have no-op defaults so implementors
/// only override what they care about.
pub trait SimObserver {
    /// Called after each timeline event is dispatched.
    fn on_event(&mut self, _tick: Tick) {}

    /// Called for every note the engine published, in publish order.
    fn on_note(&mut self, _note: &Note) {}

    /// Called after a command was applied (or rejected).
    fn on_command(&mut self, _command: &Command, _accepted: bool) {}
}

/// A [`SimObserver`] that does nothing.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}
