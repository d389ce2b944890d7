//! The `Game`: world + command intake + the event loop.

use std::collections::VecDeque;

use log::{debug, warn};

use cartage_agent::act;
use cartage_core::{GameClock, Registry, SimConfig, Tick, TuningConfig};
use cartage_economy::world::{dispatch_timer, Event};
use cartage_economy::World;
use cartage_path::GridMap;

use crate::command::{self, Command};
use crate::observer::SimObserver;

/// The simulation runner.
///
/// Owns the [`World`] and drains its timeline in `(tick, seq)` order,
/// applying queued commands atomically before the events of their tick.
pub struct Game {
    pub world: World,
    /// Commands in submission order; ticks must be non-decreasing.
    pending: VecDeque<(Tick, Command)>,
}

impl Game {
    pub fn new(map: GridMap, registry: Registry, tuning: TuningConfig, config: SimConfig) -> Self {
        Self {
            world: World::new(map, registry, tuning, config.seed),
            pending: VecDeque::new(),
        }
    }

    #[inline]
    pub fn clock(&self) -> &GameClock {
        &self.world.clock
    }

    /// Queue `command` for atomic application at `at`.
    ///
    /// # Panics
    /// Panics if `at` lies in the past or before an already-queued command
    /// — the command log is append-only and time-ordered, as the lock-step
    /// model requires.
    pub fn submit(&mut self, at: Tick, command: Command) {
        assert!(at >= self.world.clock.now(), "command scheduled in the past");
        if let Some((last, _)) = self.pending.back() {
            assert!(at >= *last, "command log must be time-ordered");
        }
        self.pending.push_back((at, command));
    }

    /// Queue `command` for the current tick.
    pub fn submit_now(&mut self, command: Command) {
        let now = self.world.clock.now();
        self.pending.push_back((now, command));
    }

    /// Advance the simulation to `until` (inclusive), dispatching every
    /// command and event due on the way.
    pub fn run_until<O: SimObserver>(&mut self, until: Tick, observer: &mut O) {
        loop {
            let next_command = self.pending.front().map(|(t, _)| *t);
            let next_event = self.world.timeline.peek_tick();

            // Commands beat events on the same tick: a player order takes
            // effect before the world moves under it.
            let run_command = match (next_command, next_event) {
                (Some(c), _) if c > until => false,
                (Some(c), Some(e)) => c <= e,
                (Some(_), None) => true,
                (None, _) => false,
            };

            if run_command {
                let (at, cmd) = self.pending.pop_front().expect("peeked above");
                self.world.clock.advance_to(at);
                let result = command::apply(&mut self.world, &cmd);
                if let Err(e) = &result {
                    warn!("command rejected: {cmd:?}: {e}");
                }
                observer.on_command(&cmd, result.is_ok());
                self.flush_notes(observer);
                continue;
            }

            let Some((tick, event)) = self.world.timeline.pop_due(until) else {
                break;
            };
            self.world.clock.advance_to(tick);
            match event {
                Event::Act { agent, gen } => act(&mut self.world, agent, gen),
                Event::Timer(timer) => dispatch_timer(&mut self.world, timer),
            }
            observer.on_event(tick);
            self.flush_notes(observer);
        }
        self.world.clock.advance_to(until);
        debug!("ran until {}", self.world.clock);
    }

    /// Advance by `ms` simulated milliseconds.
    pub fn run_for<O: SimObserver>(&mut self, ms: u64, observer: &mut O) {
        let until = self.world.clock.now().offset(ms);
        self.run_until(until, observer);
    }

    fn flush_notes<O: SimObserver>(&mut self, observer: &mut O) {
        for note in self.world.notes.drain() {
            observer.on_note(&note);
        }
    }
}
