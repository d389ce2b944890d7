//! Task descriptors, per-entry scratch state, and update verdicts.

use std::fmt;

use cartage_core::{AgentId, AnyHandle, Coord};
use cartage_path::Path;

/// A named, shared, stateless behavior descriptor.
///
/// Implementations are unit structs referenced as `&'static dyn Task<W>`;
/// all mutable state lives in the per-entry [`TaskState`] and in the world.
/// `W` is the world type the engine is embedded in.
pub trait Task<W: 'static>: Sync {
    /// Stable name — used for unique-task checks, logging, and persistence.
    fn name(&self) -> &'static str;

    /// `true` if at most one entry of this task may be on an agent's stack.
    fn unique(&self) -> bool {
        false
    }

    /// Advance the behavior by one step.  Called at most once per wake-up,
    /// never re-entrantly for the same agent.
    fn update(&self, world: &mut W, agent: AgentId, state: &mut TaskState<W>) -> Step<W>;

    /// Synchronous side effects of an incoming signal.  Runs for every
    /// stacked entry, top to bottom, before the signal string is stored.
    fn on_signal(&self, _world: &mut W, _agent: AgentId, _state: &mut TaskState<W>, _signal: &str) {
    }

    /// Cleanup when the entry leaves the stack (pop, reset, or despawn).
    /// Outstanding fulfillment requests owned by this entry must be released
    /// here — the engine does not know about them.
    fn on_pop(&self, _world: &mut W, _agent: AgentId, _state: &mut TaskState<W>) {}
}

/// One stack entry: the task plus its scratch state.
///
/// The scratch slots are deliberately untyped — three integers, a string, a
/// weak object handle, a coordinate, a route — because they are shared by
/// every task kind and must persist by task name alone.
pub struct TaskState<W: 'static> {
    pub task: &'static dyn Task<W>,
    pub ivar1: i32,
    pub ivar2: i32,
    pub ivar3: i32,
    pub svar: String,
    /// Weak reference to some world object; resolve through the arena and
    /// treat `None` as "it died".
    pub objvar: AnyHandle,
    pub coords: Option<Coord>,
    pub path: Option<Path>,
}

impl<W: 'static> TaskState<W> {
    /// Fresh entry with zeroed scratch.
    pub fn new(task: &'static dyn Task<W>) -> Self {
        Self {
            task,
            ivar1: 0,
            ivar2: 0,
            ivar3: 0,
            svar: String::new(),
            objvar: AnyHandle::INVALID,
            coords: None,
            path: None,
        }
    }
}

impl<W: 'static> fmt::Debug for TaskState<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskState")
            .field("task", &self.task.name())
            .field("ivar1", &self.ivar1)
            .field("ivar2", &self.ivar2)
            .field("ivar3", &self.ivar3)
            .field("svar", &self.svar)
            .field("coords", &self.coords)
            .field("path_len", &self.path.as_ref().map(Path::len))
            .finish()
    }
}

/// What an update decided to do.  Exactly one verdict per update — the
/// engine applies it after the update returns.
pub enum Step<W: 'static> {
    /// Stack a new entry on top; its first update runs after `delay_ms`.
    /// The current entry resumes when the new one pops.
    Push {
        state: TaskState<W>,
        delay_ms: u64,
    },

    /// Remove this entry.  Its `on_pop` hook runs, then the entry below
    /// gets a short-delay re-tick.
    Pop,

    /// Run this entry's update again after `delay_ms`.
    Wait(u64),

    /// Do nothing until an external wake-up (a signal, or an explicit
    /// [`schedule_act`](crate::engine::schedule_act) from world code).
    Idle,
}
