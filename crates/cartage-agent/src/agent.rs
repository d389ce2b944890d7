//! The agent record.

use cartage_core::{Coord, Tick};

use crate::task::{Task, TaskState};

/// An autonomous mobile entity driven by the task-stack scheduler.
///
/// The scheduler owns everything here; world code reads `pos` freely and
/// mutates the rest only through the engine functions.
pub struct Agent<W: 'static> {
    /// Current map position.
    pub pos: Coord,

    /// When the current walking step completes.  `Tick::ZERO` when the
    /// agent is not mid-step; movement tasks compare it to the clock.
    pub walk_end: Tick,

    /// Active behaviors; last entry is the running task.
    pub stack: Vec<TaskState<W>>,

    /// Pending interrupt string.  Empty = none.
    pub signal: String,

    /// Act generation counter.  Bumped on every schedule; wake-up events
    /// stamped with an older value are stale and dropped.
    pub act_gen: u64,

    /// Pushed whenever the stack is found empty at act time.
    pub default_task: &'static dyn Task<W>,
}

impl<W: 'static> Agent<W> {
    pub fn new(pos: Coord, default_task: &'static dyn Task<W>) -> Self {
        Self {
            pos,
            walk_end: Tick::ZERO,
            stack: Vec::new(),
            signal: String::new(),
            act_gen: 0,
            default_task,
        }
    }

    /// The running task entry, if any.
    pub fn top_state(&self) -> Option<&TaskState<W>> {
        self.stack.last()
    }

    pub fn top_state_mut(&mut self) -> Option<&mut TaskState<W>> {
        self.stack.last_mut()
    }

    /// Topmost entry of the named task, or `None` if it is not running.
    pub fn find_task_state(&self, name: &str) -> Option<&TaskState<W>> {
        self.stack.iter().rev().find(|s| s.task.name() == name)
    }

    /// `true` if an entry of `task` is anywhere on the stack.
    pub fn has_task(&self, task: &'static dyn Task<W>) -> bool {
        self.find_task_state(task.name()).is_some()
    }

    #[inline]
    pub fn has_signal(&self) -> bool {
        !self.signal.is_empty()
    }

    /// Mark the pending signal as handled.
    pub fn clear_signal(&mut self) {
        self.signal.clear();
    }
}
