//! Outward notification bus.
//!
//! The engine publishes fire-and-forget events for UI/AI consumers.  Nothing
//! in the core blocks on, or depends on, anything about who (if anyone) is
//! listening: notes accumulate in the bus until the embedding application
//! drains them, and an undrained bus is simply dropped memory, not an error.

use crate::coords::Coord;
use crate::ids::{DepotId, DockId, WareKindId};

/// A fire-and-forget event published by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Note {
    /// An embarkation was canceled; its goods and workers went back to the
    /// depot.
    EmbarkationCanceled { dock: DockId },

    /// A depot could not supply a requested ware kind.
    OutOfStock { depot: DepotId, ware: WareKindId },

    /// A hub, lane, or dock appeared on the map.
    StructureGained { at: Coord },

    /// A hub, lane, or dock was removed from the map.
    StructureLost { at: Coord },
}

/// Drain-on-read queue of [`Note`]s.
#[derive(Default)]
pub struct NoteBus {
    queue: Vec<Note>,
}

impl NoteBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a note.  Never blocks, never fails.
    pub fn publish(&mut self, note: Note) {
        self.queue.push(note);
    }

    /// Take all accumulated notes, leaving the bus empty.
    pub fn drain(&mut self) -> Vec<Note> {
        std::mem::take(&mut self.queue)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
