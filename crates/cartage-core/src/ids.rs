//! Strongly typed generational handles.
//!
//! Every world object is addressed by a `(slot, gen)` pair: the slot indexes
//! into an [`Arena`](crate::arena::Arena) and the generation detects reuse of
//! that slot after the object died.  A handle whose generation no longer
//! matches resolves to `None` instead of aliasing a new object, so destroyed
//! objects never leave dangling back-references.
//!
//! All handles are `Copy + Ord + Hash` so they can be used as map keys and
//! sorted collection elements without ceremony.

use std::fmt;

/// A type-erased handle, used where a scratch slot must hold "some object"
/// without committing to its kind (e.g. a task's object reference).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct AnyHandle {
    pub slot: u32,
    pub gen: u32,
}

impl AnyHandle {
    pub const INVALID: AnyHandle = AnyHandle { slot: u32::MAX, gen: u32::MAX };
}

/// Trait connecting typed handles to [`Arena`](crate::arena::Arena) storage.
pub trait ArenaId: Copy + Eq {
    fn from_parts(slot: u32, gen: u32) -> Self;
    fn slot(self) -> u32;
    fn generation(self) -> u32;
}

/// Generate a typed generational handle.
macro_rules! handle_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[derive(serde::Serialize, serde::Deserialize)]
        $vis struct $name {
            pub slot: u32,
            pub gen: u32,
        }

        impl $name {
            /// Sentinel meaning "no valid handle".
            pub const INVALID: $name = $name { slot: u32::MAX, gen: u32::MAX };

            #[inline(always)]
            pub fn is_invalid(self) -> bool {
                self.slot == u32::MAX
            }

            /// Cast the slot to `usize` for direct indexing.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.slot as usize
            }

            /// Erase the type for storage in a generic scratch slot.
            #[inline(always)]
            pub fn erase(self) -> AnyHandle {
                AnyHandle { slot: self.slot, gen: self.gen }
            }

            /// Reinterpret a type-erased handle.  The caller asserts the
            /// handle was produced by [`erase`](Self::erase) on this type.
            #[inline(always)]
            pub fn from_any(h: AnyHandle) -> Self {
                $name { slot: h.slot, gen: h.gen }
            }
        }

        impl $crate::ids::ArenaId for $name {
            #[inline(always)]
            fn from_parts(slot: u32, gen: u32) -> Self {
                $name { slot, gen }
            }
            #[inline(always)]
            fn slot(self) -> u32 {
                self.slot
            }
            #[inline(always)]
            fn generation(self) -> u32 {
                self.gen
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized handles are
            /// visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_invalid() {
                    write!(f, "{}(-)", stringify!($name))
                } else {
                    write!(f, "{}({}v{})", stringify!($name), self.slot, self.gen)
                }
            }
        }
    };
}

handle_id! {
    /// An autonomous mobile entity (carrier, transport worker, ship).
    pub struct AgentId;
}

handle_id! {
    /// A hub node of the routing graph.
    pub struct HubId;
}

handle_id! {
    /// A carrier lane connecting two hubs.
    pub struct LaneId;
}

handle_id! {
    /// A single ware instance in transit or at rest.
    pub struct WareId;
}

handle_id! {
    /// A maritime hub (dock).
    pub struct DockId;
}

handle_id! {
    /// A pool of ships serving a set of docks.
    pub struct FleetId;
}

handle_id! {
    /// A warehouse-style store attached to a hub or dock.
    pub struct DepotId;
}

handle_id! {
    /// An outstanding fulfillment request for a ware or a worker.
    pub struct RequestId;
}

handle_id! {
    /// A per-owner, per-good supply queue with a target fill.
    pub struct QueueId;
}

handle_id! {
    /// A connected component of the routing graph sharing supply.
    pub struct EconomyId;
}

// ── Kind ids ──────────────────────────────────────────────────────────────────
//
// Kind ids index a constructed-once registry, not an arena; they are plain
// dense u16 indices with no generation.

/// Generate a dense kind-id wrapper.
macro_rules! kind_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[derive(serde::Serialize, serde::Deserialize)]
        $vis struct $name(pub u16);

        impl $name {
            pub const INVALID: $name = $name(u16::MAX);

            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

kind_id! {
    /// Index of a ware kind in the registry (max 65,535 kinds).
    pub struct WareKindId;
}

kind_id! {
    /// Index of a worker role in the registry.
    pub struct RoleId;
}
