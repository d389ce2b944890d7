//! `cartage-agent` — the per-agent task-stack scheduler.
//!
//! # Model
//!
//! Every autonomous entity owns a stack of *tasks*: named, shared behavior
//! descriptors with per-entry scratch state.  The top of the stack is the
//! active behavior.  The scheduler advances one agent at a time in response
//! to wake-up events; an agent's update runs to completion before anything
//! else touches it, so there is no intra-agent concurrency to reason about.
//!
//! ```text
//! act(agent)                     one wake-up event
//!   ├─ stack empty → push the agent's default task
//!   └─ else run top task's update() → Step
//!        Push { state, delay }  → new entry on top, wake after delay
//!        Pop                    → run on_pop, drop entry, short re-tick
//!        Wait(delay)            → same task again after delay
//!        Idle                   → sleep until an external wake-up
//! ```
//!
//! Updates *return* what they want to do instead of mutating the stack
//! directly; the engine applies the verdict.  This makes the "every update
//! must act" contract a property of the type system rather than a runtime
//! check.
//!
//! # Signals
//!
//! A signal is a short interrupt string.  Delivery runs every stacked task's
//! `on_signal` hook top-to-bottom for synchronous side effects, stores the
//! string on the agent, and forces an immediate update.  By convention every
//! task's update checks the pending signal first and pops itself if one is
//! set — the signal itself is inert data.
//!
//! # Stale wake-ups
//!
//! Each agent carries a monotonically increasing act generation.  Scheduling
//! a wake-up bumps the generation and stamps the event with it; events whose
//! stamp no longer matches are dropped on arrival.  This is the mechanism
//! that guarantees "at most one pending wake-up per agent" without ever
//! searching the event queue.

pub mod agent;
pub mod engine;
pub mod host;
pub mod task;


pub use agent::Agent;
pub use engine::{act, despawn, push_task, reset_tasks, schedule_act, send_signal, spawn};
pub use host::AgentHost;
pub use task::{Step, Task, TaskState};
