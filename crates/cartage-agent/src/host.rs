//! The seam between the scheduler engine and the embedding world.

use cartage_core::{AgentId, Arena, Tick, TuningConfig};

use crate::agent::Agent;

/// Implemented by the world type the engine is embedded in.
///
/// The engine functions are generic over this trait so the scheduler has no
/// opinion about what else a world contains — it only needs the agent arena,
/// the clock, the tuning constants, and a way to enqueue a wake-up event.
pub trait AgentHost: Sized + 'static {
    fn agents(&self) -> &Arena<AgentId, Agent<Self>>;

    fn agents_mut(&mut self) -> &mut Arena<AgentId, Agent<Self>>;

    /// Current simulation time.
    fn now(&self) -> Tick;

    fn tuning(&self) -> &TuningConfig;

    /// Enqueue a wake-up for `agent` at `at`, stamped with `gen`.
    ///
    /// The host must deliver it by calling [`act`](crate::engine::act) with
    /// the same stamp when its timeline reaches `at`.  Delivery order for
    /// equal ticks must be stable (insertion order) so replays are
    /// reproducible.
    fn schedule_act_event(&mut self, at: Tick, agent: AgentId, gen: u64);
}
