//! Run configuration and tuning constants.
//!
//! Every heuristic constant in the engine lives here rather than being
//! buried at its use site.  The balance values are starting points, not
//! measured optima; applications load their own from TOML/JSON via serde.

/// Top-level run configuration.
#[derive(Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SimConfig {
    /// Master RNG seed.  The same seed and command log always produce
    /// identical results.
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { seed: 0 }
    }
}

/// Tunable engine constants.
#[derive(Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct TuningConfig {
    /// Wares that may physically rest on one hub.
    pub hub_capacity: u32,

    /// Delay before the task below a popped one gets its first update, ms.
    pub pop_retick_ms: u64,

    /// Delay between signal delivery and the forced update, ms.
    pub signal_retick_ms: u64,

    /// Cadence at which each economy matches open requests to stock, ms.
    pub balance_interval_ms: u64,

    /// One unit of lane busyness decays per this many ms.
    pub busyness_decay_ms: u64,

    /// Added walking cost per unit of lane busyness, ms.  Busier lanes look
    /// more expensive to the router, spreading load.
    pub busyness_cost_bias_ms: u64,

    /// How much the unblock probability shrinks per unblocked tile during
    /// path-search relaxation.
    pub unblock_decrement: u32,

    /// Base walking cost of one map step, ms.
    pub walk_step_ms: u64,

    /// Ware delivery time per map step when a fulfillment travels from a
    /// depot to its requester, ms.
    pub delivery_ms_per_step: u64,

    /// Items one ship can carry.
    pub ship_capacity: u32,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            hub_capacity: 8,
            pop_retick_ms: 10,
            signal_retick_ms: 10,
            balance_interval_ms: 1_000,
            busyness_decay_ms: 600,
            busyness_cost_bias_ms: 500,
            unblock_decrement: 2,
            walk_step_ms: 1_800,
            delivery_ms_per_step: 1_800,
            ship_capacity: 30,
        }
    }
}
