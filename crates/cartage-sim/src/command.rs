//! Player commands.
//!
//! Each command is a single atomic operation applied within one tick —
//! the replicated-input unit of the lock-step model.  Application order is
//! (tick, submission order), identical on every replica.

use cartage_core::{Coord, DockId, HubId, LaneId, QueueId, RoleId};
use cartage_economy::{dock, lane, supply_queue, EconomyResult, World};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Begin mustering an expedition at a dock.
    StartExpedition { dock: DockId },

    /// Abort an expedition; collected goods and workers return to the
    /// depot.
    CancelExpedition { dock: DockId },

    /// Build a lane between two hubs, searching a walkable path.
    BuildLane { a: HubId, b: HubId, carrier_role: RoleId },

    /// Tear a lane down, releasing its carriers.
    DestroyLane { lane: LaneId },

    /// Insert a hub into a lane's path, splitting it in two.
    SplitLane { lane: LaneId, at: Coord },

    /// Adjust a supply queue's desired fill level.
    SetTargetFill { queue: QueueId, target: u32 },

    /// Adjust a supply queue's capacity.
    SetMaxFill { queue: QueueId, max: u32 },
}

/// Apply one command to the world.  Expected failures (no path, no
/// expedition to cancel) come back as `Err`; the world is unchanged then.
pub fn apply(world: &mut World, command: &Command) -> EconomyResult<()> {
    match *command {
        Command::StartExpedition { dock } => dock::start_expedition(world, dock),
        Command::CancelExpedition { dock } => dock::cancel_expedition(world, dock),
        Command::BuildLane { a, b, carrier_role } => {
            lane::create_lane(world, a, b, carrier_role).map(|_| ())
        }
        Command::DestroyLane { lane } => {
            lane::destroy_lane(world, lane);
            Ok(())
        }
        Command::SplitLane { lane, at } => lane::split_lane(world, lane, at).map(|_| ()),
        Command::SetTargetFill { queue, target } => {
            supply_queue::set_target_fill(world, queue, target);
            Ok(())
        }
        Command::SetMaxFill { queue, max } => {
            supply_queue::set_max_fill(world, queue, max);
            Ok(())
        }
    }
}
