use cartage_core::{Coord, HubId};
use cartage_path::PathError;
use thiserror::Error;

/// Expected failures of world operations.
///
/// Fatal defects (dispatching from an unknown hub, completing an unknown
/// request) are panics, not variants here — they indicate a bug in the
/// caller and the simulation must stop loudly rather than diverge.
#[derive(Debug, Error)]
pub enum EconomyError {
    #[error("no walkable path between hubs {0} and {1}")]
    NoLaneRoute(HubId, HubId),

    #[error("hub {0} has no free lane slot")]
    HubFull(HubId),

    #[error("dock position {0} is not water")]
    NotWater(Coord),

    #[error("an expedition is already being assembled at this dock")]
    ExpeditionInProgress,

    #[error("no expedition to cancel")]
    NoExpedition,

    #[error(transparent)]
    Path(#[from] PathError),
}

pub type EconomyResult<T> = Result<T, EconomyError>;
