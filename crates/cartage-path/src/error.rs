use cartage_core::Coord;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("no route from {from} to {to}")]
    NoRoute { from: Coord, to: Coord },

    #[error("start tile {0} is not passable for this mover")]
    BadStart(Coord),
}
