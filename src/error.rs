use thiserror::Error;

use crate::cell::CellState;

#[cfg(doc)]
use crate::{Block, Colony};

/// Errors returned by fallible [`Colony`] and [`Block`] operations.
#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
pub enum ColonyError {
    /// A logical index was not smaller than the number of live elements.
    #[error("index {index} is out of range for {len} live elements")]
    OutOfRange {
        /// The index that was requested.
        index: usize,
        /// The number of live elements at the time of the request.
        len: usize,
    },
    /// A cell that already holds an element was asked to store another one.
    #[error("cannot fill a cell that is already occupied")]
    CellOccupied,
    /// A cell that holds no element was asked to give one up.
    #[error("cannot vacate a cell in the {found:?} state")]
    CellVacant {
        /// The state the cell was actually in.
        found: CellState,
    },
}
