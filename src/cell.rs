use std::fmt::{self, Debug, Formatter};
use std::mem::ManuallyDrop;

use crate::error::ColonyError;
use crate::index_opt::IndexOpt;

/// The lifecycle state of a single storage cell in a [`Block`](crate::Block).
///
/// A cell starts `Empty`, becomes `Occupied` when an element is stored in it and `Garbage` once that element is
/// removed. `Garbage` cells are reused directly, they never return to `Empty` unless the whole block is cleared.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CellState {
    /// Never held an element since the block was created or cleared.
    Empty,
    /// Holds a live element.
    Occupied,
    /// Held an element that has since been removed.
    Garbage,
}

// A vacant cell stores the next link of its block's free slot stack where the element would live
union CellInner<T> {
    occupied: ManuallyDrop<T>,
    vacant: IndexOpt,
}

pub(crate) struct Cell<T> {
    state: CellState,
    inner: CellInner<T>,
}

impl<T> Cell<T> {
    pub fn empty(next_free: IndexOpt) -> Self {
        Self {
            state: CellState::Empty,
            inner: CellInner { vacant: next_free },
        }
    }

    pub fn state(&self) -> CellState {
        self.state
    }

    pub fn is_free(&self) -> bool {
        self.state != CellState::Occupied
    }

    pub fn get(&self) -> Option<&T> {
        if self.is_free() {
            return None;
        }

        unsafe { Some(&*self.inner.occupied) }
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        if self.is_free() {
            return None;
        }

        unsafe { Some(&mut *self.inner.occupied) }
    }

    /// Stores `value`, returning the free slot link the vacant cell held.
    pub fn fill(&mut self, value: T) -> Result<IndexOpt, ColonyError> {
        if !self.is_free() {
            return Err(ColonyError::CellOccupied);
        }

        let next_free = unsafe { self.inner.vacant };

        self.inner = CellInner {
            occupied: ManuallyDrop::new(value),
        };
        self.state = CellState::Occupied;

        Ok(next_free)
    }

    /// Moves the element out, leaving a `Garbage` cell that links to `next_free`.
    pub fn vacate(&mut self, next_free: IndexOpt) -> Result<T, ColonyError> {
        if self.is_free() {
            return Err(ColonyError::CellVacant { found: self.state });
        }

        let value = unsafe { ManuallyDrop::take(&mut self.inner.occupied) };

        self.inner = CellInner { vacant: next_free };
        self.state = CellState::Garbage;

        Ok(value)
    }

    pub fn next_free(&self) -> Option<IndexOpt> {
        if self.is_free() {
            unsafe { Some(self.inner.vacant) }
        } else {
            None
        }
    }

    pub fn into_inner(self) -> Option<T> {
        let mut this = ManuallyDrop::new(self);

        if this.is_free() {
            return None;
        }

        unsafe { Some(ManuallyDrop::take(&mut this.inner.occupied)) }
    }
}

impl<T> Drop for Cell<T> {
    fn drop(&mut self) {
        if !self.is_free() {
            unsafe {
                ManuallyDrop::drop(&mut self.inner.occupied);
            }
        }
    }
}

impl<T: Debug> Debug for Cell<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.get() {
            Some(value) => f.debug_tuple("Occupied").field(value).finish(),
            None => f
                .debug_struct(match self.state {
                    CellState::Empty => "Empty",
                    _ => "Garbage",
                })
                .field("next_free", &self.next_free())
                .finish(),
        }
    }
}
