use std::fmt::{self, Debug, Formatter};

use crate::cell::{Cell, CellState};
use crate::error::ColonyError;
use crate::index_opt::IndexOpt;
use crate::iter::{BlockIter, BlockIterMut};
use crate::skipfield::{Skipfield, SkipfieldElement, MAX_BLOCK_CAPACITY};

/// The number of cells per block used by [`Colony`](crate::Colony) unless another capacity is given.
pub const DEFAULT_BLOCK_CAPACITY: usize = 16;

/// A fixed-capacity segment of a [`Colony`](crate::Colony).
///
/// A block owns `N` cells in a single heap allocation, so elements stored in it never move while the block
/// exists. Vacant cells are kept on an intrusive free slot stack threaded through the cells themselves, and dead
/// runs are described by a skipfield so that finding the `nth` live element jumps over each run in one step.
///
/// Elements are addressed by their rank among the live elements of the block (`nth`), not by their physical slot.
///
/// # Examples
///
/// ```
/// # use block_colony::Block;
/// let mut block = Block::<&str, 4>::new();
///
/// block.insert("foo").unwrap();
/// block.insert("bar").unwrap();
/// block.insert("baz").unwrap();
///
/// assert_eq!(block.remove(1), Ok("bar"));
/// assert_eq!(block.get(1), Some(&"baz"));
/// assert_eq!(block.len(), 2);
/// ```
pub struct Block<T, const N: usize = DEFAULT_BLOCK_CAPACITY> {
    cells: Box<[Cell<T>]>,
    skipfield: Skipfield<N>,
    next_free: IndexOpt,
    len: usize,
}

impl<T, const N: usize> Block<T, N> {
    const VALID_CAPACITY: () = assert!(
        N > 0 && N <= MAX_BLOCK_CAPACITY,
        "block capacity must be non-zero and fit the skipfield"
    );

    /// Constructs a block with every cell empty.
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_CAPACITY;

        Self {
            cells: Self::fresh_cells(),
            skipfield: Skipfield::new(),
            next_free: IndexOpt::some(0),
            len: 0,
        }
    }

    // Slot 0 sits on top of the free slot stack, followed by the rest in ascending order
    fn fresh_cells() -> Box<[Cell<T>]> {
        (0..N).map(|slot| Cell::empty(Self::link_after(slot))).collect()
    }

    fn link_after(slot: usize) -> IndexOpt {
        if slot + 1 < N {
            IndexOpt::some(slot + 1)
        } else {
            IndexOpt::none()
        }
    }

    /// Returns the number of cells in the block.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Returns the number of live elements in the block.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the block holds no live elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if every cell holds a live element.
    pub fn is_full(&self) -> bool {
        self.next_free.as_opt().is_none()
    }

    /// Stores `value` in the most recently vacated cell, or the first never used cell if none was vacated.
    ///
    /// Returns the physical slot the value was stored in, or gives the value back if the block is full.
    pub fn insert(&mut self, value: T) -> Result<usize, T> {
        let Some(slot) = self.next_free.as_opt() else {
            return Err(value);
        };

        self.next_free = self.cells[slot]
            .fill(value)
            .unwrap_or_else(|err| corrupted(slot, err));
        self.skipfield.unskip(slot);
        self.len += 1;

        Ok(slot)
    }

    /// Removes and returns the `nth` live element of the block.
    ///
    /// The vacated cell is reused by the next insertion into this block.
    /// No other element of the block moves.
    pub fn remove(&mut self, nth: usize) -> Result<T, ColonyError> {
        let slot = self.slot_of(nth).ok_or(ColonyError::OutOfRange {
            index: nth,
            len: self.len,
        })?;

        let value = self.cells[slot]
            .vacate(self.next_free)
            .unwrap_or_else(|err| corrupted(slot, err));
        self.next_free = IndexOpt::some(slot);
        self.skipfield.skip(slot);
        self.len -= 1;

        Ok(value)
    }

    /// Returns the physical slot of the `nth` live element, if there are more than `nth` live elements.
    pub fn slot_of(&self, nth: usize) -> Option<usize> {
        if nth >= self.len {
            return None;
        }

        let slot = self.skipfield.find_live(nth);
        debug_assert!(!self.cells[slot].is_free());
        Some(slot)
    }

    /// Returns a reference to the `nth` live element.
    pub fn get(&self, nth: usize) -> Option<&T> {
        let slot = self.slot_of(nth)?;
        self.cells[slot].get()
    }

    /// Returns a mutable reference to the `nth` live element.
    pub fn get_mut(&mut self, nth: usize) -> Option<&mut T> {
        let slot = self.slot_of(nth)?;
        self.cells[slot].get_mut()
    }

    /// Returns a reference to the `nth` live element, or [`ColonyError::OutOfRange`] if there is none.
    pub fn get_at(&self, nth: usize) -> Result<&T, ColonyError> {
        self.get(nth).ok_or(ColonyError::OutOfRange {
            index: nth,
            len: self.len,
        })
    }

    /// Returns the state of the cell at a physical slot, or `None` if `slot >= N`.
    pub fn cell_state(&self, slot: usize) -> Option<CellState> {
        self.cells.get(slot).map(Cell::state)
    }

    /// Returns the skipfield of the block, one entry per physical slot.
    pub fn skipfield(&self) -> &[SkipfieldElement] {
        self.skipfield.as_slice()
    }

    /// Drops every live element and returns the block to its freshly constructed state.
    pub fn clear(&mut self) {
        for (slot, cell) in self.cells.iter_mut().enumerate() {
            *cell = Cell::empty(Self::link_after(slot));
        }

        self.skipfield.reset();
        self.next_free = IndexOpt::some(0);
        self.len = 0;
    }

    /// Creates an iterator over the live elements of the block in slot order.
    pub fn iter(&self) -> BlockIter<'_, T> {
        BlockIter::new(&self.cells, self.skipfield.as_slice(), self.len)
    }

    /// Creates an iterator over the live elements of the block in slot order, by mutable reference.
    pub fn iter_mut(&mut self) -> BlockIterMut<'_, T> {
        BlockIterMut::new(&mut self.cells, self.skipfield.as_slice(), self.len)
    }

    pub(crate) fn into_cells(self) -> Box<[Cell<T>]> {
        self.cells
    }
}

#[cold]
#[track_caller]
fn corrupted(slot: usize, err: ColonyError) -> ! {
    panic!("free slot stack is corrupted at slot {slot}: {err}")
}

impl<T, const N: usize> Default for Block<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Debug, const N: usize> Debug for Block<T, N> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Block")
            .field("len", &self.len)
            .field("next_free", &self.next_free)
            .field("cells", &self.cells)
            .field("skipfield", &self.skipfield.as_slice())
            .finish()
    }
}
