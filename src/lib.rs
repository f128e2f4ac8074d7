#![doc = include_str!("./doc.md")]
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]

use std::fmt::{self, Debug, Formatter};
use std::ops::{Index, IndexMut};

use log::{debug, trace};

pub use block::*;
pub use cell::CellState;
pub use error::ColonyError;
pub use iter::*;
pub use skipfield::{SkipfieldElement, MAX_BLOCK_CAPACITY, UNSKIPPED};

mod block;
mod cell;
mod error;
mod index_opt;
mod iter;
mod skipfield;

#[doc = include_str!("./doc.md")]
pub struct Colony<T, const N: usize = DEFAULT_BLOCK_CAPACITY> {
    // Arrival order, never reordered
    blocks: Vec<Block<T, N>>,
    // Positions of every block that is not full, each at most once
    free_blocks: Vec<usize>,
    len: usize,
}

impl<T> Colony<T> {
    /// Constructs an empty colony with the default block capacity of 16.
    ///
    /// Does not allocate.
    /// Use [`Colony::default`] with an explicit type to pick another block capacity.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_colony::Colony;
    /// let colony: Colony<i32> = Colony::new();
    /// assert_eq!(colony.block_count(), 0);
    ///
    /// let colony: Colony<i32, 64> = Colony::default();
    /// assert_eq!(colony.capacity(), 0);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T, const N: usize> Default for Colony<T, N> {
    fn default() -> Self {
        Self {
            blocks: Vec::new(),
            free_blocks: Vec::new(),
            len: 0,
        }
    }
}

impl<T, const N: usize> Colony<T, N> {
    /// Returns the total number of elements in the colony.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_colony::Colony;
    /// let mut colony = Colony::new();
    ///
    /// colony.insert_back("foo");
    /// assert_eq!(colony.len(), 1);
    /// colony.remove(0).unwrap();
    /// assert_eq!(colony.len(), 0);
    /// ```
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if there are no elements in the colony.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of elements the allocated blocks can hold.
    ///
    /// Inserting will not allocate while [`len`](Colony::len) is lesser than the capacity.
    pub fn capacity(&self) -> usize {
        self.blocks.len() * N
    }

    /// Returns the number of allocated blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the block at a position in arrival order.
    pub fn block(&self, position: usize) -> Option<&Block<T, N>> {
        self.blocks.get(position)
    }

    /// Creates an iterator over the blocks of the colony in arrival order.
    pub fn blocks(&self) -> Blocks<'_, T, N> {
        Blocks::new(&self.blocks)
    }

    /// Inserts an element into the colony.
    ///
    /// The element goes into the block that most recently gained spare room, in the most recently vacated cell
    /// of that block. A new block is only allocated when every existing block is full.
    /// No previously inserted element is moved, so addresses of other elements stay valid.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_colony::Colony;
    /// let mut colony = Colony::new();
    /// colony.insert_back("foo");
    /// colony.insert_back("bar");
    /// assert_eq!(colony[1], "bar");
    /// ```
    pub fn insert_back(&mut self, value: T) {
        let position = match self.free_blocks.last().copied() {
            Some(position) => position,
            None => self.allocate_block(),
        };

        let block = &mut self.blocks[position];

        // Blocks on the free stack are never full
        if block.insert(value).is_err() {
            registration_corrupted(position);
        }

        if block.is_full() {
            self.free_blocks.pop();
        }

        self.len += 1;
    }

    #[cold]
    fn allocate_block(&mut self) -> usize {
        let position = self.blocks.len();

        self.blocks.push(Block::new());
        self.free_blocks.push(position);

        debug!("allocated colony block {position} with {} cells", N);
        position
    }

    /// Resolves a logical index to the position of its block and its rank among the live elements of that block.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_colony::{Colony, ColonyError};
    /// let colony: Colony<usize, 4> = (0..10).collect();
    ///
    /// assert_eq!(colony.locate(5), Ok((1, 1)));
    /// assert_eq!(
    ///     colony.locate(10),
    ///     Err(ColonyError::OutOfRange { index: 10, len: 10 })
    /// );
    /// ```
    pub fn locate(&self, index: usize) -> Result<(usize, usize), ColonyError> {
        let out_of_range = ColonyError::OutOfRange {
            index,
            len: self.len,
        };

        if index >= self.len {
            return Err(out_of_range);
        }

        let mut remaining = index;

        for (position, block) in self.blocks.iter().enumerate() {
            if remaining < block.len() {
                return Ok((position, remaining));
            }

            remaining -= block.len();
        }

        Err(out_of_range)
    }

    /// Removes and returns the element at a logical index.
    ///
    /// Logical indices of later elements shift down by one, but no element moves in memory.
    /// The vacated cell is reused by a later insertion.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_colony::{Colony, ColonyError};
    /// let mut colony: Colony<_> = ["foo", "bar", "baz"].into_iter().collect();
    ///
    /// assert_eq!(colony.remove(1), Ok("bar"));
    /// assert_eq!(colony[1], "baz");
    /// assert_eq!(
    ///     colony.remove(2),
    ///     Err(ColonyError::OutOfRange { index: 2, len: 2 })
    /// );
    /// ```
    pub fn remove(&mut self, index: usize) -> Result<T, ColonyError> {
        let (position, nth) = self.locate(index)?;
        let block = &mut self.blocks[position];

        let was_full = block.is_full();
        let value = block.remove(nth)?;

        if was_full {
            self.free_blocks.push(position);
            trace!("colony block {position} has free cells again");
        }

        self.len -= 1;
        Ok(value)
    }

    /// Returns a reference to the element at a logical index, or `None` if it is out of range.
    pub fn get(&self, index: usize) -> Option<&T> {
        let (position, nth) = self.locate(index).ok()?;
        self.blocks[position].get(nth)
    }

    /// Returns a mutable reference to the element at a logical index, or `None` if it is out of range.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        let (position, nth) = self.locate(index).ok()?;
        self.blocks[position].get_mut(nth)
    }

    /// Returns a reference to the element at a logical index.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_colony::{Colony, ColonyError};
    /// let mut colony = Colony::new();
    /// colony.insert_back(42);
    ///
    /// assert_eq!(colony.get_at(0), Ok(&42));
    /// assert_eq!(
    ///     colony.get_at(1),
    ///     Err(ColonyError::OutOfRange { index: 1, len: 1 })
    /// );
    /// ```
    pub fn get_at(&self, index: usize) -> Result<&T, ColonyError> {
        let (position, nth) = self.locate(index)?;
        self.blocks[position].get_at(nth)
    }

    /// Returns a mutable reference to the element at a logical index.
    ///
    /// See [`get_at`](Colony::get_at).
    pub fn get_at_mut(&mut self, index: usize) -> Result<&mut T, ColonyError> {
        let len = self.len;
        self.get_mut(index)
            .ok_or(ColonyError::OutOfRange { index, len })
    }

    /// Removes all elements from the colony.
    ///
    /// Blocks stay allocated, so the capacity is unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_colony::Colony;
    /// let mut colony: Colony<_> = (0..100).collect();
    /// let capacity = colony.capacity();
    ///
    /// colony.clear();
    /// assert!(colony.is_empty());
    /// assert_eq!(colony.capacity(), capacity);
    /// ```
    pub fn clear(&mut self) {
        for block in &mut self.blocks {
            block.clear();
        }

        self.free_blocks.clear();
        self.free_blocks.extend((0..self.blocks.len()).rev());
        self.len = 0;

        trace!("cleared colony with {} blocks", self.blocks.len());
    }

    /// Allocates blocks until at least `additional` more elements fit without allocating.
    ///
    /// Blocks allocated here are filled after any block that already had free cells.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_colony::Colony;
    /// let mut colony = Colony::<i32>::new();
    /// colony.reserve(100);
    /// assert!(colony.capacity() >= 100);
    /// assert_eq!(colony.block_count(), 7);
    /// ```
    pub fn reserve(&mut self, additional: usize) {
        let spare = self.capacity() - self.len;
        if additional <= spare {
            return;
        }

        let first = self.blocks.len();
        let count = (additional - spare).div_ceil(N);

        self.blocks.reserve(count);
        self.blocks.extend((0..count).map(|_| Block::new()));

        // Bottom of the stack, so blocks that already had free cells are filled first
        self.free_blocks.splice(0..0, (first..self.blocks.len()).rev());

        debug!("reserved {count} colony blocks of {} cells", N);
    }

    /// Creates an iterator over the elements of the colony.
    ///
    /// Elements are visited block by block in the order the blocks were allocated, and by slot within a block.
    /// This matches the order of logical indices.
    ///
    /// # Examples
    ///
    /// ```
    /// # use block_colony::Colony;
    /// let mut colony = Colony::new();
    /// colony.insert_back("foo");
    /// colony.insert_back("bar");
    ///
    /// let expected = ["foo", "bar"].iter();
    /// assert!(Iterator::eq(colony.iter(), expected));
    /// ```
    pub fn iter(&self) -> Iter<'_, T, N> {
        Iter::new(self)
    }

    /// Creates an iterator over the elements of the colony, by mutable reference.
    ///
    /// See [`iter`](Colony::iter).
    pub fn iter_mut(&mut self) -> IterMut<'_, T, N> {
        IterMut::new(self)
    }
}

#[cold]
#[track_caller]
fn registration_corrupted(position: usize) -> ! {
    panic!("colony block {position} is registered as having free cells but is full")
}

impl<T, const N: usize> Index<usize> for Colony<T, N> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        self.get(index)
            .expect("no element at that index exists in this colony")
    }
}

impl<T, const N: usize> IndexMut<usize> for Colony<T, N> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        self.get_mut(index)
            .expect("no element at that index exists in this colony")
    }
}

impl<T, const N: usize> Extend<T> for Colony<T, N> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();

        let (lower, _) = iter.size_hint();
        self.reserve(lower);

        for value in iter {
            self.insert_back(value);
        }
    }
}

impl<T, const N: usize> FromIterator<T> for Colony<T, N> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut result = Self::default();
        result.extend(iter);
        result
    }
}

impl<T: Clone, const N: usize> Clone for Colony<T, N> {
    fn clone(&self) -> Self {
        Self::from_iter(self.iter().cloned())
    }
}

impl<T: Debug, const N: usize> Debug for Colony<T, N> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a Colony<T, N> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, N>;

    fn into_iter(self) -> Self::IntoIter {
        Iter::new(self)
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a mut Colony<T, N> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T, N>;

    fn into_iter(self) -> Self::IntoIter {
        IterMut::new(self)
    }
}

impl<T, const N: usize> IntoIterator for Colony<T, N> {
    type Item = T;
    type IntoIter = IntoIter<T, N>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use paste::paste;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::{CellState, Colony, ColonyError, UNSKIPPED};

    const SIZES: &[usize] = &[0, 1, 5, 10, 100, 1_000, 10_000];

    fn check<T, const N: usize>(colony: &Colony<T, N>) {
        let total: usize = colony.blocks.iter().map(|block| block.len()).sum();
        assert_eq!(colony.len(), total);

        for (position, block) in colony.blocks.iter().enumerate() {
            let registrations = colony
                .free_blocks
                .iter()
                .filter(|&&free| free == position)
                .count();

            assert_eq!(registrations, usize::from(!block.is_full()), "block {position}");

            let skipfield = block.skipfield();
            let mut expected = UNSKIPPED;

            for slot in (0..N).rev() {
                expected = match block.cell_state(slot) {
                    Some(CellState::Garbage) => expected + 1,
                    _ => UNSKIPPED,
                };

                assert_eq!(skipfield[slot], expected, "block {position} slot {slot}");
            }
        }

        assert_eq!(colony.iter().len(), colony.len());
        assert_eq!(colony.iter().count(), colony.len());
    }

    // Values are unique, so the model can find where an insertion landed
    struct Model<const N: usize> {
        colony: Colony<usize, N>,
        values: Vec<usize>,
        next_value: usize,
    }

    impl<const N: usize> Model<N> {
        fn new() -> Self {
            Self {
                colony: Colony::default(),
                values: Vec::new(),
                next_value: 0,
            }
        }

        fn insert(&mut self) {
            let value = self.next_value;
            self.next_value += 1;

            let blocks_before = self.colony.block_count();
            let had_room = self.colony.len() < self.colony.capacity();
            self.colony.insert_back(value);

            if had_room {
                assert_eq!(self.colony.block_count(), blocks_before);
            }

            let after: Vec<usize> = self.colony.iter().copied().collect();
            let at = after.iter().position(|&v| v == value).unwrap();
            self.values.insert(at, value);
        }

        fn remove(&mut self, index: usize) {
            let expected = self.values.remove(index);
            assert_eq!(self.colony.remove(index), Ok(expected));
        }

        fn check(&self) {
            check(&self.colony);
            assert!(Iterator::eq(self.colony.iter(), self.values.iter()));

            for (index, value) in self.values.iter().enumerate() {
                assert_eq!(self.colony.get_at(index), Ok(value));
            }
        }
    }

    fn random_operations<const N: usize>(seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut model = Model::<N>::new();

        for _ in 0..2_000 {
            if model.values.is_empty() || rng.gen_bool(0.55) {
                model.insert();
            } else {
                let index = rng.gen_range(0..model.values.len());
                model.remove(index);
            }

            if rng.gen_bool(0.05) {
                model.check();
            }
        }

        model.check();
    }

    macro_rules! capacity_tests {
        ($($capacity:literal),*) => {
            paste! {
                $(
                    #[test]
                    fn [<random_operations_capacity_ $capacity>]() {
                        for seed in 0..4 {
                            random_operations::<$capacity>(seed);
                        }
                    }
                )*
            }
        };
    }

    capacity_tests!(1, 2, 3, 16, 64);

    #[test]
    fn scenario_remove_from_middle() {
        let mut colony: Colony<usize> = Colony::new();

        for i in 0..50 {
            colony.insert_back(i);
        }

        assert_eq!(colony.block_count(), 4);
        assert_eq!(colony.block(3).map(|block| block.len()), Some(2));

        let next = *colony.get_at(6).unwrap();
        colony.remove(5).unwrap();

        assert_eq!(colony.len(), 49);
        assert_eq!(colony.get_at(5), Ok(&next));

        let values: Vec<usize> = colony.iter().copied().collect();
        let expected: Vec<usize> = (0..50).filter(|&i| i != 5).collect();
        assert_eq!(values, expected);
        check(&colony);
    }

    #[test]
    fn round_trip() {
        for &size in SIZES {
            let mut colony: Colony<usize> = Colony::new();

            for i in 0..size {
                colony.insert_back(i);
            }

            for i in 0..size {
                assert_eq!(colony.get_at(i), Ok(&i));
            }

            assert!(Iterator::eq(colony.iter().copied(), 0..size));
            check(&colony);
        }
    }

    #[test]
    fn boundary() {
        let mut colony: Colony<usize> = Colony::new();
        let empty = ColonyError::OutOfRange { index: 0, len: 0 };

        assert_eq!(colony.get_at(0), Err(empty));
        assert_eq!(colony.get_at_mut(0), Err(empty));
        assert_eq!(colony.remove(0), Err(empty));
        assert_eq!(colony.locate(0), Err(empty));
        assert_eq!(colony.get(0), None);

        colony.insert_back(1);
        colony.insert_back(2);

        let past_end = ColonyError::OutOfRange { index: 2, len: 2 };
        assert_eq!(colony.get_at(2), Err(past_end));
        assert_eq!(colony.get_at_mut(2), Err(past_end));
        assert_eq!(colony.remove(2), Err(past_end));
        assert_eq!(colony.len(), 2);

        *colony.get_at_mut(1).unwrap() += 10;
        assert_eq!(colony.get_at(1), Ok(&12));
        assert_eq!(colony.get_at_mut(0), Ok(&mut 1));
    }

    #[test]
    #[should_panic(expected = "no element at that index exists in this colony")]
    fn index_out_of_range_panics() {
        let colony: Colony<usize> = (0..3).collect();
        let _value = colony[3];
    }

    #[test]
    fn reuse_freed_cell() {
        let mut colony: Colony<usize> = (0..32).collect();
        assert_eq!(colony.block_count(), 2);

        colony.remove(7).unwrap();
        colony.insert_back(100);

        assert_eq!(colony.block_count(), 2);
        assert_eq!(colony.get_at(7), Ok(&100));
        check(&colony);
    }

    #[test]
    fn full_block_is_registered_once() {
        let mut colony: Colony<usize, 4> = (0..8).collect();
        assert!(colony.free_blocks.is_empty());

        colony.remove(0).unwrap();
        colony.remove(0).unwrap();
        colony.remove(0).unwrap();
        assert_eq!(colony.free_blocks, [0]);

        colony.remove(2).unwrap();
        assert_eq!(colony.free_blocks, [0, 1]);
        check(&colony);
    }

    #[test]
    fn stability() {
        let mut colony: Colony<usize, 8> = (0..20).collect();
        let address = colony.get_at(10).unwrap() as *const usize;

        for i in 0..100 {
            colony.insert_back(1_000 + i);
        }

        for _ in 0..10 {
            colony.remove(0).unwrap();
        }

        for index in (1..colony.len()).rev().step_by(3) {
            colony.remove(index).unwrap();
        }

        assert_eq!(colony.get_at(0), Ok(&10));
        assert_eq!(colony.get_at(0).unwrap() as *const usize, address);
        check(&colony);
    }

    #[test]
    fn remove_all_forward() {
        for &size in SIZES {
            let mut colony: Colony<usize> = (0..size).collect();

            for i in 0..size {
                assert_eq!(colony.remove(0), Ok(i));
            }

            assert!(colony.is_empty());
            check(&colony);
        }
    }

    #[test]
    fn remove_all_backward() {
        for &size in SIZES {
            let mut colony: Colony<usize> = (0..size).collect();

            for i in (0..size).rev() {
                assert_eq!(colony.remove(i), Ok(i));
            }

            assert!(colony.is_empty());
            check(&colony);
        }
    }

    #[test]
    fn drops() {
        for &size in SIZES {
            let arc = Arc::new(());
            let mut colony: Colony<Arc<()>> = Colony::new();

            for _ in 0..size {
                colony.insert_back(arc.clone());
            }

            assert_eq!(Arc::strong_count(&arc), size + 1);

            for index in (0..size).step_by(2).rev() {
                drop(colony.remove(index).unwrap());
            }

            assert_eq!(Arc::strong_count(&arc), size / 2 + 1);
            drop(colony);
            assert_eq!(Arc::strong_count(&arc), 1);
        }
    }

    #[test]
    fn into_iter_drops_rest() {
        let arc = Arc::new(());
        let mut colony: Colony<Arc<()>, 4> = (0..10).map(|_| arc.clone()).collect();
        colony.remove(3).unwrap();
        colony.remove(3).unwrap();

        let mut iter = colony.into_iter();
        assert_eq!(iter.len(), 8);
        iter.next();
        iter.next();
        assert_eq!(Arc::strong_count(&arc), 7);

        drop(iter);
        assert_eq!(Arc::strong_count(&arc), 1);
    }

    #[test]
    fn into_iter_order() {
        let mut colony: Colony<usize, 4> = (0..10).collect();
        colony.remove(4).unwrap();
        colony.remove(0).unwrap();

        let values: Vec<usize> = colony.into_iter().collect();
        assert_eq!(values, [1, 2, 3, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn iter_mut() {
        let mut colony: Colony<usize, 4> = (0..10).collect();
        colony.remove(1).unwrap();

        for value in &mut colony {
            *value += 1;
        }

        let values: Vec<usize> = colony.iter().copied().collect();
        assert_eq!(values, [1, 3, 4, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn iter_is_restartable() {
        let colony: Colony<usize, 4> = (0..10).collect();
        let mut iter = colony.iter();
        iter.nth(4);

        let rest = iter.clone();
        assert!(Iterator::eq(iter, rest));
        assert!(Iterator::eq(colony.iter().copied(), 0..10));
    }

    #[test]
    fn clear() {
        let arc = Arc::new(());
        let mut colony: Colony<Arc<()>, 4> = (0..10).map(|_| arc.clone()).collect();

        colony.clear();
        assert_eq!(Arc::strong_count(&arc), 1);
        assert_eq!(colony.block_count(), 3);
        check(&colony);

        for _ in 0..12 {
            colony.insert_back(arc.clone());
        }

        assert_eq!(colony.block_count(), 3);
        check(&colony);
    }

    #[test]
    fn reserve_fills_existing_blocks_first() {
        let mut colony: Colony<usize, 4> = (0..2).collect();
        colony.reserve(10);

        assert_eq!(colony.block_count(), 3);

        colony.insert_back(2);
        colony.insert_back(3);

        assert_eq!(colony.block(0).map(|block| block.is_full()), Some(true));
        assert!(colony.block(1).is_some_and(|block| block.is_empty()));
        check(&colony);
    }

    #[test]
    fn large_reserve_keeps_fill_order() {
        let mut colony: Colony<usize> = (0..40).collect();
        colony.remove(3).unwrap();
        assert_eq!(colony.free_blocks, [2, 0]);

        colony.reserve(10_000);
        assert_eq!(colony.block_count(), 628);
        assert_eq!(colony.free_blocks.len(), 627);
        assert_eq!(colony.free_blocks[0], 627);
        assert_eq!(colony.free_blocks[624..], [3, 2, 0]);
        check(&colony);

        for value in 1_000..11_000 {
            colony.insert_back(value);
        }

        assert_eq!(colony.block_count(), 628);
        assert_eq!(colony.get_at(3), Ok(&1_000));
        assert!(Iterator::eq(colony.iter().skip(40).take(8).copied(), 1_001..1_009));
        assert!(Iterator::eq(colony.iter().skip(48).copied(), 1_009..11_000));
        check(&colony);
    }

    #[test]
    fn reserve_within_capacity_allocates_nothing() {
        let mut colony: Colony<usize, 4> = (0..5).collect();
        colony.reserve(3);

        assert_eq!(colony.block_count(), 2);
        assert_eq!(colony.free_blocks, [1]);
    }

    #[test]
    fn clone_compacts() {
        let mut colony: Colony<usize, 4> = (0..12).collect();

        for _ in 0..4 {
            colony.remove(2).unwrap();
        }

        let clone = colony.clone();
        assert_eq!(clone.block_count(), 2);
        assert!(Iterator::eq(clone.iter(), colony.iter()));
    }

    #[test]
    fn debug() {
        let mut colony: Colony<usize, 4> = (0..6).collect();
        colony.remove(2).unwrap();

        assert_eq!(format!("{colony:?}"), "[0, 1, 3, 4, 5]");
        assert_eq!(format!("{:?}", colony.iter_mut()), "[0, 1, 3, 4, 5]");
    }
}
