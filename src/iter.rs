use std::fmt::{Debug, Formatter};
use std::iter::FusedIterator;
use std::{fmt, slice, vec};

use crate::block::Block;
use crate::cell::Cell;
use crate::skipfield::{run_length, SkipfieldElement};
use crate::Colony;

// Walks a block's skipfield, yielding how many cells to pass over before each live cell
#[derive(Clone)]
struct SkipCursor<'a> {
    skipfield: &'a [SkipfieldElement],
    remaining: usize,
}

impl<'a> SkipCursor<'a> {
    fn new(skipfield: &'a [SkipfieldElement], remaining: usize) -> Self {
        Self {
            skipfield,
            remaining,
        }
    }

    fn advance(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }

        let jump = run_length(*self.skipfield.first()?);
        self.skipfield = self.skipfield.get(jump + 1..)?;
        self.remaining -= 1;

        Some(jump)
    }
}

/// An iterator over the live elements of a [`Block`], in slot order.
///
/// Dead runs are passed over in a single step using the block's skipfield.
pub struct BlockIter<'a, T> {
    cells: slice::Iter<'a, Cell<T>>,
    cursor: SkipCursor<'a>,
}

impl<'a, T> BlockIter<'a, T> {
    pub(super) fn new(cells: &'a [Cell<T>], skipfield: &'a [SkipfieldElement], len: usize) -> Self {
        Self {
            cells: cells.iter(),
            cursor: SkipCursor::new(skipfield, len),
        }
    }

    fn empty() -> Self {
        Self::new(&[], &[], 0)
    }
}

impl<'a, T> Iterator for BlockIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let jump = self.cursor.advance()?;
        self.cells.nth(jump)?.get()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.cursor.remaining, Some(self.cursor.remaining))
    }
}

impl<'a, T> FusedIterator for BlockIter<'a, T> {}

impl<'a, T> ExactSizeIterator for BlockIter<'a, T> {}

impl<'a, T> Clone for BlockIter<'a, T> {
    fn clone(&self) -> Self {
        Self {
            cells: self.cells.clone(),
            cursor: self.cursor.clone(),
        }
    }
}

impl<'a, T: Debug> Debug for BlockIter<'a, T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

/// An iterator over the live elements of a [`Block`], in slot order, by mutable reference.
pub struct BlockIterMut<'a, T> {
    cells: slice::IterMut<'a, Cell<T>>,
    cursor: SkipCursor<'a>,
}

impl<'a, T> BlockIterMut<'a, T> {
    pub(super) fn new(
        cells: &'a mut [Cell<T>],
        skipfield: &'a [SkipfieldElement],
        len: usize,
    ) -> Self {
        Self {
            cells: cells.iter_mut(),
            cursor: SkipCursor::new(skipfield, len),
        }
    }

    fn empty() -> Self {
        Self::new(&mut [], &[], 0)
    }

    fn reborrow(&self) -> BlockIter<'_, T> {
        BlockIter {
            cells: self.cells.as_slice().iter(),
            cursor: self.cursor.clone(),
        }
    }
}

impl<'a, T> Iterator for BlockIterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<&'a mut T> {
        let jump = self.cursor.advance()?;
        self.cells.nth(jump)?.get_mut()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.cursor.remaining, Some(self.cursor.remaining))
    }
}

impl<'a, T> FusedIterator for BlockIterMut<'a, T> {}

impl<'a, T> ExactSizeIterator for BlockIterMut<'a, T> {}

impl<'a, T: Debug> Debug for BlockIterMut<'a, T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_list().entries(self.reborrow()).finish()
    }
}

/// An iterator over the elements of a [`Colony`], in block arrival order and then slot order.
///
/// Created by [`Colony::iter`].
pub struct Iter<'a, T, const N: usize> {
    blocks: slice::Iter<'a, Block<T, N>>,
    current: BlockIter<'a, T>,
    len: usize,
}

impl<'a, T, const N: usize> Iter<'a, T, N> {
    pub(super) fn new(colony: &'a Colony<T, N>) -> Self {
        Self {
            blocks: colony.blocks.iter(),
            current: BlockIter::empty(),
            len: colony.len,
        }
    }
}

impl<'a, T, const N: usize> Iterator for Iter<'a, T, N> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.len == 0 {
            return None;
        }

        loop {
            if let Some(value) = self.current.next() {
                self.len -= 1;
                return Some(value);
            }

            self.current = self.blocks.next()?.iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, T, const N: usize> FusedIterator for Iter<'a, T, N> {}

impl<'a, T, const N: usize> ExactSizeIterator for Iter<'a, T, N> {}

impl<'a, T, const N: usize> Clone for Iter<'a, T, N> {
    fn clone(&self) -> Self {
        Self {
            blocks: self.blocks.clone(),
            current: self.current.clone(),
            len: self.len,
        }
    }
}

impl<'a, T: Debug, const N: usize> Debug for Iter<'a, T, N> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

/// An iterator over the elements of a [`Colony`] by mutable reference.
///
/// Created by [`Colony::iter_mut`].
pub struct IterMut<'a, T, const N: usize> {
    blocks: slice::IterMut<'a, Block<T, N>>,
    current: BlockIterMut<'a, T>,
    len: usize,
}

impl<'a, T, const N: usize> IterMut<'a, T, N> {
    pub(super) fn new(colony: &'a mut Colony<T, N>) -> Self {
        Self {
            blocks: colony.blocks.iter_mut(),
            current: BlockIterMut::empty(),
            len: colony.len,
        }
    }
}

impl<'a, T, const N: usize> Iterator for IterMut<'a, T, N> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<&'a mut T> {
        if self.len == 0 {
            return None;
        }

        loop {
            if let Some(value) = self.current.next() {
                self.len -= 1;
                return Some(value);
            }

            self.current = self.blocks.next()?.iter_mut();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, T, const N: usize> FusedIterator for IterMut<'a, T, N> {}

impl<'a, T, const N: usize> ExactSizeIterator for IterMut<'a, T, N> {}

impl<'a, T: Debug, const N: usize> Debug for IterMut<'a, T, N> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let rest = self.blocks.as_slice().iter().flat_map(Block::iter);
        f.debug_list()
            .entries(self.current.reborrow().chain(rest))
            .finish()
    }
}

/// An owning iterator over the elements of a [`Colony`].
///
/// Created by the [`IntoIterator`] implementation of [`Colony`].
/// Elements not yielded are dropped along with the iterator.
pub struct IntoIter<T, const N: usize> {
    blocks: vec::IntoIter<Block<T, N>>,
    current: vec::IntoIter<Cell<T>>,
    len: usize,
}

impl<T, const N: usize> IntoIter<T, N> {
    pub(super) fn new(colony: Colony<T, N>) -> Self {
        Self {
            len: colony.len,
            blocks: colony.blocks.into_iter(),
            current: Vec::new().into_iter(),
        }
    }
}

impl<T, const N: usize> Iterator for IntoIter<T, N> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }

        loop {
            if let Some(value) = self.current.by_ref().find_map(Cell::into_inner) {
                self.len -= 1;
                return Some(value);
            }

            self.current = self.blocks.next()?.into_cells().into_vec().into_iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<T, const N: usize> FusedIterator for IntoIter<T, N> {}

impl<T, const N: usize> ExactSizeIterator for IntoIter<T, N> {}

impl<T, const N: usize> Debug for IntoIter<T, N> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("IntoIter").field("len", &self.len).finish()
    }
}

/// An iterator over the blocks of a [`Colony`] in arrival order.
///
/// Created by [`Colony::blocks`].
pub struct Blocks<'a, T, const N: usize> {
    inner: slice::Iter<'a, Block<T, N>>,
}

impl<'a, T, const N: usize> Blocks<'a, T, N> {
    pub(super) fn new(blocks: &'a [Block<T, N>]) -> Self {
        Self {
            inner: blocks.iter(),
        }
    }
}

impl<'a, T, const N: usize> Iterator for Blocks<'a, T, N> {
    type Item = &'a Block<T, N>;

    fn next(&mut self) -> Option<&'a Block<T, N>> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, T, const N: usize> FusedIterator for Blocks<'a, T, N> {}

impl<'a, T, const N: usize> ExactSizeIterator for Blocks<'a, T, N> {}

impl<'a, T, const N: usize> Clone for Blocks<'a, T, N> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, T: Debug, const N: usize> Debug for Blocks<'a, T, N> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}
