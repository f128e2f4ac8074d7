use std::fmt::{self, Debug, Formatter};

const NONE: u32 = u32::MAX;

/// An optional cell index, packed into a `u32` so it fits beside small elements in a vacant cell.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct IndexOpt {
    value: u32,
}

impl IndexOpt {
    pub const fn none() -> Self {
        Self { value: NONE }
    }

    // Preconditions:
    // * value < MAX_BLOCK_CAPACITY
    pub fn some(value: usize) -> Self {
        debug_assert!(value < NONE as usize);
        Self {
            value: value as u32,
        }
    }

    pub fn as_opt(&self) -> Option<usize> {
        if self.value != NONE {
            Some(self.value as usize)
        } else {
            None
        }
    }
}

impl Debug for IndexOpt {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Debug::fmt(&self.as_opt(), f)
    }
}
