/// A single entry of a block's skipfield.
///
/// [`UNSKIPPED`] marks a cell that is not part of a dead run. Any other value is the number of consecutive dead
/// cells following this one before the run ends at a live cell or the end of the block.
pub type SkipfieldElement = i32;

/// The skipfield value of a live (or never used) cell.
pub const UNSKIPPED: SkipfieldElement = -1;

/// The largest block capacity whose run lengths fit in a [`SkipfieldElement`].
pub const MAX_BLOCK_CAPACITY: usize = SkipfieldElement::MAX as usize;

/// The number of cells a scan passes over when it arrives at a cell with this skipfield value.
pub fn run_length(element: SkipfieldElement) -> usize {
    if element == UNSKIPPED {
        0
    } else {
        element as usize + 1
    }
}

// For a maximal dead run [i, i + k), field[i..i + k] holds k - 1, k - 2, ..., 0
#[derive(Clone)]
pub struct Skipfield<const N: usize> {
    field: [SkipfieldElement; N],
}

impl<const N: usize> Skipfield<N> {
    pub fn new() -> Self {
        Self {
            field: [UNSKIPPED; N],
        }
    }

    pub fn as_slice(&self) -> &[SkipfieldElement] {
        &self.field
    }

    pub fn reset(&mut self) {
        self.field = [UNSKIPPED; N];
    }

    fn is_skipped(&self, index: usize) -> bool {
        self.field[index] != UNSKIPPED
    }

    // Preconditions:
    // * index < N and the cell at index has just become dead
    pub fn skip(&mut self, index: usize) {
        let mut run = match self.field.get(index + 1) {
            Some(&next) if next != UNSKIPPED => next + 1,
            _ => 0,
        };

        self.field[index] = run;

        let mut index = index;

        while index > 0 && self.is_skipped(index - 1) {
            index -= 1;
            run += 1;
            self.field[index] = run;
        }
    }

    // Preconditions:
    // * index < N and the cell at index has just become live
    pub fn unskip(&mut self, index: usize) {
        self.field[index] = UNSKIPPED;

        let mut index = index;
        let mut run = 0;

        while index > 0 && self.is_skipped(index - 1) {
            index -= 1;

            if self.field[index] == run {
                break;
            }

            self.field[index] = run;
            run += 1;
        }
    }

    // Preconditions:
    // * at least nth + 1 live cells precede the first never used cell
    pub fn find_live(&self, nth: usize) -> usize {
        let mut index = 0;
        let mut remaining = nth;

        loop {
            index += run_length(self.field[index]);

            if remaining == 0 {
                return index;
            }

            remaining -= 1;
            index += 1;
        }
    }
}
