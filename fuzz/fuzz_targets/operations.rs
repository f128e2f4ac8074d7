#![no_main]

use block_colony::{Colony, ColonyError};
use libfuzzer_sys::arbitrary::Arbitrary;
use libfuzzer_sys::{arbitrary, fuzz_target};

#[derive(Arbitrary, Debug)]
enum Operation {
    Insert,
    Remove(u16),
    Get(u16),
    Clear,
}

// Every inserted value is unique, so the model can find where an insertion landed
fuzz_target!(|operations: Vec<Operation>| {
    let mut colony: Colony<u32, 4> = Colony::default();
    let mut model: Vec<u32> = Vec::new();
    let mut next_value = 0;

    for operation in operations {
        match operation {
            Operation::Insert => {
                let value = next_value;
                next_value += 1;

                colony.insert_back(value);

                let at = colony.iter().position(|&v| v == value).unwrap();
                model.insert(at, value);
            }
            Operation::Remove(index) => {
                let index = index as usize;

                if index < model.len() {
                    assert_eq!(colony.remove(index), Ok(model.remove(index)));
                } else {
                    assert_eq!(
                        colony.remove(index),
                        Err(ColonyError::OutOfRange { index, len: model.len() })
                    );
                }
            }
            Operation::Get(index) => {
                let index = index as usize;
                assert_eq!(colony.get(index), model.get(index));
            }
            Operation::Clear => {
                colony.clear();
                model.clear();
            }
        }

        assert_eq!(colony.len(), model.len());
    }

    assert!(Iterator::eq(colony.iter(), model.iter()));
    assert!(Iterator::eq(colony.into_iter(), model.into_iter()));
});
