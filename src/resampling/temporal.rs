//! Temporally ordered splits for drifting data
//!
//! Rows are assumed to be in time order. Training always precedes testing,
//! with an optional gap between them, so a model is never scored on
//! observations older than its training data.

use super::Partition;
use crate::error::{FoldwiseError, Result};

/// Growing-window forward chaining: fold i trains on everything before the
/// i-th test block (minus `gap` rows) and tests on the block itself.
pub fn forward_chaining(n: usize, folds: usize, gap: usize) -> Result<Vec<Partition>> {
    let test_size = n / (folds + 1);
    if test_size == 0 {
        return Err(FoldwiseError::Config(format!(
            "{} rows cannot support {} forward-chaining folds",
            n, folds
        )));
    }

    let mut partitions = Vec::with_capacity(folds);
    for fold in 0..folds {
        let test_start = (fold + 1) * test_size;
        let test_end = if fold == folds - 1 {
            n
        } else {
            test_start + test_size
        };
        let train_end = test_start.saturating_sub(gap);

        if train_end == 0 {
            return Err(FoldwiseError::Config(format!(
                "gap {} leaves fold {} with an empty train set",
                gap, fold
            )));
        }

        partitions.push(Partition {
            train: (0..train_end).collect(),
            test: (test_start..test_end).collect(),
            iteration: fold,
        });
    }
    Ok(partitions)
}
