//! K-fold generators: plain, repeated, nested, grouped, stratified

use super::{
    blocks_to_partitions, distinct_sorted, fold_blocks, shuffled_indices, stream_rng, Partition,
};
use crate::dataset::Dataset;
use crate::error::{FoldwiseError, Result};
use rand::seq::SliceRandom;
use std::collections::HashMap;

fn check_fold_count(n: usize, folds: usize) -> Result<()> {
    if n < folds {
        return Err(FoldwiseError::Config(format!(
            "cannot split {} rows into {} folds",
            n, folds
        )));
    }
    Ok(())
}

pub fn cv(n: usize, folds: usize, seed: u64) -> Result<Vec<Partition>> {
    check_fold_count(n, folds)?;
    let mut rng = stream_rng(seed, 0);
    let indices = shuffled_indices(n, &mut rng);
    Ok(blocks_to_partitions(fold_blocks(&indices, folds), 0))
}

pub fn repeated_cv(n: usize, folds: usize, repeats: usize, seed: u64) -> Result<Vec<Partition>> {
    check_fold_count(n, folds)?;
    let mut partitions = Vec::with_capacity(folds * repeats);
    for rep in 0..repeats {
        let mut rng = stream_rng(seed, rep as u64);
        let indices = shuffled_indices(n, &mut rng);
        partitions.extend(blocks_to_partitions(
            fold_blocks(&indices, folds),
            rep * folds,
        ));
    }
    Ok(partitions)
}

/// Nested cross-validation layout.
///
/// Per repeat: a fresh fold assignment; for each outer fold k, one outer
/// partition (train = the other K-1 folds, test = fold k) followed by a
/// (K-1)-fold inner CV over the outer training block. Iteration order is
/// repeat-major, then outer fold, then [outer, inner...].
pub fn nested_cv(n: usize, folds: usize, repeats: usize, seed: u64) -> Result<Vec<Partition>> {
    check_fold_count(n, folds)?;
    // Inner CV needs each of the K-1 inner folds non-empty
    if n < folds * 2 {
        return Err(FoldwiseError::Config(format!(
            "nested CV with {} folds needs at least {} rows, got {}",
            folds,
            folds * 2,
            n
        )));
    }

    let mut partitions = Vec::with_capacity(repeats * folds * folds);
    let mut iteration = 0;

    for rep in 0..repeats {
        let mut rng = stream_rng(seed, rep as u64);
        let indices = shuffled_indices(n, &mut rng);
        let blocks = fold_blocks(&indices, folds);

        for outer in 0..folds {
            let outer_test = blocks[outer].clone();
            let outer_train: Vec<usize> = blocks
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != outer)
                .flat_map(|(_, b)| b.iter().copied())
                .collect();

            partitions.push(Partition {
                train: outer_train.clone(),
                test: outer_test,
                iteration,
            });
            iteration += 1;

            // Inner (K-1)-fold CV on the outer training block, re-randomized
            let mut inner_rng = stream_rng(seed, ((rep * folds + outer) as u64) | (1 << 63));
            let mut inner_indices = outer_train;
            inner_indices.shuffle(&mut inner_rng);
            let inner_blocks = fold_blocks(&inner_indices, folds - 1);

            for inner in 0..folds - 1 {
                let test = inner_blocks[inner].clone();
                let train: Vec<usize> = inner_blocks
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != inner)
                    .flat_map(|(_, b)| b.iter().copied())
                    .collect();
                partitions.push(Partition {
                    train,
                    test,
                    iteration,
                });
                iteration += 1;
            }
        }
    }

    Ok(partitions)
}

/// Grouped K-fold: whole groups assigned to folds, balancing fold sizes by
/// assigning the largest groups first to the currently smallest fold.
pub fn grouped_cv(data: &Dataset, folds: usize, seed: u64) -> Result<Vec<Partition>> {
    let groups = data.groups().ok_or_else(|| {
        FoldwiseError::Data("grouped CV requires a grouping column".to_string())
    })?;

    let unique = distinct_sorted(groups);
    if unique.len() < folds {
        return Err(FoldwiseError::Config(format!(
            "number of groups ({}) must be at least the number of folds ({})",
            unique.len(),
            folds
        )));
    }

    let mut rows_per_group: HashMap<i64, Vec<usize>> = HashMap::new();
    for (row, &g) in groups.iter().enumerate() {
        rows_per_group.entry(g).or_default().push(row);
    }

    // Shuffle groups for a seeded tie-break, then greedy size balancing
    let mut order = unique.clone();
    let mut rng = stream_rng(seed, 0);
    order.shuffle(&mut rng);
    order.sort_by_key(|g| std::cmp::Reverse(rows_per_group[g].len()));

    let mut blocks: Vec<Vec<usize>> = vec![Vec::new(); folds];
    for g in order {
        let smallest = (0..folds).min_by_key(|&f| blocks[f].len()).unwrap_or(0);
        blocks[smallest].extend(rows_per_group[&g].iter().copied());
    }

    if blocks.iter().any(|b| b.is_empty()) {
        return Err(FoldwiseError::Config(
            "group assignment produced an empty fold".to_string(),
        ));
    }

    Ok(blocks_to_partitions(blocks, 0))
}

/// Stratified K-fold: rows of each stratum distributed round-robin across
/// folds so class proportions are preserved.
pub fn stratified_cv(data: &Dataset, folds: usize, seed: u64) -> Result<Vec<Partition>> {
    let strata = data.strata().ok_or_else(|| {
        FoldwiseError::Data("stratified CV requires a strata column".to_string())
    })?;
    check_fold_count(data.n_rows(), folds)?;

    let mut rows_per_class: HashMap<i64, Vec<usize>> = HashMap::new();
    for (row, &class) in strata.iter().enumerate() {
        rows_per_class.entry(class).or_default().push(row);
    }

    let mut rng = stream_rng(seed, 0);
    let mut blocks: Vec<Vec<usize>> = vec![Vec::new(); folds];

    // Iterate classes in sorted order for determinism
    let mut classes: Vec<(i64, Vec<usize>)> = rows_per_class.into_iter().collect();
    classes.sort_unstable_by_key(|(class, _)| *class);
    for (_, mut rows) in classes {
        rows.shuffle(&mut rng);
        for (i, &row) in rows.iter().enumerate() {
            blocks[i % folds].push(row);
        }
    }

    if blocks.iter().any(|b| b.is_empty()) {
        return Err(FoldwiseError::Config(format!(
            "{} folds cannot all be filled from {} rows",
            folds,
            data.n_rows()
        )));
    }

    Ok(blocks_to_partitions(blocks, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn toy(n: usize) -> Dataset {
        let x = Array2::from_shape_fn((n, 1), |(i, _)| i as f64);
        let y = Array1::from_shape_fn(n, |i| (i % 2) as f64);
        Dataset::new(x, y).unwrap()
    }

    #[test]
    fn test_cv_is_a_partition_of_rows() {
        let parts = cv(103, 5, 42).unwrap();
        assert_eq!(parts.len(), 5);
        let mut all_test: Vec<usize> = parts.iter().flat_map(|p| p.test.clone()).collect();
        all_test.sort_unstable();
        assert_eq!(all_test, (0..103).collect::<Vec<_>>());
        for p in &parts {
            assert_eq!(p.train.len() + p.test.len(), 103);
        }
    }

    #[test]
    fn test_cv_too_few_rows() {
        assert!(cv(3, 5, 1).is_err());
    }

    #[test]
    fn test_repeated_cv_re_randomizes() {
        let parts = repeated_cv(40, 4, 3, 9).unwrap();
        assert_eq!(parts.len(), 12);
        // Fold assignment differs between repeats
        assert_ne!(parts[0].test, parts[4].test);
        // Iterations are sequential
        for (i, p) in parts.iter().enumerate() {
            assert_eq!(p.iteration, i);
        }
    }

    #[test]
    fn test_nested_cv_layout() {
        let folds = 3;
        let repeats = 2;
        let parts = nested_cv(30, folds, repeats, 5).unwrap();
        assert_eq!(parts.len(), repeats * folds * folds);

        // Every inner partition lives inside its outer training block
        let block = folds; // per outer fold: 1 outer + (folds - 1) inner
        for rep in 0..repeats {
            for outer in 0..folds {
                let base = rep * folds * block + outer * block;
                let outer_part = &parts[base];
                let outer_train: std::collections::HashSet<usize> =
                    outer_part.train.iter().copied().collect();
                for inner in &parts[base + 1..base + block] {
                    assert!(inner.train.iter().all(|i| outer_train.contains(i)));
                    assert!(inner.test.iter().all(|i| outer_train.contains(i)));
                }
            }
        }
    }

    #[test]
    fn test_grouped_cv_never_splits_a_group() {
        let groups: Vec<i64> = (0..24).map(|i| (i / 4) as i64).collect(); // 6 groups of 4
        let data = toy(24).with_groups(groups.clone()).unwrap();
        let parts = grouped_cv(&data, 3, 17).unwrap();
        assert_eq!(parts.len(), 3);

        for p in &parts {
            let test_groups: std::collections::HashSet<i64> =
                p.test.iter().map(|&i| groups[i]).collect();
            // No training row may belong to a test group
            assert!(p.train.iter().all(|&i| !test_groups.contains(&groups[i])));
        }
    }

    #[test]
    fn test_grouped_cv_requires_column() {
        let data = toy(10);
        assert!(matches!(
            grouped_cv(&data, 2, 1),
            Err(FoldwiseError::Data(_))
        ));
    }

    #[test]
    fn test_grouped_cv_too_few_groups() {
        let data = toy(10).with_groups(vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1]).unwrap();
        assert!(grouped_cv(&data, 3, 1).is_err());
    }

    #[test]
    fn test_stratified_cv_preserves_proportions() {
        // 20 rows, 10 of each class
        let strata: Vec<i64> = (0..20).map(|i| (i % 2) as i64).collect();
        let data = toy(20).with_strata(strata.clone()).unwrap();
        let parts = stratified_cv(&data, 5, 3).unwrap();

        for p in &parts {
            let ones = p.test.iter().filter(|&&i| strata[i] == 1).count();
            assert_eq!(p.test.len(), 4);
            assert_eq!(ones, 2, "each fold should hold two rows of each class");
        }
    }
}
