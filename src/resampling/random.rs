//! Random-split generators: holdout, subsampling, paired subsampling

use super::{shuffled_indices, stream_rng, Partition};
use crate::error::{FoldwiseError, Result};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

/// Split row indices into (train, test) with |train| = round(ratio * n).
fn split_once(n: usize, ratio: f64, rng: &mut ChaCha8Rng) -> Result<(Vec<usize>, Vec<usize>)> {
    split_pool(&(0..n).collect::<Vec<_>>(), ratio, rng)
}

/// Holdout split within an arbitrary index pool.
fn split_pool(pool: &[usize], ratio: f64, rng: &mut ChaCha8Rng) -> Result<(Vec<usize>, Vec<usize>)> {
    let n = pool.len();
    let n_train = (ratio * n as f64).round() as usize;
    if n_train == 0 || n_train >= n {
        return Err(FoldwiseError::Config(format!(
            "ratio {} on {} rows leaves an empty train or test set",
            ratio, n
        )));
    }

    let mut indices = pool.to_vec();
    indices.shuffle(rng);

    let train = indices[..n_train].to_vec();
    let test = indices[n_train..].to_vec();
    Ok((train, test))
}

pub fn holdout(n: usize, ratio: f64, seed: u64) -> Result<Vec<Partition>> {
    let mut rng = stream_rng(seed, 0);
    let (train, test) = split_once(n, ratio, &mut rng)?;
    Ok(vec![Partition {
        train,
        test,
        iteration: 0,
    }])
}

pub fn subsampling(n: usize, ratio: f64, repeats: usize, seed: u64) -> Result<Vec<Partition>> {
    let mut partitions = Vec::with_capacity(repeats);
    for rep in 0..repeats {
        let mut rng = stream_rng(seed, rep as u64);
        let (train, test) = split_once(n, ratio, &mut rng)?;
        partitions.push(Partition {
            train,
            test,
            iteration: rep,
        });
    }
    Ok(partitions)
}

/// Nadeau-Bengio paired subsampling.
///
/// Per outer repetition: one subsample on the full data, then the rows are
/// shuffled into two disjoint halves and each half receives `repeats_in`
/// subsamples. Iteration order per repetition: full, half-A inner splits,
/// half-B inner splits.
pub fn paired_subsampling(
    n: usize,
    ratio: f64,
    repeats_in: usize,
    repeats_out: usize,
    seed: u64,
) -> Result<Vec<Partition>> {
    let half = n / 2;
    // Each half must itself support a non-degenerate holdout
    if half < 2 {
        return Err(FoldwiseError::Config(format!(
            "paired subsampling needs at least 4 rows, got {}",
            n
        )));
    }

    let block = 1 + 2 * repeats_in;
    let mut partitions = Vec::with_capacity(repeats_out * block);

    for outer in 0..repeats_out {
        let mut iteration = outer * block;

        // Full-data subsample feeding the point estimate
        let mut rng = stream_rng(seed, (outer * 4) as u64);
        let (train, test) = split_once(n, ratio, &mut rng)?;
        partitions.push(Partition {
            train,
            test,
            iteration,
        });
        iteration += 1;

        // Two disjoint halves
        let mut half_rng = stream_rng(seed, (outer * 4 + 1) as u64);
        let shuffled = shuffled_indices(n, &mut half_rng);
        let halves = [&shuffled[..half], &shuffled[half..half * 2]];

        for (side, pool) in halves.iter().enumerate() {
            let mut inner_rng = stream_rng(seed, (outer * 4 + 2 + side) as u64);
            for _ in 0..repeats_in {
                let (train, test) = split_pool(pool, ratio, &mut inner_rng)?;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holdout_sizes_and_disjointness() {
        let parts = holdout(100, 0.7, 42).unwrap();
        assert_eq!(parts.len(), 1);
        let p = &parts[0];
        assert_eq!(p.train.len(), 70);
        assert_eq!(p.test.len(), 30);
        assert!(p.train.iter().all(|i| !p.test.contains(i)));
    }

    #[test]
    fn test_holdout_rounding() {
        // round(0.5 * 5) = 3 (round half away from zero)
        let parts = holdout(5, 0.5, 1).unwrap();
        assert_eq!(parts[0].train.len(), 3);
        assert_eq!(parts[0].test.len(), 2);
    }

    #[test]
    fn test_holdout_degenerate_ratio_fails() {
        // round(0.01 * 10) = 0 -> empty train
        assert!(holdout(10, 0.01, 1).is_err());
        assert!(holdout(10, 0.99, 1).is_err());
    }

    #[test]
    fn test_subsampling_repeats_are_independent() {
        let parts = subsampling(50, 0.8, 5, 7).unwrap();
        assert_eq!(parts.len(), 5);
        // Different repeats should not all produce the same split
        assert!(parts.windows(2).any(|w| w[0].train != w[1].train));
        // Same seed reproduces
        let again = subsampling(50, 0.8, 5, 7).unwrap();
        assert_eq!(parts, again);
    }

    #[test]
    fn test_paired_subsampling_layout() {
        let repeats_in = 3;
        let repeats_out = 2;
        let parts = paired_subsampling(40, 0.9, repeats_in, repeats_out, 11).unwrap();
        assert_eq!(parts.len(), repeats_out * (1 + 2 * repeats_in));

        let block = 1 + 2 * repeats_in;
        for outer in 0..repeats_out {
            let full = &parts[outer * block];
            // Full-data subsample spans all 40 rows
            assert_eq!(full.train.len() + full.test.len(), 40);

            // Inner splits each live inside a disjoint half of 20 rows
            let half_a: Vec<&Partition> =
                parts[outer * block + 1..outer * block + 1 + repeats_in].iter().collect();
            let half_b: Vec<&Partition> = parts
                [outer * block + 1 + repeats_in..outer * block + block]
                .iter()
                .collect();
            for p in &half_a {
                assert_eq!(p.train.len() + p.test.len(), 20);
            }
            // The two halves never share a row
            let rows_a: std::collections::HashSet<usize> = half_a[0]
                .train
                .iter()
                .chain(half_a[0].test.iter())
                .copied()
                .collect();
            for p in &half_b {
                assert!(p.train.iter().chain(p.test.iter()).all(|i| !rows_a.contains(i)));
            }
        }
    }

    #[test]
    fn test_paired_subsampling_too_small() {
        assert!(paired_subsampling(3, 0.5, 2, 2, 1).is_err());
    }
}
