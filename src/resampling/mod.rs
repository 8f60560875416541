//! Resampling schemes: named configurations producing train/test partitions
//!
//! A [`Resampling`] value is a scheme kind plus its parameters. Instantiating
//! it against a dataset and a seed fixes the random partitions for one
//! experiment; the resulting [`ResamplingPlan`] is an ordered, finite
//! sequence of [`Partition`]s whose length always equals the scheme's
//! declared iteration count.
//!
//! All randomness flows from the single top-level seed through
//! [`derive_seed`], so re-instantiating a scheme with the same seed and
//! dataset reproduces bit-identical partitions.

mod kfold;
mod random;
mod spatial;
mod temporal;

use crate::dataset::Dataset;
use crate::error::{FoldwiseError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A single train/test split. Indices reference the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
    /// Position in the scheme's iteration order.
    pub iteration: usize,
}

/// Scheme-kind tag used by the method dispatcher's strategy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemeKind {
    Holdout,
    Subsampling,
    PairedSubsampling,
    Cv,
    RepeatedCv,
    NestedCv,
    GroupedCv,
    StratifiedCv,
    SpatialTiled,
    SpatialBlockRandom,
    SpatialCoordCluster,
    CovariateCluster,
    SpatialDisc,
    LeaveOneUnitOut,
    ForwardChaining,
}

impl std::fmt::Display for SchemeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A resampling scheme: kind + parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Resampling {
    /// Single random split; train gets `ratio` of the rows.
    Holdout { ratio: f64 },
    /// `repeats` independent holdout splits.
    Subsampling { ratio: f64, repeats: usize },
    /// Nadeau-Bengio paired subsampling: per outer repetition, one
    /// subsample on the full data plus `repeats_in` subsamples inside each
    /// of two disjoint halves. Defaults (15, 10) give 315 iterations.
    PairedSubsampling {
        ratio: f64,
        repeats_in: usize,
        repeats_out: usize,
    },
    /// K-fold cross-validation.
    Cv { folds: usize },
    /// `repeats` independent K-fold instantiations.
    RepeatedCv { folds: usize, repeats: usize },
    /// Per repeat: K outer folds, each followed by an inner (K-1)-fold CV
    /// on the outer training block. repeats x folds^2 iterations.
    NestedCv { folds: usize, repeats: usize },
    /// K-fold where whole groups stay within one fold.
    GroupedCv { folds: usize },
    /// K-fold preserving class proportions from the strata column.
    StratifiedCv { folds: usize },
    /// Rectangular coordinate tiles, each tile tested once.
    SpatialTiled { rows: usize, cols: usize },
    /// Coordinate tiles randomly assigned to `folds` folds.
    SpatialBlockRandom {
        rows: usize,
        cols: usize,
        folds: usize,
    },
    /// K-means clusters of the coordinates as folds.
    SpatialCoordCluster { folds: usize },
    /// K-means clusters of the feature columns as folds.
    CovariateCluster { folds: usize },
    /// Per repeat: a random disc of radius `radius` is the test set; rows
    /// within `radius + buffer` of the center are excluded from training.
    SpatialDisc {
        radius: f64,
        buffer: f64,
        repeats: usize,
    },
    /// One fold per distinct unit in the grouping column.
    LeaveOneUnitOut,
    /// Temporally ordered growing-window splits with an optional gap.
    ForwardChaining { folds: usize, gap: usize },
}

impl Resampling {
    /// Paired subsampling with the Nadeau-Bengio default configuration
    /// (15 outer repetitions, 10 inner, 315 iterations).
    pub fn paired_subsampling(ratio: f64) -> Self {
        Resampling::PairedSubsampling {
            ratio,
            repeats_in: 10,
            repeats_out: 15,
        }
    }

    pub fn kind(&self) -> SchemeKind {
        match self {
            Resampling::Holdout { .. } => SchemeKind::Holdout,
            Resampling::Subsampling { .. } => SchemeKind::Subsampling,
            Resampling::PairedSubsampling { .. } => SchemeKind::PairedSubsampling,
            Resampling::Cv { .. } => SchemeKind::Cv,
            Resampling::RepeatedCv { .. } => SchemeKind::RepeatedCv,
            Resampling::NestedCv { .. } => SchemeKind::NestedCv,
            Resampling::GroupedCv { .. } => SchemeKind::GroupedCv,
            Resampling::StratifiedCv { .. } => SchemeKind::StratifiedCv,
            Resampling::SpatialTiled { .. } => SchemeKind::SpatialTiled,
            Resampling::SpatialBlockRandom { .. } => SchemeKind::SpatialBlockRandom,
            Resampling::SpatialCoordCluster { .. } => SchemeKind::SpatialCoordCluster,
            Resampling::CovariateCluster { .. } => SchemeKind::CovariateCluster,
            Resampling::SpatialDisc { .. } => SchemeKind::SpatialDisc,
            Resampling::LeaveOneUnitOut => SchemeKind::LeaveOneUnitOut,
            Resampling::ForwardChaining { .. } => SchemeKind::ForwardChaining,
        }
    }

    /// Validate data-independent parameters.
    pub fn validate(&self) -> Result<()> {
        let ratio_ok = |ratio: f64| -> Result<()> {
            if !(ratio > 0.0 && ratio < 1.0) {
                return Err(FoldwiseError::Config(format!(
                    "ratio must lie in (0, 1), got {}",
                    ratio
                )));
            }
            Ok(())
        };
        let at_least = |value: usize, min: usize, name: &str| -> Result<()> {
            if value < min {
                return Err(FoldwiseError::Config(format!(
                    "{} must be at least {}, got {}",
                    name, min, value
                )));
            }
            Ok(())
        };

        match *self {
            Resampling::Holdout { ratio } => ratio_ok(ratio),
            Resampling::Subsampling { ratio, repeats } => {
                ratio_ok(ratio)?;
                at_least(repeats, 1, "repeats")
            }
            Resampling::PairedSubsampling {
                ratio,
                repeats_in,
                repeats_out,
            } => {
                ratio_ok(ratio)?;
                at_least(repeats_in, 1, "repeats_in")?;
                at_least(repeats_out, 1, "repeats_out")
            }
            Resampling::Cv { folds } => at_least(folds, 2, "folds"),
            Resampling::RepeatedCv { folds, repeats } => {
                at_least(folds, 2, "folds")?;
                at_least(repeats, 1, "repeats")
            }
            // The inner loop runs (folds - 1)-fold CV, which needs >= 2 folds
            Resampling::NestedCv { folds, repeats } => {
                at_least(folds, 3, "folds")?;
                at_least(repeats, 1, "repeats")
            }
            Resampling::GroupedCv { folds } => at_least(folds, 2, "folds"),
            Resampling::StratifiedCv { folds } => at_least(folds, 2, "folds"),
            Resampling::SpatialTiled { rows, cols } => {
                at_least(rows, 1, "rows")?;
                at_least(cols, 1, "cols")?;
                at_least(rows * cols, 2, "rows * cols")
            }
            Resampling::SpatialBlockRandom { rows, cols, folds } => {
                at_least(rows, 1, "rows")?;
                at_least(cols, 1, "cols")?;
                at_least(folds, 2, "folds")?;
                at_least(rows * cols, folds, "rows * cols")
            }
            Resampling::SpatialCoordCluster { folds } => at_least(folds, 2, "folds"),
            Resampling::CovariateCluster { folds } => at_least(folds, 2, "folds"),
            Resampling::SpatialDisc {
                radius,
                buffer,
                repeats,
            } => {
                if !(radius > 0.0) || !radius.is_finite() {
                    return Err(FoldwiseError::Config(format!(
                        "disc radius must be positive and finite, got {}",
                        radius
                    )));
                }
                if buffer < 0.0 || !buffer.is_finite() {
                    return Err(FoldwiseError::Config(format!(
                        "disc buffer must be non-negative and finite, got {}",
                        buffer
                    )));
                }
                at_least(repeats, 1, "repeats")
            }
            Resampling::LeaveOneUnitOut => Ok(()),
            Resampling::ForwardChaining { folds, gap: _ } => at_least(folds, 2, "folds"),
        }
    }

    /// Declared iteration count against a concrete dataset.
    pub fn iters(&self, data: &Dataset) -> Result<usize> {
        self.validate()?;
        Ok(match *self {
            Resampling::Holdout { .. } => 1,
            Resampling::Subsampling { repeats, .. } => repeats,
            Resampling::PairedSubsampling {
                repeats_in,
                repeats_out,
                ..
            } => repeats_out * (1 + 2 * repeats_in),
            Resampling::Cv { folds } => folds,
            Resampling::RepeatedCv { folds, repeats } => folds * repeats,
            Resampling::NestedCv { folds, repeats } => repeats * folds * folds,
            Resampling::GroupedCv { folds } => folds,
            Resampling::StratifiedCv { folds } => folds,
            Resampling::SpatialTiled { rows, cols } => {
                spatial::occupied_tiles(data, rows, cols)?.len()
            }
            Resampling::SpatialBlockRandom { folds, .. } => folds,
            Resampling::SpatialCoordCluster { folds } => folds,
            Resampling::CovariateCluster { folds } => folds,
            Resampling::SpatialDisc { repeats, .. } => repeats,
            Resampling::LeaveOneUnitOut => {
                let groups = data.groups().ok_or_else(|| {
                    FoldwiseError::Data(
                        "leave-one-unit-out requires a grouping column".to_string(),
                    )
                })?;
                distinct_sorted(groups).len()
            }
            Resampling::ForwardChaining { folds, .. } => folds,
        })
    }

    /// Instantiate the scheme against a dataset, fixing its random
    /// partitions for one experiment.
    pub fn instantiate(&self, data: &Dataset, seed: u64) -> Result<ResamplingPlan> {
        self.validate()?;
        let n = data.n_rows();

        let partitions = match *self {
            Resampling::Holdout { ratio } => random::holdout(n, ratio, seed)?,
            Resampling::Subsampling { ratio, repeats } => {
                random::subsampling(n, ratio, repeats, seed)?
            }
            Resampling::PairedSubsampling {
                ratio,
                repeats_in,
                repeats_out,
            } => random::paired_subsampling(n, ratio, repeats_in, repeats_out, seed)?,
            Resampling::Cv { folds } => kfold::cv(n, folds, seed)?,
            Resampling::RepeatedCv { folds, repeats } => {
                kfold::repeated_cv(n, folds, repeats, seed)?
            }
            Resampling::NestedCv { folds, repeats } => {
                kfold::nested_cv(n, folds, repeats, seed)?
            }
            Resampling::GroupedCv { folds } => kfold::grouped_cv(data, folds, seed)?,
            Resampling::StratifiedCv { folds } => kfold::stratified_cv(data, folds, seed)?,
            Resampling::SpatialTiled { rows, cols } => spatial::tiled(data, rows, cols)?,
            Resampling::SpatialBlockRandom { rows, cols, folds } => {
                spatial::block_random(data, rows, cols, folds, seed)?
            }
            Resampling::SpatialCoordCluster { folds } => {
                spatial::coord_cluster(data, folds, seed)?
            }
            Resampling::CovariateCluster { folds } => {
                spatial::covariate_cluster(data, folds, seed)?
            }
            Resampling::SpatialDisc {
                radius,
                buffer,
                repeats,
            } => spatial::disc(data, radius, buffer, repeats, seed)?,
            Resampling::LeaveOneUnitOut => spatial::leave_one_unit_out(data)?,
            Resampling::ForwardChaining { folds, gap } => temporal::forward_chaining(n, folds, gap)?,
        };

        let declared = self.iters(data)?;
        if partitions.len() != declared {
            return Err(FoldwiseError::Computation(format!(
                "scheme {} produced {} partitions, declared {}",
                self.kind(),
                partitions.len(),
                declared
            )));
        }
        for partition in &partitions {
            if partition.train.is_empty() || partition.test.is_empty() {
                return Err(FoldwiseError::Config(format!(
                    "scheme {} produced an empty train or test set at iteration {}",
                    self.kind(),
                    partition.iteration
                )));
            }
        }

        debug!(
            scheme = %self.kind(),
            iterations = partitions.len(),
            seed,
            "instantiated resampling scheme"
        );

        Ok(ResamplingPlan {
            scheme: self.clone(),
            seed,
            partitions,
        })
    }
}

/// A scheme instantiated against a dataset: the fixed partition sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResamplingPlan {
    pub scheme: Resampling,
    pub seed: u64,
    pub partitions: Vec<Partition>,
}

impl ResamplingPlan {
    pub fn iters(&self) -> usize {
        self.partitions.len()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Shared helpers
// ═══════════════════════════════════════════════════════════════════════════

/// Derive an independent stream seed from the top-level seed
/// (SplitMix64 finalizer over base + stream index).
pub fn derive_seed(base: u64, stream: u64) -> u64 {
    let mut z = base
        .wrapping_add(stream.wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seeded RNG for one randomness stream.
pub(crate) fn stream_rng(base: u64, stream: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(derive_seed(base, stream))
}

/// Shuffled row indices 0..n.
pub(crate) fn shuffled_indices(n: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices
}

/// Split shuffled indices into `k` near-equal contiguous blocks; the first
/// `n % k` blocks take the extra element.
pub(crate) fn fold_blocks(indices: &[usize], k: usize) -> Vec<Vec<usize>> {
    let n = indices.len();
    let base = n / k;
    let remainder = n % k;

    let mut blocks = Vec::with_capacity(k);
    let mut current = 0;
    for fold in 0..k {
        let size = if fold < remainder { base + 1 } else { base };
        blocks.push(indices[current..current + size].to_vec());
        current += size;
    }
    blocks
}

/// Build one partition per block: block = test, remainder = train.
pub(crate) fn blocks_to_partitions(blocks: Vec<Vec<usize>>, first_iteration: usize) -> Vec<Partition> {
    let k = blocks.len();
    (0..k)
        .map(|fold| {
            let test = blocks[fold].clone();
            let train: Vec<usize> = blocks
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != fold)
                .flat_map(|(_, b)| b.iter().copied())
                .collect();
            Partition {
                train,
                test,
                iteration: first_iteration + fold,
            }
        })
        .collect()
}

/// Distinct values of a label column in sorted order.
pub(crate) fn distinct_sorted(labels: &[i64]) -> Vec<i64> {
    let mut unique: Vec<i64> = labels.to_vec();
    unique.sort_unstable();
    unique.dedup();
    unique
}
