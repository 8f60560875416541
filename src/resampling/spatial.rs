//! Spatially-aware generators: tiles, cluster folds, discs with buffers,
//! and predefined-unit leave-one-out
//!
//! Fold membership here is a function of spatial coordinates (or of the
//! covariates themselves), not of a pure random draw, so that spatial
//! autocorrelation between nearby rows cannot leak across the train/test
//! boundary. The disc variant additionally supports a buffer: rows closer
//! than `radius + buffer` to the test center belong to neither set.

use super::{blocks_to_partitions, distinct_sorted, stream_rng, Partition};
use crate::dataset::Dataset;
use crate::error::{FoldwiseError, Result};
use ndarray::{Array2, ArrayView1, ArrayView2};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

fn require_coords<'a>(data: &'a Dataset, scheme: &str) -> Result<ArrayView2<'a, f64>> {
    data.coords().ok_or_else(|| {
        FoldwiseError::Data(format!("{} requires spatial coordinates", scheme))
    })
}

fn euclidean_sq(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

// ═══════════════════════════════════════════════════════════════════════════
//  Tile-based folds
// ═══════════════════════════════════════════════════════════════════════════

/// Assign every row to a rectangular tile of the coordinate bounding box
/// and return the non-empty tiles in row-major tile order.
pub(super) fn occupied_tiles(data: &Dataset, rows: usize, cols: usize) -> Result<Vec<Vec<usize>>> {
    let coords = require_coords(data, "tiled resampling")?;
    if coords.ncols() < 2 {
        return Err(FoldwiseError::Data(
            "tiled resampling requires two coordinate dimensions".to_string(),
        ));
    }

    let xs = coords.column(0);
    let ys = coords.column(1);
    let (x_min, x_max) = min_max(xs)?;
    let (y_min, y_max) = min_max(ys)?;

    let x_span = (x_max - x_min).max(f64::EPSILON);
    let y_span = (y_max - y_min).max(f64::EPSILON);

    let mut tiles: Vec<Vec<usize>> = vec![Vec::new(); rows * cols];
    for i in 0..coords.nrows() {
        let cx = (((xs[i] - x_min) / x_span) * cols as f64) as usize;
        let cy = (((ys[i] - y_min) / y_span) * rows as f64) as usize;
        let tile = cy.min(rows - 1) * cols + cx.min(cols - 1);
        tiles[tile].push(i);
    }

    let occupied: Vec<Vec<usize>> = tiles.into_iter().filter(|t| !t.is_empty()).collect();
    if occupied.len() < 2 {
        return Err(FoldwiseError::Config(
            "tiling produced fewer than two occupied tiles".to_string(),
        ));
    }
    Ok(occupied)
}

fn min_max(values: ArrayView1<'_, f64>) -> Result<(f64, f64)> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in values.iter() {
        if !v.is_finite() {
            return Err(FoldwiseError::Data(
                "coordinates must be finite".to_string(),
            ));
        }
        lo = lo.min(v);
        hi = hi.max(v);
    }
    Ok((lo, hi))
}

/// Leave-one-tile-out: each occupied tile is the test set once.
pub fn tiled(data: &Dataset, rows: usize, cols: usize) -> Result<Vec<Partition>> {
    let tiles = occupied_tiles(data, rows, cols)?;
    Ok(blocks_to_partitions(tiles, 0))
}

/// Tiles shuffled and dealt round-robin into `folds` folds.
pub fn block_random(
    data: &Dataset,
    rows: usize,
    cols: usize,
    folds: usize,
    seed: u64,
) -> Result<Vec<Partition>> {
    let mut tiles = occupied_tiles(data, rows, cols)?;
    if tiles.len() < folds {
        return Err(FoldwiseError::Config(format!(
            "only {} occupied tiles for {} folds",
            tiles.len(),
            folds
        )));
    }

    let mut rng = stream_rng(seed, 0);
    tiles.shuffle(&mut rng);

    let mut blocks: Vec<Vec<usize>> = vec![Vec::new(); folds];
    for (i, tile) in tiles.into_iter().enumerate() {
        blocks[i % folds].extend(tile);
    }
    Ok(blocks_to_partitions(blocks, 0))
}

// ═══════════════════════════════════════════════════════════════════════════
//  Cluster-based folds
// ═══════════════════════════════════════════════════════════════════════════

/// K-means clusters of the spatial coordinates as folds.
pub fn coord_cluster(data: &Dataset, folds: usize, seed: u64) -> Result<Vec<Partition>> {
    let coords = require_coords(data, "coordinate-clustered resampling")?;
    cluster_folds(coords, folds, seed)
}

/// K-means clusters of the feature columns as folds.
pub fn covariate_cluster(data: &Dataset, folds: usize, seed: u64) -> Result<Vec<Partition>> {
    cluster_folds(data.features(), folds, seed)
}

fn cluster_folds(points: ArrayView2<'_, f64>, k: usize, seed: u64) -> Result<Vec<Partition>> {
    let n = points.nrows();
    if n < k {
        return Err(FoldwiseError::Config(format!(
            "cannot cluster {} rows into {} folds",
            n, k
        )));
    }

    let mut rng = stream_rng(seed, 0);
    let labels = kmeans_labels(points, k, &mut rng)?;

    let mut blocks: Vec<Vec<usize>> = vec![Vec::new(); k];
    for (row, &label) in labels.iter().enumerate() {
        blocks[label].push(row);
    }
    if blocks.iter().any(|b| b.is_empty()) {
        return Err(FoldwiseError::Computation(
            "clustering produced an empty fold".to_string(),
        ));
    }
    Ok(blocks_to_partitions(blocks, 0))
}

/// Lloyd's algorithm with k-means++ initialization. Returns per-row
/// cluster labels.
fn kmeans_labels(points: ArrayView2<'_, f64>, k: usize, rng: &mut ChaCha8Rng) -> Result<Vec<usize>> {
    const MAX_ITER: usize = 100;

    let n = points.nrows();
    let d = points.ncols();
    let mut centroids = kmeans_pp_init(points, k, rng);
    let mut labels = vec![0usize; n];

    for _ in 0..MAX_ITER {
        // Assignment step
        let mut changed = 0usize;
        for i in 0..n {
            let row = points.row(i);
            let mut best = 0;
            let mut best_dist = f64::MAX;
            for c in 0..k {
                let dist = euclidean_sq(row, centroids.row(c));
                if dist < best_dist {
                    best_dist = dist;
                    best = c;
                }
            }
            if labels[i] != best {
                labels[i] = best;
                changed += 1;
            }
        }

        // Update step
        let mut sums = Array2::<f64>::zeros((k, d));
        let mut counts = vec![0usize; k];
        for i in 0..n {
            counts[labels[i]] += 1;
            let mut target = sums.row_mut(labels[i]);
            target += &points.row(i);
        }
        for c in 0..k {
            if counts[c] > 0 {
                let mut row = centroids.row_mut(c);
                row.assign(&sums.row(c));
                row /= counts[c] as f64;
            }
        }

        if changed == 0 {
            break;
        }
    }

    Ok(labels)
}

/// K-means++ initialization: centroids spread proportionally to squared
/// distance from the nearest chosen centroid.
fn kmeans_pp_init(points: ArrayView2<'_, f64>, k: usize, rng: &mut ChaCha8Rng) -> Array2<f64> {
    let n = points.nrows();
    let d = points.ncols();
    let mut centroids = Array2::zeros((k, d));

    let first = rng.gen_range(0..n);
    centroids.row_mut(0).assign(&points.row(first));

    for c in 1..k {
        let dists: Vec<f64> = (0..n)
            .map(|i| {
                (0..c)
                    .map(|j| euclidean_sq(points.row(i), centroids.row(j)))
                    .fold(f64::MAX, f64::min)
            })
            .collect();

        let total: f64 = dists.iter().sum();
        if total <= 0.0 {
            let idx = rng.gen_range(0..n);
            centroids.row_mut(c).assign(&points.row(idx));
            continue;
        }

        let r = rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        let mut chosen = n - 1;
        for (i, &dist) in dists.iter().enumerate() {
            cumulative += dist;
            if cumulative >= r {
                chosen = i;
                break;
            }
        }
        centroids.row_mut(c).assign(&points.row(chosen));
    }

    centroids
}

// ═══════════════════════════════════════════════════════════════════════════
//  Disc-based folds with buffer
// ═══════════════════════════════════════════════════════════════════════════

/// Per repeat, a random row becomes the disc center: test = rows within
/// `radius`, train = rows beyond `radius + buffer`.
pub fn disc(
    data: &Dataset,
    radius: f64,
    buffer: f64,
    repeats: usize,
    seed: u64,
) -> Result<Vec<Partition>> {
    let coords = require_coords(data, "disc resampling")?;
    let n = coords.nrows();
    let radius_sq = radius * radius;
    let exclusion_sq = (radius + buffer) * (radius + buffer);

    let mut partitions = Vec::with_capacity(repeats);
    for rep in 0..repeats {
        let mut rng = stream_rng(seed, rep as u64);
        let center = rng.gen_range(0..n);
        let center_row = coords.row(center);

        let mut test = Vec::new();
        let mut train = Vec::new();
        for i in 0..n {
            let dist_sq = euclidean_sq(coords.row(i), center_row);
            if dist_sq <= radius_sq {
                test.push(i);
            } else if dist_sq > exclusion_sq {
                train.push(i);
            }
            // Buffer rows fall through: excluded from both sets
        }

        if test.is_empty() || train.is_empty() {
            return Err(FoldwiseError::Config(format!(
                "disc at row {} (radius {}, buffer {}) leaves an empty train or test set",
                center, radius, buffer
            )));
        }

        partitions.push(Partition {
            train,
            test,
            iteration: rep,
        });
    }
    Ok(partitions)
}

// ═══════════════════════════════════════════════════════════════════════════
//  Predefined units
// ═══════════════════════════════════════════════════════════════════════════

/// One fold per distinct unit of the grouping column, in sorted unit order.
pub fn leave_one_unit_out(data: &Dataset) -> Result<Vec<Partition>> {
    let groups = data.groups().ok_or_else(|| {
        FoldwiseError::Data("leave-one-unit-out requires a grouping column".to_string())
    })?;

    let units = distinct_sorted(groups);
    if units.len() < 2 {
        return Err(FoldwiseError::Config(format!(
            "leave-one-unit-out needs at least two units, got {}",
            units.len()
        )));
    }

    let blocks: Vec<Vec<usize>> = units
        .iter()
        .map(|&unit| {
            groups
                .iter()
                .enumerate()
                .filter(|(_, &g)| g == unit)
                .map(|(i, _)| i)
                .collect()
        })
        .collect();

    Ok(blocks_to_partitions(blocks, 0))
}
