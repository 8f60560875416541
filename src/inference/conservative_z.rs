//! Conservative z interval from paired subsampling (Nadeau & Bengio 1999)
//!
//! Each outer repetition contributes one full-data subsample score (the
//! point estimate averages these) and two disjoint-half blocks of inner
//! subsample scores. The variance of a half-sample estimate is estimated
//! from the paired half means, sigma^2 = mean_j((a_j - b_j)^2 / 2). Models
//! trained on half the data can only be more variable than models trained
//! on the full data, so this variance upper-bounds the point estimate's
//! variance and the resulting interval is conservative.

use super::{check_preconditions, GEEstimate, IntervalMethod};
use crate::error::{FoldwiseError, Result};
use crate::executor::ResamplingResult;
use crate::resampling::{Resampling, SchemeKind};
use crate::stats;

#[derive(Debug, Clone, Copy, Default)]
pub struct ConservativeZCI;

impl IntervalMethod for ConservativeZCI {
    fn name(&self) -> &'static str {
        "conservative_z"
    }

    fn supports(&self, kind: SchemeKind) -> bool {
        kind == SchemeKind::PairedSubsampling
    }

    fn estimate(&self, result: &ResamplingResult, alpha: f64) -> Result<GEEstimate> {
        check_preconditions(self, result, alpha)?;

        let (repeats_in, repeats_out) = match result.scheme {
            Resampling::PairedSubsampling {
                repeats_in,
                repeats_out,
                ..
            } => (repeats_in, repeats_out),
            _ => unreachable!("supports() admits only paired subsampling"),
        };

        let block = 1 + 2 * repeats_in;
        let expected = repeats_out * block;
        if result.folds.len() != expected {
            return Err(FoldwiseError::Incompatibility(format!(
                "paired subsampling expects {} fold results, got {}",
                expected,
                result.folds.len()
            )));
        }

        let scores = result.scores();
        let mut full_scores = Vec::with_capacity(repeats_out);
        let mut var_sum = 0.0;

        for outer in 0..repeats_out {
            let base = outer * block;
            full_scores.push(scores[base]);

            let half_a = &scores[base + 1..base + 1 + repeats_in];
            let half_b = &scores[base + 1 + repeats_in..base + block];
            let a = stats::mean(half_a);
            let b = stats::mean(half_b);
            var_sum += (a - b).powi(2) / 2.0;
        }

        let point = stats::mean(&full_scores);
        let sigma2 = var_sum / repeats_out as f64;
        let se = sigma2.sqrt();

        let z = stats::normal_quantile(1.0 - alpha / 2.0)?;
        GEEstimate::checked(
            point,
            point - z * se,
            point + z * se,
            alpha,
            self.name(),
            result.scheme.kind(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::executor::FoldRunner;
    use crate::learner::LeastSquares;
    use crate::measure::SquaredError;
    use ndarray::{Array1, Array2};
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn noisy_linear(n: usize, seed: u64) -> Dataset {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let x = Array2::from_shape_fn((n, 2), |_| rng.gen::<f64>());
        let y = Array1::from_shape_fn(n, |i| {
            2.0 * x[[i, 0]] + x[[i, 1]] + 0.2 * rng.gen::<f64>()
        });
        Dataset::new(x, y).unwrap()
    }

    fn paired_result() -> ResamplingResult {
        let data = noisy_linear(120, 3);
        // Small configuration to keep the test fast; layout is identical
        let plan = Resampling::PairedSubsampling {
            ratio: 0.9,
            repeats_in: 4,
            repeats_out: 5,
        }
        .instantiate(&data, 17)
        .unwrap();
        FoldRunner::new(&LeastSquares::default(), &SquaredError)
            .run(&data, &plan)
            .unwrap()
    }

    #[test]
    fn test_interval_ordering() {
        let result = paired_result();
        let est = ConservativeZCI.estimate(&result, 0.05).unwrap();
        assert!(est.lower <= est.estimate && est.estimate <= est.upper);
    }

    #[test]
    fn test_point_estimate_uses_full_data_scores() {
        let result = paired_result();
        let est = ConservativeZCI.estimate(&result, 0.05).unwrap();

        let block = 1 + 2 * 4;
        let full_scores: Vec<f64> = (0..5).map(|o| result.folds[o * block].score).collect();
        assert!((est.estimate - stats::mean(&full_scores)).abs() < 1e-12);
    }

    #[test]
    fn test_wrong_scheme_rejected() {
        let data = noisy_linear(80, 5);
        let plan = Resampling::Subsampling { ratio: 0.8, repeats: 5 }
            .instantiate(&data, 2)
            .unwrap();
        let result = FoldRunner::new(&LeastSquares::default(), &SquaredError)
            .run(&data, &plan)
            .unwrap();
        assert!(matches!(
            ConservativeZCI.estimate(&result, 0.05),
            Err(FoldwiseError::Incompatibility(_))
        ));
    }
}
