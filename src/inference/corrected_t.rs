//! Nadeau-Bengio corrected resampled t interval for subsampling
//!
//! Repeated subsamples share the same dataset, so the fold scores are
//! positively correlated and the plain t interval undercovers. The
//! correction inflates the variance term from S^2/J to
//! S^2 * (1/J + n_test/n_train), which accounts for that correlation.

use super::{check_preconditions, GEEstimate, IntervalMethod};
use crate::error::{FoldwiseError, Result};
use crate::executor::ResamplingResult;
use crate::resampling::{Resampling, SchemeKind};
use crate::stats;

#[derive(Debug, Clone, Copy, Default)]
pub struct CorrectedTCI;

impl IntervalMethod for CorrectedTCI {
    fn name(&self) -> &'static str {
        "corrected_t"
    }

    fn supports(&self, kind: SchemeKind) -> bool {
        kind == SchemeKind::Subsampling
    }

    fn estimate(&self, result: &ResamplingResult, alpha: f64) -> Result<GEEstimate> {
        check_preconditions(self, result, alpha)?;

        let ratio = match result.scheme {
            Resampling::Subsampling { ratio, .. } => ratio,
            _ => unreachable!("supports() admits only subsampling"),
        };

        let scores = result.scores();
        let j = scores.len();
        if j < 2 {
            return Err(FoldwiseError::Config(format!(
                "corrected t needs at least 2 subsampling repeats, got {}",
                j
            )));
        }

        let point = stats::mean(&scores);
        let s2 = stats::sample_variance(&scores);
        // Correction term: test fraction over train fraction
        let correction = 1.0 / j as f64 + (1.0 - ratio) / ratio;
        let se = (s2 * correction).sqrt();

        let t = stats::t_quantile(1.0 - alpha / 2.0, (j - 1) as f64)?;
        GEEstimate::checked(
            point,
            point - t * se,
            point + t * se,
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
            x[[i, 0]] * 3.0 - x[[i, 1]] + 0.3 * rng.gen::<f64>()
        });
        Dataset::new(x, y).unwrap()
    }

    fn subsampling_result(repeats: usize) -> ResamplingResult {
        let data = noisy_linear(150, 6);
        let plan = Resampling::Subsampling { ratio: 0.9, repeats }
            .instantiate(&data, 13)
            .unwrap();
        FoldRunner::new(&LeastSquares::default(), &SquaredError)
            .run(&data, &plan)
            .unwrap()
    }

    #[test]
    fn test_interval_ordering_and_point() {
        let result = subsampling_result(15);
        let est = CorrectedTCI.estimate(&result, 0.05).unwrap();
        assert!(est.lower <= est.estimate && est.estimate <= est.upper);
        assert!((est.estimate - stats::mean(&result.scores())).abs() < 1e-12);
    }

    #[test]
    fn test_correction_widens_over_naive_t() {
        let result = subsampling_result(15);
        let est = CorrectedTCI.estimate(&result, 0.05).unwrap();

        // Naive width from the same scores: t * sqrt(S^2 / J)
        let scores = result.scores();
        let j = scores.len() as f64;
        let naive_se = (stats::sample_variance(&scores) / j).sqrt();
        let t = stats::t_quantile(0.975, j - 1.0).unwrap();
        let naive_width = 2.0 * t * naive_se;

        assert!(
            est.width() > naive_width,
            "corrected width {} must exceed naive width {}",
            est.width(),
            naive_width
        );
    }

    #[test]
    fn test_single_repeat_rejected() {
        let result = subsampling_result(1);
        assert!(matches!(
            CorrectedTCI.estimate(&result, 0.05),
            Err(FoldwiseError::Config(_))
        ));
    }

    #[test]
    fn test_wrong_scheme_rejected() {
        let data = noisy_linear(60, 2);
        let plan = Resampling::Holdout { ratio: 0.8 }.instantiate(&data, 3).unwrap();
        let result = FoldRunner::new(&LeastSquares::default(), &SquaredError)
            .run(&data, &plan)
            .unwrap();
        assert!(matches!(
            CorrectedTCI.estimate(&result, 0.05),
            Err(FoldwiseError::Incompatibility(_))
        ));
    }
}
