//! Naive t ("Wald") interval on cross-validation fold scores
//!
//! Treats the fold scores as independent, which they are not: every fold
//! shares most of its training data with every other fold. The interval is
//! therefore narrower than its nominal coverage warrants. It is kept as a
//! comparison baseline, not a recommendation.

use super::{check_preconditions, GEEstimate, IntervalMethod};
use crate::error::{FoldwiseError, Result};
use crate::executor::ResamplingResult;
use crate::resampling::SchemeKind;
use crate::stats;

#[derive(Debug, Clone, Copy, Default)]
pub struct WaldCI;

impl IntervalMethod for WaldCI {
    fn name(&self) -> &'static str {
        "naive_cv"
    }

    fn supports(&self, kind: SchemeKind) -> bool {
        matches!(kind, SchemeKind::Cv | SchemeKind::RepeatedCv)
    }

    fn estimate(&self, result: &ResamplingResult, alpha: f64) -> Result<GEEstimate> {
        check_preconditions(self, result, alpha)?;

        let scores = result.scores();
        let k = scores.len();
        if k < 2 {
            return Err(FoldwiseError::Config(format!(
                "the naive CV interval needs at least 2 folds, got {}",
                k
            )));
        }

        let point = stats::mean(&scores);
        let se = (stats::sample_variance(&scores) / k as f64).sqrt();
        let t = stats::t_quantile(1.0 - alpha / 2.0, (k - 1) as f64)?;

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
    use crate::resampling::Resampling;
    use ndarray::{Array1, Array2};
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn noisy_linear(n: usize, seed: u64) -> Dataset {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let x = Array2::from_shape_fn((n, 2), |_| rng.gen::<f64>());
        let y = Array1::from_shape_fn(n, |i| {
            x[[i, 0]] + x[[i, 1]] + 0.25 * rng.gen::<f64>()
        });
        Dataset::new(x, y).unwrap()
    }

    #[test]
    fn test_cv_and_repeated_cv_supported() {
        let data = noisy_linear(100, 4);
        for scheme in [
            Resampling::Cv { folds: 5 },
            Resampling::RepeatedCv { folds: 5, repeats: 2 },
        ] {
            let plan = scheme.instantiate(&data, 11).unwrap();
            let result = FoldRunner::new(&LeastSquares::default(), &SquaredError)
                .run(&data, &plan)
                .unwrap();
            let est = WaldCI.estimate(&result, 0.05).unwrap();
            assert!(est.lower <= est.estimate && est.estimate <= est.upper);
            assert!((est.estimate - stats::mean(&result.scores())).abs() < 1e-12);
        }
    }

    #[test]
    fn test_narrower_alpha_widens_interval() {
        let data = noisy_linear(100, 4);
        let plan = Resampling::Cv { folds: 5 }.instantiate(&data, 11).unwrap();
        let result = FoldRunner::new(&LeastSquares::default(), &SquaredError)
            .run(&data, &plan)
            .unwrap();
        let wide = WaldCI.estimate(&result, 0.01).unwrap();
        let narrow = WaldCI.estimate(&result, 0.10).unwrap();
        assert!(wide.width() > narrow.width());
    }

    #[test]
    fn test_subsampling_rejected() {
        let data = noisy_linear(80, 6);
        let plan = Resampling::Subsampling { ratio: 0.8, repeats: 4 }
            .instantiate(&data, 3)
            .unwrap();
        let result = FoldRunner::new(&LeastSquares::default(), &SquaredError)
            .run(&data, &plan)
            .unwrap();
        assert!(matches!(
            WaldCI.estimate(&result, 0.05),
            Err(FoldwiseError::Incompatibility(_))
        ));
    }
}
