//! Normal-approximation interval for a single holdout split
//!
//! Uses the sample variance of the test-set pointwise losses, so the
//! measure must expose them. When the measure's score is the square root
//! of the mean loss (RMSE), the standard error is mapped through the delta
//! method: Var(sqrt(m)) ~ Var(m) / (4 m).

use super::{check_preconditions, GEEstimate, IntervalMethod};
use crate::error::{FoldwiseError, Result};
use crate::executor::ResamplingResult;
use crate::measure::LossTransform;
use crate::resampling::SchemeKind;
use crate::stats;

#[derive(Debug, Clone, Copy, Default)]
pub struct HoldoutCI;

impl IntervalMethod for HoldoutCI {
    fn name(&self) -> &'static str {
        "holdout"
    }

    fn supports(&self, kind: SchemeKind) -> bool {
        kind == SchemeKind::Holdout
    }

    fn estimate(&self, result: &ResamplingResult, alpha: f64) -> Result<GEEstimate> {
        check_preconditions(self, result, alpha)?;

        if !result.measure_supports_pointwise {
            return Err(FoldwiseError::Incompatibility(format!(
                "the holdout interval needs pointwise losses, but measure '{}' is aggregate-only",
                result.measure
            )));
        }

        let fold = &result.folds[0];
        let losses = fold.pointwise.as_ref().ok_or_else(|| {
            FoldwiseError::Incompatibility(
                "fold result carries no pointwise losses".to_string(),
            )
        })?;
        let loss_vec: Vec<f64> = losses.iter().copied().collect();
        let m = loss_vec.len();
        if m < 2 {
            return Err(FoldwiseError::Config(format!(
                "holdout interval needs at least 2 test observations, got {}",
                m
            )));
        }

        // Mean loss and variance of the mean, weighted when the dataset
        // carries inverse-inclusion-probability weights.
        let (mean_loss, var_of_mean) = match &fold.test_weights {
            Some(weights) => (
                stats::weighted_mean(&loss_vec, weights),
                stats::weighted_mean_variance(&loss_vec, weights),
            ),
            None => (
                stats::mean(&loss_vec),
                stats::sample_variance(&loss_vec) / m as f64,
            ),
        };

        // Delta-method correction for a post-aggregation transform
        let (estimate, se) = match result.transform {
            LossTransform::Identity => (mean_loss, var_of_mean.sqrt()),
            LossTransform::Sqrt => {
                let point = mean_loss.max(0.0).sqrt();
                if point <= f64::EPSILON {
                    (point, 0.0)
                } else {
                    (point, var_of_mean.sqrt() / (2.0 * point))
                }
            }
        };

        let z = stats::normal_quantile(1.0 - alpha / 2.0)?;
        GEEstimate::checked(
            estimate,
            estimate - z * se,
            estimate + z * se,
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
    use crate::learner::InterceptOnly;
    use crate::measure::{Auc, Rmse, SquaredError};
    use crate::resampling::Resampling;
    use ndarray::{Array1, Array2};
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn noisy_data(n: usize, seed: u64) -> Dataset {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let x = Array2::from_shape_fn((n, 1), |(i, _)| i as f64);
        let y = Array1::from_shape_fn(n, |i| i as f64 + rng.gen::<f64>());
        Dataset::new(x, y).unwrap()
    }

    fn holdout_result(measure: &dyn crate::measure::Measure) -> ResamplingResult {
        let data = noisy_data(120, 4);
        let plan = Resampling::Holdout { ratio: 0.7 }.instantiate(&data, 8).unwrap();
        FoldRunner::new(&InterceptOnly, measure)
            .run(&data, &plan)
            .unwrap()
    }

    #[test]
    fn test_interval_ordering_holds() {
        let result = holdout_result(&SquaredError);
        let est = HoldoutCI.estimate(&result, 0.05).unwrap();
        assert!(est.lower <= est.estimate && est.estimate <= est.upper);
        assert!(est.width() > 0.0);
    }

    #[test]
    fn test_delta_method_rmse() {
        let result = holdout_result(&Rmse);
        let est = HoldoutCI.estimate(&result, 0.05).unwrap();
        // The point estimate is the RMSE itself
        assert!((est.estimate - result.folds[0].score).abs() < 1e-12);
        assert!(est.lower <= est.estimate && est.estimate <= est.upper);

        // Delta correction shrinks the standard error relative to the raw
        // MSE interval divided through naively
        let mse_est = HoldoutCI.estimate(&holdout_result(&SquaredError), 0.05).unwrap();
        assert!(est.width() < mse_est.width());
    }

    #[test]
    fn test_aggregate_only_measure_rejected() {
        // AUC on a classification-shaped dataset: aggregate-only measure
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let x = Array2::from_shape_fn((80, 1), |_| rng.gen::<f64>());
        let y = Array1::from_shape_fn(80, |i| (i % 2) as f64);
        let data = Dataset::new(x, y).unwrap();
        let plan = Resampling::Holdout { ratio: 0.5 }.instantiate(&data, 2).unwrap();
        let result = FoldRunner::new(&crate::learner::MajorityClass, &Auc)
            .run(&data, &plan)
            .unwrap();

        assert!(matches!(
            HoldoutCI.estimate(&result, 0.05),
            Err(FoldwiseError::Incompatibility(_))
        ));
    }

    #[test]
    fn test_wrong_scheme_rejected() {
        let data = noisy_data(60, 1);
        let plan = Resampling::Cv { folds: 3 }.instantiate(&data, 1).unwrap();
        let result = FoldRunner::new(&InterceptOnly, &SquaredError)
            .run(&data, &plan)
            .unwrap();
        assert!(matches!(
            HoldoutCI.estimate(&result, 0.05),
            Err(FoldwiseError::Incompatibility(_))
        ));
    }

    #[test]
    fn test_bad_alpha_rejected() {
        let result = holdout_result(&SquaredError);
        assert!(HoldoutCI.estimate(&result, 0.0).is_err());
        assert!(HoldoutCI.estimate(&result, 1.0).is_err());
    }
}
