//! Fold executor: trains, predicts, and scores every partition of a plan
//!
//! Folds are independent, so they run across the rayon thread pool with no
//! ordering guarantee; the only synchronization point is the final
//! collection. Each fold owns its model fit and loss vector. Cancellation is
//! honored at fold granularity: in-flight folds finish, pending folds are
//! abandoned, and a cancelled run never yields partial results.

use crate::dataset::Dataset;
use crate::error::{FoldwiseError, Result};
use crate::learner::Learner;
use crate::measure::{LossTransform, Measure};
use crate::resampling::{Partition, Resampling, ResamplingPlan};
use crate::stats;
use ndarray::Array1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// What to do when training or scoring fails inside one fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FoldPolicy {
    /// Fail the whole run on the first fold error (default).
    Abort,
    /// Record the failure and keep going. Interval estimators refuse
    /// results with skipped folds, so partial runs are never silently
    /// treated as complete.
    SkipAndRecord,
}

/// Scores of one executed partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldResult {
    pub iteration: usize,
    /// Aggregate score (post-transform for pointwise measures).
    pub score: f64,
    /// Per-observation losses, when the measure supports them.
    pub pointwise: Option<Array1<f64>>,
    /// Sampling weights of the test rows, when the dataset carries them.
    pub test_weights: Option<Vec<f64>>,
    pub n_test: usize,
}

/// A fold that failed under [`FoldPolicy::SkipAndRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFold {
    pub iteration: usize,
    pub reason: String,
}

/// Output of one full resampling run, consumed by the interval estimators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResamplingResult {
    pub scheme: Resampling,
    pub measure: String,
    pub measure_supports_pointwise: bool,
    pub transform: LossTransform,
    pub folds: Vec<FoldResult>,
    pub skipped: Vec<SkippedFold>,
}

impl ResamplingResult {
    /// Whether every planned fold completed.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Aggregate fold scores in iteration order.
    pub fn scores(&self) -> Vec<f64> {
        self.folds.iter().map(|f| f.score).collect()
    }
}

/// Runs all folds of a [`ResamplingPlan`].
pub struct FoldRunner<'a> {
    learner: &'a dyn Learner,
    measure: &'a dyn Measure,
    policy: FoldPolicy,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> FoldRunner<'a> {
    pub fn new(learner: &'a dyn Learner, measure: &'a dyn Measure) -> Self {
        Self {
            learner,
            measure,
            policy: FoldPolicy::Abort,
            cancel: None,
        }
    }

    pub fn with_policy(mut self, policy: FoldPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Install a cancellation flag. Setting it aborts the run at the next
    /// fold boundary.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Execute every partition and collect the fold results.
    pub fn run(&self, data: &Dataset, plan: &ResamplingPlan) -> Result<ResamplingResult> {
        debug!(
            scheme = %plan.scheme.kind(),
            iterations = plan.iters(),
            learner = self.learner.name(),
            measure = self.measure.name(),
            "running resampling plan"
        );

        let outcomes: Vec<std::result::Result<FoldResult, (usize, FoldwiseError)>> = plan
            .partitions
            .par_iter()
            .map(|partition| {
                if self.is_cancelled() {
                    return Err((partition.iteration, FoldwiseError::Cancelled));
                }
                self.run_fold(data, partition)
                    .map_err(|e| (partition.iteration, e))
            })
            .collect();

        let mut folds = Vec::with_capacity(outcomes.len());
        let mut skipped = Vec::new();

        for outcome in outcomes {
            match outcome {
                Ok(fold) => folds.push(fold),
                Err((_, FoldwiseError::Cancelled)) => return Err(FoldwiseError::Cancelled),
                Err((iteration, err)) => match self.policy {
                    FoldPolicy::Abort => {
                        return Err(FoldwiseError::Fold {
                            iteration,
                            reason: err.to_string(),
                        })
                    }
                    FoldPolicy::SkipAndRecord => {
                        warn!(iteration, error = %err, "skipping failed fold");
                        skipped.push(SkippedFold {
                            iteration,
                            reason: err.to_string(),
                        });
                    }
                },
            }
        }

        Ok(ResamplingResult {
            scheme: plan.scheme.clone(),
            measure: self.measure.name().to_string(),
            measure_supports_pointwise: self.measure.supports_pointwise(),
            transform: self.measure.transform(),
            folds,
            skipped,
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Fit on the train rows, predict the test rows, score.
    fn run_fold(&self, data: &Dataset, partition: &Partition) -> Result<FoldResult> {
        let (x_train, y_train) = data.select(&partition.train);
        let (x_test, y_test) = data.select(&partition.test);

        let model = self.learner.fit(x_train.view(), y_train.view())?;
        let predictions = model.predict(x_test.view())?;
        if predictions.len() != y_test.len() {
            return Err(FoldwiseError::Computation(format!(
                "model returned {} predictions for {} test rows",
                predictions.len(),
                y_test.len()
            )));
        }

        let test_weights = data.select_weights(&partition.test);

        let (score, pointwise) = if self.measure.supports_pointwise() {
            let losses = self.measure.pointwise(predictions.view(), y_test.view())?;
            let mean_loss = match &test_weights {
                // Horvitz-Thompson weighted mean under unequal-probability sampling
                Some(weights) => {
                    let loss_vec: Vec<f64> = losses.iter().copied().collect();
                    stats::weighted_mean(&loss_vec, weights)
                }
                None => losses.mean().unwrap_or(0.0),
            };
            (self.measure.transform().apply(mean_loss), Some(losses))
        } else {
            (
                self.measure.score(predictions.view(), y_test.view())?,
                None,
            )
        };

        if !score.is_finite() {
            return Err(FoldwiseError::Computation(format!(
                "non-finite score at iteration {}",
                partition.iteration
            )));
        }

        Ok(FoldResult {
            iteration: partition.iteration,
            score,
            pointwise,
            test_weights,
            n_test: partition.test.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learner::{InterceptOnly, LeastSquares, PredictModel};
    use crate::measure::{SquaredError, ZeroOne};
    use ndarray::{Array2, ArrayView1, ArrayView2};

    fn linear_data(n: usize) -> Dataset {
        let x = Array2::from_shape_fn((n, 1), |(i, _)| i as f64);
        let y = Array1::from_shape_fn(n, |i| 2.0 * i as f64 + 1.0);
        Dataset::new(x, y).unwrap()
    }

    #[test]
    fn test_run_collects_all_folds_in_order() {
        let data = linear_data(50);
        let plan = Resampling::Cv { folds: 5 }.instantiate(&data, 3).unwrap();
        let learner = LeastSquares::default();
        let runner = FoldRunner::new(&learner, &SquaredError);
        let result = runner.run(&data, &plan).unwrap();

        assert_eq!(result.folds.len(), 5);
        assert!(result.is_complete());
        for (i, fold) in result.folds.iter().enumerate() {
            assert_eq!(fold.iteration, i);
            // The data is exactly linear: near-zero loss
            assert!(fold.score < 1e-10, "fold {} score {}", i, fold.score);
            assert!(fold.pointwise.is_some());
        }
    }

    #[test]
    fn test_pointwise_mean_matches_score() {
        let data = linear_data(40);
        let plan = Resampling::Holdout { ratio: 0.75 }.instantiate(&data, 7).unwrap();
        let runner = FoldRunner::new(&InterceptOnly, &SquaredError);
        let result = runner.run(&data, &plan).unwrap();

        let fold = &result.folds[0];
        let losses = fold.pointwise.as_ref().unwrap();
        assert!((losses.mean().unwrap() - fold.score).abs() < 1e-10);
    }

    /// A learner that always fails, for policy tests.
    struct Broken;

    impl Learner for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn fit(
            &self,
            _x: ArrayView2<'_, f64>,
            _y: ArrayView1<'_, f64>,
        ) -> Result<Box<dyn PredictModel>> {
            Err(FoldwiseError::Computation("always fails".to_string()))
        }
    }

    #[test]
    fn test_abort_policy_surfaces_fold_error() {
        let data = linear_data(30);
        let plan = Resampling::Cv { folds: 3 }.instantiate(&data, 1).unwrap();
        let runner = FoldRunner::new(&Broken, &SquaredError);
        assert!(matches!(
            runner.run(&data, &plan),
            Err(FoldwiseError::Fold { .. })
        ));
    }

    #[test]
    fn test_skip_policy_records_failures() {
        let data = linear_data(30);
        let plan = Resampling::Cv { folds: 3 }.instantiate(&data, 1).unwrap();
        let runner = FoldRunner::new(&Broken, &SquaredError).with_policy(FoldPolicy::SkipAndRecord);
        let result = runner.run(&data, &plan).unwrap();

        assert!(result.folds.is_empty());
        assert_eq!(result.skipped.len(), 3);
        assert!(!result.is_complete());
    }

    #[test]
    fn test_cancellation_aborts_run() {
        let data = linear_data(30);
        let plan = Resampling::Cv { folds: 3 }.instantiate(&data, 1).unwrap();
        let flag = Arc::new(AtomicBool::new(true));
        let learner = LeastSquares::default();
        let runner = FoldRunner::new(&learner, &SquaredError).with_cancel_flag(Arc::clone(&flag));
        assert!(matches!(
            runner.run(&data, &plan),
            Err(FoldwiseError::Cancelled)
        ));
    }

    #[test]
    fn test_weighted_scoring_uses_weights() {
        let x = Array2::zeros((8, 1));
        let y = Array1::from_vec(vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
        // Heavy weights on the later rows
        let weights = vec![1.0, 1.0, 1.0, 1.0, 10.0, 10.0, 10.0, 10.0];
        let data = Dataset::new(x, y).unwrap().with_weights(weights).unwrap();

        let plan = Resampling::Cv { folds: 2 }.instantiate(&data, 5).unwrap();
        let runner = FoldRunner::new(&InterceptOnly, &ZeroOne);
        let result = runner.run(&data, &plan).unwrap();

        for fold in &result.folds {
            assert!(fold.test_weights.is_some());
            // Weighted mean of 0/1 losses stays inside [0, 1]
            assert!((0.0..=1.0).contains(&fold.score));
        }
    }
}
