//! Scoring measures with an explicit pointwise-loss capability
//!
//! Interval estimators that model per-observation variance need the loss of
//! every test observation, not just the fold aggregate. A [`Measure`]
//! therefore advertises whether it decomposes into pointwise losses
//! (`supports_pointwise`), and dispatch checks that flag instead of probing
//! at runtime. Measures whose reported score is a nonlinear transform of the
//! mean loss (RMSE) declare the transform so estimators can apply the delta
//! method.

use crate::error::{FoldwiseError, Result};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

/// Post-aggregation transform applied to the mean pointwise loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossTransform {
    /// Score is the mean loss itself.
    Identity,
    /// Score is the square root of the mean loss (e.g. RMSE over squared
    /// errors). Estimators correct the variance via the delta method.
    Sqrt,
}

impl LossTransform {
    /// Apply the transform to an aggregated mean loss.
    pub fn apply(&self, mean_loss: f64) -> f64 {
        match self {
            LossTransform::Identity => mean_loss,
            LossTransform::Sqrt => mean_loss.max(0.0).sqrt(),
        }
    }
}

/// A scoring capability: aggregate score plus optional pointwise losses.
pub trait Measure: Send + Sync {
    fn name(&self) -> &'static str;

    /// Aggregate score of predictions against true targets.
    fn score(&self, predicted: ArrayView1<'_, f64>, actual: ArrayView1<'_, f64>) -> Result<f64>;

    /// Whether this measure decomposes into per-observation losses whose
    /// (transformed) mean equals the aggregate score.
    fn supports_pointwise(&self) -> bool {
        false
    }

    /// Per-observation losses. Only valid when `supports_pointwise()`.
    fn pointwise(
        &self,
        _predicted: ArrayView1<'_, f64>,
        _actual: ArrayView1<'_, f64>,
    ) -> Result<Array1<f64>> {
        Err(FoldwiseError::Incompatibility(format!(
            "measure '{}' does not expose pointwise losses",
            self.name()
        )))
    }

    /// Transform linking the mean pointwise loss to the reported score.
    fn transform(&self) -> LossTransform {
        LossTransform::Identity
    }
}

fn check_lengths(predicted: ArrayView1<'_, f64>, actual: ArrayView1<'_, f64>) -> Result<()> {
    if predicted.len() != actual.len() {
        return Err(FoldwiseError::Data(format!(
            "prediction length ({}) does not match target length ({})",
            predicted.len(),
            actual.len()
        )));
    }
    if predicted.is_empty() {
        return Err(FoldwiseError::Data("cannot score an empty fold".to_string()));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
//  Pointwise regression losses
// ═══════════════════════════════════════════════════════════════════════════

/// Mean squared error.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredError;

impl Measure for SquaredError {
    fn name(&self) -> &'static str {
        "mse"
    }

    fn score(&self, predicted: ArrayView1<'_, f64>, actual: ArrayView1<'_, f64>) -> Result<f64> {
        let losses = self.pointwise(predicted, actual)?;
        Ok(losses.mean().unwrap_or(0.0))
    }

    fn supports_pointwise(&self) -> bool {
        true
    }

    fn pointwise(
        &self,
        predicted: ArrayView1<'_, f64>,
        actual: ArrayView1<'_, f64>,
    ) -> Result<Array1<f64>> {
        check_lengths(predicted, actual)?;
        Ok(predicted
            .iter()
            .zip(actual.iter())
            .map(|(p, a)| (p - a).powi(2))
            .collect())
    }
}

/// Root mean squared error: squared pointwise losses with a square-root
/// aggregation transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rmse;

impl Measure for Rmse {
    fn name(&self) -> &'static str {
        "rmse"
    }

    fn score(&self, predicted: ArrayView1<'_, f64>, actual: ArrayView1<'_, f64>) -> Result<f64> {
        SquaredError.score(predicted, actual).map(|mse| mse.sqrt())
    }

    fn supports_pointwise(&self) -> bool {
        true
    }

    fn pointwise(
        &self,
        predicted: ArrayView1<'_, f64>,
        actual: ArrayView1<'_, f64>,
    ) -> Result<Array1<f64>> {
        SquaredError.pointwise(predicted, actual)
    }

    fn transform(&self) -> LossTransform {
        LossTransform::Sqrt
    }
}

/// Mean absolute error.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbsoluteError;

impl Measure for AbsoluteError {
    fn name(&self) -> &'static str {
        "mae"
    }

    fn score(&self, predicted: ArrayView1<'_, f64>, actual: ArrayView1<'_, f64>) -> Result<f64> {
        let losses = self.pointwise(predicted, actual)?;
        Ok(losses.mean().unwrap_or(0.0))
    }

    fn supports_pointwise(&self) -> bool {
        true
    }

    fn pointwise(
        &self,
        predicted: ArrayView1<'_, f64>,
        actual: ArrayView1<'_, f64>,
    ) -> Result<Array1<f64>> {
        check_lengths(predicted, actual)?;
        Ok(predicted
            .iter()
            .zip(actual.iter())
            .map(|(p, a)| (p - a).abs())
            .collect())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Classification measures
// ═══════════════════════════════════════════════════════════════════════════

/// Zero-one loss (classification error rate). Labels are matched by
/// rounding, so hard labels and thresholded probabilities both work.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroOne;

impl Measure for ZeroOne {
    fn name(&self) -> &'static str {
        "zero_one"
    }

    fn score(&self, predicted: ArrayView1<'_, f64>, actual: ArrayView1<'_, f64>) -> Result<f64> {
        let losses = self.pointwise(predicted, actual)?;
        Ok(losses.mean().unwrap_or(0.0))
    }

    fn supports_pointwise(&self) -> bool {
        true
    }

    fn pointwise(
        &self,
        predicted: ArrayView1<'_, f64>,
        actual: ArrayView1<'_, f64>,
    ) -> Result<Array1<f64>> {
        check_lengths(predicted, actual)?;
        Ok(predicted
            .iter()
            .zip(actual.iter())
            .map(|(p, a)| if (p - a).abs() < 0.5 { 0.0 } else { 1.0 })
            .collect())
    }
}

/// Area under the ROC curve, computed as the normalized Mann-Whitney U
/// rank statistic with midranks for ties. A set-level statistic: it does
/// not decompose into per-observation losses.
#[derive(Debug, Clone, Copy, Default)]
pub struct Auc;

impl Measure for Auc {
    fn name(&self) -> &'static str {
        "auc"
    }

    fn score(&self, predicted: ArrayView1<'_, f64>, actual: ArrayView1<'_, f64>) -> Result<f64> {
        check_lengths(predicted, actual)?;

        let n = actual.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&i, &j| {
            predicted[i]
                .partial_cmp(&predicted[j])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        // Midranks over tied prediction values
        let mut ranks = vec![0.0f64; n];
        let mut i = 0;
        while i < n {
            let mut j = i;
            while j + 1 < n && predicted[order[j + 1]] == predicted[order[i]] {
                j += 1;
            }
            let midrank = (i + j) as f64 / 2.0 + 1.0;
            for &idx in &order[i..=j] {
                ranks[idx] = midrank;
            }
            i = j + 1;
        }

        let n_pos = actual.iter().filter(|&&a| a > 0.5).count();
        let n_neg = n - n_pos;
        if n_pos == 0 || n_neg == 0 {
            return Err(FoldwiseError::Data(
                "AUC requires both classes present in the test set".to_string(),
            ));
        }

        let rank_sum_pos: f64 = actual
            .iter()
            .zip(ranks.iter())
            .filter(|(a, _)| **a > 0.5)
            .map(|(_, r)| *r)
            .sum();

        let u = rank_sum_pos - (n_pos * (n_pos + 1)) as f64 / 2.0;
        Ok(u / (n_pos * n_neg) as f64)
    }
}
