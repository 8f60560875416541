//! Bias-corrected interval from nested cross-validation
//!
//! For every (repeat, outer fold) pair the scheme provides one outer score
//! e_out and the K-1 inner-CV scores behind it. The squared discrepancy
//! between the inner-CV mean and the outer score,
//! a = mean((e_in_bar - e_out)^2), overestimates the CV estimator's MSE
//! because e_in_bar itself is noisy; the within component
//! b = mean(Var(inner) / (K-1)) removes that bias. The interval half-width
//! is z * sqrt(max(a - b, 0)) around the mean outer score.

use super::{check_preconditions, GEEstimate, IntervalMethod};
use crate::error::{FoldwiseError, Result};
use crate::executor::ResamplingResult;
use crate::resampling::{Resampling, SchemeKind};
use crate::stats;

#[derive(Debug, Clone, Copy, Default)]
pub struct NestedCVCI;

impl IntervalMethod for NestedCVCI {
    fn name(&self) -> &'static str {
        "nested_cv"
    }

    fn supports(&self, kind: SchemeKind) -> bool {
        kind == SchemeKind::NestedCv
    }

    fn estimate(&self, result: &ResamplingResult, alpha: f64) -> Result<GEEstimate> {
        check_preconditions(self, result, alpha)?;

        let (folds, repeats) = match result.scheme {
            Resampling::NestedCv { folds, repeats } => (folds, repeats),
            _ => unreachable!("supports() admits only nested CV"),
        };

        let expected = repeats * folds * folds;
        if result.folds.len() != expected {
            return Err(FoldwiseError::Incompatibility(format!(
                "nested CV expects {} fold results, got {}",
                expected,
                result.folds.len()
            )));
        }

        let scores = result.scores();
        let block = folds; // per outer fold: 1 outer + (folds - 1) inner

        let mut outer_scores = Vec::with_capacity(repeats * folds);
        let mut a_sum = 0.0;
        let mut b_sum = 0.0;

        for rep in 0..repeats {
            for outer in 0..folds {
                let base = rep * folds * block + outer * block;
                let e_out = scores[base];
                let inner = &scores[base + 1..base + block];

                let e_in_bar = stats::mean(inner);
                a_sum += (e_in_bar - e_out).powi(2);
                b_sum += stats::sample_variance(inner) / (folds - 1) as f64;

                outer_scores.push(e_out);
            }
        }

        let pairs = (repeats * folds) as f64;
        let a = a_sum / pairs;
        let b = b_sum / pairs;
        let se = (a - b).max(0.0).sqrt();

        let point = stats::mean(&outer_scores);
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
