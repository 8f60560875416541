//! Generalization-error interval estimators
//!
//! Each estimator is valid only for specific resampling scheme kinds; the
//! [`MethodRegistry`] maps scheme kinds to the single statistically
//! appropriate method. Estimators verify their preconditions (scheme kind,
//! pointwise capability, completeness of the fold results) and refuse with
//! an error rather than compute a wrong interval.

mod conservative_z;
mod corrected_t;
mod dispatch;
mod holdout;
mod nested_cv;
mod wald;

pub use conservative_z::ConservativeZCI;
pub use corrected_t::CorrectedTCI;
pub use dispatch::{infer_ci, MethodRegistry};
pub use holdout::HoldoutCI;
pub use nested_cv::NestedCVCI;
pub use wald::WaldCI;

use crate::error::{FoldwiseError, Result};
use crate::executor::ResamplingResult;
use crate::resampling::SchemeKind;
use serde::{Deserialize, Serialize};

/// Conventional default significance level (two-sided 95% interval).
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Point estimate and confidence interval for the generalization error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GEEstimate {
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
    /// Significance level; the interval is two-sided (1 - alpha).
    pub alpha: f64,
    pub method: String,
    pub scheme: SchemeKind,
}

impl GEEstimate {
    /// Construct an estimate, refusing a nonsensical ordering or
    /// non-finite bounds.
    pub fn checked(
        estimate: f64,
        lower: f64,
        upper: f64,
        alpha: f64,
        method: &str,
        scheme: SchemeKind,
    ) -> Result<Self> {
        if !estimate.is_finite() || !lower.is_finite() || !upper.is_finite() {
            return Err(FoldwiseError::Computation(format!(
                "{} produced a non-finite interval ({}, {}, {})",
                method, lower, estimate, upper
            )));
        }
        if lower > estimate || estimate > upper {
            return Err(FoldwiseError::Computation(format!(
                "{} produced an invalid interval ordering: {} <= {} <= {} does not hold",
                method, lower, estimate, upper
            )));
        }
        Ok(Self {
            estimate,
            lower,
            upper,
            alpha,
            method: method.to_string(),
            scheme,
        })
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// An interval-construction method for one family of resampling schemes.
pub trait IntervalMethod: Send + Sync {
    fn name(&self) -> &'static str;

    /// Scheme kinds this method is statistically valid for.
    fn supports(&self, kind: SchemeKind) -> bool;

    /// Compute the point estimate and two-sided (1 - alpha) interval.
    fn estimate(&self, result: &ResamplingResult, alpha: f64) -> Result<GEEstimate>;
}

/// Shared precondition checks for all methods.
pub(crate) fn check_preconditions(
    method: &dyn IntervalMethod,
    result: &ResamplingResult,
    alpha: f64,
) -> Result<()> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(FoldwiseError::Config(format!(
            "alpha must lie in (0, 1), got {}",
            alpha
        )));
    }
    let kind = result.scheme.kind();
    if !method.supports(kind) {
        return Err(FoldwiseError::Incompatibility(format!(
            "method '{}' is not valid for scheme {}",
            method.name(),
            kind
        )));
    }
    if !result.is_complete() {
        return Err(FoldwiseError::Incompatibility(format!(
            "{} of {} folds were skipped; interval methods need complete results",
            result.skipped.len(),
            result.folds.len() + result.skipped.len()
        )));
    }
    if result.folds.is_empty() {
        return Err(FoldwiseError::Incompatibility(
            "no fold results to estimate from".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_rejects_bad_ordering() {
        assert!(GEEstimate::checked(1.0, 0.5, 2.0, 0.05, "m", SchemeKind::Cv).is_ok());
        assert!(GEEstimate::checked(1.0, 1.5, 2.0, 0.05, "m", SchemeKind::Cv).is_err());
        assert!(GEEstimate::checked(f64::NAN, 0.0, 1.0, 0.05, "m", SchemeKind::Cv).is_err());
    }

    #[test]
    fn test_width() {
        let e = GEEstimate::checked(1.0, 0.25, 2.25, 0.05, "m", SchemeKind::Holdout).unwrap();
        assert!((e.width() - 2.0).abs() < 1e-12);
    }
}
