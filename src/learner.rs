//! Learner seam: fit/predict capabilities consumed by the fold executor
//!
//! The executor only needs `fit(train) -> model` and `predict(test) ->
//! predictions`. Real learners live outside this library; the baselines here
//! (ordinary least squares, intercept-only, majority-class) exist so
//! experiments and tests have deterministic collaborators to run against.

use crate::error::{FoldwiseError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use std::collections::HashMap;

/// A model-fitting capability. `Send + Sync` so folds can fit in parallel.
pub trait Learner: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fit on the training rows, producing a prediction-capable model.
    fn fit(&self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>)
        -> Result<Box<dyn PredictModel>>;
}

/// A fitted model.
pub trait PredictModel: Send + Sync {
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>>;
}

// ═══════════════════════════════════════════════════════════════════════════
//  Ordinary least squares
// ═══════════════════════════════════════════════════════════════════════════

/// Linear regression via the normal equations, solved by Cholesky
/// decomposition with a ridge-regularized retry for near-singular designs.
#[derive(Debug, Clone, Copy)]
pub struct LeastSquares {
    pub intercept: bool,
}

impl Default for LeastSquares {
    fn default() -> Self {
        Self { intercept: true }
    }
}

struct FittedLeastSquares {
    coefficients: Array1<f64>,
    intercept: bool,
}

impl LeastSquares {
    fn design(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        if !self.intercept {
            return x.to_owned();
        }
        let mut design = Array2::ones((x.nrows(), x.ncols() + 1));
        design.slice_mut(ndarray::s![.., 1..]).assign(&x);
        design
    }
}

impl Learner for LeastSquares {
    fn name(&self) -> &'static str {
        "least_squares"
    }

    fn fit(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
    ) -> Result<Box<dyn PredictModel>> {
        if x.nrows() != y.len() {
            return Err(FoldwiseError::Data(format!(
                "design rows ({}) do not match target length ({})",
                x.nrows(),
                y.len()
            )));
        }
        if x.nrows() == 0 {
            return Err(FoldwiseError::Data("cannot fit on an empty train set".to_string()));
        }

        let design = self.design(x);
        let xtx = design.t().dot(&design);
        let xty = design.t().dot(&y);

        let coefficients = cholesky_solve(&xtx, &xty).ok_or_else(|| {
            FoldwiseError::Computation("normal equations are singular".to_string())
        })?;

        Ok(Box::new(FittedLeastSquares {
            coefficients,
            intercept: self.intercept,
        }))
    }
}

impl PredictModel for FittedLeastSquares {
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        let expected = if self.intercept {
            self.coefficients.len() - 1
        } else {
            self.coefficients.len()
        };
        if x.ncols() != expected {
            return Err(FoldwiseError::Data(format!(
                "expected {} features, got {}",
                expected,
                x.ncols()
            )));
        }

        let preds = if self.intercept {
            let w = self.coefficients.slice(ndarray::s![1..]);
            x.dot(&w) + self.coefficients[0]
        } else {
            x.dot(&self.coefficients)
        };
        Ok(preds)
    }
}

/// Solve the symmetric positive-definite system Ax = b by Cholesky
/// decomposition; retries once with a small ridge on the diagonal.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    match cholesky_solve_inner(a, b) {
        Some(x) => Some(x),
        None => {
            let n = a.nrows();
            let ridge = 1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>().max(1.0) / n as f64;
            let mut a_reg = a.clone();
            for k in 0..n {
                a_reg[[k, k]] += ridge;
            }
            cholesky_solve_inner(&a_reg, b)
        }
    }
}

fn cholesky_solve_inner(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    // Decomposition: A = L * L^T
    let mut l = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // Forward substitution: L * y = b
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L^T * x = y
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

// ═══════════════════════════════════════════════════════════════════════════
//  Baselines
// ═══════════════════════════════════════════════════════════════════════════

/// Predicts the training-target mean for every test row.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterceptOnly;

struct FittedInterceptOnly {
    mean: f64,
}

impl Learner for InterceptOnly {
    fn name(&self) -> &'static str {
        "intercept_only"
    }

    fn fit(
        &self,
        _x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
    ) -> Result<Box<dyn PredictModel>> {
        if y.is_empty() {
            return Err(FoldwiseError::Data("cannot fit on an empty train set".to_string()));
        }
        Ok(Box::new(FittedInterceptOnly {
            mean: y.mean().unwrap_or(0.0),
        }))
    }
}

impl PredictModel for FittedInterceptOnly {
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        Ok(Array1::from_elem(x.nrows(), self.mean))
    }
}

/// Predicts the most frequent training label for every test row.
#[derive(Debug, Clone, Copy, Default)]
pub struct MajorityClass;

struct FittedMajorityClass {
    label: f64,
}

impl Learner for MajorityClass {
    fn name(&self) -> &'static str {
        "majority_class"
    }

    fn fit(
        &self,
        _x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
    ) -> Result<Box<dyn PredictModel>> {
        if y.is_empty() {
            return Err(FoldwiseError::Data("cannot fit on an empty train set".to_string()));
        }
        let mut counts: HashMap<i64, usize> = HashMap::new();
        for &v in y.iter() {
            *counts.entry(v.round() as i64).or_default() += 1;
        }
        // Deterministic tie-break on the smaller label
        let label = counts
            .into_iter()
            .max_by(|(la, ca), (lb, cb)| ca.cmp(cb).then(lb.cmp(la)))
            .map(|(l, _)| l as f64)
            .unwrap_or(0.0);
        Ok(Box::new(FittedMajorityClass { label }))
    }
}

impl PredictModel for FittedMajorityClass {
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        Ok(Array1::from_elem(x.nrows(), self.label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_least_squares_recovers_line() {
        // y = 2x + 1
        let x = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
        let y = array![1.0, 3.0, 5.0, 7.0, 9.0];
        let model = LeastSquares::default().fit(x.view(), y.view()).unwrap();
        let preds = model.predict(array![[5.0], [6.0]].view()).unwrap();
        assert!((preds[0] - 11.0).abs() < 1e-8);
        assert!((preds[1] - 13.0).abs() < 1e-8);
    }

    #[test]
    fn test_least_squares_feature_mismatch() {
        let x = array![[0.0, 1.0], [1.0, 2.0], [2.0, 1.0]];
        let y = array![1.0, 2.0, 3.0];
        let model = LeastSquares::default().fit(x.view(), y.view()).unwrap();
        assert!(model.predict(array![[1.0]].view()).is_err());
    }

    #[test]
    fn test_intercept_only_predicts_mean() {
        let x = array![[0.0], [0.0], [0.0]];
        let y = array![1.0, 2.0, 3.0];
        let model = InterceptOnly.fit(x.view(), y.view()).unwrap();
        let preds = model.predict(x.view()).unwrap();
        assert!((preds[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_majority_class() {
        let x = array![[0.0], [0.0], [0.0], [0.0]];
        let y = array![1.0, 1.0, 0.0, 1.0];
        let model = MajorityClass.fit(x.view(), y.view()).unwrap();
        let preds = model.predict(x.view()).unwrap();
        assert_eq!(preds[0], 1.0);
    }
}
