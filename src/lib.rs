//! Foldwise - resampling-based generalization error estimation
//!
//! This crate provides the building blocks for estimating a model's
//! generalization error with honest uncertainty:
//! - Resampling scheme generators (holdout, subsampling, K-fold families,
//!   spatial and temporal variants)
//! - A parallel fold executor over pluggable learner/measure capabilities
//! - Confidence-interval estimators with method-specific variance models
//! - A dispatcher selecting the statistically valid method per scheme
//!
//! # Modules
//!
//! - [`dataset`] - Immutable row-addressable dataset with optional group,
//!   strata, coordinate, and sampling-weight columns
//! - [`resampling`] - Scheme configurations and partition generation
//! - [`executor`] - Parallel train/predict/score execution over partitions
//! - [`measure`] - Scoring measures with a pointwise-loss capability flag
//! - [`learner`] - Fit/predict seam plus baseline learners
//! - [`inference`] - Interval estimators and the scheme-to-method registry
//! - [`stats`] - Shared statistical helpers (variances, quantiles)
//!
//! # Example
//!
//! ```
//! use foldwise::prelude::*;
//! use ndarray::{Array1, Array2};
//!
//! let x = Array2::from_shape_fn((60, 1), |(i, _)| i as f64);
//! let y = Array1::from_shape_fn(60, |i| 2.0 * i as f64 + 1.0);
//! let data = Dataset::new(x, y)?;
//!
//! let plan = Resampling::Cv { folds: 5 }.instantiate(&data, 42)?;
//! let result = FoldRunner::new(&LeastSquares::default(), &SquaredError)
//!     .run(&data, &plan)?;
//! let estimate = infer_ci(&result, DEFAULT_ALPHA)?;
//! assert!(estimate.lower <= estimate.estimate && estimate.estimate <= estimate.upper);
//! # Ok::<(), foldwise::FoldwiseError>(())
//! ```

// Core error handling
pub mod error;

// Data and scheme generation
pub mod dataset;
pub mod resampling;

// Execution and scoring
pub mod executor;
pub mod learner;
pub mod measure;

// Estimation
pub mod inference;
pub mod stats;

pub use error::{FoldwiseError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{FoldwiseError, Result};

    // Data
    pub use crate::dataset::Dataset;

    // Resampling
    pub use crate::resampling::{Partition, Resampling, ResamplingPlan, SchemeKind};

    // Execution
    pub use crate::executor::{FoldPolicy, FoldResult, FoldRunner, ResamplingResult};

    // Learners
    pub use crate::learner::{InterceptOnly, LeastSquares, Learner, MajorityClass, PredictModel};

    // Measures
    pub use crate::measure::{
        AbsoluteError, Auc, LossTransform, Measure, Rmse, SquaredError, ZeroOne,
    };

    // Inference
    pub use crate::inference::{
        infer_ci, ConservativeZCI, CorrectedTCI, GEEstimate, HoldoutCI, IntervalMethod,
        MethodRegistry, NestedCVCI, WaldCI, DEFAULT_ALPHA,
    };
}
