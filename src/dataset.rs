//! Immutable, row-addressable dataset abstraction
//!
//! A [`Dataset`] pairs a feature matrix with a target vector and optional
//! side columns used by specific resampling schemes: a grouping column
//! (grouped / leave-one-unit-out schemes), stratification labels, spatial
//! coordinates, and sampling weights (inverse inclusion probabilities) for
//! Horvitz-Thompson corrected aggregation.
//!
//! The dataset is read-only for the duration of an experiment; resampling
//! schemes reference rows by index and never copy the data.

use crate::error::{FoldwiseError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// An ordered, immutable collection of observations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    features: Array2<f64>,
    target: Array1<f64>,
    groups: Option<Vec<i64>>,
    strata: Option<Vec<i64>>,
    coords: Option<Array2<f64>>,
    weights: Option<Vec<f64>>,
}

impl Dataset {
    /// Create a dataset from a feature matrix and a target vector.
    pub fn new(features: Array2<f64>, target: Array1<f64>) -> Result<Self> {
        if features.nrows() != target.len() {
            return Err(FoldwiseError::Data(format!(
                "feature rows ({}) do not match target length ({})",
                features.nrows(),
                target.len()
            )));
        }
        if features.nrows() == 0 {
            return Err(FoldwiseError::Data("dataset has no rows".to_string()));
        }
        Ok(Self {
            features,
            target,
            groups: None,
            strata: None,
            coords: None,
            weights: None,
        })
    }

    /// Attach a grouping column (one identifier per row).
    pub fn with_groups(mut self, groups: Vec<i64>) -> Result<Self> {
        if groups.len() != self.n_rows() {
            return Err(FoldwiseError::Data(format!(
                "grouping column length ({}) does not match row count ({})",
                groups.len(),
                self.n_rows()
            )));
        }
        self.groups = Some(groups);
        Ok(self)
    }

    /// Attach stratification labels (one class label per row).
    pub fn with_strata(mut self, strata: Vec<i64>) -> Result<Self> {
        if strata.len() != self.n_rows() {
            return Err(FoldwiseError::Data(format!(
                "strata column length ({}) does not match row count ({})",
                strata.len(),
                self.n_rows()
            )));
        }
        self.strata = Some(strata);
        Ok(self)
    }

    /// Attach spatial coordinates (n_rows x n_dims).
    pub fn with_coords(mut self, coords: Array2<f64>) -> Result<Self> {
        if coords.nrows() != self.n_rows() {
            return Err(FoldwiseError::Data(format!(
                "coordinate rows ({}) do not match row count ({})",
                coords.nrows(),
                self.n_rows()
            )));
        }
        if coords.ncols() == 0 {
            return Err(FoldwiseError::Data(
                "coordinates need at least one dimension".to_string(),
            ));
        }
        self.coords = Some(coords);
        Ok(self)
    }

    /// Attach sampling weights (inverse inclusion probabilities).
    /// Weights must be strictly positive and finite.
    pub fn with_weights(mut self, weights: Vec<f64>) -> Result<Self> {
        if weights.len() != self.n_rows() {
            return Err(FoldwiseError::Data(format!(
                "weight column length ({}) does not match row count ({})",
                weights.len(),
                self.n_rows()
            )));
        }
        if weights.iter().any(|w| !w.is_finite() || *w <= 0.0) {
            return Err(FoldwiseError::Data(
                "sampling weights must be positive and finite".to_string(),
            ));
        }
        self.weights = Some(weights);
        Ok(self)
    }

    /// Number of observations.
    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    /// Number of feature columns.
    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn features(&self) -> ArrayView2<'_, f64> {
        self.features.view()
    }

    pub fn target(&self) -> ArrayView1<'_, f64> {
        self.target.view()
    }

    pub fn groups(&self) -> Option<&[i64]> {
        self.groups.as_deref()
    }

    pub fn strata(&self) -> Option<&[i64]> {
        self.strata.as_deref()
    }

    pub fn coords(&self) -> Option<ArrayView2<'_, f64>> {
        self.coords.as_ref().map(|c| c.view())
    }

    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    /// Gather the feature rows and targets for the given indices.
    pub fn select(&self, indices: &[usize]) -> (Array2<f64>, Array1<f64>) {
        let x = self.features.select(Axis(0), indices);
        let y = self.target.select(Axis(0), indices);
        (x, y)
    }

    /// Gather the sampling weights for the given indices, if present.
    pub fn select_weights(&self, indices: &[usize]) -> Option<Vec<f64>> {
        self.weights
            .as_ref()
            .map(|w| indices.iter().map(|&i| w[i]).collect())
    }
}
