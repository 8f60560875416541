//! Scheme-to-method dispatcher
//!
//! A strategy table from scheme kind to interval method, so callers do not
//! need to remember which interval construction is valid for which
//! resampling scheme. Schemes without a registered method (the spatial and
//! temporal families) fail with an incompatibility error.

use super::{
    ConservativeZCI, CorrectedTCI, GEEstimate, HoldoutCI, IntervalMethod, NestedCVCI, WaldCI,
};
use crate::error::{FoldwiseError, Result};
use crate::executor::ResamplingResult;
use crate::resampling::SchemeKind;
use std::collections::HashMap;
use tracing::debug;

/// Registry mapping scheme kinds to their interval method.
pub struct MethodRegistry {
    methods: HashMap<SchemeKind, Box<dyn IntervalMethod>>,
}

impl Default for MethodRegistry {
    /// The standard pairing: holdout, corrected t, conservative z,
    /// nested CV, and the naive CV interval for (repeated) K-fold.
    fn default() -> Self {
        let mut registry = Self {
            methods: HashMap::new(),
        };
        registry.register(SchemeKind::Holdout, Box::new(HoldoutCI));
        registry.register(SchemeKind::Subsampling, Box::new(CorrectedTCI));
        registry.register(SchemeKind::PairedSubsampling, Box::new(ConservativeZCI));
        registry.register(SchemeKind::NestedCv, Box::new(NestedCVCI));
        registry.register(SchemeKind::Cv, Box::new(WaldCI));
        registry.register(SchemeKind::RepeatedCv, Box::new(WaldCI));
        registry
    }
}

impl MethodRegistry {
    /// Register (or replace) the method for a scheme kind.
    pub fn register(&mut self, kind: SchemeKind, method: Box<dyn IntervalMethod>) {
        self.methods.insert(kind, method);
    }

    /// Look up the single appropriate method for a scheme kind.
    pub fn resolve(&self, kind: SchemeKind) -> Result<&dyn IntervalMethod> {
        self.methods
            .get(&kind)
            .map(|m| m.as_ref())
            .ok_or_else(|| {
                FoldwiseError::Incompatibility(format!(
                    "no interval method registered for scheme {}",
                    kind
                ))
            })
    }

    /// Resolve the method for the result's scheme and run it.
    pub fn estimate(&self, result: &ResamplingResult, alpha: f64) -> Result<GEEstimate> {
        let kind = result.scheme.kind();
        let method = self.resolve(kind)?;
        debug!(scheme = %kind, method = method.name(), "dispatching interval method");
        method.estimate(result, alpha)
    }
}

/// Convenience: dispatch against the default registry.
pub fn infer_ci(result: &ResamplingResult, alpha: f64) -> Result<GEEstimate> {
    MethodRegistry::default().estimate(result, alpha)
}
