//! Affinity kernel trait.

use std::fmt;

use sprs::CsMat;

use crate::error::{Error, Result};
use crate::params::Params;
use crate::validate;

/// Parameters every affinity kernel accepts.
pub const KERNEL_PARAMS: &[&str] = &["radius"];

/// A function turning a distance graph into a similarity graph.
///
/// The kernel is evaluated at stored entries only, so the output has exactly
/// the sparsity pattern of the input.
pub trait AffinityKernel: Send + Sync + fmt::Debug {
    /// Registry name.
    fn name(&self) -> &str;

    /// Strategy-specific tuning keys accepted on top of [`KERNEL_PARAMS`].
    fn tuning_params(&self) -> &[&str] {
        &[]
    }

    /// Similarity for one stored distance with bandwidth `radius`.
    fn similarity(&self, distance: f64, radius: f64, params: &Params) -> f64;

    /// Affinity graph of `distances`.
    ///
    /// Requires `radius` (> 0) and a valid distance graph: square, finite,
    /// non-negative, with a symmetric sparsity pattern.
    fn transform(&self, distances: &CsMat<f64>, params: &Params) -> Result<CsMat<f64>> {
        let recognized: Vec<&str> = KERNEL_PARAMS
            .iter()
            .copied()
            .chain(self.tuning_params().iter().copied())
            .collect();
        params.check_known(self.name(), &recognized)?;

        let radius = params
            .positive_f64("radius")?
            .ok_or_else(|| Error::invalid_parameter("radius", "kernel bandwidth is required"))?;
        let (csr, _) = validate::distance_graph(distances)?;

        Ok(csr.map(|&d| self.similarity(d, radius, params)))
    }
}
