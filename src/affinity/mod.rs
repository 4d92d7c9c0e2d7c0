//! Affinity graphs from distance graphs.
//!
//! The second pipeline stage applies a kernel to every stored distance,
//! turning "how far" into "how similar". The canonical kernel is the
//! Gaussian (heat) kernel
//!
//! ```text
//! A_ij = exp(-(D_ij / r)^2)        for stored (i, j)
//! ```
//!
//! with bandwidth `r` given as the `radius` parameter. Absent entries stay
//! absent: the kernel never adds or removes edges, so a point that has no
//! neighbors in the distance graph remains isolated in the affinity graph.
//!
//! Every stored distance maps into (0, 1], with a stored distance of 0
//! (duplicate points) mapping to exactly 1.
//!
//! `auto` resolves to `gaussian`.

mod gaussian;
mod traits;

pub use gaussian::Gaussian;
pub use traits::{AffinityKernel, KERNEL_PARAMS};

use sprs::CsMat;

use crate::error::Result;
use crate::params::Params;
use crate::registry::MethodRegistry;

/// Built-in affinity method names, excluding `auto`.
pub const AFFINITY_METHODS: &[&str] = &["gaussian"];

/// Affinity graph of `distances` using the built-in kernel named `method`.
///
/// # Errors
///
/// - [`Error::UnknownMethod`](crate::Error::UnknownMethod) if `method` is not registered.
/// - Malformed-input errors: missing or non-positive `radius`, a non-square
///   matrix, an asymmetric sparsity pattern, negative or non-finite entries.
pub fn compute_affinity_matrix(
    distances: &CsMat<f64>,
    method: &str,
    params: &Params,
) -> Result<CsMat<f64>> {
    MethodRegistry::builtin().compute_affinity(distances, method, params)
}
