//! Graph Laplacians from affinity graphs.
//!
//! The last pipeline stage normalizes a symmetric, non-negative affinity
//! graph `A` into a Laplacian operator. Which normalization to use depends on
//! what the spectrum is for:
//!
//! | Method | Symmetric | Typical use |
//! |--------|-----------|-------------|
//! | `unnormalized` | yes | ratio cut, regular graphs |
//! | `symmetricnormalized` | yes | normalized cut, spectral embedding |
//! | `randomwalk` | no | diffusion, label propagation |
//! | `renormalized` | no | diffusion maps with density exponent `scaling_epps` |
//! | `geometric` | yes | Laplace–Beltrami approximation |
//!
//! `auto` resolves to `geometric`.
//!
//! Every builder accepts `scaling_epps` (used by `renormalized`, ignored
//! elsewhere) and `symmetrize_input`, which replaces the input by
//! `(A + Aᵀ) / 2` before validation. Nodes with zero degree get all-zero rows
//! and columns; no builder divides by a zero degree.
//!
//! ## Usage
//!
//! ```rust
//! use manigraph::{compute_laplacian_matrix, Params};
//! use sprs::TriMat;
//!
//! let mut tri = TriMat::new((2, 2));
//! tri.add_triplet(0, 1, 1.0);
//! tri.add_triplet(1, 0, 1.0);
//! let affinity = tri.to_csr();
//!
//! let lap = compute_laplacian_matrix(&affinity, "unnormalized", &Params::new()).unwrap();
//! assert_eq!(lap.get(0, 0), Some(&1.0));
//! assert_eq!(lap.get(0, 1), Some(&-1.0));
//! ```

mod normalization;
mod traits;

pub use normalization::{Geometric, RandomWalk, Renormalized, SymmetricNormalized, Unnormalized};
pub use traits::{LaplacianBuilder, LAPLACIAN_PARAMS};

use sprs::CsMat;

use crate::error::Result;
use crate::params::Params;
use crate::registry::MethodRegistry;

/// Built-in Laplacian method names, excluding `auto`.
pub const LAPLACIAN_METHODS: &[&str] = &[
    "unnormalized",
    "symmetricnormalized",
    "randomwalk",
    "renormalized",
    "geometric",
];

/// Laplacian of `affinity` using the built-in builder named `method`.
///
/// # Errors
///
/// - [`Error::UnknownMethod`](crate::Error::UnknownMethod) if `method` is not registered.
/// - Malformed-input errors: a non-square or asymmetric matrix, negative or
///   non-finite entries, a non-finite `scaling_epps`, unrecognized keys.
pub fn compute_laplacian_matrix(
    affinity: &CsMat<f64>,
    method: &str,
    params: &Params,
) -> Result<CsMat<f64>> {
    MethodRegistry::builtin().compute_laplacian(affinity, method, params)
}
