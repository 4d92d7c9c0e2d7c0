//! The built-in normalization schemes.
//!
//! Notation: `A` is the affinity graph, `deg(i) = Σ_j A_ij`, `D = diag(deg)`,
//! and `D^{-p}` is taken entry-wise with `0^{-p} := 0`. `I⁺` is the identity
//! restricted to nodes of positive degree. Restricting the identity keeps the
//! rows and columns of isolated nodes at zero.
//!
//! | Scheme | Operator |
//! |--------|----------|
//! | `unnormalized` | `D − A` |
//! | `symmetricnormalized` | `I⁺ − D^{-1/2} A D^{-1/2}` |
//! | `randomwalk` | `I⁺ − D^{-1} A` |
//! | `renormalized` | `Ã = D^{-α} A D^{-α}`, then `I⁺ − D̃^{-1} Ã` |
//! | `geometric` | `Ã = D^{-1} A D^{-1}`, then `I⁺ − D̃^{-1/2} Ã D̃^{-1/2}` |
//!
//! The renormalization divides out the sampling density before normalizing.
//! With α = 1 the random-walk operator converges to the Laplace–Beltrami
//! operator of the underlying manifold regardless of how unevenly the points
//! were sampled (Coifman & Lafon 2006). `geometric` is that α = 1 operator in
//! its symmetric form, which has the same spectrum. `renormalized` exposes α
//! as `scaling_epps`: α = 0 is plain `randomwalk`, α = 1/2 gives
//! Fokker–Planck diffusion.
//!
//! # References
//!
//! - von Luxburg (2007). "A Tutorial on Spectral Clustering"
//! - Coifman & Lafon (2006). "Diffusion maps"

use sprs::{CsMat, TriMat};

use super::traits::LaplacianBuilder;
use crate::error::{Error, Result};
use crate::params::Params;

/// Row sums.
pub(crate) fn degrees(a: &CsMat<f64>) -> Vec<f64> {
    a.outer_iterator()
        .map(|row| row.iter().map(|(_, &v)| v).sum())
        .collect()
}

/// `x^{-p}` with `0^{-p} := 0`.
#[inline]
fn inv_pow(x: f64, p: f64) -> f64 {
    if x > 0.0 {
        x.powf(-p)
    } else {
        0.0
    }
}

/// `diag(left) · A · diag(right)`, same sparsity pattern as `A`.
fn scaled(a: &CsMat<f64>, left: &[f64], right: &[f64]) -> CsMat<f64> {
    let mut tri = TriMat::with_capacity(a.shape(), a.nnz());
    for (i, row) in a.outer_iterator().enumerate() {
        for (j, &v) in row.iter() {
            tri.add_triplet(i, j, left[i] * v * right[j]);
        }
    }
    tri.to_csr()
}

/// `diag(diag) − M`. Zero diagonal terms are not stored.
fn diag_minus(diag: &[f64], m: &CsMat<f64>) -> CsMat<f64> {
    let mut tri = TriMat::with_capacity(m.shape(), m.nnz() + diag.len());
    for (i, &d) in diag.iter().enumerate() {
        if d != 0.0 {
            tri.add_triplet(i, i, d);
        }
    }
    for (i, row) in m.outer_iterator().enumerate() {
        for (j, &v) in row.iter() {
            tri.add_triplet(i, j, -v);
        }
    }
    tri.to_csr()
}

/// 1 at nodes of positive degree, 0 at isolated nodes.
fn connected(deg: &[f64]) -> Vec<f64> {
    deg.iter().map(|&d| if d > 0.0 { 1.0 } else { 0.0 }).collect()
}

fn powers(deg: &[f64], p: f64) -> Vec<f64> {
    deg.iter().map(|&d| inv_pow(d, p)).collect()
}

/// `I⁺ − D̃^{-1} Ã` for `Ã = D^{-α} A D^{-α}`.
///
/// The left factor `deg_i^{-α}` cancels in the row normalization, leaving
/// `A_ij deg_j^{-α} / Σ_k A_ik deg_k^{-α}` for row i. The weights are formed in
/// log space relative to the row maximum, so `deg^{-α}` is never materialized
/// and cannot overflow for small degrees or large α.
fn renormalized_random_walk(a: &CsMat<f64>, alpha: f64) -> CsMat<f64> {
    let log_deg: Vec<f64> = degrees(a).iter().map(|d| d.ln()).collect();
    let mut tri = TriMat::with_capacity(a.shape(), a.nnz() + a.rows());
    let mut logits: Vec<(usize, f64)> = Vec::new();
    for (i, row) in a.outer_iterator().enumerate() {
        logits.clear();
        logits.extend(
            row.iter()
                .filter(|&(_, &v)| v > 0.0)
                .map(|(j, &v)| (j, v.ln() - alpha * log_deg[j])),
        );
        let Some(top) = logits.iter().map(|&(_, l)| l).reduce(f64::max) else {
            // isolated
            continue;
        };
        let total: f64 = logits.iter().map(|&(_, l)| (l - top).exp()).sum();
        tri.add_triplet(i, i, 1.0);
        for &(j, l) in &logits {
            tri.add_triplet(i, j, -(l - top).exp() / total);
        }
    }
    tri.to_csr()
}

/// `I⁺ − D̃^{-1/2} Ã D̃^{-1/2}` for `Ã = D^{-1} A D^{-1}`.
///
/// With `r_i = Σ_k A_ik / deg_k` this is
/// `A_ij / (√deg_i √deg_j √r_i √r_j)`. Every factor is bounded (`A_ik <= deg_k`),
/// so no intermediate overflows.
fn geometric(a: &CsMat<f64>) -> CsMat<f64> {
    let deg = degrees(a);
    let inv_deg = powers(&deg, 1.0);
    let r: Vec<f64> = a
        .outer_iterator()
        .map(|row| row.iter().map(|(k, &v)| v * inv_deg[k]).sum())
        .collect();
    let left: Vec<f64> = deg
        .iter()
        .zip(&r)
        .map(|(&d, &r)| inv_pow(d, 0.5) * inv_pow(r, 0.5))
        .collect();
    diag_minus(&connected(&deg), &scaled(a, &left, &left))
}

fn symmetric_normalized(a: &CsMat<f64>) -> CsMat<f64> {
    let deg = degrees(a);
    let s = powers(&deg, 0.5);
    diag_minus(&connected(&deg), &scaled(a, &s, &s))
}

fn random_walk(a: &CsMat<f64>) -> CsMat<f64> {
    let deg = degrees(a);
    let ones = vec![1.0; deg.len()];
    diag_minus(&connected(&deg), &scaled(a, &powers(&deg, 1.0), &ones))
}

/// `L = D − A`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unnormalized;

impl LaplacianBuilder for Unnormalized {
    fn name(&self) -> &str {
        "unnormalized"
    }

    fn laplacian(&self, affinity: &CsMat<f64>, _params: &Params) -> Result<CsMat<f64>> {
        Ok(diag_minus(&degrees(affinity), affinity))
    }
}

/// `L = I − D^{-1/2} A D^{-1/2}`. Symmetric, eigenvalues in [0, 2].
#[derive(Debug, Clone, Copy, Default)]
pub struct SymmetricNormalized;

impl LaplacianBuilder for SymmetricNormalized {
    fn name(&self) -> &str {
        "symmetricnormalized"
    }

    fn laplacian(&self, affinity: &CsMat<f64>, _params: &Params) -> Result<CsMat<f64>> {
        Ok(symmetric_normalized(affinity))
    }
}

/// `L = I − D^{-1} A`. Rows of connected nodes sum to zero; not symmetric.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomWalk;

impl LaplacianBuilder for RandomWalk {
    fn name(&self) -> &str {
        "randomwalk"
    }

    fn laplacian(&self, affinity: &CsMat<f64>, _params: &Params) -> Result<CsMat<f64>> {
        Ok(random_walk(affinity))
    }
}

/// Density renormalization with exponent `scaling_epps`, then random walk.
#[derive(Debug, Clone, Copy, Default)]
pub struct Renormalized;

impl LaplacianBuilder for Renormalized {
    fn name(&self) -> &str {
        "renormalized"
    }

    fn laplacian(&self, affinity: &CsMat<f64>, params: &Params) -> Result<CsMat<f64>> {
        let alpha = params.get_f64("scaling_epps")?.unwrap_or(0.0);
        if !alpha.is_finite() {
            return Err(Error::invalid_parameter(
                "scaling_epps",
                format!("must be finite, got {alpha}"),
            ));
        }
        Ok(renormalized_random_walk(affinity, alpha))
    }
}

/// Laplace–Beltrami approximation: α = 1 renormalization, then symmetric normalization.
#[derive(Debug, Clone, Copy, Default)]
pub struct Geometric;

impl LaplacianBuilder for Geometric {
    fn name(&self) -> &str {
        "geometric"
    }

    fn laplacian(&self, affinity: &CsMat<f64>, _params: &Params) -> Result<CsMat<f64>> {
        Ok(geometric(affinity))
    }
}
