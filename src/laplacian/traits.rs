//! Laplacian builder trait.

use std::fmt;

use sprs::CsMat;

use crate::error::Result;
use crate::params::Params;
use crate::validate;

/// Parameters every Laplacian builder accepts.
pub const LAPLACIAN_PARAMS: &[&str] = &["scaling_epps", "symmetrize_input"];

/// A normalization scheme turning an affinity graph into a graph Laplacian.
pub trait LaplacianBuilder: Send + Sync + fmt::Debug {
    /// Registry name.
    fn name(&self) -> &str;

    /// Strategy-specific tuning keys accepted on top of [`LAPLACIAN_PARAMS`].
    fn tuning_params(&self) -> &[&str] {
        &[]
    }

    /// Laplacian of a validated, symmetric, CSR affinity graph.
    fn laplacian(&self, affinity: &CsMat<f64>, params: &Params) -> Result<CsMat<f64>>;

    /// Laplacian of `affinity`.
    ///
    /// With `symmetrize_input = true` the input is first replaced by
    /// `(A + Aᵀ) / 2`. The (possibly symmetrized) input must be square,
    /// finite, non-negative and symmetric.
    fn build(&self, affinity: &CsMat<f64>, params: &Params) -> Result<CsMat<f64>> {
        let recognized: Vec<&str> = LAPLACIAN_PARAMS
            .iter()
            .copied()
            .chain(self.tuning_params().iter().copied())
            .collect();
        params.check_known(self.name(), &recognized)?;

        let symmetrize = params.get_bool("symmetrize_input")?.unwrap_or(false);
        let (csr, n) = if symmetrize {
            validate::check_square(affinity)?;
            validate::affinity_graph(&symmetrized(affinity))?
        } else {
            validate::affinity_graph(affinity)?
        };

        let lap = self.laplacian(&csr, params)?;
        log::trace!("{}: n={}, nnz={}", self.name(), n, lap.nnz());
        Ok(lap)
    }
}

/// `(A + Aᵀ) / 2` in CSR form.
pub(crate) fn symmetrized(a: &CsMat<f64>) -> CsMat<f64> {
    let csr = validate::to_csr(a);
    let mut tri = sprs::TriMat::with_capacity(csr.shape(), 2 * csr.nnz());
    for (i, row) in csr.outer_iterator().enumerate() {
        for (j, &v) in row.iter() {
            tri.add_triplet(i, j, 0.5 * v);
            tri.add_triplet(j, i, 0.5 * v);
        }
    }
    tri.to_csr()
}
