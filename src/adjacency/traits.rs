//! Neighbor search trait and graph assembly.

use std::fmt;

use ndarray::{ArrayView1, ArrayView2};
use sprs::{CsMat, TriMat};

use crate::error::{Error, Result};
use crate::params::Params;
use crate::validate::check_points;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Per-point neighbor lists: `hoods[i]` holds `(j, distance)` for every neighbor `j != i`.
pub type Neighborhoods = Vec<Vec<(usize, f64)>>;

/// Parameters every neighbor search accepts.
pub const SEARCH_PARAMS: &[&str] = &["radius", "n_neighbors"];

/// Euclidean distance between two rows.
///
/// Every strategy measures candidate pairs with this function, so distances
/// and the `<= radius` decision are bit-identical across strategies.
#[inline]
pub fn euclidean(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Absolute slack added to pruning bounds so rounding never prunes a true neighbor.
#[inline]
pub(crate) fn prune_slack(radius: f64, scale: f64) -> f64 {
    1e-9 * (radius + scale) + 1e-12
}

/// A strategy that builds a symmetric neighbor graph from points.
///
/// Implementors only provide the radius query. Validation, parameter parsing,
/// k-nearest mode and sparse assembly are shared by [`NeighborSearch::search`].
/// Any implementation must return exactly the pairs with
/// `euclidean(i, j) <= radius`; strategies differ in speed only.
pub trait NeighborSearch: Send + Sync + fmt::Debug {
    /// Registry name.
    fn name(&self) -> &str;

    /// Strategy-specific tuning keys accepted on top of [`SEARCH_PARAMS`].
    fn tuning_params(&self) -> &[&str] {
        &[]
    }

    /// All neighbors within `radius` of every point. Points are already validated.
    fn radius_neighbors(
        &self,
        points: ArrayView2<'_, f64>,
        radius: f64,
        params: &Params,
    ) -> Result<Neighborhoods>;

    /// The `k` nearest other points of every point, ties broken by lower index.
    ///
    /// Defaults to the exhaustive scan; none of the built-in indexes override
    /// it, so in k-nearest mode they cost the same as `brute`.
    fn k_neighbors(
        &self,
        points: ArrayView2<'_, f64>,
        k: usize,
        _params: &Params,
    ) -> Result<Neighborhoods> {
        Ok(exhaustive_k_neighbors(points, k))
    }

    /// Build the distance graph for `points`.
    ///
    /// Exactly one of `radius` (> 0) or `n_neighbors` (>= 1) must be set.
    /// k-nearest graphs are symmetrized by union.
    fn search(&self, points: ArrayView2<'_, f64>, params: &Params) -> Result<CsMat<f64>> {
        let recognized: Vec<&str> = SEARCH_PARAMS
            .iter()
            .copied()
            .chain(self.tuning_params().iter().copied())
            .collect();
        params.check_known(self.name(), &recognized)?;
        check_points(points)?;

        let n = points.nrows();
        let radius = params.positive_f64("radius")?;
        let k = params.get_usize("n_neighbors")?;

        let graph = match (radius, k) {
            (Some(radius), None) => {
                let hoods = self.radius_neighbors(points, radius, params)?;
                assemble(n, &hoods, false)
            }
            (None, Some(0)) => {
                return Err(Error::invalid_parameter("n_neighbors", "must be >= 1"));
            }
            (None, Some(k)) => {
                let hoods = self.k_neighbors(points, k, params)?;
                assemble(n, &hoods, true)
            }
            (None, None) => {
                return Err(Error::invalid_parameter(
                    "radius",
                    "one of 'radius' or 'n_neighbors' is required",
                ));
            }
            (Some(_), Some(_)) => {
                return Err(Error::invalid_parameter(
                    "n_neighbors",
                    "cannot be combined with 'radius'",
                ));
            }
        };

        log::trace!(
            "{}: {} points, {} stored distances",
            self.name(),
            n,
            graph.nnz()
        );
        Ok(graph)
    }
}

/// k nearest neighbors by full scan: O(n²·d) distances plus a linear-time
/// selection per row. Parallel over rows with the `parallel` feature.
pub(crate) fn exhaustive_k_neighbors(points: ArrayView2<'_, f64>, k: usize) -> Neighborhoods {
    let n = points.nrows();
    let k = k.min(n.saturating_sub(1));

    #[cfg(feature = "parallel")]
    let hoods = (0..n)
        .into_par_iter()
        .map(|i| k_nearest_of(points, i, k))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let hoods = (0..n).map(|i| k_nearest_of(points, i, k)).collect();

    hoods
}

fn k_nearest_of(points: ArrayView2<'_, f64>, i: usize, k: usize) -> Vec<(usize, f64)> {
    let by_distance =
        |a: &(usize, f64), b: &(usize, f64)| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0));
    let row = points.row(i);
    let mut scored: Vec<(usize, f64)> = (0..points.nrows())
        .filter(|&j| j != i)
        .map(|j| (j, euclidean(row, points.row(j))))
        .collect();
    if k < scored.len() {
        let _ = scored.select_nth_unstable_by(k, by_distance);
        scored.truncate(k);
    }
    scored.sort_unstable_by(by_distance);
    scored
}

/// Sparse n×n CSR graph from neighbor lists.
///
/// With `symmetrize`, every (i, j) also stores (j, i). Duplicate pairs are
/// stored once; a pair's distance does not depend on its orientation.
pub(crate) fn assemble(n: usize, hoods: &Neighborhoods, symmetrize: bool) -> CsMat<f64> {
    let mut triplets: Vec<(usize, usize, f64)> = Vec::new();
    for (i, hood) in hoods.iter().enumerate() {
        for &(j, d) in hood {
            if i == j {
                continue;
            }
            triplets.push((i, j, d));
            if symmetrize {
                triplets.push((j, i, d));
            }
        }
    }
    triplets.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    triplets.dedup_by_key(|t| (t.0, t.1));

    let mut tri = TriMat::with_capacity((n, n), triplets.len());
    for (i, j, d) in triplets {
        tri.add_triplet(i, j, d);
    }
    tri.to_csr()
}
