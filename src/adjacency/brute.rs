//! Exhaustive pairwise neighbor search.
//!
//! Measures all n(n-1)/2 pairs. O(n²·d) time, no index memory. The reference
//! against which the indexed strategies are tested, and the fastest choice for
//! small inputs.

use ndarray::ArrayView2;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::traits::{euclidean, Neighborhoods, NeighborSearch};
use crate::error::Result;
use crate::params::Params;

/// Brute-force radius neighbors.
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForce;

impl BruteForce {
    /// Create the strategy.
    pub fn new() -> Self {
        Self
    }

    fn row_neighbors(points: ArrayView2<'_, f64>, i: usize, radius: f64) -> Vec<(usize, f64)> {
        let row = points.row(i);
        (0..points.nrows())
            .filter(|&j| j != i)
            .filter_map(|j| {
                let d = euclidean(row, points.row(j));
                (d <= radius).then_some((j, d))
            })
            .collect()
    }
}

impl NeighborSearch for BruteForce {
    fn name(&self) -> &str {
        "brute"
    }

    fn radius_neighbors(
        &self,
        points: ArrayView2<'_, f64>,
        radius: f64,
        _params: &Params,
    ) -> Result<Neighborhoods> {
        let n = points.nrows();

        #[cfg(feature = "parallel")]
        let hoods: Neighborhoods = (0..n)
            .into_par_iter()
            .map(|i| Self::row_neighbors(points, i, radius))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let hoods: Neighborhoods = (0..n)
            .map(|i| Self::row_neighbors(points, i, radius))
            .collect();

        Ok(hoods)
    }
}
