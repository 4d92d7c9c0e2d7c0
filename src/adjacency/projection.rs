//! Random-projection index.
//!
//! Projects every point onto a few random unit directions. For a unit `u`,
//! `|<x, u> - <y, u>| <= ||x - y||`, so a pair farther apart than `radius` in
//! any projection cannot be a neighbor. Candidates come from a sliding window
//! over the points sorted by their first projection, are filtered by the
//! remaining projections, and are then verified with the exact distance.
//!
//! The projections only generate candidates, so the result is exact. The
//! random directions affect speed, never the graph.
//!
//! # References
//!
//! - Indyk & Motwani (1998). "Approximate nearest neighbors: towards removing
//!   the curse of dimensionality"

use ndarray::{Array1, Array2, ArrayView2};
use rand::prelude::*;
use rand_distr::StandardNormal;

use super::traits::{euclidean, prune_slack, Neighborhoods, NeighborSearch};
use crate::error::{Error, Result};
use crate::params::Params;

/// Random-projection candidate index with exact verification.
#[derive(Debug, Clone)]
pub struct ProjectionIndex {
    /// Number of projection directions.
    n_projections: usize,
    /// Seed for the directions.
    seed: u64,
}

impl Default for ProjectionIndex {
    fn default() -> Self {
        Self {
            n_projections: 3,
            seed: 0,
        }
    }
}

impl ProjectionIndex {
    /// Create with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of projection directions.
    pub fn with_n_projections(mut self, n_projections: usize) -> Self {
        self.n_projections = n_projections.max(1);
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// `m` unit directions in `d` dimensions. Row `k` is direction `k`.
    fn directions(d: usize, m: usize, seed: u64) -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut dirs = Array2::<f64>::zeros((m, d));
        for mut row in dirs.rows_mut() {
            loop {
                row.mapv_inplace(|_| rng.sample(StandardNormal));
                let norm = row.dot(&row).sqrt();
                if norm > 1e-12 {
                    row /= norm;
                    break;
                }
            }
        }
        dirs
    }
}

impl NeighborSearch for ProjectionIndex {
    fn name(&self) -> &str {
        "projection"
    }

    fn tuning_params(&self) -> &[&str] {
        &["n_projections", "random_state"]
    }

    fn radius_neighbors(
        &self,
        points: ArrayView2<'_, f64>,
        radius: f64,
        params: &Params,
    ) -> Result<Neighborhoods> {
        let m = params
            .get_usize("n_projections")?
            .unwrap_or(self.n_projections);
        if m == 0 {
            return Err(Error::invalid_parameter("n_projections", "must be >= 1"));
        }
        let seed = params.get_u64("random_state")?.unwrap_or(self.seed);

        let n = points.nrows();
        let dirs = Self::directions(points.ncols(), m, seed);
        // projections[[i, k]] = <x_i, u_k>
        let projections = points.dot(&dirs.t());
        let scale = projections.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
        let reach = radius + prune_slack(radius, scale);

        let primary: Array1<f64> = projections.column(0).to_owned();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_unstable_by(|&a, &b| primary[a].total_cmp(&primary[b]));

        let mut hoods: Neighborhoods = vec![Vec::new(); n];
        let mut candidates = 0usize;
        for (a, &i) in order.iter().enumerate() {
            for &j in &order[a + 1..] {
                if primary[j] - primary[i] > reach {
                    break;
                }
                let filtered = (1..m)
                    .any(|k| (projections[[i, k]] - projections[[j, k]]).abs() > reach);
                if filtered {
                    continue;
                }
                candidates += 1;
                let d = euclidean(points.row(i), points.row(j));
                if d <= radius {
                    hoods[i].push((j, d));
                    hoods[j].push((i, d));
                }
            }
        }
        log::trace!(
            "projection: {} candidate pairs verified out of {}",
            candidates,
            n * n.saturating_sub(1) / 2
        );
        Ok(hoods)
    }
}
