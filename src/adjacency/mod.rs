//! Neighbor graphs from point clouds.
//!
//! The first pipeline stage turns an n×d data matrix into an n×n sparse
//! distance graph. Entry (i, j) holds the Euclidean distance between points i
//! and j when they are neighbors and is structurally absent otherwise.
//!
//! ## Neighborhood criteria
//!
//! - **Radius** (`radius`): i and j are neighbors iff `dist(i, j) <= radius`.
//!   Symmetric by construction; this is the mode the affinity and Laplacian
//!   stages assume.
//! - **k-nearest** (`n_neighbors`): each point links to its k nearest other
//!   points, and the graph is symmetrized by union.
//!
//! ## Strategies
//!
//! | Method | Index | Best for |
//! |--------|-------|----------|
//! | `brute` | none, O(n²·d) | small n, any d |
//! | `kd_tree` | axis-aligned boxes | low d |
//! | `ball_tree` | nested balls | medium d |
//! | `projection` | sorted random projections | large n, moderate radius |
//!
//! All strategies return the same graph, bit for bit, for the same input:
//! candidate pairs are always confirmed with the same distance function and
//! the same `<=` test, and pruning bounds carry a small slack so rounding can
//! only admit extra candidates, never drop a true neighbor.
//!
//! The indexes accelerate the radius query only. k-nearest mode runs the
//! same exhaustive scan (O(n²·d)) whichever method is named.
//!
//! `auto` picks `brute` for up to 256 points, `kd_tree` up to 16
//! dimensions, and `ball_tree` otherwise. In k-nearest mode it always picks
//! `brute`.
//!
//! ## Usage
//!
//! ```rust
//! use manigraph::{compute_adjacency_matrix, Params};
//! use ndarray::array;
//!
//! let points = array![[0.0, 0.0], [0.5, 0.0], [3.0, 0.0]];
//! let graph = compute_adjacency_matrix(
//!     points.view(),
//!     "kd_tree",
//!     &Params::new().with("radius", 1.0),
//! )
//! .unwrap();
//!
//! assert_eq!(graph.get(0, 1), Some(&0.5));
//! assert_eq!(graph.get(0, 2), None);
//! ```

mod ball_tree;
mod brute;
mod kd_tree;
mod projection;
mod traits;

pub use ball_tree::BallTree;
pub use brute::BruteForce;
pub use kd_tree::KdTree;
pub use projection::ProjectionIndex;
pub use traits::{euclidean, NeighborSearch, Neighborhoods, SEARCH_PARAMS};

use ndarray::ArrayView2;
use sprs::CsMat;

use crate::error::Result;
use crate::params::Params;
use crate::registry::MethodRegistry;

/// Built-in adjacency method names, excluding `auto`.
pub const ADJACENCY_METHODS: &[&str] = &["brute", "kd_tree", "ball_tree", "projection"];

/// Distance graph of `points` using the built-in strategy named `method`.
///
/// # Errors
///
/// - [`Error::UnknownMethod`](crate::Error::UnknownMethod) if `method` is not registered.
/// - Malformed-input errors from the strategy: empty or non-finite points,
///   non-positive radius, missing or conflicting `radius` / `n_neighbors`,
///   unrecognized parameter keys.
pub fn compute_adjacency_matrix(
    points: ArrayView2<'_, f64>,
    method: &str,
    params: &Params,
) -> Result<CsMat<f64>> {
    MethodRegistry::builtin().compute_adjacency(points, method, params)
}
