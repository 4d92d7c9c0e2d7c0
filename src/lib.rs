//! # manigraph
//!
//! Neighbor, affinity and Laplacian graphs from point clouds: the geometry
//! layer of a manifold-learning stack.
//!
//! Three stages, each a table of interchangeable strategies selected by name:
//!
//! | Stage | Input | Output | Methods |
//! |-------|-------|--------|---------|
//! | [`adjacency`] | n×d points | sparse distance graph | `brute`, `kd_tree`, `ball_tree`, `projection` |
//! | [`affinity`] | distance graph | sparse similarity graph | `gaussian` |
//! | [`laplacian`] | affinity graph | graph Laplacian | `unnormalized`, `symmetricnormalized`, `randomwalk`, `renormalized`, `geometric` |
//!
//! Every stage also accepts `auto`. Stages can be called directly through the
//! free functions, or driven by a [`Geometry`], which holds one source
//! representation and caches each derived matrix together with the
//! parameters it was computed with.
//!
//! Parameters are passed as [`Params`], a string-keyed map. Keys a method
//! does not recognize are rejected.
//!
//! The `parallel` feature (on by default) runs the exhaustive neighbor scan
//! on rayon.

pub mod adjacency;
pub mod affinity;
/// Error types used across `manigraph`.
pub mod error;
pub mod geometry;
pub mod laplacian;
pub mod params;
pub mod registry;
pub mod validate;

#[cfg(test)]
mod geometry_tests;
#[cfg(test)]
mod test_util;

pub use error::{
    Error, Result, Stage, AFFINITY_ERROR_MSG, DISTANCE_ERROR_MSG, LAPLACIAN_ERROR_MSG,
};
pub use geometry::{Geometry, SourceKind};
pub use params::{ParamValue, Params, StageConfig};
pub use registry::{MethodRegistry, AUTO};

pub use adjacency::{
    compute_adjacency_matrix, euclidean, BallTree, BruteForce, KdTree, NeighborSearch,
    ProjectionIndex, ADJACENCY_METHODS,
};
pub use affinity::{compute_affinity_matrix, AffinityKernel, Gaussian, AFFINITY_METHODS};
pub use laplacian::{
    compute_laplacian_matrix, Geometric, LaplacianBuilder, RandomWalk, Renormalized,
    SymmetricNormalized, Unnormalized, LAPLACIAN_METHODS,
};
