//! Name → strategy tables for the three stages.
//!
//! A registry maps method names to trait objects. The built-in registry holds
//! every strategy this crate ships; callers can start from it, add their own
//! implementations under new names, and hand the result to a
//! [`Geometry`](crate::Geometry).
//!
//! `"auto"` is not a table entry. It is resolved on each call from the input:
//!
//! | Stage | `auto` resolves to |
//! |-------|--------------------|
//! | adjacency, radius mode | `brute` (n ≤ 256), `kd_tree` (d ≤ 16), else `ball_tree` |
//! | adjacency, k-nearest mode | `brute` |
//! | affinity | `gaussian` |
//! | laplacian | `geometric` |

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use ndarray::ArrayView2;
use sprs::CsMat;

use crate::adjacency::{BallTree, BruteForce, KdTree, NeighborSearch, ProjectionIndex};
use crate::affinity::{AffinityKernel, Gaussian};
use crate::error::{Error, Result, Stage};
use crate::laplacian::{
    Geometric, LaplacianBuilder, RandomWalk, Renormalized, SymmetricNormalized, Unnormalized,
};
use crate::params::Params;

/// The meta method name resolved per call.
pub const AUTO: &str = "auto";

/// Largest point count for which `auto` picks the exhaustive scan.
pub const AUTO_BRUTE_MAX_POINTS: usize = 256;

/// Largest dimension for which `auto` picks the k-d tree.
pub const AUTO_KD_TREE_MAX_DIM: usize = 16;

/// Strategy tables for the adjacency, affinity and laplacian stages.
#[derive(Debug, Clone, Default)]
pub struct MethodRegistry {
    adjacency: BTreeMap<String, Arc<dyn NeighborSearch>>,
    affinity: BTreeMap<String, Arc<dyn AffinityKernel>>,
    laplacian: BTreeMap<String, Arc<dyn LaplacianBuilder>>,
}

impl MethodRegistry {
    /// Registry with no strategies at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding every built-in strategy.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register_adjacency(BruteForce::new());
        registry.register_adjacency(KdTree::new());
        registry.register_adjacency(BallTree::new());
        registry.register_adjacency(ProjectionIndex::new());

        registry.register_affinity(Gaussian::new());

        registry.register_laplacian(Unnormalized);
        registry.register_laplacian(SymmetricNormalized);
        registry.register_laplacian(RandomWalk);
        registry.register_laplacian(Renormalized);
        registry.register_laplacian(Geometric);
        registry
    }

    /// Shared built-in registry used by the free stage functions.
    pub fn builtin() -> &'static MethodRegistry {
        builtin_cell().as_ref()
    }

    /// Handle on the shared built-in registry. Every call returns the same allocation.
    pub fn shared_builtin() -> Arc<MethodRegistry> {
        Arc::clone(builtin_cell())
    }

    /// Register a neighbor search under its own name, replacing any previous one.
    pub fn register_adjacency<S: NeighborSearch + 'static>(&mut self, strategy: S) -> &mut Self {
        let _ = self
            .adjacency
            .insert(strategy.name().to_string(), Arc::new(strategy));
        self
    }

    /// Register an affinity kernel under its own name, replacing any previous one.
    pub fn register_affinity<K: AffinityKernel + 'static>(&mut self, kernel: K) -> &mut Self {
        let _ = self
            .affinity
            .insert(kernel.name().to_string(), Arc::new(kernel));
        self
    }

    /// Register a Laplacian builder under its own name, replacing any previous one.
    pub fn register_laplacian<L: LaplacianBuilder + 'static>(&mut self, builder: L) -> &mut Self {
        let _ = self
            .laplacian
            .insert(builder.name().to_string(), Arc::new(builder));
        self
    }

    /// Registered adjacency method names, sorted.
    pub fn adjacency_methods(&self) -> Vec<&str> {
        self.adjacency.keys().map(String::as_str).collect()
    }

    /// Registered affinity method names, sorted.
    pub fn affinity_methods(&self) -> Vec<&str> {
        self.affinity.keys().map(String::as_str).collect()
    }

    /// Registered laplacian method names, sorted.
    pub fn laplacian_methods(&self) -> Vec<&str> {
        self.laplacian.keys().map(String::as_str).collect()
    }

    /// Concrete adjacency method for `method` given an n×d input and the query `params`.
    ///
    /// The built-in indexes accelerate radius queries only, so a k-nearest
    /// query (`n_neighbors` set) always resolves `auto` to the exhaustive scan.
    pub fn resolve_adjacency<'a>(
        &self,
        method: &'a str,
        n: usize,
        d: usize,
        params: &Params,
    ) -> &'a str {
        if method != AUTO {
            return method;
        }
        if n <= AUTO_BRUTE_MAX_POINTS || params.contains("n_neighbors") {
            "brute"
        } else if d <= AUTO_KD_TREE_MAX_DIM {
            "kd_tree"
        } else {
            "ball_tree"
        }
    }

    /// Concrete affinity method for `method`.
    pub fn resolve_affinity<'a>(&self, method: &'a str) -> &'a str {
        if method == AUTO {
            "gaussian"
        } else {
            method
        }
    }

    /// Concrete laplacian method for `method`.
    pub fn resolve_laplacian<'a>(&self, method: &'a str) -> &'a str {
        if method == AUTO {
            "geometric"
        } else {
            method
        }
    }

    /// Look up an adjacency strategy, resolving `auto` for an n×d input.
    pub fn adjacency(
        &self,
        method: &str,
        n: usize,
        d: usize,
        params: &Params,
    ) -> Result<&dyn NeighborSearch> {
        let name = self.resolve_adjacency(method, n, d, params);
        self.adjacency
            .get(name)
            .map(|s| s.as_ref())
            .ok_or_else(|| unknown(Stage::Adjacency, method))
    }

    /// Look up an affinity kernel, resolving `auto`.
    pub fn affinity(&self, method: &str) -> Result<&dyn AffinityKernel> {
        let name = self.resolve_affinity(method);
        self.affinity
            .get(name)
            .map(|k| k.as_ref())
            .ok_or_else(|| unknown(Stage::Affinity, method))
    }

    /// Look up a Laplacian builder, resolving `auto`.
    pub fn laplacian(&self, method: &str) -> Result<&dyn LaplacianBuilder> {
        let name = self.resolve_laplacian(method);
        self.laplacian
            .get(name)
            .map(|b| b.as_ref())
            .ok_or_else(|| unknown(Stage::Laplacian, method))
    }

    /// Distance graph of `points` with the strategy named `method`.
    pub fn compute_adjacency(
        &self,
        points: ArrayView2<'_, f64>,
        method: &str,
        params: &Params,
    ) -> Result<CsMat<f64>> {
        let strategy = self.adjacency(method, points.nrows(), points.ncols(), params)?;
        log::debug!(
            "adjacency: method={} ({}) params={}",
            method,
            strategy.name(),
            params
        );
        strategy.search(points, params)
    }

    /// Affinity graph of `distances` with the kernel named `method`.
    pub fn compute_affinity(
        &self,
        distances: &CsMat<f64>,
        method: &str,
        params: &Params,
    ) -> Result<CsMat<f64>> {
        let kernel = self.affinity(method)?;
        log::debug!(
            "affinity: method={} ({}) params={}",
            method,
            kernel.name(),
            params
        );
        kernel.transform(distances, params)
    }

    /// Laplacian of `affinity` with the builder named `method`.
    pub fn compute_laplacian(
        &self,
        affinity: &CsMat<f64>,
        method: &str,
        params: &Params,
    ) -> Result<CsMat<f64>> {
        let builder = self.laplacian(method)?;
        log::debug!(
            "laplacian: method={} ({}) params={}",
            method,
            builder.name(),
            params
        );
        builder.build(affinity, params)
    }
}

fn builtin_cell() -> &'static Arc<MethodRegistry> {
    static BUILTIN: OnceLock<Arc<MethodRegistry>> = OnceLock::new();
    BUILTIN.get_or_init(|| Arc::new(MethodRegistry::with_builtins()))
}

fn unknown(stage: Stage, method: &str) -> Error {
    Error::UnknownMethod {
        stage,
        method: method.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjacency::{Neighborhoods, ADJACENCY_METHODS};
    use crate::affinity::AFFINITY_METHODS;
    use crate::laplacian::LAPLACIAN_METHODS;
    use crate::test_util::uniform_points;

    #[test]
    fn builtins_cover_published_method_lists() {
        let r = MethodRegistry::builtin();
        let mut adjacency: Vec<&str> = ADJACENCY_METHODS.to_vec();
        adjacency.sort_unstable();
        assert_eq!(r.adjacency_methods(), adjacency);

        assert_eq!(r.affinity_methods(), AFFINITY_METHODS.to_vec());

        let mut laplacian: Vec<&str> = LAPLACIAN_METHODS.to_vec();
        laplacian.sort_unstable();
        assert_eq!(r.laplacian_methods(), laplacian);
    }

    #[test]
    fn auto_resolution_depends_on_shape() {
        let r = MethodRegistry::builtin();
        let by_radius = Params::new().with("radius", 0.1);
        assert_eq!(r.resolve_adjacency(AUTO, 10, 50, &by_radius), "brute");
        assert_eq!(r.resolve_adjacency(AUTO, 1000, 3, &by_radius), "kd_tree");
        assert_eq!(r.resolve_adjacency(AUTO, 1000, 64, &by_radius), "ball_tree");
        assert_eq!(r.resolve_adjacency("projection", 10, 2, &by_radius), "projection");
        assert_eq!(r.resolve_affinity(AUTO), "gaussian");
        assert_eq!(r.resolve_laplacian(AUTO), "geometric");
    }

    #[test]
    fn auto_k_nearest_uses_exhaustive_scan() {
        let r = MethodRegistry::builtin();
        let by_count = Params::new().with("n_neighbors", 5usize);
        assert_eq!(r.resolve_adjacency(AUTO, 1000, 3, &by_count), "brute");
        assert_eq!(r.resolve_adjacency(AUTO, 1000, 64, &by_count), "brute");
        // an explicit index is honored
        assert_eq!(r.resolve_adjacency("kd_tree", 1000, 3, &by_count), "kd_tree");
    }

    #[test]
    fn shared_builtin_is_one_allocation() {
        let a = MethodRegistry::shared_builtin();
        let b = MethodRegistry::shared_builtin();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(std::ptr::eq(a.as_ref(), MethodRegistry::builtin()));
    }

    #[test]
    fn empty_registry_rejects_auto() {
        let r = MethodRegistry::empty();
        let x = uniform_points(3, 2, 0);
        let err = r
            .compute_adjacency(x.view(), AUTO, &Params::new().with("radius", 1.0))
            .unwrap_err();
        assert_eq!(
            err,
            Error::UnknownMethod {
                stage: Stage::Adjacency,
                method: AUTO.into()
            }
        );
    }

    /// Links every point to every other point.
    #[derive(Debug)]
    struct Complete;

    impl NeighborSearch for Complete {
        fn name(&self) -> &str {
            "complete"
        }

        fn radius_neighbors(
            &self,
            points: ArrayView2<'_, f64>,
            _radius: f64,
            _params: &Params,
        ) -> Result<Neighborhoods> {
            let n = points.nrows();
            Ok((0..n)
                .map(|i| (0..n).filter(|&j| j != i).map(|j| (j, 1.0)).collect())
                .collect())
        }
    }

    #[test]
    fn custom_strategy_is_dispatched_by_name() {
        let mut r = MethodRegistry::with_builtins();
        r.register_adjacency(Complete);
        let x = uniform_points(4, 2, 1);
        let g = r
            .compute_adjacency(x.view(), "complete", &Params::new().with("radius", 0.01))
            .unwrap();
        assert_eq!(g.nnz(), 12);
        assert!(r.adjacency_methods().contains(&"complete"));
    }
}
