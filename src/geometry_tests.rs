//! Cross-stage tests for the caching pipeline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ndarray::{Array2, ArrayView2};
use sprs::CsMat;

use crate::adjacency::{BruteForce, NeighborSearch, Neighborhoods};
use crate::affinity::{AffinityKernel, Gaussian};
use crate::laplacian::{LaplacianBuilder, RandomWalk};
use crate::test_util::{entries, uniform_points};
use crate::{
    compute_adjacency_matrix, compute_affinity_matrix, compute_laplacian_matrix, Error, Geometry,
    MethodRegistry, Params, SourceKind, AFFINITY_ERROR_MSG, DISTANCE_ERROR_MSG,
    LAPLACIAN_ERROR_MSG, LAPLACIAN_METHODS,
};

fn points() -> Array2<f64> {
    uniform_points(30, 3, 36)
}

fn data_geometry(radius: f64) -> Geometry {
    let mut geom = Geometry::new()
        .with_adjacency_method("brute")
        .with_adjacency_params(Params::new().with("radius", radius));
    geom.set_data_matrix(points().view());
    geom
}

#[test]
fn adjacency_overrides_match_stage_function() {
    let x = points();
    for (default_radius, override_radius) in [(1.0, 2.0), (2.0, 1.0), (1.0, 1.0)] {
        let mut geom = data_geometry(default_radius);
        let overrides = Params::new().with("radius", override_radius);
        let got = geom.compute_adjacency_matrix(&overrides).unwrap().clone();

        let want = compute_adjacency_matrix(x.view(), "brute", &overrides).unwrap();
        assert_eq!(entries(&got), entries(&want));
        // defaults untouched
        assert_eq!(
            geom.adjacency_config().params.get_f64("radius").unwrap(),
            Some(default_radius)
        );
    }
}

#[test]
fn adjacency_requires_data_source() {
    let x = points();
    let d = compute_adjacency_matrix(x.view(), "brute", &Params::new().with("radius", 0.5))
        .unwrap();

    let mut geom = Geometry::new();
    geom.set_adjacency_matrix(&d);
    let err = geom.compute_adjacency_matrix(&Params::new()).unwrap_err();
    assert_eq!(err, Error::InvalidSource(DISTANCE_ERROR_MSG));
    assert_eq!(err.to_string(), DISTANCE_ERROR_MSG);

    // affinity is still derivable from the distance graph
    let a = geom
        .compute_affinity_matrix(&Params::new().with("radius", 0.5))
        .unwrap();
    assert_eq!(a.nnz(), d.nnz());
}

#[test]
fn affinity_source_only_allows_laplacian() {
    let x = points();
    let params = Params::new().with("radius", 0.6);
    let d = compute_adjacency_matrix(x.view(), "brute", &params).unwrap();
    let a = compute_affinity_matrix(&d, "gaussian", &params).unwrap();

    let mut geom = Geometry::new().with_laplacian_method("symmetricnormalized");
    geom.set_affinity_matrix(&a);

    let err = geom.compute_adjacency_matrix(&Params::new()).unwrap_err();
    assert_eq!(err.to_string(), DISTANCE_ERROR_MSG);
    let err = geom.compute_affinity_matrix(&Params::new()).unwrap_err();
    assert_eq!(err, Error::InvalidSource(AFFINITY_ERROR_MSG));

    let lap = geom.compute_laplacian_matrix(&Params::new()).unwrap();
    let want = compute_laplacian_matrix(&a, "symmetricnormalized", &Params::new()).unwrap();
    assert_eq!(entries(lap), entries(&want));
}

#[test]
fn no_source_set() {
    let mut geom = Geometry::new();
    assert_eq!(geom.source_kind(), SourceKind::None);
    assert_eq!(
        geom.compute_adjacency_matrix(&Params::new()).unwrap_err(),
        Error::InvalidSource(DISTANCE_ERROR_MSG)
    );
    assert_eq!(
        geom.compute_affinity_matrix(&Params::new()).unwrap_err(),
        Error::InvalidSource(AFFINITY_ERROR_MSG)
    );
    let err = geom.compute_laplacian_matrix(&Params::new()).unwrap_err();
    assert_eq!(err.to_string(), LAPLACIAN_ERROR_MSG);
}

#[test]
fn laplacian_from_every_source() {
    let x = points();
    let adjacency = Params::new().with("radius", 0.7);
    let affinity = Params::new().with("radius", 0.4);
    let mut geom = Geometry::new()
        .with_adjacency_method("kd_tree")
        .with_adjacency_params(adjacency.clone())
        .with_affinity_params(affinity.clone())
        .with_laplacian_method("geometric");

    geom.set_data_matrix(x.view());
    let from_data = geom.compute_laplacian_matrix(&Params::new()).unwrap().clone();
    assert!(geom.adjacency_matrix().is_some());
    assert!(geom.affinity_matrix().is_some());

    let d = compute_adjacency_matrix(x.view(), "brute", &adjacency).unwrap();
    geom.set_adjacency_matrix(&d);
    assert_eq!(geom.source_kind(), SourceKind::Adjacency);
    assert!(geom.laplacian_matrix().is_none());
    let from_adjacency = geom.compute_laplacian_matrix(&Params::new()).unwrap().clone();

    let a = compute_affinity_matrix(&d, "gaussian", &affinity).unwrap();
    geom.set_affinity_matrix(&a);
    let from_affinity = geom.compute_laplacian_matrix(&Params::new()).unwrap().clone();

    assert_eq!(entries(&from_data), entries(&from_adjacency));
    assert_eq!(entries(&from_data), entries(&from_affinity));
}

/// `{radius: r}` or the empty map.
fn radius(r: Option<f64>) -> Params {
    r.map_or_else(Params::new, |r| Params::new().with("radius", r))
}

/// `{scaling_epps: e}` or the empty map.
fn epps(e: Option<f64>) -> Params {
    e.map_or_else(Params::new, |e| Params::new().with("scaling_epps", e))
}

#[test]
fn every_laplacian_type_through_pipeline() {
    let x = points();
    for method in LAPLACIAN_METHODS {
        for adjacency_radius in [1.0, 2.0] {
            for affinity_radius in [4.0, 5.0] {
                for scaling_epps in [4.0, 10.0] {
                    let mut geom = Geometry::new()
                        .with_adjacency_params(Params::new().with("radius", adjacency_radius))
                        .with_affinity_params(Params::new().with("radius", affinity_radius))
                        .with_laplacian_method(*method)
                        .with_laplacian_params(
                            Params::new().with("scaling_epps", scaling_epps),
                        );
                    geom.set_data_matrix(x.view());
                    let lap = geom.compute_laplacian_matrix(&Params::new()).unwrap();
                    assert_eq!(lap.shape(), (30, 30), "{method}");
                    assert!(lap.data().iter().all(|v| v.is_finite()), "{method}");

                    let d = compute_adjacency_matrix(
                        x.view(),
                        "brute",
                        &Params::new().with("radius", adjacency_radius),
                    )
                    .unwrap();
                    let a = compute_affinity_matrix(&d, "gaussian", &radius(Some(affinity_radius)))
                        .unwrap();
                    let want = compute_laplacian_matrix(&a, method, &epps(Some(scaling_epps)))
                        .unwrap();
                    assert_eq!(entries(lap), entries(&want), "{method}");
                }
            }
        }
    }
}

#[test]
fn affinity_overrides_match_stage_function() {
    let x = points();
    let d = compute_adjacency_matrix(x.view(), "brute", &radius(Some(1.0))).unwrap();
    for init in [4.0, 5.0] {
        for over in [None, Some(4.0), Some(5.0)] {
            let mut geom = data_geometry(1.0).with_affinity_params(radius(Some(init)));
            let overrides = radius(over);
            let got = geom.compute_affinity_matrix(&overrides).unwrap().clone();

            let merged = radius(Some(init)).merged(&overrides);
            let want = compute_affinity_matrix(&d, "gaussian", &merged).unwrap();
            assert_eq!(entries(&got), entries(&want), "init {init}, override {over:?}");
            assert_eq!(geom.affinity_config().params, radius(Some(init)));
        }
    }
}

#[test]
fn laplacian_overrides_match_stage_function() {
    let x = points();
    let d = compute_adjacency_matrix(x.view(), "brute", &radius(Some(1.0))).unwrap();
    // the affinity bandwidth falls back to the adjacency radius
    let a = compute_affinity_matrix(&d, "gaussian", &radius(Some(1.0))).unwrap();
    for method in LAPLACIAN_METHODS {
        for init in [None, Some(4.0), Some(10.0)] {
            for over in [None, Some(4.0), Some(10.0)] {
                let mut geom = data_geometry(1.0)
                    .with_laplacian_method(*method)
                    .with_laplacian_params(epps(init));
                let overrides = epps(over);
                let got = geom.compute_laplacian_matrix(&overrides).unwrap().clone();

                let merged = epps(init).merged(&overrides);
                let want = compute_laplacian_matrix(&a, method, &merged).unwrap();
                assert_eq!(
                    entries(&got),
                    entries(&want),
                    "{method}: init {init:?}, override {over:?}"
                );
                assert_eq!(geom.laplacian_config().params, epps(init));
            }
        }
    }
}

#[test]
fn affinity_bandwidth_defaults_to_adjacency_radius() {
    let mut geom = data_geometry(0.8);
    let implicit = geom.compute_affinity_matrix(&Params::new()).unwrap().clone();
    let explicit = geom
        .compute_affinity_matrix(&Params::new().with("radius", 0.8))
        .unwrap()
        .clone();
    assert_eq!(entries(&implicit), entries(&explicit));
}

/// Brute-force search that counts how often it runs.
#[derive(Debug)]
struct Counting {
    calls: Arc<AtomicUsize>,
}

impl NeighborSearch for Counting {
    fn name(&self) -> &str {
        "counting"
    }

    fn radius_neighbors(
        &self,
        points: ArrayView2<'_, f64>,
        radius: f64,
        params: &Params,
    ) -> crate::Result<Neighborhoods> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        BruteForce.radius_neighbors(points, radius, params)
    }
}

fn counting_geometry() -> (Geometry, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = MethodRegistry::with_builtins();
    registry.register_adjacency(Counting {
        calls: Arc::clone(&calls),
    });
    let mut geom = Geometry::new()
        .with_registry(registry)
        .with_adjacency_method("counting")
        .with_adjacency_params(Params::new().with("radius", 0.5));
    geom.set_data_matrix(points().view());
    (geom, calls)
}

#[test]
fn identical_parameters_hit_the_cache() {
    let (mut geom, calls) = counting_geometry();

    let first = geom.compute_adjacency_matrix(&Params::new()).unwrap().clone();
    let second = geom
        .compute_adjacency_matrix(&Params::new().with("radius", 0.5))
        .unwrap()
        .clone();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(entries(&first), entries(&second));

    let _ = geom
        .compute_adjacency_matrix(&Params::new().with("radius", 0.6))
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // downstream stages reuse the cached distance graph
    let _ = geom.compute_laplacian_matrix(&Params::new()).unwrap();
    let _ = geom.compute_laplacian_matrix(&Params::new()).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn failed_compute_leaves_state_unchanged() {
    let mut geom = data_geometry(0.5);
    let adjacency = geom.compute_adjacency_matrix(&Params::new()).unwrap().clone();

    let err = geom
        .compute_affinity_matrix(&Params::new().with("radius", -1.0))
        .unwrap_err();
    assert!(err.is_malformed_input());
    assert_eq!(geom.adjacency_matrix().map(entries), Some(entries(&adjacency)));
    assert!(geom.affinity_matrix().is_none());

    let err = geom
        .compute_adjacency_matrix(&Params::new().with("leaf_size", 4usize))
        .unwrap_err();
    assert!(matches!(err, Error::UnknownParameter { .. }));
    assert_eq!(geom.adjacency_matrix().map(entries), Some(entries(&adjacency)));
}

#[test]
fn failed_laplacian_discards_derived_upstream() {
    let mut geom = data_geometry(0.5);
    let err = geom
        .compute_laplacian_matrix(&Params::new().with("bogus", true))
        .unwrap_err();
    assert!(matches!(err, Error::UnknownParameter { ref name, .. } if name == "bogus"));
    assert!(geom.adjacency_matrix().is_none());
    assert!(geom.affinity_matrix().is_none());
    assert!(geom.laplacian_matrix().is_none());
}

#[test]
fn adjacency_recompute_invalidates_downstream() {
    let mut geom = data_geometry(0.5);
    let _ = geom.compute_laplacian_matrix(&Params::new()).unwrap();
    assert!(geom.affinity_matrix().is_some());
    assert!(geom.laplacian_matrix().is_some());

    let _ = geom
        .compute_adjacency_matrix(&Params::new().with("radius", 0.9))
        .unwrap();
    assert!(geom.affinity_matrix().is_none());
    assert!(geom.laplacian_matrix().is_none());

    let _ = geom.compute_laplacian_matrix(&Params::new()).unwrap();
    let _ = geom
        .compute_affinity_matrix(&Params::new().with("radius", 0.3))
        .unwrap();
    assert!(geom.adjacency_matrix().is_some());
    assert!(geom.laplacian_matrix().is_none());
}

#[test]
fn setters_copy_and_clear() {
    let x = points();
    let mut geom = data_geometry(0.5);
    let _ = geom.compute_laplacian_matrix(&Params::new()).unwrap();

    geom.set_data_matrix(x.view());
    assert_eq!(geom.source_kind(), SourceKind::Data);
    assert_eq!(geom.data_matrix(), Some(x.view()));
    assert!(geom.adjacency_matrix().is_none());
    assert!(geom.affinity_matrix().is_none());
    assert!(geom.laplacian_matrix().is_none());

    let d: CsMat<f64> =
        compute_adjacency_matrix(x.view(), "brute", &Params::new().with("radius", 0.5)).unwrap();
    geom.set_adjacency_matrix(&d);
    assert!(geom.data_matrix().is_none());
    assert_eq!(geom.adjacency_matrix().map(entries), Some(entries(&d)));
}

/// Gaussian kernel that counts how often it runs.
#[derive(Debug)]
struct CountingKernel {
    calls: Arc<AtomicUsize>,
}

impl AffinityKernel for CountingKernel {
    fn name(&self) -> &str {
        "counting"
    }

    fn similarity(&self, distance: f64, radius: f64, params: &Params) -> f64 {
        Gaussian.similarity(distance, radius, params)
    }

    fn transform(&self, distances: &CsMat<f64>, params: &Params) -> crate::Result<CsMat<f64>> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        Gaussian.transform(distances, params)
    }
}

/// Random-walk builder that counts how often it runs.
#[derive(Debug)]
struct CountingBuilder {
    calls: Arc<AtomicUsize>,
}

impl LaplacianBuilder for CountingBuilder {
    fn name(&self) -> &str {
        "counting"
    }

    fn laplacian(&self, affinity: &CsMat<f64>, params: &Params) -> crate::Result<CsMat<f64>> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        RandomWalk.laplacian(affinity, params)
    }
}

#[test]
fn affinity_and_laplacian_hit_the_cache() {
    let kernel_calls = Arc::new(AtomicUsize::new(0));
    let builder_calls = Arc::new(AtomicUsize::new(0));
    let mut registry = MethodRegistry::with_builtins();
    registry
        .register_affinity(CountingKernel {
            calls: Arc::clone(&kernel_calls),
        })
        .register_laplacian(CountingBuilder {
            calls: Arc::clone(&builder_calls),
        });
    let mut geom = data_geometry(0.5)
        .with_registry(registry)
        .with_affinity_method("counting")
        .with_laplacian_method("counting");
    let kernel = || kernel_calls.load(Ordering::SeqCst);
    let builder = || builder_calls.load(Ordering::SeqCst);

    let first = geom.compute_affinity_matrix(&Params::new()).unwrap().clone();
    // same merged set: the fallback bandwidth is 0.5
    let second = geom.compute_affinity_matrix(&radius(Some(0.5))).unwrap().clone();
    assert_eq!(kernel(), 1);
    assert_eq!(entries(&first), entries(&second));

    let first = geom.compute_laplacian_matrix(&Params::new()).unwrap().clone();
    let second = geom.compute_laplacian_matrix(&Params::new()).unwrap().clone();
    assert_eq!((kernel(), builder()), (1, 1));
    assert_eq!(entries(&first), entries(&second));

    let _ = geom.compute_laplacian_matrix(&epps(Some(4.0))).unwrap();
    assert_eq!((kernel(), builder()), (1, 2));

    // a new affinity drops the cached Laplacian
    let _ = geom.compute_affinity_matrix(&radius(Some(0.7))).unwrap();
    assert!(geom.laplacian_matrix().is_none());
    let _ = geom.compute_laplacian_matrix(&epps(Some(4.0))).unwrap();
    assert_eq!((kernel(), builder()), (2, 3));
}
