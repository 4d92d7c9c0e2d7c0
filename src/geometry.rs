//! Caching pipeline over the three stages.
//!
//! A [`Geometry`] holds one source representation (points, a distance graph
//! or an affinity graph) and derives the downstream matrices on demand:
//!
//! ```text
//! data ──adjacency──▶ distance graph ──affinity──▶ affinity graph ──laplacian──▶ Laplacian
//! ```
//!
//! Each stage has a method name and default parameters. A compute call merges
//! its overrides over the defaults and returns the cached matrix when the
//! merged set equals the one the cache was built with; otherwise it recomputes.
//! A recompute drops every downstream cache, so a cached matrix is always
//! derived from the matrices cached above it.
//!
//! Compute calls are atomic: on error the source and every cache are exactly
//! as before the call, including upstream matrices the call had to derive.
//!
//! ```rust
//! use manigraph::{Geometry, Params};
//! use ndarray::array;
//!
//! let points = array![[0.0, 0.0], [0.3, 0.0], [0.0, 0.4], [2.0, 2.0]];
//! let mut geom = Geometry::new()
//!     .with_adjacency_method("brute")
//!     .with_adjacency_params(Params::new().with("radius", 0.5))
//!     .with_laplacian_method("randomwalk");
//! geom.set_data_matrix(points.view());
//!
//! let lap = geom.compute_laplacian_matrix(&Params::new()).unwrap();
//! assert_eq!(lap.shape(), (4, 4));
//! assert!(geom.adjacency_matrix().is_some());
//! ```

use std::sync::Arc;

use ndarray::{Array2, ArrayView2};
use sprs::CsMat;

use crate::error::{Error, Result, AFFINITY_ERROR_MSG, DISTANCE_ERROR_MSG, LAPLACIAN_ERROR_MSG};
use crate::params::{Params, StageConfig};
use crate::registry::MethodRegistry;

/// Which representation a [`Geometry`] currently treats as ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Nothing set yet.
    None,
    /// An n×d point matrix.
    Data,
    /// An n×n distance graph.
    Adjacency,
    /// An n×n affinity graph.
    Affinity,
}

#[derive(Debug, Clone)]
enum Source {
    None,
    Data(Array2<f64>),
    Adjacency(CsMat<f64>),
    Affinity(CsMat<f64>),
}

/// A stage result together with the merged parameters it was computed with.
#[derive(Debug, Clone)]
struct Cached {
    params: Params,
    matrix: CsMat<f64>,
}

/// An affinity result and the adjacency result it was derived from, when
/// both had to be computed.
type Derived = (Cached, Option<Cached>);

/// Lazily computed, cached adjacency → affinity → Laplacian pipeline.
#[derive(Debug, Clone)]
pub struct Geometry {
    adjacency: StageConfig,
    affinity: StageConfig,
    laplacian: StageConfig,
    registry: Arc<MethodRegistry>,
    source: Source,
    adjacency_cache: Option<Cached>,
    affinity_cache: Option<Cached>,
    laplacian_cache: Option<Cached>,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            adjacency: StageConfig::default(),
            affinity: StageConfig::default(),
            laplacian: StageConfig::default(),
            registry: MethodRegistry::shared_builtin(),
            source: Source::None,
            adjacency_cache: None,
            affinity_cache: None,
            laplacian_cache: None,
        }
    }
}

impl Geometry {
    /// Pipeline with `auto` methods, no default parameters and the built-in registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the adjacency method.
    pub fn with_adjacency_method(mut self, method: impl Into<String>) -> Self {
        self.adjacency.method = method.into();
        self
    }

    /// Set the adjacency defaults.
    pub fn with_adjacency_params(mut self, params: Params) -> Self {
        self.adjacency.params = params;
        self
    }

    /// Set the affinity method.
    pub fn with_affinity_method(mut self, method: impl Into<String>) -> Self {
        self.affinity.method = method.into();
        self
    }

    /// Set the affinity defaults.
    pub fn with_affinity_params(mut self, params: Params) -> Self {
        self.affinity.params = params;
        self
    }

    /// Set the Laplacian method.
    pub fn with_laplacian_method(mut self, method: impl Into<String>) -> Self {
        self.laplacian.method = method.into();
        self
    }

    /// Set the Laplacian defaults.
    pub fn with_laplacian_params(mut self, params: Params) -> Self {
        self.laplacian.params = params;
        self
    }

    /// Resolve method names against `registry` instead of the built-in one.
    pub fn with_registry(mut self, registry: impl Into<Arc<MethodRegistry>>) -> Self {
        self.registry = registry.into();
        self
    }

    /// Adjacency method and defaults.
    pub fn adjacency_config(&self) -> &StageConfig {
        &self.adjacency
    }

    /// Affinity method and defaults.
    pub fn affinity_config(&self) -> &StageConfig {
        &self.affinity
    }

    /// Laplacian method and defaults.
    pub fn laplacian_config(&self) -> &StageConfig {
        &self.laplacian
    }

    /// Kind of the current source.
    pub fn source_kind(&self) -> SourceKind {
        match self.source {
            Source::None => SourceKind::None,
            Source::Data(_) => SourceKind::Data,
            Source::Adjacency(_) => SourceKind::Adjacency,
            Source::Affinity(_) => SourceKind::Affinity,
        }
    }

    /// The point matrix, if the source is data.
    pub fn data_matrix(&self) -> Option<ArrayView2<'_, f64>> {
        match &self.source {
            Source::Data(points) => Some(points.view()),
            _ => None,
        }
    }

    /// The distance graph: the source itself, or the cached result.
    pub fn adjacency_matrix(&self) -> Option<&CsMat<f64>> {
        match &self.source {
            Source::Adjacency(d) => Some(d),
            _ => self.adjacency_cache.as_ref().map(|c| &c.matrix),
        }
    }

    /// The affinity graph: the source itself, or the cached result.
    pub fn affinity_matrix(&self) -> Option<&CsMat<f64>> {
        match &self.source {
            Source::Affinity(a) => Some(a),
            _ => self.affinity_cache.as_ref().map(|c| &c.matrix),
        }
    }

    /// The cached Laplacian.
    pub fn laplacian_matrix(&self) -> Option<&CsMat<f64>> {
        self.laplacian_cache.as_ref().map(|c| &c.matrix)
    }

    /// Use `points` (n×d) as the source. Clears every cache.
    pub fn set_data_matrix(&mut self, points: ArrayView2<'_, f64>) {
        self.replace_source(Source::Data(points.to_owned()));
    }

    /// Use the distance graph `distances` as the source. Clears every cache.
    pub fn set_adjacency_matrix(&mut self, distances: &CsMat<f64>) {
        self.replace_source(Source::Adjacency(distances.clone()));
    }

    /// Use the affinity graph `affinity` as the source. Clears every cache.
    pub fn set_affinity_matrix(&mut self, affinity: &CsMat<f64>) {
        self.replace_source(Source::Affinity(affinity.clone()));
    }

    fn replace_source(&mut self, source: Source) {
        self.source = source;
        self.adjacency_cache = None;
        self.affinity_cache = None;
        self.laplacian_cache = None;
    }

    /// Distance graph of the data source under the adjacency defaults merged with `overrides`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSource`] with [`DISTANCE_ERROR_MSG`] unless the source is
    /// a data matrix, and any error of the adjacency strategy.
    pub fn compute_adjacency_matrix(&mut self, overrides: &Params) -> Result<&CsMat<f64>> {
        let params = self.adjacency.params.merged(overrides);
        let cached = match self.adjacency_cache.take() {
            Some(hit) if hit.params == params => {
                log::debug!("adjacency: cache hit {}", params);
                hit
            }
            stale => match self.fresh_adjacency(params) {
                Ok(fresh) => {
                    self.affinity_cache = None;
                    self.laplacian_cache = None;
                    fresh
                }
                Err(e) => {
                    self.adjacency_cache = stale;
                    return Err(e);
                }
            },
        };
        Ok(&self.adjacency_cache.insert(cached).matrix)
    }

    /// Affinity graph under the affinity defaults merged with `overrides`.
    ///
    /// The distance graph is the adjacency source, else the cached adjacency,
    /// else computed with the adjacency defaults. Without a `radius` in the
    /// merged parameters, the adjacency default `radius` is the bandwidth.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSource`] with [`AFFINITY_ERROR_MSG`] unless the source is
    /// data or a distance graph, and any error of the stages run.
    pub fn compute_affinity_matrix(&mut self, overrides: &Params) -> Result<&CsMat<f64>> {
        let params = self.affinity_params(overrides);
        let cached = match self.affinity_cache.take() {
            Some(hit) if hit.params == params => {
                log::debug!("affinity: cache hit {}", params);
                hit
            }
            stale => match self.fresh_affinity(params) {
                Ok((fresh, adjacency)) => {
                    if adjacency.is_some() {
                        self.adjacency_cache = adjacency;
                    }
                    self.laplacian_cache = None;
                    fresh
                }
                Err(e) => {
                    self.affinity_cache = stale;
                    return Err(e);
                }
            },
        };
        Ok(&self.affinity_cache.insert(cached).matrix)
    }

    /// Laplacian under the Laplacian defaults merged with `overrides`.
    ///
    /// The affinity graph is the affinity source, else the cached affinity,
    /// else computed through the affinity stage with its defaults.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSource`] with [`LAPLACIAN_ERROR_MSG`] if no source is
    /// set, and any error of the stages run.
    pub fn compute_laplacian_matrix(&mut self, overrides: &Params) -> Result<&CsMat<f64>> {
        let params = self.laplacian.params.merged(overrides);
        let cached = match self.laplacian_cache.take() {
            Some(hit) if hit.params == params => {
                log::debug!("laplacian: cache hit {}", params);
                hit
            }
            stale => match self.fresh_laplacian(params) {
                Ok((fresh, upstream)) => {
                    if let Some((affinity, adjacency)) = upstream {
                        if adjacency.is_some() {
                            self.adjacency_cache = adjacency;
                        }
                        self.affinity_cache = Some(affinity);
                    }
                    fresh
                }
                Err(e) => {
                    self.laplacian_cache = stale;
                    return Err(e);
                }
            },
        };
        Ok(&self.laplacian_cache.insert(cached).matrix)
    }

    /// Affinity defaults merged with `overrides`, with the adjacency radius as fallback bandwidth.
    fn affinity_params(&self, overrides: &Params) -> Params {
        let mut params = self.affinity.params.merged(overrides);
        if !params.contains("radius") {
            if let Some(radius) = self.adjacency.params.get("radius") {
                params.insert("radius", radius.clone());
            }
        }
        params
    }

    fn fresh_adjacency(&self, params: Params) -> Result<Cached> {
        let Source::Data(points) = &self.source else {
            return Err(Error::InvalidSource(DISTANCE_ERROR_MSG));
        };
        log::debug!("adjacency: recomputing with {}", params);
        let matrix = self
            .registry
            .compute_adjacency(points.view(), &self.adjacency.method, &params)?;
        Ok(Cached { params, matrix })
    }

    /// A new affinity result, plus the adjacency result computed on the way if
    /// none was available.
    fn fresh_affinity(&self, params: Params) -> Result<Derived> {
        let adjacency = match (&self.source, &self.adjacency_cache) {
            (Source::Data(_), None) => Some(self.fresh_adjacency(self.adjacency.params.clone())?),
            (Source::Data(_), Some(_)) | (Source::Adjacency(_), _) => None,
            _ => return Err(Error::InvalidSource(AFFINITY_ERROR_MSG)),
        };
        let distances = match (&self.source, &adjacency, &self.adjacency_cache) {
            (Source::Adjacency(d), _, _) => d,
            (_, Some(c), _) | (_, None, Some(c)) => &c.matrix,
            _ => return Err(Error::InvalidSource(AFFINITY_ERROR_MSG)),
        };
        log::debug!("affinity: recomputing with {}", params);
        let matrix = self
            .registry
            .compute_affinity(distances, &self.affinity.method, &params)?;
        Ok((Cached { params, matrix }, adjacency))
    }

    /// A new Laplacian, plus the affinity (and adjacency) results computed on
    /// the way if none were available.
    fn fresh_laplacian(&self, params: Params) -> Result<(Cached, Option<Derived>)> {
        let upstream = match (&self.source, &self.affinity_cache) {
            (Source::None, _) => return Err(Error::InvalidSource(LAPLACIAN_ERROR_MSG)),
            (Source::Affinity(_), _) | (_, Some(_)) => None,
            (_, None) => Some(self.fresh_affinity(self.affinity_params(&Params::new()))?),
        };
        let affinity = match (&self.source, &upstream, &self.affinity_cache) {
            (Source::Affinity(a), _, _) => a,
            (_, Some((c, _)), _) | (_, None, Some(c)) => &c.matrix,
            _ => return Err(Error::InvalidSource(LAPLACIAN_ERROR_MSG)),
        };
        log::debug!("laplacian: recomputing with {}", params);
        let matrix = self
            .registry
            .compute_laplacian(affinity, &self.laplacian.method, &params)?;
        Ok((Cached { params, matrix }, upstream))
    }
}
