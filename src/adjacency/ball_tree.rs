//! Ball tree neighbor search.
//!
//! Space-partitioning tree using hyperspheres (balls) instead of hyperplanes.
//! Each node stores the centroid of its points and the distance to the
//! farthest of them. A radius query skips a ball when
//! `dist(query, center) - ball_radius > radius`.
//!
//! More robust than the k-d tree in medium dimensions (20 < d < 100), where
//! axis-aligned boxes stop pruning.
//!
//! Splitting: pick the point farthest from the centroid, then the point
//! farthest from that one; assign every point to the nearer of the two seeds.
//!
//! # References
//!
//! - Omohundro (1989). "Five balltree construction algorithms"

use ndarray::{Array1, ArrayView2};

use super::traits::{euclidean, prune_slack, Neighborhoods, NeighborSearch};
use crate::error::{Error, Result};
use crate::params::Params;

/// Ball tree radius neighbors.
#[derive(Debug, Clone)]
pub struct BallTree {
    /// Maximum points per leaf.
    leaf_size: usize,
}

impl Default for BallTree {
    fn default() -> Self {
        Self { leaf_size: 30 }
    }
}

impl BallTree {
    /// Create with default leaf size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default leaf size (overridable per call with `leaf_size`).
    pub fn with_leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = leaf_size.max(1);
        self
    }
}

/// Ball tree node.
#[derive(Debug)]
enum BallNode {
    /// Internal node: covering ball plus two children.
    Internal {
        center: Array1<f64>,
        radius: f64,
        left: Box<BallNode>,
        right: Box<BallNode>,
    },
    /// Leaf node: covering ball plus point indices.
    Leaf {
        center: Array1<f64>,
        radius: f64,
        indices: Vec<usize>,
    },
}

impl BallNode {
    fn build(points: ArrayView2<'_, f64>, indices: Vec<usize>, leaf_size: usize) -> Self {
        let center = centroid(points, &indices);
        let radius = indices
            .iter()
            .map(|&i| euclidean(points.row(i), center.view()))
            .fold(0.0f64, f64::max);

        if indices.len() <= leaf_size || radius == 0.0 {
            return BallNode::Leaf {
                center,
                radius,
                indices,
            };
        }

        let farthest_from = |from: ndarray::ArrayView1<'_, f64>| {
            indices
                .iter()
                .copied()
                .map(|i| (i, euclidean(points.row(i), from)))
                .fold((indices[0], f64::NEG_INFINITY), |best, cur| {
                    if cur.1 > best.1 {
                        cur
                    } else {
                        best
                    }
                })
                .0
        };
        let seed_a = farthest_from(center.view());
        let seed_b = farthest_from(points.row(seed_a));

        let (mut left, mut right): (Vec<usize>, Vec<usize>) =
            indices.iter().copied().partition(|&i| {
                euclidean(points.row(i), points.row(seed_a))
                    <= euclidean(points.row(i), points.row(seed_b))
            });

        // Ensure both sides have at least one point
        if right.is_empty() {
            right.extend(left.pop());
        }
        if left.is_empty() {
            left.extend(right.pop());
        }

        BallNode::Internal {
            center,
            radius,
            left: Box::new(BallNode::build(points, left, leaf_size)),
            right: Box::new(BallNode::build(points, right, leaf_size)),
        }
    }

    fn query(
        &self,
        points: ArrayView2<'_, f64>,
        i: usize,
        radius: f64,
        slack: f64,
        out: &mut Vec<(usize, f64)>,
    ) {
        let (center, ball_radius) = match self {
            BallNode::Internal { center, radius, .. } | BallNode::Leaf { center, radius, .. } => {
                (center, *radius)
            }
        };
        if euclidean(points.row(i), center.view()) - ball_radius > radius + slack {
            return;
        }
        match self {
            BallNode::Leaf { indices, .. } => {
                for &j in indices {
                    if j == i {
                        continue;
                    }
                    let d = euclidean(points.row(i), points.row(j));
                    if d <= radius {
                        out.push((j, d));
                    }
                }
            }
            BallNode::Internal { left, right, .. } => {
                left.query(points, i, radius, slack, out);
                right.query(points, i, radius, slack, out);
            }
        }
    }

    fn count(&self) -> usize {
        match self {
            BallNode::Leaf { .. } => 1,
            BallNode::Internal { left, right, .. } => 1 + left.count() + right.count(),
        }
    }
}

fn centroid(points: ArrayView2<'_, f64>, indices: &[usize]) -> Array1<f64> {
    let mut center = Array1::<f64>::zeros(points.ncols());
    for &i in indices {
        center += &points.row(i);
    }
    center / indices.len() as f64
}

impl NeighborSearch for BallTree {
    fn name(&self) -> &str {
        "ball_tree"
    }

    fn tuning_params(&self) -> &[&str] {
        &["leaf_size"]
    }

    fn radius_neighbors(
        &self,
        points: ArrayView2<'_, f64>,
        radius: f64,
        params: &Params,
    ) -> Result<Neighborhoods> {
        let leaf_size = params.get_usize("leaf_size")?.unwrap_or(self.leaf_size);
        if leaf_size == 0 {
            return Err(Error::invalid_parameter("leaf_size", "must be >= 1"));
        }

        let root = BallNode::build(points, (0..points.nrows()).collect(), leaf_size);
        let scale = points.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        let slack = prune_slack(radius, scale);

        let hoods = (0..points.nrows())
            .map(|i| {
                let mut hood = Vec::new();
                root.query(points, i, radius, slack, &mut hood);
                hood
            })
            .collect();
        log::trace!("ball_tree: {} nodes, leaf_size={}", root.count(), leaf_size);
        Ok(hoods)
    }
}
