//! k-d tree neighbor search.
//!
//! Recursive axis-aligned partitioning. Each node splits its points at the
//! median of the coordinate with the widest spread and keeps the bounding box
//! of everything below it. A radius query skips any node whose box lies
//! farther than the radius from the query point.
//!
//! Good for low dimensions (d < 20); beyond that most boxes intersect the
//! query ball and the tree degrades towards a full scan.
//!
//! # References
//!
//! - Bentley (1975). "Multidimensional binary search trees used for
//!   associative searching"

use ndarray::ArrayView2;

use super::traits::{euclidean, prune_slack, Neighborhoods, NeighborSearch};
use crate::error::{Error, Result};
use crate::params::Params;

/// k-d tree radius neighbors.
#[derive(Debug, Clone)]
pub struct KdTree {
    /// Maximum points per leaf.
    leaf_size: usize,
}

impl Default for KdTree {
    fn default() -> Self {
        Self { leaf_size: 30 }
    }
}

impl KdTree {
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

/// Node in the arena; children are arena indices.
#[derive(Debug)]
enum KdNode {
    Leaf {
        start: usize,
        end: usize,
    },
    Split {
        left: usize,
        right: usize,
    },
}

#[derive(Debug)]
struct Tree {
    nodes: Vec<KdNode>,
    /// Bounding box per node: (lower, upper) per dimension.
    bounds: Vec<(Vec<f64>, Vec<f64>)>,
    /// Permutation of point indices; leaves own contiguous ranges.
    order: Vec<usize>,
}

impl Tree {
    fn build(points: ArrayView2<'_, f64>, leaf_size: usize) -> Self {
        let mut tree = Tree {
            nodes: Vec::new(),
            bounds: Vec::new(),
            order: (0..points.nrows()).collect(),
        };
        let _ = tree.build_node(points, 0, points.nrows(), leaf_size);
        tree
    }

    fn build_node(
        &mut self,
        points: ArrayView2<'_, f64>,
        start: usize,
        end: usize,
        leaf_size: usize,
    ) -> usize {
        let d = points.ncols();
        let mut lower = vec![f64::INFINITY; d];
        let mut upper = vec![f64::NEG_INFINITY; d];
        for &idx in &self.order[start..end] {
            for (k, &v) in points.row(idx).iter().enumerate() {
                lower[k] = lower[k].min(v);
                upper[k] = upper[k].max(v);
            }
        }

        // widest dimension
        let (dim, spread) = (0..d)
            .map(|k| (k, upper[k] - lower[k]))
            .fold((0, f64::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 {
                    cur
                } else {
                    best
                }
            });

        let id = self.nodes.len();
        self.bounds.push((lower, upper));

        if end - start <= leaf_size || spread <= 0.0 {
            self.nodes.push(KdNode::Leaf { start, end });
            return id;
        }

        // placeholder, patched once children exist
        self.nodes.push(KdNode::Leaf { start, end });

        let mid = start + (end - start) / 2;
        self.order[start..end].select_nth_unstable_by(mid - start, |&a, &b| {
            points[[a, dim]].total_cmp(&points[[b, dim]])
        });

        let left = self.build_node(points, start, mid, leaf_size);
        let right = self.build_node(points, mid, end, leaf_size);
        self.nodes[id] = KdNode::Split { left, right };
        id
    }

    /// Lower bound on the distance from `query` to anything inside node `id`'s box.
    fn box_distance(&self, id: usize, query: &[f64]) -> f64 {
        let (lower, upper) = &self.bounds[id];
        query
            .iter()
            .zip(lower.iter().zip(upper.iter()))
            .map(|(&q, (&lo, &hi))| {
                let gap = if q < lo {
                    lo - q
                } else if q > hi {
                    q - hi
                } else {
                    0.0
                };
                gap * gap
            })
            .sum::<f64>()
            .sqrt()
    }

    fn query(
        &self,
        points: ArrayView2<'_, f64>,
        i: usize,
        radius: f64,
        slack: f64,
        out: &mut Vec<(usize, f64)>,
    ) {
        let query: Vec<f64> = points.row(i).to_vec();
        let mut stack = vec![0usize];
        while let Some(id) = stack.pop() {
            if self.box_distance(id, &query) > radius + slack {
                continue;
            }
            match self.nodes[id] {
                KdNode::Leaf { start, end } => {
                    for &j in &self.order[start..end] {
                        if j == i {
                            continue;
                        }
                        let d = euclidean(points.row(i), points.row(j));
                        if d <= radius {
                            out.push((j, d));
                        }
                    }
                }
                KdNode::Split { left, right } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
    }
}

impl NeighborSearch for KdTree {
    fn name(&self) -> &str {
        "kd_tree"
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

        let tree = Tree::build(points, leaf_size);
        let scale = points.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        let slack = prune_slack(radius, scale);

        let hoods = (0..points.nrows())
            .map(|i| {
                let mut hood = Vec::new();
                tree.query(points, i, radius, slack, &mut hood);
                hood
            })
            .collect();
        log::trace!("kd_tree: {} nodes, leaf_size={}", tree.nodes.len(), leaf_size);
        Ok(hoods)
    }
}
