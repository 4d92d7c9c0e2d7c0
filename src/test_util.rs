//! Helpers shared by unit tests.

use ndarray::Array2;
use rand::prelude::*;
use sprs::{CsMat, TriMat};

/// Stored entries of a CSR matrix as (row, col, value), row-major.
pub(crate) fn entries(m: &CsMat<f64>) -> Vec<(usize, usize, f64)> {
    m.outer_iterator()
        .enumerate()
        .flat_map(|(i, row)| row.iter().map(move |(j, &v)| (i, j, v)).collect::<Vec<_>>())
        .collect()
}

/// Stored (row, col) positions of a CSR matrix.
pub(crate) fn pattern(m: &CsMat<f64>) -> Vec<(usize, usize)> {
    entries(m).into_iter().map(|(i, j, _)| (i, j)).collect()
}

/// `n` points uniform in the unit cube of dimension `d`.
pub(crate) fn uniform_points(n: usize, d: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((n, d), |_| rng.random::<f64>())
}

/// Square CSR matrix from triplets.
pub(crate) fn csr(n: usize, triplets: &[(usize, usize, f64)]) -> CsMat<f64> {
    let mut tri = TriMat::new((n, n));
    for &(i, j, v) in triplets {
        tri.add_triplet(i, j, v);
    }
    tri.to_csr()
}

/// Symmetric CSR matrix from upper-triangle triplets.
pub(crate) fn symmetric(n: usize, upper: &[(usize, usize, f64)]) -> CsMat<f64> {
    let mut all = Vec::with_capacity(upper.len() * 2);
    for &(i, j, v) in upper {
        all.push((i, j, v));
        if i != j {
            all.push((j, i, v));
        }
    }
    csr(n, &all)
}

/// Element-wise closeness of two sparse matrices through their dense forms.
pub(crate) fn assert_close(a: &CsMat<f64>, b: &CsMat<f64>, tol: f64) {
    assert_eq!(a.shape(), b.shape(), "shape mismatch");
    let (da, db) = (a.to_dense(), b.to_dense());
    for ((i, j), &x) in da.indexed_iter() {
        let y = db[[i, j]];
        assert!(
            (x - y).abs() <= tol,
            "entry ({i}, {j}) differs: {x} vs {y}"
        );
    }
}
