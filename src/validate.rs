//! Shape and content checks shared by the stage strategies.
//!
//! Every strategy validates its own input, so these checks run once per stage
//! call. Graph matrices are normalized to CSR before inspection; callers may
//! hand in CSC matrices.

use ndarray::ArrayView2;
use sprs::CsMat;

use crate::error::{Error, Result};

/// Relative tolerance for value symmetry of affinity graphs.
pub const SYMMETRY_TOLERANCE: f64 = 1e-10;

/// Points must be a non-empty n×d matrix of finite values with d ≥ 1.
pub fn check_points(points: ArrayView2<'_, f64>) -> Result<()> {
    if points.nrows() == 0 {
        return Err(Error::EmptyInput);
    }
    if points.ncols() == 0 {
        return Err(Error::DimensionMismatch {
            expected: 1,
            found: 0,
        });
    }
    if let Some(((row, col), _)) = points.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(Error::NonFinite { row, col });
    }
    Ok(())
}

/// CSR copy of `m` (or a clone if it already is CSR).
pub fn to_csr(m: &CsMat<f64>) -> CsMat<f64> {
    if m.is_csr() {
        m.clone()
    } else {
        m.to_csr()
    }
}

/// Non-empty and square.
pub fn check_square(m: &CsMat<f64>) -> Result<usize> {
    let (rows, cols) = m.shape();
    if rows != cols {
        return Err(Error::NotSquare { rows, cols });
    }
    if rows == 0 {
        return Err(Error::EmptyInput);
    }
    Ok(rows)
}

/// Every stored entry must be finite and non-negative. Expects CSR.
pub fn check_nonnegative(m: &CsMat<f64>) -> Result<()> {
    for (row, vec) in m.outer_iterator().enumerate() {
        if let Some((col, _)) = vec.iter().find(|&(_, &v)| !(v.is_finite() && v >= 0.0)) {
            return Err(Error::NonFinite { row, col });
        }
    }
    Ok(())
}

/// Every stored (i, j) must have a stored (j, i). Expects CSR.
pub fn check_pattern_symmetric(m: &CsMat<f64>) -> Result<()> {
    for (row, vec) in m.outer_iterator().enumerate() {
        for (col, _) in vec.iter() {
            if m.get(col, row).is_none() {
                return Err(Error::NotSymmetric { row, col });
            }
        }
    }
    Ok(())
}

/// Pattern symmetry plus value symmetry within [`SYMMETRY_TOLERANCE`]. Expects CSR.
pub fn check_symmetric(m: &CsMat<f64>) -> Result<()> {
    for (row, vec) in m.outer_iterator().enumerate() {
        for (col, &v) in vec.iter() {
            let mirrored = match m.get(col, row) {
                Some(&w) => w,
                // an absent mirror only matches a stored zero
                None if v == 0.0 => continue,
                None => return Err(Error::NotSymmetric { row, col }),
            };
            let scale = v.abs().max(mirrored.abs()).max(1.0);
            if (v - mirrored).abs() > SYMMETRY_TOLERANCE * scale {
                return Err(Error::NotSymmetric { row, col });
            }
        }
    }
    Ok(())
}

/// Checks a distance graph: square, non-negative, symmetric pattern.
/// Returns the CSR form and node count.
pub fn distance_graph(m: &CsMat<f64>) -> Result<(CsMat<f64>, usize)> {
    let n = check_square(m)?;
    let csr = to_csr(m);
    check_nonnegative(&csr)?;
    check_pattern_symmetric(&csr)?;
    Ok((csr, n))
}

/// Checks an affinity graph: square, non-negative, symmetric.
/// Returns the CSR form and node count.
pub fn affinity_graph(m: &CsMat<f64>) -> Result<(CsMat<f64>, usize)> {
    let n = check_square(m)?;
    let csr = to_csr(m);
    check_nonnegative(&csr)?;
    check_symmetric(&csr)?;
    Ok((csr, n))
}
