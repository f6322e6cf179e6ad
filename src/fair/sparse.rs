//! Sparse matrix and iterative linear solver.
//!
//! This module provides a lightweight CSR matrix and a BiCGSTAB solver. The
//! fairing operator is row-scaled by each vertex's neighborhood area and is
//! therefore not symmetric, which rules out plain conjugate gradients;
//! BiCGSTAB handles general nonsingular systems while keeping the same
//! matrix-vector-product-only structure.
//!
//! # Reference
//!
//! van der Vorst, H. (1992). "Bi-CGSTAB: A fast and smoothly converging
//! variant of Bi-CG for the solution of nonsymmetric linear systems."
//! SIAM J. Sci. Stat. Comput.

use nalgebra::DVector;

use crate::error::{MeshError, Result};

/// Absolute threshold below which a BiCGSTAB scalar counts as a breakdown.
const BREAKDOWN: f64 = 1e-30;

/// Compressed Sparse Row (CSR) matrix.
///
/// Stores a sparse matrix in CSR format for efficient matrix-vector
/// multiplication. Within a row, entries are ordered by column.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    /// Number of rows.
    rows: usize,
    /// Number of columns.
    cols: usize,
    /// Row pointers; `row_ptr[i]..row_ptr[i + 1]` spans row `i`'s entries.
    row_ptr: Vec<usize>,
    /// Column indices for each stored value.
    col_idx: Vec<usize>,
    /// Stored values. Explicit zeros are kept.
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Create a CSR matrix from triplets (row, col, value).
    ///
    /// Duplicate entries at the same (row, col) are summed. Explicitly stored
    /// zeros are preserved, so the sparsity pattern reflects what the caller
    /// wrote, not just what is numerically nonzero.
    pub fn from_triplets(rows: usize, cols: usize, mut triplets: Vec<(usize, usize, f64)>) -> Self {
        triplets.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut counts = vec![0usize; rows];
        let mut col_idx = Vec::with_capacity(triplets.len());
        let mut values = Vec::with_capacity(triplets.len());

        // The sort groups duplicates next to each other, so a run of equal
        // (row, col) pairs folds into the last pushed entry.
        let mut prev: Option<(usize, usize)> = None;
        for (row, col, val) in triplets {
            debug_assert!(row < rows && col < cols, "triplet out of bounds");
            if prev == Some((row, col)) {
                *values.last_mut().unwrap() += val;
            } else {
                col_idx.push(col);
                values.push(val);
                counts[row] += 1;
                prev = Some((row, col));
            }
        }

        let mut row_ptr = vec![0usize; rows + 1];
        for i in 0..rows {
            row_ptr[i + 1] = row_ptr[i] + counts[i];
        }

        Self {
            rows,
            cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Get the number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows
    }

    /// Get the number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// Get the number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Number of stored entries in row `i`.
    #[inline]
    pub fn row_nnz(&self, i: usize) -> usize {
        self.row_ptr[i + 1] - self.row_ptr[i]
    }

    /// Get the value at (i, j), zero if not stored.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        let start = self.row_ptr[i];
        let end = self.row_ptr[i + 1];
        match self.col_idx[start..end].binary_search(&j) {
            Ok(k) => self.values[start + k],
            Err(_) => 0.0,
        }
    }

    /// Multiply matrix by vector: y = A * x.
    pub fn mul_vec(&self, x: &DVector<f64>) -> DVector<f64> {
        assert_eq!(x.len(), self.cols, "vector dimension mismatch");

        let mut y = DVector::zeros(self.rows);
        for i in 0..self.rows {
            let start = self.row_ptr[i];
            let end = self.row_ptr[i + 1];

            let mut sum = 0.0;
            for k in start..end {
                sum += self.values[k] * x[self.col_idx[k]];
            }
            y[i] = sum;
        }
        y
    }
}

/// Solve A*x = b using the BiCGSTAB method.
///
/// Works for general (nonsymmetric) nonsingular systems.
///
/// # Arguments
///
/// * `a` - The system matrix (square)
/// * `b` - The right-hand side vector
/// * `x0` - Optional initial guess (zeros if None)
/// * `max_iter` - Maximum number of iterations
/// * `tolerance` - Convergence tolerance (relative residual norm)
///
/// # Errors
///
/// [`MeshError::SingularSystem`] on a breakdown (the method's scalars
/// collapse, which signals a singular or ill-conditioned matrix), or
/// [`MeshError::ConvergenceFailed`] if the iteration budget runs out.
pub fn bicgstab(
    a: &CsrMatrix,
    b: &DVector<f64>,
    x0: Option<&DVector<f64>>,
    max_iter: usize,
    tolerance: f64,
) -> Result<DVector<f64>> {
    let n = b.len();
    assert_eq!(a.nrows(), n, "matrix-vector dimension mismatch");
    assert_eq!(a.ncols(), n, "matrix must be square");

    let mut x = match x0 {
        Some(x0) => x0.clone(),
        None => DVector::zeros(n),
    };

    let b_norm = b.norm();
    if b_norm < 1e-15 {
        // b = 0: the solution of a nonsingular system is the zero vector
        return Ok(DVector::zeros(n));
    }

    let mut r = b - a.mul_vec(&x);
    if r.norm() / b_norm < tolerance {
        return Ok(x);
    }

    // shadow residual, fixed at the initial residual
    let r_hat = r.clone();

    let mut rho = 1.0;
    let mut alpha = 1.0;
    let mut omega = 1.0;
    let mut v = DVector::zeros(n);
    let mut p = DVector::zeros(n);

    for _iter in 0..max_iter {
        let rho_next = r_hat.dot(&r);
        if rho_next.abs() < BREAKDOWN {
            return Err(MeshError::SingularSystem);
        }

        let beta = (rho_next / rho) * (alpha / omega);
        p = &r + beta * (&p - omega * &v);

        v = a.mul_vec(&p);
        let r_hat_v = r_hat.dot(&v);
        if r_hat_v.abs() < BREAKDOWN {
            return Err(MeshError::SingularSystem);
        }
        alpha = rho_next / r_hat_v;

        let s = &r - alpha * &v;
        if s.norm() / b_norm < tolerance {
            x += alpha * &p;
            return Ok(x);
        }

        let t = a.mul_vec(&s);
        let t_t = t.dot(&t);
        if t_t < BREAKDOWN {
            return Err(MeshError::SingularSystem);
        }
        omega = t.dot(&s) / t_t;
        if omega.abs() < BREAKDOWN {
            return Err(MeshError::SingularSystem);
        }

        x += alpha * &p + omega * &s;
        r = &s - omega * &t;

        if r.norm() / b_norm < tolerance {
            return Ok(x);
        }

        rho = rho_next;
    }

    Err(MeshError::ConvergenceFailed {
        iterations: max_iter,
    })
}
