//!
//! Linear algebra for covariance matrices
//!
//! Factorizations are done by `nalgebra`; observations and parameters stay in
//! `ndarray` and are copied over at this boundary.
//!
//! * `cholesky`: `A = L L^T` for a symmetric positive-definite `A`
//! * `solve_lower`: `L z = b`
//! * `log_det_cholesky`: `ln|A| = 2 sum_i ln L_ii`
//! * `regularize`: the covariance regularization policy
//!
use crate::error::{HmmError, Result};
use log::debug;
use nalgebra::{Cholesky, DMatrix, DVector};
use ndarray::prelude::*;

/// number of `10x` escalations of the diagonal term before giving up
const MAX_REGULARIZE_ATTEMPTS: usize = 10;

pub fn to_matrix(a: ArrayView2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

pub fn to_vector(b: ArrayView1<f64>) -> DVector<f64> {
    DVector::from_iterator(b.len(), b.iter().copied())
}

pub fn from_matrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

///
/// Lower triangular Cholesky factor `L` with `A = L L^T`.
///
/// Returns `None` if `A` is not square, has non-finite entries, or is not
/// (numerically) positive-definite, i.e. some pivot of `L` is not strictly
/// positive. Only the lower triangle of `A` is read.
///
pub fn cholesky(a: ArrayView2<f64>) -> Option<DMatrix<f64>> {
    if a.nrows() != a.ncols() || a.iter().any(|x| !x.is_finite()) {
        return None;
    }
    let l = Cholesky::new(to_matrix(a))?.unpack();
    if l.diagonal().iter().all(|&d| d > 0.0 && d.is_finite()) {
        Some(l)
    } else {
        None
    }
}

///
/// Solve `L z = b` for a Cholesky factor `L` (positive diagonal)
///
pub fn solve_lower(l: &DMatrix<f64>, b: ArrayView1<f64>) -> DVector<f64> {
    l.solve_lower_triangular_unchecked(&to_vector(b))
}

///
/// `ln|A|` from the Cholesky factor of `A`
///
pub fn log_det_cholesky(l: &DMatrix<f64>) -> f64 {
    2.0 * l.diagonal().iter().map(|x| x.ln()).sum::<f64>()
}

///
/// smallest squared pivot `min_i L_ii^2`
///
fn min_pivot(l: &DMatrix<f64>) -> f64 {
    l.diagonal()
        .iter()
        .map(|x| x * x)
        .fold(f64::INFINITY, f64::min)
}

///
/// `(A + A^T) / 2`
///
pub fn symmetrize(a: ArrayView2<f64>) -> Array2<f64> {
    (&a + &a.t()) * 0.5
}

///
/// Result of `regularize`.
///
#[derive(Clone, Debug)]
pub struct Regularized {
    /// the (possibly modified) covariance
    pub cov: Array2<f64>,
    /// its Cholesky factor
    pub chol: DMatrix<f64>,
    /// `eps` of the `eps * I` added to the diagonal (0 if untouched)
    pub added: f64,
}

///
/// Covariance regularization policy.
///
/// The covariance is symmetrized and factorized. If the factorization fails or
/// the smallest squared pivot is below `min_covar`, `eps * I` is added with
/// `eps = min_covar, 10 min_covar, 100 min_covar, ...` until the factorization
/// succeeds. Fails with `Numerical` when entries are not finite, or when
/// `MAX_REGULARIZE_ATTEMPTS` escalations were not enough.
///
/// `min_covar` is an absolute value; callers scale it by the feature variance.
///
pub fn regularize(cov: ArrayView2<f64>, min_covar: f64) -> Result<Regularized> {
    if cov.iter().any(|x| !x.is_finite()) {
        return Err(HmmError::numerical("covariance has non-finite entries"));
    }
    if !(min_covar > 0.0) {
        return Err(HmmError::invalid(format!(
            "min_covar must be positive, got {min_covar}"
        )));
    }
    let cov = symmetrize(cov);
    if let Some(chol) = cholesky(cov.view()) {
        if min_pivot(&chol) >= min_covar {
            return Ok(Regularized {
                cov,
                chol,
                added: 0.0,
            });
        }
    }

    let n = cov.nrows();
    let mut eps = min_covar;
    for _ in 0..MAX_REGULARIZE_ATTEMPTS {
        let candidate = &cov + &(Array2::<f64>::eye(n) * eps);
        if let Some(chol) = cholesky(candidate.view()) {
            debug!("covariance regularized with eps={}", eps);
            return Ok(Regularized {
                cov: candidate,
                chol,
                added: eps,
            });
        }
        eps *= 10.0;
    }
    Err(HmmError::numerical(format!(
        "covariance is not positive-definite even after adding {}*I",
        eps / 10.0
    )))
}
