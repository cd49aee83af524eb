//!
//! Multivariate Gaussian emission of a hidden state
//!
//! ```text
//! log N(x; mu, S) = -1/2 [ D ln(2 pi) + ln|S| + (x - mu)^T S^-1 (x - mu) ]
//! ```
//!
//! `S = L L^T` is factorized once when the emission is constructed, then
//! `ln|S| = 2 sum ln L_ii` and the quadratic form is `|z|^2` with `L z = x - mu`.
//!
use crate::error::{HmmError, Result};
use crate::linalg::{cholesky, log_det_cholesky, regularize, solve_lower};
use crate::prob::Prob;
use nalgebra::DMatrix;
use ndarray::prelude::*;

const LN_2PI: f64 = 1.8378770664093453;

///
/// Gaussian emission with mean `mu` and symmetric positive-definite covariance `S`.
///
/// The Cholesky factor is cached; `mean`/`cov` are only changed through the
/// constructors so the cache never goes stale.
///
#[derive(Clone, Debug, PartialEq)]
pub struct Gaussian {
    mean: Array1<f64>,
    cov: Array2<f64>,
    chol: DMatrix<f64>,
    /// `D ln(2 pi) + ln|S|`
    log_norm: f64,
}

impl Gaussian {
    ///
    /// Create from mean and covariance. The covariance must already be
    /// positive-definite; it is not modified.
    ///
    pub fn new(mean: Array1<f64>, cov: Array2<f64>) -> Result<Gaussian> {
        Gaussian::check_shape(&mean, &cov)?;
        if mean.iter().any(|x| !x.is_finite()) {
            return Err(HmmError::numerical("mean has non-finite entries"));
        }
        let chol = cholesky(cov.view())
            .ok_or_else(|| HmmError::numerical("covariance is not positive-definite"))?;
        Ok(Gaussian::from_parts(mean, cov, chol))
    }
    ///
    /// Create from mean and covariance, applying the covariance regularization
    /// policy (`linalg::regularize`) with absolute floor `min_covar`.
    ///
    /// Returns the emission and the diagonal term that was added (0 if none).
    ///
    pub fn new_regularized(
        mean: Array1<f64>,
        cov: Array2<f64>,
        min_covar: f64,
    ) -> Result<(Gaussian, f64)> {
        Gaussian::check_shape(&mean, &cov)?;
        if mean.iter().any(|x| !x.is_finite()) {
            return Err(HmmError::numerical("mean has non-finite entries"));
        }
        let r = regularize(cov.view(), min_covar)?;
        Ok((Gaussian::from_parts(mean, r.cov, r.chol), r.added))
    }
    fn from_parts(mean: Array1<f64>, cov: Array2<f64>, chol: DMatrix<f64>) -> Gaussian {
        let d = mean.len() as f64;
        let log_norm = d * LN_2PI + log_det_cholesky(&chol);
        Gaussian {
            mean,
            cov,
            chol,
            log_norm,
        }
    }
    fn check_shape(mean: &Array1<f64>, cov: &Array2<f64>) -> Result<()> {
        let d = mean.len();
        if d == 0 {
            return Err(HmmError::invalid("emission dimension must be >= 1"));
        }
        if cov.dim() != (d, d) {
            return Err(HmmError::invalid(format!(
                "covariance shape {:?} does not match mean dimension {}",
                cov.dim(),
                d
            )));
        }
        Ok(())
    }
    /// feature dimension `D`
    pub fn dim(&self) -> usize {
        self.mean.len()
    }
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }
    pub fn cov(&self) -> &Array2<f64> {
        &self.cov
    }
    /// lower Cholesky factor of `cov`
    pub fn chol(&self) -> &DMatrix<f64> {
        &self.chol
    }
    ///
    /// Mahalanobis quadratic form `(x - mu)^T S^-1 (x - mu)`
    ///
    pub fn mahalanobis(&self, x: ArrayView1<f64>) -> f64 {
        let diff = &x - &self.mean;
        solve_lower(&self.chol, diff.view()).norm_squared()
    }
    ///
    /// `ln N(x; mu, S)`
    ///
    pub fn log_density(&self, x: ArrayView1<f64>) -> f64 {
        -0.5 * (self.log_norm + self.mahalanobis(x))
    }
    ///
    /// `N(x; mu, S)` as `Prob`
    ///
    pub fn density(&self, x: ArrayView1<f64>) -> Prob {
        Prob::from_log_prob(self.log_density(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, array};

    #[test]
    fn standard_normal_1d() {
        let g = Gaussian::new(array![0.0], array![[1.0]]).unwrap();
        assert_abs_diff_eq!(g.log_density(array![0.0].view()), -0.5 * LN_2PI, epsilon = 1e-12);
        assert_abs_diff_eq!(
            g.log_density(array![2.0].view()),
            -0.5 * LN_2PI - 2.0,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            g.density(array![0.0].view()).to_value(),
            1.0 / (2.0 * std::f64::consts::PI).sqrt(),
            epsilon = 1e-12
        );
    }
    #[test]
    fn diagonal_3d_matches_product_of_1d() {
        let var = [0.5, 2.0, 0.01];
        let mu = array![1.0, -1.0, 0.5];
        let g = Gaussian::new(mu.clone(), Array2::from_diag(&arr1(&var))).unwrap();
        let x = array![0.3, 0.1, 0.45];
        let expected: f64 = (0..3)
            .map(|i| {
                let d = x[i] - mu[i];
                -0.5 * (LN_2PI + var[i].ln() + d * d / var[i])
            })
            .sum();
        assert_abs_diff_eq!(g.log_density(x.view()), expected, epsilon = 1e-10);
    }
    #[test]
    fn correlated_2d() {
        // S = [[2, 1], [1, 2]], |S| = 3, S^-1 = [[2, -1], [-1, 2]] / 3
        let g = Gaussian::new(array![0.0, 0.0], array![[2.0, 1.0], [1.0, 2.0]]).unwrap();
        let x = array![1.0, 2.0];
        // quad = (2*1 - 2*1*2 + 2*4) / 3 = 2
        assert_abs_diff_eq!(g.mahalanobis(x.view()), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(
            g.log_density(x.view()),
            -0.5 * (2.0 * LN_2PI + 3f64.ln() + 2.0),
            epsilon = 1e-12
        );
    }
    #[test]
    fn rejects_bad_covariance() {
        assert!(matches!(
            Gaussian::new(array![0.0, 0.0], array![[1.0, 2.0], [2.0, 1.0]]),
            Err(HmmError::Numerical { .. })
        ));
        assert!(matches!(
            Gaussian::new(array![0.0, 0.0], array![[1.0]]),
            Err(HmmError::InvalidInput(_))
        ));
    }
    #[test]
    fn regularized_zero_covariance() {
        let (g, added) = Gaussian::new_regularized(array![1.0, 1.0], Array2::zeros((2, 2)), 1e-6)
            .unwrap();
        assert_eq!(added, 1e-6);
        assert!(g.log_density(array![1.0, 1.0].view()).is_finite());
    }
}
