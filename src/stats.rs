//!
//! Sample statistics of observation matrices
//!
//! Observations are stored as `T x D` matrices (one row per time step).
//!
use ndarray::prelude::*;

/// sample mean of rows
pub fn mean(xs: ArrayView2<f64>) -> Array1<f64> {
    let n = xs.nrows() as f64;
    xs.sum_axis(Axis(0)) / n
}

///
/// Maximum-likelihood (biased, `1/T`) sample covariance of rows
///
pub fn covariance(xs: ArrayView2<f64>) -> Array2<f64> {
    let mu = mean(xs);
    let centered = &xs - &mu;
    centered.t().dot(&centered) / (xs.nrows() as f64)
}

///
/// Weighted mean `sum_t w_t x_t / sum_t w_t`.
///
/// `total` is `sum_t w_t`, passed in because callers already have it.
///
pub fn weighted_mean(xs: ArrayView2<f64>, w: ArrayView1<f64>, total: f64) -> Array1<f64> {
    w.dot(&xs) / total
}

///
/// Weighted covariance `sum_t w_t (x_t - mu)(x_t - mu)^T / sum_t w_t`
///
pub fn weighted_covariance(
    xs: ArrayView2<f64>,
    w: ArrayView1<f64>,
    mu: ArrayView1<f64>,
    total: f64,
) -> Array2<f64> {
    let centered = &xs - &mu;
    let weighted = &centered * &w.insert_axis(Axis(1));
    weighted.t().dot(&centered) / total
}

///
/// Average of the per-feature variances, used to scale `min_covar`.
///
/// Returns 1.0 when every feature is constant, so the scale is never 0.
///
pub fn feature_scale(xs: ArrayView2<f64>) -> f64 {
    let c = covariance(xs);
    let s = c.diag().mean().unwrap_or(0.0);
    if s > 0.0 && s.is_finite() {
        s
    } else {
        1.0
    }
}
