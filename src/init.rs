//!
//! Initial parameters for EM
//!
//! * `pi`: uniform
//! * `A`: uniform, or sticky (diagonal-biased)
//! * `mu_k`: k-means centers (k-means++ seeding + Lloyd iterations)
//! * `S_k`: global sample covariance (regularized) for every state
//!
//! All randomness comes from a `Xoshiro256PlusPlus` seeded by the caller.
//!
use crate::error::{HmmError, Result};
use crate::gaussian::Gaussian;
use crate::params::ModelParams;
use crate::stats::{covariance, feature_scale};
use log::debug;
use ndarray::prelude::*;
use ndarray::s;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

///
/// How the transition matrix is initialized
///
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum TransitionInit {
    /// `A[k][j] = 1/K`
    Uniform,
    /// `A[k][k] = p` and `A[k][j] = (1 - p) / (K - 1)` for `j != k`
    Sticky(f64),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InitConfig {
    pub transition: TransitionInit,
    /// regularization floor relative to the feature scale
    pub min_covar: f64,
    /// max number of Lloyd iterations of k-means
    pub n_kmeans_iter: usize,
}

impl Default for InitConfig {
    fn default() -> Self {
        InitConfig {
            transition: TransitionInit::Uniform,
            min_covar: 1e-6,
            n_kmeans_iter: 100,
        }
    }
}

///
/// Check that observations form a non-empty `T x D` matrix of finite values
/// with `D >= 1` and that `k >= 1`.
///
pub fn check_input(xs: ArrayView2<f64>, k: usize) -> Result<()> {
    if k == 0 {
        return Err(HmmError::invalid("number of states must be >= 1"));
    }
    if xs.nrows() == 0 {
        return Err(HmmError::invalid("observation sequence is empty"));
    }
    if xs.ncols() == 0 {
        return Err(HmmError::invalid("observations must have dimension >= 1"));
    }
    if let Some(t) = xs
        .outer_iter()
        .position(|x| x.iter().any(|v| !v.is_finite()))
    {
        return Err(HmmError::invalid(format!(
            "observation at t={} has non-finite values",
            t
        )));
    }
    Ok(())
}

///
/// Create the initial `ModelParams` of a `k` state HMM for observations `xs`.
///
/// Deterministic given `(xs, k, seed, config)`.
///
pub fn initialize(
    xs: ArrayView2<f64>,
    k: usize,
    seed: u64,
    config: &InitConfig,
) -> Result<ModelParams> {
    check_input(xs, k)?;
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

    let init = Array1::from_elem(k, 1.0 / k as f64);
    let trans = initial_trans(k, config.transition)?;

    let centers = kmeans(xs, k, config.n_kmeans_iter, &mut rng);
    let cov = covariance(xs);
    let min_covar = config.min_covar * feature_scale(xs);
    let emissions = centers
        .outer_iter()
        .enumerate()
        .map(|(i, center)| {
            Gaussian::new_regularized(center.to_owned(), cov.clone(), min_covar)
                .map(|(g, _)| g)
                .map_err(|e| e.at_state(i))
        })
        .collect::<Result<Vec<_>>>()?;

    ModelParams::new(init, trans, emissions)
}

fn initial_trans(k: usize, transition: TransitionInit) -> Result<Array2<f64>> {
    match transition {
        TransitionInit::Uniform => Ok(Array2::from_elem((k, k), 1.0 / k as f64)),
        TransitionInit::Sticky(p) => {
            if !(0.0..=1.0).contains(&p) {
                return Err(HmmError::invalid(format!(
                    "sticky transition probability must be in [0, 1], got {}",
                    p
                )));
            }
            if k == 1 {
                return Ok(Array2::ones((1, 1)));
            }
            let off = (1.0 - p) / (k - 1) as f64;
            Ok(Array2::from_shape_fn((k, k), |(i, j)| {
                if i == j {
                    p
                } else {
                    off
                }
            }))
        }
    }
}

/// squared euclidean distance
fn sq_dist(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

///
/// index of the nearest center (lowest index on ties) and its squared distance
///
fn nearest(x: ArrayView1<f64>, centers: &Array2<f64>) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centers.outer_iter().enumerate() {
        let d = sq_dist(x, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

///
/// k-means++ seeding
///
/// The first center is a uniformly random row; each following center is a row
/// drawn with probability proportional to its squared distance to the nearest
/// chosen center. If every row coincides with a chosen center (e.g. constant
/// data), a uniformly random row is used instead.
///
fn kmeans_pp<R: Rng>(xs: ArrayView2<f64>, k: usize, rng: &mut R) -> Array2<f64> {
    let n = xs.nrows();
    let mut centers = Array2::zeros((k, xs.ncols()));
    centers.row_mut(0).assign(&xs.row(rng.gen_range(0..n)));
    for i in 1..k {
        let chosen = centers.slice(s![..i, ..]).to_owned();
        let weights: Vec<f64> = xs
            .outer_iter()
            .map(|x| nearest(x, &chosen).1)
            .collect();
        let index = match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(rng),
            Err(_) => rng.gen_range(0..n),
        };
        centers.row_mut(i).assign(&xs.row(index));
    }
    centers
}

///
/// k-means centers of the rows of `xs` (`k x D`)
///
/// Lloyd iterations stop when the assignment is stable or after `n_iter`
/// rounds. A cluster that loses all its members keeps its previous center.
///
pub fn kmeans<R: Rng>(xs: ArrayView2<f64>, k: usize, n_iter: usize, rng: &mut R) -> Array2<f64> {
    let mut centers = kmeans_pp(xs, k, rng);
    let mut assignment: Vec<usize> = vec![usize::MAX; xs.nrows()];

    for iteration in 0..n_iter {
        let mut changed = false;
        for (t, x) in xs.outer_iter().enumerate() {
            let (i, _) = nearest(x, &centers);
            if assignment[t] != i {
                assignment[t] = i;
                changed = true;
            }
        }
        if !changed {
            debug!("kmeans converged at iteration {}", iteration);
            break;
        }
        let mut sums: Array2<f64> = Array2::zeros(centers.dim());
        let mut counts = vec![0usize; k];
        for (t, x) in xs.outer_iter().enumerate() {
            let mut row = sums.row_mut(assignment[t]);
            row += &x;
            counts[assignment[t]] += 1;
        }
        for i in 0..k {
            if counts[i] > 0 {
                let c = &sums.row(i) / counts[i] as f64;
                centers.row_mut(i).assign(&c);
            }
        }
    }
    centers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmm::mocks::two_regime_blocks;
    use ndarray::array;

    #[test]
    fn rejects_invalid_input() {
        let c = InitConfig::default();
        assert!(initialize(Array2::zeros((0, 3)).view(), 2, 0, &c).is_err());
        assert!(initialize(Array2::zeros((5, 0)).view(), 2, 0, &c).is_err());
        assert!(initialize(Array2::zeros((5, 3)).view(), 0, 0, &c).is_err());
        let c = InitConfig {
            transition: TransitionInit::Sticky(1.5),
            ..InitConfig::default()
        };
        assert!(initialize(Array2::zeros((5, 3)).view(), 2, 0, &c).is_err());
    }
    #[test]
    fn sticky_transition_rows_sum_to_one() {
        let a = initial_trans(3, TransitionInit::Sticky(0.8)).unwrap();
        for row in a.outer_iter() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(a[[0, 0]], 0.8);
        assert_abs_diff_eq!(a[[0, 1]], 0.1, epsilon = 1e-12);
        assert_eq!(initial_trans(1, TransitionInit::Sticky(0.3)).unwrap(), array![[1.0]]);
    }
    #[test]
    fn kmeans_separates_two_clusters() {
        let xs = array![[0.0, 0.0], [0.1, 0.0], [0.0, 0.1], [5.0, 5.0], [5.1, 5.0], [5.0, 5.1]];
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let centers = kmeans(xs.view(), 2, 100, &mut rng);
        let mut firsts: Vec<f64> = centers.column(0).to_vec();
        firsts.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_abs_diff_eq!(firsts[0], 0.1 / 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(firsts[1], 5.0 + 0.1 / 3.0, epsilon = 1e-9);
    }
    #[test]
    fn initial_means_are_in_different_regimes() {
        let (xs, _) = two_regime_blocks(500, 50, 0);
        let params = initialize(xs.view(), 2, 42, &InitConfig::default()).unwrap();
        let m0 = params.emission(0).mean().sum() / 3.0;
        let m1 = params.emission(1).mean().sum() / 3.0;
        assert!((m0 - m1).abs() > 0.8, "m0={} m1={}", m0, m1);
        assert_abs_diff_eq!(params.init().sum(), 1.0, epsilon = 1e-12);
    }
    #[test]
    fn deterministic_given_seed() {
        let (xs, _) = two_regime_blocks(200, 20, 1);
        let c = InitConfig::default();
        let a = initialize(xs.view(), 3, 7, &c).unwrap();
        let b = initialize(xs.view(), 3, 7, &c).unwrap();
        assert_eq!(a, b);
    }
    #[test]
    fn constant_data_is_regularized() {
        let xs = Array2::from_elem((30, 3), 0.25);
        let params = initialize(xs.view(), 2, 0, &InitConfig::default()).unwrap();
        for e in params.emissions() {
            // scale falls back to 1, so the floor is 1e-6 * I
            assert_abs_diff_eq!(e.cov()[[0, 0]], 1e-6, epsilon = 1e-15);
        }
    }
}
