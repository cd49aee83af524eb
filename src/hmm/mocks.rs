//!
//! Mock models and synthetic observations for testing
//!
use crate::gaussian::Gaussian;
use crate::params::ModelParams;
use itertools::Itertools;
use ndarray::prelude::*;
use rand::prelude::*;
use rand_distr::Normal;
use rand_xoshiro::Xoshiro256PlusPlus;

///
/// Two 3-dimensional states, centered at 0 and 1 with covariance `0.1 I`.
///
/// ```text
/// pi = [0.5, 0.5]
/// A  = [[0.9, 0.1],
///       [0.2, 0.8]]
/// ```
///
pub fn mock_two_state_params() -> ModelParams {
    let cov = Array2::eye(3) * 0.1;
    let emissions = vec![
        Gaussian::new(Array1::zeros(3), cov.clone()).unwrap(),
        Gaussian::new(Array1::ones(3), cov).unwrap(),
    ];
    ModelParams::new(
        array![0.5, 0.5],
        array![[0.9, 0.1], [0.2, 0.8]],
        emissions,
    )
    .unwrap()
}

///
/// `n` 3-dimensional observations in alternating blocks of length `block`.
/// Regime 0 is `N(0, 0.01 I)` and regime 1 is `N(1, 0.01 I)`; the sequence
/// starts in regime 0.
///
/// returns the observations and the true regime labels.
///
pub fn two_regime_blocks(n: usize, block: usize, seed: u64) -> (Array2<f64>, Vec<usize>) {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.1).unwrap();
    let labels: Vec<usize> = (0..n).map(|t| (t / block.max(1)) % 2).collect();
    let xs = Array2::from_shape_fn((n, 3), |(t, _)| {
        labels[t] as f64 + noise.sample(&mut rng)
    });
    (xs, labels)
}

///
/// Fraction of positions where `labels` agrees with `truth`, maximized over
/// all relabelings (permutations) of `0..k`.
///
/// Meant for small `k` (it enumerates `k!` permutations). Labels outside
/// `0..k` never match, and positions present in only one of the sequences
/// count as mismatches.
///
pub fn permuted_accuracy(labels: &[usize], truth: &[usize], k: usize) -> f64 {
    let n = labels.len().max(truth.len());
    if n == 0 {
        return 1.0;
    }
    let best = (0..k)
        .permutations(k)
        .map(|perm| {
            labels
                .iter()
                .zip(truth.iter())
                .filter(|&(&l, &t)| perm.get(l) == Some(&t))
                .count()
        })
        .max()
        .unwrap_or(0);
    best as f64 / n as f64
}
