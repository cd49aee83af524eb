//!
//! Sampling (states, observations) from a Gaussian HMM
//!
use crate::params::ModelParams;
use nalgebra::DVector;
use ndarray::prelude::*;
use rand::prelude::*;
use rand_distr::StandardNormal;

///
/// pick randomly from the choices with its own probability.
///
fn pick_with_prob<R: Rng>(rng: &mut R, probs: ArrayView1<f64>) -> usize {
    let choices: Vec<usize> = (0..probs.len()).collect();
    match choices.choose_weighted(rng, |&i| probs[i]) {
        Ok(&i) => i,
        // all zero weights cannot happen for a valid distribution
        Err(_) => 0,
    }
}

///
/// Sampling history: hidden states and emitted observations
///
#[derive(Clone, Debug)]
pub struct History {
    /// `states[t]` hidden state at time t
    pub states: Vec<usize>,
    /// `n x D` observations
    pub observations: Array2<f64>,
}

impl ModelParams {
    ///
    /// Draw `x = mu_k + L z` with `z ~ N(0, I)` and `S_k = L L^T`
    ///
    pub fn sample_emission<R: Rng>(&self, k: usize, rng: &mut R) -> Array1<f64> {
        let e = self.emission(k);
        let z = DVector::from_iterator(
            self.dim(),
            (0..self.dim()).map(|_| rng.sample::<f64, _>(StandardNormal)),
        );
        let lz = e.chol() * z;
        e.mean() + &Array1::from_iter(lz.iter().copied())
    }
    ///
    /// Sample a sequence of length `n`
    ///
    pub fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> History {
        let mut states = Vec::with_capacity(n);
        let mut observations = Array2::zeros((n, self.dim()));
        for t in 0..n {
            let state = if t == 0 {
                pick_with_prob(rng, self.init().view())
            } else {
                pick_with_prob(rng, self.trans().row(states[t - 1]))
            };
            states.push(state);
            observations
                .row_mut(t)
                .assign(&self.sample_emission(state, rng));
        }
        History {
            states,
            observations,
        }
    }
}
