//!
//! `GaussianHmm`: a fitted model and what can be done with it
//!
//! ```text
//! initialize (init.rs) -> baum_welch (em.rs) -> GaussianHmm -> decode / score / predict_proba / sample
//! ```
//!
use crate::em::{baum_welch, EmConfig};
use crate::error::{HmmError, Result};
use crate::hmm::sample::History;
use crate::init::{initialize, InitConfig};
use crate::params::ModelParams;
use log::info;
use ndarray::prelude::*;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

///
/// Gaussian HMM with its parameters and (when it was fitted) training trace.
///
#[derive(Clone, Debug)]
pub struct GaussianHmm {
    params: ModelParams,
    /// `ln P(x)` of the training observations, if fitted
    log_likelihood: Option<f64>,
    history: Vec<f64>,
    /// number of E-steps run by `baum_welch`
    iterations: usize,
    converged: bool,
}

impl GaussianHmm {
    ///
    /// Wrap parameters that were not produced by `fit` (e.g. loaded from JSON).
    ///
    pub fn from_params(params: ModelParams) -> Self {
        GaussianHmm {
            params,
            log_likelihood: None,
            history: Vec::new(),
            iterations: 0,
            converged: false,
        }
    }
    ///
    /// Fit a `k` state model with default configurations except for
    /// `max_iter` and `tol`.
    ///
    pub fn fit(xs: ArrayView2<f64>, k: usize, seed: u64, max_iter: usize, tol: f64) -> Result<Self> {
        let em_config = EmConfig {
            max_iter,
            tol,
            ..EmConfig::default()
        };
        GaussianHmm::fit_with(xs, k, seed, &InitConfig::default(), &em_config)
    }
    ///
    /// Initialize with `seed` and run Baum-Welch.
    ///
    pub fn fit_with(
        xs: ArrayView2<f64>,
        k: usize,
        seed: u64,
        init_config: &InitConfig,
        em_config: &EmConfig,
    ) -> Result<Self> {
        let init = initialize(xs, k, seed, init_config)?;
        let r = baum_welch(xs, &init, em_config)?;
        info!(
            "fit k={} seed={} ll={} iterations={} converged={}",
            k, seed, r.log_likelihood, r.iterations, r.converged
        );
        Ok(GaussianHmm {
            params: r.params,
            log_likelihood: Some(r.log_likelihood),
            history: r.history,
            iterations: r.iterations,
            converged: r.converged,
        })
    }
    pub fn params(&self) -> &ModelParams {
        &self.params
    }
    pub fn into_params(self) -> ModelParams {
        self.params
    }
    pub fn log_likelihood(&self) -> Option<f64> {
        self.log_likelihood
    }
    /// log likelihood after each EM iteration
    pub fn history(&self) -> &[f64] {
        &self.history
    }
    ///
    /// E-steps run while fitting (0 if not fitted). This is not `history().len()`:
    /// hitting `max_iter` adds one more evaluation of the final parameters.
    ///
    pub fn iterations(&self) -> usize {
        self.iterations
    }
    pub fn converged(&self) -> bool {
        self.converged
    }
    pub fn n_states(&self) -> usize {
        self.params.n_states()
    }
    ///
    /// Most probable state path (Viterbi)
    ///
    pub fn decode(&self, xs: ArrayView2<f64>) -> Result<Vec<usize>> {
        self.params.viterbi(xs).map(|(path, _)| path)
    }
    ///
    /// `ln P(x)` under the model
    ///
    pub fn score(&self, xs: ArrayView2<f64>) -> Result<f64> {
        self.params.log_likelihood(xs)
    }
    ///
    /// State posteriors `gamma` (`T x K`)
    ///
    pub fn predict_proba(&self, xs: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.params.run(xs).map(|o| o.gamma)
    }
    ///
    /// Sample `n` steps with a `Xoshiro256PlusPlus` seeded by `seed`
    ///
    pub fn sample(&self, n: usize, seed: u64) -> History {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        self.params.sample(n, &mut rng)
    }
    ///
    /// Per-regime summary of the model, with occupancies taken from the
    /// decoded path of `xs`.
    ///
    pub fn summary(&self, xs: ArrayView2<f64>) -> Result<Vec<RegimeSummary>> {
        let path = self.decode(xs)?;
        let n = path.len() as f64;
        Ok((0..self.n_states())
            .map(|k| {
                let e = self.params.emission(k);
                RegimeSummary {
                    state: k,
                    occupancy: path.iter().filter(|&&s| s == k).count() as f64 / n,
                    mean: e.mean().to_vec(),
                    std: e.cov().diag().mapv(f64::sqrt).to_vec(),
                    expected_duration: self.params.expected_duration(k),
                }
            })
            .collect())
    }
}

///
/// Summary of one hidden state (regime)
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegimeSummary {
    pub state: usize,
    /// fraction of time steps decoded as this state
    pub occupancy: f64,
    pub mean: Vec<f64>,
    /// per-feature standard deviation `sqrt(S_k[d][d])`
    pub std: Vec<f64>,
    /// `1 / (1 - A_kk)`
    pub expected_duration: f64,
}

impl std::fmt::Display for RegimeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "state={}\toccupancy={:.4}\tduration={:.2}\tmean={:?}\tstd={:?}",
            self.state, self.occupancy, self.expected_duration, self.mean, self.std
        )
    }
}

///
/// Fit a `k` state Gaussian HMM and return the parameters with their final
/// log likelihood.
///
pub fn fit(
    xs: ArrayView2<f64>,
    k: usize,
    seed: u64,
    max_iter: usize,
    tol: f64,
) -> Result<(ModelParams, f64)> {
    let model = GaussianHmm::fit(xs, k, seed, max_iter, tol)?;
    let ll = model
        .log_likelihood()
        .ok_or_else(|| HmmError::numerical("fitted model has no log likelihood"))?;
    Ok((model.into_params(), ll))
}

///
/// Viterbi path of `xs` under `params`
///
pub fn decode(params: &ModelParams, xs: ArrayView2<f64>) -> Result<Vec<usize>> {
    params.viterbi(xs).map(|(path, _)| path)
}
