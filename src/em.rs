//!
//! Baum-Welch training of Gaussian HMM parameters
//!
//! * E-step: run forward/backward and calculate the state/transition posteriors
//! * M-step: re-estimate `(pi, A, {mu_k, S_k})` in closed form
//! * iterate E/M-steps until the log likelihood converges or `max_iter` is reached
//!
//! ```text
//! pi_k    = gamma[0][k]
//! A[k][j] = sum_t xi[t][k][j] / sum_t sum_j' xi[t][k][j']
//! mu_k    = sum_t gamma[t][k] x[t] / N_k
//! S_k     = sum_t gamma[t][k] (x[t] - mu_k)(x[t] - mu_k)^T / N_k
//! N_k     = sum_t gamma[t][k]
//! ```
//!
//! A state with `N_k` (or transition row mass) of zero keeps its previous
//! emission (or transition row) for that iteration.
//!
use crate::error::{HmmError, Result};
use crate::gaussian::Gaussian;
use crate::hmm::HmmOutput;
use crate::params::ModelParams;
use crate::stats::{feature_scale, weighted_covariance, weighted_mean};
use log::{debug, info, warn};
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

/// responsibility mass below which a state is treated as unused
const MIN_RESPONSIBILITY: f64 = 1e-10;

/// decrease of the log likelihood tolerated as rounding noise
pub const LL_DECREASE_TOLERANCE: f64 = 1e-6;

///
/// How `tol` is compared with the change of the log likelihood
///
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum TolMode {
    /// `|l_i - l_{i-1}| < tol`
    Absolute,
    /// `|l_i - l_{i-1}| < tol |l_{i-1}|`
    Relative,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmConfig {
    /// max number of E-steps
    pub max_iter: usize,
    pub tol: f64,
    pub tol_mode: TolMode,
    /// if true, hitting `max_iter` before convergence is an error
    pub strict: bool,
    /// covariance floor relative to the feature scale
    pub min_covar: f64,
}

impl Default for EmConfig {
    fn default() -> Self {
        EmConfig {
            max_iter: 1000,
            tol: 1e-2,
            tol_mode: TolMode::Absolute,
            strict: false,
            min_covar: 1e-6,
        }
    }
}

impl EmConfig {
    fn check(&self) -> Result<()> {
        if !(self.tol >= 0.0) {
            return Err(HmmError::invalid(format!(
                "tol must be non-negative, got {}",
                self.tol
            )));
        }
        if !(self.min_covar > 0.0) {
            return Err(HmmError::invalid(format!(
                "min_covar must be positive, got {}",
                self.min_covar
            )));
        }
        Ok(())
    }
    fn is_converged(&self, prev: f64, now: f64) -> bool {
        let delta = (now - prev).abs();
        match self.tol_mode {
            TolMode::Absolute => delta < self.tol,
            TolMode::Relative => delta < self.tol * prev.abs(),
        }
    }
}

///
/// Output of `baum_welch`
///
#[derive(Clone, Debug)]
pub struct EmResult {
    /// final parameters
    pub params: ModelParams,
    /// `ln P(x)` of `params`
    pub log_likelihood: f64,
    /// number of E-steps run
    pub iterations: usize,
    pub converged: bool,
    /// `history[i]` is the log likelihood of the parameters before the i-th M-step
    pub history: Vec<f64>,
}

///
/// Things the M-step had to work around
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MStepReport {
    /// states whose emission was kept because `N_k` was zero
    pub frozen: Vec<usize>,
    /// `(state, eps)` for covariances that needed `eps * I`
    pub regularized: Vec<(usize, f64)>,
}

///
/// E-step: forward/backward under the current parameters
///
pub fn e_step(params: &ModelParams, xs: ArrayView2<f64>) -> Result<HmmOutput> {
    params.run(xs)
}

///
/// M-step: closed-form re-estimation from the posteriors of `e_step`.
///
/// `min_covar` is the absolute covariance floor.
///
pub fn m_step(
    params: &ModelParams,
    xs: ArrayView2<f64>,
    output: &HmmOutput,
    min_covar: f64,
) -> Result<(ModelParams, MStepReport)> {
    let k = params.n_states();
    let mut report = MStepReport::default();

    // pi
    let init = output.gamma.row(0).to_owned();

    // A
    let trans_freqs = output.to_trans_freqs();
    let mut trans = params.trans().clone();
    for i in 0..k {
        let total = trans_freqs.row(i).sum();
        if total > MIN_RESPONSIBILITY {
            trans.row_mut(i).assign(&(&trans_freqs.row(i) / total));
        }
    }

    // mu and S
    let state_freqs = output.to_state_freqs();
    let mut emissions = Vec::with_capacity(k);
    for i in 0..k {
        let n_i = state_freqs[i];
        if n_i <= MIN_RESPONSIBILITY {
            report.frozen.push(i);
            emissions.push(params.emission(i).clone());
            continue;
        }
        let w = output.gamma.column(i);
        let mu = weighted_mean(xs, w, n_i);
        let cov = weighted_covariance(xs, w, mu.view(), n_i);
        let (g, added) =
            Gaussian::new_regularized(mu, cov, min_covar).map_err(|e| e.at_state(i))?;
        if added > 0.0 {
            report.regularized.push((i, added));
        }
        emissions.push(g);
    }

    Ok((
        ModelParams::from_parts_unchecked(init, trans, emissions),
        report,
    ))
}

///
/// Run EM from `params` until convergence or `config.max_iter` E-steps.
///
/// The returned log likelihood is always the one of the returned parameters.
/// A `Numerical` error carries the iteration it happened in and the last
/// finite log likelihood seen before it.
/// When `config.strict` is set and the iteration cap is hit before
/// convergence, fails with `NonConvergence`.
///
pub fn baum_welch(xs: ArrayView2<f64>, params: &ModelParams, config: &EmConfig) -> Result<EmResult> {
    config.check()?;
    params.check_observations(xs)?;
    let min_covar = config.min_covar * feature_scale(xs);

    let mut current = params.clone();
    let mut history: Vec<f64> = Vec::new();

    for iteration in 0..config.max_iter {
        let output = e_step(&current, xs).map_err(|e| {
            e.at_iteration(iteration)
                .with_log_likelihood(history.last().copied())
        })?;
        let ll = output.log_likelihood;

        if let Some(&prev) = history.last() {
            debug!("em #{} ll={} delta={}", iteration, ll, ll - prev);
            if ll < prev - LL_DECREASE_TOLERANCE {
                warn!(
                    "em #{} log likelihood decreased {} -> {}",
                    iteration, prev, ll
                );
            }
            if config.is_converged(prev, ll) {
                history.push(ll);
                info!("em converged after {} iterations, ll={}", iteration + 1, ll);
                return Ok(EmResult {
                    params: current,
                    log_likelihood: ll,
                    iterations: iteration + 1,
                    converged: true,
                    history,
                });
            }
        } else {
            debug!("em #{} ll={}", iteration, ll);
        }
        history.push(ll);

        let (next, report) = m_step(&current, xs, &output, min_covar)
            .map_err(|e| e.at_iteration(iteration).with_log_likelihood(Some(ll)))?;
        for k in report.frozen.iter() {
            warn!("em #{} state {} has no responsibility; kept its emission", iteration, k);
        }
        for (k, eps) in report.regularized.iter() {
            warn!("em #{} covariance of state {} regularized by {}*I", iteration, k, eps);
        }
        current = next;
    }

    // parameters after the last M-step
    let ll = current.log_likelihood(xs).map_err(|e| {
        e.at_iteration(config.max_iter)
            .with_log_likelihood(history.last().copied())
    })?;
    let converged = history
        .last()
        .map_or(false, |&prev| config.is_converged(prev, ll));
    let delta = history.last().map_or(f64::INFINITY, |&prev| ll - prev);
    if converged {
        info!("em converged after {} iterations, ll={}", config.max_iter, ll);
    } else {
        info!(
            "em reached max_iter={} without convergence, ll={} delta={}",
            config.max_iter, ll, delta
        );
        if config.strict {
            return Err(HmmError::NonConvergence {
                iterations: config.max_iter,
                log_likelihood: ll,
                delta,
            });
        }
    }
    history.push(ll);
    Ok(EmResult {
        params: current,
        log_likelihood: ll,
        iterations: config.max_iter,
        converged,
        history,
    })
}
