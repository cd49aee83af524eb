//!
//! Calculate state/transition usage frequencies (posteriors)
//! from the result of Forward/Backward.
//!
//! - **State probs** `gamma[t][k]` (for each time and each state)
//!     The probability that the hidden state at time t is k, given all observations.
//!
//! - **Transition probs** `xi[t][k][j]` (for each time and each pair of states)
//!     The probability that the hidden state moves from k (at time t) to j (at time t+1),
//!     given all observations.
//!
//! - **State freqs** `sum_t gamma[t][k]`, **Transition freqs** `sum_t xi[t][k][j]`
//!     The expected number of visits/transitions, used by the M-step.
//!
use super::forward::full_prob_forward;
use super::table::EmissionTable;
use crate::error::{HmmError, Result};
use crate::params::ModelParams;
use crate::prob::{log_sum_exp, Prob};
use ndarray::prelude::*;

/// Struct for storing the outputs of forward and backward.
///
#[derive(Debug, Clone)]
pub struct HmmOutput {
    /// Emission table `E` (`n x K`)
    pub emissions: EmissionTable,
    /// Forward table `F` (`n x K`)
    pub forward: Array2<Prob>,
    /// Backward table `B` (`n x K`)
    pub backward: Array2<Prob>,
    /// `ln P(x)`
    pub log_likelihood: f64,
    /// `gamma` (`n x K`), each row sums to 1
    pub gamma: Array2<f64>,
    /// `xi` (`(n-1) x K x K`), each `xi[t]` sums to 1
    pub xi: Array3<f64>,
}

impl HmmOutput {
    /// number of observations
    pub fn n_emissions(&self) -> usize {
        self.gamma.nrows()
    }
    ///
    /// `sum_t gamma[t][k]`: expected number of visits to each state
    ///
    pub fn to_state_freqs(&self) -> Array1<f64> {
        self.gamma.sum_axis(Axis(0))
    }
    ///
    /// `sum_t xi[t][k][j]`: expected number of transitions `k -> j`
    ///
    pub fn to_trans_freqs(&self) -> Array2<f64> {
        self.xi.sum_axis(Axis(0))
    }
}

///
/// methods to generate HmmOutput from ModelParams
///
impl ModelParams {
    ///
    /// Run forward and backward for the observations and returns HmmOutput.
    ///
    /// Fails with `InvalidInput` on malformed observations, and with `Numerical`
    /// if the likelihood is not finite.
    ///
    pub fn run(&self, xs: ArrayView2<f64>) -> Result<HmmOutput> {
        let emissions = self.emission_table(xs)?;
        let forward = self.forward(&emissions);
        let backward = self.backward(&emissions);
        let full = full_prob_forward(&forward);
        let log_likelihood = full.to_log_value();
        if !log_likelihood.is_finite() {
            return Err(HmmError::numerical(format!(
                "log likelihood is {}",
                log_likelihood
            )));
        }
        let gamma = state_probs(&forward, &backward)?;
        let xi = self.trans_probs_posterior(&emissions, &forward, &backward)?;
        Ok(HmmOutput {
            emissions,
            forward,
            backward,
            log_likelihood,
            gamma,
            xi,
        })
    }
    ///
    /// `ln P(x)` by the forward algorithm only.
    ///
    pub fn log_likelihood(&self, xs: ArrayView2<f64>) -> Result<f64> {
        let emissions = self.emission_table(xs)?;
        let forward = self.forward(&emissions);
        let ll = full_prob_forward(&forward).to_log_value();
        if ll.is_finite() {
            Ok(ll)
        } else {
            Err(HmmError::numerical(format!("log likelihood is {}", ll)))
        }
    }
    ///
    /// ```text
    /// xi[t][k][j] = F[t][k] A[k][j] E[t+1][j] B[t+1][j] / P(x)
    /// ```
    ///
    /// The numerators are normalized per `t` in log space, so that
    /// `sum_{k,j} xi[t][k][j] = 1` exactly (up to rounding) and no `exp` of a
    /// large log value is taken before the division.
    ///
    fn trans_probs_posterior(
        &self,
        emissions: &EmissionTable,
        forward: &Array2<Prob>,
        backward: &Array2<Prob>,
    ) -> Result<Array3<f64>> {
        let n = emissions.n_emissions();
        let k = self.n_states();
        let trans = self.trans_probs();
        let mut xi: Array3<f64> = Array3::zeros((n.saturating_sub(1), k, k));
        let mut logs = vec![0.0; k * k];
        for t in 0..n.saturating_sub(1) {
            for i in 0..k {
                for j in 0..k {
                    logs[i * k + j] = (forward[[t, i]]
                        * trans[[i, j]]
                        * emissions.p(t + 1, j)
                        * backward[[t + 1, j]])
                    .to_log_value();
                }
            }
            let z = normalizer(&logs).map_err(|s| {
                HmmError::numerical(format!("transition posterior at t={} sums to {}", t, s))
            })?;
            let mut slice = xi.index_axis_mut(Axis(0), t);
            for i in 0..k {
                for j in 0..k {
                    slice[[i, j]] = (logs[i * k + j] - z).exp();
                }
            }
        }
        Ok(xi)
    }
}

///
/// `ln sum_i exp(logs[i])`, or the offending sum (as a probability) if it is
/// zero, infinite or NaN.
///
fn normalizer(logs: &[f64]) -> std::result::Result<f64, f64> {
    let z = log_sum_exp(logs);
    if z.is_finite() {
        Ok(z)
    } else {
        Err(z.exp())
    }
}

///
/// ```text
/// gamma[t][k] = F[t][k] B[t][k] / P(x)
/// ```
///
/// normalized per row in log space so that `sum_k gamma[t][k] = 1`.
///
fn state_probs(forward: &Array2<Prob>, backward: &Array2<Prob>) -> Result<Array2<f64>> {
    let mut gamma: Array2<f64> = Array2::zeros(forward.dim());
    for (t, mut row) in gamma.outer_iter_mut().enumerate() {
        let logs: Vec<f64> = (0..row.len())
            .map(|k| (forward[[t, k]] * backward[[t, k]]).to_log_value())
            .collect();
        let z = normalizer(&logs).map_err(|s| {
            HmmError::numerical(format!("state posterior at t={} sums to {}", t, s))
        })?;
        for (g, l) in row.iter_mut().zip(logs.iter()) {
            *g = (l - z).exp();
        }
    }
    Ok(gamma)
}
