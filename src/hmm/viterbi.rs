//!
//! Viterbi algorithm: the most probable hidden state path
//!
//! ```text
//! V[0][k] = ln pi_k + ln E[0][k]
//! V[t][k] = ln E[t][k] + max_j (V[t-1][j] + ln A[j][k])
//! P[t][k] = argmax_j (V[t-1][j] + ln A[j][k])
//! ```
//!
//! The path ends at `argmax_k V[n-1][k]` and is traced back through `P`.
//! Ties are broken towards the lowest state index.
//!
use super::table::EmissionTable;
use crate::error::{HmmError, Result};
use crate::params::ModelParams;
use ndarray::prelude::*;

///
/// argmax with the lowest index among equal maxima
///
fn argmax_first<I: IntoIterator<Item = f64>>(xs: I) -> (usize, f64) {
    let mut best = (0, f64::NEG_INFINITY);
    for (i, x) in xs.into_iter().enumerate() {
        if i == 0 || x > best.1 {
            best = (i, x);
        }
    }
    best
}

impl ModelParams {
    ///
    /// Most probable state path for observations `xs`, and its log joint
    /// probability `ln P(path, x)`.
    ///
    pub fn viterbi(&self, xs: ArrayView2<f64>) -> Result<(Vec<usize>, f64)> {
        let table = self.emission_table(xs)?;
        self.viterbi_table(&table)
    }
    ///
    /// Viterbi on a precomputed emission table
    ///
    pub fn viterbi_table(&self, table: &EmissionTable) -> Result<(Vec<usize>, f64)> {
        let n = table.n_emissions();
        let k = self.n_states();
        let log_init = self.log_init();
        let log_trans = self.log_trans();

        let mut v: Array2<f64> = Array2::from_elem((n, k), f64::NEG_INFINITY);
        let mut back: Array2<usize> = Array2::zeros((n, k));
        for j in 0..k {
            v[[0, j]] = log_init[j] + table.p(0, j).to_log_value();
        }
        for t in 1..n {
            for j in 0..k {
                let (i, best) = argmax_first((0..k).map(|i| v[[t - 1, i]] + log_trans[[i, j]]));
                v[[t, j]] = table.p(t, j).to_log_value() + best;
                back[[t, j]] = i;
            }
        }

        let (last, score) = argmax_first(v.row(n - 1).iter().copied());
        if !score.is_finite() {
            return Err(HmmError::numerical(format!(
                "best path log probability is {}",
                score
            )));
        }
        let mut path = vec![0; n];
        path[n - 1] = last;
        for t in (1..n).rev() {
            path[t - 1] = back[[t, path[t]]];
        }
        Ok((path, score))
    }
}
