//!
//! Backward algorithm definitions
//!
use super::table::EmissionTable;
use crate::params::ModelParams;
use crate::prob::Prob;
use ndarray::prelude::*;

///
/// Backward Algorithm
///
impl ModelParams {
    ///
    /// Run Backward algorithm on the emission table
    ///
    /// `B[t][k]` = P(emits `x[t+1:] = x[t+1], ..., x[n-1]` | state at t is `k`)
    ///
    /// ```text
    /// B[n-1][k] = 1
    /// B[t][k]   = \sum_j A[k][j] E[t+1][j] B[t+1][j]
    /// ```
    ///
    /// returns `n x K` table.
    ///
    pub fn backward(&self, table: &EmissionTable) -> Array2<Prob> {
        let n = table.n_emissions();
        let k = self.n_states();
        let trans = self.trans_probs();

        let mut b = Array2::from_elem((n, k), Prob::zero());
        for i in 0..k {
            b[[n - 1, i]] = Prob::one();
        }
        // feed the emissions backward
        for t in (0..n - 1).rev() {
            for i in 0..k {
                b[[t, i]] = (0..k)
                    .map(|j| trans[[i, j]] * table.p(t + 1, j) * b[[t + 1, j]])
                    .sum();
            }
        }
        b
    }
    ///
    /// `P(x) = \sum_k pi_k E[0][k] B[0][k]` from the backward table
    ///
    pub fn full_prob_backward(&self, table: &EmissionTable, b: &Array2<Prob>) -> Prob {
        let init = self.init_probs();
        (0..self.n_states())
            .map(|k| init[k] * table.p(0, k) * b[[0, k]])
            .sum()
    }
}
