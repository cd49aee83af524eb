//!
//! Forward algorithm definitions
//!
use super::table::EmissionTable;
use crate::params::ModelParams;
use crate::prob::Prob;
use ndarray::prelude::*;

impl ModelParams {
    ///
    /// Run Forward algorithm on the emission table
    ///
    /// `F[t][k]` = P(emits `x[:t+1] = x[0],...,x[t]` and now in state `k`)
    ///
    /// ```text
    /// F[0][k] = pi_k E[0][k]
    /// F[t][k] = E[t][k] \sum_j F[t-1][j] A[j][k]
    /// ```
    ///
    /// returns `n x K` table.
    ///
    pub fn forward(&self, table: &EmissionTable) -> Array2<Prob> {
        let n = table.n_emissions();
        let k = self.n_states();
        let init = self.init_probs();
        let trans = self.trans_probs();

        let mut f = Array2::from_elem((n, k), Prob::zero());
        for j in 0..k {
            f[[0, j]] = init[j] * table.p(0, j);
        }
        for t in 1..n {
            for j in 0..k {
                let from: Prob = (0..k).map(|i| f[[t - 1, i]] * trans[[i, j]]).sum();
                f[[t, j]] = table.p(t, j) * from;
            }
        }
        f
    }
}

///
/// `P(x) = \sum_k F[n-1][k]` from the forward table
///
pub fn full_prob_forward(f: &Array2<Prob>) -> Prob {
    f.row(f.nrows() - 1).iter().sum()
}
