//!
//! Table definitions
//!
//! ## EmissionTable
//!
//! the emission prob assigned for each (time, state)
//!
//! E[t][k] = b_k(x[t]) = N(x[t]; mu_k, S_k)
//!
use crate::error::{HmmError, Result};
use crate::params::ModelParams;
use crate::prob::Prob;
use ndarray::prelude::*;

///
/// `n x K` table of emission densities in log space
///
#[derive(Debug, Clone)]
pub struct EmissionTable(pub Array2<Prob>);

impl EmissionTable {
    /// number of observations `n`
    pub fn n_emissions(&self) -> usize {
        self.0.nrows()
    }
    /// number of states `K`
    pub fn n_states(&self) -> usize {
        self.0.ncols()
    }
    /// `E[t][k]`
    pub fn p(&self, t: usize, k: usize) -> Prob {
        self.0[[t, k]]
    }
}

impl ModelParams {
    ///
    /// Fill the emission table for observations `xs`.
    ///
    /// Fails with `InvalidInput` if `xs` does not match the model dimension, and
    /// with `Numerical` if a log density is NaN or `+inf`.
    ///
    pub fn emission_table(&self, xs: ArrayView2<f64>) -> Result<EmissionTable> {
        self.check_observations(xs)?;
        let n = xs.nrows();
        let k = self.n_states();
        let mut table = Array2::from_elem((n, k), Prob::zero());
        for (t, x) in xs.outer_iter().enumerate() {
            for (j, emission) in self.emissions().iter().enumerate() {
                let p = emission.density(x);
                if !p.is_valid() {
                    return Err(HmmError::numerical(format!(
                        "emission log density at t={} is {}",
                        t,
                        p.to_log_value()
                    ))
                    .at_state(j));
                }
                table[[t, j]] = p;
            }
        }
        Ok(EmissionTable(table))
    }
    ///
    /// `pi` as `Prob`
    ///
    pub fn init_probs(&self) -> Array1<Prob> {
        self.init().mapv(Prob::from_prob)
    }
    ///
    /// `A` as `Prob`
    ///
    pub fn trans_probs(&self) -> Array2<Prob> {
        self.trans().mapv(Prob::from_prob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmm::mocks::mock_two_state_params;
    use ndarray::array;

    #[test]
    fn emission_table_matches_gaussian() {
        let params = mock_two_state_params();
        let xs = array![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]];
        let table = params.emission_table(xs.view()).unwrap();
        assert_eq!(table.n_emissions(), 2);
        assert_eq!(table.n_states(), 2);
        for t in 0..2 {
            for k in 0..2 {
                assert_abs_diff_eq!(
                    table.p(t, k).to_log_value(),
                    params.emission(k).log_density(xs.row(t)),
                    epsilon = 1e-12
                );
            }
        }
        // x[0] is the mean of state 0
        assert!(table.p(0, 0) > table.p(0, 1));
        assert!(table.p(1, 1) > table.p(1, 0));
    }
    #[test]
    fn emission_table_rejects_wrong_dimension() {
        let params = mock_two_state_params();
        let xs = array![[0.0, 0.0]];
        assert!(matches!(
            params.emission_table(xs.view()),
            Err(HmmError::InvalidInput(_))
        ));
    }
}
