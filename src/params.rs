//!
//! Model parameters `(pi, A, {mu_k, S_k})` of a Gaussian HMM
//!
use crate::error::{HmmError, Result};
use crate::gaussian::Gaussian;
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// tolerance of `sum = 1` checks on user-supplied distributions
pub const DIST_TOLERANCE: f64 = 1e-6;

///
/// Parameters of a Gaussian HMM with `K` states and `D` dimensional emissions
///
/// * `init[k]`: initial state distribution `pi_k`
/// * `trans[[k, j]]`: transition probability `A[k][j] = P(s_t+1 = j | s_t = k)`
/// * `emissions[k]`: Gaussian emission of state k
///
/// Invariants (checked by `new`): `pi` and every row of `A` are distributions,
/// every emission has the same dimension and a positive-definite covariance.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ParamsRepr", into = "ParamsRepr")]
pub struct ModelParams {
    init: Array1<f64>,
    trans: Array2<f64>,
    emissions: Vec<Gaussian>,
}

impl ModelParams {
    pub fn new(init: Array1<f64>, trans: Array2<f64>, emissions: Vec<Gaussian>) -> Result<Self> {
        let k = emissions.len();
        if k == 0 {
            return Err(HmmError::invalid("number of states must be >= 1"));
        }
        if init.len() != k {
            return Err(HmmError::invalid(format!(
                "initial distribution has length {} but there are {} states",
                init.len(),
                k
            )));
        }
        if trans.dim() != (k, k) {
            return Err(HmmError::invalid(format!(
                "transition matrix has shape {:?} but there are {} states",
                trans.dim(),
                k
            )));
        }
        check_distribution(init.view(), "initial distribution")?;
        for (i, row) in trans.outer_iter().enumerate() {
            check_distribution(row, &format!("transition row {}", i))?;
        }
        let d = emissions[0].dim();
        if let Some(i) = emissions.iter().position(|e| e.dim() != d) {
            return Err(HmmError::invalid(format!(
                "emission {} has dimension {} but emission 0 has {}",
                i,
                emissions[i].dim(),
                d
            )));
        }
        Ok(ModelParams {
            init,
            trans,
            emissions,
        })
    }
    ///
    /// Construct without validation. Used by the M-step, whose estimates are
    /// distributions by construction.
    ///
    pub(crate) fn from_parts_unchecked(
        init: Array1<f64>,
        trans: Array2<f64>,
        emissions: Vec<Gaussian>,
    ) -> Self {
        ModelParams {
            init,
            trans,
            emissions,
        }
    }
    /// number of hidden states `K`
    pub fn n_states(&self) -> usize {
        self.emissions.len()
    }
    /// emission dimension `D`
    pub fn dim(&self) -> usize {
        self.emissions[0].dim()
    }
    pub fn init(&self) -> &Array1<f64> {
        &self.init
    }
    pub fn trans(&self) -> &Array2<f64> {
        &self.trans
    }
    pub fn emissions(&self) -> &[Gaussian] {
        &self.emissions
    }
    pub fn emission(&self, k: usize) -> &Gaussian {
        &self.emissions[k]
    }
    /// `ln pi` (`-inf` for zero entries)
    pub fn log_init(&self) -> Array1<f64> {
        self.init.mapv(f64::ln)
    }
    /// `ln A` (`-inf` for zero entries)
    pub fn log_trans(&self) -> Array2<f64> {
        self.trans.mapv(f64::ln)
    }
    ///
    /// Check that the observations have the emission dimension of this model
    ///
    pub fn check_observations(&self, xs: ArrayView2<f64>) -> Result<()> {
        if xs.nrows() == 0 {
            return Err(HmmError::invalid("observation sequence is empty"));
        }
        if xs.ncols() != self.dim() {
            return Err(HmmError::invalid(format!(
                "observations have dimension {} but the model has {}",
                xs.ncols(),
                self.dim()
            )));
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
    /// Expected number of consecutive steps spent in state k, `1 / (1 - A_kk)`.
    ///
    pub fn expected_duration(&self, k: usize) -> f64 {
        let stay = self.trans[[k, k]];
        if stay >= 1.0 {
            f64::INFINITY
        } else {
            1.0 / (1.0 - stay)
        }
    }
}

fn check_distribution(v: ArrayView1<f64>, name: &str) -> Result<()> {
    if v.iter().any(|&x| !(x >= 0.0) || !x.is_finite()) {
        return Err(HmmError::invalid(format!(
            "{} has negative or non-finite entries: {}",
            name, v
        )));
    }
    let s = v.sum();
    if (s - 1.0).abs() > DIST_TOLERANCE {
        return Err(HmmError::invalid(format!(
            "{} sums to {} (expected 1)",
            name, s
        )));
    }
    Ok(())
}

impl std::fmt::Display for ModelParams {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "n_states: {}", self.n_states())?;
        writeln!(f, "dim: {}", self.dim())?;
        writeln!(f, "init: {}", self.init)?;
        writeln!(f, "trans:")?;
        for row in self.trans.outer_iter() {
            writeln!(f, "  {}", row)?;
        }
        for (k, e) in self.emissions.iter().enumerate() {
            writeln!(f, "state {} mean: {}", k, e.mean())?;
            writeln!(f, "state {} cov:", k)?;
            for row in e.cov().outer_iter() {
                writeln!(f, "  {}", row)?;
            }
        }
        Ok(())
    }
}

//
// serialization
//

///
/// Plain nested-vector form of `ModelParams` used for JSON
///
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParamsRepr {
    init: Vec<f64>,
    trans: Vec<Vec<f64>>,
    means: Vec<Vec<f64>>,
    covs: Vec<Vec<Vec<f64>>>,
}

fn to_rows(a: &Array2<f64>) -> Vec<Vec<f64>> {
    a.outer_iter().map(|row| row.to_vec()).collect()
}

fn from_rows(rows: &[Vec<f64>], name: &str) -> Result<Array2<f64>> {
    let n = rows.len();
    let m = rows.first().map(|r| r.len()).unwrap_or(0);
    if rows.iter().any(|r| r.len() != m) {
        return Err(HmmError::invalid(format!("{} has ragged rows", name)));
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((n, m), flat).map_err(|e| HmmError::invalid(format!("{}: {}", name, e)))
}

impl From<ModelParams> for ParamsRepr {
    fn from(params: ModelParams) -> Self {
        ParamsRepr {
            init: params.init.to_vec(),
            trans: to_rows(&params.trans),
            means: params.emissions.iter().map(|e| e.mean().to_vec()).collect(),
            covs: params.emissions.iter().map(|e| to_rows(e.cov())).collect(),
        }
    }
}

impl TryFrom<ParamsRepr> for ModelParams {
    type Error = HmmError;
    fn try_from(repr: ParamsRepr) -> Result<Self> {
        if repr.means.len() != repr.covs.len() {
            return Err(HmmError::invalid(format!(
                "{} means but {} covariances",
                repr.means.len(),
                repr.covs.len()
            )));
        }
        let emissions = repr
            .means
            .into_iter()
            .zip(repr.covs.iter())
            .enumerate()
            .map(|(k, (mean, cov))| {
                let cov = from_rows(cov, "covariance")?;
                Gaussian::new(Array1::from(mean), cov).map_err(|e| e.at_state(k))
            })
            .collect::<Result<Vec<_>>>()?;
        let trans = from_rows(&repr.trans, "transition matrix")?;
        ModelParams::new(Array1::from(repr.init), trans, emissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmm::mocks::mock_two_state_params;
    use ndarray::array;

    #[test]
    fn new_rejects_invalid() {
        let g = || Gaussian::new(array![0.0], array![[1.0]]).unwrap();
        // pi does not sum to one
        assert!(ModelParams::new(array![0.5, 0.6], array![[0.5, 0.5], [0.5, 0.5]], vec![g(), g()])
            .is_err());
        // A row does not sum to one
        assert!(ModelParams::new(array![0.5, 0.5], array![[0.9, 0.5], [0.5, 0.5]], vec![g(), g()])
            .is_err());
        // wrong shape
        assert!(ModelParams::new(array![1.0], array![[0.5, 0.5], [0.5, 0.5]], vec![g()]).is_err());
        // no states
        assert!(ModelParams::new(Array1::zeros(0), Array2::zeros((0, 0)), vec![]).is_err());
        // mixed dimensions
        let g2 = Gaussian::new(array![0.0, 0.0], Array2::eye(2)).unwrap();
        assert!(ModelParams::new(array![0.5, 0.5], array![[0.5, 0.5], [0.5, 0.5]], vec![g(), g2])
            .is_err());
        // ok
        assert!(ModelParams::new(array![0.5, 0.5], array![[0.5, 0.5], [0.5, 0.5]], vec![g(), g()])
            .is_ok());
    }
    #[test]
    fn check_observations_shape() {
        let params = mock_two_state_params();
        assert!(params.check_observations(Array2::zeros((4, 3)).view()).is_ok());
        assert!(params.check_observations(Array2::zeros((0, 3)).view()).is_err());
        assert!(params.check_observations(Array2::zeros((4, 2)).view()).is_err());
        let mut xs = Array2::zeros((4, 3));
        xs[[2, 1]] = f64::NAN;
        assert!(params.check_observations(xs.view()).is_err());
    }
    #[test]
    fn json_round_trip() {
        let params = mock_two_state_params();
        let json = serde_json::to_string(&params).unwrap();
        let back: ModelParams = serde_json::from_str(&json).unwrap();
        assert_abs_diff_eq!(back.trans(), params.trans(), epsilon = 1e-15);
        assert_abs_diff_eq!(back.emission(1).cov(), params.emission(1).cov(), epsilon = 1e-15);
    }
    #[test]
    fn json_with_broken_covariance_is_rejected() {
        let json = r#"{"init":[1.0],"trans":[[1.0]],"means":[[0.0]],"covs":[[[-1.0]]]}"#;
        let r: std::result::Result<ModelParams, _> = serde_json::from_str(json);
        assert!(r.is_err());
    }
    #[test]
    fn expected_duration() {
        let params = mock_two_state_params();
        // A_00 = 0.9
        assert_abs_diff_eq!(params.expected_duration(0), 10.0, epsilon = 1e-9);
    }
}
