//!
//! Gaussian hidden Markov models for regime detection
//!
//! * `init`: initial parameters from observations and a seed
//! * `em`: Baum-Welch training (E-step by forward/backward in `hmm`)
//! * `hmm`: forward/backward, posteriors, Viterbi and sampling
//! * `model`: `GaussianHmm` with fit/decode/score/predict_proba/sample
//!
pub mod cli;
pub mod em;
pub mod error;
pub mod gaussian;
pub mod hmm;
pub mod init;
pub mod io;
pub mod linalg;
pub mod model;
pub mod params;
pub mod prob;
pub mod stats;

#[macro_use]
extern crate approx;

pub use error::{HmmError, Result};
pub use model::{decode, fit, GaussianHmm};
pub use params::ModelParams;
