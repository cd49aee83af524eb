//!
//! Gaussian HMM calculation
//!
//! # Overview of calculation
//!
//! x = x[0],...,x[n-1] : observations (D-dimensional vectors) of length n
//! K hidden states, initial distribution pi, transition A, emission b_k(x) = N(x; mu_k, S_k)
//!
//! Emission table (`table.rs`)
//! E[t][k]
//!  = b_k(x[t])
//!
//! Forward (`forward.rs`)
//! F[t][k]
//!  = P(emits x[0:t+1]=x[0],...,x[t] and state at t is k)
//!
//! Backward (`backward.rs`)
//! B[t][k]
//!  = P(emits x[t+1:n]=x[t+1],...,x[n-1] | state at t is k)
//!
//! Posteriors (`posterior.rs`)
//! gamma[t][k]
//!  = P(state at t is k | x)
//!  = F[t][k] B[t][k] / P(x)
//! xi[t][k][j]
//!  = P(state at t is k and state at t+1 is j | x)
//!  = F[t][k] A[k][j] E[t+1][j] B[t+1][j] / P(x)
//!
//! Viterbi (`viterbi.rs`)
//! V[t][k]
//!  = max over s[0:t] of P(s[0:t], state at t is k, x[0:t+1])
//!
//! All tables are stored as `Prob` (log space), so sequences of thousands of
//! steps do not underflow.
//!
pub mod backward;
pub mod forward;
pub mod mocks;
pub mod posterior;
pub mod sample;
pub mod table;
pub mod viterbi;

pub use posterior::HmmOutput;
pub use table::EmissionTable;
