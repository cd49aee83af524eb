//!
//! Errors of fitting/decoding
//!
use std::fmt;

/// All errors that can occur while fitting or decoding a Gaussian HMM.
#[derive(Debug)]
pub enum HmmError {
    /// Malformed shapes or dimensions (caller bug, never retried).
    InvalidInput(String),
    /// A covariance stayed non positive-definite after regularization, or a
    /// likelihood became NaN/Inf.
    Numerical {
        iteration: Option<usize>,
        state: Option<usize>,
        /// log likelihood of the last parameters that evaluated cleanly
        log_likelihood: Option<f64>,
        message: String,
    },
    /// Iteration budget exhausted in strict convergence mode.
    NonConvergence {
        iterations: usize,
        log_likelihood: f64,
        delta: f64,
    },
    /// Reading observations or model files failed.
    Io(std::io::Error),
    /// Model file is not valid JSON for `ModelParams`.
    Json(serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HmmError>;

impl HmmError {
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        HmmError::InvalidInput(msg.into())
    }
    pub fn numerical<S: Into<String>>(msg: S) -> Self {
        HmmError::Numerical {
            iteration: None,
            state: None,
            log_likelihood: None,
            message: msg.into(),
        }
    }
    ///
    /// attach the state index to a `Numerical` error (no-op for other variants)
    ///
    pub fn at_state(self, k: usize) -> Self {
        match self {
            HmmError::Numerical {
                iteration,
                log_likelihood,
                message,
                ..
            } => HmmError::Numerical {
                iteration,
                state: Some(k),
                log_likelihood,
                message,
            },
            e => e,
        }
    }
    ///
    /// attach the EM iteration to a `Numerical` error (no-op for other variants)
    ///
    pub fn at_iteration(self, i: usize) -> Self {
        match self {
            HmmError::Numerical {
                state,
                log_likelihood,
                message,
                ..
            } => HmmError::Numerical {
                iteration: Some(i),
                state,
                log_likelihood,
                message,
            },
            e => e,
        }
    }
    ///
    /// attach the last finite log likelihood to a `Numerical` error (no-op for
    /// other variants, and for `None`)
    ///
    pub fn with_log_likelihood(self, ll: Option<f64>) -> Self {
        match self {
            HmmError::Numerical {
                iteration,
                state,
                log_likelihood,
                message,
            } => HmmError::Numerical {
                iteration,
                state,
                log_likelihood: ll.or(log_likelihood),
                message,
            },
            e => e,
        }
    }
}

impl fmt::Display for HmmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::Numerical {
                iteration,
                state,
                log_likelihood,
                message,
            } => {
                write!(f, "numerical error: {message}")?;
                if let Some(i) = iteration {
                    write!(f, " (iteration={i})")?;
                }
                if let Some(k) = state {
                    write!(f, " (state={k})")?;
                }
                if let Some(ll) = log_likelihood {
                    write!(f, " (last log_likelihood={ll})")?;
                }
                Ok(())
            }
            Self::NonConvergence {
                iterations,
                log_likelihood,
                delta,
            } => write!(
                f,
                "not converged after {iterations} iterations: log_likelihood={log_likelihood} delta={delta}"
            ),
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl std::error::Error for HmmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for HmmError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for HmmError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// Parse failures of a delimited file are `InvalidInput`, read failures stay `Io`.
impl From<csv::Error> for HmmError {
    fn from(e: csv::Error) -> Self {
        let msg = e.to_string();
        match e.into_kind() {
            csv::ErrorKind::Io(e) => Self::Io(e),
            _ => Self::InvalidInput(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numerical_error_carries_context() {
        let e = HmmError::numerical("covariance is not positive-definite")
            .at_state(1)
            .at_iteration(7);
        let s = e.to_string();
        assert!(s.contains("state=1"));
        assert!(s.contains("iteration=7"));
        match e {
            HmmError::Numerical {
                iteration, state, ..
            } => {
                assert_eq!(iteration, Some(7));
                assert_eq!(state, Some(1));
            }
            _ => panic!("wrong variant"),
        }
    }
    #[test]
    fn numerical_error_carries_last_log_likelihood() {
        let e = HmmError::numerical("covariance is not positive-definite")
            .at_iteration(3)
            .with_log_likelihood(Some(-12.5))
            .at_state(0);
        assert!(e.to_string().contains("log_likelihood=-12.5"));
        match e {
            HmmError::Numerical {
                iteration,
                state,
                log_likelihood,
                ..
            } => {
                assert_eq!(iteration, Some(3));
                assert_eq!(state, Some(0));
                assert_eq!(log_likelihood, Some(-12.5));
            }
            _ => panic!("wrong variant"),
        }
        // None keeps what is already there
        let e = HmmError::numerical("x")
            .with_log_likelihood(Some(-1.0))
            .with_log_likelihood(None);
        assert!(matches!(
            e,
            HmmError::Numerical {
                log_likelihood: Some(_),
                ..
            }
        ));
    }
    #[test]
    fn context_is_ignored_for_other_variants() {
        let e = HmmError::invalid("empty").at_state(3);
        assert!(matches!(e, HmmError::InvalidInput(_)));
    }
}
