///
/// probability calculation in log space
/// implements logaddexp
///
use approx::AbsDiffEq;

///
/// Wrapper of f64 that represents probability (or density) `p >= 0` by its log `ln p`.
///
/// Densities of continuous emissions can exceed 1, so `Prob` does not assume `p <= 1`.
///
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Prob(f64);

///
/// short-hand of `Prob::from_prob`
///
pub fn p(p: f64) -> Prob {
    Prob::from_prob(p)
}

///
/// short-hand of `Prob::from_log_prob`
///
pub fn lp(lp: f64) -> Prob {
    Prob::from_log_prob(lp)
}

///
/// `ln(sum_i exp(xs[i]))` without overflow/underflow.
///
/// Returns `-inf` for an empty slice or when every element is `-inf`.
///
/// ```text
/// log(sum_i exp(x_i)) = m + log(sum_i exp(x_i - m))   where m = max_i x_i
/// ```
pub fn log_sum_exp(xs: &[f64]) -> f64 {
    let m = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if m == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if m.is_infinite() {
        return m;
    }
    let s: f64 = xs.iter().map(|x| (x - m).exp()).sum();
    m + s.ln()
}

impl Prob {
    ///
    ///
    pub fn from_prob(value: f64) -> Prob {
        Prob(value.ln())
    }
    ///
    ///
    pub fn from_log_prob(log_value: f64) -> Prob {
        Prob(log_value)
    }
    ///
    /// Get the probability (in `[0, inf)`)
    pub fn to_value(self) -> f64 {
        self.0.exp()
    }
    ///
    /// Get the log probability
    pub fn to_log_value(self) -> f64 {
        self.0
    }
    ///
    /// Is `p == 0` or not? (log p = -inf)
    ///
    pub fn is_zero(self) -> bool {
        self.0.is_infinite() && self.0.is_sign_negative()
    }
    ///
    /// `ln p` is a real number or `-inf` (not NaN and not `+inf`)
    ///
    pub fn is_valid(self) -> bool {
        !self.0.is_nan() && self.0 != f64::INFINITY
    }
    ///
    /// prob=0.0
    ///
    pub fn zero() -> Prob {
        Prob(f64::NEG_INFINITY)
    }
    ///
    /// prob=1.0
    ///
    pub fn one() -> Prob {
        Prob(0.0)
    }
}

/// p=0 (Prob(-inf)) as a default value
impl Default for Prob {
    fn default() -> Self {
        Prob(f64::NEG_INFINITY)
    }
}

/// Addition of two probabilities `px + py` in log space
///
/// If `px > py`:
///
/// ```text
/// log(exp(x) + exp(y))
///  = log(exp(x) (1 + exp(y-x)))
///  = log(exp(x)) + log(1 + exp(y-x))
///  = x + log(1 + exp(y-x))
/// ```
impl std::ops::Add for Prob {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        let x = self.0;
        let y = other.0;
        let (x, y) = if x >= y { (x, y) } else { (y, x) };
        if y == f64::NEG_INFINITY {
            // x + 0 = x
            Prob(x)
        } else if x == y {
            // x + x = 2x
            Prob(x + std::f64::consts::LN_2)
        } else {
            Prob(x + (y - x).exp().ln_1p())
        }
    }
}

/// Multiplication of two probabilities `px * py` in log space
///
/// ```text
/// log(px * py) = log(px) + log(py)
/// ```
impl std::ops::Mul for Prob {
    type Output = Self;
    fn mul(self, other: Self) -> Self {
        Prob(self.0 + other.0)
    }
}

/// Division of two probabilities `px / py` in log space
///
/// ```text
/// log(px / py) = log(px) - log(py)
/// ```
impl std::ops::Div for Prob {
    type Output = Self;
    fn div(self, other: Self) -> Self {
        Prob(self.0 - other.0)
    }
}

// assign
impl std::ops::AddAssign for Prob {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}
impl std::ops::MulAssign for Prob {
    fn mul_assign(&mut self, other: Self) {
        *self = *self * other;
    }
}
// sum/prod
impl std::iter::Sum for Prob {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Prob::zero(), |a, b| a + b)
    }
}
impl<'a> std::iter::Sum<&'a Self> for Prob {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Prob::zero(), |a, b| a + *b)
    }
}
impl std::iter::Product for Prob {
    fn product<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Prob::one(), |a, b| a * b)
    }
}
impl<'a> std::iter::Product<&'a Self> for Prob {
    fn product<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Prob::one(), |a, b| a * *b)
    }
}

/// for approx `assert_abs_diff_eq`
impl AbsDiffEq for Prob {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        if self.is_zero() && other.is_zero() {
            true
        } else {
            f64::abs_diff_eq(&self.0, &other.0, epsilon)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prob_add_mul() {
        assert_eq!(p(0.0) + p(1.0), p(1.0));
        assert_eq!(p(0.0) * p(1.0), p(0.0));
        assert_abs_diff_eq!((p(0.3) + p(0.3)).0, p(0.6).0, epsilon = 1e-12);
        assert_abs_diff_eq!((p(0.3) * p(0.3)).0, p(0.09).0, epsilon = 1e-12);
        assert_abs_diff_eq!((p(0.5) + p(0.00001)).0, p(0.50001).0, epsilon = 1e-12);
        assert_abs_diff_eq!((p(0.5) / p(0.25)).0, p(2.0).0, epsilon = 1e-12);
    }
    #[test]
    fn prob_sum_prod() {
        // sum/prod of zero element vec
        let xs: Vec<Prob> = vec![];
        let sum: Prob = xs.iter().sum();
        let product: Prob = xs.iter().product();
        assert_eq!(sum, p(0.0));
        assert_eq!(product, p(1.0));

        let xs = vec![p(0.1), p(0.1), p(0.1)];
        let sum: Prob = xs.iter().sum();
        let product: Prob = xs.iter().product();
        assert_relative_eq!(sum.to_value(), 0.3, epsilon = 1e-12);
        assert_relative_eq!(product.to_value(), 0.001, epsilon = 1e-12);
    }
    #[test]
    fn prob_tiny_values_do_not_underflow() {
        // exp(-1000) underflows f64, its log does not
        let a = lp(-1000.0);
        let b = lp(-1001.0);
        let s = a + b;
        assert!(!s.is_zero());
        assert_abs_diff_eq!(
            s.to_log_value(),
            -1000.0 + (1.0 + (-1.0f64).exp()).ln(),
            epsilon = 1e-12
        );
    }
    #[test]
    fn prob_assign() {
        let mut x = p(0.4);
        x += p(0.2);
        assert_abs_diff_eq!(x, p(0.6), epsilon = 1e-12);
        x *= p(0.5);
        assert_abs_diff_eq!(x, p(0.3), epsilon = 1e-12);
        x *= p(0.0);
        assert!(x.is_zero());
    }
    #[test]
    fn log_sum_exp_stable() {
        assert_eq!(log_sum_exp(&[]), f64::NEG_INFINITY);
        assert_eq!(
            log_sum_exp(&[f64::NEG_INFINITY, f64::NEG_INFINITY]),
            f64::NEG_INFINITY
        );
        assert_abs_diff_eq!(log_sum_exp(&[0.0, 0.0]), 2f64.ln(), epsilon = 1e-12);
        assert_abs_diff_eq!(
            log_sum_exp(&[1000.0, 1000.0]),
            1000.0 + 2f64.ln(),
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(
            log_sum_exp(&[-1000.0, -1000.0]),
            -1000.0 + 2f64.ln(),
            epsilon = 1e-9
        );
        let xs = [p(0.2), p(0.3), p(0.1)];
        let logs: Vec<f64> = xs.iter().map(|x| x.to_log_value()).collect();
        let s: Prob = xs.iter().sum();
        assert_abs_diff_eq!(log_sum_exp(&logs), s.to_log_value(), epsilon = 1e-12);
    }
}
