//! REACLIB seven-coefficient rate parameterisation.

use serde::{Deserialize, Serialize};

use crate::scalar::Scalar;

/// Seven REACLIB coefficients `a0..a6`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateCoefficients(pub [f64; 7]);

impl RateCoefficients {
    pub fn new(coeffs: [f64; 7]) -> Self {
        Self(coeffs)
    }

    /// `exp(a0 + a1/T9 + a2*T9^(-1/3) + a3*T9^(1/3) + a4*T9 + a5*T9^(5/3) + a6*ln(T9))`.
    pub fn rate<S: Scalar>(&self, t9: S) -> S {
        self.log_rate(t9).exp()
    }

    /// The polynomial exponent itself, i.e. `ln(rate)`.
    pub fn log_rate<S: Scalar>(&self, t9: S) -> S {
        let [a0, a1, a2, a3, a4, a5, a6] = self.0;
        t9.constant(a0)
            + t9.constant(a1) * t9.recip()
            + t9.constant(a2) * t9.powf(-1.0 / 3.0)
            + t9.constant(a3) * t9.powf(1.0 / 3.0)
            + t9.constant(a4) * t9
            + t9.constant(a5) * t9.powf(5.0 / 3.0)
            + t9.constant(a6) * t9.ln()
    }

    /// Analytic `d(ln k)/dT9`, needed by the reverse-rate derivative.
    pub fn dlnk_dt9(&self, t9: f64) -> f64 {
        let [_, a1, a2, a3, a4, a5, a6] = self.0;
        -a1 / (t9 * t9) - (a2 / 3.0) * t9.powf(-4.0 / 3.0)
            + (a3 / 3.0) * t9.powf(-2.0 / 3.0)
            + a4
            + (5.0 * a5 / 3.0) * t9.powf(2.0 / 3.0)
            + a6 / t9
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_matches_plain_f64_computation() {
        let rc = RateCoefficients::new([1.0, -2.0, 0.5, 0.1, 0.0, 0.0, -0.5]);
        let t9 = 1.2_f64;
        let expected = (1.0 - 2.0 / t9 + 0.5 * t9.powf(-1.0 / 3.0) + 0.1 * t9.powf(1.0 / 3.0)
            - 0.5 * t9.ln())
        .exp();
        assert!((rc.rate(t9) - expected).abs() < 1e-12);
    }

    #[test]
    fn dlnk_dt9_matches_numerical_derivative() {
        let rc = RateCoefficients::new([1.0, -2.0, 0.5, 0.1, 0.3, -0.1, -0.5]);
        let t9 = 0.8_f64;
        let h = 1e-6;
        let numerical = (rc.log_rate(t9 + h) - rc.log_rate(t9 - h)) / (2.0 * h);
        assert!((rc.dlnk_dt9(t9) - numerical).abs() < 1e-5);
    }
}
