//! Embedded Dormand-Prince 5(4) explicit Runge-Kutta integration with
//! adaptive step-size control, used by [`super::qse::QSENetworkSolver`] to
//! advance the slow (non-QSE) manifold once the fast species have been
//! collapsed onto their algebraic steady state.

use crate::error::{NetworkError, Result};

const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;
const A71: f64 = 35.0 / 384.0;
const A73: f64 = 500.0 / 1113.0;
const A74: f64 = 125.0 / 192.0;
const A75: f64 = -2187.0 / 6784.0;
const A76: f64 = 11.0 / 84.0;

// Fifth-order solution weights equal row 7 of A (first-same-as-last).
const B1: f64 = A71;
const B3: f64 = A73;
const B4: f64 = A74;
const B5: f64 = A75;
const B6: f64 = A76;

// Fourth-order embedded solution weights, for the error estimate.
const E1: f64 = 5179.0 / 57600.0;
const E3: f64 = 7571.0 / 16695.0;
const E4: f64 = 393.0 / 640.0;
const E5: f64 = -92097.0 / 339200.0;
const E6: f64 = 187.0 / 2100.0;
const E7: f64 = 1.0 / 40.0;

/// Step-size and error-control parameters shared with the rest of the
/// solver stack.
#[derive(Debug, Clone, Copy)]
pub struct Tolerances {
    pub abs_tol: f64,
    pub rel_tol: f64,
}

/// Outcome of integrating an autonomous (or weakly time-dependent) ODE
/// system with [`integrate`].
#[derive(Debug, Clone)]
pub struct IntegrationResult {
    pub y: Vec<f64>,
    pub steps: usize,
}

/// Integrates `dy/dt = rhs(t, y)` from `t0` to `t_end` starting from `y0`,
/// with adaptive step-size control driven by the embedded 4th-order error
/// estimate. `initial_dt` seeds the first trial step.
pub fn integrate(
    mut rhs: impl FnMut(f64, &[f64]) -> Vec<f64>,
    y0: &[f64],
    t0: f64,
    t_end: f64,
    initial_dt: f64,
    tol: Tolerances,
) -> Result<IntegrationResult> {
    let n = y0.len();
    let mut y = y0.to_vec();
    let mut t = t0;
    let mut dt = initial_dt.min(t_end - t0).max(f64::MIN_POSITIVE);
    let mut steps = 0usize;

    const MAX_STEPS: usize = 100_000;
    const MIN_DT: f64 = 1e-30;
    const SAFETY: f64 = 0.9;

    while t < t_end {
        if steps >= MAX_STEPS {
            return Err(NetworkError::StepSizeCollapsed { steps, t });
        }
        if dt < MIN_DT {
            return Err(NetworkError::StepSizeCollapsed { steps, t });
        }
        dt = dt.min(t_end - t);

        let k1 = rhs(t, &y);
        let y2: Vec<f64> = (0..n).map(|i| y[i] + dt * A21 * k1[i]).collect();
        let k2 = rhs(t + C2 * dt, &y2);
        let y3: Vec<f64> = (0..n).map(|i| y[i] + dt * (A31 * k1[i] + A32 * k2[i])).collect();
        let k3 = rhs(t + C3 * dt, &y3);
        let y4: Vec<f64> = (0..n)
            .map(|i| y[i] + dt * (A41 * k1[i] + A42 * k2[i] + A43 * k3[i]))
            .collect();
        let k4 = rhs(t + C4 * dt, &y4);
        let y5: Vec<f64> = (0..n)
            .map(|i| y[i] + dt * (A51 * k1[i] + A52 * k2[i] + A53 * k3[i] + A54 * k4[i]))
            .collect();
        let k5 = rhs(t + C5 * dt, &y5);
        let y6: Vec<f64> = (0..n)
            .map(|i| y[i] + dt * (A61 * k1[i] + A62 * k2[i] + A63 * k3[i] + A64 * k4[i] + A65 * k5[i]))
            .collect();
        let k6 = rhs(t + dt, &y6);
        let y_next: Vec<f64> = (0..n)
            .map(|i| y[i] + dt * (A71 * k1[i] + A73 * k3[i] + A74 * k4[i] + A75 * k5[i] + A76 * k6[i]))
            .collect();
        let k7 = rhs(t + dt, &y_next);

        let mut error_norm = 0.0_f64;
        for i in 0..n {
            let err_i = dt
                * ((B1 - E1) * k1[i] + (B3 - E3) * k3[i] + (B4 - E4) * k4[i] + (B5 - E5) * k5[i]
                    + (B6 - E6) * k6[i]
                    - E7 * k7[i]);
            let scale = tol.abs_tol + tol.rel_tol * y[i].abs().max(y_next[i].abs());
            error_norm += (err_i / scale).powi(2);
        }
        error_norm = (error_norm / n.max(1) as f64).sqrt();

        if !error_norm.is_finite() {
            return Err(NetworkError::NonFiniteState { steps, t });
        }

        if error_norm <= 1.0 {
            t += dt;
            y = y_next;
            steps += 1;
            if !y.iter().all(|v| v.is_finite()) {
                return Err(NetworkError::NonFiniteState { steps, t });
            }
        }

        let growth = if error_norm == 0.0 {
            5.0
        } else {
            (SAFETY * error_norm.powf(-0.2)).clamp(0.2, 5.0)
        };
        dt *= growth;
    }

    Ok(IntegrationResult { y, steps })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrates_exponential_decay_accurately() {
        let result = integrate(
            |_t, y| vec![-y[0]],
            &[1.0],
            0.0,
            5.0,
            1e-3,
            Tolerances {
                abs_tol: 1e-10,
                rel_tol: 1e-10,
            },
        )
        .unwrap();
        let expected = (-5.0_f64).exp();
        assert!((result.y[0] - expected).abs() < 1e-6);
    }

    #[test]
    fn tighter_tolerance_takes_more_steps() {
        let loose = integrate(
            |_t, y| vec![-y[0]],
            &[1.0],
            0.0,
            5.0,
            1e-2,
            Tolerances {
                abs_tol: 1e-4,
                rel_tol: 1e-4,
            },
        )
        .unwrap();
        let tight = integrate(
            |_t, y| vec![-y[0]],
            &[1.0],
            0.0,
            5.0,
            1e-2,
            Tolerances {
                abs_tol: 1e-12,
                rel_tol: 1e-12,
            },
        )
        .unwrap();
        assert!(tight.steps >= loose.steps);
    }
}
