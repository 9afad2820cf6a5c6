//! Levenberg-Marquardt solve of the algebraic quasi-steady-state balance
//! `f(exp(v)) = 0` in log-abundance space `v = ln(Y)`, so that iterates
//! never cross into negative abundance.
//!
//! Grounded on the `EigenFunctor<T>` nested functor of the original
//! `QSENetworkSolver`: the residual is evaluated at `Y = exp(v)`, and the
//! returned Jacobian's column `j` is scaled by `Y(j)` for the chain rule
//! `d f_i / d v_j = (d f_i / d Y_j) * Y_j`.

use nalgebra::{DMatrix, DVector};

use crate::error::{NetworkError, Result};

#[derive(Debug, Clone, Copy)]
pub struct LmOptions {
    pub max_iterations: usize,
    pub tol: f64,
    pub initial_lambda: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tol: 1e-10,
            initial_lambda: 1e-3,
        }
    }
}

/// Solves for `v` such that `residual(exp(v)) ~= 0`, starting from
/// `v0`. `jacobian_in_y_space(v)` must return `d(residual)/dY` evaluated
/// at `Y = exp(v)`; this function applies the `* Y(j)` chain-rule scaling
/// itself so callers always hand over the same Jacobian their residual
/// function would imply in `Y`-space.
pub fn solve_log_space(
    mut residual: impl FnMut(&DVector<f64>) -> DVector<f64>,
    mut jacobian_in_y_space: impl FnMut(&DVector<f64>) -> DMatrix<f64>,
    v0: &DVector<f64>,
    options: LmOptions,
) -> Result<DVector<f64>> {
    let n = v0.len();
    let mut v = v0.clone();
    let mut lambda = options.initial_lambda;

    let mut f = residual(&v);
    let mut cost = f.norm_squared();

    for iteration in 0..options.max_iterations {
        if f.amax() < options.tol {
            return Ok(v);
        }

        let y = DVector::from_iterator(n, v.iter().map(|&vi| vi.exp()));
        let mut j = jacobian_in_y_space(&v);
        for (col, &yj) in y.iter().enumerate() {
            let mut column = j.column_mut(col);
            column *= yj;
        }

        let jtj = j.transpose() * &j;
        let jtf = j.transpose() * &f;

        let mut accepted = false;
        for _ in 0..30 {
            let mut damped = jtj.clone();
            for i in 0..n {
                damped[(i, i)] += lambda * damped[(i, i)].max(1e-300);
            }
            let step = match damped.lu().solve(&(-&jtf)) {
                Some(s) => s,
                None => {
                    lambda *= 10.0;
                    continue;
                }
            };
            let v_trial = &v + &step;
            let f_trial = residual(&v_trial);
            let cost_trial = f_trial.norm_squared();

            if cost_trial.is_finite() && cost_trial < cost {
                v = v_trial;
                f = f_trial;
                cost = cost_trial;
                lambda = (lambda * 0.3).max(1e-12);
                accepted = true;
                break;
            } else {
                lambda *= 10.0;
            }
        }

        if !accepted {
            return Err(NetworkError::LmDidNotConverge {
                iterations: iteration,
                residual_norm: f.norm(),
            });
        }
    }

    if f.amax() < options.tol.sqrt() {
        Ok(v)
    } else {
        Err(NetworkError::LmDidNotConverge {
            iterations: options.max_iterations,
            residual_norm: f.norm(),
        })
    }
}
