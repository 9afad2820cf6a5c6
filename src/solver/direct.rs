//! Stiff integration of the full reaction network: every species plus a
//! trailing specific-energy-rate slot, advanced with [`super::rosenbrock`].
//!
//! Grounded on `DirectNetworkSolver::evaluate`/`RHSFunctor`/`JacobianFunctor`
//! in the original `solver.cpp`, which drives `boost::odeint`'s
//! `rosenbrock4` over the same augmented state.

use std::cell::RefCell;

use nalgebra::DMatrix;

use crate::composition::Composition;
use crate::config::Config;
use crate::engine::{Engine, MIN_ABUNDANCE_THRESHOLD};
use crate::error::Result;

use super::rosenbrock::{self, Tolerances};
use super::{NetIn, NetOut};

/// Integrates the full, non-reduced reaction network stiffly from `net_in`
/// to `net_in.t_max`, holding every species in the engine's network (no QSE
/// partitioning). Borrows its engine rather than owning it, so the same
/// engine or view can be reused by a caller across several solver calls.
pub struct DirectNetworkSolver<'e, E: Engine> {
    engine: &'e mut E,
}

impl<'e, E: Engine> DirectNetworkSolver<'e, E> {
    pub fn new(engine: &'e mut E) -> Self {
        Self { engine }
    }

    pub fn evaluate(&mut self, net_in: &NetIn) -> Result<NetOut> {
        let t9 = net_in.t9();
        let rho = net_in.density;
        let num_species = self.engine.network_species().len();

        let mut y0 = vec![0.0; num_species + 1];
        for (i, species) in self.engine.network_species().iter().enumerate() {
            y0[i] = net_in.composition.molar_abundance_of(*species);
        }
        y0[num_species] = net_in.energy;

        let cfg = Config::global();
        let tol = Tolerances {
            abs_tol: cfg.direct_solver_abs_tol,
            rel_tol: cfg.direct_solver_rel_tol,
        };

        // Both closures below need concurrent access to the same engine
        // (one read-only for the RHS, one mutating for the Jacobian); a
        // `RefCell` lets them share it without forcing a single combined
        // closure.
        let engine = RefCell::new(&mut *self.engine);
        let result = rosenbrock::integrate(
            |y| {
                let derivatives = engine
                    .borrow()
                    .calculate_rhs_and_energy(&y[..num_species], t9, rho);
                let mut dydt = derivatives.dydt;
                dydt.push(derivatives.nuclear_energy_generation_rate);
                dydt
            },
            |y| {
                let mut engine = engine.borrow_mut();
                engine.generate_jacobian(&y[..num_species], t9, rho);
                let mut j = DMatrix::<f64>::zeros(num_species + 1, num_species + 1);
                for i in 0..num_species {
                    for k in 0..num_species {
                        j[(i, k)] = engine.jacobian_entry(i, k);
                    }
                }
                j
            },
            &y0,
            0.0,
            net_in.t_max,
            net_in.dt0,
            tol,
        )?;

        let species = self.engine.network_species();
        let mut mass_fractions: Vec<f64> = species
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let x = result.y[i] * s.a as f64;
                if x < MIN_ABUNDANCE_THRESHOLD {
                    0.0
                } else {
                    x
                }
            })
            .collect();

        let sum: f64 = mass_fractions.iter().sum();
        if sum > 0.0 {
            for x in &mut mass_fractions {
                *x /= sum;
            }
        }

        let composition = Composition::from_mass_fractions(
            species.iter().copied().zip(mass_fractions),
        );

        Ok(NetOut {
            composition,
            num_steps: result.steps,
            energy: result.y[num_species],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GraphEngine;
    use crate::reaction::rate::RateCoefficients;
    use crate::reaction::{LogicalReactionSet, Reaction};
    use crate::species::Species;

    fn pd_he3_network() -> GraphEngine {
        let p = Species::new(1, 1);
        let d = Species::new(1, 2);
        let he3 = Species::new(2, 3);
        let reaction = Reaction::new(
            "p(d,g)he3",
            2,
            vec![p, d],
            vec![he3],
            5.49,
            "nacre",
            RateCoefficients::new([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            false,
        )
        .unwrap();
        let mut set = LogicalReactionSet::new();
        set.insert_or_merge(&reaction).unwrap();
        GraphEngine::new(set).unwrap()
    }

    #[test]
    fn evaluate_conserves_total_mass_fraction() {
        let mut engine = pd_he3_network();
        let p = Species::new(1, 1);
        let d = Species::new(1, 2);
        let composition = Composition::from_mass_fractions([(p, 0.7), (d, 0.3)]);
        let net_in = NetIn {
            composition,
            t_max: 1e-6,
            dt0: 1e-9,
            temperature: 1e8,
            density: 1e3,
            energy: 0.0,
            culling_threshold: None,
        };
        let mut solver = DirectNetworkSolver::new(&mut engine);
        let out = solver.evaluate(&net_in).unwrap();
        assert!((out.composition.total_mass_fraction() - 1.0).abs() < 1e-8);
    }

    #[test]
    fn evaluate_reports_zero_steps_for_a_zero_length_interval() {
        let mut engine = pd_he3_network();
        let p = Species::new(1, 1);
        let composition = Composition::from_mass_fractions([(p, 1.0)]);
        let net_in = NetIn {
            composition,
            t_max: 0.0,
            dt0: 1e-9,
            temperature: 1e8,
            density: 1e3,
            energy: 0.0,
            culling_threshold: None,
        };
        let mut solver = DirectNetworkSolver::new(&mut engine);
        let out = solver.evaluate(&net_in).unwrap();
        assert_eq!(out.num_steps, 0);
    }
}
