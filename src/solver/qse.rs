//! Quasi-steady-state integration: species whose network timescale is
//! effectively instantaneous (or whose abundance has already collapsed to
//! nothing) are held in algebraic balance rather than integrated, and only
//! the remaining slow manifold plus the energy-rate slot is advanced in
//! time.
//!
//! Grounded on `QSENetworkSolver::evaluate`/`packSpeciesTypeIndexVectors`/
//! `calculateSteadyStateAbundances`/`shouldUpdateView`/`RHSFunctor` in the
//! original `solver.cpp`.

use std::cell::RefCell;
use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};

use crate::composition::Composition;
use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;
use crate::screening::ScreeningType;
use crate::species::Species;

use super::direct::DirectNetworkSolver;
use super::lm::{self, LmOptions};
use super::{dopri5, NetIn, NetOut};

/// Below this abundance a species is treated as having collapsed to zero
/// and sanitized up to the floor before the network is evaluated, matching
/// the original's `abundance_floor` guard against taking `log(0)`.
const ABUNDANCE_FLOOR: f64 = 1e-30;

/// A species whose combined network/decay timescale is at or below this
/// (seconds) is held in algebraic steady state rather than integrated.
const TIMESCALE_CUTOFF: f64 = 1e-5;

/// A species below this abundance is always treated as QSE, regardless of
/// its timescale.
const ABUNDANCE_CUTOFF: f64 = 1e-15;

struct SpeciesPartition {
    dynamic_indices: Vec<usize>,
    qse_indices: Vec<usize>,
}

/// Holds the thermodynamic state the view was last rebuilt for, so repeated
/// calls at nearly-unchanged conditions can reuse the existing culled view
/// instead of paying to rebuild it every time.
#[derive(Debug, Clone)]
struct LastSeenConditions {
    temperature: f64,
    density: f64,
    h1_mass_fraction: f64,
}

/// Drives an [`Engine`] (typically an [`crate::view::AdaptiveEngineView`])
/// forward in time with fast species collapsed onto an algebraic steady
/// state, re-updating the underlying view only when conditions have moved
/// enough to matter.
pub struct QSENetworkSolver<'e, V> {
    view: &'e mut V,
    last_seen: Option<LastSeenConditions>,
}

/// The subset of [`Engine`] plus the view-update hook every concrete view
/// implements; kept separate from [`Engine`] itself so [`DirectNetworkSolver`]
/// can still be driven directly against a bare [`Engine`] without this
/// bound.
pub trait UpdatableEngine: Engine {
    fn update(&mut self, net_in: &NetIn) -> Result<()>;
}

impl<'e, V: UpdatableEngine> QSENetworkSolver<'e, V> {
    pub fn new(view: &'e mut V) -> Self {
        Self {
            view,
            last_seen: None,
        }
    }

    pub fn evaluate(&mut self, net_in: &NetIn) -> Result<NetOut> {
        if self.should_update_view(net_in) {
            self.view.update(net_in)?;
            self.last_seen = Some(LastSeenConditions {
                temperature: net_in.temperature,
                density: net_in.density,
                h1_mass_fraction: net_in.composition.mass_fraction_of(Species::new(1, 1)),
            });
        }

        let t9 = net_in.t9();
        let rho = net_in.density;

        let post_ignition = self.ignite(net_in)?;

        let species = self.view.network_species().to_vec();
        let mut y: Vec<f64> = species
            .iter()
            .map(|s| {
                post_ignition
                    .composition
                    .molar_abundance_of(*s)
                    .max(ABUNDANCE_FLOOR)
            })
            .collect();

        let partition = self.partition_species(&y, t9, rho);

        let y_qse = if partition.qse_indices.is_empty() {
            DVector::from_element(0, 0.0)
        } else {
            self.steady_state_abundances(&y, t9, rho, &partition)?
        };

        let mut y_dynamic = DVector::from_element(partition.dynamic_indices.len() + 1, 0.0);
        for (row, &index) in partition.dynamic_indices.iter().enumerate() {
            y_dynamic[row] = y[index];
        }
        y_dynamic[partition.dynamic_indices.len()] = 0.0;

        let view = &mut *self.view;
        let dynamic_indices = partition.dynamic_indices.clone();
        let qse_indices = partition.qse_indices.clone();
        let y_qse_for_closure = y_qse.clone();
        let num_species = species.len();

        let result = dopri5::integrate(
            |_t, y_dyn| {
                let mut full = vec![0.0; num_species];
                for (row, &index) in dynamic_indices.iter().enumerate() {
                    full[index] = y_dyn[row];
                }
                for (row, &index) in qse_indices.iter().enumerate() {
                    full[index] = y_qse_for_closure[row];
                }
                let derivatives = view.calculate_rhs_and_energy(&full, t9, rho);
                let mut dydt = vec![0.0; dynamic_indices.len() + 1];
                for (row, &index) in dynamic_indices.iter().enumerate() {
                    dydt[row] = derivatives.dydt[index];
                }
                dydt[dynamic_indices.len()] = derivatives.nuclear_energy_generation_rate;
                dydt
            },
            &y_dynamic.as_slice().to_vec(),
            0.0,
            net_in.t_max,
            net_in.dt0,
            dopri5::Tolerances {
                abs_tol: 1e-8,
                rel_tol: 1e-8,
            },
        )?;

        for (row, &index) in partition.dynamic_indices.iter().enumerate() {
            y[index] = result.y[row];
        }
        for (row, &index) in partition.qse_indices.iter().enumerate() {
            y[index] = y_qse[row];
        }
        let final_energy_rate = result.y[partition.dynamic_indices.len()];

        let mut mass_fractions: Vec<f64> = species.iter().zip(&y).map(|(s, &yi)| yi * s.a as f64).collect();
        let sum: f64 = mass_fractions.iter().sum();
        if sum > 0.0 {
            for x in &mut mass_fractions {
                *x /= sum;
            }
        }

        let composition = Composition::from_mass_fractions(species.iter().copied().zip(mass_fractions));

        Ok(NetOut {
            composition,
            num_steps: result.steps,
            energy: final_energy_rate,
        })
    }

    /// Partitions the network's species into those evolved dynamically and
    /// those collapsed onto an algebraic steady state. A species is QSE if
    /// its combined network/decay timescale is non-finite, it has fallen
    /// below the abundance floor, or that timescale is at or below the
    /// cutoff.
    ///
    /// `tau_final = min(tau_network, tau_decay)` with `tau_decay =
    /// half_life / ln(2)`, looked up from the process-wide
    /// [`crate::species::HalfLifeTable`]; an unregistered species is
    /// treated as stable (`tau_decay = +inf`), leaving `tau_network` as the
    /// sole criterion exactly as it was before decay data was registered.
    fn partition_species(&self, y: &[f64], t9: f64, rho: f64) -> SpeciesPartition {
        let timescales: HashMap<Species, f64> = self.view.species_timescales(y, t9, rho);
        let half_life_table = crate::species::HalfLifeTable::get().read().unwrap();
        let mut dynamic_indices = Vec::new();
        let mut qse_indices = Vec::new();

        for (i, species) in self.view.network_species().iter().enumerate() {
            let tau_network = timescales.get(species).copied().unwrap_or(f64::INFINITY);
            let tau_decay = half_life_table.lookup(*species) / std::f64::consts::LN_2;
            let tau_final = tau_network.min(tau_decay);
            let abundance = y[i];
            if !tau_final.is_finite() || abundance < ABUNDANCE_CUTOFF || tau_final <= TIMESCALE_CUTOFF {
                qse_indices.push(i);
            } else {
                dynamic_indices.push(i);
            }
        }

        SpeciesPartition {
            dynamic_indices,
            qse_indices,
        }
    }

    /// Solves `dY/dt = 0` for the QSE species in log-abundance space,
    /// holding the dynamic species fixed at `y`.
    fn steady_state_abundances(
        &mut self,
        y: &[f64],
        t9: f64,
        rho: f64,
        partition: &SpeciesPartition,
    ) -> Result<DVector<f64>> {
        let num_species = y.len();
        let v0 = DVector::from_iterator(
            partition.qse_indices.len(),
            partition
                .qse_indices
                .iter()
                .map(|&i| y[i].max(1e-99).ln()),
        );

        // As in `DirectNetworkSolver::evaluate`, the residual and Jacobian
        // closures need concurrent read/write access to the same view.
        let view = RefCell::new(&mut *self.view);
        let dynamic = partition.dynamic_indices.clone();
        let qse = partition.qse_indices.clone();
        let y_fixed = y.to_vec();

        let build_full = |v_qse: &DVector<f64>| -> Vec<f64> {
            let mut full = vec![0.0; num_species];
            for &index in &dynamic {
                full[index] = y_fixed[index];
            }
            for (row, &index) in qse.iter().enumerate() {
                full[index] = v_qse[row].exp();
            }
            full
        };

        let result = lm::solve_log_space(
            |v| {
                let full_y = build_full(v);
                let derivatives = view.borrow().calculate_rhs_and_energy(&full_y, t9, rho);
                DVector::from_iterator(qse.len(), qse.iter().map(|&index| derivatives.dydt[index]))
            },
            |v| {
                let full_y = build_full(v);
                let mut view = view.borrow_mut();
                view.generate_jacobian(&full_y, t9, rho);
                let mut jac = DMatrix::<f64>::zeros(qse.len(), qse.len());
                for (row, &i) in qse.iter().enumerate() {
                    for (col, &j) in qse.iter().enumerate() {
                        jac[(row, col)] = view.jacobian_entry(i, j);
                    }
                }
                jac
            },
            &v0,
            LmOptions::default(),
        )?;

        Ok(result.map(f64::exp))
    }

    /// Runs a short, high-temperature stiff integration with screening
    /// forced to [`ScreeningType::Bare`] to bring trace species up from
    /// zero before the QSE partition is computed, matching
    /// `initializeNetworkWithShortIgnition`.
    fn ignite(&mut self, net_in: &NetIn) -> Result<NetOut> {
        let cfg = Config::global();
        let pre_ignition = NetIn {
            composition: net_in.composition.clone(),
            t_max: cfg.qse_ignition_t_max,
            dt0: cfg.qse_ignition_dt0,
            temperature: cfg.qse_ignition_temperature,
            density: cfg.qse_ignition_density,
            energy: net_in.energy,
            culling_threshold: net_in.culling_threshold,
        };

        let previous_screening = self.view.screening_model();
        self.view.set_screening_model(ScreeningType::Bare);
        let mut ignition_solver = DirectNetworkSolver::new(self.view);
        let result = ignition_solver.evaluate(&pre_ignition);
        self.view.set_screening_model(previous_screening);
        result
    }

    /// Decides whether the active view needs rebuilding before this
    /// evaluation: on first use, or when temperature, density, or hydrogen
    /// mass fraction have moved past their configured relative thresholds.
    fn should_update_view(&self, net_in: &NetIn) -> bool {
        let last = match &self.last_seen {
            None => return true,
            Some(last) => last,
        };

        let cfg = Config::global();

        let temp_change = (net_in.temperature - last.temperature).abs() / last.temperature;
        if temp_change > cfg.policy_temp_threshold {
            return true;
        }

        let rho_change = (net_in.density - last.density).abs() / last.density;
        if rho_change > cfg.policy_rho_threshold {
            return true;
        }

        let h1_new = net_in.composition.mass_fraction_of(Species::new(1, 1));
        if last.h1_mass_fraction > 1e-12 {
            let fuel_change = (h1_new - last.h1_mass_fraction).abs() / last.h1_mass_fraction;
            if fuel_change > cfg.policy_fuel_threshold {
                return true;
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GraphEngine;
    use crate::reaction::rate::RateCoefficients;
    use crate::reaction::{LogicalReactionSet, Reaction};
    use crate::species::HalfLifeTable;
    use crate::view::AdaptiveEngineView;

    fn pd_he3_network() -> LogicalReactionSet {
        let p = Species::new(1, 1);
        let d = Species::new(1, 2);
        let he3 = Species::new(2, 3);
        let r = Reaction::new(
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
        set.insert_or_merge(&r).unwrap();
        set
    }

    #[test]
    fn species_below_abundance_cutoff_is_qse_regardless_of_timescale() {
        let mut engine = GraphEngine::new(pd_he3_network()).unwrap();
        let mut view = AdaptiveEngineView::new(&mut engine);
        let net_in = NetIn {
            composition: Composition::from_mass_fractions([(Species::new(1, 1), 0.7), (Species::new(1, 2), 0.3)]),
            t_max: 1.0,
            dt0: 1e-6,
            temperature: 1.5e7,
            density: 100.0,
            energy: 0.0,
            culling_threshold: None,
        };
        view.update(&net_in);
        let mut solver = QSENetworkSolver::new(&mut view);

        let he3_index = solver
            .view
            .network_species()
            .iter()
            .position(|s| *s == Species::new(2, 3))
            .unwrap();
        let mut y = vec![0.0; solver.view.network_species().len()];
        y[he3_index] = 1e-20;
        let partition = solver.partition_species(&y, 0.015, 100.0);
        assert!(partition.qse_indices.contains(&he3_index));
    }

    #[test]
    fn short_half_life_forces_qse_even_with_slow_network_timescale() {
        let mut engine = GraphEngine::new(pd_he3_network()).unwrap();
        let mut view = AdaptiveEngineView::new(&mut engine);
        let net_in = NetIn {
            composition: Composition::from_mass_fractions([(Species::new(1, 1), 0.7), (Species::new(1, 2), 0.3)]),
            t_max: 1.0,
            dt0: 1e-6,
            temperature: 1.5e7,
            density: 100.0,
            energy: 0.0,
            culling_threshold: None,
        };
        view.update(&net_in);

        let d_species = Species::new(1, 2);
        HalfLifeTable::get().write().unwrap().register(d_species, 1e-10);

        let mut solver = QSENetworkSolver::new(&mut view);
        let d_index = solver
            .view
            .network_species()
            .iter()
            .position(|s| *s == d_species)
            .unwrap();
        // At these conditions d's network timescale alone is well above
        // TIMESCALE_CUTOFF; only the short registered half-life should push
        // it into the QSE set.
        let mut y = vec![0.1; solver.view.network_species().len()];
        y[d_index] = 0.5;
        let partition = solver.partition_species(&y, 1.0, 100.0);
        assert!(partition.qse_indices.contains(&d_index));

        HalfLifeTable::get().write().unwrap().register(d_species, f64::INFINITY);
    }

    #[test]
    fn should_update_view_triggers_on_first_call() {
        let mut engine = GraphEngine::new(pd_he3_network()).unwrap();
        let mut view = AdaptiveEngineView::new(&mut engine);
        view.update(&NetIn {
            composition: Composition::from_mass_fractions([(Species::new(1, 1), 1.0)]),
            t_max: 1.0,
            dt0: 1e-6,
            temperature: 1.5e7,
            density: 100.0,
            energy: 0.0,
            culling_threshold: None,
        });
        let solver = QSENetworkSolver::new(&mut view);
        let net_in = NetIn {
            composition: Composition::from_mass_fractions([(Species::new(1, 1), 1.0)]),
            t_max: 1.0,
            dt0: 1e-6,
            temperature: 1.5e7,
            density: 100.0,
            energy: 0.0,
            culling_threshold: None,
        };
        assert!(solver.should_update_view(&net_in));
    }
}
