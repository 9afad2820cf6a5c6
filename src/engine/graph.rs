//! [`GraphEngine`]: the base reaction network engine. Holds the network's
//! species and reactions, a cached stoichiometry matrix and Jacobian, and a
//! precomputed per-reaction abundance-product table. Every [`crate::view`]
//! decorator ultimately delegates its numerics here.

use std::collections::HashMap;

use tracing::{trace, warn};

use crate::ad::Tape;
use crate::constants::{ATOMIC_MASS_UNIT_GRAMS, AVOGADRO, BOLTZMANN_MEV_PER_K, SPEED_OF_LIGHT_CM_S};
use crate::error::{NetworkError, Result};
use crate::partition::{GroundStatePartitionFunction, PartitionFunction};
use crate::reaction::{LogicalReaction, LogicalReactionSet};
use crate::scalar::Scalar;
use crate::screening::{BareScreeningModel, ScreeningModel, ScreeningType};
use crate::species::Species;

use super::precomputed::{precompute_network, PrecomputedReaction};
use super::stoichiometry::SparseMatrix;
use super::{Engine, StepDerivatives, MIN_ABUNDANCE_THRESHOLD, MIN_DENSITY_THRESHOLD, MIN_JACOBIAN_THRESHOLD};

pub struct GraphEngine {
    species: Vec<Species>,
    species_index: HashMap<Species, usize>,
    reactions: LogicalReactionSet,
    reactions_ordered: Vec<LogicalReaction>,
    precomputed: Vec<PrecomputedReaction>,
    stoichiometry: SparseMatrix<i32>,
    jacobian: SparseMatrix<f64>,
    screening: Box<dyn ScreeningModel + Send + Sync>,
    screening_type: ScreeningType,
    partition: Box<dyn PartitionFunction + Send + Sync>,
    use_precomputation: bool,
}

impl GraphEngine {
    pub fn new(reactions: LogicalReactionSet) -> Result<Self> {
        Self::with_partition_function(reactions, Box::new(GroundStatePartitionFunction::default()))
    }

    pub fn with_partition_function(
        reactions: LogicalReactionSet,
        partition: Box<dyn PartitionFunction + Send + Sync>,
    ) -> Result<Self> {
        let species = collect_network_species(&reactions);
        let species_index: HashMap<Species, usize> =
            species.iter().enumerate().map(|(i, s)| (*s, i)).collect();
        let reactions_ordered: Vec<LogicalReaction> = reactions.iter().cloned().collect();

        let mut engine = Self {
            species,
            species_index,
            reactions,
            reactions_ordered,
            precomputed: Vec::new(),
            stoichiometry: SparseMatrix::new(0, 0),
            jacobian: SparseMatrix::new(0, 0),
            screening: Box::new(BareScreeningModel),
            screening_type: ScreeningType::Bare,
            partition,
            use_precomputation: true,
        };
        engine.sync_internal_state();
        Ok(engine)
    }

    fn sync_internal_state(&mut self) {
        self.generate_stoichiometry_matrix();
        self.precomputed = precompute_network(&self.reactions_ordered, &self.species_index);
        self.jacobian = SparseMatrix::new(self.species.len(), self.species.len());
    }

    pub fn set_precomputation(&mut self, enabled: bool) {
        self.use_precomputation = enabled;
    }

    pub fn is_precomputation_enabled(&self) -> bool {
        self.use_precomputation
    }

    pub fn partition_function(&self) -> &dyn PartitionFunction {
        self.partition.as_ref()
    }

    /// `k_rev = k_fwd * (sigma_r/sigma_p) * (A_r product / A_p product)^1.5
    /// * (G_r product / G_p product) * exp(-Q / (k_B T9 1e9))`, defined only
    /// for a two-reactant, two-product reaction. Any other arity is a
    /// warning and a zero rate, never a fatal error.
    pub fn calculate_reverse_rate(&self, reaction: &LogicalReaction, t9: f64) -> f64 {
        if reaction.reactants().len() != 2 || reaction.products().len() != 2 {
            warn!(
                "{}",
                NetworkError::UnsupportedReverseArity {
                    reactants: reaction.reactants().len(),
                    products: reaction.products().len(),
                }
            );
            return 0.0;
        }

        let forward_rate = reaction.rate(t9);
        let exp_factor = (-reaction.q_value_mev() / (BOLTZMANN_MEV_PER_K * t9 * 1e9)).exp();

        let symmetry_factor = reaction.product_symmetry_factor() / reaction.reactant_symmetry_factor();

        let mass_numerator: f64 = reaction.reactants().iter().map(|s| s.a as f64).product();
        let mass_denominator: f64 = reaction.products().iter().map(|s| s.a as f64).product();

        let pf_numerator: f64 = reaction
            .reactants()
            .iter()
            .map(|s| self.partition.evaluate(s.z, s.a, t9))
            .product();
        let pf_denominator: f64 = reaction
            .products()
            .iter()
            .map(|s| self.partition.evaluate(s.z, s.a, t9))
            .product();

        let ct = (mass_numerator / mass_denominator).powf(1.5) * (pf_numerator / pf_denominator);
        forward_rate * symmetry_factor * ct * exp_factor
    }

    /// `d(k_rev)/dT9` for a two-body reverse rate, via the analytic forward
    /// log-derivative and the partition functions' log-derivatives.
    pub fn calculate_reverse_rate_derivative(&self, reaction: &LogicalReaction, t9: f64, reverse_rate: f64) -> f64 {
        if reaction.reactants().len() != 2 || reaction.products().len() != 2 {
            return 0.0;
        }
        let d_log_k_fwd = reaction.forward_log_derivative(t9);

        let log_deriv_pf_sum = |species: &[Species]| -> f64 {
            species
                .iter()
                .map(|s| {
                    let g = self.partition.evaluate(s.z, s.a, t9);
                    let dg = self.partition.evaluate_derivative(s.z, s.a, t9);
                    if g == 0.0 {
                        0.0
                    } else {
                        dg / g
                    }
                })
                .sum()
        };

        let d_log_c = log_deriv_pf_sum(reaction.reactants()) - log_deriv_pf_sum(reaction.products());
        let d_log_exp = reaction.q_value_mev() / (BOLTZMANN_MEV_PER_K * t9 * t9);
        reverse_rate * (d_log_k_fwd + d_log_c + d_log_exp)
    }

    fn calculate_with_precomputation(&self, y: &[f64], t9: f64, rho: f64) -> StepDerivatives<f64> {
        let molar_flows = self.reaction_flows_with_precomputation(y, t9, rho);
        self.assemble(&molar_flows, rho)
    }

    /// `reaction_flows` restricted to the precomputed fast path; shared by
    /// [`GraphEngine::calculate_with_precomputation`] and the public
    /// `Engine::reaction_flows` method so both see the same numbers.
    fn reaction_flows_with_precomputation(&self, y: &[f64], t9: f64, rho: f64) -> Vec<f64> {
        if rho < MIN_DENSITY_THRESHOLD {
            return vec![0.0; self.precomputed.len()];
        }
        let bare_rates: Vec<f64> = self.reactions_ordered.iter().map(|r| r.rate(t9)).collect();
        let screening_factors = self
            .screening
            .factors_f64(&self.reactions, &self.species, y, t9, rho);

        let mut molar_flows = Vec::with_capacity(self.precomputed.len());
        for precomp in &self.precomputed {
            let mut abundance_product = 1.0;
            let mut below_threshold = false;
            for (&index, &power) in precomp
                .unique_reactant_indices
                .iter()
                .zip(precomp.reactant_powers.iter())
            {
                let abundance = y[index];
                if abundance < MIN_ABUNDANCE_THRESHOLD {
                    below_threshold = true;
                    break;
                }
                abundance_product *= abundance.powi(power as i32);
            }
            if below_threshold {
                molar_flows.push(0.0);
                continue;
            }

            let num_reactants: i32 = precomp.reactant_powers.iter().sum::<u32>() as i32;
            let flow = screening_factors[precomp.reaction_index]
                * bare_rates[precomp.reaction_index]
                * precomp.symmetry_factor
                * abundance_product
                * rho.powi(num_reactants);
            molar_flows.push(flow);
        }
        molar_flows
    }

    fn assemble(&self, molar_flows: &[f64], rho: f64) -> StepDerivatives<f64> {
        let mut dydt = vec![0.0; self.species.len()];
        for (j, precomp) in self.precomputed.iter().enumerate() {
            let flow = molar_flows[j];
            for (&species_index, &coeff) in precomp
                .affected_species_indices
                .iter()
                .zip(precomp.stoichiometric_coefficients.iter())
            {
                dydt[species_index] += coeff as f64 * flow / rho;
            }
        }

        let mut mass_production_rate = 0.0;
        for (i, species) in self.species.iter().enumerate() {
            mass_production_rate += dydt[i] * species.approx_mass_u() * ATOMIC_MASS_UNIT_GRAMS;
        }
        let nuclear_energy_generation_rate =
            -mass_production_rate * AVOGADRO * SPEED_OF_LIGHT_CM_S * SPEED_OF_LIGHT_CM_S;

        StepDerivatives {
            dydt,
            nuclear_energy_generation_rate,
        }
    }

    /// The fully generic RHS, used for AD-tape recording: every threshold
    /// is applied as a branch-free `select_lt` flag rather than an `if`, so
    /// the same formula works whether `S` is `f64` or a tape [`crate::ad::Var`].
    fn calculate_generic<S: Scalar>(&self, y: &[S], t9: S, rho: S, screening_factors: &[S]) -> StepDerivatives<S> {
        let zero = rho.constant(0.0);
        let one = rho.constant(1.0);
        let rho_threshold = rho.constant(MIN_DENSITY_THRESHOLD);
        let density_flag = rho.select_lt(rho_threshold, zero, one);

        let y_clamped: Vec<S> = y.iter().map(|&yi| yi.select_lt(zero, zero, yi)).collect();

        let mut dydt = vec![zero; self.species.len()];
        for (reaction_index, reaction) in self.reactions_ordered.iter().enumerate() {
            let flow = screening_factors[reaction_index]
                * molar_reaction_flow_generic(reaction, &y_clamped, t9, rho, &self.species_index);
            let precomp = &self.precomputed[reaction_index];
            for (&species_index, &coeff) in precomp
                .affected_species_indices
                .iter()
                .zip(precomp.stoichiometric_coefficients.iter())
            {
                dydt[species_index] += density_flag * rho.constant(coeff as f64) * flow / rho;
            }
        }

        let mut mass_production_rate = zero;
        for (i, species) in self.species.iter().enumerate() {
            mass_production_rate +=
                dydt[i] * rho.constant(species.approx_mass_u()) * rho.constant(ATOMIC_MASS_UNIT_GRAMS);
        }
        let nuclear_energy_generation_rate =
            -(mass_production_rate * rho.constant(AVOGADRO) * rho.constant(SPEED_OF_LIGHT_CM_S) * rho.constant(SPEED_OF_LIGHT_CM_S));

        StepDerivatives {
            dydt,
            nuclear_energy_generation_rate,
        }
    }
}

impl Engine for GraphEngine {
    fn network_species(&self) -> &[Species] {
        &self.species
    }

    fn network_reactions(&self) -> &LogicalReactionSet {
        &self.reactions
    }

    fn calculate_rhs_and_energy(&self, y: &[f64], t9: f64, rho: f64) -> StepDerivatives<f64> {
        if self.use_precomputation {
            self.calculate_with_precomputation(y, t9, rho)
        } else {
            let screening_factors = self
                .screening
                .factors_f64(&self.reactions, &self.species, y, t9, rho);
            self.calculate_generic(y, t9, rho, &screening_factors)
        }
    }

    fn reaction_flows(&self, y: &[f64], t9: f64, rho: f64) -> Vec<f64> {
        self.reaction_flows_with_precomputation(y, t9, rho)
    }

    fn generate_jacobian(&mut self, y: &[f64], t9: f64, rho: f64) {
        trace!(species = self.species.len(), "generating jacobian");
        let n = self.species.len();
        let tape = Tape::new();
        let y_vars: Vec<_> = y.iter().map(|&yi| tape.var(yi)).collect();
        let t9_var = tape.var(t9);
        let rho_var = tape.var(rho);

        let screening_factors = self
            .screening
            .factors_ad(&self.reactions, &self.species, &y_vars, t9_var, rho_var);
        let derivatives = self.calculate_generic(&y_vars, t9_var, rho_var, &screening_factors);

        let mut jacobian = SparseMatrix::new(n, n);
        for (i, dydt_i) in derivatives.dydt.iter().enumerate() {
            let adjoint = tape.backward(dydt_i);
            for (k, y_var) in y_vars.iter().enumerate() {
                let value = adjoint[y_var.index()];
                if value.abs() > MIN_JACOBIAN_THRESHOLD {
                    jacobian.set(i, k, value);
                }
            }
        }
        self.jacobian = jacobian;
    }

    fn jacobian_entry(&self, i: usize, j: usize) -> f64 {
        self.jacobian.get(i, j)
    }

    fn generate_stoichiometry_matrix(&mut self) {
        let mut matrix = SparseMatrix::new(self.species.len(), self.reactions_ordered.len());
        for (reaction_index, reaction) in self.reactions_ordered.iter().enumerate() {
            let mut net: HashMap<Species, i32> = HashMap::new();
            for r in reaction.reactants() {
                *net.entry(*r).or_insert(0) -= 1;
            }
            for p in reaction.products() {
                *net.entry(*p).or_insert(0) += 1;
            }
            for (species, coeff) in net {
                let row = self.species_index[&species];
                matrix.set(row, reaction_index, coeff);
            }
        }
        trace!(nnz = matrix.nnz(), "stoichiometry matrix generated");
        self.stoichiometry = matrix;
    }

    fn stoichiometry_entry(&self, species_index: usize, reaction_index: usize) -> i32 {
        self.stoichiometry.get(species_index, reaction_index)
    }

    fn species_timescales(&self, y: &[f64], t9: f64, rho: f64) -> HashMap<Species, f64> {
        let derivatives = self.calculate_rhs_and_energy(y, t9, rho);
        self.species
            .iter()
            .enumerate()
            .map(|(i, &species)| {
                let timescale = if derivatives.dydt[i].abs() > 0.0 {
                    (y[i] / derivatives.dydt[i]).abs()
                } else {
                    f64::INFINITY
                };
                (species, timescale)
            })
            .collect()
    }

    fn screening_model(&self) -> ScreeningType {
        self.screening_type
    }

    fn set_screening_model(&mut self, screening: ScreeningType) {
        self.screening = screening.build();
        self.screening_type = screening;
    }
}

fn collect_network_species(reactions: &LogicalReactionSet) -> Vec<Species> {
    let mut unique: HashMap<String, Species> = HashMap::new();
    for reaction in reactions.iter() {
        for s in reaction.reactants().iter().chain(reaction.products()) {
            unique.insert(s.name(), *s);
        }
    }
    let mut names: Vec<String> = unique.keys().cloned().collect();
    names.sort_unstable();
    names.into_iter().map(|name| unique[&name]).collect()
}

fn molar_reaction_flow_generic<S: Scalar>(
    reaction: &LogicalReaction,
    y: &[S],
    t9: S,
    rho: S,
    species_index: &HashMap<Species, usize>,
) -> S {
    let zero = t9.constant(0.0);
    let one = t9.constant(1.0);
    let y_threshold = t9.constant(MIN_ABUNDANCE_THRESHOLD);

    let k = reaction.rate(t9);

    let mut reactant_counts: HashMap<Species, u32> = HashMap::new();
    for r in reaction.reactants() {
        *reactant_counts.entry(*r).or_insert(0) += 1;
    }

    let mut threshold_flag = one;
    let mut molar_concentration_product = one;
    for (species, count) in reactant_counts {
        let index = species_index[&species];
        let yi = y[index];
        threshold_flag = threshold_flag * yi.select_lt(y_threshold, zero, one);

        let molar_concentration = yi * rho;
        let mut term = molar_concentration.powf(count as f64);
        if count > 1 {
            term = term / t9.constant(factorial(count));
        }
        molar_concentration_product = molar_concentration_product * term;
    }

    molar_concentration_product * k * threshold_flag
}

fn factorial(n: u32) -> f64 {
    (1..=n).fold(1.0, |acc, k| acc * k as f64)
}
