//! Flow-based reaction culling: tracks only the reactions (and the species
//! they touch) whose molar flow materially affects the network's evolution
//! at the current thermodynamic state.

use std::collections::HashMap;
use std::collections::HashSet;

use tracing::{debug, trace};

use crate::config::Config;
use crate::engine::{Engine, StepDerivatives};
use crate::error::Result;
use crate::reaction::{LogicalReaction, LogicalReactionSet};
use crate::screening::ScreeningType;
use crate::solver::{NetIn, UpdatableEngine};
use crate::species::Species;

use super::{gather, panic_if_stale, reaction_index_map, scatter, species_index_map};

/// Species whose mass fraction sits above this floor at the start of an
/// `update` are treated as part of the initial fuel for the reachability
/// pass, regardless of how the reaction network otherwise evolves them.
const ABUNDANCE_FLOOR: f64 = 1e-12;

/// A reaction is kept for connectivity purposes despite a (numerically)
/// zero flow only if its flow is smaller than this.
const ZERO_FLOW_FLOOR: f64 = 1e-99;

/// An [`Engine`] decorator that restricts a base engine's full species and
/// reaction set down to the subset whose molar flow is non-negligible at
/// the last thermodynamic state passed to [`AdaptiveEngineView::update`].
///
/// The base engine is always evaluated over its full, zero-padded species
/// vector: culling only reduces what a solver built on top of this view
/// perceives, not the per-call cost paid inside the base engine.
///
/// Every accessor other than [`AdaptiveEngineView::update`] panics if the
/// view is stale, which it is immediately after construction until the
/// first `update` call.
pub struct AdaptiveEngineView<'e, E: Engine> {
    base: &'e mut E,
    active_species: Vec<Species>,
    active_reactions: LogicalReactionSet,
    species_map: Vec<usize>,
    reaction_map: Vec<usize>,
    stale: bool,
}

impl<'e, E: Engine> AdaptiveEngineView<'e, E> {
    /// Seeds the active set to the base engine's full network. The view is
    /// stale until the first [`AdaptiveEngineView::update`] call, matching
    /// the original engine's `m_isStale = true` default even though the
    /// active sets already mirror the base network at construction.
    pub fn new(base: &'e mut E) -> Self {
        let active_species = base.network_species().to_vec();
        let active_reactions = base.network_reactions().clone();
        let species_map = species_index_map(base.network_species(), &active_species);
        let reaction_map = reaction_index_map(base.network_reactions(), &active_reactions);
        Self {
            base,
            active_species,
            active_reactions,
            species_map,
            reaction_map,
            stale: true,
        }
    }

    /// Re-derives the active species and reaction set from the current
    /// thermodynamic state.
    ///
    /// 1. Builds the full-length abundance vector from `net_in.composition`
    ///    and computes every reaction's molar flow via the base engine.
    /// 2. Finds every species reachable from the initial fuel (mass
    ///    fraction above [`ABUNDANCE_FLOOR`]) by following reactions whose
    ///    reactants are all already reachable.
    /// 3. Culls reactions whose flow is below `relative_threshold *
    ///    max_flow`, except a reaction is kept anyway if its flow is
    ///    numerically zero but a reachable reactant's abundance is also
    ///    numerically zero (the reaction may ignite as that reactant is
    ///    produced by the rest of the network).
    /// 4. Rebuilds the active species list from the surviving reactions'
    ///    reactants and products, sorted by mass, and reconstructs both
    ///    index maps.
    pub fn update(&mut self, net_in: &NetIn) {
        trace!("updating adaptive engine view");

        let full_species = self.base.network_species().to_vec();
        let y_full: Vec<f64> = full_species
            .iter()
            .map(|&s| net_in.composition.molar_abundance_of(s))
            .collect();

        let t9 = net_in.t9();
        let rho = net_in.density;
        let flows = self.base.reaction_flows(&y_full, t9, rho);
        let max_flow = flows.iter().cloned().fold(0.0_f64, f64::max);
        debug!(max_flow, "maximum reaction flow rate in adaptive engine view");

        let reachable = find_reachable_species(net_in, &full_species, self.base.network_reactions());
        debug!(count = reachable.len(), "reachable species in adaptive engine view");

        let relative_threshold = net_in
            .culling_threshold
            .unwrap_or(Config::global().adaptive_relative_culling_threshold);
        let final_reactions = cull_reactions_by_flow(
            self.base.network_reactions(),
            &flows,
            &reachable,
            &full_species,
            &y_full,
            max_flow,
            relative_threshold,
        );

        self.finalize_active_set(final_reactions);

        self.species_map = species_index_map(self.base.network_species(), &self.active_species);
        self.reaction_map = reaction_index_map(self.base.network_reactions(), &self.active_reactions);
        self.stale = false;

        debug!(
            species = self.active_species.len(),
            reactions = self.active_reactions.len(),
            "adaptive engine view updated"
        );
    }

    fn finalize_active_set(&mut self, final_reactions: Vec<LogicalReaction>) {
        let mut species_set: HashSet<Species> = HashSet::new();
        for reaction in &final_reactions {
            species_set.extend(reaction.reactants().iter().copied());
            species_set.extend(reaction.products().iter().copied());
        }
        let mut active_species: Vec<Species> = species_set.into_iter().collect();
        active_species.sort_by(|a, b| a.approx_mass_u().partial_cmp(&b.approx_mass_u()).unwrap());

        self.active_reactions = LogicalReactionSet::from_logical_reactions(final_reactions);
        self.active_species = active_species;
    }

    fn map_culled_to_full(&self, culled: &[f64]) -> Vec<f64> {
        scatter(culled, &self.species_map, self.base.network_species().len())
    }

    fn map_full_to_culled(&self, full: &[f64]) -> Vec<f64> {
        gather(full, &self.species_map)
    }
}

fn find_reachable_species(
    net_in: &NetIn,
    full_species: &[Species],
    full_reactions: &LogicalReactionSet,
) -> HashSet<Species> {
    let mut reachable: HashSet<Species> = full_species
        .iter()
        .filter(|&&s| net_in.composition.mass_fraction_of(s) > ABUNDANCE_FLOOR)
        .copied()
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        for reaction in full_reactions.iter() {
            if reaction.reactants().iter().all(|r| reachable.contains(r)) {
                for &product in reaction.products() {
                    if reachable.insert(product) {
                        changed = true;
                    }
                }
            }
        }
    }
    reachable
}

#[allow(clippy::too_many_arguments)]
fn cull_reactions_by_flow(
    full_reactions: &LogicalReactionSet,
    flows: &[f64],
    reachable: &HashSet<Species>,
    full_species: &[Species],
    y_full: &[f64],
    max_flow: f64,
    relative_threshold: f64,
) -> Vec<LogicalReaction> {
    let absolute_threshold = relative_threshold * max_flow;
    let mut kept = Vec::new();
    for (reaction, &flow) in full_reactions.iter().zip(flows.iter()) {
        let mut keep = flow > absolute_threshold;
        if !keep && flow < ZERO_FLOW_FLOOR {
            keep = reaction.reactants().iter().any(|reactant| {
                full_species
                    .iter()
                    .position(|s| s == reactant)
                    .map(|i| y_full[i] < ZERO_FLOW_FLOOR && reachable.contains(reactant))
                    .unwrap_or(false)
            });
        }
        if keep {
            kept.push(reaction.clone());
        }
    }
    kept
}

impl<'e, E: Engine> UpdatableEngine for AdaptiveEngineView<'e, E> {
    fn update(&mut self, net_in: &NetIn) -> Result<()> {
        self.update(net_in);
        Ok(())
    }
}

impl<'e, E: Engine> Engine for AdaptiveEngineView<'e, E> {
    fn network_species(&self) -> &[Species] {
        &self.active_species
    }

    fn network_reactions(&self) -> &LogicalReactionSet {
        &self.active_reactions
    }

    fn calculate_rhs_and_energy(&self, y: &[f64], t9: f64, rho: f64) -> StepDerivatives<f64> {
        panic_if_stale(self.stale, "calculate_rhs_and_energy");
        let y_full = self.map_culled_to_full(y);
        let result = self.base.calculate_rhs_and_energy(&y_full, t9, rho);
        StepDerivatives {
            dydt: self.map_full_to_culled(&result.dydt),
            nuclear_energy_generation_rate: result.nuclear_energy_generation_rate,
        }
    }

    fn reaction_flows(&self, y: &[f64], t9: f64, rho: f64) -> Vec<f64> {
        panic_if_stale(self.stale, "reaction_flows");
        let y_full = self.map_culled_to_full(y);
        let full_flows = self.base.reaction_flows(&y_full, t9, rho);
        self.reaction_map.iter().map(|&i| full_flows[i]).collect()
    }

    fn generate_jacobian(&mut self, y: &[f64], t9: f64, rho: f64) {
        panic_if_stale(self.stale, "generate_jacobian");
        let y_full = self.map_culled_to_full(y);
        self.base.generate_jacobian(&y_full, t9, rho);
    }

    fn jacobian_entry(&self, i: usize, j: usize) -> f64 {
        panic_if_stale(self.stale, "jacobian_entry");
        self.base.jacobian_entry(self.species_map[i], self.species_map[j])
    }

    fn generate_stoichiometry_matrix(&mut self) {
        panic_if_stale(self.stale, "generate_stoichiometry_matrix");
        self.base.generate_stoichiometry_matrix();
    }

    fn stoichiometry_entry(&self, species_index: usize, reaction_index: usize) -> i32 {
        panic_if_stale(self.stale, "stoichiometry_entry");
        self.base
            .stoichiometry_entry(self.species_map[species_index], self.reaction_map[reaction_index])
    }

    fn species_timescales(&self, y: &[f64], t9: f64, rho: f64) -> HashMap<Species, f64> {
        panic_if_stale(self.stale, "species_timescales");
        let y_full = self.map_culled_to_full(y);
        let full = self.base.species_timescales(&y_full, t9, rho);
        self.active_species
            .iter()
            .filter_map(|&s| full.get(&s).map(|&t| (s, t)))
            .collect()
    }

    fn screening_model(&self) -> ScreeningType {
        self.base.screening_model()
    }

    fn set_screening_model(&mut self, screening: ScreeningType) {
        self.base.set_screening_model(screening);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GraphEngine;
    use crate::reaction::rate::RateCoefficients;
    use crate::reaction::reaction::Reaction;

    fn three_species_network() -> LogicalReactionSet {
        let p = Species::new(1, 1);
        let d = Species::new(1, 2);
        let he3 = Species::new(2, 3);
        let mut set = LogicalReactionSet::new();
        set.insert_or_merge(
            &Reaction::new(
                "p(p,g)d",
                2,
                vec![p, p],
                vec![d],
                1.44,
                "reaclib",
                RateCoefficients::new([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
                false,
            )
            .unwrap(),
        )
        .unwrap();
        set.insert_or_merge(
            &Reaction::new(
                "d(p,g)he3",
                2,
                vec![p, d],
                vec![he3],
                5.49,
                "reaclib",
                RateCoefficients::new([-60.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
                false,
            )
            .unwrap(),
        )
        .unwrap();
        set
    }

    #[test]
    fn update_seeds_stale_true_until_called() {
        let mut engine = GraphEngine::new(three_species_network()).unwrap();
        let view = AdaptiveEngineView::new(&mut engine);
        assert_eq!(view.active_species.len(), view.base.network_species().len());
        assert!(view.stale);
    }

    #[test]
    fn reachable_species_follow_fuel_through_reactions() {
        let engine = GraphEngine::new(three_species_network()).unwrap();
        let p = Species::new(1, 1);
        let d = Species::new(1, 2);
        let he3 = Species::new(2, 3);
        let net_in = NetIn {
            composition: crate::composition::Composition::from_mass_fractions([(p, 1.0)]),
            t_max: 1.0,
            dt0: 1e-6,
            temperature: 1.5e7,
            density: 100.0,
            energy: 0.0,
            culling_threshold: None,
        };
        let reachable = find_reachable_species(&net_in, engine.network_species(), engine.network_reactions());
        assert!(reachable.contains(&p));
        assert!(reachable.contains(&d));
        assert!(reachable.contains(&he3));
    }
}
