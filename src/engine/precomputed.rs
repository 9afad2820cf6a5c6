//! Constant-per-network data cached once so that every subsequent RHS
//! evaluation can skip re-deriving it: which species each reaction's
//! abundance product runs over (with multiplicity folded into an integer
//! power and a symmetry factor), and which species its net stoichiometry
//! touches.

use std::collections::HashMap;

use crate::reaction::LogicalReaction;
use crate::species::Species;

#[derive(Debug, Clone, Default)]
pub struct PrecomputedReaction {
    pub reaction_index: usize,
    /// `(species index, power)` for each distinct reactant species; a
    /// reactant appearing twice (e.g. `a+a`) collapses to one entry with
    /// power 2 rather than two entries with power 1.
    pub unique_reactant_indices: Vec<usize>,
    pub reactant_powers: Vec<u32>,
    /// `1 / prod(power!)`, folding the reactant multiplicities into the
    /// abundance-product accumulation.
    pub symmetry_factor: f64,
    /// `(species index, net coefficient)` pairs: products minus reactants,
    /// one entry per species the reaction actually touches.
    pub affected_species_indices: Vec<usize>,
    pub stoichiometric_coefficients: Vec<i32>,
}

fn net_stoichiometry(reaction: &LogicalReaction) -> HashMap<Species, i32> {
    let mut net: HashMap<Species, i32> = HashMap::new();
    for r in reaction.reactants() {
        *net.entry(*r).or_insert(0) -= 1;
    }
    for p in reaction.products() {
        *net.entry(*p).or_insert(0) += 1;
    }
    net
}

pub fn precompute_network(
    reactions: &[LogicalReaction],
    species_index: &HashMap<Species, usize>,
) -> Vec<PrecomputedReaction> {
    reactions
        .iter()
        .enumerate()
        .map(|(reaction_index, reaction)| {
            let mut reactant_counts: HashMap<usize, u32> = HashMap::new();
            for reactant in reaction.reactants() {
                let idx = species_index[reactant];
                *reactant_counts.entry(idx).or_insert(0) += 1;
            }

            let mut unique_reactant_indices = Vec::with_capacity(reactant_counts.len());
            let mut reactant_powers = Vec::with_capacity(reactant_counts.len());
            let mut symmetry_factor = 1.0;
            for (&index, &count) in reactant_counts.iter() {
                unique_reactant_indices.push(index);
                reactant_powers.push(count);
                symmetry_factor /= factorial(count);
            }

            let net = net_stoichiometry(reaction);
            let mut affected_species_indices = Vec::with_capacity(net.len());
            let mut stoichiometric_coefficients = Vec::with_capacity(net.len());
            for (species, coeff) in net {
                affected_species_indices.push(species_index[&species]);
                stoichiometric_coefficients.push(coeff);
            }

            PrecomputedReaction {
                reaction_index,
                unique_reactant_indices,
                reactant_powers,
                symmetry_factor,
                affected_species_indices,
                stoichiometric_coefficients,
            }
        })
        .collect()
}

fn factorial(n: u32) -> f64 {
    (1..=n).fold(1.0, |acc, k| acc * k as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reaction::rate::RateCoefficients;
    use crate::reaction::Reaction;

    #[test]
    fn triple_alpha_collapses_to_single_entry_with_power_three() {
        let he4 = Species::new(2, 4);
        let c12 = Species::new(6, 12);
        let reaction = Reaction::new(
            "he4(aa,g)c12",
            3,
            vec![he4, he4, he4],
            vec![c12],
            7.275,
            "nacre",
            RateCoefficients::new([0.0; 7]),
            false,
        )
        .unwrap();
        let logical = LogicalReaction::new(&reaction);

        let mut species_index = HashMap::new();
        species_index.insert(he4, 0);
        species_index.insert(c12, 1);

        let precomp = precompute_network(std::slice::from_ref(&logical), &species_index);
        assert_eq!(precomp[0].unique_reactant_indices, vec![0]);
        assert_eq!(precomp[0].reactant_powers, vec![3]);
        assert!((precomp[0].symmetry_factor - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn net_stoichiometry_skips_untouched_species() {
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
            RateCoefficients::new([0.0; 7]),
            false,
        )
        .unwrap();
        let logical = LogicalReaction::new(&reaction);

        let mut species_index = HashMap::new();
        species_index.insert(p, 0);
        species_index.insert(d, 1);
        species_index.insert(he3, 2);

        let precomp = precompute_network(std::slice::from_ref(&logical), &species_index);
        let mut pairs: Vec<(usize, i32)> = precomp[0]
            .affected_species_indices
            .iter()
            .copied()
            .zip(precomp[0].stoichiometric_coefficients.iter().copied())
            .collect();
        pairs.sort_unstable();
        assert_eq!(pairs, vec![(0, -1), (1, -1), (2, 1)]);
    }
}
