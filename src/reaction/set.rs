//! Order-irrelevant collections of reactions, keyed by id.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::reaction::reaction::{LogicalReaction, Reaction};

/// An order-irrelevant collection of [`Reaction`]s keyed by id. Hashing is
/// order-invariant: the hash of the sorted vector of per-reaction hashes.
///
/// Storage is insertion-ordered (`Vec` plus an id index) rather than a bare
/// `HashMap`, so downstream consumers that need a stable index per reaction
/// (the graph engine's stoichiometry columns) can rely on `iter()` always
/// walking the same sequence for the lifetime of a given set.
#[derive(Debug, Clone, Default)]
pub struct ReactionSet {
    entries: Vec<Reaction>,
    index: HashMap<String, usize>,
}

impl ReactionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, reaction: Reaction) {
        let id = reaction.id().to_string();
        if let Some(&pos) = self.index.get(&id) {
            self.entries[pos] = reaction;
        } else {
            self.index.insert(id, self.entries.len());
            self.entries.push(reaction);
        }
    }

    pub fn get(&self, id: &str) -> Option<&Reaction> {
        self.index.get(id).map(|&pos| &self.entries[pos])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reaction> {
        self.entries.iter()
    }

    /// Order-invariant hash: the hash of the sorted vector of
    /// per-reaction hashes.
    pub fn order_invariant_hash(&self) -> u64 {
        order_invariant_hash(self.entries.iter().map(hash_reaction))
    }
}

fn hash_reaction(reaction: &Reaction) -> u64 {
    let mut hasher = DefaultHasher::new();
    reaction.id().hash(&mut hasher);
    reaction.pe_name().hash(&mut hasher);
    reaction.chapter().hash(&mut hasher);
    for s in reaction.reactants() {
        s.hash(&mut hasher);
    }
    for s in reaction.products() {
        s.hash(&mut hasher);
    }
    reaction.q_value_mev().to_bits().hash(&mut hasher);
    hasher.finish()
}

fn order_invariant_hash(per_item: impl Iterator<Item = u64>) -> u64 {
    let mut hashes: Vec<u64> = per_item.collect();
    hashes.sort_unstable();
    let mut hasher = DefaultHasher::new();
    hashes.hash(&mut hasher);
    hasher.finish()
}

/// An order-irrelevant collection of [`LogicalReaction`]s keyed by
/// projectile-ejectile name.
///
/// Like [`ReactionSet`], storage is insertion-ordered: `iter()` yields a
/// stable sequence for the life of the set, which the graph engine relies on
/// to assign each logical reaction a fixed column index.
#[derive(Debug, Clone, Default)]
pub struct LogicalReactionSet {
    entries: Vec<LogicalReaction>,
    index: HashMap<String, usize>,
}

impl LogicalReactionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set directly from already-aggregated [`LogicalReaction`]s,
    /// preserving their order. Used by [`crate::view`] to assemble a
    /// reduced reaction set without re-deriving aggregation from raw
    /// [`Reaction`]s.
    pub fn from_logical_reactions(reactions: impl IntoIterator<Item = LogicalReaction>) -> Self {
        let mut set = Self::new();
        for reaction in reactions {
            set.index.insert(reaction.pe_name().to_string(), set.entries.len());
            set.entries.push(reaction);
        }
        set
    }

    pub fn insert_or_merge(&mut self, reaction: &Reaction) -> crate::error::Result<()> {
        if let Some(&pos) = self.index.get(reaction.pe_name()) {
            self.entries[pos].add_contributor(reaction)
        } else {
            self.index
                .insert(reaction.pe_name().to_string(), self.entries.len());
            self.entries.push(LogicalReaction::new(reaction));
            Ok(())
        }
    }

    pub fn get(&self, pe_name: &str) -> Option<&LogicalReaction> {
        self.index.get(pe_name).map(|&pos| &self.entries[pos])
    }

    /// Index of `pe_name` within this set's stable iteration order, if present.
    pub fn index_of(&self, pe_name: &str) -> Option<usize> {
        self.index.get(pe_name).copied()
    }

    pub fn get_by_index(&self, index: usize) -> Option<&LogicalReaction> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogicalReaction> {
        self.entries.iter()
    }

    /// Reactions ordered by descending rate at reference temperature `t9`,
    /// for human-readable diagnostics and DOT export ordering. Not
    /// consulted by either solver.
    pub fn sort_by_rate(&self, t9: f64) -> Vec<&LogicalReaction> {
        let mut reactions: Vec<&LogicalReaction> = self.entries.iter().collect();
        reactions.sort_by(|a, b| {
            b.rate(t9)
                .partial_cmp(&a.rate(t9))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        reactions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reaction::rate::RateCoefficients;
    use crate::species::Species;

    fn reaction(source: &str) -> Reaction {
        let p = Species::new(1, 1);
        let d = Species::new(1, 2);
        let he3 = Species::new(2, 3);
        Reaction::new(
            "p(d,g)he3",
            2,
            vec![p, d],
            vec![he3],
            5.49,
            source,
            RateCoefficients::new([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            false,
        )
        .unwrap()
    }

    #[test]
    fn hash_is_order_independent() {
        let mut ascending = ReactionSet::new();
        ascending.insert(reaction("a"));
        ascending.insert(reaction("b"));

        let mut descending = ReactionSet::new();
        descending.insert(reaction("b"));
        descending.insert(reaction("a"));

        assert_eq!(
            ascending.order_invariant_hash(),
            descending.order_invariant_hash()
        );
    }

    #[test]
    fn sort_by_rate_orders_descending() {
        let fast = reaction("fast");
        let mut slow_coeffs = RateCoefficients::new([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        slow_coeffs.0[0] = -5.0;
        let p = Species::new(1, 1);
        let d = Species::new(1, 2);
        let he3 = Species::new(2, 3);
        let slow = Reaction::new(
            "p(p,g)he3_slow",
            2,
            vec![p, d],
            vec![he3],
            5.49,
            "slow",
            slow_coeffs,
            false,
        )
        .unwrap();

        let mut set = LogicalReactionSet::new();
        set.insert_or_merge(&fast).unwrap();
        set.insert_or_merge(&slow).unwrap();
        let sorted = set.sort_by_rate(1.0);
        assert_eq!(sorted[0].pe_name(), "p(d,g)he3");
    }
}
