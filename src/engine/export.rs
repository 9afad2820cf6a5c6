//! DOT and CSV export of a reaction network graph, for visualisation and
//! spreadsheet inspection. Not consulted by either solver.

use std::fmt::Write as _;

use petgraph::graph::DiGraph;
use petgraph::dot::{Config, Dot};

use crate::reaction::LogicalReaction;
use crate::species::Species;

/// One node of the exported bipartite graph: either a species (labelled by
/// name) or a reaction vertex (labelled by projectile-ejectile name and
/// Q-value), kept distinct so a reaction with several reactants and several
/// products renders as one vertex rather than a dense species-to-species
/// clique.
enum NetworkNode {
    Species(String),
    Reaction { pe_name: String, q_value_mev: f64 },
}

impl std::fmt::Display for NetworkNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkNode::Species(name) => write!(f, "{name}"),
            NetworkNode::Reaction { pe_name, q_value_mev } => {
                write!(f, "{pe_name} ({q_value_mev} MeV)")
            }
        }
    }
}

/// Builds the network as a [`petgraph`] digraph: one node per species, one
/// node per reaction, with reactant edges into the reaction node and product
/// edges out of it.
fn build_graph(species: &[Species], reactions: &[LogicalReaction]) -> DiGraph<NetworkNode, &'static str> {
    let mut graph = DiGraph::new();
    let mut species_nodes = std::collections::HashMap::new();
    for s in species {
        let node = graph.add_node(NetworkNode::Species(s.name()));
        species_nodes.insert(*s, node);
    }

    for reaction in reactions {
        let reaction_node = graph.add_node(NetworkNode::Reaction {
            pe_name: reaction.pe_name().to_string(),
            q_value_mev: reaction.q_value_mev(),
        });
        for reactant in reaction.reactants() {
            if let Some(&node) = species_nodes.get(reactant) {
                graph.add_edge(node, reaction_node, "");
            }
        }
        for product in reaction.products() {
            if let Some(&node) = species_nodes.get(product) {
                graph.add_edge(reaction_node, node, "");
            }
        }
    }

    graph
}

/// Renders the network as a Graphviz DOT digraph: one node per species, one
/// node per reaction connecting its reactants to its products.
pub fn to_dot(species: &[Species], reactions: &[LogicalReaction]) -> String {
    let graph = build_graph(species, reactions);
    format!("{}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
}

/// Renders the network as a semicolon-delimited CSV: one row per reaction
/// with its reactants, products, Q-value, data sources, and REACLIB
/// coefficients.
pub fn to_csv(reactions: &[LogicalReaction]) -> String {
    let mut out = String::new();
    out.push_str("Reaction;Reactants;Products;Q-value;sources\n");
    for reaction in reactions {
        let reactants = reaction
            .reactants()
            .iter()
            .map(Species::name)
            .collect::<Vec<_>>()
            .join(",");
        let products = reaction
            .products()
            .iter()
            .map(Species::name)
            .collect::<Vec<_>>()
            .join(",");
        let sources = reaction.sources().collect::<Vec<_>>().join(",");
        let _ = writeln!(
            out,
            "{};{};{};{};{}",
            reaction.pe_name(),
            reactants,
            products,
            reaction.q_value_mev(),
            sources
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reaction::rate::RateCoefficients;
    use crate::reaction::{LogicalReactionSet, Reaction};

    fn sample() -> (Vec<Species>, LogicalReactionSet) {
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
            RateCoefficients::new([0.0; 7]),
            false,
        )
        .unwrap();
        let mut set = LogicalReactionSet::new();
        set.insert_or_merge(&r).unwrap();
        (vec![p, d, he3], set)
    }

    #[test]
    fn dot_contains_species_and_reaction_nodes() {
        let (species, set) = sample();
        let reactions: Vec<_> = set.iter().cloned().collect();
        let dot = to_dot(&species, &reactions);
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("p"));
        assert!(dot.contains("p(d,g)he3"));
    }

    #[test]
    fn csv_has_header_and_one_row_per_reaction() {
        let (_, set) = sample();
        let reactions: Vec<_> = set.iter().cloned().collect();
        let csv = to_csv(&reactions);
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.lines().next().unwrap().starts_with("Reaction;"));
    }
}
