//! Restricting a base engine to a reaction set named explicitly in a text
//! file, one projectile-ejectile name per line.

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::engine::{Engine, StepDerivatives};
use crate::error::{NetworkError, Result};
use crate::reaction::LogicalReactionSet;
use crate::screening::ScreeningType;
use crate::solver::{NetIn, UpdatableEngine};
use crate::species::Species;

use super::{gather, panic_if_stale, reaction_index_map, scatter, species_index_map};

/// An [`Engine`] decorator that restricts a base engine to the reactions
/// named in a reaction-list file, one projectile-ejectile name per line.
/// `#` starts a line comment; blank lines are ignored. Unlike
/// [`super::AdaptiveEngineView`], the active species list is built in
/// file/reaction insertion order rather than sorted by mass, since it is
/// meant to mirror a hand-curated network rather than a derived one.
pub struct FileDefinedEngineView<'e, E: Engine> {
    base: &'e mut E,
    file_path: PathBuf,
    active_species: Vec<Species>,
    active_reactions: LogicalReactionSet,
    species_map: Vec<usize>,
    reaction_map: Vec<usize>,
    stale: bool,
}

impl<'e, E: Engine> FileDefinedEngineView<'e, E> {
    /// Builds the view immediately from `file_path`, leaving it non-stale
    /// on success. Unlike [`super::AdaptiveEngineView::new`], construction
    /// itself performs the build rather than deferring to a later `update`.
    pub fn new(base: &'e mut E, file_path: impl Into<PathBuf>) -> Result<Self> {
        let file_path = file_path.into();
        let mut view = Self {
            base,
            file_path: file_path.clone(),
            active_species: Vec::new(),
            active_reactions: LogicalReactionSet::new(),
            species_map: Vec::new(),
            reaction_map: Vec::new(),
            stale: true,
        };
        view.build_from_file(&file_path)?;
        Ok(view)
    }

    /// Rebuilds the active set from the file at `file_path`, if the view is
    /// currently stale. Idempotent: calling `update` on a fresh view is a
    /// no-op.
    pub fn update(&mut self, _net_in: &NetIn) -> Result<()> {
        if self.stale {
            let file_path = self.file_path.clone();
            self.build_from_file(&file_path)?;
        }
        Ok(())
    }

    /// Points the view at a new network file and marks it stale. The next
    /// call to [`FileDefinedEngineView::update`] rebuilds from the new
    /// file; every accessor panics in the meantime.
    pub fn set_network_file(&mut self, file_path: impl Into<PathBuf>) {
        self.file_path = file_path.into();
        self.stale = true;
        debug!(path = %self.file_path.display(), "file defined engine view marked stale");
    }

    fn build_from_file(&mut self, file_path: &Path) -> Result<()> {
        trace!(path = %file_path.display(), "building file defined engine view");
        let pe_names = parse_reaction_list_file(file_path)?;

        let mut active_species = Vec::new();
        let mut active_reactions = Vec::new();
        let mut seen = HashSet::new();

        let full_reactions = self.base.network_reactions();
        for pe_name in &pe_names {
            let reaction = full_reactions
                .get(pe_name)
                .ok_or_else(|| NetworkError::UnknownReactionName(pe_name.clone()))?
                .clone();
            for &reactant in reaction.reactants() {
                if seen.insert(reactant) {
                    active_species.push(reactant);
                }
            }
            for &product in reaction.products() {
                if seen.insert(product) {
                    active_species.push(product);
                }
            }
            active_reactions.push(reaction);
        }

        self.active_reactions = LogicalReactionSet::from_logical_reactions(active_reactions);
        self.active_species = active_species;
        self.species_map = species_index_map(self.base.network_species(), &self.active_species);
        self.reaction_map = reaction_index_map(self.base.network_reactions(), &self.active_reactions);
        self.stale = false;

        debug!(
            species = self.active_species.len(),
            reactions = self.active_reactions.len(),
            "file defined engine view built"
        );
        Ok(())
    }

    fn map_view_to_full(&self, view: &[f64]) -> Vec<f64> {
        scatter(view, &self.species_map, self.base.network_species().len())
    }

    fn map_full_to_view(&self, full: &[f64]) -> Vec<f64> {
        gather(full, &self.species_map)
    }
}

/// Parses a reaction-list file: one projectile-ejectile name per line,
/// `#` starts a line comment, blank lines are skipped.
fn parse_reaction_list_file(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)?;
    let mut names = Vec::new();
    for line in contents.lines() {
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        let line = line.trim();
        if !line.is_empty() {
            names.push(line.to_string());
        }
    }
    Ok(names)
}

impl<'e, E: Engine> UpdatableEngine for FileDefinedEngineView<'e, E> {
    fn update(&mut self, net_in: &NetIn) -> Result<()> {
        self.update(net_in)
    }
}

impl<'e, E: Engine> Engine for FileDefinedEngineView<'e, E> {
    fn network_species(&self) -> &[Species] {
        &self.active_species
    }

    fn network_reactions(&self) -> &LogicalReactionSet {
        panic_if_stale(self.stale, "network_reactions");
        &self.active_reactions
    }

    fn calculate_rhs_and_energy(&self, y: &[f64], t9: f64, rho: f64) -> StepDerivatives<f64> {
        panic_if_stale(self.stale, "calculate_rhs_and_energy");
        let y_full = self.map_view_to_full(y);
        let result = self.base.calculate_rhs_and_energy(&y_full, t9, rho);
        StepDerivatives {
            dydt: self.map_full_to_view(&result.dydt),
            nuclear_energy_generation_rate: result.nuclear_energy_generation_rate,
        }
    }

    fn reaction_flows(&self, y: &[f64], t9: f64, rho: f64) -> Vec<f64> {
        panic_if_stale(self.stale, "reaction_flows");
        let y_full = self.map_view_to_full(y);
        let full_flows = self.base.reaction_flows(&y_full, t9, rho);
        self.reaction_map.iter().map(|&i| full_flows[i]).collect()
    }

    fn generate_jacobian(&mut self, y: &[f64], t9: f64, rho: f64) {
        panic_if_stale(self.stale, "generate_jacobian");
        let y_full = self.map_view_to_full(y);
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
        let y_full = self.map_view_to_full(y);
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
    use std::io::Write;

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

    fn write_network_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{contents}").unwrap();
        file
    }

    #[test]
    fn builds_non_stale_after_construction() {
        let mut engine = GraphEngine::new(three_species_network()).unwrap();
        let file = write_network_file("p(p,g)d\n# a comment\n\nd(p,g)he3\n");
        let view = FileDefinedEngineView::new(&mut engine, file.path()).unwrap();
        assert!(!view.stale);
        assert_eq!(view.active_reactions.len(), 2);
    }

    #[test]
    fn species_are_collected_in_file_order_not_sorted_by_mass() {
        let mut engine = GraphEngine::new(three_species_network()).unwrap();
        let file = write_network_file("d(p,g)he3\np(p,g)d\n");
        let view = FileDefinedEngineView::new(&mut engine, file.path()).unwrap();
        let names: Vec<String> = view.active_species.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["p".to_string(), "d".to_string(), "He3".to_string()]);
    }

    #[test]
    fn unknown_reaction_name_is_an_error() {
        let mut engine = GraphEngine::new(three_species_network()).unwrap();
        let file = write_network_file("not_a_real_reaction\n");
        let result = FileDefinedEngineView::new(&mut engine, file.path());
        assert!(result.is_err());
    }

    #[test]
    fn set_network_file_marks_stale_until_update() {
        let mut engine = GraphEngine::new(three_species_network()).unwrap();
        let file = write_network_file("p(p,g)d\n");
        let mut view = FileDefinedEngineView::new(&mut engine, file.path()).unwrap();
        let other = write_network_file("d(p,g)he3\n");
        view.set_network_file(other.path());
        assert!(view.stale);
        let net_in = NetIn {
            composition: crate::composition::Composition::default(),
            t_max: 1.0,
            dt0: 1e-6,
            temperature: 1e7,
            density: 100.0,
            energy: 0.0,
            culling_threshold: None,
        };
        view.update(&net_in).unwrap();
        assert!(!view.stale);
        assert_eq!(view.active_reactions.len(), 1);
    }
}
