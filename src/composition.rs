//! Composition: mass fractions and their conversion to molar abundances.
//!
//! The network specification treats composition handling as a trusted
//! external collaborator (`fourdst::composition::Composition` in the
//! original sources); this is a minimal, self-contained stand-in with the
//! same contract — mass fractions that sum to one, converted to/from
//! molar abundance `Y_i = X_i / A_i` on demand.

use crate::error::{NetworkError, Result};
use crate::species::Species;

/// A set of species with associated mass fractions summing (approximately)
/// to one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composition {
    species: Vec<Species>,
    mass_fraction: Vec<f64>,
}

impl Composition {
    pub fn from_mass_fractions(pairs: impl IntoIterator<Item = (Species, f64)>) -> Self {
        let (species, mass_fraction) = pairs.into_iter().unzip();
        Self {
            species,
            mass_fraction,
        }
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn mass_fraction_of(&self, species: Species) -> f64 {
        self.species
            .iter()
            .position(|&s| s == species)
            .map(|i| self.mass_fraction[i])
            .unwrap_or(0.0)
    }

    /// Molar abundance `Y = X / A` of one species, or `0.0` if it is not
    /// present in this composition. The same "absent means zero" contract
    /// as [`Composition::mass_fraction_of`], used when a view or solver
    /// looks up abundances for a base engine's full species list.
    pub fn molar_abundance_of(&self, species: Species) -> f64 {
        self.mass_fraction_of(species) / species.a as f64
    }

    /// Molar abundance `Y_i = X_i / A_i` for every species, in the same
    /// order as [`Composition::species`].
    pub fn molar_abundances(&self) -> Vec<f64> {
        self.species
            .iter()
            .zip(&self.mass_fraction)
            .map(|(s, x)| x / s.a as f64)
            .collect()
    }

    pub fn total_mass_fraction(&self) -> f64 {
        self.mass_fraction.iter().sum()
    }

    /// Rescales mass fractions so they sum to exactly one. Returns an error
    /// if the total is not positive and finite.
    pub fn normalize(&mut self) -> Result<()> {
        let total = self.total_mass_fraction();
        if !total.is_finite() || total <= 0.0 {
            return Err(NetworkError::Config(format!(
                "cannot normalize composition with total mass fraction {total}"
            )));
        }
        for x in &mut self.mass_fraction {
            *x /= total;
        }
        Ok(())
    }

    /// Builds a composition from molar abundances `Y_i`, converting to mass
    /// fractions `X_i = Y_i * A_i` (not normalized).
    pub fn from_molar_abundances(pairs: impl IntoIterator<Item = (Species, f64)>) -> Self {
        Self::from_mass_fractions(pairs.into_iter().map(|(s, y)| (s, y * s.a as f64)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn molar_abundance_divides_by_mass_number() {
        let he4 = Species::new(2, 4);
        let comp = Composition::from_mass_fractions([(he4, 1.0)]);
        assert_eq!(comp.molar_abundances(), vec![0.25]);
    }

    #[test]
    fn molar_abundance_of_absent_species_is_zero() {
        let he4 = Species::new(2, 4);
        let h1 = Species::new(1, 1);
        let comp = Composition::from_mass_fractions([(he4, 1.0)]);
        assert_eq!(comp.molar_abundance_of(h1), 0.0);
        assert_eq!(comp.molar_abundance_of(he4), 0.25);
    }

    #[test]
    fn normalize_rescales_to_unit_sum() {
        let h1 = Species::new(1, 1);
        let he4 = Species::new(2, 4);
        let mut comp = Composition::from_mass_fractions([(h1, 0.5), (he4, 0.25)]);
        comp.normalize().unwrap();
        assert!((comp.total_mass_fraction() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn normalize_rejects_zero_total() {
        let h1 = Species::new(1, 1);
        let mut comp = Composition::from_mass_fractions([(h1, 0.0)]);
        assert!(comp.normalize().is_err());
    }
}
