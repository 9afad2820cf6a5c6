//! Atomic species: the immutable (Z, A) identity shared by every reaction,
//! engine, and composition in the crate.
//!
//! The original C++ sources resolve species against an external
//! `fourdst::atomic::species` table; here that table is a process-wide,
//! lazily-populated registry ([`Species::table`]) so that a `Species`
//! handle is a cheap `Copy` index rather than an owned string, matching
//! how the engine stores species in dense `Vec<Species>` network lists.

use std::collections::HashMap;
use std::sync::OnceLock;

/// An atomic species identified by proton number `z` and mass number `a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Species {
    pub z: u16,
    pub a: u16,
}

impl Species {
    pub const fn new(z: u16, a: u16) -> Self {
        Self { z, a }
    }

    /// Neutron count, `A - Z`.
    pub fn n(&self) -> u16 {
        self.a.saturating_sub(self.z)
    }

    /// Canonical name, e.g. `"he4"`, `"n"`, `"p"`.
    pub fn name(&self) -> String {
        match (self.z, self.a) {
            (0, 1) => "n".to_string(),
            (1, 1) => "p".to_string(),
            (1, 2) => "d".to_string(),
            (1, 3) => "t".to_string(),
            _ => format!("{}{}", element_symbol(self.z), self.a),
        }
    }

    /// Approximate atomic mass in atomic mass units, via the semi-empirical
    /// mass formula. Used only for the `excess_energy` diagnostic; reaction
    /// Q-values themselves are stored data, not derived from this.
    pub fn approx_mass_u(&self) -> f64 {
        let a = self.a as f64;
        let z = self.z as f64;
        let n = self.n() as f64;
        const A_V: f64 = 15.75;
        const A_S: f64 = 17.8;
        const A_C: f64 = 0.711;
        const A_A: f64 = 23.7;
        const A_P: f64 = 11.18;
        let volume = A_V * a;
        let surface = A_S * a.powf(2.0 / 3.0);
        let coulomb = A_C * z * (z - 1.0) / a.powf(1.0 / 3.0);
        let asymmetry = A_A * (n - z).powi(2) / a;
        let pairing = if (self.z % 2 == 0) && (self.n() % 2 == 0) {
            A_P / a.sqrt()
        } else if (self.z % 2 == 1) && (self.n() % 2 == 1) {
            -A_P / a.sqrt()
        } else {
            0.0
        };
        let binding_energy_mev = volume - surface - coulomb - asymmetry + pairing;
        const AMU_MEV: f64 = 931.494;
        const PROTON_MASS_U: f64 = 1.007_276;
        const NEUTRON_MASS_U: f64 = 1.008_665;
        z * PROTON_MASS_U + n * NEUTRON_MASS_U - binding_energy_mev.max(0.0) / AMU_MEV
    }
}

fn element_symbol(z: u16) -> &'static str {
    const SYMBOLS: &[&str] = &[
        "n", "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P",
        "S", "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn",
        "Ga", "Ge", "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh",
        "Pd", "Ag", "Cd", "In", "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd",
        "Pm", "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re",
        "Os", "Ir", "Pt", "Au", "Hg", "Tl", "Pb", "Bi", "Po", "At", "Rn",
    ];
    SYMBOLS.get(z as usize).copied().unwrap_or("Xx")
}

/// Parses a canonical lower/mixed-case isotope name such as `"he4"`,
/// `"p"`, `"n"`, `"d"`, `"t"`, or `"c12"` into a [`Species`]. Used to
/// resolve the whitespace-separated reactant/product name strings in a
/// REACLIB record or a `FileDefinedEngineView` reaction-list file.
pub fn parse_species_name(name: &str) -> Option<Species> {
    let trimmed = name.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "n" => return Some(Species::new(0, 1)),
        "p" | "h1" => return Some(Species::new(1, 1)),
        "d" | "h2" => return Some(Species::new(1, 2)),
        "t" | "h3" => return Some(Species::new(1, 3)),
        _ => {}
    }
    let split_at = trimmed.find(|c: char| c.is_ascii_digit())?;
    let (symbol, mass) = trimmed.split_at(split_at);
    let a: u16 = mass.parse().ok()?;
    let z = symbol_to_z(symbol)?;
    Some(Species::new(z, a))
}

fn symbol_to_z(symbol: &str) -> Option<u16> {
    const SYMBOLS: &[&str] = &[
        "n", "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P",
        "S", "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn",
        "Ga", "Ge", "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh",
        "Pd", "Ag", "Cd", "In", "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd",
        "Pm", "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re",
        "Os", "Ir", "Pt", "Au", "Hg", "Tl", "Pb", "Bi", "Po", "At", "Rn",
    ];
    SYMBOLS
        .iter()
        .position(|&s| s.eq_ignore_ascii_case(symbol))
        .map(|z| z as u16)
}

/// Process-wide registry mapping species names to [`Species`], populated
/// lazily as REACLIB data and composition files are parsed.
#[derive(Debug, Default)]
pub struct SpeciesTable {
    by_name: HashMap<String, Species>,
}

impl SpeciesTable {
    pub fn get() -> &'static std::sync::RwLock<SpeciesTable> {
        static TABLE: OnceLock<std::sync::RwLock<SpeciesTable>> = OnceLock::new();
        TABLE.get_or_init(|| std::sync::RwLock::new(SpeciesTable::default()))
    }

    /// Registers `species` under `name`, returning the existing entry if
    /// `name` was already registered with a different species.
    pub fn register(&mut self, name: &str, species: Species) {
        self.by_name.insert(name.to_string(), species);
    }

    pub fn lookup(&self, name: &str) -> Option<Species> {
        self.by_name.get(name).copied()
    }
}

/// Process-wide, lazily-populated half-life registry (seconds). A species
/// with no registered entry is treated as stable (`f64::INFINITY`),
/// matching the original atomic-species table's default for any nuclide
/// its decay-data asset doesn't cover.
#[derive(Debug, Default)]
pub struct HalfLifeTable {
    by_species: HashMap<Species, f64>,
}

impl HalfLifeTable {
    pub fn get() -> &'static std::sync::RwLock<HalfLifeTable> {
        static TABLE: OnceLock<std::sync::RwLock<HalfLifeTable>> = OnceLock::new();
        TABLE.get_or_init(|| std::sync::RwLock::new(HalfLifeTable::default()))
    }

    /// Registers a half-life, in seconds, for `species`. Use
    /// `f64::INFINITY` to record an explicitly stable nuclide (the same
    /// value returned for an unregistered one).
    pub fn register(&mut self, species: Species, half_life_s: f64) {
        self.by_species.insert(species, half_life_s);
    }

    /// The registered half-life in seconds, or `f64::INFINITY` if `species`
    /// has no entry.
    pub fn lookup(&self, species: Species) -> f64 {
        self.by_species.get(&species).copied().unwrap_or(f64::INFINITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_common_nuclides() {
        assert_eq!(Species::new(2, 4).name(), "He4");
        assert_eq!(Species::new(1, 1).name(), "p");
        assert_eq!(Species::new(0, 1).name(), "n");
    }

    #[test]
    fn neutron_count_is_a_minus_z() {
        assert_eq!(Species::new(6, 12).n(), 6);
    }

    #[test]
    fn approx_mass_is_close_to_mass_number_for_he4() {
        let he4 = Species::new(2, 4);
        assert!((he4.approx_mass_u() - 4.0).abs() < 0.1);
    }

    #[test]
    fn unregistered_half_life_is_infinite() {
        let table = HalfLifeTable::default();
        assert_eq!(table.lookup(Species::new(6, 14)), f64::INFINITY);
    }

    #[test]
    fn registered_half_life_is_looked_up() {
        let mut table = HalfLifeTable::default();
        let c14 = Species::new(6, 14);
        table.register(c14, 180_720_000.0);
        assert_eq!(table.lookup(c14), 180_720_000.0);
    }

    #[test]
    fn parses_common_isotope_names() {
        assert_eq!(parse_species_name("p"), Some(Species::new(1, 1)));
        assert_eq!(parse_species_name("he4"), Some(Species::new(2, 4)));
        assert_eq!(parse_species_name("C12"), Some(Species::new(6, 12)));
        assert_eq!(parse_species_name("n"), Some(Species::new(0, 1)));
        assert_eq!(parse_species_name("bogus"), None);
    }
}
