//! Physical constants shared by the reverse-rate and energy-generation
//! formulas in [`crate::engine`].

/// Boltzmann constant, MeV per Kelvin.
pub const BOLTZMANN_MEV_PER_K: f64 = 8.617_333_262e-11;

/// Atomic mass unit, grams.
pub const ATOMIC_MASS_UNIT_GRAMS: f64 = 1.660_539_068_92e-24;

/// Avogadro's number, per mole.
pub const AVOGADRO: f64 = 6.022_140_76e23;

/// Speed of light, cm/s.
pub const SPEED_OF_LIGHT_CM_S: f64 = 2.997_924_58e10;
