//! The reaction network engine: given a composition state (molar
//! abundances, temperature, density) it produces `dY/dt`, the nuclear
//! energy generation rate, and (on demand) the Jacobian of `dY/dt` with
//! respect to abundance.
//!
//! [`GraphEngine`] is the only concrete implementation here; [`crate::view`]
//! layers index-remapping decorators on top of it that also implement
//! [`Engine`], so solvers never need to know whether they are driving a
//! full network or a culled view of one.

pub mod export;
pub mod graph;
pub mod precomputed;
pub mod stoichiometry;

pub use graph::GraphEngine;
pub use precomputed::PrecomputedReaction;
pub use stoichiometry::SparseMatrix;

use crate::reaction::LogicalReactionSet;
use crate::screening::ScreeningType;
use crate::species::Species;

/// Below this density, all reaction flows are zero regardless of
/// composition or temperature.
pub const MIN_DENSITY_THRESHOLD: f64 = 1e-18;

/// Below this molar abundance, a species is treated as absent from a
/// reaction: the reaction's flow is zero rather than merely small.
pub const MIN_ABUNDANCE_THRESHOLD: f64 = 1e-18;

/// Jacobian entries with a smaller magnitude than this are dropped rather
/// than stored, keeping the matrix sparse.
pub const MIN_JACOBIAN_THRESHOLD: f64 = 1e-24;

/// `dY/dt` and the nuclear energy generation rate for one engine
/// evaluation, at whatever scalar type the caller evaluated with.
#[derive(Debug, Clone)]
pub struct StepDerivatives<S> {
    pub dydt: Vec<S>,
    pub nuclear_energy_generation_rate: S,
}

/// The contract shared by [`GraphEngine`] and every [`crate::view`] decorator
/// over it. A view only remaps indices; the numerical contract — what `dY/dt`
/// means, how the Jacobian is populated, how timescales are computed — is
/// defined once here.
pub trait Engine {
    fn network_species(&self) -> &[Species];
    fn network_reactions(&self) -> &LogicalReactionSet;

    fn calculate_rhs_and_energy(&self, y: &[f64], t9: f64, rho: f64) -> StepDerivatives<f64>;

    /// Per-reaction molar flow `R_j` at `(y, t9, rho)`, in the network's
    /// stable reaction order. Used by [`crate::view::AdaptiveEngineView`] to
    /// rank reactions for flow-based culling; not needed by
    /// [`Engine::calculate_rhs_and_energy`] itself, which folds flows
    /// directly into `dY/dt` without materialising them separately.
    fn reaction_flows(&self, y: &[f64], t9: f64, rho: f64) -> Vec<f64>;

    /// Rebuilds the cached Jacobian of `dY/dt` with respect to abundance at
    /// `(y, t9, rho)`. Must be called before [`Engine::jacobian_entry`]
    /// reflects the new state.
    fn generate_jacobian(&mut self, y: &[f64], t9: f64, rho: f64);
    fn jacobian_entry(&self, i: usize, j: usize) -> f64;

    fn generate_stoichiometry_matrix(&mut self);
    fn stoichiometry_entry(&self, species_index: usize, reaction_index: usize) -> i32;

    fn species_timescales(&self, y: &[f64], t9: f64, rho: f64) -> std::collections::HashMap<Species, f64>;

    fn screening_model(&self) -> ScreeningType;
    fn set_screening_model(&mut self, screening: ScreeningType);

    fn involves_species(&self, species: &Species) -> bool {
        self.network_species().contains(species)
    }
}
