//! Electron screening: a pluggable multiplicative correction to bare
//! reaction rates.
//!
//! Mirrors `gridfire::screening::ScreeningModel` — one call signature
//! shared by the plain-`f64` forward pass and the AD-scalar tape
//! recording pass, same as [`crate::scalar::Scalar`] elsewhere in the
//! crate. The trait itself exposes one method per concrete scalar type
//! (matching the C++ base class's two overloads) so it stays object-safe;
//! each implementation shares its math through a private `Scalar`-generic
//! helper.

pub mod bare;
pub mod weak;

pub use bare::BareScreeningModel;
pub use weak::WeakScreeningModel;

use crate::ad::Var;
use crate::reaction::LogicalReactionSet;
use crate::species::Species;

/// Selects which [`ScreeningModel`] implementation a network uses. Plain
/// data so it can be swapped and restored around the QSE ignition prepass
/// (spec step B) without touching trait objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScreeningType {
    #[default]
    Bare,
    WeakSalpeter,
}

impl ScreeningType {
    pub fn build(self) -> Box<dyn ScreeningModel + Send + Sync> {
        match self {
            ScreeningType::Bare => Box::new(BareScreeningModel),
            ScreeningType::WeakSalpeter => Box::new(WeakScreeningModel),
        }
    }
}

/// A multiplicative correction to bare REACLIB rates, one factor per
/// reaction in `reactions`, in iteration order.
pub trait ScreeningModel {
    fn factors_f64(
        &self,
        reactions: &LogicalReactionSet,
        species: &[Species],
        y: &[f64],
        t9: f64,
        rho: f64,
    ) -> Vec<f64>;

    fn factors_ad<'t>(
        &self,
        reactions: &LogicalReactionSet,
        species: &[Species],
        y: &[Var<'t>],
        t9: Var<'t>,
        rho: Var<'t>,
    ) -> Vec<Var<'t>>;
}
