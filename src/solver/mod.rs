//! Network time-integration strategies: [`DirectNetworkSolver`] integrates
//! every species stiffly, [`QSENetworkSolver`] partitions fast species into
//! an algebraic steady-state balance and integrates only the slow manifold.
//!
//! Both solvers borrow an [`crate::engine::Engine`] (a bare [`crate::engine::GraphEngine`]
//! or a [`crate::view`] decorator over one) rather than owning it, matching
//! the original `NetworkSolverStrategy<EngineT>&` borrow-don't-own contract.

pub mod direct;
pub mod dopri5;
pub mod lm;
pub mod qse;
pub mod rosenbrock;

pub use direct::DirectNetworkSolver;
pub use qse::{QSENetworkSolver, UpdatableEngine};

use crate::composition::Composition;

/// Input to a single network evaluation: starting composition, the
/// integration horizon, thermodynamic state, and an optional per-call
/// override of the adaptive culling threshold.
#[derive(Debug, Clone)]
pub struct NetIn {
    pub composition: Composition,
    /// Maximum integration time, seconds.
    pub t_max: f64,
    /// Initial trial step size, seconds.
    pub dt0: f64,
    /// Temperature, Kelvin.
    pub temperature: f64,
    /// Density, g/cm^3.
    pub density: f64,
    /// Specific internal energy, ergs/g, carried through unevolved.
    pub energy: f64,
    /// Overrides the configured relative culling threshold for this call
    /// when `Some`; `None` leaves the view's own threshold untouched.
    pub culling_threshold: Option<f64>,
}

impl NetIn {
    /// `temperature` expressed in units of 10^9 K, the unit every
    /// [`crate::engine::Engine`] method takes.
    pub fn t9(&self) -> f64 {
        self.temperature / 1e9
    }
}

/// Result of a single network evaluation.
#[derive(Debug, Clone)]
pub struct NetOut {
    pub composition: Composition,
    /// Number of accepted integrator steps taken.
    pub num_steps: usize,
    /// Specific internal energy, ergs/g, after evaluation.
    pub energy: f64,
}
