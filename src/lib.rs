//! A graph-based nuclear reaction network engine and ODE/QSE solver stack.
//!
//! [`engine::GraphEngine`] holds the REACLIB-derived reaction graph and
//! evaluates `dY/dt`, nuclear energy generation, and the Jacobian; [`view`]
//! decorators restrict that engine to a dynamically or statically culled
//! subset without the solver needing to know the difference; [`solver`]
//! drives either view forward in time, either stiffly
//! ([`solver::DirectNetworkSolver`]) or with fast species held in algebraic
//! steady state ([`solver::QSENetworkSolver`]).

pub mod ad;
pub mod composition;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod partition;
pub mod reaction;
pub mod scalar;
pub mod screening;
pub mod solver;
pub mod species;
pub mod view;

pub use composition::Composition;
pub use config::Config;
pub use engine::{Engine, GraphEngine};
pub use error::{NetworkError, Result};
pub use reaction::{Chapter, LogicalReaction, LogicalReactionSet, Reaction, ReactionSet};
pub use scalar::Scalar;
pub use solver::{NetIn, NetOut};
pub use species::Species;
