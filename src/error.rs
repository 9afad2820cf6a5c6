//! Error kinds for the reaction-network engine and solver stack.
//!
//! The five kinds mirror the failure-semantics table of the network
//! specification: data integrity problems are fatal to network
//! construction, staleness and out-of-range are engine-view programmer
//! errors, numerical failures abort an integration with diagnostic
//! context, and config errors cover unsupported parameterisations.

use thiserror::Error;

/// Errors produced by the reaction network engine, its views, and solvers.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("unknown species '{0}' referenced during deserialisation")]
    UnknownSpecies(String),

    #[error(
        "reaction '{reaction}' does not conserve {quantity}: reactants={reactant_total}, products={product_total}"
    )]
    ConservationViolation {
        reaction: String,
        quantity: &'static str,
        reactant_total: i64,
        product_total: i64,
    },

    #[error(
        "Q-value mismatch while merging source '{source}' into logical reaction '{reaction}': {existing} MeV vs {new} MeV"
    )]
    QValueMismatch {
        reaction: String,
        source: String,
        existing: f64,
        new: f64,
    },

    #[error("duplicate source label '{source}' in logical reaction '{reaction}'")]
    DuplicateSource { reaction: String, source: String },

    #[error("malformed REACLIB record at byte offset {offset}: {detail}")]
    MalformedRecord { offset: usize, detail: String },

    #[error("unknown reaction name '{0}' in network definition file")]
    UnknownReactionName(String),

    #[error("{method} called on a stale engine view; call update() first")]
    Stale { method: &'static str },

    #[error("index {index} out of range for {what} (len {len})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Levenberg-Marquardt solve failed to converge after {iterations} iterations (final residual norm {residual_norm:e})")]
    LmDidNotConverge {
        iterations: usize,
        residual_norm: f64,
    },

    #[error("integration step size collapsed at t={t:e} after {steps} successful steps")]
    StepSizeCollapsed { steps: usize, t: f64 },

    #[error("non-finite state encountered at t={t:e} after {steps} successful steps")]
    NonFiniteState { steps: usize, t: f64 },

    #[error("unknown partition function type '{0}'")]
    UnknownPartitionType(String),

    #[error("reverse-rate arity ({reactants}, {products}) is not supported; returning zero")]
    UnsupportedReverseArity { reactants: usize, products: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NetworkError>;
