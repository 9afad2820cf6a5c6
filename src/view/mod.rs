//! Index-remapping decorators over a base [`crate::engine::Engine`].
//!
//! A view never computes a derivative itself: it scatters a reduced
//! abundance vector onto the base engine's full species list, delegates,
//! and gathers the result back down. This means [`AdaptiveEngineView`] and
//! [`FileDefinedEngineView`] are themselves [`crate::engine::Engine`]
//! implementations, so a solver never needs to know whether it is driving
//! a full network or a culled subset of one.
//!
//! Every accessor panics if the view is stale (constructed, or made stale
//! by [`FileDefinedEngineView::set_network_file`], without a following
//! `update`). This mirrors the base C++ views, which throw on the same
//! condition; panicking here (rather than threading a `Result` through
//! every [`crate::engine::Engine`] method) keeps the trait's signature
//! uniform between `GraphEngine` and its decorators, consistent with
//! [`crate::error::NetworkError::OutOfRange`]'s documented "programmer
//! error" precedent.

pub mod adaptive;
pub mod file_defined;

pub use adaptive::AdaptiveEngineView;
pub use file_defined::FileDefinedEngineView;

use tracing::error;

use crate::error::NetworkError;
use crate::reaction::LogicalReactionSet;
use crate::species::Species;

fn panic_if_stale(stale: bool, method: &'static str) {
    if stale {
        let err = NetworkError::Stale { method };
        error!("{err}");
        panic!("{err}");
    }
}

/// Scatters a view-ordered vector into a zero-filled full-length vector,
/// via `view_to_full[i]`.
fn scatter(view: &[f64], view_to_full: &[usize], full_len: usize) -> Vec<f64> {
    let mut full = vec![0.0; full_len];
    for (i, &full_index) in view_to_full.iter().enumerate() {
        full[full_index] += view[i];
    }
    full
}

/// Gathers a full-length vector down to view order, via `view_to_full[i]`.
fn gather(full: &[f64], view_to_full: &[usize]) -> Vec<f64> {
    view_to_full.iter().map(|&full_index| full[full_index]).collect()
}

/// `base_species[i] -> i` so the active subset can look itself up by
/// value instead of linear-scanning the full species list once per
/// active species.
fn species_index_map(base_species: &[Species], active: &[Species]) -> Vec<usize> {
    let reverse: std::collections::HashMap<Species, usize> =
        base_species.iter().enumerate().map(|(i, &s)| (s, i)).collect();
    active
        .iter()
        .map(|s| {
            *reverse
                .get(s)
                .unwrap_or_else(|| panic!("species '{}' not found in base engine", s.name()))
        })
        .collect()
}

/// `active[i].pe_name() -> full.index_of(...)`, used to remap a reduced
/// [`LogicalReactionSet`] back onto the base engine's reaction order.
fn reaction_index_map(full: &LogicalReactionSet, active: &LogicalReactionSet) -> Vec<usize> {
    active
        .iter()
        .map(|reaction| {
            full.index_of(reaction.pe_name())
                .unwrap_or_else(|| panic!("reaction '{}' not found in base engine", reaction.pe_name()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scatter_then_gather_is_identity_on_active_support() {
        let view_to_full = vec![2usize, 0];
        let view = vec![1.5, 2.5];
        let full = scatter(&view, &view_to_full, 3);
        assert_eq!(full, vec![2.5, 0.0, 1.5]);
        let back = gather(&full, &view_to_full);
        assert_eq!(back, view);
    }
}
