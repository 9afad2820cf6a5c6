//! Process-wide configuration.
//!
//! Mirrors the key table of the network specification one field per key,
//! loaded through a layered `figment` provider stack: compiled-in
//! defaults, then an optional TOML file, then `GRIDFIRE_*` environment
//! variables. A single process-wide instance is reachable through
//! [`Config::global`], matching the read-only-during-evaluation
//! configuration collaborator the engines and solvers are built around.

use std::sync::OnceLock;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// `gridfire:AdaptiveEngineView:RelativeCullingThreshold` — epsilon for
    /// flow-based reaction culling in `AdaptiveEngineView::update`.
    pub adaptive_relative_culling_threshold: f64,
    /// `gridfire:solver:QSE:ignition:temperature` — ignition prepass T (K).
    pub qse_ignition_temperature: f64,
    /// `gridfire:solver:QSE:ignition:density` — ignition prepass rho (g/cm^3).
    pub qse_ignition_density: f64,
    /// `gridfire:solver:QSE:ignition:tMax` — ignition prepass horizon (s).
    pub qse_ignition_t_max: f64,
    /// `gridfire:solver:QSE:ignition:dt0` — ignition prepass initial step (s).
    pub qse_ignition_dt0: f64,
    /// `gridfire:solver:policy:temp_threshold` — view-refresh delta T / T.
    pub policy_temp_threshold: f64,
    /// `gridfire:solver:policy:rho_threshold` — view-refresh delta rho / rho.
    pub policy_rho_threshold: f64,
    /// `gridfire:solver:policy:fuel_threshold` — view-refresh delta X(H-1) / X.
    pub policy_fuel_threshold: f64,
    /// `gridfire:solver:DirectNetworkSolver:absTol`.
    pub direct_solver_abs_tol: f64,
    /// `gridfire:solver:DirectNetworkSolver:relTol`.
    pub direct_solver_rel_tol: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            adaptive_relative_culling_threshold: 1e-75,
            qse_ignition_temperature: 2e8,
            qse_ignition_density: 1e6,
            qse_ignition_t_max: 1e-7,
            qse_ignition_dt0: 1e-15,
            policy_temp_threshold: 0.05,
            policy_rho_threshold: 0.10,
            policy_fuel_threshold: 0.15,
            direct_solver_abs_tol: 1e-8,
            direct_solver_rel_tol: 1e-8,
        }
    }
}

impl Config {
    /// Builds a `Config` by layering compiled-in defaults, an optional TOML
    /// file at `path`, and `GRIDFIRE_*` environment variables, in that
    /// order of increasing precedence.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("GRIDFIRE_"));
        figment
            .extract()
            .map_err(|e| NetworkError::Config(e.to_string()))
    }

    /// The process-wide configuration, initialised on first use from
    /// defaults plus environment variables only (no TOML file). Call
    /// [`Config::set_global`] earlier in process startup to install a
    /// config loaded from a file instead.
    pub fn global() -> &'static Config {
        GLOBAL.get_or_init(|| Config::load(None).unwrap_or_default())
    }

    /// Installs `config` as the process-wide configuration. Must be called
    /// before the first call to [`Config::global`]; returns `false` if the
    /// global was already initialised.
    pub fn set_global(config: Config) -> bool {
        GLOBAL.set(config).is_ok()
    }
}

static GLOBAL: OnceLock<Config> = OnceLock::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let cfg = Config::default();
        assert_eq!(cfg.adaptive_relative_culling_threshold, 1e-75);
        assert_eq!(cfg.qse_ignition_temperature, 2e8);
        assert_eq!(cfg.direct_solver_abs_tol, 1e-8);
        assert_eq!(cfg.policy_fuel_threshold, 0.15);
    }

    #[test]
    fn load_with_no_file_falls_back_to_defaults() {
        let cfg = Config::load(None).unwrap();
        assert_eq!(cfg, Config::default());
    }
}
