//! Error taxonomy for a single simulation run.
//!
//! Setup errors (`InvalidGeometry`, `ConstraintConflict`, `Config`) are raised
//! before the first time step. Run errors (`SolveDiverged`, `NumericOverflow`,
//! `LinearSolve`) abort the current run only; a sweep records them and keeps going.

use thiserror::Error;

/// Errors produced while building or advancing a run
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Non-positive mesh dimensions or resolution
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Two Dirichlet conditions disagree on the same degree of freedom
    #[error("Constraint conflict on {field} dof {dof}: {existing} vs {requested}")]
    ConstraintConflict {
        field: &'static str,
        dof: usize,
        existing: f64,
        requested: f64,
    },

    /// Newton iteration failed to reach tolerance
    #[error("Nonlinear solve diverged after {iterations} iterations (residual {residual:.3e})")]
    SolveDiverged { iterations: usize, residual: f64 },

    /// Viscosity, residual or update became NaN/Inf
    #[error("Numeric overflow: {0}")]
    NumericOverflow(String),

    /// Linear correction could not be computed (singular pivot)
    #[error("Linear solve failed: {0}")]
    LinearSolve(String),

    /// Malformed or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimulationError {
    /// True for errors raised while setting a run up (before any time step)
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidGeometry(_) | Self::ConstraintConflict { .. } | Self::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;
