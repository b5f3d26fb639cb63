/// Newton iteration for the coupled velocity–pressure–temperature system
///
/// **Algorithm:**
/// ```text
/// Loop k = 0, 1, 2, ...
///   1. Assemble residual r(u_k) and Jacobian J(u_k)
///   2. Apply Dirichlet rows (u_i − g_i, identity)
///   3. Converged if ||r|| ≤ atol or ||r|| / ||r_0|| ≤ rtol
///   4. Solve J δ = −r
///   5. u_{k+1} = u_k + α δ
/// ```
///
/// Divergence (iteration limit, or residual growth past
/// `divergence_factor · ||r_0||`) is reported as an error; the caller
/// decides what to do with the run.
///
/// # References
/// - Kelley (2003), "Solving Nonlinear Equations with Newton's Method"

use log::debug;
use sprs::CsMat;
use crate::error::{Result, SimulationError};
use crate::fem::DirichletSet;
use crate::linalg::{LinearSolver, SolverStats, SolverUtils};

/// Configuration for Newton iteration
#[derive(Debug, Clone)]
pub struct NewtonConfig {
    /// Maximum number of Newton updates
    pub max_iterations: usize,

    /// Absolute tolerance on ||r||
    pub abs_tolerance: f64,

    /// Relative tolerance on ||r|| / ||r_0||
    pub rel_tolerance: f64,

    /// Abort when ||r|| exceeds this multiple of ||r_0||
    pub divergence_factor: f64,

    /// Step length α ∈ (0, 1]
    pub relaxation: f64,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            abs_tolerance: 1e-10,
            rel_tolerance: 1e-8,
            divergence_factor: 1e4,
            relaxation: 1.0,
        }
    }
}

/// Statistics from a Newton solve
#[derive(Debug, Clone)]
pub struct NewtonStats {
    /// Number of Newton updates applied
    pub iterations: usize,

    /// ||r_0|| at the initial guess
    pub initial_residual: f64,

    /// Final residual norm
    pub residual_norm: f64,

    /// Final relative residual ||r|| / ||r_0||
    pub relative_residual: f64,

    /// Linear solver stats from the last update
    pub last_linear_stats: SolverStats,
}

/// Solve r(u) = 0 subject to the Dirichlet set
///
/// `assemble` returns the raw Jacobian and residual at an iterate; the
/// constraints are applied here. The prescribed values are imposed on the
/// initial guess and again after every update.
///
/// # Errors
/// - `SolveDiverged` if the iteration limit is hit or the residual blows up
/// - `NumericOverflow` if the residual or an update is not finite
/// - errors from `assemble` and from the linear solver are propagated
pub fn newton_solve<F, S>(
    mut assemble: F,
    bcs: &DirichletSet,
    solver: &mut S,
    mut u: Vec<f64>,
    config: &NewtonConfig,
) -> Result<(Vec<f64>, NewtonStats)>
where
    F: FnMut(&[f64]) -> Result<(CsMat<f64>, Vec<f64>)>,
    S: LinearSolver + ?Sized,
{
    bcs.impose(&mut u);

    let mut r0 = 0.0;
    let mut last_linear_stats = SolverStats::new();

    for iter in 0..=config.max_iterations {
        let (jac, r) = assemble(&u)?;
        let (jac_bc, r_bc) = bcs.apply(&jac, &r, &u);

        let r_norm = SolverUtils::norm(&r_bc);
        if !r_norm.is_finite() {
            return Err(SimulationError::NumericOverflow(format!(
                "residual norm {} at Newton iteration {}",
                r_norm, iter
            )));
        }
        if iter == 0 {
            r0 = r_norm;
        }
        let rel = if r0 > 0.0 { r_norm / r0 } else { 0.0 };

        debug!(
            "Newton iteration {}: absolute residual = {:.3e}, relative residual = {:.3e}",
            iter, r_norm, rel
        );

        if r_norm <= config.abs_tolerance || rel <= config.rel_tolerance {
            debug!("Newton solver converged in {} iterations", iter);
            return Ok((
                u,
                NewtonStats {
                    iterations: iter,
                    initial_residual: r0,
                    residual_norm: r_norm,
                    relative_residual: rel,
                    last_linear_stats,
                },
            ));
        }

        if r_norm > config.divergence_factor * r0 || iter == config.max_iterations {
            return Err(SimulationError::SolveDiverged {
                iterations: iter,
                residual: r_norm,
            });
        }

        let rhs: Vec<f64> = r_bc.iter().map(|&x| -x).collect();
        let (delta, stats) = solver.solve(&jac_bc, &rhs)?;
        last_linear_stats = stats;

        if delta.iter().any(|d| !d.is_finite()) {
            return Err(SimulationError::NumericOverflow(format!(
                "non-finite Newton update at iteration {}",
                iter
            )));
        }

        for (ui, di) in u.iter_mut().zip(delta.iter()) {
            *ui += config.relaxation * di;
        }
        // Constrained dofs stay exactly at their prescribed values
        bcs.impose(&mut u);
    }

    // The loop returns on its last pass
    Err(SimulationError::SolveDiverged {
        iterations: config.max_iterations,
        residual: f64::NAN,
    })
}
