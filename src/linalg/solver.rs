use sprs::CsMat;
use crate::error::Result;

/// Statistics from one linear solve
#[derive(Debug, Clone)]
pub struct SolverStats {
    /// Half bandwidth after reordering (0 for dense solvers)
    pub bandwidth: usize,

    /// Final residual norm ||r|| = ||b - Ax||
    pub residual_norm: f64,

    /// Relative residual ||r|| / ||b||
    pub relative_residual: f64,

    /// Solve time in seconds
    pub solve_time: f64,
}

impl SolverStats {
    pub fn new() -> Self {
        Self {
            bandwidth: 0,
            residual_norm: 0.0,
            relative_residual: 0.0,
            solve_time: 0.0,
        }
    }
}

impl Default for SolverStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Matrix-vector product on a CSR matrix
pub trait LinearOperator {
    /// out = A * v
    fn apply(&self, v: &[f64]) -> Vec<f64>;

    fn rows(&self) -> usize;
}

impl LinearOperator for CsMat<f64> {
    fn apply(&self, v: &[f64]) -> Vec<f64> {
        let mut result = vec![0.0; self.rows()];
        for (row_idx, row) in self.outer_iterator().enumerate() {
            result[row_idx] = row.iter().map(|(col_idx, &val)| val * v[col_idx]).sum();
        }
        result
    }

    fn rows(&self) -> usize {
        self.rows()
    }
}

/// Linear system solver for the Newton corrections
///
/// Solves Ax = b for x. The coupled Jacobian is non-symmetric and indefinite,
/// so implementations must pivot.
pub trait LinearSolver {
    /// # Errors
    /// `LinearSolve` if the matrix is singular to working precision
    #[allow(non_snake_case)]
    fn solve(&mut self, A: &CsMat<f64>, b: &[f64]) -> Result<(Vec<f64>, SolverStats)>;

    fn name(&self) -> &str;
}

/// Helper functions for solver validation
pub struct SolverUtils;

impl SolverUtils {
    /// Compute residual r = b - Ax
    #[allow(non_snake_case)]
    pub fn compute_residual<O: LinearOperator>(A: &O, x: &[f64], b: &[f64]) -> Vec<f64> {
        let ax = A.apply(x);
        b.iter().zip(ax.iter()).map(|(&bi, &axi)| bi - axi).collect()
    }

    /// Compute L2 norm of a vector
    pub fn norm(v: &[f64]) -> f64 {
        v.iter().map(|&x| x * x).sum::<f64>().sqrt()
    }

    /// Compute residual norm ||b - Ax||
    #[allow(non_snake_case)]
    pub fn residual_norm<O: LinearOperator>(A: &O, x: &[f64], b: &[f64]) -> f64 {
        Self::norm(&Self::compute_residual(A, x, b))
    }

    /// Fill `stats` residual fields for solution `x`
    #[allow(non_snake_case)]
    pub fn finish_stats<O: LinearOperator>(A: &O, x: &[f64], b: &[f64], stats: &mut SolverStats) {
        stats.residual_norm = Self::residual_norm(A, x, b);
        let b_norm = Self::norm(b);
        stats.relative_residual = if b_norm < 1e-14 {
            stats.residual_norm
        } else {
            stats.residual_norm / b_norm
        };
    }
}
