use sprs::CsMat;
use std::time::Instant;
use crate::error::{Result, SimulationError};
use super::solver::{LinearSolver, SolverStats, SolverUtils};

/// Dense LU solver
///
/// Copies the sparse matrix into a dense nalgebra matrix and factorizes it
/// with partial pivoting. Only practical for a few thousand unknowns; serves
/// as the reference the banded solver is checked against.
pub struct DirectSolver {
    name: String,
}

impl DirectSolver {
    pub fn new() -> Self {
        Self {
            name: "Direct (dense LU)".to_string(),
        }
    }
}

impl Default for DirectSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearSolver for DirectSolver {
    #[allow(non_snake_case)]
    fn solve(&mut self, A: &CsMat<f64>, b: &[f64]) -> Result<(Vec<f64>, SolverStats)> {
        let start = Instant::now();
        let n = b.len();

        let mut a_dense = nalgebra::DMatrix::zeros(n, n);
        for (row_idx, row) in A.outer_iterator().enumerate() {
            for (col_idx, &val) in row.iter() {
                a_dense[(row_idx, col_idx)] = val;
            }
        }

        let lu = a_dense.lu();
        let b_vec = nalgebra::DVector::from_column_slice(b);
        let x_vec = lu
            .solve(&b_vec)
            .ok_or_else(|| SimulationError::LinearSolve("singular matrix in dense LU".to_string()))?;

        let x: Vec<f64> = x_vec.iter().copied().collect();

        let mut stats = SolverStats::new();
        stats.solve_time = start.elapsed().as_secs_f64();
        SolverUtils::finish_stats(A, &x, b, &mut stats);

        Ok((x, stats))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
