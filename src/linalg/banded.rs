//! Banded LU with a reverse Cuthill–McKee ordering.
//!
//! The coupled Jacobian of a structured mesh has a narrow profile once its
//! unknowns are renumbered level by level. The reordered matrix is stored in
//! LAPACK general band layout and factorized with row pivoting, which handles
//! the zero pressure diagonal of the saddle-point block.

use std::collections::VecDeque;
use std::time::Instant;
use sprs::CsMat;
use crate::error::{Result, SimulationError};
use super::solver::{LinearSolver, SolverStats, SolverUtils};

/// Symmetrized adjacency lists of the sparsity pattern (diagonal excluded)
fn adjacency(a: &CsMat<f64>) -> Vec<Vec<usize>> {
    let n = a.rows();
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, row) in a.outer_iterator().enumerate() {
        for (j, _) in row.iter() {
            if i != j {
                adj[i].push(j);
                adj[j].push(i);
            }
        }
    }
    for list in &mut adj {
        list.sort_unstable();
        list.dedup();
    }
    adj
}

/// Breadth-first level structure from `root`, restricted to unvisited nodes
fn level_structure(adj: &[Vec<usize>], root: usize, visited: &[bool]) -> Vec<Vec<usize>> {
    let mut seen = visited.to_vec();
    seen[root] = true;
    let mut levels = vec![vec![root]];
    loop {
        let mut next = Vec::new();
        for &node in levels.last().map(|l| l.as_slice()).unwrap_or(&[]) {
            for &nb in &adj[node] {
                if !seen[nb] {
                    seen[nb] = true;
                    next.push(nb);
                }
            }
        }
        if next.is_empty() {
            return levels;
        }
        levels.push(next);
    }
}

/// George–Liu search for a pseudo-peripheral node of the component of `start`
fn pseudo_peripheral(adj: &[Vec<usize>], start: usize, visited: &[bool]) -> usize {
    let mut root = start;
    let mut levels = level_structure(adj, root, visited);
    loop {
        let candidate = levels
            .last()
            .and_then(|last| last.iter().copied().min_by_key(|&n| adj[n].len()))
            .unwrap_or(root);
        let trial = level_structure(adj, candidate, visited);
        if trial.len() > levels.len() {
            root = candidate;
            levels = trial;
        } else {
            return root;
        }
    }
}

/// Reverse Cuthill–McKee permutation: `perm[new] = old`
pub fn rcm_ordering(a: &CsMat<f64>) -> Vec<usize> {
    let n = a.rows();
    let adj = adjacency(a);
    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);

    // Components in order of their lowest-degree node
    let mut by_degree: Vec<usize> = (0..n).collect();
    by_degree.sort_by_key(|&i| adj[i].len());

    for &seed in &by_degree {
        if visited[seed] {
            continue;
        }
        let root = pseudo_peripheral(&adj, seed, &visited);

        let mut queue = VecDeque::new();
        visited[root] = true;
        queue.push_back(root);
        while let Some(node) = queue.pop_front() {
            order.push(node);
            let mut nbrs: Vec<usize> = adj[node].iter().copied().filter(|&m| !visited[m]).collect();
            nbrs.sort_by_key(|&m| adj[m].len());
            for m in nbrs {
                visited[m] = true;
                queue.push_back(m);
            }
        }
    }

    order.reverse();
    order
}

/// Lower and upper bandwidth of `a` under the permutation `inv[old] = new`
pub fn bandwidths(a: &CsMat<f64>, inv: &[usize]) -> (usize, usize) {
    let mut kl = 0;
    let mut ku = 0;
    for (i, row) in a.outer_iterator().enumerate() {
        let pi = inv[i];
        for (j, _) in row.iter() {
            let pj = inv[j];
            if pi > pj {
                kl = kl.max(pi - pj);
            } else {
                ku = ku.max(pj - pi);
            }
        }
    }
    (kl, ku)
}

/// LU factors of a general band matrix, LAPACK `gbtrf` storage
///
/// Element (i, j) of the factor lives at `ab[j * ldab + kl + ku + i - j]`;
/// the extra `kl` rows above the band hold fill from row interchanges.
#[derive(Debug, Clone)]
pub struct BandedLu {
    n: usize,
    kl: usize,
    ku: usize,
    ldab: usize,
    ab: Vec<f64>,
    ipiv: Vec<usize>,
}

impl BandedLu {
    /// Copy `a` (rows/columns renumbered by `inv`) into band storage and factorize
    ///
    /// # Errors
    /// `LinearSolve` on an exactly zero or non-finite pivot
    pub fn factorize(a: &CsMat<f64>, inv: &[usize]) -> Result<Self> {
        let n = a.rows();
        let (kl, ku) = bandwidths(a, inv);
        let kv = kl + ku;
        let ldab = 2 * kl + ku + 1;
        let mut ab = vec![0.0; n * ldab];

        for (i, row) in a.outer_iterator().enumerate() {
            let pi = inv[i];
            for (j, &val) in row.iter() {
                let pj = inv[j];
                ab[pj * ldab + kv + pi - pj] += val;
            }
        }

        let mut ipiv = vec![0; n];
        let mut ju = 0;
        for j in 0..n {
            let km = kl.min(n - 1 - j);
            let col = j * ldab + kv;

            let mut jp = 0;
            let mut max_abs = ab[col].abs();
            for r in 1..=km {
                let v = ab[col + r].abs();
                if v > max_abs {
                    max_abs = v;
                    jp = r;
                }
            }
            ipiv[j] = j + jp;

            if max_abs == 0.0 || !max_abs.is_finite() {
                return Err(SimulationError::LinearSolve(format!(
                    "zero or non-finite pivot in column {} of {}",
                    j, n
                )));
            }

            ju = ju.max((j + ku + jp).min(n - 1));

            if jp != 0 {
                for c in j..=ju {
                    let base = c * ldab + kv;
                    ab.swap(base + j - c, base + j + jp - c);
                }
            }

            let pivot = ab[col];
            for r in 1..=km {
                ab[col + r] /= pivot;
            }

            for c in (j + 1)..=ju {
                let base = c * ldab + kv;
                let u = ab[base + j - c];
                if u != 0.0 {
                    for r in 1..=km {
                        ab[base + j + r - c] -= ab[col + r] * u;
                    }
                }
            }
        }

        Ok(Self { n, kl, ku, ldab, ab, ipiv })
    }

    pub fn bandwidth(&self) -> (usize, usize) {
        (self.kl, self.ku)
    }

    /// Solve in place in the permuted numbering
    pub fn solve_in_place(&self, b: &mut [f64]) {
        let n = self.n;
        let kv = self.kl + self.ku;

        // L y = P b, pivots applied as they were generated
        if self.kl > 0 {
            for j in 0..n.saturating_sub(1) {
                let lm = self.kl.min(n - 1 - j);
                let l = self.ipiv[j];
                if l != j {
                    b.swap(l, j);
                }
                let bj = b[j];
                let col = j * self.ldab + kv;
                for r in 1..=lm {
                    b[j + r] -= self.ab[col + r] * bj;
                }
            }
        }

        // U x = y, upper bandwidth kl + ku
        for j in (0..n).rev() {
            let col = j * self.ldab + kv;
            b[j] /= self.ab[col];
            let bj = b[j];
            for i in j.saturating_sub(kv)..j {
                b[i] -= self.ab[col + i - j] * bj;
            }
        }
    }
}

/// Default solver for the Newton corrections: RCM ordering + banded LU
pub struct BandedLuSolver {
    name: String,
}

impl BandedLuSolver {
    pub fn new() -> Self {
        Self {
            name: "Banded LU (RCM)".to_string(),
        }
    }
}

impl Default for BandedLuSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearSolver for BandedLuSolver {
    #[allow(non_snake_case)]
    fn solve(&mut self, A: &CsMat<f64>, b: &[f64]) -> Result<(Vec<f64>, SolverStats)> {
        let start = Instant::now();
        let n = b.len();
        if A.rows() != n || A.cols() != n {
            return Err(SimulationError::LinearSolve(format!(
                "matrix is {}x{}, right-hand side has {} entries",
                A.rows(),
                A.cols(),
                n
            )));
        }
        // CSC input would swap the roles of rows and columns
        let csr;
        let A = if A.is_csr() {
            A
        } else {
            csr = A.to_csr();
            &csr
        };

        let perm = rcm_ordering(A);
        let mut inv = vec![0; n];
        for (new, &old) in perm.iter().enumerate() {
            inv[old] = new;
        }

        let lu = BandedLu::factorize(A, &inv)?;

        let mut y: Vec<f64> = perm.iter().map(|&old| b[old]).collect();
        lu.solve_in_place(&mut y);

        let mut x = vec![0.0; n];
        for (new, &old) in perm.iter().enumerate() {
            x[old] = y[new];
        }

        let mut stats = SolverStats::new();
        let (kl, ku) = lu.bandwidth();
        stats.bandwidth = kl.max(ku);
        stats.solve_time = start.elapsed().as_secs_f64();
        SolverUtils::finish_stats(A, &x, b, &mut stats);

        Ok((x, stats))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::DirectSolver;
    use sprs::TriMat;
    use approx::assert_relative_eq;

    /// 2D five-point Laplacian on a k×k grid plus a skew convection part
    fn grid_matrix(k: usize) -> CsMat<f64> {
        let n = k * k;
        let mut tri = TriMat::new((n, n));
        for iy in 0..k {
            for ix in 0..k {
                let i = iy * k + ix;
                tri.add_triplet(i, i, 4.0);
                if ix > 0 {
                    tri.add_triplet(i, i - 1, -1.3);
                }
                if ix + 1 < k {
                    tri.add_triplet(i, i + 1, -0.7);
                }
                if iy > 0 {
                    tri.add_triplet(i, i - k, -1.0);
                }
                if iy + 1 < k {
                    tri.add_triplet(i, i + k, -1.0);
                }
            }
        }
        tri.to_csr()
    }

    #[test]
    fn test_rcm_is_a_permutation() {
        let a = grid_matrix(6);
        let mut perm = rcm_ordering(&a);
        perm.sort_unstable();
        assert_eq!(perm, (0..36).collect::<Vec<_>>());
    }

    #[test]
    fn test_rcm_recovers_narrow_band_from_scrambled_numbering() {
        let k = 8;
        let a = grid_matrix(k);
        let n = k * k;

        // Scramble the numbering with a fixed stride permutation
        let scramble: Vec<usize> = (0..n).map(|i| (i * 29) % n).collect();
        let mut tri = TriMat::new((n, n));
        for (i, row) in a.outer_iterator().enumerate() {
            for (j, &v) in row.iter() {
                tri.add_triplet(scramble[i], scramble[j], v);
            }
        }
        let scrambled = tri.to_csr();

        let identity: Vec<usize> = (0..n).collect();
        let (kl0, ku0) = bandwidths(&scrambled, &identity);

        let perm = rcm_ordering(&scrambled);
        let mut inv = vec![0; n];
        for (new, &old) in perm.iter().enumerate() {
            inv[old] = new;
        }
        let (kl, ku) = bandwidths(&scrambled, &inv);

        assert!(kl.max(ku) <= 2 * k, "bandwidth {} after RCM", kl.max(ku));
        assert!(kl.max(ku) < kl0.max(ku0));
    }

    #[test]
    #[allow(non_snake_case)]
    fn test_matches_dense_solver_on_saddle_point_system() {
        // Convection-diffusion block with a zero-diagonal constraint row
        let k = 5;
        let base = grid_matrix(k);
        let n = k * k + 1;
        let mut tri = TriMat::new((n, n));
        for (i, row) in base.outer_iterator().enumerate() {
            for (j, &v) in row.iter() {
                tri.add_triplet(i, j, v);
            }
        }
        for i in 0..k {
            tri.add_triplet(i, n - 1, 1.0);
            tri.add_triplet(n - 1, i, 1.0);
        }
        let A = tri.to_csr();
        let b: Vec<f64> = (0..n).map(|i| ((i * 7) % 5) as f64 - 2.0).collect();

        let (x_band, stats) = BandedLuSolver::new().solve(&A, &b).unwrap();
        let (x_dense, _) = DirectSolver::new().solve(&A, &b).unwrap();

        for (a, d) in x_band.iter().zip(x_dense.iter()) {
            assert_relative_eq!(a, d, epsilon = 1e-10);
        }
        assert!(stats.relative_residual < 1e-12);
    }

    #[test]
    #[allow(non_snake_case)]
    fn test_pivoting_on_zero_leading_entry() {
        // [0 1; 1 1] x = [1; 2], x = [1; 1]
        let mut tri = TriMat::new((2, 2));
        tri.add_triplet(0, 1, 1.0);
        tri.add_triplet(1, 0, 1.0);
        tri.add_triplet(1, 1, 1.0);
        let A = tri.to_csr();

        let (x, _) = BandedLuSolver::new().solve(&A, &[1.0, 2.0]).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-14);
        assert_relative_eq!(x[1], 1.0, epsilon = 1e-14);
    }

    #[test]
    #[allow(non_snake_case)]
    fn test_singular_matrix_is_an_error() {
        let mut tri = TriMat::new((3, 3));
        tri.add_triplet(0, 0, 1.0);
        tri.add_triplet(1, 1, 1.0);
        tri.add_triplet(2, 2, 0.0);
        let A = tri.to_csr();

        assert!(matches!(
            BandedLuSolver::new().solve(&A, &[1.0, 1.0, 1.0]),
            Err(SimulationError::LinearSolve(_))
        ));
    }
}
