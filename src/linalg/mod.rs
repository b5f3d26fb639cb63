pub mod solver;
pub mod direct;
pub mod banded;
pub mod newton;

pub use solver::{LinearOperator, LinearSolver, SolverStats, SolverUtils};
pub use direct::DirectSolver;
pub use banded::{rcm_ordering, BandedLu, BandedLuSolver};
pub use newton::{newton_solve, NewtonConfig, NewtonStats};
