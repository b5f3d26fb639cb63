pub mod error;
pub mod config;
pub mod mesh;
pub mod mesh_generator;
pub mod fem;
pub mod linalg;
pub mod physics;
pub mod timestepping;
pub mod output;
pub mod simulation;
pub mod sweep;

pub use error::{Result, SimulationError};
pub use config::{LinearSolverKind, RunParameters, SimulationConfig};
pub use mesh::{BoundaryRegion, FieldSnapshot, FieldState, Mesh, PeriodicPairs, ScalarField, VectorField};
pub use mesh_generator::MeshGenerator;
pub use fem::{Block, BoundaryConditions, CoupledSpaces, DirichletSet, FieldKind, FunctionSpace, PreviousFields, ThetaScheme, WeakFormAssembler};
pub use linalg::{newton_solve, BandedLuSolver, DirectSolver, LinearSolver, NewtonConfig, NewtonStats};
pub use physics::{ArrheniusViscosity, InitialTemperature, MeltPostProcessor, NondimensionalScales, Rheology};
pub use timestepping::{compute_adaptive_timestep, AdaptiveTimestep, RunStatistics, StepperSettings, TimeStepper};
pub use output::{Channel, CsvSink, MemorySink, NullSink, OutputSink};
pub use simulation::{run_job, RunReport, Simulation};
pub use sweep::{run_sweep, SweepReport};
