//! Time integration of the coupled problem
//!
//! `stepper` owns the time loop; `adaptive` provides the optional CFL-limited
//! step size.

pub mod adaptive;
pub mod stepper;

pub use adaptive::{compute_adaptive_timestep, AdaptiveTimestep};
pub use stepper::{AdaptiveSettings, RunStatistics, StepperSettings, TimeStepper};
