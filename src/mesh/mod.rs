pub mod topology;
pub mod geometry;
pub mod fields;
pub mod state;

pub use topology::{Connectivity, Tri6Element};
pub use geometry::{near, BoundaryRegion, Geometry, Mesh, PeriodicPairs, NEAR_TOLERANCE};
pub use fields::{FieldSnapshot, ScalarField, VectorField};
pub use state::FieldState;
