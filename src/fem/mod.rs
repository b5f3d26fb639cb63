pub mod basis;
pub mod quadrature;
pub mod dof;
pub mod assembly;
pub mod boundary;
pub mod time_integration;

pub use basis::{AffineTriangle, Tri3Basis, Tri6Basis};
pub use quadrature::GaussQuadrature;
pub use dof::{Block, CoupledSpaces, ElementOrder, FieldKind, FunctionSpace, MixedLayout};
pub use assembly::{ElementSystem, FormCoefficients, PreviousFields, WeakFormAssembler, LOCAL_DOFS};
pub use boundary::{BoundaryConditions, BoundarySelector, DirichletCondition, DirichletSet};
pub use time_integration::{ThetaScheme, TimeStepStats};
