pub mod viscosity;
pub mod scaling;
pub mod thermal;
pub mod melt;

pub use viscosity::{ArrheniusViscosity, ConstantViscosity, Rheology};
pub use scaling::NondimensionalScales;
pub use thermal::{InitialTemperature, LabProfile};
pub use melt::{MeltConstants, MeltFields, MeltPostProcessor};
