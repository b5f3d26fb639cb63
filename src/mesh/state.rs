/// Coefficient vectors of every field carried between time steps
///
/// "prev" vectors hold the last accepted step and stay fixed while a Newton
/// solve works on the current ones.

use crate::error::{Result, SimulationError};
use crate::fem::{CoupledSpaces, MixedLayout};
use crate::mesh::Mesh;
use crate::physics::Rheology;

#[derive(Debug, Clone)]
pub struct FieldState {
    /// P2 vector, interleaved
    pub velocity: Vec<f64>,
    pub velocity_prev: Vec<f64>,
    /// P1
    pub pressure: Vec<f64>,
    pub temperature: Vec<f64>,
    pub temperature_prev: Vec<f64>,
    /// Non-dimensional viscosity at P1 dofs
    pub viscosity: Vec<f64>,
    /// Fluid temperature floor T_f
    pub fluid_temperature: Vec<f64>,
    /// Solid density (kg/m³) at P1 dofs
    pub solid_density: Vec<f64>,
    /// ρ_solid − ρ_melt at P1 dofs
    pub density_contrast: Vec<f64>,
    /// Dimensional melt velocity (m/s), P2 vector
    pub melt_velocity: Vec<f64>,
    /// Recovered non-dimensional ∇p, P2 vector
    pub pressure_gradient: Vec<f64>,
}

impl FieldState {
    /// Zero-initialised state sized for `spaces`
    pub fn new(spaces: &CoupledSpaces) -> Self {
        let nv = spaces.velocity.len();
        let np = spaces.pressure.len();
        let nt = spaces.temperature.len();

        Self {
            velocity: vec![0.0; nv],
            velocity_prev: vec![0.0; nv],
            pressure: vec![0.0; np],
            temperature: vec![0.0; nt],
            temperature_prev: vec![0.0; nt],
            viscosity: vec![0.0; nt],
            fluid_temperature: vec![0.0; nt],
            solid_density: vec![0.0; nt],
            density_contrast: vec![0.0; nt],
            melt_velocity: vec![0.0; nv],
            pressure_gradient: vec![0.0; nv],
        }
    }

    /// Set both the current and previous temperature
    ///
    /// # Panics
    /// If the length does not match the temperature space
    pub fn set_initial_temperature(&mut self, temperature: Vec<f64>) {
        assert_eq!(temperature.len(), self.temperature.len(), "temperature length mismatch");
        self.temperature_prev = temperature.clone();
        self.temperature = temperature;
    }

    /// Current (v, p, T) packed as one mixed vector
    pub fn mixed(&self, layout: &MixedLayout) -> Vec<f64> {
        layout.pack(&self.velocity, &self.pressure, &self.temperature)
    }

    /// Unpack a converged mixed vector into the current fields
    pub fn set_from_mixed(&mut self, layout: &MixedLayout, u: &[f64]) {
        let (v, p, t) = layout.split(u);
        self.velocity.copy_from_slice(v);
        self.pressure.copy_from_slice(p);
        self.temperature.copy_from_slice(t);
    }

    /// T_f = max(T_prev, floor)
    pub fn update_fluid_temperature(&mut self, floor: f64) {
        for (tf, &t) in self.fluid_temperature.iter_mut().zip(self.temperature_prev.iter()) {
            *tf = t.max(floor);
        }
    }

    /// Re-interpolate the viscosity from the current temperature
    ///
    /// # Errors
    /// `NumericOverflow` if the law returns a non-finite value
    pub fn update_viscosity(&mut self, mesh: &Mesh, spaces: &CoupledSpaces, law: &dyn Rheology) -> Result<()> {
        let space = &spaces.temperature;
        for base in 0..space.num_base_dofs() {
            let p = mesh.node(space.base_node(base));
            let (mu, _) = law.viscosity(self.temperature[base], p);
            if !mu.is_finite() {
                return Err(SimulationError::NumericOverflow(format!(
                    "viscosity {} at node ({:.4}, {:.4})",
                    mu, p.x, p.y
                )));
            }
            self.viscosity[base] = mu;
        }
        Ok(())
    }

    /// Accept the current step: v → v_prev, T → T_prev
    pub fn promote(&mut self) {
        self.velocity_prev.copy_from_slice(&self.velocity);
        self.temperature_prev.copy_from_slice(&self.temperature);
    }

    /// True if every carried vector is finite
    pub fn is_finite(&self) -> bool {
        [
            &self.velocity,
            &self.pressure,
            &self.temperature,
            &self.viscosity,
            &self.melt_velocity,
        ]
        .iter()
        .all(|v| v.iter().all(|x| x.is_finite()))
    }
}
