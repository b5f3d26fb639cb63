/// Melt transport derived from a converged (v, p, T) state
///
/// ```text
/// ρ_solid = ρ0 (1 − α (T ΔT − T_ref))
/// Δρ      = ρ_solid − ρ_melt
/// v_melt  = v w0 − K (∇p p0 / h − Δρ g ŷ)
/// ```
///
/// K is the Darcy mobility. ∇p is recovered on the P2 nodes by area-weighted
/// averaging of the element-constant P1 gradients; Δρ at edge midpoints is the
/// mean of the two edge vertices. The result is dimensional (m/s).

use nalgebra::Vector2;
use crate::config::SimulationConfig;
use crate::error::{Result, SimulationError};
use crate::fem::{AffineTriangle, CoupledSpaces, Tri3Basis};
use crate::mesh::{FieldState, Mesh};
use crate::physics::NondimensionalScales;

/// Dimensional constants of the melt model
#[derive(Debug, Clone, Copy)]
pub struct MeltConstants {
    pub reference_density: f64,
    pub melt_density: f64,
    pub thermal_expansion: f64,
    pub reference_temperature: f64,
    pub temperature_scale: f64,
    pub gravity: f64,
    pub darcy: f64,
    pub velocity_scale: f64,
    pub pressure_scale: f64,
    pub length_scale: f64,
}

impl MeltConstants {
    pub fn new(config: &SimulationConfig, scales: &NondimensionalScales) -> Self {
        let p = &config.physics;
        Self {
            reference_density: p.reference_density,
            melt_density: p.melt_density,
            thermal_expansion: p.thermal_expansion,
            reference_temperature: p.reference_temperature,
            temperature_scale: scales.delta_t,
            gravity: p.gravity,
            darcy: p.darcy,
            velocity_scale: scales.w0,
            pressure_scale: scales.p0,
            length_scale: p.length_scale,
        }
    }

    /// ρ_solid at non-dimensional temperature `t`
    pub fn solid_density(&self, t: f64) -> f64 {
        self.reference_density
            * (1.0 - self.thermal_expansion * (t * self.temperature_scale - self.reference_temperature))
    }
}

/// Derived fields of one post-processing pass
#[derive(Debug, Clone, PartialEq)]
pub struct MeltFields {
    /// P1
    pub solid_density: Vec<f64>,
    /// P1
    pub density_contrast: Vec<f64>,
    /// Non-dimensional ∇p, P2 vector
    pub pressure_gradient: Vec<f64>,
    /// m/s, P2 vector
    pub melt_velocity: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct MeltPostProcessor {
    constants: MeltConstants,
}

impl MeltPostProcessor {
    pub fn new(constants: MeltConstants) -> Self {
        Self { constants }
    }

    pub fn constants(&self) -> &MeltConstants {
        &self.constants
    }

    /// Compute the derived fields from velocity, pressure and temperature
    ///
    /// # Errors
    /// `InvalidGeometry` for a degenerate element, `NumericOverflow` if a
    /// derived value is not finite.
    pub fn compute(
        &self,
        mesh: &Mesh,
        spaces: &CoupledSpaces,
        velocity: &[f64],
        pressure: &[f64],
        temperature: &[f64],
    ) -> Result<MeltFields> {
        let c = &self.constants;

        let solid_density: Vec<f64> = temperature.iter().map(|&t| c.solid_density(t)).collect();
        let density_contrast: Vec<f64> = solid_density.iter().map(|rho| rho - c.melt_density).collect();

        let pressure_gradient = self.recover_gradient(mesh, spaces, pressure)?;

        let vspace = &spaces.velocity;
        let tspace = &spaces.temperature;
        let parents = mesh.connectivity.midpoint_parents(mesh.num_nodes());
        let grad_scale = c.pressure_scale / c.length_scale;

        let mut melt_velocity = vec![0.0; vspace.len()];
        for base in 0..vspace.num_base_dofs() {
            let node = vspace.base_node(base);
            let drho = match tspace.dof(node, 0) {
                Some(d) => density_contrast[d],
                None => match parents[node] {
                    Some((a, b)) => {
                        0.5 * (density_contrast[tspace.node_dof(a, 0)] + density_contrast[tspace.node_dof(b, 0)])
                    }
                    None => {
                        return Err(SimulationError::InvalidGeometry(format!(
                            "node {} is neither a vertex nor an edge midpoint",
                            node
                        )))
                    }
                },
            };

            let (ix, iy) = (2 * base, 2 * base + 1);
            let vx = velocity[ix] * c.velocity_scale - c.darcy * pressure_gradient[ix] * grad_scale;
            let vy = velocity[iy] * c.velocity_scale
                - c.darcy * (pressure_gradient[iy] * grad_scale - drho * c.gravity);
            melt_velocity[ix] = vx;
            melt_velocity[iy] = vy;
        }

        if let Some(bad) = melt_velocity.iter().position(|v| !v.is_finite()) {
            return Err(SimulationError::NumericOverflow(format!(
                "melt velocity dof {} is {}",
                bad, melt_velocity[bad]
            )));
        }

        Ok(MeltFields {
            solid_density,
            density_contrast,
            pressure_gradient,
            melt_velocity,
        })
    }

    /// Post-process the current fields of `state` in place
    pub fn apply(&self, mesh: &Mesh, spaces: &CoupledSpaces, state: &mut FieldState) -> Result<()> {
        let fields = self.compute(mesh, spaces, &state.velocity, &state.pressure, &state.temperature)?;
        state.solid_density = fields.solid_density;
        state.density_contrast = fields.density_contrast;
        state.pressure_gradient = fields.pressure_gradient;
        state.melt_velocity = fields.melt_velocity;
        Ok(())
    }

    /// Area-weighted nodal average of the element P1 gradients
    fn recover_gradient(&self, mesh: &Mesh, spaces: &CoupledSpaces, pressure: &[f64]) -> Result<Vec<f64>> {
        let vspace = &spaces.velocity;
        let pspace = &spaces.pressure;

        let mut sum = vec![Vector2::zeros(); vspace.num_base_dofs()];
        let mut weight = vec![0.0; vspace.num_base_dofs()];

        for elem in &mesh.connectivity.tri6_elements {
            let vertices = elem.vertices();
            let tri = AffineTriangle::new(vertices.map(|n| *mesh.node(n))).ok_or_else(|| {
                SimulationError::InvalidGeometry(format!("degenerate element {:?}", vertices))
            })?;
            let values = vertices.map(|n| pressure[pspace.node_dof(n, 0)]);
            let grad = Tri3Basis::field_gradient(&tri, &values);
            let area = tri.area();

            for &node in &elem.nodes {
                let base = vspace.node_dof(node, 0) / 2;
                sum[base] += grad * area;
                weight[base] += area;
            }
        }

        let mut out = vec![0.0; vspace.len()];
        for (base, (g, w)) in sum.iter().zip(weight.iter()).enumerate() {
            if *w > 0.0 {
                out[2 * base] = g.x / w;
                out[2 * base + 1] = g.y / w;
            }
        }
        Ok(out)
    }
}
