//! CFL-limited step size
//!
//! Used when `[time] use_adaptive = true`; the fixed step is the default.
//! All quantities are non-dimensional.

use crate::fem::FunctionSpace;
use crate::mesh::Mesh;

/// Adaptive step size and the diagnostics behind it
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveTimestep {
    /// Chosen step size
    pub dt: f64,
    /// Unclamped CFL step size
    pub cfl_dt: f64,
    /// Largest nodal speed
    pub max_velocity: f64,
    /// Shortest element edge
    pub min_cell_size: f64,
}

impl AdaptiveTimestep {
    /// Which bound set the step size
    pub fn limiting_constraint(&self) -> &'static str {
        if (self.dt - self.cfl_dt).abs() <= 1e-12 * self.dt.abs().max(1.0) {
            "CFL"
        } else if self.dt > self.cfl_dt {
            "dt_min"
        } else {
            "dt_max"
        }
    }

    pub fn cfl_number(&self) -> f64 {
        if self.max_velocity > 1e-20 && self.min_cell_size > 0.0 {
            self.dt * self.max_velocity / self.min_cell_size
        } else {
            0.0
        }
    }
}

/// dt = clamp(cfl_target · h_min / |v|_max, dt_min, dt_max)
///
/// A velocity field at rest yields `dt_max`.
pub fn compute_adaptive_timestep(
    mesh: &Mesh,
    velocity_space: &FunctionSpace,
    velocity: &[f64],
    cfl_target: f64,
    dt_min: f64,
    dt_max: f64,
) -> AdaptiveTimestep {
    let min_cell_size = mesh.min_edge_length();

    let max_velocity = (0..velocity_space.num_base_dofs())
        .map(|b| velocity[2 * b].hypot(velocity[2 * b + 1]))
        .fold(0.0, f64::max);

    let cfl_dt = if max_velocity > 1e-20 {
        cfl_target * min_cell_size / max_velocity
    } else {
        dt_max
    };

    let dt = cfl_dt.max(dt_min).min(dt_max);

    AdaptiveTimestep {
        dt,
        cfl_dt,
        max_velocity,
        min_cell_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fem::FieldKind;
    use crate::mesh_generator::MeshGenerator;
    use approx::assert_relative_eq;

    fn setup() -> (Mesh, FunctionSpace) {
        let mesh = MeshGenerator::rectangle(1.0, 0.4, 10, 4).unwrap();
        let space = FunctionSpace::new(&mesh, FieldKind::Velocity, &mesh.periodic);
        (mesh, space)
    }

    #[test]
    fn test_cfl_limited_step() {
        let (mesh, space) = setup();
        let v = space.interpolate_vector(&mesh, |_| nalgebra::Vector2::new(3.0, 4.0));

        let adaptive = compute_adaptive_timestep(&mesh, &space, &v, 0.5, 1e-6, 1.0);
        assert_relative_eq!(adaptive.min_cell_size, 0.1, epsilon = 1e-12);
        assert_relative_eq!(adaptive.max_velocity, 5.0, epsilon = 1e-12);
        assert_relative_eq!(adaptive.dt, 0.5 * 0.1 / 5.0, epsilon = 1e-12);
        assert_eq!(adaptive.limiting_constraint(), "CFL");
        assert_relative_eq!(adaptive.cfl_number(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_rest_uses_dt_max() {
        let (mesh, space) = setup();
        let v = vec![0.0; space.len()];

        let adaptive = compute_adaptive_timestep(&mesh, &space, &v, 0.5, 1e-6, 0.25);
        assert_eq!(adaptive.dt, 0.25);
        assert_eq!(adaptive.cfl_number(), 0.0);
    }

    #[test]
    fn test_fast_flow_is_clamped_to_dt_min() {
        let (mesh, space) = setup();
        let v = space.interpolate_vector(&mesh, |_| nalgebra::Vector2::new(1e9, 0.0));

        let adaptive = compute_adaptive_timestep(&mesh, &space, &v, 0.5, 1e-3, 1.0);
        assert_eq!(adaptive.dt, 1e-3);
        assert_eq!(adaptive.limiting_constraint(), "dt_min");
    }
}
