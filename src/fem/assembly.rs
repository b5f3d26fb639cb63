use nalgebra::{Matrix2, SMatrix, Vector2};
use sprs::{CsMat, TriMat};
use rayon::prelude::*;
use crate::error::{Result, SimulationError};
use crate::fem::{AffineTriangle, CoupledSpaces, GaussQuadrature, ThetaScheme, Tri6Basis};
use crate::mesh::{Mesh, Tri6Element};
use crate::physics::Rheology;

/// Local unknowns per element: 6 × 2 velocity, 3 pressure, 3 temperature
pub const LOCAL_DOFS: usize = 18;
const PRESSURE_BASE: usize = 12;
const TEMPERATURE_BASE: usize = 15;

type ElementMatrix = SMatrix<f64, LOCAL_DOFS, LOCAL_DOFS>;

/// Fields of the last accepted step, held fixed during a Newton solve
#[derive(Debug, Clone, Copy)]
pub struct PreviousFields<'a> {
    /// v_n on the velocity space
    pub velocity: &'a [f64],
    /// T_n on the temperature space
    pub temperature: &'a [f64],
    /// Fluid temperature T_f (numbered like the temperature space)
    pub fluid_temperature: &'a [f64],
}

/// Scalar coefficients of the coupled weak form
#[derive(Debug, Clone, Copy)]
pub struct FormCoefficients {
    pub scheme: ThetaScheme,
    /// Rayleigh number; diffusion enters as dt / Ra
    pub rayleigh: f64,
    /// Solid–fluid heat exchange coefficient k_s
    pub fluid_coupling: f64,
}

/// Element residual and (optionally) Jacobian with its global dof map
#[derive(Debug, Clone)]
pub struct ElementSystem {
    pub dofs: [usize; LOCAL_DOFS],
    pub residual: [f64; LOCAL_DOFS],
    pub jacobian: Option<Box<ElementMatrix>>,
}

/// Assembler for the coupled Stokes–energy residual and its Jacobian
///
/// Residual per test function, on every element:
///
/// ```text
/// r_v = 2μ ε(v):ε(v_t) − p div(v_t) − T v_t,y
/// r_p = p_t div(v)
/// r_T = T_t [(T − T_n) + dt v_θ·∇T_θ] + (dt/Ra) ∇T_t·∇T_θ + T_t k_s (T_f − T_θ) dt
/// ```
///
/// μ = μ(T, y) is evaluated from the current iterate at every quadrature
/// point, so the Jacobian carries the ∂μ/∂T coupling.
pub struct WeakFormAssembler<'a> {
    mesh: &'a Mesh,
    spaces: &'a CoupledSpaces,
    rheology: &'a dyn Rheology,
    coefficients: FormCoefficients,
    quadrature: GaussQuadrature,
}

impl<'a> WeakFormAssembler<'a> {
    pub fn new(
        mesh: &'a Mesh,
        spaces: &'a CoupledSpaces,
        rheology: &'a dyn Rheology,
        coefficients: FormCoefficients,
    ) -> Self {
        Self {
            mesh,
            spaces,
            rheology,
            coefficients,
            quadrature: GaussQuadrature::tri_6point(),
        }
    }

    pub fn coefficients(&self) -> &FormCoefficients {
        &self.coefficients
    }

    pub fn set_scheme(&mut self, scheme: ThetaScheme) {
        self.coefficients.scheme = scheme;
    }

    pub fn total_dofs(&self) -> usize {
        self.spaces.total_dofs()
    }

    /// Mixed dofs of an element in local order
    pub fn element_dofs(&self, elem: &Tri6Element) -> [usize; LOCAL_DOFS] {
        let layout = &self.spaces.layout;
        let mut dofs = [0; LOCAL_DOFS];
        for (a, &node) in elem.nodes.iter().enumerate() {
            for c in 0..2 {
                dofs[2 * a + c] = layout.velocity_offset() + self.spaces.velocity.node_dof(node, c);
            }
        }
        for (k, &node) in elem.vertices().iter().enumerate() {
            dofs[PRESSURE_BASE + k] = layout.pressure_offset() + self.spaces.pressure.node_dof(node, 0);
            dofs[TEMPERATURE_BASE + k] =
                layout.temperature_offset() + self.spaces.temperature.node_dof(node, 0);
        }
        dofs
    }

    /// Integrate one element
    ///
    /// # Errors
    /// `InvalidGeometry` for a degenerate element, `NumericOverflow` if the
    /// viscosity or the residual is not finite.
    #[allow(non_snake_case)]
    pub fn element_system(
        &self,
        elem: &Tri6Element,
        u: &[f64],
        prev: &PreviousFields,
        with_jacobian: bool,
    ) -> Result<ElementSystem> {
        let vertices = elem.vertices().map(|n| *self.mesh.node(n));
        let tri = AffineTriangle::new(vertices).ok_or_else(|| {
            SimulationError::InvalidGeometry(format!("degenerate element {:?}", elem.vertices()))
        })?;

        let dofs = self.element_dofs(elem);
        let u_loc = dofs.map(|d| u[d]);

        let mut v_old = [Vector2::zeros(); 6];
        for (a, &node) in elem.nodes.iter().enumerate() {
            v_old[a] = Vector2::new(
                prev.velocity[self.spaces.velocity.node_dof(node, 0)],
                prev.velocity[self.spaces.velocity.node_dof(node, 1)],
            );
        }
        let mut T_old = [0.0; 3];
        let mut T_f = [0.0; 3];
        for (k, &node) in elem.vertices().iter().enumerate() {
            let d = self.spaces.temperature.node_dof(node, 0);
            T_old[k] = prev.temperature[d];
            T_f[k] = prev.fluid_temperature[d];
        }

        let FormCoefficients { scheme, rayleigh, fluid_coupling: k_s } = self.coefficients;
        let dt = scheme.dt;
        let w_T = scheme.temperature_weight();
        let w_v = scheme.velocity_weight();

        let grad_psi = tri.grad_l;
        let det_j = tri.det_j.abs();

        let mut residual = [0.0; LOCAL_DOFS];
        let mut jac = if with_jacobian { Some(Box::new(ElementMatrix::zeros())) } else { None };

        for (l, &w) in self.quadrature.points.iter().zip(self.quadrature.weights.iter()) {
            let phi = Tri6Basis::shape_functions(l);
            let dphi = Tri6Basis::shape_derivatives_cartesian(l, &tri);
            let psi = *l;
            let jxw = w * det_j;

            // Current iterate
            let mut v = Vector2::zeros();
            let mut grad_v = Matrix2::zeros();
            let mut v_n = Vector2::zeros();
            for a in 0..6 {
                let va = Vector2::new(u_loc[2 * a], u_loc[2 * a + 1]);
                v += va * phi[a];
                grad_v += va * dphi[a].transpose();
                v_n += v_old[a] * phi[a];
            }
            let mut p = 0.0;
            let mut T = 0.0;
            let mut grad_T = Vector2::zeros();
            let mut T_n = 0.0;
            let mut grad_T_n = Vector2::zeros();
            let mut T_fluid = 0.0;
            for k in 0..3 {
                p += psi[k] * u_loc[PRESSURE_BASE + k];
                T += psi[k] * u_loc[TEMPERATURE_BASE + k];
                grad_T += grad_psi[k] * u_loc[TEMPERATURE_BASE + k];
                T_n += psi[k] * T_old[k];
                grad_T_n += grad_psi[k] * T_old[k];
                T_fluid += psi[k] * T_f[k];
            }

            let T_mid = scheme.temperature_mid(T, T_n);
            let grad_T_mid = grad_T * w_T + grad_T_n * (1.0 - w_T);
            let v_mid = v * w_v + v_n * (1.0 - w_v);

            let x = tri.to_cartesian(l);
            let (mu, dmu) = self.rheology.viscosity(T, &x);
            if !mu.is_finite() || !dmu.is_finite() {
                return Err(SimulationError::NumericOverflow(format!(
                    "viscosity {} at ({:.4}, {:.4}) for T = {}",
                    mu, x.x, x.y, T
                )));
            }

            let eps = (grad_v + grad_v.transpose()) * 0.5;
            let div_v = grad_v.trace();

            // ε(v):ε(φ_a e_c) = Σ_d ε_cd ∂_d φ_a
            let mut eps_dot = [[0.0; 2]; 6];
            for a in 0..6 {
                for c in 0..2 {
                    eps_dot[a][c] = eps[(c, 0)] * dphi[a].x + eps[(c, 1)] * dphi[a].y;
                }
            }

            for a in 0..6 {
                for c in 0..2 {
                    let buoyancy = if c == 1 { T * phi[a] } else { 0.0 };
                    residual[2 * a + c] += jxw * (2.0 * mu * eps_dot[a][c] - dphi[a][c] * p - buoyancy);
                }
            }

            let advection = v_mid.dot(&grad_T_mid);
            for k in 0..3 {
                residual[PRESSURE_BASE + k] += jxw * psi[k] * div_v;
                residual[TEMPERATURE_BASE + k] += jxw
                    * (psi[k] * ((T - T_n) + dt * advection)
                        + dt / rayleigh * grad_psi[k].dot(&grad_T_mid)
                        + psi[k] * k_s * (T_fluid - T_mid) * dt);
            }

            let Some(J) = jac.as_deref_mut() else { continue };

            for a in 0..6 {
                for c in 0..2 {
                    let i = 2 * a + c;

                    // Momentum wrt velocity
                    for b in 0..6 {
                        let grad_dot = dphi[a].dot(&dphi[b]);
                        for e in 0..2 {
                            let delta = if c == e { grad_dot } else { 0.0 };
                            J[(i, 2 * b + e)] += jxw * mu * (delta + dphi[a][e] * dphi[b][c]);
                        }
                    }

                    for m in 0..3 {
                        // Momentum wrt pressure
                        J[(i, PRESSURE_BASE + m)] -= jxw * dphi[a][c] * psi[m];

                        // Momentum wrt temperature: viscosity sensitivity and buoyancy
                        let buoyancy = if c == 1 { psi[m] * phi[a] } else { 0.0 };
                        J[(i, TEMPERATURE_BASE + m)] +=
                            jxw * (2.0 * dmu * psi[m] * eps_dot[a][c] - buoyancy);
                    }
                }
            }

            for k in 0..3 {
                for b in 0..6 {
                    for e in 0..2 {
                        // Continuity wrt velocity
                        J[(PRESSURE_BASE + k, 2 * b + e)] += jxw * psi[k] * dphi[b][e];
                        // Energy wrt velocity (advecting field)
                        J[(TEMPERATURE_BASE + k, 2 * b + e)] +=
                            jxw * psi[k] * dt * w_v * phi[b] * grad_T_mid[e];
                    }
                }

                // Energy wrt temperature
                for m in 0..3 {
                    let implicit = psi[k] * dt * v_mid.dot(&grad_psi[m])
                        + dt / rayleigh * grad_psi[k].dot(&grad_psi[m])
                        - psi[k] * k_s * dt * psi[m];
                    J[(TEMPERATURE_BASE + k, TEMPERATURE_BASE + m)] +=
                        jxw * (psi[k] * psi[m] + w_T * implicit);
                }
            }
        }

        if residual.iter().any(|r| !r.is_finite()) {
            return Err(SimulationError::NumericOverflow(format!(
                "non-finite residual on element {:?}",
                elem.vertices()
            )));
        }

        Ok(ElementSystem { dofs, residual, jacobian: jac })
    }

    /// Raw global residual (no boundary conditions applied)
    pub fn residual(&self, u: &[f64], prev: &PreviousFields) -> Result<Vec<f64>> {
        let systems: Vec<ElementSystem> = self
            .mesh
            .connectivity
            .tri6_elements
            .par_iter()
            .map(|elem| self.element_system(elem, u, prev, false))
            .collect::<Result<_>>()?;

        let mut r = vec![0.0; self.total_dofs()];
        for sys in &systems {
            for (i, &gi) in sys.dofs.iter().enumerate() {
                r[gi] += sys.residual[i];
            }
        }
        Ok(r)
    }

    /// Global Jacobian (CSR) and residual, element kernels in parallel
    pub fn assemble(&self, u: &[f64], prev: &PreviousFields) -> Result<(CsMat<f64>, Vec<f64>)> {
        // Each element builds its own contribution, the scatter is sequential
        let systems: Vec<ElementSystem> = self
            .mesh
            .connectivity
            .tri6_elements
            .par_iter()
            .map(|elem| self.element_system(elem, u, prev, true))
            .collect::<Result<_>>()?;

        Ok(self.scatter(&systems))
    }

    /// Serial assembly, used to cross-check the parallel path
    pub fn assemble_serial(&self, u: &[f64], prev: &PreviousFields) -> Result<(CsMat<f64>, Vec<f64>)> {
        let mut systems = Vec::with_capacity(self.mesh.num_elements());
        for elem in &self.mesh.connectivity.tri6_elements {
            systems.push(self.element_system(elem, u, prev, true)?);
        }
        Ok(self.scatter(&systems))
    }

    fn scatter(&self, systems: &[ElementSystem]) -> (CsMat<f64>, Vec<f64>) {
        let n = self.total_dofs();
        let mut triplets = TriMat::with_capacity((n, n), systems.len() * LOCAL_DOFS * LOCAL_DOFS + n);
        let mut r = vec![0.0; n];

        // Structural diagonal, the pressure block has none of its own
        for i in 0..n {
            triplets.add_triplet(i, i, 0.0);
        }

        for sys in systems {
            for (i, &gi) in sys.dofs.iter().enumerate() {
                r[gi] += sys.residual[i];
            }
            if let Some(k) = &sys.jacobian {
                for (i, &gi) in sys.dofs.iter().enumerate() {
                    for (j, &gj) in sys.dofs.iter().enumerate() {
                        let val = k[(i, j)];
                        if val != 0.0 {
                            triplets.add_triplet(gi, gj, val);
                        }
                    }
                }
            }
        }

        (triplets.to_csr(), r)
    }
}
