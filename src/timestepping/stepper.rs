//! Time loop for the coupled problem
//!
//! One step:
//! 1. fluid temperature floor T_f = max(T_n, floor)
//! 2. Newton solve for (v, p, T)
//! 3. melt post-processing
//! 4. output every `output_every` steps
//! 5. promote v, T and re-evaluate the viscosity
//! 6. t += dt

use log::{debug, info, warn};
use std::time::Instant;
use crate::error::Result;
use crate::fem::{CoupledSpaces, DirichletSet, FormCoefficients, PreviousFields, ThetaScheme, TimeStepStats, WeakFormAssembler};
use crate::linalg::{newton_solve, LinearSolver, NewtonConfig};
use crate::mesh::{FieldState, Mesh};
use crate::output::{Channel, OutputSink};
use crate::physics::{MeltPostProcessor, Rheology};
use crate::timestepping::compute_adaptive_timestep;

/// CFL bounds for adaptive stepping (non-dimensional)
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveSettings {
    pub cfl_target: f64,
    pub dt_min: f64,
    pub dt_max: f64,
}

/// Scalar settings of the time loop
#[derive(Debug, Clone)]
pub struct StepperSettings {
    pub scheme: ThetaScheme,
    pub t_end: f64,
    pub output_every: usize,
    /// Lower bound on T_f
    pub fluid_floor: f64,
    pub rayleigh: f64,
    pub fluid_coupling: f64,
    /// Reference viscosity for dimensional viscosity output
    pub mu_a: f64,
    pub newton: NewtonConfig,
    /// Fixed step when `None`
    pub adaptive: Option<AdaptiveSettings>,
}

/// Totals over a finished time loop
#[derive(Debug, Clone)]
pub struct RunStatistics {
    pub steps: usize,
    pub final_time: f64,
    pub newton_iterations: usize,
    pub outputs: usize,
    pub wall_time: f64,
    pub last_step: Option<TimeStepStats>,
}

pub struct TimeStepper<'a> {
    mesh: &'a Mesh,
    spaces: &'a CoupledSpaces,
    bcs: &'a DirichletSet,
    rheology: &'a dyn Rheology,
    post: MeltPostProcessor,
    solver: Box<dyn LinearSolver + 'a>,
    settings: StepperSettings,
    time: f64,
    step: usize,
}

impl<'a> TimeStepper<'a> {
    pub fn new(
        mesh: &'a Mesh,
        spaces: &'a CoupledSpaces,
        bcs: &'a DirichletSet,
        rheology: &'a dyn Rheology,
        post: MeltPostProcessor,
        solver: Box<dyn LinearSolver + 'a>,
        settings: StepperSettings,
    ) -> Self {
        Self {
            mesh,
            spaces,
            bcs,
            rheology,
            post,
            solver,
            settings,
            time: 0.0,
            step: 0,
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of completed steps
    pub fn step_count(&self) -> usize {
        self.step
    }

    pub fn settings(&self) -> &StepperSettings {
        &self.settings
    }

    pub fn is_finished(&self) -> bool {
        self.time >= self.settings.t_end
    }

    /// Step size for the next step
    fn next_dt(&self, state: &FieldState) -> f64 {
        match self.settings.adaptive {
            None => self.settings.scheme.dt,
            Some(a) => {
                let adaptive = compute_adaptive_timestep(
                    self.mesh,
                    &self.spaces.velocity,
                    &state.velocity_prev,
                    a.cfl_target,
                    a.dt_min,
                    a.dt_max,
                );
                debug!(
                    "Adaptive dt = {:.4e} (limited by {}, CFL = {:.3})",
                    adaptive.dt,
                    adaptive.limiting_constraint(),
                    adaptive.cfl_number()
                );
                adaptive.dt
            }
        }
    }

    /// Emit every channel at the current time
    pub fn write_output(&self, state: &FieldState, sink: &mut dyn OutputSink) -> Result<()> {
        for channel in Channel::ALL {
            let snapshot = channel.snapshot(self.mesh, self.spaces, state, self.settings.mu_a);
            sink.record(channel, self.time, &snapshot)?;
        }
        Ok(())
    }

    /// Advance one step
    ///
    /// # Errors
    /// Newton divergence, overflow and linear solve failures are returned
    /// unchanged. v, p and T then still hold the last accepted step.
    pub fn step(&mut self, state: &mut FieldState, sink: &mut dyn OutputSink) -> Result<TimeStepStats> {
        let dt = self.next_dt(state);
        let scheme = self.settings.scheme.with_dt(dt);

        state.update_fluid_temperature(self.settings.fluid_floor);

        let coefficients = FormCoefficients {
            scheme,
            rayleigh: self.settings.rayleigh,
            fluid_coupling: self.settings.fluid_coupling,
        };
        let assembler = WeakFormAssembler::new(self.mesh, self.spaces, self.rheology, coefficients);
        let layout = &self.spaces.layout;

        let (u, stats) = {
            let prev = PreviousFields {
                velocity: &state.velocity_prev,
                temperature: &state.temperature_prev,
                fluid_temperature: &state.fluid_temperature,
            };
            newton_solve(
                |u: &[f64]| assembler.assemble(u, &prev),
                self.bcs,
                self.solver.as_mut(),
                state.mixed(layout),
                &self.settings.newton,
            )?
        };
        state.set_from_mixed(layout, &u);

        self.post.apply(self.mesh, self.spaces, state)?;

        if self.step % self.settings.output_every == 0 {
            self.write_output(state, sink)?;
        }

        state.promote();
        state.update_viscosity(self.mesh, self.spaces, self.rheology)?;

        self.time += dt;
        self.step += 1;

        info!(
            "Step {}: t = {:.4}, dt = {:.4e}, Newton iterations = {}, residual = {:.3e}",
            self.step, self.time, dt, stats.iterations, stats.residual_norm
        );
        if 2 * stats.iterations > self.settings.newton.max_iterations {
            warn!(
                "Step {}: Newton needed {} of at most {} iterations",
                self.step, stats.iterations, self.settings.newton.max_iterations
            );
        }

        Ok(TimeStepStats {
            time: self.time,
            dt,
            iterations: stats.iterations,
            residual: stats.residual_norm,
        })
    }

    /// Step until `t ≥ t_end`
    pub fn run(&mut self, state: &mut FieldState, sink: &mut dyn OutputSink) -> Result<RunStatistics> {
        let start = Instant::now();
        let output_every = self.settings.output_every;
        let mut newton_iterations = 0;
        let mut outputs = 0;
        let mut last_step = None;

        while !self.is_finished() {
            if self.step % output_every == 0 {
                outputs += 1;
            }
            let stats = self.step(state, sink)?;
            newton_iterations += stats.iterations;
            last_step = Some(stats);
        }
        sink.finish()?;

        Ok(RunStatistics {
            steps: self.step,
            final_time: self.time,
            newton_iterations,
            outputs,
            wall_time: start.elapsed().as_secs_f64(),
            last_step,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fem::{Block, BoundaryConditions};
    use crate::linalg::BandedLuSolver;
    use crate::mesh::BoundaryRegion;
    use crate::mesh_generator::MeshGenerator;
    use crate::output::MemorySink;
    use crate::physics::{ConstantViscosity, MeltConstants};
    use approx::assert_relative_eq;
    use nalgebra::Point2;

    fn constants() -> MeltConstants {
        MeltConstants {
            reference_density: 3300.0,
            melt_density: 2900.0,
            thermal_expansion: 2.5e-5,
            reference_temperature: 1573.0,
            temperature_scale: 1278.0,
            gravity: 9.81,
            darcy: 1e-13,
            velocity_scale: 2e-7,
            pressure_scale: 1e9,
            length_scale: 1e6,
        }
    }

    fn settings(dt: f64, t_end: f64, output_every: usize) -> StepperSettings {
        StepperSettings {
            scheme: ThetaScheme::crank_nicolson(dt),
            t_end,
            output_every,
            fluid_floor: 1.013,
            rayleigh: 100.0,
            fluid_coupling: 1e-6,
            mu_a: 1.0,
            newton: NewtonConfig::default(),
            adaptive: None,
        }
    }

    /// Conductive layer between a cold top and a hot bottom, no slip
    fn boundary(mesh: &Mesh, spaces: &CoupledSpaces) -> DirichletSet {
        let mut conds = BoundaryConditions::new();
        for region in [BoundaryRegion::Top, BoundaryRegion::Bottom] {
            conds.add_region(Block::Velocity, 0, region, 0.0);
            conds.add_region(Block::Velocity, 1, region, 0.0);
        }
        conds.add_region(Block::Temperature, 0, BoundaryRegion::Top, 0.2);
        conds.add_region(Block::Temperature, 0, BoundaryRegion::Bottom, 1.2);
        conds.add_point(Block::Pressure, 0, Point2::new(0.0, 0.0), 0.0);
        conds.build(mesh, spaces).unwrap()
    }

    #[test]
    fn test_time_advances_by_dt_until_end() {
        let mesh = MeshGenerator::rectangle(1.0, 0.4, 4, 2).unwrap();
        let spaces = CoupledSpaces::new(&mesh);
        let bcs = boundary(&mesh, &spaces);
        let law = ConstantViscosity(1.0);
        let mut state = FieldState::new(&spaces);
        state.set_initial_temperature(spaces.temperature.interpolate(&mesh, |p| 1.2 - 2.5 * p.y));
        state.update_viscosity(&mesh, &spaces, &law).unwrap();

        let mut stepper = TimeStepper::new(
            &mesh,
            &spaces,
            &bcs,
            &law,
            MeltPostProcessor::new(constants()),
            Box::new(BandedLuSolver::new()),
            settings(0.1, 0.35, 2),
        );
        let mut sink = MemorySink::new();

        let mut times = vec![stepper.time()];
        while !stepper.is_finished() {
            let stats = stepper.step(&mut state, &mut sink).unwrap();
            assert_relative_eq!(stats.time - times.last().unwrap(), 0.1, epsilon = 1e-14);
            times.push(stats.time);
        }

        assert_eq!(stepper.step_count(), 4);
        assert!(stepper.time() >= 0.35);
        // Outputs at steps 0 and 2, stamped with the step's start time
        let out = sink.times(Channel::Temperature);
        assert_eq!(out.len(), 2);
        assert_relative_eq!(out[0], 0.0);
        assert_relative_eq!(out[1], 0.2, epsilon = 1e-14);
        assert_eq!(sink.len(), 2 * Channel::ALL.len());
    }

    #[test]
    fn test_uniform_state_is_hydrostatic() {
        let mesh = MeshGenerator::rectangle(1.0, 0.4, 4, 2).unwrap();
        let spaces = CoupledSpaces::new(&mesh);
        let mut conds = BoundaryConditions::new();
        for region in [BoundaryRegion::Top, BoundaryRegion::Bottom] {
            conds.add_region(Block::Velocity, 0, region, 0.0);
            conds.add_region(Block::Velocity, 1, region, 0.0);
            conds.add_region(Block::Temperature, 0, region, 1.2);
        }
        conds.add_point(Block::Pressure, 0, Point2::new(0.0, 0.0), 0.0);
        let bcs = conds.build(&mesh, &spaces).unwrap();

        let law = ConstantViscosity(1.0);
        let mut state = FieldState::new(&spaces);
        state.set_initial_temperature(vec![1.2; spaces.temperature.len()]);

        let mut stepper = TimeStepper::new(
            &mesh,
            &spaces,
            &bcs,
            &law,
            MeltPostProcessor::new(constants()),
            Box::new(BandedLuSolver::new()),
            settings(0.1, 0.1, 1),
        );
        let summary = stepper.run(&mut state, &mut MemorySink::new()).unwrap();

        assert_eq!(summary.steps, 1);
        assert_eq!(summary.outputs, 1);
        assert!(state.velocity.iter().all(|v| v.abs() < 1e-9));
        for t in &state.temperature {
            assert_relative_eq!(*t, 1.2, epsilon = 1e-9);
        }
        // Buoyancy is balanced by ∂p/∂y = T
        for base in 0..spaces.pressure.num_base_dofs() {
            let y = mesh.node(spaces.pressure.base_node(base)).y;
            assert_relative_eq!(state.pressure[base], 1.2 * y, epsilon = 1e-9);
        }
        assert_eq!(state.temperature_prev, state.temperature);
        assert!(state.is_finite());
    }
}
