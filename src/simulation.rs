//! One (μa, Tb) run: setup, time loop and run summary
//!
//! Setup errors (`Config`, `InvalidGeometry`, `ConstraintConflict`) surface from
//! [`Simulation::new`] before any step is taken.

use log::{info, warn};
use nalgebra::Point2;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use crate::config::{LinearSolverKind, RunParameters, SimulationConfig};
use crate::error::Result;
use crate::fem::{Block, BoundaryConditions, CoupledSpaces, DirichletSet, ThetaScheme};
use crate::linalg::{BandedLuSolver, DirectSolver, LinearSolver};
use crate::mesh::{BoundaryRegion, FieldState, Mesh};
use crate::mesh_generator::MeshGenerator;
use crate::output::{CsvSink, NullSink, OutputSink};
use crate::physics::{ArrheniusViscosity, InitialTemperature, MeltConstants, MeltPostProcessor, NondimensionalScales};
use crate::timestepping::{AdaptiveSettings, RunStatistics, StepperSettings, TimeStepper};

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run: RunParameters,
    pub statistics: RunStatistics,
    /// Run directory, when anything was written to disk
    pub directory: Option<PathBuf>,
}

/// Everything a run needs, built once before stepping
pub struct Simulation {
    config: SimulationConfig,
    run: RunParameters,
    scales: NondimensionalScales,
    mesh: Mesh,
    spaces: CoupledSpaces,
    bcs: DirichletSet,
    law: ArrheniusViscosity,
    state: FieldState,
}

impl Simulation {
    /// Build mesh, spaces, boundary conditions and the initial state
    pub fn new(config: &SimulationConfig, run: RunParameters) -> Result<Self> {
        config.validate()?;
        let scales = NondimensionalScales::new(config, &run);
        let d = &config.domain;
        let mesh = MeshGenerator::rectangle(d.width, d.height, d.nx, d.ny)?;
        let spaces = CoupledSpaces::new(&mesh);
        let bcs = Self::boundary_conditions(&scales).build(&mesh, &spaces)?;
        let law = scales.viscosity_law(config);

        let mut state = FieldState::new(&spaces);
        let initial = InitialTemperature::new(&config.temperature, &scales, d.width, d.height);
        state.set_initial_temperature(initial.interpolate(&mesh, &spaces.temperature));
        state.update_viscosity(&mesh, &spaces, &law)?;

        Ok(Self {
            config: config.clone(),
            run,
            scales,
            mesh,
            spaces,
            bcs,
            law,
            state,
        })
    }

    /// No-slip cold top, slipping hot base, pressure pinned at the origin
    pub fn boundary_conditions(scales: &NondimensionalScales) -> BoundaryConditions {
        let mut conds = BoundaryConditions::new();
        conds
            .add_region(Block::Velocity, 0, BoundaryRegion::Top, 0.0)
            .add_region(Block::Velocity, 1, BoundaryRegion::Top, 0.0)
            .add_region(Block::Temperature, 0, BoundaryRegion::Top, scales.surface_temperature())
            .add_region(Block::Velocity, 0, BoundaryRegion::Bottom, scales.vslip)
            .add_region(Block::Velocity, 1, BoundaryRegion::Bottom, 0.0)
            .add_region(Block::Temperature, 0, BoundaryRegion::Bottom, scales.bottom_temperature())
            .add_point(Block::Pressure, 0, Point2::new(0.0, 0.0), 0.0);
        conds
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn run_parameters(&self) -> &RunParameters {
        &self.run
    }

    pub fn scales(&self) -> &NondimensionalScales {
        &self.scales
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn spaces(&self) -> &CoupledSpaces {
        &self.spaces
    }

    pub fn boundary(&self) -> &DirichletSet {
        &self.bcs
    }

    pub fn viscosity_law(&self) -> &ArrheniusViscosity {
        &self.law
    }

    pub fn state(&self) -> &FieldState {
        &self.state
    }

    pub fn stepper_settings(&self) -> StepperSettings {
        let time = &self.config.time;
        StepperSettings {
            scheme: ThetaScheme::new(time.theta, self.scales.dt),
            t_end: self.scales.t_end,
            output_every: self.config.output.output_every,
            fluid_floor: self.config.physics.fluid_temperature_floor,
            rayleigh: self.scales.rayleigh,
            fluid_coupling: self.config.physics.fluid_coupling,
            mu_a: self.scales.mu_a,
            newton: self.config.solver.newton(),
            adaptive: time.use_adaptive.then(|| AdaptiveSettings {
                cfl_target: time.cfl_target,
                dt_min: self.scales.dt_min,
                dt_max: self.scales.dt_max,
            }),
        }
    }

    fn linear_solver(&self) -> Box<dyn LinearSolver> {
        match self.config.solver.linear_solver {
            LinearSolverKind::Banded => Box::new(BandedLuSolver::new()),
            LinearSolverKind::Dense => Box::new(DirectSolver::new()),
        }
    }

    /// Step to the end time, sending output frames to `sink`
    pub fn run(&mut self, sink: &mut dyn OutputSink) -> Result<RunStatistics> {
        let settings = self.stepper_settings();
        let solver = self.linear_solver();
        let post = MeltPostProcessor::new(MeltConstants::new(&self.config, &self.scales));

        let mut stepper = TimeStepper::new(&self.mesh, &self.spaces, &self.bcs, &self.law, post, solver, settings);
        stepper.run(&mut self.state, sink)
    }
}

/// Set up and run one sweep point, writing into `<output_dir>/mu=<mu>/Tb=<tb>`
pub fn run_job(config: &SimulationConfig, run: RunParameters) -> Result<RunReport> {
    let start = Instant::now();
    let mut simulation = Simulation::new(config, run)?;

    let out = &config.output;
    let directory = (out.write_csv || out.write_parameters)
        .then(|| PathBuf::from(&out.output_dir).join(run.directory_name()));

    if directory.is_none() {
        warn!(
            "Case mu={}, Tb={}: CSV and parameter output are both disabled",
            run.reference_viscosity, run.basal_temperature_c
        );
    }
    if let Some(dir) = &directory {
        fs::create_dir_all(dir)?;
        if out.write_parameters {
            let record = config.parameter_record(&run, simulation.scales());
            SimulationConfig::write_parameters(dir.join("parameters"), &record)?;
        }
    }

    let statistics = match &directory {
        Some(dir) if out.write_csv => simulation.run(&mut CsvSink::new(dir)?)?,
        _ => simulation.run(&mut NullSink)?,
    };

    info!(
        "Case mu={}, Tb={} complete. Run time = {:.2}s",
        run.reference_viscosity,
        run.basal_temperature_c,
        start.elapsed().as_secs_f64()
    );

    Ok(RunReport {
        run,
        statistics,
        directory,
    })
}
