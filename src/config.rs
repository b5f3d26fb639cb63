//! Configuration management for mantle melt simulations
//!
//! Reads TOML configuration files and provides the physical constants, domain,
//! time stepping, solver and sweep settings. Every section falls back to the
//! published defaults, so a file only needs to list what it changes.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use crate::error::{Result, SimulationError};
use crate::linalg::NewtonConfig;
use crate::physics::NondimensionalScales;

/// Main simulation configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub physics: PhysicsConfig,
    pub domain: DomainConfig,
    pub temperature: TemperatureConfig,
    pub time: TimeConfig,
    pub solver: SolverConfig,
    pub output: OutputConfig,
    pub sweep: SweepConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Viscosity activation parameter b
    pub activation: f64,
    /// Depth dependence cc of the viscosity (ln of the contrast)
    pub depth_factor: f64,
    /// Viscosity reference temperature (K)
    pub reference_temperature: f64,
    /// Reference solid density ρ0 (kg/m³)
    pub reference_density: f64,
    /// Melt density (kg/m³)
    pub melt_density: f64,
    /// Darcy mobility k / (μ φ)
    pub darcy: f64,
    /// Thermal expansivity α (1/K)
    pub thermal_expansion: f64,
    /// Gravity (m/s²)
    pub gravity: f64,
    /// Length scale h (m)
    pub length_scale: f64,
    /// Reference thermal diffusivity κ0 (m²/s)
    pub diffusivity: f64,
    /// Solid–fluid heat exchange k_s
    pub fluid_coupling: f64,
    /// Lower bound on the fluid temperature (non-dimensional)
    pub fluid_temperature_floor: f64,
    /// Basal slip speed (m/s)
    pub slip_velocity: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            activation: 12.7,
            depth_factor: 128f64.ln(),
            reference_temperature: 1573.0,
            reference_density: 3300.0,
            melt_density: 2900.0,
            darcy: 1e-13,
            thermal_expansion: 2.5e-5,
            gravity: 9.81,
            length_scale: 1e6,
            diffusivity: 1e-6,
            fluid_coupling: 1e-6,
            fluid_temperature_floor: 1.013,
            slip_velocity: 1.6e-9,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DomainConfig {
    /// Non-dimensional width
    pub width: f64,
    /// Non-dimensional height
    pub height: f64,
    pub nx: usize,
    pub ny: usize,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 0.4,
            nx: 20,
            ny: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TemperatureConfig {
    /// Surface temperature (°C)
    pub surface_c: f64,
    /// Asthenosphere temperature at the LAB (°C)
    pub asthenosphere_c: f64,
    /// Basal temperature (°C)
    pub bottom_c: f64,
    /// °C → K offset
    pub kelvin_offset: f64,
    /// LAB height as a fraction of the domain height
    pub lab_fraction: f64,
    /// Amplitude of the ridge hump
    pub ridge_height: f64,
    /// Offset of each ridge flank from the centre, as a fraction of the width
    pub ridge_half_width: f64,
    /// tanh length scale of the flanks
    pub ridge_scale: f64,
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            surface_c: 27.0,
            asthenosphere_c: 1300.0,
            bottom_c: 1305.0,
            kelvin_offset: 273.0,
            lab_fraction: 0.75,
            ridge_height: 0.05,
            ridge_half_width: 0.2,
            ridge_scale: 0.05,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeConfig {
    /// Theta-scheme weight
    pub theta: f64,
    /// Step size (s)
    pub dt_seconds: f64,
    /// End time (s)
    pub end_time_seconds: f64,
    /// CFL-limited step size instead of a fixed one
    pub use_adaptive: bool,
    pub cfl_target: f64,
    pub dt_min_seconds: f64,
    pub dt_max_seconds: f64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            theta: 0.5,
            dt_seconds: 3e11,
            end_time_seconds: 3e15,
            use_adaptive: false,
            cfl_target: 0.5,
            dt_min_seconds: 3e10,
            dt_max_seconds: 3e12,
        }
    }
}

/// Linear solver for the Newton corrections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinearSolverKind {
    Banded,
    Dense,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SolverConfig {
    pub max_newton_iterations: usize,
    pub abs_tolerance: f64,
    pub rel_tolerance: f64,
    pub divergence_factor: f64,
    pub relaxation: f64,
    pub linear_solver: LinearSolverKind,
}

impl Default for SolverConfig {
    fn default() -> Self {
        let newton = NewtonConfig::default();
        Self {
            max_newton_iterations: newton.max_iterations,
            abs_tolerance: newton.abs_tolerance,
            rel_tolerance: newton.rel_tolerance,
            divergence_factor: newton.divergence_factor,
            relaxation: newton.relaxation,
            linear_solver: LinearSolverKind::Banded,
        }
    }
}

impl SolverConfig {
    pub fn newton(&self) -> NewtonConfig {
        NewtonConfig {
            max_iterations: self.max_newton_iterations,
            abs_tolerance: self.abs_tolerance,
            rel_tolerance: self.rel_tolerance,
            divergence_factor: self.divergence_factor,
            relaxation: self.relaxation,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory of the sweep
    pub output_dir: String,
    /// Emit every n-th step
    pub output_every: usize,
    pub write_csv: bool,
    pub write_parameters: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: "results".to_string(),
            output_every: 100,
            write_csv: true,
            write_parameters: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Reference viscosities μa (Pa·s)
    pub viscosities: Vec<f64>,
    /// Asthenosphere temperatures at the LAB (°C)
    pub basal_temperatures: Vec<f64>,
    /// Run the sweep points on the rayon pool
    pub parallel: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            viscosities: vec![5e21],
            basal_temperatures: vec![1300.0],
            parallel: true,
        }
    }
}

/// One sweep point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunParameters {
    /// Tb (°C)
    pub basal_temperature_c: f64,
    /// μa (Pa·s)
    pub reference_viscosity: f64,
}

impl RunParameters {
    pub fn new(basal_temperature_c: f64, reference_viscosity: f64) -> Self {
        Self {
            basal_temperature_c,
            reference_viscosity,
        }
    }

    /// Run directory relative to the sweep root: `mu=<mu>/Tb=<tb>`
    pub fn directory_name(&self) -> String {
        format!("mu={}/Tb={}", self.reference_viscosity, self.basal_temperature_c)
    }
}

fn first_repeat(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .enumerate()
        .find(|&(i, v)| values[..i].contains(v))
        .map(|(_, &v)| v)
}

impl SimulationConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| SimulationError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(contents)
            .map_err(|e| SimulationError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the solver cannot run with
    ///
    /// Mesh extents are left to the mesh generator, which reports them as
    /// geometry errors.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(SimulationError::Config(msg));

        if !(self.time.dt_seconds > 0.0) {
            return fail(format!("dt_seconds must be positive, got {}", self.time.dt_seconds));
        }
        if !(self.time.end_time_seconds > 0.0) {
            return fail(format!("end_time_seconds must be positive, got {}", self.time.end_time_seconds));
        }
        if !(0.0..=1.0).contains(&self.time.theta) {
            return fail(format!("theta must lie in [0, 1], got {}", self.time.theta));
        }
        if self.time.use_adaptive && !(self.time.dt_min_seconds > 0.0 && self.time.dt_min_seconds <= self.time.dt_max_seconds) {
            return fail("adaptive time stepping needs 0 < dt_min_seconds <= dt_max_seconds".to_string());
        }
        if self.output.output_every == 0 {
            return fail("output_every must be at least 1".to_string());
        }
        if !(self.solver.relaxation > 0.0 && self.solver.relaxation <= 1.0) {
            return fail(format!("relaxation must lie in (0, 1], got {}", self.solver.relaxation));
        }
        if self.sweep.viscosities.iter().any(|&mu| !(mu > 0.0)) {
            return fail("sweep viscosities must be positive".to_string());
        }
        // Each sweep point owns its run directory
        if let Some(mu) = first_repeat(&self.sweep.viscosities) {
            return fail(format!("sweep viscosity {} is listed more than once", mu));
        }
        if let Some(tb) = first_repeat(&self.sweep.basal_temperatures) {
            return fail(format!("sweep basal temperature {} is listed more than once", tb));
        }
        let t = &self.temperature;
        if !(t.bottom_c > t.surface_c) {
            return fail(format!("bottom_c ({}) must exceed surface_c ({})", t.bottom_c, t.surface_c));
        }
        Ok(())
    }

    /// Every (μa, Tb) pair of the sweep, viscosity-major
    pub fn sweep_points(&self) -> Vec<RunParameters> {
        let mut points = Vec::new();
        for &mu in &self.sweep.viscosities {
            for &tb in &self.sweep.basal_temperatures {
                points.push(RunParameters::new(tb, mu));
            }
        }
        points
    }

    /// Flat (name, value) list of every scalar constant of a run
    pub fn parameter_record(&self, run: &RunParameters, scales: &NondimensionalScales) -> Vec<(&'static str, f64)> {
        let p = &self.physics;
        let t = &self.temperature;
        vec![
            ("Tb", run.basal_temperature_c),
            ("mu_a", run.reference_viscosity),
            ("rho_0", p.reference_density),
            ("rhomelt", p.melt_density),
            ("darcy", p.darcy),
            ("alpha", p.thermal_expansion),
            ("g", p.gravity),
            ("b", p.activation),
            ("cc", p.depth_factor),
            ("Tref", p.reference_temperature),
            ("h", p.length_scale),
            ("kappa_0", p.diffusivity),
            ("k_s", p.fluid_coupling),
            ("fluid_temperature_floor", p.fluid_temperature_floor),
            ("theta", self.time.theta),
            ("nx", self.domain.nx as f64),
            ("ny", self.domain.ny as f64),
            ("MeshWidth", self.domain.width),
            ("MeshHeight", self.domain.height),
            ("LABHeight", t.lab_fraction * self.domain.height),
            ("output_every", self.output.output_every as f64),
            ("dTemp", scales.delta_t),
            ("Ep", scales.ep),
            ("mu_bot", scales.mu_bot),
            ("Ra", scales.rayleigh),
            ("w0", scales.w0),
            ("tau", scales.tau),
            ("p0", scales.p0),
            ("vslipx", scales.vslip),
            ("dt", scales.dt),
            ("tEnd", scales.t_end),
        ]
    }

    /// Write a parameter record as `name = value` lines
    pub fn write_parameters<P: AsRef<Path>>(path: P, record: &[(&'static str, f64)]) -> Result<()> {
        let mut file = fs::File::create(path)?;
        for (name, value) in record {
            writeln!(file, "{} = {}", name, value)?;
        }
        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("═══════════════════════════════════════════════════════════════");
        println!("  Mantle Melt Configuration");
        println!("═══════════════════════════════════════════════════════════════");
        println!("Domain:");
        println!("  Size: {:.2} × {:.2} (h = {:.0} km)",
            self.domain.width, self.domain.height, self.physics.length_scale / 1e3);
        println!("  Grid: {} × {} cells ({} Tri6 elements)",
            self.domain.nx, self.domain.ny, 2 * self.domain.nx * self.domain.ny);

        println!("\nTime:");
        println!("  dt: {:.2e} s, end: {:.2e} s ({:.1} Myr)",
            self.time.dt_seconds,
            self.time.end_time_seconds,
            self.time.end_time_seconds / (365.25 * 24.0 * 3600.0 * 1e6));
        println!("  θ = {}, adaptive: {}", self.time.theta, self.time.use_adaptive);

        println!("\nSolver:");
        println!("  Newton: max {} iterations, atol {:.1e}, rtol {:.1e}",
            self.solver.max_newton_iterations,
            self.solver.abs_tolerance,
            self.solver.rel_tolerance);
        println!("  Linear: {:?}", self.solver.linear_solver);

        println!("\nSweep:");
        println!("  μa: {:?} Pa·s", self.sweep.viscosities);
        println!("  Tb: {:?} °C", self.sweep.basal_temperatures);
        println!("  Output: every {} steps to {}/", self.output.output_every, self.output.output_dir);
        println!("═══════════════════════════════════════════════════════════════\n");
    }
}
