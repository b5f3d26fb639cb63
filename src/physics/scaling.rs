/// Non-dimensional scales of one (μa, Tb) run
///
/// Lengths are scaled by h, temperatures by ΔT = T_bottom − T_surface (K),
/// and velocity by the buoyancy velocity
///
/// ```text
/// w0 = ρ0 α g ΔT h² / μa
/// τ  = h / w0               (time)
/// p0 = μa w0 / h            (pressure)
/// Ra = ρ0 α g ΔT h³ / (κ0 μa) = w0 h / κ0
/// ```
///
/// # References
/// - Schubert et al. (2001): "Mantle Convection in the Earth and Planets"

use crate::config::{RunParameters, SimulationConfig};
use crate::physics::ArrheniusViscosity;

const SECONDS_PER_MYR: f64 = 365.25 * 24.0 * 3600.0 * 1e6;

#[derive(Debug, Clone, Copy)]
pub struct NondimensionalScales {
    /// Surface, LAB (Tb), asthenosphere and basal temperatures, non-dimensional
    pub temperatures: [f64; 4],

    /// ΔT [K]
    pub delta_t: f64,

    /// Ep = b / ΔT
    pub ep: f64,

    /// Reference viscosity μa [Pa·s]
    pub mu_a: f64,

    /// Viscosity at the base for the basal temperature [Pa·s]
    pub mu_bot: f64,

    pub rayleigh: f64,

    /// Velocity scale [m/s]
    pub w0: f64,

    /// Time scale [s]
    pub tau: f64,

    /// Pressure scale [Pa]
    pub p0: f64,

    /// Basal slip speed, non-dimensional
    pub vslip: f64,

    /// Step size, non-dimensional
    pub dt: f64,

    /// End time, non-dimensional
    pub t_end: f64,

    /// Bounds for adaptive stepping, non-dimensional
    pub dt_min: f64,
    pub dt_max: f64,
}

impl NondimensionalScales {
    pub fn new(config: &SimulationConfig, run: &RunParameters) -> Self {
        let p = &config.physics;
        let t = &config.temperature;

        let kelvin = [
            t.surface_c + t.kelvin_offset,
            run.basal_temperature_c + t.kelvin_offset,
            t.asthenosphere_c + t.kelvin_offset,
            t.bottom_c + t.kelvin_offset,
        ];
        let delta_t = kelvin[3] - kelvin[0];
        let temperatures = kelvin.map(|k| k / delta_t);

        let ep = p.activation / delta_t;
        let mu_a = run.reference_viscosity;
        let mu_bot = (-ep * (temperatures[3] * delta_t - p.reference_temperature) + p.depth_factor).exp() * mu_a;

        let buoyancy = p.reference_density * p.thermal_expansion * p.gravity * delta_t;
        let h = p.length_scale;
        let rayleigh = buoyancy * h.powi(3) / (p.diffusivity * mu_a);
        let w0 = buoyancy * h * h / mu_a;
        let tau = h / w0;
        let p0 = mu_a * w0 / h;

        Self {
            temperatures,
            delta_t,
            ep,
            mu_a,
            mu_bot,
            rayleigh,
            w0,
            tau,
            p0,
            vslip: p.slip_velocity / w0,
            dt: config.time.dt_seconds / tau,
            t_end: config.time.end_time_seconds / tau,
            dt_min: config.time.dt_min_seconds / tau,
            dt_max: config.time.dt_max_seconds / tau,
        }
    }

    pub fn surface_temperature(&self) -> f64 {
        self.temperatures[0]
    }

    pub fn lab_temperature(&self) -> f64 {
        self.temperatures[1]
    }

    pub fn asthenosphere_temperature(&self) -> f64 {
        self.temperatures[2]
    }

    pub fn bottom_temperature(&self) -> f64 {
        self.temperatures[3]
    }

    /// Viscosity law on a layer of non-dimensional height `height`
    pub fn viscosity_law(&self, config: &SimulationConfig) -> ArrheniusViscosity {
        ArrheniusViscosity::new(
            config.physics.activation,
            config.physics.depth_factor,
            config.physics.reference_temperature,
            self.delta_t,
            config.domain.height,
        )
    }

    /// Non-dimensional time → seconds
    pub fn dim_time(&self, t: f64) -> f64 {
        t * self.tau
    }

    pub fn print_summary(&self) {
        println!("═══════════════════════════════════════════════════════════════");
        println!("  Non-dimensionalization Scales");
        println!("═══════════════════════════════════════════════════════════════");
        println!("  ΔT:              {:.1} K", self.delta_t);
        println!("  μa:              {:.2e} Pa·s (bottom {:.2e} Pa·s)", self.mu_a, self.mu_bot);
        println!("  Ra:              {:.3e}", self.rayleigh);
        println!("  Velocity (w0):   {:.2e} m/s ({:.2} cm/yr)",
                 self.w0, self.w0 * 365.25 * 24.0 * 3600.0 * 100.0);
        println!("  Time (τ):        {:.2e} s ({:.2} Myr)", self.tau, self.tau / SECONDS_PER_MYR);
        println!("  Pressure (p0):   {:.2e} Pa ({:.2} MPa)", self.p0, self.p0 / 1e6);
        println!("  dt = {:.4}, t_end = {:.2}, vslip = {:.4}", self.dt, self.t_end, self.vslip);
        println!("═══════════════════════════════════════════════════════════════\n");
    }
}
