use nalgebra::Point2;
use crate::config::TemperatureConfig;
use crate::fem::FunctionSpace;
use crate::mesh::Mesh;
use crate::physics::NondimensionalScales;

/// Lithosphere–asthenosphere boundary with a ridge hump
///
/// The LAB sits at `lab_fraction · H` and is pulled down under the centre of
/// the domain by the difference of two tanh steps:
///
/// ```text
/// ridge(o) = A (1 − tanh((x − (1/2 + o) W) / s))
/// LAB(x)   = h_LAB − (ridge(+w) − ridge(−w))
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LabProfile {
    /// Undisturbed LAB height
    pub base_height: f64,
    /// Ridge amplitude A
    pub ridge_height: f64,
    /// Flank offset w (fraction of the width)
    pub half_width: f64,
    /// Flank length scale s
    pub scale: f64,
    pub width: f64,
}

impl LabProfile {
    pub fn new(config: &TemperatureConfig, width: f64, height: f64) -> Self {
        Self {
            base_height: config.lab_fraction * height,
            ridge_height: config.ridge_height,
            half_width: config.ridge_half_width,
            scale: config.ridge_scale,
            width,
        }
    }

    fn ridge(&self, x: f64, offset: f64) -> f64 {
        self.ridge_height * (1.0 - ((x - (0.5 + offset) * self.width) / self.scale).tanh())
    }

    /// Depression of the LAB below its base height at `x`
    pub fn hump(&self, x: f64) -> f64 {
        self.ridge(x, self.half_width) - self.ridge(x, -self.half_width)
    }

    /// LAB height at `x`
    pub fn height_at(&self, x: f64) -> f64 {
        self.base_height - self.hump(x)
    }
}

/// Two-layer conductive geotherm split at the LAB
///
/// Above the LAB the temperature falls linearly from Tb to the surface value;
/// below it rises linearly from the asthenosphere value at the LAB to the
/// basal value. All temperatures are non-dimensional.
#[derive(Debug, Clone, Copy)]
pub struct InitialTemperature {
    pub lab: LabProfile,
    pub surface: f64,
    pub lab_temperature: f64,
    pub asthenosphere: f64,
    pub bottom: f64,
    pub height: f64,
}

impl InitialTemperature {
    pub fn new(config: &TemperatureConfig, scales: &NondimensionalScales, width: f64, height: f64) -> Self {
        Self {
            lab: LabProfile::new(config, width, height),
            surface: scales.surface_temperature(),
            lab_temperature: scales.lab_temperature(),
            asthenosphere: scales.asthenosphere_temperature(),
            bottom: scales.bottom_temperature(),
            height,
        }
    }

    pub fn evaluate(&self, p: &Point2<f64>) -> f64 {
        let lab = self.lab.height_at(p.x);
        if p.y >= lab {
            self.surface + (self.lab_temperature - self.surface) * (self.height - p.y) / (self.height - lab)
        } else {
            self.bottom - (self.bottom - self.asthenosphere) * p.y / lab
        }
    }

    /// Nodal interpolation onto `space`
    pub fn interpolate(&self, mesh: &Mesh, space: &FunctionSpace) -> Vec<f64> {
        space.interpolate(mesh, |p| self.evaluate(p))
    }
}
