/// Temperature- and depth-dependent mantle viscosity
///
/// The law is Arrhenius-like with an exponential depth factor:
///
/// ```text
/// μ(T, z) = exp(−Ep (T ΔT − T_ref) + cc z / H),   Ep = b / ΔT
/// ```
///
/// with T the non-dimensional temperature, z = H − y the depth below the
/// surface and H the domain height. The dimensional viscosity is `μ · mu_a`.
///
/// # References
/// - Karato & Wu (1993), "Rheology of the upper mantle: a synthesis"

use nalgebra::Point2;

/// Viscosity as seen by the assembler: value and temperature derivative
pub trait Rheology: Sync {
    /// (μ, ∂μ/∂T) at non-dimensional temperature `temperature` and point `p`
    fn viscosity(&self, temperature: f64, p: &Point2<f64>) -> (f64, f64);
}

/// Exponential temperature/depth law
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrheniusViscosity {
    /// Activation parameter b (per unit non-dimensional temperature)
    pub activation: f64,
    /// Depth dependence cc, ln of the viscosity contrast across the layer
    pub depth_factor: f64,
    /// Reference temperature T_ref (K)
    pub reference_temperature: f64,
    /// Temperature scale ΔT (K)
    pub temperature_scale: f64,
    /// Layer height H (non-dimensional)
    pub height: f64,
}

impl ArrheniusViscosity {
    /// # Panics
    /// If the temperature scale or the height is not positive.
    pub fn new(activation: f64, depth_factor: f64, reference_temperature: f64, temperature_scale: f64, height: f64) -> Self {
        assert!(temperature_scale > 0.0, "Temperature scale must be positive");
        assert!(height > 0.0, "Layer height must be positive");
        Self {
            activation,
            depth_factor,
            reference_temperature,
            temperature_scale,
            height,
        }
    }

    /// Ep = b / ΔT
    pub fn ep(&self) -> f64 {
        self.activation / self.temperature_scale
    }

    /// Non-dimensional viscosity at depth `depth`
    pub fn at_depth(&self, temperature: f64, depth: f64) -> f64 {
        let exponent = -self.ep() * (temperature * self.temperature_scale - self.reference_temperature)
            + self.depth_factor * depth / self.height;
        exponent.exp()
    }

    /// dμ/dT = −b μ
    pub fn derivative(&self, mu: f64) -> f64 {
        -self.activation * mu
    }
}

impl Rheology for ArrheniusViscosity {
    fn viscosity(&self, temperature: f64, p: &Point2<f64>) -> (f64, f64) {
        let mu = self.at_depth(temperature, self.height - p.y);
        (mu, self.derivative(mu))
    }
}

/// Uniform viscosity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantViscosity(pub f64);

impl Rheology for ConstantViscosity {
    fn viscosity(&self, _temperature: f64, _p: &Point2<f64>) -> (f64, f64) {
        (self.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn law() -> ArrheniusViscosity {
        ArrheniusViscosity::new(12.7, 128f64.ln(), 1573.0, 1278.0, 0.4)
    }

    #[test]
    fn test_unity_at_reference_surface() {
        let law = law();
        let t_ref = 1573.0 / 1278.0;
        assert_relative_eq!(law.at_depth(t_ref, 0.0), 1.0, epsilon = 1e-12);
        // Full depth multiplies by exp(cc) = 128
        assert_relative_eq!(law.at_depth(t_ref, 0.4), 128.0, epsilon = 1e-9);
    }

    #[test]
    fn test_depth_is_measured_from_top() {
        let law = law();
        let (mu_top, _) = law.viscosity(1.0, &Point2::new(0.3, 0.4));
        let (mu_bottom, _) = law.viscosity(1.0, &Point2::new(0.3, 0.0));
        assert_relative_eq!(mu_bottom / mu_top, 128.0, epsilon = 1e-9);
    }

    #[test]
    fn test_derivative_matches_finite_difference() {
        let law = law();
        let p = Point2::new(0.5, 0.1);
        let t = 1.02;
        let h = 1e-6;
        let (mu, dmu) = law.viscosity(t, &p);
        let (mu_plus, _) = law.viscosity(t + h, &p);
        let (mu_minus, _) = law.viscosity(t - h, &p);

        assert_relative_eq!(dmu, (mu_plus - mu_minus) / (2.0 * h), max_relative = 1e-6);
        assert_relative_eq!(dmu, -12.7 * mu, max_relative = 1e-12);
    }

    #[test]
    fn test_hotter_is_weaker() {
        let law = law();
        assert!(law.at_depth(1.05, 0.2) < law.at_depth(0.95, 0.2));
    }

    #[test]
    fn test_constant_viscosity() {
        let (mu, dmu) = ConstantViscosity(2.0).viscosity(5.0, &Point2::origin());
        assert_eq!(mu, 2.0);
        assert_eq!(dmu, 0.0);
    }
}
