/// Time integration for the coupled transient problem
///
/// The energy equation is integrated with a theta scheme. The weight θ mixes
/// the new and old fields as
///
///   T_θ = (1 − θ) T_{n+1} + θ T_n
///   v_θ = θ v_{n+1} + (1 − θ) v_n
///
/// θ = 0.5 gives Crank–Nicolson for both.

/// Statistics for a single accepted time step
#[derive(Debug, Clone)]
pub struct TimeStepStats {
    /// Simulation time after the step
    pub time: f64,
    /// Time step size used
    pub dt: f64,
    /// Number of Newton iterations
    pub iterations: usize,
    /// Final residual norm
    pub residual: f64,
}

/// Theta-scheme weights and step size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThetaScheme {
    pub theta: f64,
    pub dt: f64,
}

impl ThetaScheme {
    /// # Panics
    /// If `dt` is not positive or `theta` lies outside [0, 1].
    pub fn new(theta: f64, dt: f64) -> Self {
        assert!(dt > 0.0, "Time step must be positive, got {}", dt);
        assert!((0.0..=1.0).contains(&theta), "Theta must lie in [0, 1], got {}", theta);
        Self { theta, dt }
    }

    pub fn crank_nicolson(dt: f64) -> Self {
        Self::new(0.5, dt)
    }

    /// T_θ from the new and old temperature
    pub fn temperature_mid(&self, new: f64, old: f64) -> f64 {
        (1.0 - self.theta) * new + self.theta * old
    }

    /// ∂T_θ/∂T_{n+1}
    pub fn temperature_weight(&self) -> f64 {
        1.0 - self.theta
    }

    /// v_θ from the new and old velocity
    pub fn velocity_mid(&self, new: f64, old: f64) -> f64 {
        self.theta * new + (1.0 - self.theta) * old
    }

    /// ∂v_θ/∂v_{n+1}
    pub fn velocity_weight(&self) -> f64 {
        self.theta
    }

    pub fn with_dt(&self, dt: f64) -> Self {
        Self::new(self.theta, dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_crank_nicolson_midpoints() {
        let scheme = ThetaScheme::crank_nicolson(0.1);
        assert_relative_eq!(scheme.temperature_mid(2.0, 1.0), 1.5);
        assert_relative_eq!(scheme.velocity_mid(2.0, 1.0), 1.5);
    }

    #[test]
    fn test_weights_are_asymmetric_for_general_theta() {
        let scheme = ThetaScheme::new(0.25, 1.0);
        // Temperature leans on the new value, velocity on the old one
        assert_relative_eq!(scheme.temperature_mid(1.0, 0.0), 0.75);
        assert_relative_eq!(scheme.velocity_mid(1.0, 0.0), 0.25);
        assert_relative_eq!(scheme.temperature_weight(), 0.75);
        assert_relative_eq!(scheme.velocity_weight(), 0.25);
    }

    #[test]
    fn test_with_dt_keeps_theta() {
        let scheme = ThetaScheme::crank_nicolson(1.0).with_dt(0.5);
        assert_eq!(scheme.theta, 0.5);
        assert_eq!(scheme.dt, 0.5);
    }

    #[test]
    #[should_panic(expected = "Time step must be positive")]
    fn test_negative_timestep() {
        ThetaScheme::new(0.5, -1.0);
    }
}
