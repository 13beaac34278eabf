//! Spring parameters
//!
//! Physical constants for the oscillator. Every field has a default, so a
//! partially filled TOML table (or `SpringConfig { mass: 2.0, ..Default::default() }`)
//! is always complete.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpringError};

/// Physical parameters of a spring, fixed for the lifetime of a simulator
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct SpringConfig {
    /// Spring constant; how hard the value is pulled toward its target
    #[serde(default = "default_stiffness")]
    pub stiffness: f64,
    /// Velocity-proportional resistance
    #[serde(default = "default_damping")]
    pub damping: f64,
    /// Inverse of the rest threshold; larger means stricter rest detection
    #[serde(default = "default_precision")]
    pub precision: f64,
    #[serde(default = "default_mass")]
    pub mass: f64,
}

fn default_stiffness() -> f64 {
    200.0
}

fn default_damping() -> f64 {
    10.0
}

fn default_precision() -> f64 {
    100.0
}

fn default_mass() -> f64 {
    1.0
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            stiffness: default_stiffness(),
            damping: default_damping(),
            precision: default_precision(),
            mass: default_mass(),
        }
    }
}

impl SpringConfig {
    pub fn new(stiffness: f64, damping: f64, mass: f64) -> Self {
        Self {
            stiffness,
            damping,
            mass,
            ..Default::default()
        }
    }

    /// Slow, heavily damped motion for large surfaces
    pub fn gentle() -> Self {
        Self::new(120.0, 14.0, 1.0)
    }

    /// Quick response with a small overshoot
    pub fn snappy() -> Self {
        Self::new(400.0, 30.0, 1.0)
    }

    /// Near-critically damped and fast
    pub fn stiff() -> Self {
        Self::new(600.0, 48.0, 1.0)
    }

    /// Visible bounce before settling
    pub fn wobbly() -> Self {
        Self::new(180.0, 6.0, 1.0)
    }

    pub fn with_stiffness(mut self, stiffness: f64) -> Self {
        self.stiffness = stiffness;
        self
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_precision(mut self, precision: f64) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    /// Largest velocity and positional error still considered at rest
    pub fn rest_threshold(&self) -> f64 {
        1.0 / self.precision
    }

    /// Damping at which the spring stops overshooting: `2 * sqrt(stiffness * mass)`
    pub fn critical_damping(&self) -> f64 {
        2.0 * (self.stiffness * self.mass).sqrt()
    }

    /// Reject parameters that would yield NaN, infinities, or a rest test
    /// that can never pass.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("stiffness", self.stiffness),
            ("damping", self.damping),
            ("precision", self.precision),
            ("mass", self.mass),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, value)| !value.is_finite()) {
            return Err(SpringError::InvalidConfiguration(format!(
                "{name} must be finite, got {value}"
            )));
        }

        if self.stiffness <= 0.0 {
            return Err(SpringError::InvalidConfiguration(format!(
                "stiffness must be positive, got {}",
                self.stiffness
            )));
        }
        if self.damping < 0.0 {
            return Err(SpringError::InvalidConfiguration(format!(
                "damping must not be negative, got {}",
                self.damping
            )));
        }
        if self.mass <= 0.0 {
            return Err(SpringError::InvalidConfiguration(format!(
                "mass must be positive, got {}",
                self.mass
            )));
        }
        if self.precision <= 0.0 {
            return Err(SpringError::InvalidConfiguration(format!(
                "precision must be positive, got {}",
                self.precision
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SpringConfig::default();
        assert_eq!(config.stiffness, 200.0);
        assert_eq!(config.damping, 10.0);
        assert_eq!(config.precision, 100.0);
        assert_eq!(config.mass, 1.0);
        assert_eq!(config.rest_threshold(), 0.01);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        for config in [
            SpringConfig::gentle(),
            SpringConfig::snappy(),
            SpringConfig::stiff(),
            SpringConfig::wobbly(),
        ] {
            assert!(config.validate().is_ok(), "{config:?}");
            assert_eq!(config.precision, 100.0);
        }
    }

    #[test]
    fn test_zero_mass_rejected() {
        let err = SpringConfig::default().with_mass(0.0).validate().unwrap_err();
        assert!(matches!(err, SpringError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("mass"));
    }

    #[test]
    fn test_non_positive_precision_rejected() {
        for precision in [0.0, -100.0] {
            let err = SpringConfig::default()
                .with_precision(precision)
                .validate()
                .unwrap_err();
            assert!(err.to_string().contains("precision"));
        }
    }

    #[test]
    fn test_negative_damping_rejected() {
        assert!(SpringConfig::default().with_damping(-1.0).validate().is_err());
        // Undamped springs are allowed
        assert!(SpringConfig::default().with_damping(0.0).validate().is_ok());
    }

    #[test]
    fn test_non_finite_rejected() {
        let err = SpringConfig::default()
            .with_stiffness(f64::NAN)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("stiffness must be finite"));
        assert!(SpringConfig::default()
            .with_mass(f64::INFINITY)
            .validate()
            .is_err());
    }

    #[test]
    fn test_critical_damping() {
        let config = SpringConfig::new(100.0, 0.0, 1.0);
        assert_eq!(config.critical_damping(), 20.0);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: SpringConfig = toml::from_str("stiffness = 320.0\nmass = 2.0").unwrap();
        assert_eq!(config.stiffness, 320.0);
        assert_eq!(config.mass, 2.0);
        assert_eq!(config.damping, 10.0);
        assert_eq!(config.precision, 100.0);
    }
}
