//! Damped harmonic oscillator
//!
//! A single scalar integrated with semi-implicit Euler: velocity is updated
//! from the spring force first, then position moves with the new velocity.
//! No clock, no host, no observers; [`SpringSimulator`](crate::SpringSimulator)
//! layers timing and notification on top of this.

use crate::config::SpringConfig;
use crate::error::Result;

/// What a single integration step did to the rest state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// The spring is still outside the rest threshold
    Moving,
    /// The spring came to rest on this step (it was moving before)
    Settled,
    /// The spring was already at rest and still is
    Resting,
}

impl StepOutcome {
    pub fn is_rested(self) -> bool {
        !matches!(self, StepOutcome::Moving)
    }
}

/// Oscillator state for one animated value
#[derive(Clone, Debug)]
pub struct Spring {
    config: SpringConfig,
    position: f64,
    velocity: f64,
    target: f64,
    rested: bool,
}

impl Spring {
    /// Create a spring resting at `initial`.
    ///
    /// Fails with [`SpringError::InvalidConfiguration`](crate::SpringError::InvalidConfiguration)
    /// when the parameters cannot be integrated.
    pub fn new(config: SpringConfig, initial: f64) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            position: initial,
            velocity: 0.0,
            target: initial,
            rested: true,
        })
    }

    pub fn config(&self) -> &SpringConfig {
        &self.config
    }

    pub fn value(&self) -> f64 {
        self.position
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    /// Whether the most recent step ended inside the rest threshold
    pub fn is_settled(&self) -> bool {
        self.rested
    }

    /// Retarget without moving. Takes effect on the next step.
    pub fn set_target(&mut self, target: f64) {
        self.target = target;
    }

    /// Jump position and target to `value` without animating.
    ///
    /// Velocity and the rest flag are left alone. Returns whether the target
    /// actually changed.
    pub fn snap(&mut self, value: f64) -> bool {
        let changed = value != self.target;
        self.position = value;
        self.target = value;
        changed
    }

    /// Advance by `dt` seconds.
    pub fn step(&mut self, dt: f64) -> StepOutcome {
        let SpringConfig {
            stiffness,
            damping,
            mass,
            ..
        } = self.config;

        let distance = self.target - self.position;
        let acceleration = stiffness * distance / mass - damping * self.velocity;

        let velocity = self.velocity + acceleration * dt;
        let position = self.position + velocity * dt;

        let threshold = self.config.rest_threshold();
        let rested = velocity.abs() < threshold && (position - self.target).abs() < threshold;

        // Compare against the flag from the previous step before overwriting it
        let was_rested = self.rested;

        self.position = if rested { self.target } else { position };
        self.velocity = velocity;
        self.rested = rested;

        match (rested, was_rested) {
            (false, _) => StepOutcome::Moving,
            (true, false) => StepOutcome::Settled,
            (true, true) => StepOutcome::Resting,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: f64 = 0.016;

    fn run_until_rest(spring: &mut Spring, max_steps: usize) -> Option<usize> {
        (1..=max_steps).find(|_| spring.step(FRAME) == StepOutcome::Settled)
    }

    #[test]
    fn test_new_spring_is_rested() {
        let spring = Spring::new(SpringConfig::default(), 42.0).unwrap();
        assert!(spring.is_settled());
        assert_eq!(spring.value(), 42.0);
        assert_eq!(spring.target(), 42.0);
        assert_eq!(spring.velocity(), 0.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(Spring::new(SpringConfig::default().with_mass(0.0), 0.0).is_err());
    }

    #[test]
    fn test_first_step_matches_euler() {
        let mut spring = Spring::new(SpringConfig::default(), 0.0).unwrap();
        spring.set_target(100.0);

        assert_eq!(spring.step(0.01), StepOutcome::Moving);

        // a = 200 * 100 / 1 - 10 * 0 = 20000; v = 200; x = 2
        assert!((spring.velocity() - 200.0).abs() < 1e-9);
        assert!((spring.value() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_dt_does_not_move() {
        let mut spring = Spring::new(SpringConfig::default(), 0.0).unwrap();
        spring.set_target(100.0);

        assert_eq!(spring.step(0.0), StepOutcome::Moving);
        assert_eq!(spring.value(), 0.0);
        assert_eq!(spring.velocity(), 0.0);
    }

    #[test]
    fn test_converges_and_snaps_to_target() {
        let mut spring = Spring::new(SpringConfig::default(), 0.0).unwrap();
        spring.set_target(100.0);

        let steps = run_until_rest(&mut spring, 2000).expect("spring never settled");
        assert!(steps > 10);
        assert_eq!(spring.value(), 100.0);
        assert!(spring.velocity().abs() < 0.01);
    }

    #[test]
    fn test_presets_converge() {
        for config in [
            SpringConfig::gentle(),
            SpringConfig::snappy(),
            SpringConfig::stiff(),
            SpringConfig::wobbly(),
        ] {
            let mut spring = Spring::new(config, 1.0).unwrap();
            spring.set_target(-50.0);
            assert!(run_until_rest(&mut spring, 5000).is_some(), "{config:?}");
            assert_eq!(spring.value(), -50.0);
        }
    }

    #[test]
    fn test_rest_is_edge_triggered() {
        let mut spring = Spring::new(SpringConfig::default(), 0.0).unwrap();
        spring.set_target(10.0);
        run_until_rest(&mut spring, 2000).unwrap();

        assert_eq!(spring.step(0.0), StepOutcome::Resting);
        assert_eq!(spring.step(0.0), StepOutcome::Resting);
    }

    #[test]
    fn test_already_at_target_stays_resting() {
        let mut spring = Spring::new(SpringConfig::default(), 5.0).unwrap();
        assert_eq!(spring.step(FRAME), StepOutcome::Resting);
        assert_eq!(spring.value(), 5.0);
    }

    #[test]
    fn test_snap_keeps_velocity() {
        let mut spring = Spring::new(SpringConfig::default(), 0.0).unwrap();
        spring.set_target(100.0);
        spring.step(FRAME);
        let velocity = spring.velocity();

        assert!(spring.snap(5.0));
        assert_eq!(spring.value(), 5.0);
        assert_eq!(spring.target(), 5.0);
        assert_eq!(spring.velocity(), velocity);

        assert!(!spring.snap(5.0));
    }

    #[test]
    fn test_identical_steps_are_deterministic() {
        let mut a = Spring::new(SpringConfig::wobbly(), 0.0).unwrap();
        let mut b = Spring::new(SpringConfig::wobbly(), 0.0).unwrap();
        a.set_target(1.0);
        b.set_target(1.0);

        for dt in [0.016, 0.017, 0.0, 0.033, 0.016] {
            a.step(dt);
            b.step(dt);
            assert_eq!(a.value().to_bits(), b.value().to_bits());
            assert_eq!(a.velocity().to_bits(), b.velocity().to_bits());
        }
    }
}
