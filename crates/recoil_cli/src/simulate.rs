//! Headless spring runs

use anyhow::{Context, Result};
use recoil_animation::{Clock, ManualHost, SpringConfig};
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Parameters of a single run
#[derive(Debug, Clone)]
pub struct SimulateOptions {
    pub from: f64,
    pub to: f64,
    pub spring: SpringConfig,
    pub frame_ms: f64,
    pub max_frames: usize,
}

/// One `on_update` notification
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Sample {
    pub time_ms: f64,
    pub position: f64,
}

/// Everything observed while the spring moved from `from` to `to`
#[derive(Debug, Serialize)]
pub struct Trajectory {
    pub from: f64,
    pub to: f64,
    pub frame_ms: f64,
    pub spring: SpringConfig,
    pub frames: usize,
    pub samples: Vec<Sample>,
    /// Whether the spring sat on its target when the run ended
    pub settled: bool,
    /// Position reported by `on_rest`
    pub rested_at: Option<f64>,
    /// Time of the rest notification
    pub settle_time_ms: Option<f64>,
}

/// Human-readable table, one line per sample
impl fmt::Display for Trajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>10}  {:>14}", "time_ms", "position")?;
        for sample in &self.samples {
            writeln!(f, "{:>10.1}  {:>14.6}", sample.time_ms, sample.position)?;
        }
        match (self.settled, self.settle_time_ms) {
            (true, Some(time)) => writeln!(
                f,
                "rested at {} after {time:.1}ms ({} frames)",
                self.to, self.frames
            ),
            (true, None) => writeln!(f, "already at rest on {}", self.to),
            (false, _) => writeln!(f, "did not rest after {} frames", self.frames),
        }
    }
}

/// Run a spring from `from` to `to` on a manual frame host
pub fn simulate(options: &SimulateOptions) -> Result<Trajectory> {
    let host = ManualHost::new();
    let sim = host
        .spring()
        .config(options.spring)
        .initial_position(options.from)
        .build()
        .context("Failed to build spring")?;

    let samples = Rc::new(RefCell::new(Vec::new()));
    let rest = Rc::new(RefCell::new(None));

    let clock = host.clock().clone();
    let samples_clone = samples.clone();
    sim.set_on_update(move |position| {
        samples_clone.borrow_mut().push(Sample {
            time_ms: clock.now(),
            position,
        });
    });
    // Drop the snapshot taken when the observer was attached
    samples.borrow_mut().clear();

    let clock = host.clock().clone();
    let rest_clone = rest.clone();
    sim.set_on_rest(move |position| {
        *rest_clone.borrow_mut() = Some((position, clock.now()));
    });

    sim.transition(options.to)
        .context("Failed to start transition")?;
    let frames = host.run_until_idle(options.frame_ms, options.max_frames);
    let settled = sim.is_settled();
    tracing::debug!("ran {} frames, settled = {}", frames, settled);
    sim.destroy();

    let rest = *rest.borrow();
    let samples = samples.borrow().clone();
    Ok(Trajectory {
        from: options.from,
        to: options.to,
        frame_ms: options.frame_ms,
        spring: options.spring,
        frames,
        samples,
        settled,
        rested_at: rest.map(|(position, _)| position),
        settle_time_ms: rest.map(|(_, time)| time),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> SimulateOptions {
        SimulateOptions {
            from: 0.0,
            to: 100.0,
            spring: SpringConfig::default(),
            frame_ms: 16.0,
            max_frames: 10_000,
        }
    }

    #[test]
    fn test_simulate_rests_on_target() {
        let trajectory = simulate(&options()).unwrap();

        assert!(trajectory.settled);
        assert_eq!(trajectory.rested_at, Some(100.0));
        assert!(trajectory.frames > 0 && trajectory.frames < 10_000);
        assert_eq!(
            trajectory.settle_time_ms,
            Some(trajectory.frames as f64 * 16.0)
        );
        assert_eq!(trajectory.samples[0], Sample { time_ms: 0.0, position: 0.0 });
    }

    #[test]
    fn test_simulate_budget_exhausted() {
        let trajectory = simulate(&SimulateOptions {
            max_frames: 3,
            ..options()
        })
        .unwrap();

        assert_eq!(trajectory.frames, 3);
        assert!(!trajectory.settled);
        assert_eq!(trajectory.rested_at, None);
        assert_eq!(trajectory.samples.len(), 4);
        assert!(trajectory
            .to_string()
            .ends_with("did not rest after 3 frames\n"));
    }

    #[test]
    fn test_simulate_no_motion() {
        let trajectory = simulate(&SimulateOptions {
            from: 5.0,
            to: 5.0,
            ..options()
        })
        .unwrap();

        assert_eq!(trajectory.frames, 0);
        assert!(trajectory.samples.is_empty());
        // Already at rest, so there is no rest edge to report
        assert!(trajectory.settled);
        assert_eq!(trajectory.rested_at, None);
    }

    #[test]
    fn test_simulate_within_threshold_settles_immediately() {
        // 0.005 is inside the default 0.01 rest threshold, so the first step
        // snaps to the target without a rest edge or any frames
        let trajectory = simulate(&SimulateOptions {
            from: 0.0,
            to: 0.005,
            ..options()
        })
        .unwrap();

        assert!(trajectory.settled);
        assert_eq!(trajectory.frames, 0);
        assert_eq!(trajectory.rested_at, None);
        assert!(trajectory
            .to_string()
            .ends_with("already at rest on 0.005\n"));
    }

    #[test]
    fn test_json_output_shape() {
        let trajectory = simulate(&options()).unwrap();
        let json = serde_json::to_value(&trajectory).unwrap();

        assert_eq!(json["to"], 100.0);
        assert_eq!(json["spring"]["stiffness"], 200.0);
        assert!(json["samples"].as_array().unwrap().len() > 10);
        assert_eq!(json["settled"], true);
        assert_eq!(json["rested_at"], 100.0);
    }
}
