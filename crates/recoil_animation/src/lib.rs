//! Recoil Animation System
//!
//! Frame-driven spring physics for a single animated value.
//!
//! # Features
//!
//! - **Spring Physics**: semi-implicit Euler damped oscillator with stiffness, damping, mass
//! - **Rest Detection**: precision-derived threshold, edge-triggered rest notification
//! - **Host Scheduling**: injected frame scheduler and clock, no global time
//! - **Manual Host**: deterministic frames for tests and headless runs
//!
//! # Example
//!
//! ```rust
//! use recoil_animation::{ManualHost, SpringConfig};
//!
//! let host = ManualHost::new();
//! let spring = host
//!     .spring()
//!     .config(SpringConfig::default())
//!     .build()
//!     .unwrap();
//!
//! spring.set_on_rest(|value| println!("rested at {value}"));
//! spring.transition(100.0).unwrap();
//!
//! host.run_until_idle(16.0, 1000);
//! assert_eq!(spring.get(), 100.0);
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod scheduler;
pub mod simulator;
pub mod spring;

pub use config::SpringConfig;
pub use error::{Result, SpringError};
pub use host::{Clock, FrameCallback, FrameHandle, FrameScheduler, InstantClock};
pub use scheduler::{ManualClock, ManualFrameScheduler, ManualHost};
pub use simulator::{Observer, SpringSimulator, SpringSimulatorBuilder};
pub use spring::{Spring, StepOutcome};
