//! Frame-driven spring simulator
//!
//! [`SpringSimulator`] owns one [`Spring`] and drives it with the host's
//! frame scheduler until it comes to rest:
//!
//! ```text
//! transition(target) ─► step(now) ─► moving? ─► request_frame ─► step(frame_ts) ─► ...
//!                                       └─ rested ─► on_rest (once) ─► stop
//! ```
//!
//! Everything runs on the host's UI thread. The simulator is a cheap
//! [`Clone`] handle over `Rc` state and is deliberately `!Send`.
//!
//! Observers are single slots: setting one replaces the previous one.
//!
//! # Re-entrancy
//!
//! Observers run with no internal borrow held, so they may read the
//! simulator, replace observers, or call [`SpringSimulator::destroy`].
//! A [`transition`](SpringSimulator::transition) or [`set`](SpringSimulator::set)
//! issued from inside an observer is queued and applied at the start of the
//! next step; in auto-run mode a frame is requested so that step happens.
//!
//! An observer that captures a clone of its own simulator forms an `Rc`
//! cycle; [`destroy`](SpringSimulator::destroy) breaks it.

use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::config::SpringConfig;
use crate::error::{Result, SpringError};
use crate::host::{Clock, FrameHandle, FrameScheduler};
use crate::spring::{Spring, StepOutcome};

/// Observer callback, called with the current position
pub type Observer = Rc<dyn Fn(f64)>;

/// A command issued from inside an observer, applied on the next step
#[derive(Clone, Copy, Debug, PartialEq)]
enum Deferred {
    Transition(f64),
    Set(f64),
}

#[derive(Default)]
struct Observers {
    on_update: Option<Observer>,
    on_rest: Option<Observer>,
}

struct SimulatorState {
    spring: Spring,
    /// Timestamp of the previous step; `None` starts a fresh timing cycle
    last_step: Option<f64>,
    pending_frame: Option<FrameHandle>,
    stepping: bool,
    deferred: SmallVec<[Deferred; 2]>,
    destroyed: bool,
}

struct Shared {
    state: RefCell<SimulatorState>,
    observers: RefCell<Observers>,
    scheduler: Rc<dyn FrameScheduler>,
    clock: Rc<dyn Clock>,
    auto_run: bool,
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(handle) = self.state.get_mut().pending_frame.take() {
            self.scheduler.cancel_frame(handle);
        }
    }
}

/// Builder for [`SpringSimulator`]
pub struct SpringSimulatorBuilder {
    scheduler: Rc<dyn FrameScheduler>,
    clock: Rc<dyn Clock>,
    config: SpringConfig,
    initial_position: f64,
    auto_run: bool,
}

impl SpringSimulatorBuilder {
    pub fn config(mut self, config: SpringConfig) -> Self {
        self.config = config;
        self
    }

    pub fn initial_position(mut self, position: f64) -> Self {
        self.initial_position = position;
        self
    }

    /// Whether the simulator re-arms itself through the frame scheduler
    /// (`true`, the default) or waits for [`SpringSimulator::manual_tick`].
    pub fn auto_run(mut self, auto_run: bool) -> Self {
        self.auto_run = auto_run;
        self
    }

    /// Validate the configuration and build the simulator
    pub fn build(self) -> Result<SpringSimulator> {
        if !self.initial_position.is_finite() {
            return Err(SpringError::InvalidConfiguration(format!(
                "initial position must be finite, got {}",
                self.initial_position
            )));
        }
        let spring = Spring::new(self.config, self.initial_position)?;

        Ok(SpringSimulator {
            shared: Rc::new(Shared {
                state: RefCell::new(SimulatorState {
                    spring,
                    last_step: None,
                    pending_frame: None,
                    stepping: false,
                    deferred: SmallVec::new(),
                    destroyed: false,
                }),
                observers: RefCell::new(Observers::default()),
                scheduler: self.scheduler,
                clock: self.clock,
                auto_run: self.auto_run,
            }),
        })
    }
}

/// Notification to deliver once internal borrows are released
enum Notify {
    Update(f64),
    Rest(f64),
}

/// Animates one scalar toward a target with a damped spring
#[derive(Clone)]
pub struct SpringSimulator {
    shared: Rc<Shared>,
}

impl SpringSimulator {
    pub fn builder(
        scheduler: Rc<dyn FrameScheduler>,
        clock: Rc<dyn Clock>,
    ) -> SpringSimulatorBuilder {
        SpringSimulatorBuilder {
            scheduler,
            clock,
            config: SpringConfig::default(),
            initial_position: 0.0,
            auto_run: true,
        }
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Current position
    pub fn get(&self) -> f64 {
        self.shared.state.borrow().spring.value()
    }

    pub fn velocity(&self) -> f64 {
        self.shared.state.borrow().spring.velocity()
    }

    pub fn target(&self) -> f64 {
        self.shared.state.borrow().spring.target()
    }

    pub fn is_settled(&self) -> bool {
        self.shared.state.borrow().spring.is_settled()
    }

    pub fn config(&self) -> SpringConfig {
        *self.shared.state.borrow().spring.config()
    }

    pub fn is_auto_run(&self) -> bool {
        self.shared.auto_run
    }

    pub fn has_pending_frame(&self) -> bool {
        self.shared.state.borrow().pending_frame.is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.state.borrow().destroyed
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Animate toward `target`.
    ///
    /// In auto-run mode this steps once right away at the clock's current
    /// time, which seeds the timing cycle and arms the first frame.
    pub fn transition(&self, target: f64) -> Result<()> {
        ensure_finite("target", target)?;
        {
            let mut state = self.shared.state.borrow_mut();
            ensure_alive(&state)?;
            if state.stepping {
                state.deferred.push(Deferred::Transition(target));
                return Ok(());
            }
            state.spring.set_target(target);
        }

        if self.shared.auto_run {
            self.step(self.shared.clock.now())
        } else {
            Ok(())
        }
    }

    /// Jump to `value` without animating.
    ///
    /// Fires `on_update` once if the value differs from the current target.
    /// Velocity is kept and `on_rest` never fires.
    pub fn set(&self, value: f64) -> Result<()> {
        ensure_finite("value", value)?;
        let changed = {
            let mut state = self.shared.state.borrow_mut();
            if state.stepping {
                state.deferred.push(Deferred::Set(value));
                return Ok(());
            }
            state.spring.snap(value)
        };

        if changed {
            tracing::debug!("spring teleported to {}", value);
            self.notify(Notify::Update(value));
        }
        Ok(())
    }

    /// Step once at the clock's current time. Only valid with `auto_run(false)`;
    /// on an auto-run simulator this logs a warning and does nothing.
    pub fn manual_tick(&self) -> Result<()> {
        if self.shared.auto_run {
            tracing::warn!("manual_tick called on an auto-run spring simulator; ignoring");
            return Ok(());
        }
        self.step(self.shared.clock.now())
    }

    /// Replace the update observer and call it once with the current position
    pub fn set_on_update(&self, observer: impl Fn(f64) + 'static) {
        if self.is_destroyed() {
            tracing::debug!("ignoring on_update observer for destroyed spring simulator");
            return;
        }
        let observer: Observer = Rc::new(observer);
        self.shared.observers.borrow_mut().on_update = Some(observer.clone());
        observer(self.get());
    }

    /// Replace the rest observer. It fires on the next Moving to Rested edge.
    pub fn set_on_rest(&self, observer: impl Fn(f64) + 'static) {
        if self.is_destroyed() {
            tracing::debug!("ignoring on_rest observer for destroyed spring simulator");
            return;
        }
        self.shared.observers.borrow_mut().on_rest = Some(Rc::new(observer));
    }

    /// Cancel any outstanding frame and drop both observers.
    ///
    /// A frame callback that the host still delivers afterwards is ignored.
    pub fn destroy(&self) {
        let pending = {
            let mut state = self.shared.state.borrow_mut();
            state.destroyed = true;
            state.deferred.clear();
            state.pending_frame.take()
        };
        if let Some(handle) = pending {
            self.shared.scheduler.cancel_frame(handle);
        }
        *self.shared.observers.borrow_mut() = Observers::default();
    }

    // ========================================================================
    // Integration
    // ========================================================================

    /// Advance the spring to `now` (milliseconds).
    ///
    /// The first step of a timing cycle integrates over zero time and only
    /// records `now`; the cycle ends when the spring rests.
    pub fn step(&self, now: f64) -> Result<()> {
        ensure_finite("timestamp", now)?;

        let mut notifications: SmallVec<[Notify; 2]> = SmallVec::new();
        let outcome = {
            let mut state = self.shared.state.borrow_mut();
            ensure_alive(&state)?;
            if state.stepping {
                return Err(SpringError::InvalidState(
                    "step called from inside a spring observer".to_string(),
                ));
            }
            state.stepping = true;

            for command in std::mem::take(&mut state.deferred) {
                match command {
                    Deferred::Transition(target) => state.spring.set_target(target),
                    Deferred::Set(value) => {
                        if state.spring.snap(value) {
                            notifications.push(Notify::Update(value));
                        }
                    }
                }
            }

            let dt = match state.last_step {
                Some(last) => ((now - last) / 1000.0).max(0.0),
                None => 0.0,
            };
            let outcome = state.spring.step(dt);
            let position = state.spring.value();

            state.last_step = if outcome.is_rested() { None } else { Some(now) };

            tracing::trace!(
                "spring step dt={dt}s position={position} velocity={} outcome={outcome:?}",
                state.spring.velocity()
            );

            match outcome {
                StepOutcome::Moving => notifications.push(Notify::Update(position)),
                StepOutcome::Settled => {
                    tracing::debug!("spring settled at {}", position);
                    notifications.push(Notify::Rest(position));
                }
                StepOutcome::Resting => {}
            }
            outcome
        };

        let guard = SteppingGuard(&self.shared);
        for notification in notifications {
            self.notify(notification);
        }
        drop(guard);

        self.rearm(outcome)
    }

    /// Cancel-then-request the next frame when the loop must continue
    fn rearm(&self, outcome: StepOutcome) -> Result<()> {
        if !self.shared.auto_run {
            return Ok(());
        }

        let pending = {
            let mut state = self.shared.state.borrow_mut();
            let has_work = !outcome.is_rested() || !state.deferred.is_empty();
            if state.destroyed || !has_work {
                return Ok(());
            }
            state.pending_frame.take()
        };
        if let Some(handle) = pending {
            self.shared.scheduler.cancel_frame(handle);
        }

        let weak = Rc::downgrade(&self.shared);
        let requested = self.shared.scheduler.request_frame(Box::new(move |timestamp| {
            if let Some(shared) = weak.upgrade() {
                SpringSimulator { shared }.on_frame(timestamp);
            }
        }));

        match requested {
            Ok(handle) => {
                self.shared.state.borrow_mut().pending_frame = Some(handle);
                Ok(())
            }
            Err(err) => {
                // The loop stops here; the next transition starts a fresh cycle
                self.shared.state.borrow_mut().last_step = None;
                Err(err)
            }
        }
    }

    fn on_frame(&self, timestamp: f64) {
        {
            let mut state = self.shared.state.borrow_mut();
            state.pending_frame = None;
            if state.destroyed {
                return;
            }
        }

        if let Err(err) = self.step(timestamp) {
            tracing::error!("spring frame step failed: {}", err);
            self.shared.state.borrow_mut().last_step = None;
        }
    }

    fn notify(&self, notification: Notify) {
        let (observer, position) = {
            let observers = self.shared.observers.borrow();
            match notification {
                Notify::Update(position) => (observers.on_update.clone(), position),
                Notify::Rest(position) => (observers.on_rest.clone(), position),
            }
        };
        if let Some(observer) = observer {
            observer(position);
        }
    }
}

impl std::fmt::Debug for SpringSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("SpringSimulator")
            .field("position", &state.spring.value())
            .field("velocity", &state.spring.velocity())
            .field("target", &state.spring.target())
            .field("settled", &state.spring.is_settled())
            .field("auto_run", &self.shared.auto_run)
            .field("destroyed", &state.destroyed)
            .finish()
    }
}

/// Clears the stepping flag even if an observer panics
struct SteppingGuard<'a>(&'a Shared);

impl Drop for SteppingGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.0.state.try_borrow_mut() {
            state.stepping = false;
        }
    }
}

fn ensure_alive(state: &SimulatorState) -> Result<()> {
    if state.destroyed {
        return Err(SpringError::InvalidState(
            "spring simulator has been destroyed".to_string(),
        ));
    }
    Ok(())
}

fn ensure_finite(what: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(SpringError::InvalidState(format!(
            "{what} must be finite, got {value}"
        )));
    }
    Ok(())
}
