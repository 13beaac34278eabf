//! Manual frame host
//!
//! A deterministic stand-in for a platform repaint loop. Frames only happen
//! when the owner calls [`ManualFrameScheduler::run_frame`] (or one of the
//! [`ManualHost`] helpers), and time only moves when [`ManualClock`] is
//! told to. Used by the test suites and the headless CLI.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use slotmap::{new_key_type, Key, KeyData, SlotMap};

use crate::error::{Result, SpringError};
use crate::host::{Clock, FrameCallback, FrameHandle, FrameScheduler};
use crate::simulator::{SpringSimulator, SpringSimulatorBuilder};

new_key_type! {
    struct FrameKey;
}

fn frame_handle(key: FrameKey) -> FrameHandle {
    FrameHandle::from_raw(key.data().as_ffi())
}

fn frame_key(handle: FrameHandle) -> FrameKey {
    KeyData::from_ffi(handle.into_raw()).into()
}

/// Frame scheduler that runs callbacks only when asked to
pub struct ManualFrameScheduler {
    pending: RefCell<SlotMap<FrameKey, FrameCallback>>,
    available: Cell<bool>,
}

impl ManualFrameScheduler {
    pub fn new() -> Self {
        Self {
            pending: RefCell::new(SlotMap::with_key()),
            available: Cell::new(true),
        }
    }

    /// Make subsequent frame requests fail, as a host without a display would
    pub fn set_available(&self, available: bool) {
        self.available.set(available);
    }

    /// Run one frame at `timestamp`.
    ///
    /// Only callbacks pending when the frame starts are run; anything they
    /// request waits for the next frame. A callback cancelled by an earlier
    /// callback in the same frame does not run. Returns the number of
    /// callbacks run.
    pub fn run_frame(&self, timestamp: f64) -> usize {
        let due: Vec<FrameKey> = self.pending.borrow().keys().collect();

        let mut fired = 0;
        for key in due {
            // Release the borrow before calling out; callbacks re-enter the scheduler
            let callback = self.pending.borrow_mut().remove(key);
            if let Some(callback) = callback {
                callback(timestamp);
                fired += 1;
            }
        }

        tracing::trace!("frame at {timestamp}ms ran {fired} callbacks");
        fired
    }

    pub fn pending_frames(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn has_pending_frames(&self) -> bool {
        !self.pending.borrow().is_empty()
    }
}

impl Default for ManualFrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScheduler for ManualFrameScheduler {
    fn request_frame(&self, callback: FrameCallback) -> Result<FrameHandle> {
        if !self.available.get() {
            return Err(SpringError::InvalidState(
                "frame scheduler unavailable".to_string(),
            ));
        }
        Ok(frame_handle(self.pending.borrow_mut().insert(callback)))
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        // Stale keys carry an old slot version and miss
        self.pending.borrow_mut().remove(frame_key(handle));
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, now: f64) {
        self.now.set(now);
    }

    pub fn advance(&self, delta_ms: f64) -> f64 {
        let now = self.now.get() + delta_ms;
        self.now.set(now);
        now
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

/// A manual scheduler and clock sharing one time base
#[derive(Clone)]
pub struct ManualHost {
    scheduler: Rc<ManualFrameScheduler>,
    clock: Rc<ManualClock>,
}

impl ManualHost {
    pub fn new() -> Self {
        Self::starting_at(0.0)
    }

    pub fn starting_at(start: f64) -> Self {
        Self {
            scheduler: Rc::new(ManualFrameScheduler::new()),
            clock: Rc::new(ManualClock::new(start)),
        }
    }

    pub fn scheduler(&self) -> &Rc<ManualFrameScheduler> {
        &self.scheduler
    }

    pub fn clock(&self) -> &Rc<ManualClock> {
        &self.clock
    }

    /// Builder for a simulator driven by this host
    pub fn spring(&self) -> SpringSimulatorBuilder {
        SpringSimulator::builder(self.scheduler.clone(), self.clock.clone())
    }

    /// Move the clock forward by `interval_ms` and run one frame at the new time
    pub fn advance_frame(&self, interval_ms: f64) -> usize {
        let now = self.clock.advance(interval_ms);
        self.scheduler.run_frame(now)
    }

    /// Run frames every `interval_ms` until nothing is pending or
    /// `max_frames` have run. Returns the number of frames run.
    pub fn run_until_idle(&self, interval_ms: f64, max_frames: usize) -> usize {
        let mut frames = 0;
        while frames < max_frames && self.scheduler.has_pending_frames() {
            self.advance_frame(interval_ms);
            frames += 1;
        }
        frames
    }
}

impl Default for ManualHost {
    fn default() -> Self {
        Self::new()
    }
}
