//! Host capabilities
//!
//! A simulator never reaches for a global clock or a global repaint hook.
//! The embedding platform hands it a [`FrameScheduler`] and a [`Clock`];
//! tests hand it [`ManualHost`](crate::ManualHost) instead.
//!
//! All timestamps are milliseconds, and frame timestamps share the clock's
//! time base.

use std::time::Instant;

use crate::error::Result;

/// One-shot callback run before the next repaint, given the frame timestamp
pub type FrameCallback = Box<dyn FnOnce(f64)>;

/// Opaque handle for an outstanding frame request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

impl FrameHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn into_raw(self) -> u64 {
        self.0
    }
}

/// Per-frame scheduling facility of the host
pub trait FrameScheduler {
    /// Schedule `callback` to run once before the next repaint.
    ///
    /// Returns [`SpringError::InvalidState`](crate::SpringError::InvalidState)
    /// when the host cannot accept frame requests.
    fn request_frame(&self, callback: FrameCallback) -> Result<FrameHandle>;

    /// Cancel a request. Must be a no-op for handles that already fired or
    /// were already cancelled.
    fn cancel_frame(&self, handle: FrameHandle);
}

/// Monotonic, non-decreasing time source in milliseconds
pub trait Clock {
    fn now(&self) -> f64;
}

/// Wall clock measuring milliseconds since it was created
#[derive(Clone, Copy, Debug)]
pub struct InstantClock {
    origin: Instant,
}

impl InstantClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for InstantClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for InstantClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}
