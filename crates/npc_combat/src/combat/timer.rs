//! Countdown timer shared by every multi-tick sequence.

use serde::{Deserialize, Serialize};

/// Monotonically decreasing countdown.
///
/// Invariant: `0 ≤ remaining ≤ duration`. Expiry is reported once, on the
/// tick the countdown reaches zero, no matter how large the delta was.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    duration: f32,
    remaining: f32,
}

impl Timer {
    pub fn new(duration: f32) -> Self {
        let duration = duration.max(0.0);
        Self {
            duration,
            remaining: duration,
        }
    }

    /// Restart with a new duration.
    pub fn start(&mut self, duration: f32) {
        *self = Self::new(duration);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Advance by `delta`. Returns true only on the tick the timer expires.
    pub fn tick(&mut self, delta: f32) -> bool {
        if self.remaining <= 0.0 {
            return false;
        }
        self.remaining = (self.remaining - delta.max(0.0)).max(0.0);
        self.remaining == 0.0
    }

    pub fn is_done(&self) -> bool {
        self.remaining <= 0.0
    }

    pub fn is_running(&self) -> bool {
        self.remaining > 0.0
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Time spent since the last `start`.
    pub fn elapsed(&self) -> f32 {
        self.duration - self.remaining
    }
}
