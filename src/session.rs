//! Shared session state.
//!
//! One [`SessionState`] exists per controller and is read and written from the
//! command caller, the patrol worker and the autopilot loop. Every field is an
//! atomic; compound "check then act" transitions go through compare-exchange.

use crate::constants::{DEFAULT_SPEED, MAX_SPEED, MIN_SPEED};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// Mode flags and movement speed of the active flight session
#[derive(Debug)]
pub struct SessionState {
    speed: AtomicI32,
    patrolling: AtomicBool,
    tracking: AtomicBool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(DEFAULT_SPEED)
    }
}

impl SessionState {
    /// Create a session with the given initial speed (clamped)
    #[must_use]
    pub fn new(speed: i32) -> Self {
        Self {
            speed: AtomicI32::new(clamp_speed(speed)),
            patrolling: AtomicBool::new(false),
            tracking: AtomicBool::new(false),
        }
    }

    /// Current movement magnitude
    pub fn speed(&self) -> i32 {
        self.speed.load(Ordering::Acquire)
    }

    /// Store a new speed, clamped to the aircraft range; returns the stored value
    pub fn set_speed(&self, speed: i32) -> i32 {
        let clamped = clamp_speed(speed);
        self.speed.store(clamped, Ordering::Release);
        clamped
    }

    /// Whether a patrol has been commanded and not yet stopped
    pub fn is_patrolling(&self) -> bool {
        self.patrolling.load(Ordering::Acquire)
    }

    /// Flip `patrolling` false -> true. Returns false if it was already set.
    pub fn begin_patrol(&self) -> bool {
        self.patrolling
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Flip `patrolling` true -> false. Returns false if it was already clear.
    pub fn end_patrol(&self) -> bool {
        self.patrolling
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether the autopilot acts on frames
    pub fn is_tracking(&self) -> bool {
        self.tracking.load(Ordering::Acquire)
    }

    /// Turn tracking on or off; returns the previous value
    pub fn set_tracking(&self, enabled: bool) -> bool {
        self.tracking.swap(enabled, Ordering::AcqRel)
    }
}

/// Clamp a requested speed into `MIN_SPEED..=MAX_SPEED`
pub const fn clamp_speed(speed: i32) -> i32 {
    if speed < MIN_SPEED {
        MIN_SPEED
    } else if speed > MAX_SPEED {
        MAX_SPEED
    } else {
        speed
    }
}
