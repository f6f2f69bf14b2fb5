//! Flight driver capability.
//!
//! The wire protocol to the aircraft lives behind [`FlightDriver`]. Everything in
//! this crate talks to the aircraft through a [`Pilot`], which forwards commands
//! and only logs failures: commands are fire-and-forget, with no retries and no
//! acknowledgement tracking.

use crate::{constants::DRY_RUN_HISTORY, error::Result};
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Translation directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Climb
    Up,
    /// Descend
    Down,
    /// Strafe left
    Left,
    /// Strafe right
    Right,
    /// Move toward the camera's view
    Forward,
    /// Move away from the camera's view
    Backward,
}

/// Yaw rotation directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    /// Rotate clockwise seen from above
    Clockwise,
    /// Rotate counter-clockwise seen from above
    CounterClockwise,
}

/// Flip directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlipDirection {
    /// Forward flip
    Front,
    /// Flip to the left
    Left,
    /// Flip to the right
    Right,
    /// Backward flip
    Back,
}

/// A single command understood by the flight driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlightCommand {
    /// Take off and hold
    TakeOff,
    /// Land in place
    Land,
    /// Stop all motion and hold position
    Hover,
    /// Translate at the given speed
    Move(Direction, i32),
    /// Rotate at the given speed
    Rotate(Rotation, i32),
    /// Perform a flip
    Flip(FlipDirection),
    /// Take off after being thrown
    ThrowTakeOff,
    /// Toggle bounce mode
    Bounce,
    /// Stop rotating
    CeaseRotation,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::Forward => "forward",
            Self::Backward => "backward",
        };
        f.write_str(name)
    }
}

impl fmt::Display for FlightCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TakeOff => f.write_str("takeoff"),
            Self::Land => f.write_str("land"),
            Self::Hover => f.write_str("hover"),
            Self::Move(direction, speed) => write!(f, "{direction} {speed}"),
            Self::Rotate(Rotation::Clockwise, speed) => write!(f, "cw {speed}"),
            Self::Rotate(Rotation::CounterClockwise, speed) => write!(f, "ccw {speed}"),
            Self::Flip(FlipDirection::Front) => f.write_str("flip front"),
            Self::Flip(FlipDirection::Left) => f.write_str("flip left"),
            Self::Flip(FlipDirection::Right) => f.write_str("flip right"),
            Self::Flip(FlipDirection::Back) => f.write_str("flip back"),
            Self::ThrowTakeOff => f.write_str("throw takeoff"),
            Self::Bounce => f.write_str("bounce"),
            Self::CeaseRotation => f.write_str("cease rotation"),
        }
    }
}

/// Connection to the aircraft
pub trait FlightDriver: Send + Sync {
    /// Establish the command link and start the video feed
    fn connect(&self) -> Result<()>;

    /// Send one command; success means the command left this process
    fn execute(&self, command: FlightCommand) -> Result<()>;
}

/// Fire-and-forget front end over a [`FlightDriver`]
#[derive(Clone)]
pub struct Pilot {
    driver: Arc<dyn FlightDriver>,
}

impl Pilot {
    /// Wrap a driver
    pub fn new(driver: Arc<dyn FlightDriver>) -> Self {
        Self { driver }
    }

    /// Send a command, logging instead of returning any failure
    pub fn send(&self, command: FlightCommand) {
        debug!("Flight command: {}", command);
        if let Err(e) = self.driver.execute(command) {
            warn!("Flight command '{}' failed: {}", command, e);
        }
    }

    /// Take off
    pub fn take_off(&self) {
        self.send(FlightCommand::TakeOff);
    }

    /// Land
    pub fn land(&self) {
        self.send(FlightCommand::Land);
    }

    /// Hold position
    pub fn hover(&self) {
        self.send(FlightCommand::Hover);
    }

    /// Translate in `direction` at `speed`
    pub fn move_in(&self, direction: Direction, speed: i32) {
        self.send(FlightCommand::Move(direction, speed));
    }

    /// Rotate at `speed`
    pub fn rotate(&self, rotation: Rotation, speed: i32) {
        self.send(FlightCommand::Rotate(rotation, speed));
    }

    /// Flip
    pub fn flip(&self, direction: FlipDirection) {
        self.send(FlightCommand::Flip(direction));
    }

    /// Throw-launch
    pub fn throw_take_off(&self) {
        self.send(FlightCommand::ThrowTakeOff);
    }

    /// Bounce
    pub fn bounce(&self) {
        self.send(FlightCommand::Bounce);
    }

    /// Stop rotating
    pub fn cease_rotation(&self) {
        self.send(FlightCommand::CeaseRotation);
    }
}

/// Driver that flies nothing: it logs and remembers every command.
///
/// Used for `--dry-run` sessions and as the observable command stream in tests.
#[derive(Default)]
pub struct DryRunDriver {
    history: Mutex<VecDeque<FlightCommand>>,
    fail_connect: bool,
}

impl DryRunDriver {
    /// Create a driver with an empty history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a driver whose `connect` always fails
    #[must_use]
    pub fn unreachable() -> Self {
        Self {
            fail_connect: true,
            ..Self::default()
        }
    }

    /// Commands received so far, oldest first
    pub fn history(&self) -> Vec<FlightCommand> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect()
    }
}

impl FlightDriver for DryRunDriver {
    fn connect(&self) -> Result<()> {
        if self.fail_connect {
            return Err(crate::Error::Driver("aircraft not reachable".to_string()));
        }
        info!("Dry-run driver connected");
        Ok(())
    }

    fn execute(&self, command: FlightCommand) -> Result<()> {
        info!("[dry-run] {}", command);
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        if history.len() >= DRY_RUN_HISTORY {
            history.pop_front();
        }
        history.push_back(command);
        Ok(())
    }
}
