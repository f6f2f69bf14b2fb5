//! Textual control commands.
//!
//! Command names follow the remote controller's vocabulary (`takeOff`,
//! `faceDetectTrack`, ...). `speed` takes an optional value; a missing or
//! unparsable value selects the default speed.

use crate::{
    constants::DEFAULT_SPEED,
    flight::{Direction, FlipDirection, Rotation},
    Error,
};
use std::str::FromStr;

/// One request from the command surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// `takeOff`
    TakeOff,
    /// `land`
    Land,
    /// `hover`
    Hover,
    /// `up`, `down`, `left`, `right`, `forward`, `backward` at the session speed
    Move(Direction),
    /// `clockwise`, `counterClockwise` at the session speed
    Rotate(Rotation),
    /// `ceaseRotation`
    CeaseRotation,
    /// `speed <n>`
    SetSpeed(i32),
    /// `frontFlip`, `leftFlip`, `rightFlip`, `backFlip`
    Flip(FlipDirection),
    /// `throwTakeOff`
    ThrowTakeOff,
    /// `bounce`
    Bounce,
    /// `patrol`
    StartPatrol,
    /// `stopPatrol`
    StopPatrol,
    /// `faceDetectTrack`
    EnableTracking,
    /// `stopFaceDetectTrack`, which also hovers
    DisableTracking,
    /// `snapshot`, waiting for the next tracked frame
    Snapshot,
}

impl FromStr for ControlCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let name = parts.next().ok_or_else(|| Error::CommandParse("empty command".to_string()))?;

        let command = match name {
            "takeOff" => Self::TakeOff,
            "land" => Self::Land,
            "hover" => Self::Hover,
            "up" => Self::Move(Direction::Up),
            "down" => Self::Move(Direction::Down),
            "left" => Self::Move(Direction::Left),
            "right" => Self::Move(Direction::Right),
            "forward" => Self::Move(Direction::Forward),
            "backward" => Self::Move(Direction::Backward),
            "clockwise" => Self::Rotate(Rotation::Clockwise),
            "counterClockwise" => Self::Rotate(Rotation::CounterClockwise),
            "ceaseRotation" => Self::CeaseRotation,
            "speed" => Self::SetSpeed(
                parts
                    .next()
                    .and_then(|value| value.parse().ok())
                    .unwrap_or(DEFAULT_SPEED),
            ),
            "frontFlip" => Self::Flip(FlipDirection::Front),
            "leftFlip" => Self::Flip(FlipDirection::Left),
            "rightFlip" => Self::Flip(FlipDirection::Right),
            "backFlip" => Self::Flip(FlipDirection::Back),
            "throwTakeOff" => Self::ThrowTakeOff,
            "bounce" => Self::Bounce,
            "patrol" => Self::StartPatrol,
            "stopPatrol" => Self::StopPatrol,
            "faceDetectTrack" => Self::EnableTracking,
            "stopFaceDetectTrack" => Self::DisableTracking,
            "snapshot" => Self::Snapshot,
            other => return Err(Error::CommandParse(other.to_string())),
        };

        Ok(command)
    }
}
