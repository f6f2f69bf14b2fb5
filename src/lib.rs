//! Flight autonomy core for a remotely controlled quadcopter.
//!
//! This library provides:
//! - A session controller accepting discrete movement commands
//! - An autonomous square patrol, at most one at a time, cancellable
//! - A closed-loop face tracker that keeps a detected face centered in frame
//! - Snapshots of the tracked view, requested from any thread
//!
//! Patrol and tracking never fly at the same time: a tracked frame always stops
//! a running patrol first. Manual commands can be issued at any moment.
//!
//! The aircraft link, the video feed and the face detector are traits
//! ([`flight::FlightDriver`], [`video::VideoSource`], [`face_detection::FaceDetector`])
//! so the control logic runs the same against real hardware or a dry run.
//!
//! # Examples
//!
//! ## Dry-run session
//!
//! ```no_run
//! use drone_autopilot::{
//!     app::DroneController,
//!     config::Config,
//!     face_detection::CascadeFaceDetector,
//!     flight::{Direction, DryRunDriver},
//!     video::{CaptureInput, CaptureSource},
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let source = CaptureSource::open(CaptureInput::Camera(0), config.video.width, config.video.height)?;
//! let detector = CascadeFaceDetector::new(&config.detector)?;
//!
//! let drone = DroneController::start(
//!     &config,
//!     Arc::new(DryRunDriver::new()),
//!     Box::new(source),
//!     Box::new(detector),
//! )?;
//!
//! drone.take_off();
//! drone.set_speed(20);
//! drone.move_in(Direction::Up);
//! drone.enable_tracking();
//! let outcome = drone.take_snapshot();
//! println!("{outcome:?}");
//! drone.disable_tracking();
//! drone.land();
//! # Ok(())
//! # }
//! ```
//!
//! ## Tracking corrections
//!
//! ```
//! use drone_autopilot::{config::TrackingConfig, flight::{Direction, FlightCommand}, tracking::corrections};
//! use opencv::core::{Rect, Size};
//!
//! // Face centered 25 px right of the middle of a 320x240 frame
//! let commands = corrections(Rect::new(155, 90, 60, 60), Size::new(320, 240), &TrackingConfig::default());
//! assert_eq!(commands, vec![FlightCommand::Move(Direction::Right, 15)]);
//! ```

/// Session controller and public control API
pub mod app;

/// Per-frame detection and correction loop
pub mod autopilot;

/// Textual command vocabulary
pub mod command;

/// Configuration management
pub mod config;

/// Constants used throughout the application
pub mod constants;

/// Error types and result handling
pub mod error;

/// Face detection capability
pub mod face_detection;

/// Flight driver capability and command types
pub mod flight;

/// Autonomous patrol pattern
pub mod patrol;

/// Shared session state
pub mod session;

/// Snapshot handshake and files
pub mod snapshot;

/// Encoded frame fan-out
pub mod stream;

/// Bang-bang tracking corrections
pub mod tracking;

/// Frame conversion and annotation helpers
pub mod utils;

/// Raw frame sources
pub mod video;

pub use error::{Error, Result};
