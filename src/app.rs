//! Session controller: the public control surface of the autopilot.

use crate::{
    autopilot::{AutopilotLoop, LoopLinks},
    command::ControlCommand,
    config::Config,
    error::Result,
    face_detection::FaceDetector,
    flight::{Direction, FlightDriver, FlipDirection, Pilot, Rotation},
    patrol::PatrolController,
    session::SessionState,
    snapshot::{SnapshotOutcome, SnapshotSync},
    stream::MjpegStream,
    video::VideoSource,
};
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Owner of one flight session.
///
/// Manual commands run on the caller's thread and only touch session flags or
/// the driver. Patrol and tracking run on their own workers.
pub struct DroneController {
    session: Arc<SessionState>,
    pilot: Pilot,
    patrol: Arc<PatrolController>,
    snapshots: Arc<SnapshotSync>,
    snapshot_timeout: Duration,
    stream: MjpegStream,
    shutdown: Arc<AtomicBool>,
    autopilot: Option<JoinHandle<()>>,
}

impl DroneController {
    /// Create the session, connect the driver and start the autopilot loop.
    ///
    /// A failed connection is not fatal: it is logged and the autopilot loop is
    /// not started, leaving a controller that still accepts manual commands.
    pub fn start(
        config: &Config,
        driver: Arc<dyn FlightDriver>,
        source: Box<dyn VideoSource>,
        detector: Box<dyn FaceDetector>,
    ) -> Result<Self> {
        info!("Initializing drone session");

        let session = Arc::new(SessionState::new(config.patrol.default_speed));
        let pilot = Pilot::new(Arc::clone(&driver));
        let patrol = Arc::new(PatrolController::spawn(
            Arc::clone(&session),
            pilot.clone(),
            config.patrol.interval(),
        )?);
        let snapshots = Arc::new(SnapshotSync::new());
        let stream = MjpegStream::new();
        let shutdown = Arc::new(AtomicBool::new(false));

        let autopilot = match driver.connect() {
            Ok(()) => {
                info!("Connected to drone");
                let links = LoopLinks {
                    session: Arc::clone(&session),
                    pilot: pilot.clone(),
                    patrol: Arc::clone(&patrol),
                    snapshots: Arc::clone(&snapshots),
                    publisher: Arc::new(stream.clone()),
                };
                let control_loop = AutopilotLoop::new(links, detector, config);
                let flag = Arc::clone(&shutdown);
                let handle = thread::Builder::new()
                    .name("autopilot".to_string())
                    .spawn(move || control_loop.run(source, &flag))?;
                Some(handle)
            }
            Err(e) => {
                error!("Failed to connect to drone: {}. Autopilot disabled.", e);
                None
            }
        };

        Ok(Self {
            session,
            pilot,
            patrol,
            snapshots,
            snapshot_timeout: config.snapshot.timeout(),
            stream,
            shutdown,
            autopilot,
        })
    }

    /// Whether the autopilot loop was started
    pub fn has_autopilot(&self) -> bool {
        self.autopilot.is_some()
    }

    /// Take off
    pub fn take_off(&self) {
        self.pilot.take_off();
    }

    /// Land
    pub fn land(&self) {
        self.pilot.land();
    }

    /// Hold position
    pub fn hover(&self) {
        self.pilot.hover();
    }

    /// Move in `direction` at the session speed
    pub fn move_in(&self, direction: Direction) {
        self.pilot.move_in(direction, self.session.speed());
    }

    /// Rotate at the session speed
    pub fn rotate(&self, rotation: Rotation) {
        self.pilot.rotate(rotation, self.session.speed());
    }

    /// Stop rotating
    pub fn cease_rotation(&self) {
        self.pilot.cease_rotation();
    }

    /// Flip
    pub fn flip(&self, direction: FlipDirection) {
        self.pilot.flip(direction);
    }

    /// Throw-launch
    pub fn throw_take_off(&self) {
        self.pilot.throw_take_off();
    }

    /// Bounce
    pub fn bounce(&self) {
        self.pilot.bounce();
    }

    /// Current session speed
    pub fn speed(&self) -> i32 {
        self.session.speed()
    }

    /// Set the session speed (clamped); returns the stored value
    pub fn set_speed(&self, speed: i32) -> i32 {
        let stored = self.session.set_speed(speed);
        if stored != speed {
            warn!("Speed {} out of range, using {}", speed, stored);
        }
        stored
    }

    /// Start the patrol pattern unless one is running
    pub fn start_patrol(&self) {
        self.patrol.start();
    }

    /// Stop the patrol pattern if one is running
    pub fn stop_patrol(&self) {
        self.patrol.stop();
    }

    /// Whether a patrol is running
    pub fn is_patrolling(&self) -> bool {
        self.session.is_patrolling()
    }

    /// Let the autopilot follow faces. Any patrol is stopped on the next frame.
    pub fn enable_tracking(&self) {
        if !self.session.set_tracking(true) {
            info!("Face tracking enabled");
        }
    }

    /// Stop following faces and hover. Safe to repeat; always hovers.
    pub fn disable_tracking(&self) {
        if self.session.set_tracking(false) {
            info!("Face tracking disabled");
        }
        self.pilot.hover();
    }

    /// Whether tracking is on
    pub fn is_tracking(&self) -> bool {
        self.session.is_tracking()
    }

    /// Ask the autopilot to save the next tracked frame and wait for it.
    ///
    /// Gives up after the configured timeout; the request then stays pending.
    pub fn take_snapshot(&self) -> SnapshotOutcome {
        let outcome = self.snapshots.request().wait(self.snapshot_timeout);
        match &outcome {
            SnapshotOutcome::Saved(saved) => info!("Snapshot ready: {}", saved.latest.display()),
            SnapshotOutcome::Failed(reason) => warn!("Snapshot failed: {}", reason),
            SnapshotOutcome::TimedOut => warn!("Snapshot timed out after {:?}", self.snapshot_timeout),
        }
        outcome
    }

    /// Whether a snapshot is waiting for a frame
    pub fn snapshot_pending(&self) -> bool {
        self.snapshots.is_pending()
    }

    /// Annotated frames published while tracking
    pub fn stream(&self) -> &MjpegStream {
        &self.stream
    }

    /// Execute a parsed command
    pub fn dispatch(&self, command: ControlCommand) {
        info!("Command: {:?}", command);
        match command {
            ControlCommand::TakeOff => self.take_off(),
            ControlCommand::Land => self.land(),
            ControlCommand::Hover => self.hover(),
            ControlCommand::Move(direction) => self.move_in(direction),
            ControlCommand::Rotate(rotation) => self.rotate(rotation),
            ControlCommand::CeaseRotation => self.cease_rotation(),
            ControlCommand::SetSpeed(speed) => {
                self.set_speed(speed);
            }
            ControlCommand::Flip(direction) => self.flip(direction),
            ControlCommand::ThrowTakeOff => self.throw_take_off(),
            ControlCommand::Bounce => self.bounce(),
            ControlCommand::StartPatrol => self.start_patrol(),
            ControlCommand::StopPatrol => self.stop_patrol(),
            ControlCommand::EnableTracking => self.enable_tracking(),
            ControlCommand::DisableTracking => self.disable_tracking(),
            ControlCommand::Snapshot => {
                self.take_snapshot();
            }
        }
    }

    /// Stop the workers and wait for the autopilot loop to finish.
    ///
    /// The loop notices the request after its current frame read returns, so
    /// this blocks until the video source yields a frame or closes.
    pub fn shutdown(mut self) {
        info!("Shutting down drone session");
        self.shutdown.store(true, Ordering::Release);
        self.patrol.stop();
        if let Some(handle) = self.autopilot.take() {
            if handle.join().is_err() {
                warn!("Autopilot loop panicked");
            }
        }
    }
}

impl Drop for DroneController {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
    }
}
