//! Autonomous square patrol.
//!
//! A single worker thread owns the patrol pattern for the whole session and is
//! driven by explicit [`PatrolCommand`]s. Because only that thread ever flies the
//! pattern, two patrol loops can never run at the same time. Cancellation is
//! cooperative: the worker sees a `Stop` between ticks, never in the middle of one.

use crate::{
    error::Result,
    flight::{Direction, Pilot},
    session::SessionState,
};
use crossbeam_channel::{select, tick, unbounded, Receiver, Sender};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Request sent to the patrol worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatrolCommand {
    /// Begin flying the pattern (ignored while already flying)
    Start,
    /// Hover and return to idle (ignored while idle)
    Stop,
}

/// One step of the patrol cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatrolLeg {
    /// Move forward
    Forward,
    /// Move right
    Right,
    /// Move backward
    Backward,
    /// Move left
    Left,
    /// Hover only, then restart the cycle
    Pause,
}

impl PatrolLeg {
    /// Leg flown after this one
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Forward => Self::Right,
            Self::Right => Self::Backward,
            Self::Backward => Self::Left,
            Self::Left => Self::Pause,
            Self::Pause => Self::Forward,
        }
    }

    /// Direction moved during this leg, if any
    #[must_use]
    pub const fn direction(self) -> Option<Direction> {
        match self {
            Self::Forward => Some(Direction::Forward),
            Self::Right => Some(Direction::Right),
            Self::Backward => Some(Direction::Backward),
            Self::Left => Some(Direction::Left),
            Self::Pause => None,
        }
    }
}

/// Handle to the session's patrol worker
pub struct PatrolController {
    session: Arc<SessionState>,
    // Held while flipping the patrol flag so flag changes and commands reach
    // the worker in the same order.
    commands: Mutex<Option<Sender<PatrolCommand>>>,
    worker: Option<JoinHandle<()>>,
}

impl PatrolController {
    /// Spawn the patrol worker. It idles until [`PatrolController::start`] is called.
    pub fn spawn(session: Arc<SessionState>, pilot: Pilot, interval: Duration) -> Result<Self> {
        let (tx, rx) = unbounded();
        let worker = PatrolWorker {
            session: Arc::clone(&session),
            pilot,
            interval,
            commands: rx,
        };

        let handle = thread::Builder::new()
            .name("patrol".to_string())
            .spawn(move || worker.run())?;

        Ok(Self {
            session,
            commands: Mutex::new(Some(tx)),
            worker: Some(handle),
        })
    }

    /// Start patrolling. No-op (returns false) if a patrol is already running.
    pub fn start(&self) -> bool {
        let commands = self.commands.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.session.begin_patrol() {
            debug!("Patrol already running");
            return false;
        }
        if !Self::send(commands.as_ref(), PatrolCommand::Start) {
            self.session.end_patrol();
            return false;
        }
        true
    }

    /// Stop patrolling. No-op (returns false) if no patrol is running.
    pub fn stop(&self) -> bool {
        let commands = self.commands.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.session.end_patrol() {
            return false;
        }
        Self::send(commands.as_ref(), PatrolCommand::Stop)
    }

    /// Whether a patrol is currently commanded
    pub fn is_patrolling(&self) -> bool {
        self.session.is_patrolling()
    }

    fn send(commands: Option<&Sender<PatrolCommand>>, command: PatrolCommand) -> bool {
        match commands {
            Some(tx) if tx.send(command).is_ok() => true,
            _ => {
                warn!("Patrol worker is gone, dropping {:?}", command);
                false
            }
        }
    }
}

impl Drop for PatrolController {
    fn drop(&mut self) {
        // Closing the channel tells the worker to land its pattern and exit.
        self.commands.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("Patrol worker panicked");
            }
        }
    }
}

#[derive(PartialEq, Eq)]
enum Flow {
    Idle,
    Shutdown,
}

struct PatrolWorker {
    session: Arc<SessionState>,
    pilot: Pilot,
    interval: Duration,
    commands: Receiver<PatrolCommand>,
}

impl PatrolWorker {
    fn run(self) {
        while let Ok(command) = self.commands.recv() {
            match command {
                PatrolCommand::Start => {
                    if self.fly() == Flow::Shutdown {
                        break;
                    }
                }
                PatrolCommand::Stop => debug!("Stop received while idle"),
            }
        }
        debug!("Patrol worker exiting");
    }

    fn fly(&self) -> Flow {
        info!("Patrol started (interval {:?})", self.interval);
        let ticker = tick(self.interval);
        let mut leg = PatrolLeg::Forward;

        loop {
            select! {
                recv(ticker) -> _ => {
                    self.pilot.hover();
                    if let Some(direction) = leg.direction() {
                        self.pilot.move_in(direction, self.session.speed());
                    }
                    leg = leg.next();
                }
                recv(self.commands) -> command => match command {
                    Ok(PatrolCommand::Stop) => {
                        self.pilot.hover();
                        info!("Patrol stopped");
                        return Flow::Idle;
                    }
                    Ok(PatrolCommand::Start) => debug!("Patrol already flying"),
                    Err(_) => {
                        self.pilot.hover();
                        return Flow::Shutdown;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::{DryRunDriver, FlightCommand};
    use std::time::Instant;

    fn controller(interval_ms: u64) -> (PatrolController, Arc<DryRunDriver>, Arc<SessionState>) {
        let driver = Arc::new(DryRunDriver::new());
        let session = Arc::new(SessionState::default());
        let patrol = PatrolController::spawn(
            Arc::clone(&session),
            Pilot::new(driver.clone()),
            Duration::from_millis(interval_ms),
        )
        .unwrap();
        (patrol, driver, session)
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_leg_cycle() {
        let mut leg = PatrolLeg::Forward;
        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(leg.direction());
            leg = leg.next();
        }
        assert_eq!(
            seen,
            vec![
                Some(Direction::Forward),
                Some(Direction::Right),
                Some(Direction::Backward),
                Some(Direction::Left),
                None,
                Some(Direction::Forward),
            ]
        );
    }

    #[test]
    fn test_pattern_sequence() {
        let (patrol, driver, _session) = controller(20);
        assert!(patrol.start());
        assert!(wait_for(|| driver.history().len() >= 9));
        assert!(patrol.stop());

        let history = driver.history();
        assert_eq!(
            &history[..9],
            &[
                FlightCommand::Hover,
                FlightCommand::Move(Direction::Forward, 10),
                FlightCommand::Hover,
                FlightCommand::Move(Direction::Right, 10),
                FlightCommand::Hover,
                FlightCommand::Move(Direction::Backward, 10),
                FlightCommand::Hover,
                FlightCommand::Move(Direction::Left, 10),
                FlightCommand::Hover,
            ]
        );
    }

    #[test]
    fn test_start_and_stop_are_idempotent() {
        let (patrol, _driver, _session) = controller(1000);
        assert!(!patrol.stop());
        assert!(patrol.start());
        assert!(!patrol.start());
        assert!(patrol.is_patrolling());
        assert!(patrol.stop());
        assert!(!patrol.stop());
        assert!(!patrol.is_patrolling());
    }

    #[test]
    fn test_stop_hovers() {
        let (patrol, driver, _session) = controller(10_000);
        patrol.start();
        patrol.stop();
        assert!(wait_for(|| driver.history() == vec![FlightCommand::Hover]));
    }

    #[test]
    fn test_uses_current_speed() {
        let (patrol, driver, session) = controller(20);
        session.set_speed(40);
        patrol.start();
        assert!(wait_for(|| driver.history().len() >= 2));
        patrol.stop();
        assert_eq!(driver.history()[1], FlightCommand::Move(Direction::Forward, 40));
    }

    #[test]
    fn test_drop_stops_worker() {
        let (patrol, driver, _session) = controller(10_000);
        patrol.start();
        drop(patrol);
        assert_eq!(driver.history(), vec![FlightCommand::Hover]);
    }
}
