//! End-to-end tests of the drone controller with its worker threads


use drone_autopilot::{
    app::DroneController,
    command::ControlCommand,
    flight::{Direction, DryRunDriver, FlightCommand, FlipDirection, Rotation},
    snapshot::SnapshotOutcome,
    video::ChannelSource,
};
use opencv::core::Rect;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use test_helpers::{blank_frame, fast_config, wait_until, ScriptedDetector};

struct Session {
    drone: DroneController,
    driver: Arc<DryRunDriver>,
    frames: crossbeam_channel::Sender<Vec<u8>>,
    detector: ScriptedDetector,
    config: drone_autopilot::config::Config,
    _dir: tempfile::TempDir,
}

fn session() -> Session {
    let dir = tempfile::tempdir().unwrap();
    let config = fast_config(dir.path());
    let driver = Arc::new(DryRunDriver::new());
    let detector = ScriptedDetector::default();
    let (frames, source) = ChannelSource::new(16);

    let drone = DroneController::start(&config, driver.clone(), Box::new(source), Box::new(detector.clone()))
        .expect("Failed to start controller");

    Session {
        drone,
        driver,
        frames,
        detector,
        config,
        _dir: dir,
    }
}

impl Session {
    fn finish(self) {
        drop(self.frames);
        self.drone.shutdown();
    }
}

#[test]
fn test_manual_commands_use_session_speed() {
    let s = session();
    s.drone.take_off();
    s.drone.move_in(Direction::Forward);
    assert_eq!(s.drone.set_speed(35), 35);
    s.drone.rotate(Rotation::Clockwise);
    s.drone.flip(FlipDirection::Left);
    s.drone.land();

    assert_eq!(
        s.driver.history(),
        vec![
            FlightCommand::TakeOff,
            FlightCommand::Move(Direction::Forward, 10),
            FlightCommand::Rotate(Rotation::Clockwise, 35),
            FlightCommand::Flip(FlipDirection::Left),
            FlightCommand::Land,
        ]
    );
    s.finish();
}

#[test]
fn test_speed_is_clamped() {
    let s = session();
    assert_eq!(s.drone.set_speed(250), 100);
    assert_eq!(s.drone.set_speed(-3), 0);
    assert_eq!(s.drone.speed(), 0);
    s.finish();
}

#[test]
fn test_patrol_sequence_with_default_speed() {
    let s = session();
    s.drone.start_patrol();
    assert!(s.drone.is_patrolling());
    assert!(wait_until(|| s.driver.history().len() >= 10));
    s.drone.stop_patrol();
    assert!(!s.drone.is_patrolling());

    let history = s.driver.history();
    assert_eq!(
        &history[..10],
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
            FlightCommand::Hover,
        ]
    );
    s.finish();
}

#[test]
fn test_concurrent_patrol_requests_never_interleave() {
    let s = session();
    let drone = Arc::new(s.drone);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let drone = Arc::clone(&drone);
            thread::spawn(move || {
                for j in 0..25 {
                    if (i + j) % 2 == 0 {
                        drone.start_patrol();
                    } else {
                        drone.stop_patrol();
                    }
                    thread::sleep(Duration::from_millis(3));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    drone.stop_patrol();
    thread::sleep(Duration::from_millis(50));

    // A single pattern worker always hovers before each leg, so two legs can
    // never be adjacent in the command stream.
    let history = s.driver.history();
    for pair in history.windows(2) {
        assert!(
            !(matches!(pair[0], FlightCommand::Move(..)) && matches!(pair[1], FlightCommand::Move(..))),
            "interleaved patrol legs: {history:?}"
        );
    }
    assert!(!drone.is_patrolling());

    drop(s.frames);
    if let Ok(drone) = Arc::try_unwrap(drone) {
        drone.shutdown();
    }
}

#[test]
fn test_enable_tracking_stops_patrol() {
    let s = session();
    s.drone.start_patrol();
    s.drone.enable_tracking();
    s.frames.send(blank_frame(&s.config)).unwrap();

    assert!(wait_until(|| !s.drone.is_patrolling()));
    assert!(s.drone.is_tracking());
    s.finish();
}

#[test]
fn test_disable_tracking_always_hovers() {
    let s = session();
    s.drone.disable_tracking();
    s.drone.enable_tracking();
    s.drone.disable_tracking();
    s.drone.disable_tracking();

    assert!(!s.drone.is_tracking());
    assert_eq!(s.driver.history(), vec![FlightCommand::Hover; 3]);
    s.finish();
}

#[test]
fn test_snapshot_round_trip() {
    let s = session();
    s.detector.set_faces(vec![Rect::new(130, 90, 60, 60)]);
    s.drone.enable_tracking();

    let frames = s.frames.clone();
    let frame = blank_frame(&s.config);
    let feeder = thread::spawn(move || {
        for _ in 0..20 {
            if frames.send(frame.clone()).is_err() {
                break;
            }
            thread::sleep(Duration::from_millis(20));
        }
    });

    match s.drone.take_snapshot() {
        SnapshotOutcome::Saved(saved) => {
            let archive = std::fs::read(&saved.archive).unwrap();
            let latest = std::fs::read(&saved.latest).unwrap();
            assert!(!archive.is_empty());
            assert_eq!(archive, latest);
        }
        other => panic!("Expected Saved, got {other:?}"),
    }
    assert!(!s.drone.snapshot_pending());

    feeder.join().unwrap();
    s.finish();
}

#[test]
fn test_snapshot_times_out_without_tracking() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fast_config(dir.path());
    config.snapshot.timeout_ms = 50;
    let driver = Arc::new(DryRunDriver::new());
    let (frames, source) = ChannelSource::new(4);
    let drone = DroneController::start(&config, driver, Box::new(source), Box::new(ScriptedDetector::default()))
        .unwrap();

    frames.send(blank_frame(&config)).unwrap();
    assert_eq!(drone.take_snapshot(), SnapshotOutcome::TimedOut);
    assert!(drone.snapshot_pending());

    drop(frames);
    drone.shutdown();
}

#[test]
fn test_published_stream_receives_tracked_frames() {
    let s = session();
    let viewer = s.drone.stream().subscribe();
    s.drone.enable_tracking();
    s.frames.send(blank_frame(&s.config)).unwrap();

    let jpeg = viewer.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    s.finish();
}

#[test]
fn test_unreachable_driver_runs_degraded() {
    let dir = tempfile::tempdir().unwrap();
    let config = fast_config(dir.path());
    let driver = Arc::new(DryRunDriver::unreachable());
    let (_frames, source) = ChannelSource::new(1);

    let drone = DroneController::start(&config, driver.clone(), Box::new(source), Box::new(ScriptedDetector::default()))
        .unwrap();
    assert!(!drone.has_autopilot());

    drone.hover();
    assert_eq!(driver.history(), vec![FlightCommand::Hover]);
    drone.shutdown();
}

#[test]
fn test_dispatch_parsed_commands() {
    let s = session();
    for line in ["takeOff", "speed 25", "up", "counterClockwise", "ceaseRotation", "bounce", "land"] {
        s.drone.dispatch(line.parse::<ControlCommand>().unwrap());
    }

    assert_eq!(
        s.driver.history(),
        vec![
            FlightCommand::TakeOff,
            FlightCommand::Move(Direction::Up, 25),
            FlightCommand::Rotate(Rotation::CounterClockwise, 25),
            FlightCommand::CeaseRotation,
            FlightCommand::Bounce,
            FlightCommand::Land,
        ]
    );
    s.finish();
}

#[test]
fn test_dispatch_modes() {
    let s = session();
    s.drone.dispatch("patrol".parse().unwrap());
    assert!(s.drone.is_patrolling());
    s.drone.dispatch("stopPatrol".parse().unwrap());
    assert!(!s.drone.is_patrolling());
    s.drone.dispatch("faceDetectTrack".parse().unwrap());
    assert!(s.drone.is_tracking());
    s.drone.dispatch("stopFaceDetectTrack".parse().unwrap());
    assert!(!s.drone.is_tracking());
    s.finish();
}
