//! Per-frame face tracking loop.
//!
//! The loop runs for the whole session on its own thread. Every frame is read
//! and converted; while tracking is off it is dropped right there. While tracking
//! is on the loop takes flight control away from any patrol, looks for faces,
//! issues bang-bang corrections for one of them, saves a pending snapshot and
//! republishes the annotated frame.

use crate::{
    config::{Config, TrackingConfig},
    constants::{FACE_LABEL, READ_FAILURE_LOG_EVERY, READ_RETRY_BASE_MS, READ_RETRY_MAX_MS},
    face_detection::FaceDetector,
    flight::{FlightCommand, Pilot},
    patrol::PatrolController,
    session::SessionState,
    snapshot::{SnapshotStore, SnapshotSync},
    stream::FramePublisher,
    tracking::corrections,
    utils::{
        annotate_face,
        image_conversion::{bgr24_to_mat, encode_jpeg},
    },
    video::VideoSource,
    Result,
};
use chrono::Local;
use log::{debug, info, warn};
use opencv::core::Size;
use opencv::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// What happened to one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameReport {
    /// Frame was empty or could not be interpreted
    Skipped,
    /// Tracking is off; frame discarded
    Idle,
    /// Frame went through detection and control
    Tracked {
        /// Number of faces the detector returned
        faces: usize,
        /// Flight commands issued for this frame, in order
        commands: Vec<FlightCommand>,
    },
}

/// Handles the autopilot loop shares with the rest of the session
#[derive(Clone)]
pub struct LoopLinks {
    /// Mode flags and speed
    pub session: Arc<SessionState>,
    /// Command path to the aircraft
    pub pilot: Pilot,
    /// Patrol to preempt when tracking runs
    pub patrol: Arc<PatrolController>,
    /// Pending snapshot requests
    pub snapshots: Arc<SnapshotSync>,
    /// Viewer stream
    pub publisher: Arc<dyn FramePublisher>,
}

/// Detection, correction and republish pipeline
pub struct AutopilotLoop {
    links: LoopLinks,
    detector: Box<dyn FaceDetector>,
    store: SnapshotStore,
    tracking: TrackingConfig,
    frame_size: Size,
    frame_len: usize,
}

impl AutopilotLoop {
    /// Build a loop for frames of the configured size
    pub fn new(links: LoopLinks, detector: Box<dyn FaceDetector>, config: &Config) -> Self {
        Self {
            links,
            detector,
            store: SnapshotStore::new(config.snapshot.folder.clone()),
            tracking: config.tracking.clone(),
            frame_size: Size::new(config.video.width, config.video.height),
            frame_len: config.video.frame_len(),
        }
    }

    /// Read and process frames until the source closes or `shutdown` is set.
    ///
    /// Read faults and per-frame errors are logged and the loop carries on.
    /// Consecutive read faults back off exponentially up to
    /// [`READ_RETRY_MAX_MS`] and are only warned about once per
    /// [`READ_FAILURE_LOG_EVERY`] failures.
    pub fn run(mut self, mut source: Box<dyn VideoSource>, shutdown: &AtomicBool) {
        info!("Autopilot loop started ({}x{})", self.frame_size.width, self.frame_size.height);
        let mut buf = vec![0u8; self.frame_len];
        let mut frames: u64 = 0;
        let mut failures: u32 = 0;

        while !shutdown.load(Ordering::Acquire) {
            match source.read_frame(&mut buf) {
                Ok(()) => {
                    if failures > 0 {
                        info!("Video recovered after {} failed reads", failures);
                        failures = 0;
                    }
                }
                Err(e) if !e.is_transient() => {
                    info!("Video stream closed after {} frames: {}", frames, e);
                    break;
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    if failures % READ_FAILURE_LOG_EVERY == 1 {
                        warn!("Frame read failed ({} in a row): {}", failures, e);
                    } else {
                        debug!("Frame read failed ({} in a row): {}", failures, e);
                    }
                    thread::sleep(read_retry_delay(failures));
                    continue;
                }
            }

            frames += 1;
            match self.process_frame(&buf) {
                Ok(FrameReport::Tracked { faces, commands }) => {
                    debug!("Frame {}: {} faces, {} commands", frames, faces, commands.len());
                }
                Ok(_) => {}
                Err(e) => warn!("Frame {} dropped: {}", frames, e),
            }
        }

        info!("Autopilot loop stopped");
    }

    /// Run one raw frame through the pipeline
    pub fn process_frame(&mut self, raw: &[u8]) -> Result<FrameReport> {
        let mut frame = match bgr24_to_mat(raw, self.frame_size.width, self.frame_size.height) {
            Ok(frame) if !frame.empty() => frame,
            Ok(_) => return Ok(FrameReport::Skipped),
            Err(e) => {
                debug!("Skipping unreadable frame: {}", e);
                return Ok(FrameReport::Skipped);
            }
        };

        if !self.links.session.is_tracking() {
            return Ok(FrameReport::Idle);
        }

        if self.links.patrol.stop() {
            info!("Tracking took over from patrol");
        }

        let faces = self.detector.detect(&frame)?;
        debug!("Found {} faces", faces.len());

        let target = self.tracking.target.select(&faces);
        let commands = match target {
            None => vec![FlightCommand::Hover],
            Some(face) => {
                let moves = corrections(face, self.frame_size, &self.tracking);
                if moves.is_empty() {
                    vec![FlightCommand::Hover]
                } else {
                    moves
                }
            }
        };

        for command in &commands {
            self.links.pilot.send(*command);
        }

        if let Some(face) = target {
            if let Err(e) = annotate_face(&mut frame, face, FACE_LABEL) {
                warn!("Could not annotate frame: {}", e);
            }
        }

        let jpeg = encode_jpeg(&frame)?;

        if self.links.snapshots.is_pending() {
            let result = self.store.save(&jpeg, Local::now());
            match &result {
                Ok(saved) => info!("Snapshot saved to {}", saved.archive.display()),
                Err(e) => warn!("Snapshot failed: {}", e),
            }
            self.links.snapshots.complete(&result);
        }

        self.links.publisher.publish(&jpeg);

        Ok(FrameReport::Tracked {
            faces: faces.len(),
            commands,
        })
    }
}

/// Pause before retrying after `failures` consecutive read faults
fn read_retry_delay(failures: u32) -> Duration {
    let shift = failures.saturating_sub(1).min(16);
    Duration::from_millis((READ_RETRY_BASE_MS << shift).min(READ_RETRY_MAX_MS))
}
