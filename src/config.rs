//! Configuration management for the drone autopilot

use crate::{
    constants::{
        DEFAULT_CASCADE_PATH, DEFAULT_DEPTH_STEP, DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH,
        DEFAULT_HORIZONTAL_TOLERANCE, DEFAULT_LATERAL_STEP, DEFAULT_MAX_AREA_PERCENT,
        DEFAULT_MIN_AREA_PERCENT, DEFAULT_MIN_NEIGHBORS, DEFAULT_PATROL_INTERVAL_MS,
        DEFAULT_SCALE_FACTOR, DEFAULT_SNAPSHOT_FOLDER, DEFAULT_SNAPSHOT_TIMEOUT_MS, DEFAULT_SPEED,
        DEFAULT_VERTICAL_STEP, DEFAULT_VERTICAL_TOLERANCE, MAX_SPEED, MIN_SPEED, BYTES_PER_PIXEL,
    },
    tracking::TargetPolicy,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Raw video frame geometry
    pub video: VideoConfig,

    /// Patrol pattern settings
    pub patrol: PatrolConfig,

    /// Face tracking thresholds and correction sizes
    pub tracking: TrackingConfig,

    /// Snapshot destination and handshake timeout
    pub snapshot: SnapshotConfig,

    /// Face detector parameters
    pub detector: DetectorConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Raw frame geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Frame width in pixels
    pub width: i32,

    /// Frame height in pixels
    pub height: i32,
}

/// Patrol settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatrolConfig {
    /// Time between patrol ticks
    pub interval_ms: u64,

    /// Initial session speed
    pub default_speed: i32,
}

/// Tracking controller settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Horizontal dead band in pixels
    pub horizontal_tolerance: i32,

    /// Vertical dead band in pixels
    pub vertical_tolerance: i32,

    /// Move back when the face covers more than this percentage of the frame
    pub max_area_percent: f64,

    /// Move forward when the face covers less than this percentage of the frame
    pub min_area_percent: f64,

    /// Left/right correction magnitude
    pub lateral_step: i32,

    /// Up/down correction magnitude
    pub vertical_step: i32,

    /// Forward/backward correction magnitude
    pub depth_step: i32,

    /// Which face to follow when several are detected
    pub target: TargetPolicy,
}

/// Snapshot settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Folder receiving snapshot files
    pub folder: PathBuf,

    /// How long a snapshot request waits for the control loop
    pub timeout_ms: u64,
}

/// Haar cascade detector settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Cascade XML file
    pub cascade: PathBuf,

    /// Image pyramid scale step (> 1.0)
    pub scale_factor: f64,

    /// Neighbouring detections required to keep a candidate
    pub min_neighbors: i32,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log filter (overridden by `RUST_LOG`)
    pub level: String,

    /// Append log output to this file instead of stderr
    pub file: Option<PathBuf>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_FRAME_WIDTH,
            height: DEFAULT_FRAME_HEIGHT,
        }
    }
}

impl Default for PatrolConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_PATROL_INTERVAL_MS,
            default_speed: DEFAULT_SPEED,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            horizontal_tolerance: DEFAULT_HORIZONTAL_TOLERANCE,
            vertical_tolerance: DEFAULT_VERTICAL_TOLERANCE,
            max_area_percent: DEFAULT_MAX_AREA_PERCENT,
            min_area_percent: DEFAULT_MIN_AREA_PERCENT,
            lateral_step: DEFAULT_LATERAL_STEP,
            vertical_step: DEFAULT_VERTICAL_STEP,
            depth_step: DEFAULT_DEPTH_STEP,
            target: TargetPolicy::First,
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from(DEFAULT_SNAPSHOT_FOLDER),
            timeout_ms: DEFAULT_SNAPSHOT_TIMEOUT_MS,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            cascade: PathBuf::from(DEFAULT_CASCADE_PATH),
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl VideoConfig {
    /// Bytes in one raw BGR24 frame
    pub fn frame_len(&self) -> usize {
        usize::try_from(self.width).unwrap_or(0) * usize::try_from(self.height).unwrap_or(0) * BYTES_PER_PIXEL
    }
}

impl PatrolConfig {
    /// Tick period
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl SnapshotConfig {
    /// Handshake timeout
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.video.width <= 0 || self.video.height <= 0 {
            return Err(Error::ConfigError(format!(
                "Frame size must be positive, got {}x{}",
                self.video.width, self.video.height
            )));
        }

        if self.patrol.interval_ms == 0 {
            return Err(Error::ConfigError("Patrol interval must be greater than 0".to_string()));
        }
        if !(MIN_SPEED..=MAX_SPEED).contains(&self.patrol.default_speed) {
            return Err(Error::ConfigError(format!(
                "Default speed must be between {MIN_SPEED} and {MAX_SPEED}"
            )));
        }

        let tracking = &self.tracking;
        if tracking.horizontal_tolerance < 0 || tracking.vertical_tolerance < 0 {
            return Err(Error::ConfigError("Tracking tolerances must not be negative".to_string()));
        }
        if tracking.min_area_percent >= tracking.max_area_percent {
            return Err(Error::ConfigError(
                "min_area_percent must be smaller than max_area_percent".to_string(),
            ));
        }

        if self.snapshot.timeout_ms == 0 {
            return Err(Error::ConfigError("Snapshot timeout must be greater than 0".to_string()));
        }

        if self.detector.scale_factor <= 1.0 {
            return Err(Error::ConfigError("Detector scale factor must be greater than 1.0".to_string()));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Drone autopilot configuration

# Raw frames delivered by the video source (BGR24)
video:
  width: 320
  height: 240

# Square patrol pattern
patrol:
  interval_ms: 3000
  default_speed: 10

# Face tracking (bang-bang controller)
tracking:
  horizontal_tolerance: 20
  vertical_tolerance: 30
  max_area_percent: 7.0
  min_area_percent: 0.9
  lateral_step: 15
  vertical_step: 25
  depth_step: 10
  target: first

# Snapshots
snapshot:
  folder: "static/img/snapshots"
  timeout_ms: 3000

# Haar cascade face detector
detector:
  cascade: "assets/haarcascade_frontalface_default.xml"
  scale_factor: 1.1
  min_neighbors: 3

# Logging
logging:
  level: "info"
"#;
