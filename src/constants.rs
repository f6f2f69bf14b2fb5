//! Constants used throughout the application

/// Default movement magnitude for manual and patrol commands
pub const DEFAULT_SPEED: i32 = 10;

/// Lowest speed accepted by the aircraft; writes are clamped into the range
pub const MIN_SPEED: i32 = 0;

/// Highest speed accepted by the aircraft
pub const MAX_SPEED: i32 = 100;

/// Raw frame width (the 960x720 camera stream scaled down by 3)
pub const DEFAULT_FRAME_WIDTH: i32 = 960 / 3;

/// Raw frame height
pub const DEFAULT_FRAME_HEIGHT: i32 = 720 / 3;

/// Bytes per pixel of a BGR24 raw frame
pub const BYTES_PER_PIXEL: usize = 3;

/// Patrol tick period
pub const DEFAULT_PATROL_INTERVAL_MS: u64 = 3000;

/// How long `take_snapshot` waits for the control loop
pub const DEFAULT_SNAPSHOT_TIMEOUT_MS: u64 = 3000;

/// Horizontal dead band, in pixels from the frame center
pub const DEFAULT_HORIZONTAL_TOLERANCE: i32 = 20;

/// Vertical dead band, in pixels from the frame center
pub const DEFAULT_VERTICAL_TOLERANCE: i32 = 30;

/// Face area (rounded percent of the frame) above which the drone backs off
pub const DEFAULT_MAX_AREA_PERCENT: f64 = 7.0;

/// Face area (rounded percent of the frame) below which the drone closes in
pub const DEFAULT_MIN_AREA_PERCENT: f64 = 0.9;

/// Left/right correction magnitude
pub const DEFAULT_LATERAL_STEP: i32 = 15;

/// Up/down correction magnitude
pub const DEFAULT_VERTICAL_STEP: i32 = 25;

/// Forward/backward correction magnitude
pub const DEFAULT_DEPTH_STEP: i32 = 10;

/// Folder snapshots are written to
pub const DEFAULT_SNAPSHOT_FOLDER: &str = "static/img/snapshots";

/// File name always holding the most recent snapshot
pub const LATEST_SNAPSHOT_FILE: &str = "snapshot.jpg";

/// Haar cascade shipped with OpenCV
pub const DEFAULT_CASCADE_PATH: &str = "assets/haarcascade_frontalface_default.xml";

/// Cascade image pyramid step
pub const DEFAULT_SCALE_FACTOR: f64 = 1.1;

/// Overlapping hits needed to accept a face
pub const DEFAULT_MIN_NEIGHBORS: i32 = 3;

/// Label drawn above a tracked face
pub const FACE_LABEL: &str = "TARGET";

/// Annotation color (BGR)
pub const ANNOTATION_COLOR: (f64, f64, f64) = (255.0, 0.0, 0.0);

/// Annotation line thickness in pixels
pub const ANNOTATION_THICKNESS: i32 = 3;

/// Number of commands the dry-run driver remembers
pub const DRY_RUN_HISTORY: usize = 4096;

/// First pause after a failed frame read; doubles on each consecutive failure
pub const READ_RETRY_BASE_MS: u64 = 5;

/// Longest pause between failed frame reads
pub const READ_RETRY_MAX_MS: u64 = 500;

/// Consecutive read failures between repeated warnings
pub const READ_FAILURE_LOG_EVERY: u32 = 100;
