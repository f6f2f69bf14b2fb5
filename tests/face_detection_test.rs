//! Tests for the cascade face detector and its configuration

use drone_autopilot::{
    config::{Config, DetectorConfig},
    face_detection::{CascadeFaceDetector, FaceDetector},
    Error,
};
use opencv::core::{Mat, Scalar, CV_8UC3};

#[test]
fn test_missing_cascade_is_reported() {
    let config = DetectorConfig {
        cascade: "/nonexistent/haarcascade.xml".into(),
        ..DetectorConfig::default()
    };
    assert!(matches!(CascadeFaceDetector::new(&config), Err(Error::Detector(_))));
}

#[test]
fn test_detector_settings_from_yaml() {
    let config = Config::from_yaml("detector:\n  scale_factor: 1.2\n  min_neighbors: 5\n").unwrap();
    assert!((config.detector.scale_factor - 1.2).abs() < f64::EPSILON);
    assert_eq!(config.detector.min_neighbors, 5);
    assert_eq!(config.detector.cascade, DetectorConfig::default().cascade);
}

#[test]
#[ignore = "Requires the Haar cascade file on disk"]
fn test_blank_frame_has_no_faces() {
    let mut detector = CascadeFaceDetector::new(&DetectorConfig::default()).expect("Failed to load cascade");
    let frame = Mat::new_rows_cols_with_default(240, 320, CV_8UC3, Scalar::all(0.0)).unwrap();
    let faces = detector.detect(&frame).unwrap();
    assert!(faces.is_empty());
}
