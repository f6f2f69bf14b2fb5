use crate::{config::DetectorConfig, error::Error, Result};
use log::{debug, info};
use opencv::core::{Mat, Rect, Size, Vector};
use opencv::imgproc;
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;

/// Anything that can find faces in a BGR frame.
///
/// Boxes are returned in the detector's own order; the tracking policy decides
/// which one to follow.
pub trait FaceDetector: Send {
    /// Detect faces in `image`
    fn detect(&mut self, image: &Mat) -> Result<Vec<Rect>>;
}

/// Viola-Jones face detector backed by an OpenCV Haar cascade
pub struct CascadeFaceDetector {
    classifier: CascadeClassifier,
    scale_factor: f64,
    min_neighbors: i32,
}

impl CascadeFaceDetector {
    /// Load the cascade named in `config`
    pub fn new(config: &DetectorConfig) -> Result<Self> {
        let path = config.cascade.to_str().ok_or_else(|| {
            Error::Detector(format!("Cascade path is not valid UTF-8: {}", config.cascade.display()))
        })?;

        if !config.cascade.exists() {
            return Err(Error::Detector(format!("Cascade file not found: {path}")));
        }

        let classifier = CascadeClassifier::new(path)?;
        if classifier.empty()? {
            return Err(Error::Detector(format!("Failed to load cascade: {path}")));
        }

        info!("Loaded face cascade from {}", path);

        Ok(Self {
            classifier,
            scale_factor: config.scale_factor,
            min_neighbors: config.min_neighbors,
        })
    }
}

impl FaceDetector for CascadeFaceDetector {
    fn detect(&mut self, image: &Mat) -> Result<Vec<Rect>> {
        let mut gray = Mat::default();
        imgproc::cvt_color(image, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;

        let mut faces = Vector::<Rect>::new();
        self.classifier.detect_multi_scale(
            &gray,
            &mut faces,
            self.scale_factor,
            self.min_neighbors,
            0,
            Size::new(0, 0),
            Size::new(0, 0),
        )?;

        debug!("Cascade returned {} candidates", faces.len());
        Ok(faces.to_vec())
    }
}
