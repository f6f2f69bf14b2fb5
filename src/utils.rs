//! Utility functions for frame conversion and annotation.

pub mod image_conversion;

use crate::{
    constants::{ANNOTATION_COLOR, ANNOTATION_THICKNESS},
    Result,
};
use opencv::core::{Mat, Point, Rect, Scalar};
use opencv::imgproc::{self, FONT_HERSHEY_PLAIN, LINE_8};

/// Draw a box and a label over a tracked face
///
/// The label sits just above the top-right corner of the box, pushed down if
/// that would leave the frame.
///
/// # Errors
///
/// Returns an error if OpenCV fails to draw
pub fn annotate_face(frame: &mut Mat, face: Rect, label: &str) -> Result<()> {
    let (b, g, r) = ANNOTATION_COLOR;
    let color = Scalar::new(b, g, r, 0.0);

    imgproc::rectangle(frame, face, color, ANNOTATION_THICKNESS, LINE_8, 0)?;

    let origin = Point::new(face.x + face.width, (face.y - 5).max(12));
    imgproc::put_text(frame, label, origin, FONT_HERSHEY_PLAIN, 1.2, color, 2, LINE_8, false)?;

    Ok(())
}
