//! Conversions between raw video buffers, OpenCV Mats and encoded images.

use crate::{constants::BYTES_PER_PIXEL, Error, Result};
use opencv::core::{Mat, Scalar, Vector, CV_8UC3};
use opencv::imgcodecs;
use opencv::prelude::*;

/// Build a BGR `Mat` from a packed BGR24 buffer
///
/// # Arguments
/// * `buf` - `width * height * 3` bytes, row-major, no padding
///
/// # Errors
/// * Returns error if the buffer length does not match the frame size
/// * Returns error if Mat creation fails
pub fn bgr24_to_mat(buf: &[u8], width: i32, height: i32) -> Result<Mat> {
    if width <= 0 || height <= 0 {
        return Err(Error::InvalidInput(format!("Invalid frame size: {width}x{height}")));
    }

    // Both dimensions are positive here.
    let expected = width as usize * height as usize * BYTES_PER_PIXEL;
    if buf.len() != expected {
        return Err(Error::InvalidInput(format!(
            "Frame buffer holds {} bytes, expected {}",
            buf.len(),
            expected
        )));
    }

    let mut mat = Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::all(0.0))?;
    mat.data_bytes_mut()?.copy_from_slice(buf);
    Ok(mat)
}

/// Encode a frame as JPEG
///
/// # Errors
/// * Returns error if the encoder rejects the image
pub fn encode_jpeg(image: &Mat) -> Result<Vec<u8>> {
    let mut encoded = Vector::<u8>::new();
    if !imgcodecs::imencode(".jpg", image, &mut encoded, &Vector::new())? {
        return Err(Error::InvalidInput("JPEG encoder rejected the frame".to_string()));
    }
    Ok(encoded.to_vec())
}
