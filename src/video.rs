//! Raw frame sources for the autopilot loop.
//!
//! Every source fills a caller-provided buffer with exactly one packed BGR24
//! frame of the configured size. A short read is a transient fault reported as
//! [`Error::ShortRead`]; [`Error::StreamClosed`] means no frame will ever come again.

use crate::{Error, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use log::info;
use opencv::core::{Mat, Size};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE};
use std::io::{ErrorKind, Read};

/// Continuous supplier of fixed-size raw frames
pub trait VideoSource: Send {
    /// Fill `buf` with the next frame, blocking until one is available
    fn read_frame(&mut self, buf: &mut [u8]) -> Result<()>;
}

/// Reads back-to-back raw frames from a byte stream, such as the stdout of
/// `ffmpeg -f rawvideo -pix_fmt bgr24`.
pub struct RawPipeSource<R> {
    reader: R,
}

impl<R: Read + Send> RawPipeSource<R> {
    /// Wrap a reader
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: Read + Send> VideoSource for RawPipeSource<R> {
    fn read_frame(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        if filled == buf.len() {
            Ok(())
        } else if filled == 0 {
            Err(Error::StreamClosed)
        } else {
            Err(Error::ShortRead {
                expected: buf.len(),
                actual: filled,
            })
        }
    }
}

/// Frames pushed from elsewhere, e.g. a driver's video-frame event handler
pub struct ChannelSource {
    frames: Receiver<Vec<u8>>,
}

impl ChannelSource {
    /// Create a source and the sender that feeds it. The source closes once
    /// every sender is dropped and the queue has drained.
    pub fn new(capacity: usize) -> (Sender<Vec<u8>>, Self) {
        let (tx, rx) = bounded(capacity);
        (tx, Self { frames: rx })
    }
}

impl VideoSource for ChannelSource {
    fn read_frame(&mut self, buf: &mut [u8]) -> Result<()> {
        let frame = self.frames.recv().map_err(|_| Error::StreamClosed)?;
        if frame.len() < buf.len() {
            return Err(Error::ShortRead {
                expected: buf.len(),
                actual: frame.len(),
            });
        }
        if frame.len() > buf.len() {
            return Err(Error::InvalidInput(format!(
                "Frame of {} bytes does not fit a {} byte buffer",
                frame.len(),
                buf.len()
            )));
        }
        buf.copy_from_slice(&frame);
        Ok(())
    }
}

/// Where an OpenCV capture reads from
#[derive(Debug, Clone)]
pub enum CaptureInput {
    /// Webcam index
    Camera(i32),
    /// Video file path
    File(String),
}

/// OpenCV `VideoCapture`, resized to the configured frame size
pub struct CaptureSource {
    capture: VideoCapture,
    input: CaptureInput,
    size: Size,
}

impl CaptureSource {
    /// Open a camera or video file
    pub fn open(input: CaptureInput, width: i32, height: i32) -> Result<Self> {
        let capture = match &input {
            CaptureInput::Camera(index) => {
                info!("Opening camera {}", index);
                let mut cap = VideoCapture::new(*index, videoio::CAP_ANY)?;
                // Keep latency low: never queue more than one frame.
                cap.set(CAP_PROP_BUFFERSIZE, 1.0)?;
                cap
            }
            CaptureInput::File(path) => {
                info!("Opening video file: {}", path);
                VideoCapture::from_file(path, videoio::CAP_ANY)?
            }
        };

        if !capture.is_opened()? {
            return Err(Error::InvalidInput(format!("Could not open video input {input:?}")));
        }

        Ok(Self {
            capture,
            input,
            size: Size::new(width, height),
        })
    }
}

impl VideoSource for CaptureSource {
    fn read_frame(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.empty() {
            return match self.input {
                CaptureInput::File(_) => Err(Error::StreamClosed),
                CaptureInput::Camera(_) => Err(Error::ShortRead {
                    expected: buf.len(),
                    actual: 0,
                }),
            };
        }

        let mut resized = Mat::default();
        imgproc::resize(
            &frame,
            &mut resized,
            self.size,
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let bytes = resized.data_bytes()?;
        if bytes.len() != buf.len() {
            return Err(Error::ShortRead {
                expected: buf.len(),
                actual: bytes.len(),
            });
        }
        buf.copy_from_slice(bytes);
        Ok(())
    }
}
