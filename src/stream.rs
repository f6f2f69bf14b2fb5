//! Fan-out of encoded frames to viewers.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::debug;
use std::sync::{Arc, Mutex, PoisonError};

/// Sink for encoded (JPEG) frames
pub trait FramePublisher: Send + Sync {
    /// Hand one encoded frame to every viewer
    fn publish(&self, jpeg: &[u8]);
}

/// Motion-JPEG style stream: keeps the newest frame and pushes each new frame
/// to every subscriber. A viewer that has not taken its previous frame yet
/// misses the new one rather than slowing the publisher down.
#[derive(Clone, Default)]
pub struct MjpegStream {
    inner: Arc<Mutex<StreamInner>>,
}

#[derive(Default)]
struct StreamInner {
    latest: Option<Arc<[u8]>>,
    subscribers: Vec<Sender<Arc<[u8]>>>,
}

impl MjpegStream {
    /// Create an empty stream
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a viewer. The newest frame, if any, is delivered immediately.
    pub fn subscribe(&self) -> Receiver<Arc<[u8]>> {
        let (tx, rx) = bounded(1);
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(frame) = &inner.latest {
            let _ = tx.try_send(Arc::clone(frame));
        }
        inner.subscribers.push(tx);
        rx
    }

    /// Most recently published frame
    pub fn latest(&self) -> Option<Arc<[u8]>> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .latest
            .clone()
    }

    /// Number of connected viewers
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .len()
    }
}

impl FramePublisher for MjpegStream {
    fn publish(&self, jpeg: &[u8]) {
        let frame: Arc<[u8]> = Arc::from(jpeg);
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.latest = Some(Arc::clone(&frame));
        inner.subscribers.retain(|tx| match tx.try_send(Arc::clone(&frame)) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => {
                debug!("Stream viewer disconnected");
                false
            }
        });
    }
}
