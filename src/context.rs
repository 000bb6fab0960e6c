//! Visual context capture: a single-slot store for the snapshot that
//! enriches one spoken query.
//!
//! At most one snapshot is live at a time. Consumption is an atomic take so
//! no concurrent reader ever observes a half-consumed artifact, and a
//! consumed or cleared snapshot can never be reused for a later query.

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use tracing::debug;

/// A transient visual snapshot of the detected poster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSnapshot {
    /// Encoded image bytes (JPEG as produced by the capture pipeline).
    pub data: Vec<u8>,
    /// When the snapshot was captured.
    pub captured_at: DateTime<Utc>,
}

impl ContextSnapshot {
    /// Wrap freshly captured image bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            captured_at: Utc::now(),
        }
    }
}

/// Owner of the at-most-one live [`ContextSnapshot`].
#[derive(Default)]
pub struct ContextCapture {
    slot: Mutex<Option<ContextSnapshot>>,
}

impl ContextCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a snapshot, replacing and freeing any previous one.
    pub fn set(&self, snapshot: ContextSnapshot) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            debug!("replacing unconsumed context snapshot");
        }
        *slot = Some(snapshot);
    }

    /// Take the snapshot, leaving the slot empty.
    ///
    /// After a non-`None` return, the next call returns `None` until a new
    /// `set`.
    pub fn consume_and_clear(&self) -> Option<ContextSnapshot> {
        self.slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    /// Explicit disposal on reset.
    pub fn clear(&self) {
        let _ = self.consume_and_clear();
    }

    /// Whether a snapshot is currently held.
    pub fn is_set(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn single_consumption_law() {
        let capture = ContextCapture::new();
        let snap = ContextSnapshot::new(vec![1, 2, 3]);
        capture.set(snap.clone());
        assert_eq!(capture.consume_and_clear(), Some(snap));
        assert_eq!(capture.consume_and_clear(), None);
    }

    #[test]
    fn set_replaces_previous() {
        let capture = ContextCapture::new();
        capture.set(ContextSnapshot::new(vec![1]));
        capture.set(ContextSnapshot::new(vec![2]));
        assert_eq!(capture.consume_and_clear().unwrap().data, vec![2]);
        assert_eq!(capture.consume_and_clear(), None);
    }

    #[test]
    fn clear_disposes() {
        let capture = ContextCapture::new();
        capture.set(ContextSnapshot::new(vec![9]));
        assert!(capture.is_set());
        capture.clear();
        assert!(!capture.is_set());
        assert_eq!(capture.consume_and_clear(), None);
    }

    #[test]
    fn empty_capture_yields_none() {
        let capture = ContextCapture::new();
        assert!(!capture.is_set());
        assert_eq!(capture.consume_and_clear(), None);
    }
}
