//! Detection gate: admission control for the high-frequency detection path.
//!
//! The external matcher reports detections at camera frame rate. The gate
//! rejects everything while a conversation is active, and suppresses
//! re-triggering on the same still-visible object for a cooldown window
//! once scanning resumes. A different object interrupts immediately.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

struct LastAccepted {
    key: String,
    at: Instant,
}

/// Gate state for inbound detections.
///
/// `try_accept` runs on the detection producer's thread; the accepting flag
/// is an atomic checked before any lock so rejected frames cost one load.
pub struct DetectionGate {
    accepting: AtomicBool,
    cooldown: Duration,
    last: Mutex<Option<LastAccepted>>,
}

impl DetectionGate {
    /// Create a gate with the given same-key cooldown. Gates start suspended;
    /// the engine resumes them on entering the scanning state.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            accepting: AtomicBool::new(false),
            cooldown,
            last: Mutex::new(None),
        }
    }

    /// Decide whether a detection may start a conversation.
    ///
    /// Rejects while suspended, and rejects the last accepted key for the
    /// cooldown window. Accepting records the key and timestamp.
    pub fn try_accept(&self, key: &str, at: Instant) -> bool {
        if !self.accepting.load(Ordering::Acquire) {
            return false;
        }

        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(prev) = last.as_ref()
            && prev.key == key
            && at.duration_since(prev.at) < self.cooldown
        {
            debug!(key, "detection suppressed by cooldown");
            return false;
        }
        *last = Some(LastAccepted {
            key: key.to_owned(),
            at,
        });
        true
    }

    /// Stop accepting detections (conversation active, or engine idle).
    pub fn suspend(&self) {
        self.accepting.store(false, Ordering::Release);
    }

    /// Resume accepting detections (scanning).
    pub fn resume(&self) {
        self.accepting.store(true, Ordering::Release);
    }

    /// Whether the gate currently accepts detections.
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }
}
