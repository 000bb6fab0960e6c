//! Speech capture seam.
//!
//! The actual speech-to-text engine lives outside this crate; the engine
//! only needs a listening window that streams partial transcripts and
//! resolves with the final transcript once silence is detected.

use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Listening windows over the exclusive audio capture resource.
///
/// `listen` opens a window and resolves with the final transcript when the
/// speaker falls silent; partial transcripts are streamed through
/// `partials` as they become available. Cancelling the token abandons the
/// window. `destroy` releases the audio capture resource until the next
/// window and MUST be called before video playback needs the audio channel;
/// there is one exclusive audio consumer at a time.
#[async_trait]
pub trait SpeechCapture: Send + Sync {
    /// Listen until silence and return the final transcript.
    ///
    /// An empty transcript means the user said nothing intelligible.
    ///
    /// # Errors
    ///
    /// Returns an error if the capture device fails; callers treat this as
    /// "no input available" rather than a fatal condition.
    async fn listen(
        &self,
        partials: mpsc::UnboundedSender<String>,
        cancel: CancellationToken,
    ) -> Result<String>;

    /// Release the audio capture resource. Idempotent.
    async fn destroy(&self);
}
