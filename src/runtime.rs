//! Runtime events and the observable view snapshot for the presentation layer.
//!
//! This is intentionally lightweight (no heavy payloads) so the engine can
//! emit events without blocking the detection or playback paths.

use crate::session::{ConversationState, VideoSource};

/// Events that describe what the engine is doing "right now".
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// The conversation state changed.
    StateChanged {
        from: ConversationState,
        to: ConversationState,
    },
    /// The video the presentation layer should play changed.
    VideoChanged(Option<VideoSource>),
    /// A transcript update from the listening window.
    Transcript {
        text: String,
        /// Whether this is the final transcript (silence reached).
        is_final: bool,
    },
    /// A transient user-facing status message, or `None` when cleared.
    Status(Option<String>),
}

/// Continuously observable snapshot of the engine, published on a `watch`
/// channel. The presentation layer renders directly from this.
#[derive(Debug, Clone)]
pub struct ViewState {
    /// Current conversation state.
    pub state: ConversationState,
    /// Video the presentation layer should currently play, if any.
    pub video: Option<VideoSource>,
    /// In-progress transcript while listening.
    pub transcript: String,
    /// Transient status message (e.g. retry/fallback notices).
    pub status: Option<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            state: ConversationState::Idle,
            video: None,
            transcript: String::new(),
            status: None,
        }
    }
}
