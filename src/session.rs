//! Session and state types shared between the engine and its observers.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use uuid::Uuid;

/// Overall conversation state. Exactly one value is active at a time,
/// owned exclusively by the engine actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    /// Engine constructed or reset; detection is not running.
    Idle,
    /// Waiting for the external matcher to report an object.
    Scanning,
    /// Resolving a detection or fetching content.
    Loading,
    /// An object is resolved and awaiting user confirmation.
    Detected,
    /// The introductory video is playing.
    PlayingIntro,
    /// Waiting for the user's spoken query.
    Listening,
    /// The response video is playing.
    PlayingResponse,
    /// Conversation over; scanning resumes after a fixed delay.
    Finished,
}

impl ConversationState {
    /// True while a session record must exist.
    pub fn session_active(self) -> bool {
        matches!(
            self,
            Self::Loading
                | Self::Detected
                | Self::PlayingIntro
                | Self::Listening
                | Self::PlayingResponse
        )
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Loading => "loading",
            Self::Detected => "detected",
            Self::PlayingIntro => "playing_intro",
            Self::Listening => "listening",
            Self::PlayingResponse => "playing_response",
            Self::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// What the presentation layer should currently play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// Generated content streamed from the backend.
    Remote(String),
    /// Bundled fallback asset on disk.
    Local(PathBuf),
}

/// Which kind of content a fallback lookup is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Intro,
    Response,
}

/// Per-detection-cycle record of which object is being discussed and what
/// content has been resolved for it.
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique id for this conversation cycle.
    pub id: Uuid,
    /// Identity reported by the external matcher.
    pub object_key: String,
    /// Human-readable label reported alongside the detection.
    pub label: String,
    /// Backend content identifier; `None` until catalog resolution succeeds.
    pub content_id: Option<String>,
    /// Resolved intro content.
    pub intro: Option<VideoSource>,
    /// Resolved response content.
    pub response: Option<VideoSource>,
    /// When this session was created.
    pub created_at: DateTime<Utc>,
    /// Cycle generation; async completions carrying a different generation
    /// are stale and dropped.
    pub generation: u64,
}

impl Session {
    /// Create a fresh session for a newly accepted detection.
    pub fn new(object_key: impl Into<String>, label: impl Into<String>, generation: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            object_key: object_key.into(),
            label: label.into(),
            content_id: None,
            intro: None,
            response: None,
            created_at: Utc::now(),
            generation,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn session_active_matches_state_table() {
        use ConversationState::*;
        for state in [Loading, Detected, PlayingIntro, Listening, PlayingResponse] {
            assert!(state.session_active(), "{state} should carry a session");
        }
        for state in [Idle, Scanning, Finished] {
            assert!(!state.session_active(), "{state} should not carry a session");
        }
    }

    #[test]
    fn new_session_is_unresolved() {
        let session = Session::new("p1", "Widget", 7);
        assert_eq!(session.object_key, "p1");
        assert_eq!(session.generation, 7);
        assert!(session.content_id.is_none());
        assert!(session.intro.is_none());
        assert!(session.response.is_none());
    }
}
