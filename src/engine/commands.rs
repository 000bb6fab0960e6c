//! Inbound messages serialized through the engine actor.

use crate::context::ContextSnapshot;
use crate::gateway::GeneratedContent;

/// Everything that can happen to the conversation engine, from external
/// producers (detections, playback, UI) and from its own spawned tasks
/// (fetch completions, silence results, the rescan timer).
#[derive(Debug)]
pub(crate) enum EngineCommand {
    /// Begin (or resume) scanning for posters.
    StartScanning,
    /// The detection gate accepted an object report.
    ObjectDetected { key: String, label: String },
    /// The user confirmed the detected object.
    ConfirmSelection,
    /// The capture pipeline produced a visual context snapshot.
    SetContextSnapshot(ContextSnapshot),
    /// The video player finished the current asset.
    VideoCompleted,
    /// Abort the current cycle and return to idle.
    Reset,

    /// Intro fetch completed (`None` = retries exhausted).
    IntroFetched {
        generation: u64,
        content: Option<GeneratedContent>,
    },
    /// Response fetch completed (`None` = retries exhausted).
    ResponseFetched {
        generation: u64,
        content: Option<GeneratedContent>,
    },
    /// Partial transcript from the listening window.
    TranscriptPartial { generation: u64, text: String },
    /// Silence reached; final transcript for the spoken query.
    SilenceDetected { generation: u64, transcript: String },
    /// Progress message from a gateway retry loop.
    GatewayProgress { generation: u64, message: String },
    /// The post-conversation delay elapsed; scanning may resume.
    ResumeScanning { generation: u64 },
}
