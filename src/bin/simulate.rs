//! Scripted end-to-end demo of the conversation engine.
//!
//! Wires the engine to a stub gateway and a stub speech source, then drives
//! one full conversation cycle the way the AR frontend would: detection →
//! confirmation → intro → spoken query → response → rescan. Useful for
//! watching transitions in the logs without a backend or a camera.

use async_trait::async_trait;
use mural::config::CatalogEntry;
use mural::gateway::{ContentGateway, GeneratedContent, ProgressFn};
use mural::speech::SpeechCapture;
use mural::{ConversationEngine, ConversationState, MuralConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Gateway stub that "generates" content after a short delay.
struct ScriptedGateway;

#[async_trait]
impl ContentGateway for ScriptedGateway {
    async fn fetch_intro(
        &self,
        content_id: &str,
        _progress: ProgressFn,
        _cancel: &CancellationToken,
    ) -> Option<GeneratedContent> {
        tokio::time::sleep(Duration::from_millis(300)).await;
        Some(GeneratedContent {
            video_url: format!("https://cdn.example/intro/{content_id}.mp4"),
            response_text: None,
        })
    }

    async fn fetch_response(
        &self,
        query: &str,
        content_id: &str,
        _context: Option<mural::ContextSnapshot>,
        _progress: ProgressFn,
        _cancel: &CancellationToken,
    ) -> Option<GeneratedContent> {
        tokio::time::sleep(Duration::from_millis(300)).await;
        Some(GeneratedContent {
            video_url: format!("https://cdn.example/answer/{content_id}.mp4"),
            response_text: Some(format!("You asked: {query}")),
        })
    }
}

/// Speech stub that streams two partials and then "hears" a question.
struct ScriptedSpeech;

#[async_trait]
impl SpeechCapture for ScriptedSpeech {
    async fn listen(
        &self,
        partials: mpsc::UnboundedSender<String>,
        _cancel: CancellationToken,
    ) -> mural::Result<String> {
        for partial in ["what is", "what is this poster"] {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = partials.send(partial.to_owned());
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok("what is this poster about?".to_owned())
    }

    async fn destroy(&self) {}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config = MuralConfig::default();
    config.conversation.rescan_delay_ms = 1000;
    config.catalog.insert(
        "demo-poster".into(),
        CatalogEntry {
            content_id: "demo-1".into(),
            display_name: "Demo Poster".into(),
            intro_asset: None,
            response_asset: None,
        },
    );

    let engine =
        ConversationEngine::spawn(config, Arc::new(ScriptedGateway), Arc::new(ScriptedSpeech));
    let mut view = engine.watch_view();

    engine.start_scanning();

    // Drive the cycle the way the frontend would: detect once scanning is
    // live, confirm on detection, report playback completion after a
    // pretend playout, and exit once the post-conversation rescan fires.
    let mut finished_once = false;
    loop {
        view.changed().await?;
        let snapshot = view.borrow().clone();
        tracing::info!(
            state = %snapshot.state,
            video = ?snapshot.video,
            transcript = %snapshot.transcript,
            "view"
        );
        match snapshot.state {
            ConversationState::Scanning => {
                if finished_once {
                    break;
                }
                engine.on_object_detected("demo-poster", "Demo Poster");
            }
            ConversationState::Detected => engine.confirm_selection(),
            ConversationState::PlayingIntro | ConversationState::PlayingResponse => {
                let engine = engine.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    engine.on_video_completed();
                });
            }
            ConversationState::Finished => finished_once = true,
            _ => {}
        }
    }

    engine.destroy();
    tracing::info!("simulation complete");
    Ok(())
}
