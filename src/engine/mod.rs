//! Conversation engine: the state machine that turns detection events into
//! a scripted talking-poster experience.
//!
//! All state lives on a single actor task fed by an unbounded command
//! channel, so a detection arriving mid-retry is ignored rather than racing
//! with a transition. Long-running work (gateway fetches, the listening
//! window, the rescan timer) runs on spawned tasks that report back through
//! the same channel, tagged with the generation of the cycle that spawned
//! them; stale completions are dropped.

mod commands;

use crate::config::{CatalogEntry, ConversationConfig, MuralConfig};
use crate::context::{ContextCapture, ContextSnapshot};
use crate::engine::commands::EngineCommand;
use crate::fallback::FallbackLibrary;
use crate::gate::DetectionGate;
use crate::gateway::{ContentGateway, ProgressFn};
use crate::runtime::{RuntimeEvent, ViewState};
use crate::session::{ContentKind, ConversationState, Session, VideoSource};
use crate::speech::SpeechCapture;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Buffer size for the runtime event broadcast.
const EVENT_CHANNEL_SIZE: usize = 64;

/// Handle to a running conversation engine.
///
/// Cheap to clone; every inbound producer (detection pipeline, video
/// player, UI) holds one. Operations invoked outside their valid source
/// state are logged no-ops, because upstream producers cannot be made
/// state-aware, so the engine is defensively idempotent against
/// out-of-order or duplicate calls.
#[derive(Clone)]
pub struct ConversationEngine {
    cmd_tx: mpsc::UnboundedSender<EngineCommand>,
    view_rx: watch::Receiver<ViewState>,
    events_tx: broadcast::Sender<RuntimeEvent>,
    gate: Arc<DetectionGate>,
    cancel: CancellationToken,
}

impl ConversationEngine {
    /// Spawn the engine actor with its collaborators injected.
    pub fn spawn(
        config: MuralConfig,
        gateway: Arc<dyn ContentGateway>,
        speech: Arc<dyn SpeechCapture>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(ViewState::default());
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let gate = Arc::new(DetectionGate::new(Duration::from_secs(
            config.gate.cooldown_secs,
        )));
        let cancel = CancellationToken::new();

        let core = EngineCore {
            config: config.conversation,
            catalog: config.catalog.clone(),
            fallback: FallbackLibrary::from_catalog(&config.catalog),
            gateway,
            speech,
            gate: Arc::clone(&gate),
            context: Arc::new(ContextCapture::new()),
            cmd_tx: cmd_tx.clone(),
            cmd_rx,
            view_tx,
            events_tx: events_tx.clone(),
            cancel: cancel.clone(),
            state: ConversationState::Idle,
            session: None,
            generation: 0,
            cycle_cancel: cancel.child_token(),
            resume_job: None,
            video: None,
            transcript: String::new(),
            status: None,
        };
        tokio::spawn(core.run());

        Self {
            cmd_tx,
            view_rx,
            events_tx,
            gate,
            cancel,
        }
    }

    /// Begin scanning for posters. Valid from idle/finished.
    pub fn start_scanning(&self) {
        self.send(EngineCommand::StartScanning);
    }

    /// Report a detection from the external matcher.
    ///
    /// Called at camera frame rate; the gate check runs on the caller's
    /// thread and only accepted detections reach the actor.
    pub fn on_object_detected(&self, key: &str, label: &str) {
        if !self.gate.try_accept(key, Instant::now()) {
            return;
        }
        self.send(EngineCommand::ObjectDetected {
            key: key.to_owned(),
            label: label.to_owned(),
        });
    }

    /// Confirm the detected object and start the intro fetch.
    pub fn confirm_selection(&self) {
        self.send(EngineCommand::ConfirmSelection);
    }

    /// Attach a visual context snapshot to the current session.
    pub fn set_context_snapshot(&self, snapshot: ContextSnapshot) {
        self.send(EngineCommand::SetContextSnapshot(snapshot));
    }

    /// Playback-completion callback from the video player. Idempotent.
    pub fn on_video_completed(&self) {
        self.send(EngineCommand::VideoCompleted);
    }

    /// Abort the current cycle, cancel pending work, and return to idle.
    pub fn reset(&self) {
        self.send(EngineCommand::Reset);
    }

    /// Stop the engine. All in-flight work and timers are cancelled and
    /// held resources released. Idempotent.
    pub fn destroy(&self) {
        self.cancel.cancel();
    }

    /// Current observable snapshot.
    pub fn view(&self) -> ViewState {
        self.view_rx.borrow().clone()
    }

    /// Watch the observable snapshot for changes.
    pub fn watch_view(&self) -> watch::Receiver<ViewState> {
        self.view_rx.clone()
    }

    /// Subscribe to discrete runtime events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<RuntimeEvent> {
        self.events_tx.subscribe()
    }

    fn send(&self, cmd: EngineCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            debug!("engine command dropped after destroy");
        }
    }
}

/// Actor state. Owned by exactly one task; never shared.
struct EngineCore {
    config: ConversationConfig,
    catalog: BTreeMap<String, CatalogEntry>,
    fallback: FallbackLibrary,
    gateway: Arc<dyn ContentGateway>,
    speech: Arc<dyn SpeechCapture>,
    gate: Arc<DetectionGate>,
    context: Arc<ContextCapture>,
    cmd_tx: mpsc::UnboundedSender<EngineCommand>,
    cmd_rx: mpsc::UnboundedReceiver<EngineCommand>,
    view_tx: watch::Sender<ViewState>,
    events_tx: broadcast::Sender<RuntimeEvent>,
    cancel: CancellationToken,

    state: ConversationState,
    session: Option<Session>,
    /// Monotonic cycle counter; bumped per accepted detection and per reset.
    generation: u64,
    /// Cancels the current cycle's spawned work. Recreated per cycle.
    cycle_cancel: CancellationToken,
    /// Cancels the pending finished→scanning timer, if one is scheduled.
    resume_job: Option<CancellationToken>,

    video: Option<VideoSource>,
    transcript: String,
    status: Option<String>,
}

impl EngineCore {
    async fn run(mut self) {
        info!("conversation engine started");
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle(cmd).await,
                    None => break,
                }
            }
        }

        // Deterministic release on shutdown: no timer may fire post-destroy.
        self.cancel_resume_job();
        self.cycle_cancel.cancel();
        self.speech.destroy().await;
        self.context.clear();
        self.gate.suspend();
        info!("conversation engine stopped");
    }

    async fn handle(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::StartScanning => self.handle_start_scanning(),
            EngineCommand::ObjectDetected { key, label } => self.handle_object_detected(key, label),
            EngineCommand::ConfirmSelection => self.handle_confirm_selection(),
            EngineCommand::SetContextSnapshot(snapshot) => self.handle_set_context(snapshot),
            EngineCommand::VideoCompleted => self.handle_video_completed(),
            EngineCommand::Reset => self.handle_reset().await,
            EngineCommand::IntroFetched {
                generation,
                content,
            } => self.handle_intro_fetched(generation, content),
            EngineCommand::ResponseFetched {
                generation,
                content,
            } => self.handle_response_fetched(generation, content),
            EngineCommand::TranscriptPartial { generation, text } => {
                self.handle_transcript_partial(generation, text);
            }
            EngineCommand::SilenceDetected {
                generation,
                transcript,
            } => self.handle_silence_detected(generation, transcript).await,
            EngineCommand::GatewayProgress {
                generation,
                message,
            } => self.handle_gateway_progress(generation, message),
            EngineCommand::ResumeScanning { generation } => {
                self.handle_resume_scanning(generation);
            }
        }
    }

    // ── Transitions ───────────────────────────────────────────

    fn handle_start_scanning(&mut self) {
        match self.state {
            ConversationState::Idle | ConversationState::Finished => self.begin_scanning(),
            ConversationState::Scanning => debug!("already scanning"),
            _ => self.ignored("start_scanning"),
        }
    }

    fn handle_object_detected(&mut self, key: String, label: String) {
        if self.state != ConversationState::Scanning {
            // The gate usually blocks these, but a detection accepted just
            // before suspension can still arrive here.
            self.ignored("object_detected");
            return;
        }

        self.gate.suspend();
        self.generation += 1;
        self.cycle_cancel = self.cancel.child_token();
        self.set_state(ConversationState::Loading);

        match self.catalog.get(&key) {
            Some(entry) => {
                let mut session = Session::new(key, label, self.generation);
                session.content_id = Some(entry.content_id.clone());
                info!(
                    object_key = %session.object_key,
                    content_id = %entry.content_id,
                    session_id = %session.id,
                    "object resolved"
                );
                self.session = Some(session);
                self.set_state(ConversationState::Detected);
            }
            None => {
                warn!(%key, "detected object not in catalog; resuming scan");
                self.session = None;
                self.set_state(ConversationState::Scanning);
                self.gate.resume();
            }
        }
    }

    fn handle_confirm_selection(&mut self) {
        if self.state != ConversationState::Detected {
            self.ignored("confirm_selection");
            return;
        }
        let Some(session) = &self.session else {
            warn!("no session at confirmation; resuming scan");
            self.begin_scanning();
            return;
        };
        let Some(content_id) = session.content_id.clone() else {
            warn!("session has no content id; resuming scan");
            self.begin_scanning();
            return;
        };

        let generation = session.generation;
        self.set_state(ConversationState::Loading);

        let gateway = Arc::clone(&self.gateway);
        let cancel = self.cycle_cancel.clone();
        let progress = self.progress_fn(generation);
        let cmd_tx = self.cmd_tx.clone();
        tokio::spawn(async move {
            let content = gateway.fetch_intro(&content_id, progress, &cancel).await;
            let _ = cmd_tx.send(EngineCommand::IntroFetched {
                generation,
                content,
            });
        });
    }

    fn handle_intro_fetched(
        &mut self,
        generation: u64,
        content: Option<crate::gateway::GeneratedContent>,
    ) {
        if !self.is_current(generation, ConversationState::Loading) {
            return;
        }
        match content {
            Some(content) => {
                let source = VideoSource::Remote(content.video_url);
                if let Some(session) = &mut self.session {
                    session.intro = Some(source.clone());
                }
                self.play(source, ConversationState::PlayingIntro);
            }
            None => {
                let fallback = self
                    .session
                    .as_ref()
                    .and_then(|s| self.fallback.resolve(&s.object_key, ContentKind::Intro))
                    .map(|p| VideoSource::Local(p.to_owned()));
                match fallback {
                    Some(source) => {
                        info!("gateway exhausted; playing bundled intro");
                        if let Some(session) = &mut self.session {
                            session.intro = Some(source.clone());
                        }
                        self.play(source, ConversationState::PlayingIntro);
                    }
                    None => {
                        warn!("intro unavailable and no fallback bundled");
                        self.set_state(ConversationState::Detected);
                        self.set_status(Some(
                            "Content is temporarily unavailable. Please try again.".to_owned(),
                        ));
                    }
                }
            }
        }
    }

    fn handle_video_completed(&mut self) {
        match self.state {
            ConversationState::PlayingIntro => self.begin_listening(),
            ConversationState::PlayingResponse => self.enter_finished(),
            _ => self.ignored("video_completed"),
        }
    }

    fn begin_listening(&mut self) {
        let Some(generation) = self.session.as_ref().map(|s| s.generation) else {
            warn!("no session when entering listening; resuming scan");
            self.begin_scanning();
            return;
        };
        self.transcript.clear();
        self.set_state(ConversationState::Listening);

        let (partial_tx, mut partial_rx) = mpsc::unbounded_channel::<String>();
        let forward_tx = self.cmd_tx.clone();
        tokio::spawn(async move {
            while let Some(text) = partial_rx.recv().await {
                let _ = forward_tx.send(EngineCommand::TranscriptPartial { generation, text });
            }
        });

        let speech = Arc::clone(&self.speech);
        let cancel = self.cycle_cancel.child_token();
        let cmd_tx = self.cmd_tx.clone();
        tokio::spawn(async move {
            let result = speech.listen(partial_tx, cancel.clone()).await;
            if cancel.is_cancelled() {
                return;
            }
            let transcript = match result {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "speech capture failed; treating as silence");
                    String::new()
                }
            };
            let _ = cmd_tx.send(EngineCommand::SilenceDetected {
                generation,
                transcript,
            });
        });
    }

    fn handle_transcript_partial(&mut self, generation: u64, text: String) {
        if !self.is_current(generation, ConversationState::Listening) {
            return;
        }
        self.transcript = text.clone();
        self.emit(RuntimeEvent::Transcript {
            text,
            is_final: false,
        });
        self.publish();
    }

    async fn handle_silence_detected(&mut self, generation: u64, transcript: String) {
        if !self.is_current(generation, ConversationState::Listening) {
            return;
        }
        self.transcript = transcript.clone();
        self.emit(RuntimeEvent::Transcript {
            text: transcript.clone(),
            is_final: true,
        });
        self.publish();

        // The audio channel has one exclusive consumer: release capture
        // before any response playback can start.
        self.speech.destroy().await;

        let query = transcript.trim().to_owned();
        if query.is_empty() {
            info!("nothing heard; finishing conversation");
            self.enter_finished();
            return;
        }

        let Some(content_id) = self.session.as_ref().and_then(|s| s.content_id.clone()) else {
            warn!("no resolved session for query; finishing");
            self.enter_finished();
            return;
        };

        self.set_state(ConversationState::Loading);

        let context = self.context.consume_and_clear();
        let gateway = Arc::clone(&self.gateway);
        let cancel = self.cycle_cancel.clone();
        let progress = self.progress_fn(generation);
        let cmd_tx = self.cmd_tx.clone();
        tokio::spawn(async move {
            let content = gateway
                .fetch_response(&query, &content_id, context, progress, &cancel)
                .await;
            let _ = cmd_tx.send(EngineCommand::ResponseFetched {
                generation,
                content,
            });
        });
    }

    fn handle_response_fetched(
        &mut self,
        generation: u64,
        content: Option<crate::gateway::GeneratedContent>,
    ) {
        if !self.is_current(generation, ConversationState::Loading) {
            return;
        }
        match content {
            Some(content) => {
                let source = VideoSource::Remote(content.video_url);
                if let Some(session) = &mut self.session {
                    session.response = Some(source.clone());
                }
                self.play(source, ConversationState::PlayingResponse);
            }
            None => {
                let fallback = self
                    .session
                    .as_ref()
                    .and_then(|s| self.fallback.resolve(&s.object_key, ContentKind::Response))
                    .map(|p| VideoSource::Local(p.to_owned()));
                match fallback {
                    Some(source) => {
                        info!("gateway exhausted; playing bundled response");
                        if let Some(session) = &mut self.session {
                            session.response = Some(source.clone());
                        }
                        self.play(source, ConversationState::PlayingResponse);
                    }
                    None => {
                        warn!("response unavailable and no fallback bundled; finishing");
                        self.enter_finished();
                        self.set_status(Some(
                            "Sorry, I couldn't answer that right now.".to_owned(),
                        ));
                    }
                }
            }
        }
    }

    fn handle_set_context(&mut self, snapshot: ContextSnapshot) {
        if self.state.session_active() {
            self.context.set(snapshot);
        } else {
            debug!(state = %self.state, "context snapshot dropped outside session");
        }
    }

    fn handle_gateway_progress(&mut self, generation: u64, message: String) {
        if !self.is_current(generation, ConversationState::Loading) {
            return;
        }
        self.set_status(Some(message));
    }

    fn handle_resume_scanning(&mut self, generation: u64) {
        if self.state != ConversationState::Finished || generation != self.generation {
            debug!(generation, "stale rescan timer dropped");
            return;
        }
        self.begin_scanning();
    }

    async fn handle_reset(&mut self) {
        info!(state = %self.state, "engine reset");
        self.cancel_resume_job();
        self.cycle_cancel.cancel();
        self.generation += 1;
        self.speech.destroy().await;
        self.context.clear();
        self.session = None;
        self.gate.suspend();
        self.transcript.clear();
        self.set_video(None);
        self.set_state(ConversationState::Idle);
    }

    // ── Shared steps ──────────────────────────────────────────

    /// Enter scanning with a clean slate. Pending rescan timers are
    /// cancelled before anything else so a stale prior-cycle job can never
    /// fire into the new cycle.
    fn begin_scanning(&mut self) {
        self.cancel_resume_job();
        self.cycle_cancel.cancel();
        self.session = None;
        self.context.clear();
        self.transcript.clear();
        self.set_video(None);
        self.set_state(ConversationState::Scanning);
        self.gate.resume();
    }

    fn enter_finished(&mut self) {
        self.cycle_cancel.cancel();
        self.session = None;
        self.context.clear();
        self.set_video(None);
        self.set_state(ConversationState::Finished);
        self.schedule_resume();
    }

    /// Schedule the finished→scanning transition. Exactly one job may be
    /// pending; any previous one is cancelled first.
    fn schedule_resume(&mut self) {
        self.cancel_resume_job();
        let token = self.cancel.child_token();
        let generation = self.generation;
        let delay = Duration::from_millis(self.config.rescan_delay_ms);
        let cmd_tx = self.cmd_tx.clone();
        let job_token = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = job_token.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    let _ = cmd_tx.send(EngineCommand::ResumeScanning { generation });
                }
            }
        });
        self.resume_job = Some(token);
    }

    fn cancel_resume_job(&mut self) {
        if let Some(token) = self.resume_job.take() {
            token.cancel();
        }
    }

    fn play(&mut self, source: VideoSource, state: ConversationState) {
        self.gate.suspend();
        self.set_video(Some(source));
        self.set_state(state);
    }

    /// True when a completion belongs to the live cycle and the engine is
    /// in the expected state; logs and drops it otherwise.
    fn is_current(&self, generation: u64, expected: ConversationState) -> bool {
        let live = self
            .session
            .as_ref()
            .is_some_and(|s| s.generation == generation);
        if !live || self.state != expected {
            warn!(
                generation,
                state = %self.state,
                "stale async completion dropped"
            );
            return false;
        }
        true
    }

    fn progress_fn(&self, generation: u64) -> ProgressFn {
        let cmd_tx = self.cmd_tx.clone();
        Arc::new(move |message| {
            let _ = cmd_tx.send(EngineCommand::GatewayProgress {
                generation,
                message,
            });
        })
    }

    fn ignored(&self, op: &str) {
        debug!(state = %self.state, op, "operation ignored in current state");
    }

    // ── Observability ─────────────────────────────────────────

    fn set_state(&mut self, to: ConversationState) {
        let from = std::mem::replace(&mut self.state, to);
        self.status = None;
        if from != to {
            debug!(%from, %to, "state transition");
            self.emit(RuntimeEvent::StateChanged { from, to });
        }
        self.publish();
    }

    fn set_video(&mut self, video: Option<VideoSource>) {
        if self.video != video {
            self.video = video.clone();
            self.emit(RuntimeEvent::VideoChanged(video));
        }
        self.publish();
    }

    fn set_status(&mut self, status: Option<String>) {
        self.status = status.clone();
        self.emit(RuntimeEvent::Status(status));
        self.publish();
    }

    fn emit(&self, event: RuntimeEvent) {
        // Lagging or absent subscribers are fine.
        let _ = self.events_tx.send(event);
    }

    fn publish(&self) {
        let _ = self.view_tx.send(ViewState {
            state: self.state,
            video: self.video.clone(),
            transcript: self.transcript.clone(),
            status: self.status.clone(),
        });
    }
}
