//! Mural: conversational interaction engine for AR talking posters.
//!
//! Turns a stream of object-detection events into a scripted, turn-based
//! conversation: an introductory video, a listening window, a spoken-query
//! response video, then cooldown and reset.
//!
//! # Architecture
//!
//! The engine is a single actor task fed by a command channel; everything
//! around it is an injected collaborator behind a narrow interface:
//! - **Detection gate**: admits detections only while scanning, with a
//!   same-object cooldown
//! - **Content gateway**: fetches generated intro/response video over HTTP
//!   with bounded retries and exponential backoff
//! - **Fallback library**: bundled local media for when the gateway is
//!   exhausted
//! - **Context capture**: at most one transient visual snapshot enriching
//!   the next spoken query
//! - **Speech capture**: external listening window resolving at silence
//!
//! The presentation layer observes a [`runtime::ViewState`] snapshot on a
//! watch channel and discrete [`runtime::RuntimeEvent`]s on a broadcast
//! channel.

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod gate;
pub mod gateway;
pub mod runtime;
pub mod session;
pub mod speech;

pub use config::MuralConfig;
pub use context::{ContextCapture, ContextSnapshot};
pub use engine::ConversationEngine;
pub use error::{MuralError, Result};
pub use gate::DetectionGate;
pub use gateway::{ContentGateway, GeneratedContent, HttpGateway};
pub use runtime::{RuntimeEvent, ViewState};
pub use session::{ConversationState, Session, VideoSource};
pub use speech::SpeechCapture;
