//! The in-process boundary to the conversational agent pipeline.
//!
//! Speech recognition, synthesis, and the language model all live on the
//! far side of this boundary. Only two things cross it: [`CallNotice`]s
//! from the session (caller audio, identity outcome, tool replies) and
//! [`AgentEvent`]s from the agent (synthesized speech, structured tool
//! requests, hangup).

use crate::error::SessionError;
use async_trait::async_trait;
use tokio::sync::mpsc;
use voxline_tools::{ToolCall, ToolReply};
use voxline_types::SessionId;

/// What the session tells the agent pipeline.
#[derive(Debug, Clone)]
pub enum CallNotice {
    /// Inbound caller voice, PCM16 LE 16 kHz mono, in frame order.
    CallerAudio(Vec<u8>),
    /// Outcome of the identity step. When `needs_phone_verification` is
    /// true the agent must obtain the caller's number verbally before any
    /// order-mutating tool will be accepted.
    Identity {
        /// Masked caller number, when resolved.
        caller: Option<String>,
        needs_phone_verification: bool,
    },
    /// Whether a verbally stated phone number was accepted for this
    /// session.
    PhoneVerification { accepted: bool },
    /// Structured outcome of a tool request.
    ToolReply(ToolReply),
}

/// What the agent pipeline tells the session.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// Synthesized speech to play to the caller, PCM16 LE 16 kHz mono.
    Speak(Vec<u8>),
    /// A structured tool request for the router.
    Tool(ToolCall),
    /// The caller stated their phone number verbally; raw transcription.
    CallerPhoneStated(String),
    /// The agent has finished the conversation.
    Hangup,
}

/// The channel pair binding one session to one agent pipeline instance.
#[derive(Debug)]
pub struct AgentLink {
    /// Session → agent.
    pub notices: mpsc::Sender<CallNotice>,
    /// Agent → session.
    pub events: mpsc::Receiver<AgentEvent>,
}

/// Factory attaching an agent pipeline to a new call.
///
/// The production implementation spawns the STT/LLM/TTS pipeline; tests
/// substitute a scripted agent.
#[async_trait]
pub trait AgentConnector: Send + Sync {
    /// Attaches an agent to the call, returning the session's end of the
    /// channel pair.
    async fn connect(
        &self,
        session_id: SessionId,
        channel_id: &str,
    ) -> Result<AgentLink, SessionError>;
}
