//! Loopback agent for deployments without an attached conversation
//! pipeline.
//!
//! The real speech/LLM pipeline is a separate deployment that plugs in
//! through [`AgentConnector`]. This stand-in keeps the gateway fully
//! operable without it: caller audio is echoed back as agent speech, and
//! no tool calls are ever issued. Useful for wiring checks against a real
//! switch and for local development.

use async_trait::async_trait;
use tokio::sync::mpsc;
use voxline_session::{AgentConnector, AgentEvent, AgentLink, CallNotice, SessionError};
use voxline_types::SessionId;

/// Channel depth between the session and the echo task.
const LINK_CAPACITY: usize = 64;

/// Agent that echoes caller audio back and otherwise stays silent.
#[derive(Debug, Default)]
pub struct EchoAgent;

#[async_trait]
impl AgentConnector for EchoAgent {
    async fn connect(
        &self,
        session_id: SessionId,
        channel_id: &str,
    ) -> Result<AgentLink, SessionError> {
        tracing::info!(session = %session_id, channel = channel_id, "attaching loopback echo agent");

        let (notice_tx, mut notice_rx) = mpsc::channel(LINK_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(LINK_CAPACITY);

        tokio::spawn(async move {
            while let Some(notice) = notice_rx.recv().await {
                let event = match notice {
                    CallNotice::CallerAudio(pcm) => AgentEvent::Speak(pcm),
                    // Identity outcomes and tool replies have no meaning
                    // for an agent that never converses.
                    _ => continue,
                };
                if event_tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        Ok(AgentLink {
            notices: notice_tx,
            events: event_rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_caller_audio_as_speech() {
        let mut link = EchoAgent
            .connect(SessionId::new(), "chan-1")
            .await
            .unwrap();

        link.notices
            .send(CallNotice::CallerAudio(vec![1, 2, 3]))
            .await
            .unwrap();
        link.notices
            .send(CallNotice::Identity {
                caller: None,
                needs_phone_verification: true,
            })
            .await
            .unwrap();
        link.notices
            .send(CallNotice::CallerAudio(vec![4]))
            .await
            .unwrap();

        // Audio comes back in order; the identity notice is swallowed.
        assert!(matches!(
            link.events.recv().await,
            Some(AgentEvent::Speak(pcm)) if pcm == vec![1, 2, 3]
        ));
        assert!(matches!(
            link.events.recv().await,
            Some(AgentEvent::Speak(pcm)) if pcm == vec![4]
        ));
    }
}
