//! The per-call event loop.

use crate::agent::{AgentConnector, AgentEvent, AgentLink, CallNotice};
use crate::state::SessionState;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use voxline_observe::{AuditEvent, AuditLog};
use voxline_switch::{Resolved, SwitchClient};
use voxline_tools::{
    SessionToolContext, ToolError, ToolOutput, ToolReply, ToolReplyError, ToolRouter,
};
use voxline_transport::{Frame, FrameReader, FrameWriter};
use voxline_types::{PhoneNumber, SessionId};

/// Everything a session needs besides its connection. Cloned per call.
#[derive(Clone)]
pub struct SessionDeps {
    pub switch: SwitchClient,
    pub router: ToolRouter,
    pub audit: AuditLog,
    pub agent: Arc<dyn AgentConnector>,
    /// Queue used when the session itself has to bail out to a human
    /// (agent pipeline unavailable), as opposed to an agent-requested
    /// transfer, which the router handles.
    pub operator_queue: String,
    /// How long the connection may sit without an identity frame.
    pub identity_timeout: Duration,
    /// Budget for the caller-id lookup; on expiry the call proceeds
    /// unverified.
    pub resolve_timeout: Duration,
}

/// Drives one call from accepted connection to closed session.
///
/// Never returns an error: every failure path ends the call, is logged,
/// and is audited where the session got far enough to have an identity.
pub async fn run_call(deps: SessionDeps, mut reader: FrameReader, writer: FrameWriter) {
    let channel_id =
        match tokio::time::timeout(deps.identity_timeout, reader.await_identity()).await {
            Ok(Ok(channel)) => channel,
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "connection rejected before identity");
                return;
            }
            Err(_) => {
                tracing::warn!("no identity frame within timeout, dropping connection");
                return;
            }
        };

    let session = CallSession::new(deps, channel_id);
    session.run(reader, writer).await;
}

/// A tool call the router is executing off the event loop.
struct PendingTool {
    transfer: bool,
    handle: JoinHandle<Result<ToolOutput, ToolError>>,
}

/// Resolves once the in-flight tool call finishes. Must only be selected
/// on when `pending` is `Some`; the guard in the event loop ensures that.
async fn tool_result(
    pending: &mut Option<PendingTool>,
) -> (bool, Result<Result<ToolOutput, ToolError>, JoinError>) {
    match pending.as_mut() {
        Some(tool) => {
            let transfer = tool.transfer;
            let result = (&mut tool.handle).await;
            (transfer, result)
        }
        None => std::future::pending().await,
    }
}

struct CallSession {
    deps: SessionDeps,
    ctx: SessionToolContext,
    state: SessionState,
    /// Once identity resolution yields no number this stays true until a
    /// verbally stated number validates; it never flips back.
    needs_phone_verification: bool,
    /// The one order draft currently being worked on, at most one at a
    /// time; a later create or fetch replaces it.
    active_order: Option<String>,
    /// Completed conversation turns: counted when the agent answers
    /// caller speech heard since its last reply.
    turns: u64,
    /// Caller audio has arrived since the agent last spoke.
    caller_spoke: bool,
}

impl CallSession {
    fn new(deps: SessionDeps, channel_id: String) -> Self {
        let session_id = SessionId::new();
        Self {
            deps,
            ctx: SessionToolContext {
                session_id,
                channel_id,
                phone: None,
                orders_seen: HashSet::new(),
            },
            state: SessionState::Connecting,
            needs_phone_verification: true,
            active_order: None,
            turns: 0,
            caller_spoke: false,
        }
    }

    async fn run(mut self, mut reader: FrameReader, writer: FrameWriter) {
        self.state = SessionState::Identifying;
        self.deps.audit.emit(AuditEvent::CallStarted {
            session_id: self.ctx.session_id,
            channel_id: self.ctx.channel_id.clone(),
        });

        let link = match self
            .deps
            .agent
            .connect(self.ctx.session_id, &self.ctx.channel_id)
            .await
        {
            Ok(link) => link,
            Err(err) => {
                // No agent means no conversation; hand the caller straight
                // to a human instead of leaving them in silence.
                tracing::error!(session = %self.ctx.session_id, error = %err, "agent unavailable, diverting to operator");
                self.divert_to_operator().await;
                self.close("agent-unavailable").await;
                return;
            }
        };
        let AgentLink {
            notices,
            mut events,
        } = link;

        self.resolve_identity().await;
        let identity_notice = CallNotice::Identity {
            caller: self.ctx.phone.as_ref().map(|p| p.to_string()),
            needs_phone_verification: self.needs_phone_verification,
        };
        if notices.send(identity_notice).await.is_err() {
            tracing::warn!(session = %self.ctx.session_id, "agent went away during identification");
            self.divert_to_operator().await;
            self.close("agent-failed").await;
            return;
        }
        self.state = SessionState::Active;

        let mut pending: Option<PendingTool> = None;
        let reason = loop {
            tokio::select! {
                frame = reader.read_frame() => match frame {
                    Ok(Some(Frame::Audio(pcm))) => {
                        self.caller_spoke = true;
                        // Caller audio is forwarded in arrival order; the
                        // notices channel preserves it.
                        if notices.send(CallNotice::CallerAudio(pcm)).await.is_err() {
                            self.divert_to_operator().await;
                            break "agent-failed";
                        }
                    }
                    Ok(Some(Frame::Hangup)) | Ok(None) => break "hangup",
                    Ok(Some(Frame::Error(detail))) => {
                        let detail = String::from_utf8_lossy(&detail).into_owned();
                        tracing::warn!(session = %self.ctx.session_id, detail, "switch reported an error");
                        break "switch-error";
                    }
                    Ok(Some(Frame::Identity(_))) => {
                        // read_frame rejects duplicates before we get here.
                        break "protocol-error";
                    }
                    Err(err) => {
                        tracing::warn!(session = %self.ctx.session_id, error = %err, "transport failed");
                        break "protocol-error";
                    }
                },

                event = events.recv() => match event {
                    Some(AgentEvent::Speak(pcm)) => {
                        // An answer to speech heard since the agent last
                        // spoke completes one conversation turn.
                        if self.caller_spoke {
                            self.turns += 1;
                            self.caller_spoke = false;
                        }
                        match writer.send(Frame::Audio(pcm)).await {
                            // A dropped frame is a glitch; a closed writer
                            // means the caller is gone.
                            Ok(_) => {}
                            Err(_) => break "hangup",
                        }
                    }
                    Some(AgentEvent::CallerPhoneStated(raw)) => {
                        let accepted = self.accept_verbal_phone(&raw);
                        if notices
                            .send(CallNotice::PhoneVerification { accepted })
                            .await
                            .is_err()
                        {
                            self.divert_to_operator().await;
                            break "agent-failed";
                        }
                    }
                    Some(AgentEvent::Tool(call)) => {
                        if self.state == SessionState::Transferring || pending.is_some() {
                            // One tool call at a time, and nothing new
                            // while a handoff is in flight; the agent must
                            // wait for its reply before issuing the next.
                            let reply = ToolReply::from_outcome(Err(ToolError::Validation(
                                "a tool call is already in progress".to_string(),
                            )));
                            if notices.send(CallNotice::ToolReply(reply)).await.is_err() {
                                self.divert_to_operator().await;
                                break "agent-failed";
                            }
                        } else {
                            let transfer = call.is_transfer();
                            if transfer {
                                self.state = SessionState::Transferring;
                            }
                            let router = self.deps.router.clone();
                            let ctx = self.ctx.clone();
                            pending = Some(PendingTool {
                                transfer,
                                handle: tokio::spawn(async move {
                                    router.dispatch(&ctx, call).await
                                }),
                            });
                        }
                    }
                    Some(AgentEvent::Hangup) => {
                        let _ = writer.send(Frame::Hangup).await;
                        break "agent-hangup";
                    }
                    None => {
                        tracing::warn!(session = %self.ctx.session_id, "agent pipeline closed mid-call");
                        self.divert_to_operator().await;
                        break "agent-failed";
                    }
                },

                (transfer, joined) = tool_result(&mut pending), if pending.is_some() => {
                    pending = None;
                    let outcome = match joined {
                        Ok(outcome) => outcome,
                        Err(err) => {
                            tracing::error!(session = %self.ctx.session_id, error = %err, "tool task failed");
                            let reply = ToolReply {
                                result: None,
                                error: Some(ToolReplyError {
                                    kind: "internal".to_string(),
                                    message: "tool execution failed; offer a transfer to an operator"
                                        .to_string(),
                                }),
                            };
                            if notices.send(CallNotice::ToolReply(reply)).await.is_err() {
                                self.divert_to_operator().await;
                                break "agent-failed";
                            }
                            continue;
                        }
                    };

                    if transfer {
                        if outcome.is_ok() {
                            // Handed off. The switch owns the call now.
                            break "transferred";
                        }
                        // Failed handoff: the caller is still on the line,
                        // hand them back to the agent.
                        self.state = SessionState::Active;
                    }
                    self.record_orders(&outcome);
                    let reply = ToolReply::from_outcome(outcome);
                    if notices.send(CallNotice::ToolReply(reply)).await.is_err() {
                        self.divert_to_operator().await;
                        break "agent-failed";
                    }
                }
            }
        };

        // A pending handle dropped here detaches the task: the backend
        // call runs to completion and its result is discarded, which the
        // idempotency keys make safe to do.
        self.close(reason).await;
    }

    /// Bounded caller-id lookup. Every outcome leaves the session usable:
    /// a resolved number skips phone verification, anything else requires
    /// the caller to state it verbally.
    async fn resolve_identity(&mut self) {
        let lookup = tokio::time::timeout(
            self.deps.resolve_timeout,
            self.deps.switch.resolve_caller(&self.ctx.channel_id),
        );
        match lookup.await {
            Ok(Ok(Resolved::Phone(phone))) => {
                self.deps.audit.emit(AuditEvent::IdentityResolved {
                    session_id: self.ctx.session_id,
                    caller: phone.to_string(),
                });
                self.ctx.phone = Some(phone);
                self.needs_phone_verification = false;
            }
            Ok(Ok(Resolved::Unknown)) => {
                self.deps.audit.emit(AuditEvent::IdentityUnknown {
                    session_id: self.ctx.session_id,
                });
            }
            Ok(Err(err)) => {
                tracing::warn!(session = %self.ctx.session_id, error = %err, "caller lookup failed");
                self.deps.audit.emit(AuditEvent::IdentityLookupFailed {
                    session_id: self.ctx.session_id,
                    reason: err.to_string(),
                });
            }
            Err(_) => {
                self.deps.audit.emit(AuditEvent::IdentityLookupFailed {
                    session_id: self.ctx.session_id,
                    reason: "lookup timed out".to_string(),
                });
            }
        }
    }

    /// Handles a verbally stated phone number.
    ///
    /// With no established number, a parseable one is adopted. With one
    /// already established, a restatement is accepted only when it matches;
    /// the established number never changes mid-call.
    fn accept_verbal_phone(&mut self, raw: &str) -> bool {
        match PhoneNumber::parse(raw) {
            Ok(phone) => match &self.ctx.phone {
                Some(established) => &phone == established,
                None => {
                    self.deps.audit.emit(AuditEvent::PhoneSuppliedVerbally {
                        session_id: self.ctx.session_id,
                        caller: phone.to_string(),
                    });
                    self.ctx.phone = Some(phone);
                    self.needs_phone_verification = false;
                    true
                }
            },
            Err(err) => {
                tracing::debug!(session = %self.ctx.session_id, error = %err, "stated phone did not validate");
                false
            }
        }
    }

    /// Tracks which orders this session has legitimately seen, so confirm
    /// and delivery updates can be limited to them.
    fn record_orders(&mut self, outcome: &Result<ToolOutput, ToolError>) {
        match outcome {
            Ok(ToolOutput::Order(order)) => {
                self.ctx.orders_seen.insert(order.id.clone());
                self.active_order = Some(order.id.clone());
            }
            Ok(ToolOutput::Orders(orders)) => {
                for order in orders {
                    self.ctx.orders_seen.insert(order.id.clone());
                }
            }
            Ok(ToolOutput::Transferred) | Err(_) => {}
        }
    }

    /// Last-resort handoff when the agent side is gone. Router-mediated
    /// transfers audit themselves; this one happens outside any tool call.
    async fn divert_to_operator(&self) {
        self.deps.audit.emit(AuditEvent::TransferRequested {
            session_id: self.ctx.session_id,
            queue: self.deps.operator_queue.clone(),
        });
        if let Err(err) = self
            .deps
            .switch
            .transfer_to_queue(&self.ctx.channel_id, &self.deps.operator_queue)
            .await
        {
            tracing::error!(session = %self.ctx.session_id, error = %err, "operator divert failed");
            self.deps.audit.emit(AuditEvent::TransferFailed {
                session_id: self.ctx.session_id,
                queue: self.deps.operator_queue.clone(),
                reason: err.to_string(),
            });
        }
    }

    async fn close(mut self, reason: &str) {
        self.state = SessionState::Closing;
        self.deps.audit.emit(AuditEvent::CallEnded {
            session_id: self.ctx.session_id,
            reason: reason.to_string(),
            turns: self.turns,
        });
        tracing::info!(
            session = %self.ctx.session_id,
            channel = %self.ctx.channel_id,
            reason,
            turns = self.turns,
            order = self.active_order.as_deref().unwrap_or("none"),
            "call ended"
        );
        self.state = SessionState::Closed;
        debug_assert!(self.state.is_terminal());
    }
}
