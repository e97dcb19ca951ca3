//! Switch control API client: caller resolution and queue transfer.

use crate::error::SwitchError;
use serde::Deserialize;
use std::time::Duration;
use voxline_types::PhoneNumber;

/// Caller id values the switch uses for suppressed or absent numbers.
///
/// These are reported by the PBX as literal caller-id strings; any of
/// them means "the number exists but you may not see it", which is a
/// normal outcome rather than an error.
const MASKED_SENTINELS: &[&str] = &["anonymous", "restricted", "unavailable", "unknown"];

/// Connection settings for the switch control API.
#[derive(Debug, Clone)]
pub struct SwitchConfig {
    /// Base URL of the control API, without a trailing slash.
    pub base_url: String,
    /// Basic auth username.
    pub username: String,
    /// Basic auth password.
    pub password: String,
    /// Per-request timeout. Identity resolution and transfer are both
    /// bounded by this.
    pub timeout: Duration,
}

/// Outcome of a caller id lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// The switch reported a usable caller number.
    Phone(PhoneNumber),
    /// The caller id is masked, absent, or not a parseable number.
    Unknown,
}

/// Channel metadata returned by `GET /channels/{id}`.
#[derive(Debug, Deserialize)]
struct ChannelInfo {
    #[serde(default)]
    caller: Option<CallerInfo>,
}

#[derive(Debug, Deserialize)]
struct CallerInfo {
    #[serde(default)]
    number: Option<String>,
}

/// HTTP client for the switch control API.
#[derive(Debug, Clone)]
pub struct SwitchClient {
    http: reqwest::Client,
    config: SwitchConfig,
}

impl SwitchClient {
    /// Builds a client. Fails only if the underlying HTTP client cannot
    /// be constructed.
    pub fn new(config: SwitchConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Resolves the caller number for a switch channel.
    ///
    /// Returns [`Resolved::Unknown`] for masked or missing caller ids —
    /// that is an ordinary outcome, not an error. Errors are reserved for
    /// the control API itself failing (unreachable, timeout, bad status).
    pub async fn resolve_caller(&self, channel_id: &str) -> Result<Resolved, SwitchError> {
        let response = self
            .http
            .get(self.url(&format!("/channels/{channel_id}")))
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await
            .map_err(SwitchError::Unreachable)?;

        match response.status().as_u16() {
            200 => {}
            404 => return Err(SwitchError::ChannelNotFound(channel_id.to_string())),
            status => return Err(SwitchError::Status(status)),
        }

        let info: ChannelInfo = response.json().await.map_err(SwitchError::Malformed)?;

        let raw = match info.caller.and_then(|caller| caller.number) {
            Some(number) if !number.trim().is_empty() => number,
            _ => return Ok(Resolved::Unknown),
        };

        if MASKED_SENTINELS
            .iter()
            .any(|sentinel| raw.eq_ignore_ascii_case(sentinel))
        {
            return Ok(Resolved::Unknown);
        }

        match PhoneNumber::parse(&raw) {
            Ok(phone) => Ok(Resolved::Phone(phone)),
            Err(_) => {
                tracing::debug!(channel = channel_id, "caller id not a parseable number");
                Ok(Resolved::Unknown)
            }
        }
    }

    /// Hands the channel to a human-operator queue.
    ///
    /// Invoked once per transfer request. On failure the caller stays with
    /// the agent; the session reports the failure upward rather than
    /// hanging up.
    pub async fn transfer_to_queue(&self, channel_id: &str, queue: &str) -> Result<(), SwitchError> {
        let response = self
            .http
            .post(self.url(&format!("/channels/{channel_id}/transfer")))
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(&serde_json::json!({ "queue": queue }))
            .send()
            .await
            .map_err(SwitchError::Unreachable)?;

        match response.status().as_u16() {
            200 | 202 | 204 => Ok(()),
            404 => Err(SwitchError::ChannelNotFound(channel_id.to_string())),
            status => Err(SwitchError::Status(status)),
        }
    }
}
