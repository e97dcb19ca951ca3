//! Voxline server wiring: configuration, the operational HTTP surface,
//! and construction of the shared per-call dependencies.
//!
//! The binary in `main.rs` is thin; everything it assembles lives here so
//! tests can build the same wiring against mock endpoints.

pub mod agent;
pub mod config;
mod ops;

use crate::config::Config;
use std::sync::Arc;
use thiserror::Error;
use voxline_backend::{
    BackendSettings, BreakerSettings, CircuitBreaker, CommerceClient, RetrySettings,
};
use voxline_observe::AuditLog;
use voxline_session::{AgentConnector, SessionDeps};
use voxline_switch::{SwitchClient, SwitchConfig};
use voxline_tools::ToolRouter;
use voxline_transport::TransportSettings;

pub use ops::{ops_router, CallGuard, OpsState};

/// Failures that prevent the server from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    /// An HTTP client could not be constructed from the configuration.
    #[error("failed to build http client: {0}")]
    HttpClient(String),
}

/// Maps the gateway config section onto transport tuning.
pub fn transport_settings(config: &Config) -> TransportSettings {
    TransportSettings {
        frame_timeout: config.gateway.frame_timeout(),
        outbound_capacity: config.gateway.outbound_capacity,
        write_timeout: config.gateway.write_timeout(),
    }
}

/// Builds the dependency bundle every call session clones.
///
/// The circuit breaker constructed here is the single instance shared by
/// all sessions; everything else in the bundle is cheap to clone.
pub fn build_session_deps(
    config: &Config,
    agent: Arc<dyn AgentConnector>,
    audit: AuditLog,
) -> Result<SessionDeps, StartupError> {
    let switch = SwitchClient::new(SwitchConfig {
        base_url: config.switch.base_url.clone(),
        username: config.switch.username.clone(),
        password: config.switch.password.clone(),
        timeout: config.switch.timeout(),
    })
    .map_err(|e| StartupError::HttpClient(e.to_string()))?;

    let breaker = Arc::new(CircuitBreaker::new(BreakerSettings {
        failure_threshold: config.backend.failure_threshold,
        cooldown: config.backend.cooldown(),
    }));
    let backend = CommerceClient::new(
        BackendSettings {
            base_url: config.backend.base_url.clone(),
            timeout: config.backend.timeout(),
            retry: RetrySettings {
                max_attempts: config.backend.max_attempts,
                base_backoff: config.backend.base_backoff(),
            },
        },
        breaker,
    )
    .map_err(|e| StartupError::HttpClient(e.to_string()))?;

    let router = ToolRouter::new(
        backend,
        switch.clone(),
        audit.clone(),
        config.session.operator_queue.clone(),
    );

    Ok(SessionDeps {
        switch,
        router,
        audit,
        agent,
        operator_queue: config.session.operator_queue.clone(),
        identity_timeout: config.session.identity_timeout(),
        resolve_timeout: config.session.resolve_timeout(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::EchoAgent;

    #[test]
    fn builds_deps_from_default_config() {
        let config = Config::default();
        let deps = build_session_deps(&config, Arc::new(EchoAgent), AuditLog::new());
        assert!(deps.is_ok());
        assert_eq!(deps.unwrap().operator_queue, "support");
    }

    #[test]
    fn transport_settings_follow_gateway_section() {
        let mut config = Config::default();
        config.gateway.outbound_capacity = 16;
        config.gateway.write_timeout_ms = 50;
        let settings = transport_settings(&config);
        assert_eq!(settings.outbound_capacity, 16);
        assert_eq!(settings.write_timeout.as_millis(), 50);
    }
}
