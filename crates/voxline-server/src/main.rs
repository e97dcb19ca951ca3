//! Voxline server binary — the voice-call automation gateway.
//!
//! Starts the switch-facing TCP gateway (one connection per call) and an
//! axum operational endpoint, with structured logging and graceful
//! shutdown on SIGTERM/SIGINT.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use voxline_observe::AuditLog;
use voxline_server::agent::EchoAgent;
use voxline_server::{build_session_deps, config, ops_router, transport_settings, OpsState};
use voxline_session::run_call;
use voxline_transport::Gateway;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("VOXLINE_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("voxline.toml"));

    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration — the server cannot start without valid config");

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    let audit = AuditLog::new();
    // The conversation pipeline is a separate deployment; until one is
    // attached, calls get the loopback agent.
    tracing::warn!("no conversation pipeline configured, attaching loopback echo agent");
    let deps = build_session_deps(&config, Arc::new(EchoAgent), audit)
        .expect("failed to build call dependencies — check switch/backend config");

    let ops_state = OpsState::new();

    let gateway_addr = SocketAddr::new(config.gateway.host, config.gateway.port);
    let gateway = Gateway::bind(gateway_addr, transport_settings(&config))
        .await
        .expect("failed to bind gateway — is another process using this port?");
    tracing::info!(addr = %gateway_addr, "audio gateway listening");

    let call_state = ops_state.clone();
    tokio::spawn(async move {
        let result = gateway
            .run(move |reader, writer, _peer| {
                let deps = deps.clone();
                let guard = call_state.call_guard();
                async move {
                    let _guard = guard;
                    run_call(deps, reader, writer).await;
                }
            })
            .await;
        if let Err(err) = result {
            tracing::error!(error = %err, "gateway accept loop failed");
        }
    });

    let ops_addr = SocketAddr::new(config.ops.host, config.ops.port);
    tracing::info!(addr = %ops_addr, "starting voxline server");

    let listener = TcpListener::bind(ops_addr)
        .await
        .expect("failed to bind to address — is another process using this port?");

    axum::serve(listener, ops_router(ops_state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("voxline server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
