//! Operational HTTP surface: liveness and an active-call gauge.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state behind the ops endpoints.
#[derive(Debug, Clone, Default)]
pub struct OpsState {
    active_calls: Arc<AtomicUsize>,
}

impl OpsState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a call for the duration of the returned guard's life.
    pub fn call_guard(&self) -> CallGuard {
        self.active_calls.fetch_add(1, Ordering::SeqCst);
        CallGuard(self.active_calls.clone())
    }

    /// Number of calls currently in progress.
    pub fn active(&self) -> usize {
        self.active_calls.load(Ordering::SeqCst)
    }
}

/// Decrements the active-call gauge when dropped, however the call ended.
#[derive(Debug)]
pub struct CallGuard(Arc<AtomicUsize>);

impl Drop for CallGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Health check handler.
///
/// Returns `200 OK` with server status and version. Used by load
/// balancers, monitoring, and CI to verify the server is running.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Active-session gauge for dashboards.
async fn sessions(State(state): State<OpsState>) -> Json<Value> {
    Json(json!({ "active": state.active() }))
}

/// Builds the operational router.
pub fn ops_router(state: OpsState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sessions", get(sessions))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
