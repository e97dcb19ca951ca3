//! Tests for the switch control API client against an in-process mock.

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::time::Duration;
use voxline_switch::{Resolved, SwitchClient, SwitchConfig, SwitchError};

async fn spawn_mock(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client_for(addr: SocketAddr) -> SwitchClient {
    SwitchClient::new(SwitchConfig {
        base_url: format!("http://{addr}"),
        username: "ari".to_string(),
        password: "secret".to_string(),
        timeout: Duration::from_millis(500),
    })
    .unwrap()
}

#[tokio::test]
async fn resolves_caller_number() {
    let app = Router::new().route(
        "/channels/{id}",
        get(|Path(id): Path<String>| async move {
            Json(serde_json::json!({
                "id": id,
                "caller": { "number": "+380501234567", "name": "" }
            }))
        }),
    );
    let addr = spawn_mock(app).await;

    let resolved = client_for(addr).resolve_caller("abc-123").await.unwrap();
    match resolved {
        Resolved::Phone(phone) => assert_eq!(phone.as_str(), "+380501234567"),
        Resolved::Unknown => panic!("expected a resolved phone"),
    }
}

#[tokio::test]
async fn masked_sentinels_resolve_to_unknown() {
    for sentinel in ["anonymous", "Restricted", "UNAVAILABLE", "unknown", ""] {
        let body = serde_json::json!({ "caller": { "number": sentinel } });
        let app = Router::new().route(
            "/channels/{id}",
            get(move |_: Path<String>| {
                let body = body.clone();
                async move { Json(body) }
            }),
        );
        let addr = spawn_mock(app).await;

        let resolved = client_for(addr).resolve_caller("abc-123").await.unwrap();
        assert_eq!(resolved, Resolved::Unknown, "sentinel {sentinel:?}");
    }
}

#[tokio::test]
async fn missing_caller_field_resolves_to_unknown() {
    let app = Router::new().route(
        "/channels/{id}",
        get(|_: Path<String>| async { Json(serde_json::json!({ "id": "abc-123" })) }),
    );
    let addr = spawn_mock(app).await;

    let resolved = client_for(addr).resolve_caller("abc-123").await.unwrap();
    assert_eq!(resolved, Resolved::Unknown);
}

#[tokio::test]
async fn unknown_channel_is_a_distinct_error() {
    let app = Router::new().route(
        "/channels/{id}",
        get(|_: Path<String>| async { StatusCode::NOT_FOUND }),
    );
    let addr = spawn_mock(app).await;

    let err = client_for(addr).resolve_caller("gone").await.unwrap_err();
    assert!(matches!(err, SwitchError::ChannelNotFound(id) if id == "gone"));
}

#[tokio::test]
async fn slow_control_api_times_out() {
    let app = Router::new().route(
        "/channels/{id}",
        get(|_: Path<String>| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(serde_json::json!({}))
        }),
    );
    let addr = spawn_mock(app).await;

    let err = client_for(addr).resolve_caller("abc-123").await.unwrap_err();
    assert!(matches!(err, SwitchError::Unreachable(_)));
}

#[tokio::test]
async fn transfer_acknowledged_on_success() {
    let app = Router::new().route(
        "/channels/{id}/transfer",
        post(|_: Path<String>, Json(body): Json<serde_json::Value>| async move {
            assert_eq!(body["queue"], "operators");
            StatusCode::NO_CONTENT
        }),
    );
    let addr = spawn_mock(app).await;

    client_for(addr)
        .transfer_to_queue("abc-123", "operators")
        .await
        .unwrap();
}

#[tokio::test]
async fn transfer_failure_surfaces_status() {
    let app = Router::new().route(
        "/channels/{id}/transfer",
        post(|_: Path<String>| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let addr = spawn_mock(app).await;

    let err = client_for(addr)
        .transfer_to_queue("abc-123", "operators")
        .await
        .unwrap_err();
    assert!(matches!(err, SwitchError::Status(500)));
}
