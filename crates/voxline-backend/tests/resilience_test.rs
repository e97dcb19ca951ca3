//! Resilience tests for the commerce client against an in-process mock
//! backend: idempotent creation under retry, no-retry on 4xx, and the
//! circuit breaker lifecycle.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use voxline_backend::{
    BackendError, BackendSettings, BreakerSettings, CircuitBreaker, CommerceClient,
    IdempotencyKey, RetrySettings,
};
use voxline_types::{OrderItem, PhoneNumber};

/// Shared state of the mock commerce backend.
#[derive(Default)]
struct MockState {
    /// How many upcoming requests should fail with 500 before recovering.
    fail_next: u32,
    /// Orders created, keyed by idempotency key.
    orders_by_key: HashMap<String, serde_json::Value>,
    /// Total orders actually created (idempotent replays excluded).
    created: u32,
    /// Total requests that reached the handler.
    hits: u32,
}

type SharedState = Arc<Mutex<MockState>>;

async fn create_order(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(_body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let mut state = state.lock().unwrap();
    state.hits += 1;

    if state.fail_next > 0 {
        state.fail_next -= 1;
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    let key = headers
        .get("Idempotency-Key")
        .and_then(|value| value.to_str().ok())
        .ok_or(StatusCode::BAD_REQUEST)?
        .to_string();

    if let Some(existing) = state.orders_by_key.get(&key) {
        return Ok(Json(existing.clone()));
    }

    state.created += 1;
    let order = serde_json::json!({
        "id": format!("ord-{}", state.created),
        "items": [{"product_id": "p-1", "quantity": 2}],
        "subtotal": 1000,
        "delivery_cost": 0,
        "total": 1000,
        "status": "draft",
    });
    state.orders_by_key.insert(key, order.clone());
    Ok(Json(order))
}

async fn spawn_mock(state: SharedState) -> SocketAddr {
    let app = Router::new()
        .route("/orders", post(create_order))
        .route(
            "/orders/search",
            get(|State(state): State<SharedState>| async move {
                let mut state = state.lock().unwrap();
                state.hits += 1;
                if state.fail_next > 0 {
                    state.fail_next -= 1;
                    return Err(StatusCode::INTERNAL_SERVER_ERROR);
                }
                Ok(Json(serde_json::json!({ "orders": [] })))
            }),
        )
        .route(
            "/orders/{id}",
            get(|State(state): State<SharedState>| async move {
                state.lock().unwrap().hits += 1;
                Err::<Json<serde_json::Value>, _>(StatusCode::NOT_FOUND)
            }),
        )
        .route(
            "/delivery/calculate",
            get(|State(state): State<SharedState>| async move {
                state.lock().unwrap().hits += 1;
                Json(serde_json::json!({ "cost": 7000 }))
            }),
        )
        .route(
            "/pickup-points",
            get(|State(state): State<SharedState>| async move {
                state.lock().unwrap().hits += 1;
                Json(serde_json::json!([
                    {"id": "np-14", "name": "Point 14", "address": "Soborna 3"},
                ]))
            }),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client(addr: SocketAddr, retry: RetrySettings, breaker: BreakerSettings) -> CommerceClient {
    CommerceClient::new(
        BackendSettings {
            base_url: format!("http://{addr}"),
            timeout: Duration::from_millis(500),
            retry,
        },
        Arc::new(CircuitBreaker::new(breaker)),
    )
    .unwrap()
}

fn fast_retry(max_attempts: u32) -> RetrySettings {
    RetrySettings {
        max_attempts,
        base_backoff: Duration::from_millis(10),
    }
}

fn lenient_breaker() -> BreakerSettings {
    BreakerSettings {
        failure_threshold: 100,
        cooldown: Duration::from_secs(60),
    }
}

fn phone() -> PhoneNumber {
    PhoneNumber::parse("+380501234567").unwrap()
}

fn items() -> Vec<OrderItem> {
    vec![OrderItem {
        product_id: "p-1".to_string(),
        quantity: 2,
    }]
}

#[tokio::test]
async fn retried_create_with_one_key_creates_exactly_one_order() {
    let state = SharedState::default();
    state.lock().unwrap().fail_next = 1; // first attempt gets a 500
    let addr = spawn_mock(state.clone()).await;

    let client = client(addr, fast_retry(3), lenient_breaker());
    let key = IdempotencyKey::issue();
    let order = client.create_order(&phone(), &items(), &key).await.unwrap();

    assert_eq!(order.id, "ord-1");
    let state = state.lock().unwrap();
    assert_eq!(state.created, 1);
    assert_eq!(state.hits, 2); // the failed attempt plus the retry
}

#[tokio::test]
async fn replayed_key_returns_the_original_order() {
    let state = SharedState::default();
    let addr = spawn_mock(state.clone()).await;

    let client = client(addr, fast_retry(3), lenient_breaker());
    let key = IdempotencyKey::issue();

    let first = client.create_order(&phone(), &items(), &key).await.unwrap();
    let second = client.create_order(&phone(), &items(), &key).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(state.lock().unwrap().created, 1);
}

#[tokio::test]
async fn distinct_intents_create_distinct_orders() {
    let state = SharedState::default();
    let addr = spawn_mock(state.clone()).await;

    let client = client(addr, fast_retry(3), lenient_breaker());
    let first = client
        .create_order(&phone(), &items(), &IdempotencyKey::issue())
        .await
        .unwrap();
    let second = client
        .create_order(&phone(), &items(), &IdempotencyKey::issue())
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(state.lock().unwrap().created, 2);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let state = SharedState::default();
    let addr = spawn_mock(state.clone()).await;

    let client = client(addr, fast_retry(3), lenient_breaker());
    let err = client.get_order("missing").await.unwrap_err();

    assert!(matches!(err, BackendError::Rejected { status: 404, .. }));
    assert_eq!(state.lock().unwrap().hits, 1);
}

#[tokio::test]
async fn exhausted_retries_surface_unavailable() {
    let state = SharedState::default();
    state.lock().unwrap().fail_next = 10;
    let addr = spawn_mock(state.clone()).await;

    let client = client(addr, fast_retry(2), lenient_breaker());
    let err = client.search_orders(Some(&phone()), None).await.unwrap_err();

    assert!(err.is_unavailable());
    assert_eq!(state.lock().unwrap().hits, 2);
}

#[tokio::test]
async fn open_circuit_short_circuits_without_network_io() {
    let state = SharedState::default();
    state.lock().unwrap().fail_next = 10;
    let addr = spawn_mock(state.clone()).await;

    let client = client(
        addr,
        fast_retry(1),
        BreakerSettings {
            failure_threshold: 2,
            cooldown: Duration::from_secs(60),
        },
    );

    // Two transient failures trip the breaker.
    assert!(client.search_orders(Some(&phone()), None).await.is_err());
    assert!(client.search_orders(Some(&phone()), None).await.is_err());
    assert_eq!(state.lock().unwrap().hits, 2);

    // Further calls short-circuit: the mock sees no more traffic.
    let err = client.search_orders(Some(&phone()), None).await.unwrap_err();
    assert!(err.is_unavailable());
    assert_eq!(state.lock().unwrap().hits, 2);
}

#[tokio::test]
async fn delivery_class_keeps_flowing_while_orders_circuit_is_open() {
    let state = SharedState::default();
    state.lock().unwrap().fail_next = 2;
    let addr = spawn_mock(state.clone()).await;

    let client = client(
        addr,
        fast_retry(1),
        BreakerSettings {
            failure_threshold: 2,
            cooldown: Duration::from_secs(60),
        },
    );

    // Trip the orders circuit.
    assert!(client.search_orders(Some(&phone()), None).await.is_err());
    assert!(client.search_orders(Some(&phone()), None).await.is_err());
    assert!(client
        .search_orders(Some(&phone()), None)
        .await
        .unwrap_err()
        .is_unavailable());

    // Delivery endpoints live in their own class and are unaffected.
    let quote = client
        .calculate_delivery(&voxline_types::DeliveryChoice::Pickup {
            point_id: "np-14".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(quote.cost, 7000);

    let points = client.list_pickup_points().await.unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].id, "np-14");
}

#[tokio::test]
async fn half_open_trial_closes_the_circuit_after_recovery() {
    let state = SharedState::default();
    state.lock().unwrap().fail_next = 2;
    let addr = spawn_mock(state.clone()).await;

    let client = client(
        addr,
        fast_retry(1),
        BreakerSettings {
            failure_threshold: 2,
            cooldown: Duration::from_millis(50),
        },
    );

    assert!(client.search_orders(Some(&phone()), None).await.is_err());
    assert!(client.search_orders(Some(&phone()), None).await.is_err());

    // Backend has recovered; wait out the cooldown so the next call is
    // the half-open trial.
    tokio::time::sleep(Duration::from_millis(80)).await;
    client.search_orders(Some(&phone()), None).await.unwrap();

    // Circuit closed again: calls flow normally.
    client.search_orders(Some(&phone()), None).await.unwrap();
    assert_eq!(state.lock().unwrap().hits, 4);
}
