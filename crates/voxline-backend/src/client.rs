//! The commerce HTTP client and its retry loop.

use crate::breaker::{CircuitBreaker, EndpointClass};
use crate::error::BackendError;
use crate::idempotency::IdempotencyKey;
use crate::types::{DeliveryQuote, PickupPoint, SearchResponse};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use voxline_types::{DeliveryChoice, OrderItem, OrderView, PhoneNumber};

/// Header carrying the idempotency key on mutating requests.
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Retry tuning for transient failures.
#[derive(Debug, Clone)]
pub struct RetrySettings {
    /// Total attempts, including the first (minimum 1).
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles each retry after that.
    pub base_backoff: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(250),
        }
    }
}

/// Connection settings for the commerce backend.
#[derive(Debug, Clone)]
pub struct BackendSettings {
    /// Base URL of the commerce API, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout; the total time budget of an operation is this
    /// times the attempt count, plus backoff.
    pub timeout: Duration,
    /// Retry policy for transient failures.
    pub retry: RetrySettings,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(5),
            retry: RetrySettings::default(),
        }
    }
}

/// Client for the commerce backend.
///
/// Cheap to clone. The circuit breaker is passed in from outside and
/// shared by every clone across all sessions; the retry loop and the
/// idempotency header handling live here.
#[derive(Debug, Clone)]
pub struct CommerceClient {
    http: reqwest::Client,
    settings: BackendSettings,
    breaker: Arc<CircuitBreaker>,
}

impl CommerceClient {
    pub fn new(
        settings: BackendSettings,
        breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self {
            http,
            settings,
            breaker,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    /// Searches orders by phone and/or order number.
    ///
    /// At least one criterion must be supplied; the tool router enforces
    /// that before calling. Non-mutating and freely retryable.
    pub async fn search_orders(
        &self,
        phone: Option<&PhoneNumber>,
        order_number: Option<&str>,
    ) -> Result<Vec<OrderView>, BackendError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(phone) = phone {
            query.push(("phone", phone.as_str().to_string()));
        }
        if let Some(number) = order_number {
            query.push(("order_number", number.to_string()));
        }

        let request = self.http.get(self.url("/orders/search")).query(&query);
        let response: SearchResponse = self.execute(EndpointClass::Orders, request).await?;
        Ok(response.orders)
    }

    /// Fetches one order by backend id. Non-mutating.
    pub async fn get_order(&self, order_id: &str) -> Result<OrderView, BackendError> {
        let request = self.http.get(self.url(&format!("/orders/{order_id}")));
        self.execute(EndpointClass::Orders, request).await
    }

    /// Creates a draft order. Mutating and idempotent: the key identifies
    /// this logical intent across every retry.
    pub async fn create_order(
        &self,
        phone: &PhoneNumber,
        items: &[OrderItem],
        key: &IdempotencyKey,
    ) -> Result<OrderView, BackendError> {
        let request = self
            .http
            .post(self.url("/orders"))
            .header(IDEMPOTENCY_HEADER, key.as_header_value())
            .json(&serde_json::json!({
                "phone": phone.as_str(),
                "items": items,
            }));
        self.execute(EndpointClass::Orders, request).await
    }

    /// Updates an order's delivery descriptor.
    pub async fn patch_delivery(
        &self,
        order_id: &str,
        choice: &DeliveryChoice,
    ) -> Result<OrderView, BackendError> {
        let request = self
            .http
            .patch(self.url(&format!("/orders/{order_id}/delivery")))
            .json(choice);
        self.execute(EndpointClass::Orders, request).await
    }

    /// Finalizes an order. Mutating and idempotent, same key discipline as
    /// [`Self::create_order`].
    pub async fn confirm_order(
        &self,
        order_id: &str,
        key: &IdempotencyKey,
    ) -> Result<OrderView, BackendError> {
        let request = self
            .http
            .post(self.url(&format!("/orders/{order_id}/confirm")))
            .header(IDEMPOTENCY_HEADER, key.as_header_value());
        self.execute(EndpointClass::Orders, request).await
    }

    /// Quotes the delivery cost for a delivery choice. Non-mutating.
    pub async fn calculate_delivery(
        &self,
        choice: &DeliveryChoice,
    ) -> Result<DeliveryQuote, BackendError> {
        let query: Vec<(&str, String)> = match choice {
            DeliveryChoice::Delivery { city, address } => vec![
                ("type", "delivery".to_string()),
                ("city", city.clone()),
                ("address", address.clone()),
            ],
            DeliveryChoice::Pickup { point_id } => vec![
                ("type", "pickup".to_string()),
                ("point_id", point_id.clone()),
            ],
        };
        let request = self.http.get(self.url("/delivery/calculate")).query(&query);
        self.execute(EndpointClass::Delivery, request).await
    }

    /// Lists pickup points. Non-mutating.
    pub async fn list_pickup_points(&self) -> Result<Vec<PickupPoint>, BackendError> {
        let request = self.http.get(self.url("/pickup-points"));
        self.execute(EndpointClass::Delivery, request).await
    }

    /// Runs one request through the breaker and retry loop, decoding the
    /// JSON body on success.
    async fn execute<T: DeserializeOwned>(
        &self,
        class: EndpointClass,
        request: reqwest::RequestBuilder,
    ) -> Result<T, BackendError> {
        let response = self.send_with_retry(class, request).await?;
        response.json().await.map_err(BackendError::Malformed)
    }

    /// The retry loop.
    ///
    /// Each attempt first consults the circuit breaker; an open circuit
    /// short-circuits with no network I/O. Transient failures (connect
    /// errors, timeouts, 5xx) count against the breaker and are retried
    /// with doubling backoff; 4xx responses surface immediately.
    ///
    /// The request is built once by the caller — including any
    /// idempotency header — and cloned per attempt, so a retry can never
    /// carry a different key than the attempt before it.
    async fn send_with_retry(
        &self,
        class: EndpointClass,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, BackendError> {
        let max_attempts = self.settings.retry.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            if !self.breaker.try_acquire(class) {
                return Err(BackendError::Unavailable {
                    reason: format!("circuit open for {}", class.as_str()),
                });
            }

            let Some(builder) = request.try_clone() else {
                // Streaming bodies cannot be cloned; none of our requests
                // use them.
                return Err(BackendError::Unavailable {
                    reason: "request not retryable".to_string(),
                });
            };

            match builder.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        self.breaker.record_success(class);
                        return Ok(response);
                    }
                    if status.is_client_error() {
                        // The backend is alive and understood us; this is
                        // a final answer, not a failure of the dependency.
                        self.breaker.record_success(class);
                        let message = Self::rejection_message(response).await;
                        return Err(BackendError::Rejected {
                            status: status.as_u16(),
                            message,
                        });
                    }
                    self.breaker.record_failure(class);
                    last_error = format!("status {}", status.as_u16());
                }
                Err(err) => {
                    self.breaker.record_failure(class);
                    last_error = err.to_string();
                }
            }

            tracing::warn!(
                class = class.as_str(),
                attempt,
                max_attempts,
                error = %last_error,
                "backend request failed"
            );

            if attempt < max_attempts {
                let backoff = self.settings.retry.base_backoff * 2u32.pow(attempt - 1);
                tokio::time::sleep(backoff).await;
            }
        }

        Err(BackendError::Unavailable {
            reason: format!("retries exhausted: {last_error}"),
        })
    }

    async fn rejection_message(response: reqwest::Response) -> String {
        match response.json::<serde_json::Value>().await {
            Ok(body) => body
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("request rejected")
                .to_string(),
            Err(_) => "request rejected".to_string(),
        }
    }
}
