//! Validation and dispatch of tool calls.

use crate::call::{ToolCall, ToolOutput};
use crate::error::ToolError;
use std::collections::HashSet;
use voxline_backend::{BackendError, CommerceClient, IdempotencyKey};
use voxline_observe::{AuditEvent, AuditLog};
use voxline_switch::SwitchClient;
use voxline_types::{DeliveryChoice, OrderItem, PhoneNumber, SessionId};

/// Exclusive upper bound for a line-item quantity.
const MAX_QUANTITY: u32 = 100;

/// The slice of session state the router needs to validate a call.
///
/// Owned and kept current by the session; the router itself is stateless
/// between invocations.
#[derive(Debug, Clone)]
pub struct SessionToolContext {
    pub session_id: SessionId,
    /// Switch channel UUID, needed for the transfer bridge.
    pub channel_id: String,
    /// The caller phone established by the resolver or supplied verbally.
    /// `None` means every phone-requiring tool is rejected with
    /// `need_phone`.
    pub phone: Option<PhoneNumber>,
    /// Order ids this session has created or retrieved. `confirm_order`
    /// and `update_order_delivery` may only target these.
    pub orders_seen: HashSet<String>,
}

/// Validates tool calls and executes exactly one backend interaction per
/// accepted call.
#[derive(Debug, Clone)]
pub struct ToolRouter {
    backend: CommerceClient,
    switch: SwitchClient,
    audit: AuditLog,
    operator_queue: String,
}

impl ToolRouter {
    pub fn new(
        backend: CommerceClient,
        switch: SwitchClient,
        audit: AuditLog,
        operator_queue: String,
    ) -> Self {
        Self {
            backend,
            switch,
            audit,
            operator_queue,
        }
    }

    /// Validates and executes one tool call, emitting an audit event for
    /// the outcome either way.
    pub async fn dispatch(
        &self,
        ctx: &SessionToolContext,
        call: ToolCall,
    ) -> Result<ToolOutput, ToolError> {
        let tool = call.name();
        let outcome = self.execute(ctx, call).await;

        match &outcome {
            Ok(output) => {
                self.audit.emit(AuditEvent::ToolAccepted {
                    session_id: ctx.session_id,
                    tool: tool.to_string(),
                    order_id: output.order_id(),
                });
            }
            Err(ToolError::Backend(err)) => {
                self.audit.emit(AuditEvent::ToolBackendError {
                    session_id: ctx.session_id,
                    tool: tool.to_string(),
                    reason: err.to_string(),
                });
            }
            Err(err) => {
                if matches!(err, ToolError::Authorization) {
                    // Security relevant: someone asked about another
                    // caller's orders.
                    tracing::warn!(session = %ctx.session_id, tool, "cross-caller access rejected");
                }
                self.audit.emit(AuditEvent::ToolRejected {
                    session_id: ctx.session_id,
                    tool: tool.to_string(),
                    kind: err.kind().to_string(),
                    reason: err.to_string(),
                });
            }
        }

        outcome
    }

    async fn execute(
        &self,
        ctx: &SessionToolContext,
        call: ToolCall,
    ) -> Result<ToolOutput, ToolError> {
        match call {
            ToolCall::GetOrderStatus {
                phone,
                order_number,
            } => {
                if phone.is_none() && order_number.is_none() {
                    return Err(ToolError::Validation(
                        "either phone or order_number is required".to_string(),
                    ));
                }
                let caller = self.authorized_phone(ctx, phone.as_deref())?;

                // The search is always scoped to the caller's own number,
                // so an order number belonging to someone else comes back
                // empty instead of leaking their order.
                let orders = self
                    .backend
                    .search_orders(Some(&caller), order_number.as_deref())
                    .await?;
                Ok(ToolOutput::Orders(orders))
            }

            ToolCall::CreateOrderDraft { items, phone } => {
                validate_items(&items)?;
                let caller = self.authorized_phone(ctx, phone.as_deref())?;

                // One logical intent, one key; the client reuses it across
                // its retries.
                let key = IdempotencyKey::issue();
                let order = self.backend.create_order(&caller, &items, &key).await?;
                Ok(ToolOutput::Order(order))
            }

            ToolCall::UpdateOrderDelivery { order_id, delivery } => {
                validate_delivery(&delivery)?;
                self.authorized_phone(ctx, None)?;
                if !ctx.orders_seen.contains(&order_id) {
                    return Err(ToolError::OrderNotInSession(order_id));
                }
                match &delivery {
                    DeliveryChoice::Delivery { .. } => {
                        // The quote endpoint is the authority on which
                        // destinations couriers serve; one it refuses
                        // never touches the order.
                        let quote = self
                            .backend
                            .calculate_delivery(&delivery)
                            .await
                            .map_err(|err| match err {
                                BackendError::Rejected { message, .. } => {
                                    ToolError::Validation(message)
                                }
                                other => ToolError::Backend(other),
                            })?;
                        tracing::debug!(
                            session = %ctx.session_id,
                            order = %order_id,
                            cost = quote.cost,
                            "delivery quoted"
                        );
                    }
                    DeliveryChoice::Pickup { point_id } => {
                        // An agent-transcribed pickup point id must exist
                        // before the order is touched.
                        let points = self.backend.list_pickup_points().await?;
                        if !points.iter().any(|point| &point.id == point_id) {
                            return Err(ToolError::Validation(format!(
                                "unknown pickup point {point_id:?}"
                            )));
                        }
                    }
                }
                let order = self.backend.patch_delivery(&order_id, &delivery).await?;
                Ok(ToolOutput::Order(order))
            }

            ToolCall::ConfirmOrder { order_id } => {
                self.authorized_phone(ctx, None)?;
                // The order summary must have been voiced from this very
                // session; confirming an id the caller merely read out is
                // refused without a backend call.
                if !ctx.orders_seen.contains(&order_id) {
                    return Err(ToolError::OrderNotInSession(order_id));
                }
                let key = IdempotencyKey::issue();
                let order = self.backend.confirm_order(&order_id, &key).await?;
                Ok(ToolOutput::Order(order))
            }

            ToolCall::TransferToOperator { reason } => {
                self.audit.emit(AuditEvent::TransferRequested {
                    session_id: ctx.session_id,
                    queue: self.operator_queue.clone(),
                });
                tracing::info!(
                    session = %ctx.session_id,
                    reason = reason.as_deref().unwrap_or("unspecified"),
                    "transferring to operator queue"
                );

                match self
                    .switch
                    .transfer_to_queue(&ctx.channel_id, &self.operator_queue)
                    .await
                {
                    Ok(()) => Ok(ToolOutput::Transferred),
                    Err(err) => {
                        self.audit.emit(AuditEvent::TransferFailed {
                            session_id: ctx.session_id,
                            queue: self.operator_queue.clone(),
                            reason: err.to_string(),
                        });
                        Err(ToolError::TransferFailed(err.to_string()))
                    }
                }
            }
        }
    }

    /// Resolves the phone a call is allowed to act on.
    ///
    /// The session must have an established phone (`need_phone`
    /// otherwise). A phone argument, when present, must match it — a
    /// caller may act only on orders tied to their own verified number.
    fn authorized_phone(
        &self,
        ctx: &SessionToolContext,
        arg: Option<&str>,
    ) -> Result<PhoneNumber, ToolError> {
        let Some(established) = ctx.phone.as_ref() else {
            return Err(ToolError::NeedPhone);
        };

        if let Some(raw) = arg {
            let requested = PhoneNumber::parse(raw)
                .map_err(|_| ToolError::Validation(format!("malformed phone number: {raw:?}")))?;
            if &requested != established {
                return Err(ToolError::Authorization);
            }
        }

        Ok(established.clone())
    }
}

impl ToolOutput {
    fn order_id(&self) -> Option<String> {
        match self {
            Self::Order(order) => Some(order.id.clone()),
            Self::Orders(_) | Self::Transferred => None,
        }
    }
}

fn validate_items(items: &[OrderItem]) -> Result<(), ToolError> {
    if items.is_empty() {
        return Err(ToolError::Validation("item list is empty".to_string()));
    }
    for item in items {
        if item.quantity == 0 || item.quantity >= MAX_QUANTITY {
            return Err(ToolError::Validation(format!(
                "quantity {} for {} is out of range (1..{})",
                item.quantity, item.product_id, MAX_QUANTITY
            )));
        }
        if item.product_id.trim().is_empty() {
            return Err(ToolError::Validation("product_id is empty".to_string()));
        }
    }
    Ok(())
}

fn validate_delivery(choice: &DeliveryChoice) -> Result<(), ToolError> {
    match choice {
        DeliveryChoice::Delivery { city, address } => {
            if city.trim().is_empty() || address.trim().is_empty() {
                return Err(ToolError::Validation(
                    "delivery requires both city and address".to_string(),
                ));
            }
        }
        DeliveryChoice::Pickup { point_id } => {
            if point_id.trim().is_empty() {
                return Err(ToolError::Validation(
                    "pickup requires a pickup-point id".to_string(),
                ));
            }
        }
    }
    Ok(())
}
