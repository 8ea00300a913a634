//! # Razorpay Webhook Parsing
//!
//! Razorpay posts events as JSON:
//!
//! ```json
//! {
//!   "entity": "event",
//!   "event": "payment.captured",
//!   "contains": ["payment"],
//!   "payload": { "payment": { "entity": { "id": "pay_...", "order_id": "order_...", ... } } },
//!   "created_at": 1700000000
//! }
//! ```
//!
//! The event id travels in the `X-Razorpay-Event-Id` header, not the body.

use crate::api::PaymentEntity;
use serde::Deserialize;
use shop_core::{ShopError, ShopResult, WebhookEvent, WebhookEventType};
use tracing::debug;

/// Events that should be enabled in the Razorpay Dashboard
pub const REQUIRED_WEBHOOK_EVENTS: &[&str] = &[
    "payment.authorized",
    "payment.captured",
    "payment.failed",
    "order.paid",
];

#[derive(Debug, Deserialize)]
struct RawEvent {
    event: String,
    #[serde(default)]
    payload: RawPayload,
}

#[derive(Debug, Default, Deserialize)]
struct RawPayload {
    #[serde(default)]
    payment: Option<Wrapped<PaymentEntity>>,
}

#[derive(Debug, Deserialize)]
struct Wrapped<T> {
    entity: T,
}

fn event_type(name: &str) -> WebhookEventType {
    match name {
        "payment.captured" => WebhookEventType::PaymentCaptured,
        "payment.authorized" => WebhookEventType::PaymentAuthorized,
        "payment.failed" => WebhookEventType::PaymentFailed,
        "order.paid" => WebhookEventType::OrderPaid,
        other => WebhookEventType::Unknown(other.to_string()),
    }
}

/// Parse a verified webhook body.
pub fn parse_event(payload: &[u8], event_id: Option<String>) -> ShopResult<WebhookEvent> {
    let raw: RawEvent = serde_json::from_slice(payload)
        .map_err(|e| ShopError::WebhookParseError(format!("Failed to parse webhook: {}", e)))?;

    debug!("Razorpay webhook: type={}", raw.event);

    let payment = raw
        .payload
        .payment
        .map(|wrapped| wrapped.entity.into_gateway_payment())
        .transpose()
        .map_err(|e| ShopError::WebhookParseError(e.to_string()))?;

    Ok(WebhookEvent {
        event_id,
        event_type: event_type(&raw.event),
        provider: "razorpay".to_string(),
        payment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shop_core::{Currency, GatewayPaymentStatus};

    fn captured_body() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "entity": "event",
            "account_id": "acc_BFQ7uQEaa7j2z7",
            "event": "payment.captured",
            "contains": ["payment"],
            "payload": {
                "payment": {
                    "entity": {
                        "id": "pay_DESlfW9H8K9uqM",
                        "entity": "payment",
                        "amount": 2500,
                        "currency": "INR",
                        "status": "captured",
                        "order_id": "order_DESlLckIVRkHWj",
                        "method": "netbanking",
                        "captured": true
                    }
                }
            },
            "created_at": 1567674606
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_payment_captured() {
        let event = parse_event(&captured_body(), Some("evt_1".into())).unwrap();

        assert_eq!(event.event_type, WebhookEventType::PaymentCaptured);
        assert_eq!(event.event_id.as_deref(), Some("evt_1"));
        assert_eq!(event.provider, "razorpay");

        let payment = event.payment.unwrap();
        assert_eq!(payment.id, "pay_DESlfW9H8K9uqM");
        assert_eq!(payment.order_id.as_deref(), Some("order_DESlLckIVRkHWj"));
        assert_eq!(payment.currency, Currency::INR);
        assert_eq!(payment.status, GatewayPaymentStatus::Captured);
        assert_eq!(payment.method.as_deref(), Some("netbanking"));
    }

    #[test]
    fn test_parse_unknown_event_without_payment() {
        let body = br#"{"entity":"event","event":"refund.created","contains":["refund"],"payload":{"refund":{"entity":{"id":"rfnd_1"}}}}"#;
        let event = parse_event(body, None).unwrap();

        assert_eq!(
            event.event_type,
            WebhookEventType::Unknown("refund.created".to_string())
        );
        assert!(event.payment.is_none());
    }

    #[test]
    fn test_parse_garbage() {
        let result = parse_event(b"not json", None);
        assert!(matches!(result, Err(ShopError::WebhookParseError(_))));
    }
}
