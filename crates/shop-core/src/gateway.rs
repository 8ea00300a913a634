//! # Payment Gateway Trait
//!
//! Seam between the checkout flow and a payment processor.
//! Implementations: Razorpay (`shop-razorpay`).
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PaymentGateway (trait)                   │
//! │  ├── create_intent()             remote order for an Order  │
//! │  ├── verify_payment_signature()  client callback guard      │
//! │  ├── fetch_payment()             processor's view of a pay  │
//! │  └── verify_webhook()            signed server-to-server    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ShopResult;
use crate::money::Currency;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Request to open a remote payment order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntentRequest {
    /// Amount in minor units
    pub amount: i64,
    pub currency: Currency,
    /// Our order id, echoed back by the processor
    pub receipt: String,
    /// Capture automatically on authorization
    pub capture: bool,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub notes: HashMap<String, String>,
}

/// Remote payment order created by the processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayIntent {
    pub id: String,
    pub amount: i64,
    pub currency: Currency,
    pub status: String,
}

/// What the client reports back after paying
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentConfirmation {
    pub gateway_payment_id: String,
    pub gateway_order_id: String,
    pub signature: String,
}

/// Processor-side payment state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayPaymentStatus {
    Created,
    Authorized,
    Captured,
    Refunded,
    Failed,
}

impl GatewayPaymentStatus {
    /// Money has been secured for the order
    pub fn is_successful(&self) -> bool {
        matches!(
            self,
            GatewayPaymentStatus::Authorized | GatewayPaymentStatus::Captured
        )
    }
}

/// A payment as the processor reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    /// Processor order this payment belongs to
    #[serde(default)]
    pub order_id: Option<String>,
    /// Amount in minor units
    pub amount: i64,
    pub currency: Currency,
    pub status: GatewayPaymentStatus,
    /// Instrument (card, upi, netbanking, wallet...)
    #[serde(default)]
    pub method: Option<String>,
}

/// Webhook event types we care about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    /// Payment captured
    PaymentCaptured,
    /// Payment authorized (capture pending)
    PaymentAuthorized,
    /// Payment failed
    PaymentFailed,
    /// Order fully paid
    OrderPaid,
    /// Unknown event (passthrough)
    Unknown(String),
}

/// A verified webhook event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Event id from the processor (for logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    pub event_type: WebhookEventType,
    pub provider: String,
    /// Payment entity carried by the event, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<GatewayPayment>,
}

/// Core trait for payment processor implementations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a remote payment order.
    async fn create_intent(&self, request: &IntentRequest) -> ShopResult<GatewayIntent>;

    /// Check the signature the client received from the processor's checkout.
    ///
    /// Must succeed before any state is changed for the confirmation.
    fn verify_payment_signature(&self, confirmation: &PaymentConfirmation) -> ShopResult<()>;

    /// Fetch the processor's record of a payment.
    async fn fetch_payment(&self, gateway_payment_id: &str) -> ShopResult<GatewayPayment>;

    /// Verify a webhook signature and parse the event.
    ///
    /// `event_id` is the processor's delivery id when it is sent out of band.
    fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
        event_id: Option<&str>,
    ) -> ShopResult<WebhookEvent>;

    /// Public key id the client SDK is initialised with.
    fn public_key(&self) -> &str;

    /// Get the provider name (for logging and routing).
    fn provider_name(&self) -> &'static str;

    /// Label stored on payment records
    fn method_label(&self) -> &'static str;

    /// Get the webhook endpoint path for this provider.
    /// Default: `/webhook/{provider_name}`
    fn webhook_path(&self) -> String {
        format!("/webhook/{}", self.provider_name())
    }
}

/// Type alias for a shared payment gateway (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;
