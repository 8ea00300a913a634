//! # Razorpay Orders & Payments
//!
//! `PaymentGateway` backed by Razorpay's REST API:
//! - `POST /v1/orders` opens the remote order the browser checkout pays
//! - `GET /v1/payments/{id}` confirms what was actually paid

use crate::api::{parse_currency, ErrorResponse, OrderRequest, OrderResponse, PaymentEntity};
use crate::config::RazorpayConfig;
use crate::signature;
use crate::webhook;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use shop_core::{
    GatewayIntent, GatewayPayment, IntentRequest, PaymentConfirmation, PaymentGateway, ShopError,
    ShopResult, WebhookEvent,
};
use std::time::Duration;
use tracing::{debug, error, info, instrument};

const PROVIDER: &str = "razorpay";

/// Razorpay payment gateway
pub struct RazorpayGateway {
    config: RazorpayConfig,
    client: Client,
}

impl RazorpayGateway {
    /// Create a new gateway with a 30s request timeout
    pub fn new(config: RazorpayConfig) -> ShopResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ShopError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> ShopResult<Self> {
        let config = RazorpayConfig::from_env()?;
        Self::new(config)
    }

    pub fn config(&self) -> &RazorpayConfig {
        &self.config
    }

    /// Send an authenticated request and decode the JSON body.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> ShopResult<T> {
        let response = request
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .send()
            .await
            .map_err(|e| ShopError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ShopError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Razorpay API error: status={}, body={}", status, body);

            let message = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(parsed) => parsed.error.message(),
                Err(_) => format!("HTTP {}: {}", status, body),
            };
            return Err(ShopError::ProviderError {
                provider: PROVIDER.to_string(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            ShopError::Serialization(format!("Failed to parse Razorpay response: {}", e))
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    #[instrument(skip(self, request), fields(receipt = %request.receipt))]
    async fn create_intent(&self, request: &IntentRequest) -> ShopResult<GatewayIntent> {
        if request.amount <= 0 {
            return Err(ShopError::InvalidAmount {
                message: format!("amount must be positive, got {}", request.amount),
            });
        }

        let body = OrderRequest {
            amount: request.amount,
            currency: request.currency.as_str(),
            receipt: &request.receipt,
            payment_capture: u8::from(request.capture),
            notes: &request.notes,
        };

        debug!(
            "Creating Razorpay order: amount={}, currency={}",
            body.amount, body.currency
        );

        let order: OrderResponse = self
            .execute(self.client.post(self.config.endpoint("orders")).json(&body))
            .await?;

        info!(
            "Created Razorpay order: id={}, status={}",
            order.id, order.status
        );

        Ok(GatewayIntent {
            id: order.id,
            amount: order.amount,
            currency: parse_currency(&order.currency)?,
            status: order.status,
        })
    }

    fn verify_payment_signature(&self, confirmation: &PaymentConfirmation) -> ShopResult<()> {
        let message = signature::payment_message(
            &confirmation.gateway_order_id,
            &confirmation.gateway_payment_id,
        );
        if signature::verify(
            &self.config.key_secret,
            message.as_bytes(),
            &confirmation.signature,
        )? {
            Ok(())
        } else {
            Err(ShopError::SignatureVerificationFailed(
                "Payment signature mismatch".to_string(),
            ))
        }
    }

    #[instrument(skip(self))]
    async fn fetch_payment(&self, gateway_payment_id: &str) -> ShopResult<GatewayPayment> {
        if gateway_payment_id.is_empty()
            || !gateway_payment_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ShopError::InvalidRequest(format!(
                "malformed payment id: {:?}",
                gateway_payment_id
            )));
        }

        let entity: PaymentEntity = self
            .execute(
                self.client
                    .get(self.config.endpoint(&format!("payments/{}", gateway_payment_id))),
            )
            .await?;

        debug!(
            "Fetched Razorpay payment {}: status={}, amount={}",
            entity.id, entity.status, entity.amount
        );
        entity.into_gateway_payment()
    }

    #[instrument(skip(self, payload, signature))]
    fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
        event_id: Option<&str>,
    ) -> ShopResult<WebhookEvent> {
        if !signature::verify(&self.config.webhook_secret, payload, signature)? {
            return Err(ShopError::SignatureVerificationFailed(
                "Webhook signature mismatch".to_string(),
            ));
        }

        webhook::parse_event(payload, event_id.map(String::from))
    }

    fn public_key(&self) -> &str {
        &self.config.key_id
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn method_label(&self) -> &'static str {
        "Razorpay"
    }
}
