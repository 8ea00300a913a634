//! Razorpay REST payloads.

use serde::{Deserialize, Serialize};
use shop_core::{Currency, GatewayPayment, GatewayPaymentStatus, ShopError, ShopResult};
use std::collections::HashMap;

#[derive(Debug, Serialize)]
pub(crate) struct OrderRequest<'a> {
    pub amount: i64,
    pub currency: &'a str,
    pub receipt: &'a str,
    pub payment_capture: u8,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub notes: &'a HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrderResponse {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

/// Payment entity, as returned by `GET /v1/payments/{id}` and embedded in
/// webhook payloads
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PaymentEntity {
    pub id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub method: Option<String>,
}

impl PaymentEntity {
    pub fn into_gateway_payment(self) -> ShopResult<GatewayPayment> {
        let status = match self.status.as_str() {
            "created" => GatewayPaymentStatus::Created,
            "authorized" => GatewayPaymentStatus::Authorized,
            "captured" => GatewayPaymentStatus::Captured,
            "refunded" => GatewayPaymentStatus::Refunded,
            "failed" => GatewayPaymentStatus::Failed,
            other => {
                return Err(ShopError::Serialization(format!(
                    "unknown Razorpay payment status: {}",
                    other
                )))
            }
        };

        Ok(GatewayPayment {
            id: self.id,
            order_id: self.order_id,
            amount: self.amount,
            currency: parse_currency(&self.currency)?,
            status,
            method: self.method,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ErrorBody {
    pub fn message(&self) -> String {
        match (&self.code, &self.description) {
            (Some(code), Some(desc)) => format!("{}: {}", code, desc),
            (None, Some(desc)) => desc.clone(),
            (Some(code), None) => code.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

pub(crate) fn parse_currency(code: &str) -> ShopResult<Currency> {
    code.to_ascii_uppercase().parse()
}
