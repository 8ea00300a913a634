//! # Shop Error Types
//!
//! Typed error handling for the razorcart storefront.
//! Every catalog, cart, checkout and payment operation returns `Result<T, ShopError>`.

use thiserror::Error;
use uuid::Uuid;

/// Core error type for all storefront operations
#[derive(Debug, Error)]
pub enum ShopError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The operation needs an authenticated customer
    #[error("Authentication required")]
    Unauthenticated,

    /// Product missing from the catalog or not available
    #[error("Product not found: {product}")]
    ProductNotFound { product: String },

    /// Cart item missing from the shopper's cart
    #[error("Cart item not found: {item_id}")]
    CartItemNotFound { item_id: Uuid },

    /// Order missing (or owned by someone else)
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: String },

    /// Amount cannot be charged (zero, negative, or finer than the currency allows)
    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    /// Currency not supported
    #[error("Unsupported currency: {currency}")]
    UnsupportedCurrency { currency: String },

    /// Payment processor rejected the request
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with the processor
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Payment or webhook signature did not verify
    #[error("Signature verification failed: {0}")]
    SignatureVerificationFailed(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParseError(String),

    /// Confirmed payment does not match the order it claims to pay for
    #[error("Payment mismatch: {message}")]
    PaymentMismatch { message: String },

    /// Order was already paid by a different payment
    #[error("Order {order_id} is already paid by payment {payment_id}")]
    AlreadyPaid {
        order_id: Uuid,
        payment_id: String,
    },

    /// Persistence layer failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShopError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ShopError::NetworkError(_) | ShopError::ProviderError { .. } | ShopError::Storage(_)
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ShopError::Configuration(_) => 500,
            ShopError::InvalidRequest(_) => 400,
            ShopError::Unauthenticated => 401,
            ShopError::ProductNotFound { .. } => 404,
            ShopError::CartItemNotFound { .. } => 404,
            ShopError::OrderNotFound { .. } => 404,
            ShopError::InvalidAmount { .. } => 400,
            ShopError::UnsupportedCurrency { .. } => 400,
            ShopError::ProviderError { .. } => 502,
            ShopError::NetworkError(_) => 503,
            ShopError::SignatureVerificationFailed(_) => 401,
            ShopError::WebhookParseError(_) => 400,
            ShopError::PaymentMismatch { .. } => 409,
            ShopError::AlreadyPaid { .. } => 409,
            ShopError::Storage(_) => 500,
            ShopError::Serialization(_) => 500,
            ShopError::Internal(_) => 500,
        }
    }
}

/// Result type alias for storefront operations
pub type ShopResult<T> = Result<T, ShopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(ShopError::NetworkError("timeout".into()).is_retryable());
        assert!(ShopError::ProviderError {
            provider: "razorpay".into(),
            message: "server error".into()
        }
        .is_retryable());
        assert!(!ShopError::InvalidRequest("bad data".into()).is_retryable());
        assert!(!ShopError::SignatureVerificationFailed("mismatch".into()).is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ShopError::InvalidRequest("test".into()).status_code(), 400);
        assert_eq!(ShopError::Unauthenticated.status_code(), 401);
        assert_eq!(
            ShopError::OrderNotFound {
                order_id: "x".into()
            }
            .status_code(),
            404
        );
        assert_eq!(
            ShopError::AlreadyPaid {
                order_id: Uuid::nil(),
                payment_id: "pay_1".into()
            }
            .status_code(),
            409
        );
        assert_eq!(ShopError::NetworkError("down".into()).status_code(), 503);
    }
}
