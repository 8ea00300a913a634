//! # Razorpay Configuration
//!
//! All secrets are loaded from environment variables.

use shop_core::ShopError;
use std::env;

/// Production API host
pub const DEFAULT_API_BASE: &str = "https://api.razorpay.com";

/// Razorpay API configuration
#[derive(Clone)]
pub struct RazorpayConfig {
    /// Key id (rzp_test_... or rzp_live_...), also handed to the browser
    pub key_id: String,

    /// Key secret, signs payment callbacks
    pub key_secret: String,

    /// Webhook secret configured in the dashboard
    pub webhook_secret: String,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,
}

impl RazorpayConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `RAZORPAY_KEY_ID`
    /// - `RAZORPAY_KEY_SECRET`
    /// - `RAZORPAY_WEBHOOK_SECRET`
    ///
    /// Optional: `RAZORPAY_API_BASE`
    pub fn from_env() -> Result<Self, ShopError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let key_id = required("RAZORPAY_KEY_ID")?;
        let key_secret = required("RAZORPAY_KEY_SECRET")?;
        let webhook_secret = required("RAZORPAY_WEBHOOK_SECRET")?;

        if !key_id.starts_with("rzp_test_") && !key_id.starts_with("rzp_live_") {
            return Err(ShopError::Configuration(
                "RAZORPAY_KEY_ID must start with rzp_test_ or rzp_live_".to_string(),
            ));
        }

        let config = Self::new(key_id, key_secret, webhook_secret);
        Ok(match env::var("RAZORPAY_API_BASE") {
            Ok(base) if !base.trim().is_empty() => config.with_api_base_url(base.trim()),
            _ => config,
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            webhook_secret: webhook_secret.into(),
            api_base_url: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Check if using test keys
    pub fn is_test_mode(&self) -> bool {
        self.key_id.starts_with("rzp_test_")
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.api_base_url, path)
    }
}

// Secrets stay out of logs
impl std::fmt::Debug for RazorpayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &"***")
            .field("webhook_secret", &"***")
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

fn required(name: &str) -> Result<String, ShopError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ShopError::Configuration(format!("{} not set", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_detection() {
        let config = RazorpayConfig::new("rzp_test_abc123", "secret", "whsec");
        assert!(config.is_test_mode());

        let config = RazorpayConfig::new("rzp_live_abc123", "secret", "whsec");
        assert!(!config.is_test_mode());
    }

    #[test]
    fn test_endpoint_building() {
        let config = RazorpayConfig::new("rzp_test_abc123", "secret", "whsec")
            .with_api_base_url("http://127.0.0.1:9000/");
        assert_eq!(config.endpoint("orders"), "http://127.0.0.1:9000/v1/orders");

        let config = RazorpayConfig::new("rzp_test_abc123", "secret", "whsec");
        assert_eq!(
            config.endpoint("payments/pay_1"),
            "https://api.razorpay.com/v1/payments/pay_1"
        );
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = RazorpayConfig::new("rzp_test_abc123", "topsecret", "hooksecret");
        let printed = format!("{:?}", config);
        assert!(printed.contains("rzp_test_abc123"));
        assert!(!printed.contains("topsecret"));
        assert!(!printed.contains("hooksecret"));
    }

    #[test]
    fn test_from_env_missing_key() {
        env::remove_var("RAZORPAY_KEY_ID");

        let result = RazorpayConfig::from_env();
        assert!(matches!(result, Err(ShopError::Configuration(_))));
    }
}
