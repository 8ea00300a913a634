//! HMAC-SHA256 signatures used by Razorpay.
//!
//! - Checkout callback: `hex(HMAC(key_secret, "{order_id}|{payment_id}"))`
//! - Webhook: `hex(HMAC(webhook_secret, raw_body))` in `X-Razorpay-Signature`

use hmac::{Hmac, Mac};
use sha2::Sha256;
use shop_core::{ShopError, ShopResult};

type HmacSha256 = Hmac<Sha256>;

fn mac(secret: &str) -> ShopResult<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ShopError::Configuration(format!("invalid HMAC key: {}", e)))
}

/// Hex-encoded HMAC-SHA256 of `message`
pub fn sign(secret: &str, message: &[u8]) -> ShopResult<String> {
    let mut mac = mac(secret)?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex signature. Malformed hex never verifies.
pub fn verify(secret: &str, message: &[u8], signature: &str) -> ShopResult<bool> {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return Ok(false);
    };
    let mut mac = mac(secret)?;
    mac.update(message);
    Ok(mac.verify_slice(&expected).is_ok())
}

/// Message signed for a checkout callback
pub fn payment_message(gateway_order_id: &str, gateway_payment_id: &str) -> String {
    format!("{}|{}", gateway_order_id, gateway_payment_id)
}

/// Signature Razorpay's checkout hands to the browser after payment
pub fn payment_signature(
    key_secret: &str,
    gateway_order_id: &str,
    gateway_payment_id: &str,
) -> ShopResult<String> {
    sign(
        key_secret,
        payment_message(gateway_order_id, gateway_payment_id).as_bytes(),
    )
}
