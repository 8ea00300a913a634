//! # shop-razorpay
//!
//! Razorpay payment gateway for razorcart.
//!
//! The flow Razorpay expects:
//!
//! 1. Server creates a Razorpay order for the amount (`create_intent`)
//! 2. Browser opens Razorpay Checkout with the key id and that order id
//! 3. Checkout returns `razorpay_payment_id`, `razorpay_order_id` and
//!    `razorpay_signature` to the browser, which posts them back
//! 4. Server verifies the signature, fetches the payment and settles the order
//!
//! Webhooks (`payment.captured`, `order.paid`) cover the case where the
//! browser never makes it back.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shop_razorpay::RazorpayGateway;
//! use shop_core::PaymentGateway;
//!
//! // Create gateway from environment
//! let gateway = RazorpayGateway::from_env()?;
//!
//! let intent = gateway.create_intent(&request).await?;
//! // Hand intent.id and gateway.public_key() to the browser
//! ```

mod api;
pub mod config;
pub mod gateway;
pub mod signature;
pub mod webhook;

// Re-exports
pub use config::RazorpayConfig;
pub use gateway::RazorpayGateway;
pub use webhook::REQUIRED_WEBHOOK_EVENTS;
