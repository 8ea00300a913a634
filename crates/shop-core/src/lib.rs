//! # shop-core
//!
//! Core types, traits and the checkout flow for the razorcart storefront.
//!
//! This crate provides:
//! - `Product`, `Category` and `ProductCatalog` for the catalog
//! - `Cart`, `CartItem` and `CartView` for shopping carts
//! - `Order`, `OrderItem` and `Payment` for checkout and settlement
//! - `PaymentGateway` trait for implementing payment processors
//! - `Store` trait for persistence, with an in-memory implementation
//! - `Storefront`, the service tying them together
//! - `ShopError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use shop_core::{Currency, Customer, MemoryStore, Storefront};
//!
//! let shop = Storefront::new(Arc::new(MemoryStore::new()), gateway, Currency::INR);
//!
//! // Fill the cart and check out
//! let me = Customer::new("user-1", "asha@example.com");
//! shop.add_to_cart(&me.shopper_id(), product_id).await?;
//! shop.place_order(&me, &contact, None).await?;
//!
//! // Open a payment with the processor and hand the intent to the client
//! let intent = shop.begin_payment(&me).await?;
//! ```

pub mod cart;
pub mod catalog;
pub mod error;
pub mod gateway;
pub mod money;
pub mod order;
pub mod shopper;
pub mod store;
pub mod storefront;

// Re-exports for convenience
pub use cart::{Cart, CartItem, CartLine, CartView, RemoveOutcome};
pub use catalog::{slugify, Category, Product, ProductCatalog, ProductFilter, ProductImage};
pub use error::{ShopError, ShopResult};
pub use gateway::{
    BoxedPaymentGateway, GatewayIntent, GatewayPayment, GatewayPaymentStatus, IntentRequest,
    PaymentConfirmation, PaymentGateway, WebhookEvent, WebhookEventType,
};
pub use money::Currency;
pub use order::{
    ContactDetails, FinalizeOutcome, Order, OrderDetail, OrderDraft, OrderItem, Payment,
    PaymentIntent, PaymentStatus,
};
pub use shopper::{Customer, SessionToken, ShopperId, UserId};
pub use store::{BoxedStore, MemoryStore, Store};
pub use storefront::{
    CheckoutOutcome, PaymentOutcome, PlaceOrderOutcome, Storefront, WebhookOutcome,
};
