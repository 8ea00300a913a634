//! # shop-api
//!
//! HTTP API layer for razorcart.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - REST endpoints for catalog, cart, checkout, payment and orders
//! - Shopper identity extractors (auth headers, cookie session)
//! - Razorpay webhook handler
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/products` | List products (`?category=&limit=`) |
//! | GET | `/api/v1/products/{slug}` | Get product |
//! | GET | `/api/v1/categories` | List categories |
//! | GET | `/api/v1/cart` | View cart |
//! | POST | `/api/v1/cart/items/{id}` | Add one unit of product `id` |
//! | DELETE | `/api/v1/cart/items/{id}` | Remove one unit of cart item `id` |
//! | GET | `/api/v1/checkout` | Checkout summary |
//! | POST | `/api/v1/checkout` | Place order |
//! | GET | `/api/v1/payment` | Create payment intent |
//! | POST | `/api/v1/payment/success` | Payment callback |
//! | GET | `/api/v1/orders` | Order history |
//! | GET | `/api/v1/orders/{order_id}` | Order detail |
//! | POST | `/webhook/razorpay` | Razorpay webhook |

pub mod handlers;
pub mod routes;
pub mod shopper;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
