//! # Routes
//!
//! Axum router configuration for the storefront API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tower_sessions::{cookie::SameSite, MemoryStore as SessionStore, SessionManagerLayer};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "razorcart_session";

/// Create the main application router
///
/// Routes:
/// - Catalog:
///   - GET    /api/v1/products?category=&limit=
///   - GET    /api/v1/products/{slug}
///   - GET    /api/v1/categories
///
/// - Cart (anonymous or authenticated):
///   - GET    /api/v1/cart
///   - POST   /api/v1/cart/items/{id}   (id = product id)
///   - DELETE /api/v1/cart/items/{id}   (id = cart item id)
///
/// - Checkout and payment (authenticated):
///   - GET    /api/v1/checkout
///   - POST   /api/v1/checkout
///   - GET    /api/v1/payment
///   - POST   /api/v1/payment/success (widget callback, form encoded)
///   - GET    /api/v1/orders
///   - GET    /api/v1/orders/{order_id}
///
/// - Webhooks:
///   - POST /webhook/razorpay
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let sessions = SessionManagerLayer::new(SessionStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_secure(state.config.is_production())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/");

    let api_routes = Router::new()
        // Catalog
        .route("/products", get(handlers::list_products))
        .route("/products/{slug}", get(handlers::get_product))
        .route("/categories", get(handlers::list_categories))
        // Cart
        .route("/cart", get(handlers::view_cart))
        .route(
            "/cart/items/{id}",
            post(handlers::add_to_cart).delete(handlers::remove_from_cart),
        )
        // Checkout
        .route(
            "/checkout",
            get(handlers::checkout_summary).post(handlers::place_order),
        )
        // Payment
        .route("/payment", get(handlers::begin_payment))
        .route("/payment/success", post(handlers::payment_success))
        // Orders
        .route("/orders", get(handlers::list_orders))
        .route("/orders/{order_id}", get(handlers::get_order));

    let webhook_path = state.storefront.gateway().webhook_path();

    Router::new()
        // Health check at root
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        // API v1
        .nest("/api/v1", api_routes)
        // Webhooks (raw body)
        .route(&webhook_path, post(handlers::razorpay_webhook))
        // Middleware
        .layer(sessions)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}
