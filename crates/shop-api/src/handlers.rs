//! # Request Handlers
//!
//! Axum request handlers for the storefront API: catalog, cart, checkout,
//! payment and the processor webhook.

use crate::shopper::{client_ip, CurrentCustomer, CurrentShopper, OptionalShopper};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use shop_core::{
    CartItem, CartView, Category, CheckoutOutcome, ContactDetails, FinalizeOutcome, Order,
    OrderDetail, PaymentConfirmation, PaymentIntent, PaymentOutcome, PlaceOrderOutcome, Product,
    ProductFilter, RemoveOutcome, ShopError, WebhookOutcome,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Where shoppers are sent when there is nothing to check out or pay
pub const CATALOG_PATH: &str = "/api/v1/products";

pub const RAZORPAY_SIGNATURE_HEADER: &str = "x-razorpay-signature";
pub const RAZORPAY_EVENT_ID_HEADER: &str = "x-razorpay-event-id";

type ApiError = (StatusCode, Json<ErrorResponse>);

// =============================================================================
// Request/Response Types
// =============================================================================

/// Product list response
#[derive(Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<Product>,
    pub count: usize,
}

/// Payment intent plus what the client needs to open the checkout widget
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    #[serde(flatten)]
    pub intent: PaymentIntent,
    /// The widget posts the result here
    pub callback_url: String,
    pub email: String,
}

/// Fields posted by the processor's checkout widget on success
#[derive(Debug, Default, Deserialize)]
pub struct PaymentCallbackForm {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub razorpay_payment_id: Option<String>,
    #[serde(default)]
    pub razorpay_order_id: Option<String>,
    #[serde(default)]
    pub razorpay_signature: Option<String>,
}

impl PaymentCallbackForm {
    fn into_confirmation(self) -> Result<(Uuid, PaymentConfirmation), ShopError> {
        fn required(value: Option<String>, name: &str) -> Result<String, ShopError> {
            value
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ShopError::InvalidRequest(format!("missing field: {}", name)))
        }

        let order_id = required(self.order_id, "order_id")?;
        let order_id = Uuid::parse_str(order_id.trim())
            .map_err(|_| ShopError::InvalidRequest(format!("invalid order_id: {}", order_id)))?;

        Ok((
            order_id,
            PaymentConfirmation {
                gateway_payment_id: required(self.razorpay_payment_id, "razorpay_payment_id")?,
                gateway_order_id: required(self.razorpay_order_id, "razorpay_order_id")?,
                signature: required(self.razorpay_signature, "razorpay_signature")?,
            },
        ))
    }
}

/// Webhook acknowledgement
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

pub(crate) fn shop_error_to_response(err: ShopError) -> ApiError {
    let code = err.status_code();
    let mut response = ErrorResponse::new(err.to_string(), code);
    if err.is_retryable() {
        response = response.with_details("retryable");
    }
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "razorcart",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// --- Catalog -----------------------------------------------------------------

/// List available products
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<ProductList>, ApiError> {
    let products = state
        .storefront
        .list_products(&filter)
        .await
        .map_err(shop_error_to_response)?;

    Ok(Json(ProductList {
        count: products.len(),
        products,
    }))
}

/// Get an available product by slug
pub async fn get_product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Product>, ApiError> {
    state
        .storefront
        .product_detail(&slug)
        .await
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, ApiError> {
    state
        .storefront
        .categories()
        .await
        .map(Json)
        .map_err(shop_error_to_response)
}

// --- Cart --------------------------------------------------------------------

/// Current cart; an unknown shopper sees an empty one
pub async fn view_cart(
    State(state): State<AppState>,
    OptionalShopper(shopper): OptionalShopper,
) -> Result<Json<CartView>, ApiError> {
    let Some(shopper) = shopper else {
        return Ok(Json(CartView::empty(state.storefront.currency())));
    };

    state
        .storefront
        .view_cart(&shopper)
        .await
        .map(Json)
        .map_err(shop_error_to_response)
}

/// Add one unit of a product to the cart
#[instrument(skip(state, shopper))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    CurrentShopper(shopper): CurrentShopper,
    Path(product_id): Path<Uuid>,
) -> Result<Json<CartItem>, ApiError> {
    state
        .storefront
        .add_to_cart(&shopper, product_id)
        .await
        .map(Json)
        .map_err(shop_error_to_response)
}

/// Remove one unit of a cart item
#[instrument(skip(state, shopper))]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    CurrentShopper(shopper): CurrentShopper,
    Path(item_id): Path<Uuid>,
) -> Result<Json<RemoveOutcome>, ApiError> {
    state
        .storefront
        .remove_from_cart(&shopper, item_id)
        .await
        .map(Json)
        .map_err(shop_error_to_response)
}

// --- Checkout ----------------------------------------------------------------

/// Checkout summary, or back to the catalog when the cart is empty
pub async fn checkout_summary(
    State(state): State<AppState>,
    CurrentCustomer(customer): CurrentCustomer,
) -> Result<Response, ApiError> {
    match state
        .storefront
        .checkout_summary(&customer)
        .await
        .map_err(shop_error_to_response)?
    {
        CheckoutOutcome::EmptyCart => Ok(Redirect::to(CATALOG_PATH).into_response()),
        CheckoutOutcome::Ready(view) => Ok(Json(view).into_response()),
    }
}

/// Turn the cart into an unpaid order
#[instrument(skip(state, customer, headers, contact), fields(user = %customer.id))]
pub async fn place_order(
    State(state): State<AppState>,
    CurrentCustomer(customer): CurrentCustomer,
    headers: HeaderMap,
    Json(contact): Json<ContactDetails>,
) -> Result<Response, ApiError> {
    let outcome = state
        .storefront
        .place_order(&customer, &contact, client_ip(&headers))
        .await
        .map_err(shop_error_to_response)?;

    Ok(match outcome {
        PlaceOrderOutcome::EmptyCart => Redirect::to(CATALOG_PATH).into_response(),
        PlaceOrderOutcome::Placed(detail) => (StatusCode::CREATED, Json(detail)).into_response(),
        PlaceOrderOutcome::Reused(detail) => (StatusCode::OK, Json(detail)).into_response(),
    })
}

// --- Payment -----------------------------------------------------------------

/// Open (or reuse) the processor order for the latest unpaid order
#[instrument(skip(state, customer), fields(user = %customer.id))]
pub async fn begin_payment(
    State(state): State<AppState>,
    CurrentCustomer(customer): CurrentCustomer,
) -> Result<Response, ApiError> {
    let outcome = state
        .storefront
        .begin_payment(&customer)
        .await
        .map_err(|e| {
            error!("Failed to create payment intent: {}", e);
            shop_error_to_response(e)
        })?;

    Ok(match outcome {
        PaymentOutcome::NoPendingOrder => Redirect::to(CATALOG_PATH).into_response(),
        PaymentOutcome::Intent(intent) => Json(PaymentResponse {
            intent,
            callback_url: state.config.payment_callback_url(),
            email: customer.email,
        })
        .into_response(),
    })
}

/// Success callback posted by the checkout widget
#[instrument(skip(state, form))]
pub async fn payment_success(
    State(state): State<AppState>,
    Form(form): Form<PaymentCallbackForm>,
) -> Result<Json<FinalizeOutcome>, ApiError> {
    let (order_id, confirmation) = form.into_confirmation().map_err(|e| {
        warn!("Malformed payment callback: {}", e);
        shop_error_to_response(e)
    })?;

    let outcome = state
        .storefront
        .confirm_payment(order_id, &confirmation)
        .await
        .map_err(shop_error_to_response)?;

    info!(
        "Payment callback for order {}: {}",
        order_id,
        if outcome.is_replay() {
            "already recorded"
        } else {
            "recorded"
        }
    );
    Ok(Json(outcome))
}

// --- Orders ------------------------------------------------------------------

/// The customer's orders, newest first
pub async fn list_orders(
    State(state): State<AppState>,
    CurrentCustomer(customer): CurrentCustomer,
) -> Result<Json<Vec<Order>>, ApiError> {
    state
        .storefront
        .orders(&customer)
        .await
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn get_order(
    State(state): State<AppState>,
    CurrentCustomer(customer): CurrentCustomer,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderDetail>, ApiError> {
    state
        .storefront
        .order_detail(&customer, order_id)
        .await
        .map(Json)
        .map_err(shop_error_to_response)
}

// --- Webhook -----------------------------------------------------------------

/// Handle Razorpay webhook
#[instrument(skip(state, headers, body))]
pub async fn razorpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers
        .get(RAZORPAY_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("Missing X-Razorpay-Signature header", 400)),
            )
        })?;
    let event_id = headers
        .get(RAZORPAY_EVENT_ID_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = state
        .storefront
        .handle_webhook(&body, signature, event_id)
        .await
        .map_err(|e| {
            error!("Webhook handling failed: {}", e);
            shop_error_to_response(e)
        })?;

    let status = match outcome {
        WebhookOutcome::Finalized(FinalizeOutcome::Recorded(_)) => "processed",
        WebhookOutcome::Finalized(FinalizeOutcome::AlreadyRecorded(_)) => "already_processed",
        WebhookOutcome::Ignored => "ignored",
    };
    info!("Webhook {:?} {}", event_id, status);

    Ok(Json(WebhookAck { status }))
}
