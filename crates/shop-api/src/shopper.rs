//! Shopper identity extractors.
//!
//! Authenticated customers arrive with `X-User-Id` / `X-User-Email` set by
//! the auth gateway in front of the API. Everyone else gets an anonymous
//! cart token kept in the cookie session.

use crate::handlers::{shop_error_to_response, ErrorResponse};
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use shop_core::{Customer, SessionToken, ShopError, ShopperId};
use tower_sessions::Session;
use tracing::{debug, error};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Session key holding the anonymous cart token
pub const CART_TOKEN_KEY: &str = "cart_token";

type Rejection = (StatusCode, Json<ErrorResponse>);

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn customer_from_headers(headers: &HeaderMap) -> Option<Customer> {
    let id = header_value(headers, USER_ID_HEADER)?;
    let email = header_value(headers, USER_EMAIL_HEADER).unwrap_or_default();
    Some(Customer::new(id, email))
}

fn session_unavailable() -> Rejection {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("Session unavailable", 500)),
    )
}

fn session_missing() -> Rejection {
    error!("Session layer is not installed");
    session_unavailable()
}

/// Read the anonymous cart token. A store failure is an error, not a
/// missing token, so the existing cart is never replaced.
async fn stored_cart_token(session: &Session) -> Result<Option<String>, Rejection> {
    session.get::<String>(CART_TOKEN_KEY).await.map_err(|e| {
        error!("Failed to read cart token: {}", e);
        session_unavailable()
    })
}

/// Requires an authenticated customer; 401 otherwise.
pub struct CurrentCustomer(pub Customer);

impl<S> FromRequestParts<S> for CurrentCustomer
where
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        customer_from_headers(&parts.headers)
            .map(Self)
            .ok_or_else(|| shop_error_to_response(ShopError::Unauthenticated))
    }
}

/// The shopper owning the cart, minting an anonymous token on first use.
pub struct CurrentShopper(pub ShopperId);

impl<S> FromRequestParts<S> for CurrentShopper
where
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(customer) = customer_from_headers(&parts.headers) {
            return Ok(Self(customer.shopper_id()));
        }

        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(session_missing)?;

        if let Some(token) = stored_cart_token(session).await? {
            return Ok(Self(ShopperId::anonymous(token)));
        }

        let token = SessionToken::generate();
        session
            .insert(CART_TOKEN_KEY, token.as_str())
            .await
            .map_err(|e| {
                error!("Failed to store cart token: {}", e);
                session_unavailable()
            })?;
        debug!("Issued anonymous cart token");

        Ok(Self(ShopperId::Anonymous(token)))
    }
}

/// The shopper, if one is known; never touches the session.
pub struct OptionalShopper(pub Option<ShopperId>);

impl<S> FromRequestParts<S> for OptionalShopper
where
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(customer) = customer_from_headers(&parts.headers) {
            return Ok(Self(Some(customer.shopper_id())));
        }

        let token = match parts.extensions.get::<Session>() {
            Some(session) => stored_cart_token(session).await?,
            None => None,
        };

        Ok(Self(token.map(ShopperId::anonymous)))
    }
}

/// Client address as reported by the reverse proxy
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_value(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
        .or_else(|| header_value(headers, "x-real-ip"))
}
