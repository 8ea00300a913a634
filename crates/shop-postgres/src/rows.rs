//! Row types and their conversion into domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shop_core::{
    Cart, CartItem, Category, Currency, Order, OrderItem, Payment, PaymentStatus, Product,
    ProductImage, SessionToken, ShopError, ShopResult, ShopperId, UserId,
};
use sqlx::FromRow;
use uuid::Uuid;

pub(crate) fn db_err(e: sqlx::Error) -> ShopError {
    ShopError::Storage(e.to_string())
}

fn quantity(raw: i32) -> ShopResult<u32> {
    u32::try_from(raw)
        .ok()
        .filter(|q| *q >= 1)
        .ok_or_else(|| ShopError::Storage(format!("invalid quantity in database: {}", raw)))
}

pub(crate) fn quantity_column(q: u32) -> ShopResult<i32> {
    i32::try_from(q).map_err(|_| ShopError::InvalidRequest(format!("quantity too large: {}", q)))
}

/// `(user_id, session_token)` columns for a cart owner
pub(crate) fn owner_columns(owner: &ShopperId) -> (Option<&str>, Option<&str>) {
    match owner {
        ShopperId::User(id) => (Some(id.as_str()), None),
        ShopperId::Anonymous(token) => (None, Some(token.as_str())),
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct CategoryRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            slug: row.slug,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ProductRow {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    pub price: Decimal,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRow {
    pub fn into_product(self, images: Vec<ProductImage>) -> Product {
        Product {
            id: self.id,
            slug: self.slug,
            name: self.name,
            description: self.description,
            category: self.category,
            price: self.price,
            available: self.available,
            images,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ImageRow {
    pub product_id: Uuid,
    pub url: String,
    pub alt_text: Option<String>,
    pub position: i32,
}

impl From<ImageRow> for ProductImage {
    fn from(row: ImageRow) -> Self {
        ProductImage {
            url: row.url,
            alt_text: row.alt_text,
            position: row.position,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct CartRow {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub session_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CartRow> for Cart {
    type Error = ShopError;

    fn try_from(row: CartRow) -> ShopResult<Self> {
        let owner = match (row.user_id, row.session_token) {
            (Some(user), None) => ShopperId::User(UserId::new(user)),
            (None, Some(token)) => ShopperId::Anonymous(SessionToken::new(token)),
            _ => {
                return Err(ShopError::Storage(format!(
                    "cart {} must have exactly one owner",
                    row.id
                )))
            }
        };
        Ok(Cart {
            id: row.id,
            owner,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct CartItemRow {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = ShopError;

    fn try_from(row: CartItemRow) -> ShopResult<Self> {
        Ok(CartItem {
            id: row.id,
            cart_id: row.cart_id,
            product_id: row.product_id,
            quantity: quantity(row.quantity)?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct OrderRow {
    pub id: Uuid,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub address: String,
    pub phone: String,
    pub total: Decimal,
    pub currency: String,
    pub ip: Option<String>,
    pub paid: bool,
    pub payment_id: Option<Uuid>,
    pub gateway_order_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = ShopError;

    fn try_from(row: OrderRow) -> ShopResult<Self> {
        Ok(Order {
            id: row.id,
            user_id: UserId::new(row.user_id),
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            address: row.address,
            phone: row.phone,
            total: row.total,
            currency: currency(&row.currency)?,
            ip: row.ip,
            paid: row.paid,
            payment_id: row.payment_id,
            gateway_order_id: row.gateway_order_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: i32,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = ShopError;

    fn try_from(row: OrderItemRow) -> ShopResult<Self> {
        Ok(OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            product_name: row.product_name,
            price: row.price,
            quantity: quantity(row.quantity)?,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PaymentRow {
    pub id: Uuid,
    pub user_id: String,
    pub order_id: Uuid,
    pub gateway_payment_id: String,
    pub method: String,
    pub amount_paid: Decimal,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = ShopError;

    fn try_from(row: PaymentRow) -> ShopResult<Self> {
        Ok(Payment {
            id: row.id,
            user_id: UserId::new(row.user_id),
            order_id: row.order_id,
            gateway_payment_id: row.gateway_payment_id,
            method: row.method,
            amount_paid: row.amount_paid,
            currency: currency(&row.currency)?,
            status: row.status.parse::<PaymentStatus>()?,
            created_at: row.created_at,
        })
    }
}

fn currency(code: &str) -> ShopResult<Currency> {
    code.parse()
        .map_err(|e: ShopError| ShopError::Storage(format!("bad currency in database: {}", e)))
}
