//! # Cart Types
//!
//! Shopping cart rows and the read-only cart view.
//! Cart totals use **current** product prices; order totals are frozen at checkout.

use crate::catalog::Product;
use crate::money::Currency;
use crate::shopper::ShopperId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A shopper's cart. Created on first add, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: Uuid,
    pub owner: ShopperId,
    pub created_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(owner: ShopperId) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            created_at: Utc::now(),
        }
    }
}

/// One product in a cart. At most one per (cart, product); quantity ≥ 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    /// A fresh line with quantity 1
    pub fn first_unit(cart_id: Uuid, product_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            cart_id,
            product_id,
            quantity: 1,
            created_at: Utc::now(),
        }
    }
}

/// Result of removing one unit from a cart item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "item")]
pub enum RemoveOutcome {
    /// Quantity went down by one
    Decremented(CartItem),
    /// Quantity was 1, the row is gone
    Removed,
}

/// A cart item joined with its product
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLine {
    pub item: CartItem,
    pub product: Product,
}

impl CartLine {
    /// Current price × quantity
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.item.quantity)
    }
}

/// What the cart page shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_id: Option<Uuid>,
    pub lines: Vec<CartLine>,
    pub total: Decimal,
    pub currency: Currency,
    pub item_count: u32,
}

impl CartView {
    /// No cart yet
    pub fn empty(currency: Currency) -> Self {
        Self {
            cart_id: None,
            lines: Vec::new(),
            total: Decimal::ZERO,
            currency,
            item_count: 0,
        }
    }

    pub fn from_lines(cart_id: Uuid, lines: Vec<CartLine>, currency: Currency) -> Self {
        let total = lines.iter().map(CartLine::line_total).sum();
        let item_count = lines.iter().map(|l| l.item.quantity).sum();
        Self {
            cart_id: Some(cart_id),
            lines,
            total,
            currency,
            item_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total formatted for display
    pub fn display_total(&self) -> String {
        self.currency.format(self.total)
    }
}
