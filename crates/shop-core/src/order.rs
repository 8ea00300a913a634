//! # Order Types
//!
//! Orders snapshot a cart at checkout time. Prices, quantities and the total
//! are frozen when the order is built and never recomputed from the catalog.

use crate::cart::CartLine;
use crate::error::{ShopError, ShopResult};
use crate::money::Currency;
use crate::shopper::{Customer, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Contact and shipping fields submitted on the checkout form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactDetails {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub postcode: String,
    pub phone: String,
}

impl ContactDetails {
    /// All fields must be non-blank
    pub fn validate(&self) -> ShopResult<()> {
        let fields = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("address", &self.address),
            ("city", &self.city),
            ("postcode", &self.postcode),
            ("phone", &self.phone),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ShopError::InvalidRequest(format!(
                "missing checkout fields: {}",
                missing.join(", ")
            )))
        }
    }

    /// "address, city, postcode"
    pub fn full_address(&self) -> String {
        format!(
            "{}, {}, {}",
            self.address.trim(),
            self.city.trim(),
            self.postcode.trim()
        )
    }
}

/// A placed order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub address: String,
    pub phone: String,

    /// Frozen at creation
    pub total: Decimal,
    pub currency: Currency,

    /// Client IP at checkout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    pub paid: bool,

    /// Linked payment once paid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<Uuid>,

    /// Processor-side order id, set when the payment intent is created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_order_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Total in the currency's smallest unit
    pub fn total_minor_units(&self) -> ShopResult<i64> {
        self.currency.to_minor_units(self.total)
    }

    pub fn belongs_to(&self, user: &UserId) -> bool {
        &self.user_id == user
    }
}

/// A frozen order line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: u32,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// An order and its items, ready to be written in one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderDraft {
    /// Snapshot the cart lines into an unpaid order.
    pub fn from_cart(
        customer: &Customer,
        contact: &ContactDetails,
        lines: &[CartLine],
        currency: Currency,
        ip: Option<String>,
    ) -> ShopResult<Self> {
        if lines.is_empty() {
            return Err(ShopError::InvalidRequest(
                "cannot build an order from an empty cart".to_string(),
            ));
        }

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let items: Vec<OrderItem> = lines
            .iter()
            .map(|line| OrderItem {
                id: Uuid::new_v4(),
                order_id,
                product_id: line.product.id,
                product_name: line.product.name.clone(),
                price: line.product.price,
                quantity: line.item.quantity,
            })
            .collect();
        let total = items.iter().map(OrderItem::line_total).sum();

        let order = Order {
            id: order_id,
            user_id: customer.id.clone(),
            first_name: contact.first_name.trim().to_string(),
            last_name: contact.last_name.trim().to_string(),
            email: customer.email.clone(),
            address: contact.full_address(),
            phone: contact.phone.trim().to_string(),
            total,
            currency,
            ip,
            paid: false,
            payment_id: None,
            gateway_order_id: None,
            created_at: now,
            updated_at: now,
        };

        Ok(Self { order, items })
    }

    /// Would placing this draft just duplicate `existing`?
    ///
    /// True when `existing` is unpaid, has the same contact snapshot, the same
    /// total and the same (product, price, quantity) lines.
    pub fn duplicates(&self, existing: &Order, existing_items: &[OrderItem]) -> bool {
        let same_contact = existing.first_name == self.order.first_name
            && existing.last_name == self.order.last_name
            && existing.email == self.order.email
            && existing.address == self.order.address
            && existing.phone == self.order.phone;

        let key = |item: &OrderItem| (item.product_id, item.price, item.quantity);
        let mut ours: Vec<_> = self.items.iter().map(key).collect();
        let mut theirs: Vec<_> = existing_items.iter().map(key).collect();
        ours.sort();
        theirs.sort();

        !existing.paid
            && same_contact
            && existing.currency == self.order.currency
            && existing.total == self.order.total
            && ours == theirs
    }
}

/// Status recorded on a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Funds captured
    Paid,
    /// Authorized, capture pending at the processor
    Authorized,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Authorized => "Authorized",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Paid" => Ok(PaymentStatus::Paid),
            "Authorized" => Ok(PaymentStatus::Authorized),
            other => Err(ShopError::Serialization(format!(
                "unknown payment status: {}",
                other
            ))),
        }
    }
}

/// A confirmed payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: UserId,
    pub order_id: Uuid,
    /// Processor payment id (e.g. `pay_...`)
    pub gateway_payment_id: String,
    /// e.g. "Razorpay (upi)"
    pub method: String,
    pub amount_paid: Decimal,
    pub currency: Currency,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// Outcome of recording a payment against an order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "payment")]
pub enum FinalizeOutcome {
    /// New payment stored, order marked paid, cart cleared
    Recorded(Payment),
    /// Same processor payment was already recorded; nothing written
    AlreadyRecorded(Payment),
}

impl FinalizeOutcome {
    pub fn payment(&self) -> &Payment {
        match self {
            FinalizeOutcome::Recorded(p) | FinalizeOutcome::AlreadyRecorded(p) => p,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, FinalizeOutcome::AlreadyRecorded(_))
    }
}

/// Payment intent handed to the client to open the processor's checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub order_id: Uuid,
    /// Processor order id
    pub intent_id: String,
    /// Amount in minor units
    pub amount: i64,
    pub currency: Currency,
    /// Public key the client SDK needs
    pub key_id: String,
    pub provider: String,
}

/// An order with everything attached
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<Payment>,
}
