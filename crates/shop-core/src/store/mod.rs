//! # Store Trait
//!
//! Persistence seam for catalog, carts, orders and payments.
//!
//! Implementations must make each method atomic on its own. In particular
//! `add_cart_item` increments without lost updates, `insert_order` writes the
//! order and all of its items or nothing, and `finalize_payment` records the
//! payment, marks the order paid and clears the cart as one unit.
//!
//! Implementations: [`MemoryStore`] (this crate), `PgStore` (`shop-postgres`).

mod memory;

pub use memory::MemoryStore;

use crate::cart::{Cart, CartItem, CartLine, RemoveOutcome};
use crate::catalog::{Category, Product, ProductFilter};
use crate::error::ShopResult;
use crate::order::{FinalizeOutcome, Order, OrderDraft, OrderItem, Payment};
use crate::shopper::{ShopperId, UserId};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait Store: Send + Sync {
    // ---- catalog ----------------------------------------------------------

    /// Available products matching the filter, in catalog order
    async fn list_products(&self, filter: &ProductFilter) -> ShopResult<Vec<Product>>;

    /// Product by slug, available or not
    async fn product_by_slug(&self, slug: &str) -> ShopResult<Option<Product>>;

    /// Product by id, available or not
    async fn product_by_id(&self, id: Uuid) -> ShopResult<Option<Product>>;

    async fn list_categories(&self) -> ShopResult<Vec<Category>>;

    /// Insert or update by slug. Returns the stored row (existing id is kept).
    async fn upsert_category(&self, category: Category) -> ShopResult<Category>;

    /// Insert or update by slug. Returns the stored row (existing id is kept).
    async fn upsert_product(&self, product: Product) -> ShopResult<Product>;

    // ---- carts ------------------------------------------------------------

    async fn find_cart(&self, owner: &ShopperId) -> ShopResult<Option<Cart>>;

    /// Return the owner's cart, creating it when absent.
    async fn upsert_cart(&self, owner: &ShopperId) -> ShopResult<Cart>;

    /// Add one unit of a product: increments the existing line or creates it
    /// with quantity 1.
    async fn add_cart_item(&self, cart_id: Uuid, product_id: Uuid) -> ShopResult<CartItem>;

    /// Remove one unit from an item of this cart. `None` when the item is not
    /// in the cart.
    async fn remove_cart_item(
        &self,
        cart_id: Uuid,
        item_id: Uuid,
    ) -> ShopResult<Option<RemoveOutcome>>;

    /// Items of a cart joined with their products, oldest first
    async fn cart_lines(&self, cart_id: Uuid) -> ShopResult<Vec<CartLine>>;

    // ---- orders -----------------------------------------------------------

    /// Write an order and its items in one transaction
    async fn insert_order(&self, draft: &OrderDraft) -> ShopResult<Order>;

    async fn order(&self, id: Uuid) -> ShopResult<Option<Order>>;

    async fn order_by_gateway_order_id(&self, gateway_order_id: &str)
        -> ShopResult<Option<Order>>;

    async fn order_items(&self, order_id: Uuid) -> ShopResult<Vec<OrderItem>>;

    /// Most recently created unpaid order of the user
    async fn latest_unpaid_order(&self, user: &UserId) -> ShopResult<Option<Order>>;

    /// All orders of the user, newest first
    async fn orders_for_user(&self, user: &UserId) -> ShopResult<Vec<Order>>;

    /// Remember the processor order created for this order
    async fn set_gateway_order_id(&self, order_id: Uuid, gateway_order_id: &str)
        -> ShopResult<Order>;

    // ---- payments ---------------------------------------------------------

    /// Record a confirmed payment against `payment.order_id`, atomically:
    ///
    /// - order missing → `OrderNotFound`
    /// - order already paid by the same processor payment → `AlreadyRecorded`
    /// - order already paid by another payment → `AlreadyPaid`
    /// - otherwise insert the payment, link it, set `paid`, and delete the
    ///   items of the order owner's cart (a missing cart is fine)
    async fn finalize_payment(&self, payment: Payment) -> ShopResult<FinalizeOutcome>;

    async fn payment(&self, id: Uuid) -> ShopResult<Option<Payment>>;

    async fn payments_for_order(&self, order_id: Uuid) -> ShopResult<Vec<Payment>>;
}

/// Type alias for a shared store (dynamic dispatch)
pub type BoxedStore = Arc<dyn Store>;
