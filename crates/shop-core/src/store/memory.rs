//! In-process store. One mutex guards every table, so each trait method is
//! a single critical section and therefore atomic.

use super::Store;
use crate::cart::{Cart, CartItem, CartLine, RemoveOutcome};
use crate::catalog::{Category, Product, ProductFilter};
use crate::error::{ShopError, ShopResult};
use crate::order::{FinalizeOutcome, Order, OrderDraft, OrderItem, Payment};
use crate::shopper::{ShopperId, UserId};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    categories: Vec<Category>,
    products: Vec<Product>,
    carts: Vec<Cart>,
    cart_items: Vec<CartItem>,
    // kept in creation order
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    payments: Vec<Payment>,
}

/// In-memory [`Store`], used in tests and when no database is configured
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> ShopResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| ShopError::Storage("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_products(&self, filter: &ProductFilter) -> ShopResult<Vec<Product>> {
        let tables = self.lock()?;
        Ok(tables
            .products
            .iter()
            .filter(|p| filter.matches(p))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn product_by_slug(&self, slug: &str) -> ShopResult<Option<Product>> {
        let tables = self.lock()?;
        Ok(tables.products.iter().find(|p| p.slug == slug).cloned())
    }

    async fn product_by_id(&self, id: Uuid) -> ShopResult<Option<Product>> {
        let tables = self.lock()?;
        Ok(tables.products.iter().find(|p| p.id == id).cloned())
    }

    async fn list_categories(&self) -> ShopResult<Vec<Category>> {
        let tables = self.lock()?;
        let mut categories = tables.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn upsert_category(&self, mut category: Category) -> ShopResult<Category> {
        let mut tables = self.lock()?;
        match tables.categories.iter_mut().find(|c| c.slug == category.slug) {
            Some(existing) => {
                category.id = existing.id;
                *existing = category.clone();
            }
            None => tables.categories.push(category.clone()),
        }
        Ok(category)
    }

    async fn upsert_product(&self, mut product: Product) -> ShopResult<Product> {
        let mut tables = self.lock()?;
        match tables.products.iter_mut().find(|p| p.slug == product.slug) {
            Some(existing) => {
                product.id = existing.id;
                product.created_at = existing.created_at;
                product.updated_at = Utc::now();
                *existing = product.clone();
            }
            None => tables.products.push(product.clone()),
        }
        Ok(product)
    }

    async fn find_cart(&self, owner: &ShopperId) -> ShopResult<Option<Cart>> {
        let tables = self.lock()?;
        Ok(tables.carts.iter().find(|c| &c.owner == owner).cloned())
    }

    async fn upsert_cart(&self, owner: &ShopperId) -> ShopResult<Cart> {
        let mut tables = self.lock()?;
        if let Some(cart) = tables.carts.iter().find(|c| &c.owner == owner) {
            return Ok(cart.clone());
        }
        let cart = Cart::new(owner.clone());
        tables.carts.push(cart.clone());
        Ok(cart)
    }

    async fn add_cart_item(&self, cart_id: Uuid, product_id: Uuid) -> ShopResult<CartItem> {
        let mut tables = self.lock()?;
        if !tables.carts.iter().any(|c| c.id == cart_id) {
            return Err(ShopError::Storage(format!("cart {} does not exist", cart_id)));
        }
        if !tables.products.iter().any(|p| p.id == product_id) {
            return Err(ShopError::ProductNotFound {
                product: product_id.to_string(),
            });
        }

        if let Some(item) = tables
            .cart_items
            .iter_mut()
            .find(|i| i.cart_id == cart_id && i.product_id == product_id)
        {
            item.quantity += 1;
            return Ok(item.clone());
        }

        let item = CartItem::first_unit(cart_id, product_id);
        tables.cart_items.push(item.clone());
        Ok(item)
    }

    async fn remove_cart_item(
        &self,
        cart_id: Uuid,
        item_id: Uuid,
    ) -> ShopResult<Option<RemoveOutcome>> {
        let mut tables = self.lock()?;
        let Some(pos) = tables
            .cart_items
            .iter()
            .position(|i| i.id == item_id && i.cart_id == cart_id)
        else {
            return Ok(None);
        };

        let item = &mut tables.cart_items[pos];
        if item.quantity > 1 {
            item.quantity -= 1;
            return Ok(Some(RemoveOutcome::Decremented(item.clone())));
        }

        tables.cart_items.remove(pos);
        Ok(Some(RemoveOutcome::Removed))
    }

    async fn cart_lines(&self, cart_id: Uuid) -> ShopResult<Vec<CartLine>> {
        let tables = self.lock()?;
        tables
            .cart_items
            .iter()
            .filter(|i| i.cart_id == cart_id)
            .map(|item| {
                let product = tables
                    .products
                    .iter()
                    .find(|p| p.id == item.product_id)
                    .cloned()
                    .ok_or_else(|| {
                        ShopError::Storage(format!(
                            "cart item {} references missing product {}",
                            item.id, item.product_id
                        ))
                    })?;
                Ok(CartLine {
                    item: item.clone(),
                    product,
                })
            })
            .collect()
    }

    async fn insert_order(&self, draft: &OrderDraft) -> ShopResult<Order> {
        let mut tables = self.lock()?;
        if draft.items.iter().any(|i| i.order_id != draft.order.id) {
            return Err(ShopError::Internal(
                "order item belongs to a different order".to_string(),
            ));
        }
        tables.orders.push(draft.order.clone());
        tables.order_items.extend(draft.items.iter().cloned());
        Ok(draft.order.clone())
    }

    async fn order(&self, id: Uuid) -> ShopResult<Option<Order>> {
        let tables = self.lock()?;
        Ok(tables.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn order_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> ShopResult<Option<Order>> {
        let tables = self.lock()?;
        Ok(tables
            .orders
            .iter()
            .find(|o| o.gateway_order_id.as_deref() == Some(gateway_order_id))
            .cloned())
    }

    async fn order_items(&self, order_id: Uuid) -> ShopResult<Vec<OrderItem>> {
        let tables = self.lock()?;
        Ok(tables
            .order_items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn latest_unpaid_order(&self, user: &UserId) -> ShopResult<Option<Order>> {
        let tables = self.lock()?;
        Ok(tables
            .orders
            .iter()
            .rev()
            .find(|o| !o.paid && o.belongs_to(user))
            .cloned())
    }

    async fn orders_for_user(&self, user: &UserId) -> ShopResult<Vec<Order>> {
        let tables = self.lock()?;
        Ok(tables
            .orders
            .iter()
            .rev()
            .filter(|o| o.belongs_to(user))
            .cloned()
            .collect())
    }

    async fn set_gateway_order_id(
        &self,
        order_id: Uuid,
        gateway_order_id: &str,
    ) -> ShopResult<Order> {
        let mut tables = self.lock()?;
        let order = tables
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| ShopError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;
        order.gateway_order_id = Some(gateway_order_id.to_string());
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn finalize_payment(&self, payment: Payment) -> ShopResult<FinalizeOutcome> {
        let mut tables = self.lock()?;
        let tables = &mut *tables;

        let order = tables
            .orders
            .iter_mut()
            .find(|o| o.id == payment.order_id)
            .ok_or_else(|| ShopError::OrderNotFound {
                order_id: payment.order_id.to_string(),
            })?;

        if order.paid {
            let existing = tables
                .payments
                .iter()
                .find(|p| Some(p.id) == order.payment_id)
                .cloned()
                .ok_or_else(|| {
                    ShopError::Storage(format!("paid order {} has no payment row", order.id))
                })?;
            if existing.gateway_payment_id == payment.gateway_payment_id {
                return Ok(FinalizeOutcome::AlreadyRecorded(existing));
            }
            return Err(ShopError::AlreadyPaid {
                order_id: order.id,
                payment_id: existing.gateway_payment_id,
            });
        }

        if tables
            .payments
            .iter()
            .any(|p| p.gateway_payment_id == payment.gateway_payment_id)
        {
            return Err(ShopError::PaymentMismatch {
                message: format!(
                    "payment {} is already recorded for another order",
                    payment.gateway_payment_id
                ),
            });
        }

        order.paid = true;
        order.payment_id = Some(payment.id);
        order.updated_at = Utc::now();
        tables.payments.push(payment.clone());

        let owner = ShopperId::User(order.user_id.clone());
        if let Some(cart) = tables.carts.iter().find(|c| c.owner == owner) {
            let cart_id = cart.id;
            tables.cart_items.retain(|i| i.cart_id != cart_id);
        }

        Ok(FinalizeOutcome::Recorded(payment))
    }

    async fn payment(&self, id: Uuid) -> ShopResult<Option<Payment>> {
        let tables = self.lock()?;
        Ok(tables.payments.iter().find(|p| p.id == id).cloned())
    }

    async fn payments_for_order(&self, order_id: Uuid) -> ShopResult<Vec<Payment>> {
        let tables = self.lock()?;
        Ok(tables
            .payments
            .iter()
            .filter(|p| p.order_id == order_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;
    use crate::order::{ContactDetails, PaymentStatus};
    use crate::shopper::Customer;
    use rust_decimal::Decimal;

    async fn seeded() -> (MemoryStore, Product, Product) {
        let store = MemoryStore::new();
        let a = store
            .upsert_product(Product::new("A", Decimal::new(10, 0)))
            .await
            .unwrap();
        let b = store
            .upsert_product(Product::new("B", Decimal::new(5, 0)))
            .await
            .unwrap();
        (store, a, b)
    }

    #[tokio::test]
    async fn test_upsert_cart_is_stable() {
        let store = MemoryStore::new();
        let owner = ShopperId::anonymous("tok-1");

        assert!(store.find_cart(&owner).await.unwrap().is_none());
        let first = store.upsert_cart(&owner).await.unwrap();
        let second = store.upsert_cart(&owner).await.unwrap();
        assert_eq!(first.id, second.id);

        let other = store.upsert_cart(&ShopperId::user("u1")).await.unwrap();
        assert_ne!(first.id, other.id);
    }

    #[tokio::test]
    async fn test_upsert_product_keeps_id() {
        let (store, a, _) = seeded().await;
        let mut repriced = Product::new("A", Decimal::new(12, 0));
        repriced.slug = a.slug.clone();

        let stored = store.upsert_product(repriced).await.unwrap();
        assert_eq!(stored.id, a.id);
        assert_eq!(
            store.product_by_id(a.id).await.unwrap().unwrap().price,
            Decimal::new(12, 0)
        );
    }

    #[tokio::test]
    async fn test_remove_requires_matching_cart() {
        let (store, a, _) = seeded().await;
        let mine = store.upsert_cart(&ShopperId::user("u1")).await.unwrap();
        let theirs = store.upsert_cart(&ShopperId::user("u2")).await.unwrap();
        let item = store.add_cart_item(mine.id, a.id).await.unwrap();

        assert!(store
            .remove_cart_item(theirs.id, item.id)
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.cart_lines(mine.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_finalize_replay_and_conflict() {
        let (store, a, b) = seeded().await;
        let customer = Customer::new("u1", "u1@example.com");
        let cart = store.upsert_cart(&customer.shopper_id()).await.unwrap();
        store.add_cart_item(cart.id, a.id).await.unwrap();
        store.add_cart_item(cart.id, b.id).await.unwrap();

        let lines = store.cart_lines(cart.id).await.unwrap();
        let contact = ContactDetails {
            first_name: "A".into(),
            last_name: "B".into(),
            address: "x".into(),
            city: "y".into(),
            postcode: "z".into(),
            phone: "1".into(),
        };
        let draft = OrderDraft::from_cart(&customer, &contact, &lines, Currency::INR, None).unwrap();
        let order = store.insert_order(&draft).await.unwrap();
        assert_eq!(store.order_items(order.id).await.unwrap().len(), 2);

        let payment = |gateway_id: &str| Payment {
            id: Uuid::new_v4(),
            user_id: customer.id.clone(),
            order_id: order.id,
            gateway_payment_id: gateway_id.to_string(),
            method: "Razorpay".into(),
            amount_paid: order.total,
            currency: Currency::INR,
            status: PaymentStatus::Paid,
            created_at: Utc::now(),
        };

        let first = store.finalize_payment(payment("pay_1")).await.unwrap();
        assert!(!first.is_replay());
        assert!(store.cart_lines(cart.id).await.unwrap().is_empty());

        let replay = store.finalize_payment(payment("pay_1")).await.unwrap();
        assert!(replay.is_replay());
        assert_eq!(replay.payment().id, first.payment().id);

        let other = store.finalize_payment(payment("pay_2")).await;
        assert!(matches!(other, Err(ShopError::AlreadyPaid { .. })));

        assert_eq!(store.payments_for_order(order.id).await.unwrap().len(), 1);
        assert!(store.latest_unpaid_order(&customer.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_finalize_unknown_order() {
        let store = MemoryStore::new();
        let result = store
            .finalize_payment(Payment {
                id: Uuid::new_v4(),
                user_id: UserId::new("u1"),
                order_id: Uuid::new_v4(),
                gateway_payment_id: "pay_x".into(),
                method: "Razorpay".into(),
                amount_paid: Decimal::ONE,
                currency: Currency::INR,
                status: PaymentStatus::Paid,
                created_at: Utc::now(),
            })
            .await;
        assert!(matches!(result, Err(ShopError::OrderNotFound { .. })));
    }
}
