//! `Store` implementation over a `PgPool`.

use crate::rows::{
    db_err, owner_columns, quantity_column, CartItemRow, CartRow, CategoryRow, ImageRow,
    OrderItemRow, OrderRow, PaymentRow, ProductRow,
};
use async_trait::async_trait;
use shop_core::{
    Cart, CartItem, CartLine, Category, FinalizeOutcome, Order, OrderDraft, OrderItem, Payment,
    Product, ProductFilter, ProductImage, RemoveOutcome, ShopError, ShopResult, ShopperId, Store,
    UserId,
};
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use tracing::{debug, info, instrument};
use uuid::Uuid;

const PRODUCT_COLUMNS: &str =
    "id, slug, name, description, category, price, available, created_at, updated_at";
const CART_COLUMNS: &str = "id, user_id, session_token, created_at";
const CART_ITEM_COLUMNS: &str = "id, cart_id, product_id, quantity, created_at";
const ORDER_COLUMNS: &str = "id, user_id, first_name, last_name, email, address, phone, total, \
     currency, ip, paid, payment_id, gateway_order_id, created_at, updated_at";
const ORDER_ITEM_COLUMNS: &str = "id, order_id, product_id, product_name, price, quantity";
const PAYMENT_COLUMNS: &str =
    "id, user_id, order_id, gateway_payment_id, method, amount_paid, currency, status, created_at";

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Attach images to product rows, preserving row order.
    async fn with_images(&self, rows: Vec<ProductRow>) -> ShopResult<Vec<Product>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let images: Vec<ImageRow> = sqlx::query_as(
            "SELECT product_id, url, alt_text, position FROM product_images \
             WHERE product_id = ANY($1) ORDER BY position",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut by_product: HashMap<Uuid, Vec<ProductImage>> = HashMap::new();
        for image in images {
            by_product
                .entry(image.product_id)
                .or_default()
                .push(image.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let images = by_product.remove(&row.id).unwrap_or_default();
                row.into_product(images)
            })
            .collect())
    }

    async fn product_where(&self, clause: &str, key: Key<'_>) -> ShopResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE {}", PRODUCT_COLUMNS, clause);
        let row = key
            .bind(sqlx::query_as::<_, ProductRow>(&sql))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match row {
            Some(row) => Ok(self.with_images(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn order_where(&self, clause: &str, key: Key<'_>) -> ShopResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE {}", ORDER_COLUMNS, clause);
        let row = key
            .bind(sqlx::query_as::<_, OrderRow>(&sql))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(Order::try_from).transpose()
    }

    async fn locked_order(
        tx: &mut Transaction<'_, Postgres>,
        order_id: Uuid,
    ) -> ShopResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE id = $1 FOR UPDATE", ORDER_COLUMNS);
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(db_err)?
            .map(Order::try_from)
            .transpose()
    }

    async fn payment_where(
        tx: &mut Transaction<'_, Postgres>,
        clause: &str,
        key: Key<'_>,
    ) -> ShopResult<Option<Payment>> {
        let sql = format!("SELECT {} FROM payments WHERE {}", PAYMENT_COLUMNS, clause);
        key.bind(sqlx::query_as::<_, PaymentRow>(&sql))
            .fetch_optional(&mut **tx)
            .await
            .map_err(db_err)?
            .map(Payment::try_from)
            .transpose()
    }
}

/// Single-parameter lookup key
enum Key<'a> {
    Id(Uuid),
    Text(&'a str),
}

impl<'a> Key<'a> {
    fn bind<'q, O>(
        self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments>
    where
        'a: 'q,
    {
        match self {
            Key::Id(id) => query.bind(id),
            Key::Text(value) => query.bind(value),
        }
    }
}

#[async_trait]
impl Store for PgStore {
    // ---- catalog ----------------------------------------------------------

    async fn list_products(&self, filter: &ProductFilter) -> ShopResult<Vec<Product>> {
        let limit = filter.limit.and_then(|l| i64::try_from(l).ok());
        let sql = format!(
            "SELECT {} FROM products \
             WHERE available AND ($1::text IS NULL OR category = $1) \
             ORDER BY created_at, name LIMIT $2",
            PRODUCT_COLUMNS
        );
        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(filter.category.as_deref())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        self.with_images(rows).await
    }

    async fn product_by_slug(&self, slug: &str) -> ShopResult<Option<Product>> {
        self.product_where("slug = $1", Key::Text(slug)).await
    }

    async fn product_by_id(&self, id: Uuid) -> ShopResult<Option<Product>> {
        self.product_where("id = $1", Key::Id(id)).await
    }

    async fn list_categories(&self) -> ShopResult<Vec<Category>> {
        let rows: Vec<CategoryRow> =
            sqlx::query_as("SELECT id, name, slug FROM categories ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn upsert_category(&self, category: Category) -> ShopResult<Category> {
        let row: CategoryRow = sqlx::query_as(
            "INSERT INTO categories (id, name, slug) VALUES ($1, $2, $3) \
             ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name \
             RETURNING id, name, slug",
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.slug)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.into())
    }

    #[instrument(skip(self, product), fields(slug = %product.slug))]
    async fn upsert_product(&self, product: Product) -> ShopResult<Product> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let sql = format!(
            "INSERT INTO products ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (slug) DO UPDATE SET \
                name = EXCLUDED.name, description = EXCLUDED.description, \
                category = EXCLUDED.category, price = EXCLUDED.price, \
                available = EXCLUDED.available, updated_at = now() \
             RETURNING {}",
            PRODUCT_COLUMNS, PRODUCT_COLUMNS
        );
        let row: ProductRow = sqlx::query_as(&sql)
            .bind(product.id)
            .bind(&product.slug)
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.category.as_deref())
            .bind(product.price)
            .bind(product.available)
            .bind(product.created_at)
            .bind(product.updated_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;

        sqlx::query("DELETE FROM product_images WHERE product_id = $1")
            .bind(row.id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        for image in &product.images {
            sqlx::query(
                "INSERT INTO product_images (id, product_id, url, alt_text, position) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(Uuid::new_v4())
            .bind(row.id)
            .bind(&image.url)
            .bind(image.alt_text.as_deref())
            .bind(image.position)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(row.into_product(product.images))
    }

    // ---- carts ------------------------------------------------------------

    async fn find_cart(&self, owner: &ShopperId) -> ShopResult<Option<Cart>> {
        let (user_id, token) = owner_columns(owner);
        let sql = format!(
            "SELECT {} FROM carts WHERE user_id = $1 OR session_token = $2",
            CART_COLUMNS
        );
        sqlx::query_as::<_, CartRow>(&sql)
            .bind(user_id)
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(Cart::try_from)
            .transpose()
    }

    async fn upsert_cart(&self, owner: &ShopperId) -> ShopResult<Cart> {
        let (user_id, token) = owner_columns(owner);
        let inserted = sqlx::query(
            "INSERT INTO carts (id, user_id, session_token) VALUES ($1, $2, $3) \
             ON CONFLICT DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if inserted.rows_affected() == 1 {
            debug!("Created cart for {:?}", owner);
        }

        self.find_cart(owner)
            .await?
            .ok_or_else(|| ShopError::Storage("cart vanished after upsert".to_string()))
    }

    async fn add_cart_item(&self, cart_id: Uuid, product_id: Uuid) -> ShopResult<CartItem> {
        let sql = format!(
            "INSERT INTO cart_items (id, cart_id, product_id, quantity) VALUES ($1, $2, $3, 1) \
             ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = cart_items.quantity + 1 \
             RETURNING {}",
            CART_ITEM_COLUMNS
        );
        let row: CartItemRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(cart_id)
            .bind(product_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db)
                    if db.is_foreign_key_violation()
                        && db.constraint() == Some("cart_items_product_id_fkey") =>
                {
                    ShopError::ProductNotFound {
                        product: product_id.to_string(),
                    }
                }
                _ => db_err(e),
            })?;
        row.try_into()
    }

    async fn remove_cart_item(
        &self,
        cart_id: Uuid,
        item_id: Uuid,
    ) -> ShopResult<Option<RemoveOutcome>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let sql = format!(
            "SELECT {} FROM cart_items WHERE id = $1 AND cart_id = $2 FOR UPDATE",
            CART_ITEM_COLUMNS
        );
        let Some(row) = sqlx::query_as::<_, CartItemRow>(&sql)
            .bind(item_id)
            .bind(cart_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let outcome = if row.quantity > 1 {
            let sql = format!(
                "UPDATE cart_items SET quantity = quantity - 1 WHERE id = $1 RETURNING {}",
                CART_ITEM_COLUMNS
            );
            let updated: CartItemRow = sqlx::query_as(&sql)
                .bind(item_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(db_err)?;
            RemoveOutcome::Decremented(updated.try_into()?)
        } else {
            sqlx::query("DELETE FROM cart_items WHERE id = $1")
                .bind(item_id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            RemoveOutcome::Removed
        };

        tx.commit().await.map_err(db_err)?;
        Ok(Some(outcome))
    }

    async fn cart_lines(&self, cart_id: Uuid) -> ShopResult<Vec<CartLine>> {
        let sql = format!(
            "SELECT {} FROM cart_items WHERE cart_id = $1 ORDER BY created_at",
            CART_ITEM_COLUMNS
        );
        let items: Vec<CartItemRow> = sqlx::query_as(&sql)
            .bind(cart_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let sql = format!(
            "SELECT {} FROM products WHERE id = ANY($1)",
            PRODUCT_COLUMNS
        );
        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        let mut products: HashMap<Uuid, Product> = self
            .with_images(rows)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        // (cart_id, product_id) is unique, so each product is taken once
        items
            .into_iter()
            .map(|row| {
                let product = products.remove(&row.product_id).ok_or_else(|| {
                    ShopError::Storage(format!(
                        "cart item {} references missing product {}",
                        row.id, row.product_id
                    ))
                })?;
                Ok(CartLine {
                    item: row.try_into()?,
                    product,
                })
            })
            .collect()
    }

    // ---- orders -----------------------------------------------------------

    #[instrument(skip(self, draft), fields(order_id = %draft.order.id))]
    async fn insert_order(&self, draft: &OrderDraft) -> ShopResult<Order> {
        let order = &draft.order;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let sql = format!(
            "INSERT INTO orders ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {}",
            ORDER_COLUMNS, ORDER_COLUMNS
        );
        let row: OrderRow = sqlx::query_as(&sql)
            .bind(order.id)
            .bind(order.user_id.as_str())
            .bind(&order.first_name)
            .bind(&order.last_name)
            .bind(&order.email)
            .bind(&order.address)
            .bind(&order.phone)
            .bind(order.total)
            .bind(order.currency.as_str())
            .bind(order.ip.as_deref())
            .bind(order.paid)
            .bind(order.payment_id)
            .bind(order.gateway_order_id.as_deref())
            .bind(order.created_at)
            .bind(order.updated_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;

        for item in &draft.items {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, product_name, price, quantity) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.price)
            .bind(quantity_column(item.quantity)?)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        row.try_into()
    }

    async fn order(&self, id: Uuid) -> ShopResult<Option<Order>> {
        self.order_where("id = $1", Key::Id(id)).await
    }

    async fn order_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> ShopResult<Option<Order>> {
        self.order_where("gateway_order_id = $1", Key::Text(gateway_order_id))
            .await
    }

    async fn order_items(&self, order_id: Uuid) -> ShopResult<Vec<OrderItem>> {
        let sql = format!(
            "SELECT {} FROM order_items WHERE order_id = $1 ORDER BY product_name",
            ORDER_ITEM_COLUMNS
        );
        let rows: Vec<OrderItemRow> = sqlx::query_as(&sql)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(OrderItem::try_from).collect()
    }

    async fn latest_unpaid_order(&self, user: &UserId) -> ShopResult<Option<Order>> {
        self.order_where(
            "user_id = $1 AND NOT paid ORDER BY created_at DESC LIMIT 1",
            Key::Text(user.as_str()),
        )
        .await
    }

    async fn orders_for_user(&self, user: &UserId) -> ShopResult<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
            ORDER_COLUMNS
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(user.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn set_gateway_order_id(
        &self,
        order_id: Uuid,
        gateway_order_id: &str,
    ) -> ShopResult<Order> {
        let sql = format!(
            "UPDATE orders SET gateway_order_id = $2, updated_at = now() WHERE id = $1 \
             RETURNING {}",
            ORDER_COLUMNS
        );
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order_id)
            .bind(gateway_order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| ShopError::OrderNotFound {
                order_id: order_id.to_string(),
            })?
            .try_into()
    }

    // ---- payments ---------------------------------------------------------

    #[instrument(skip(self, payment), fields(order_id = %payment.order_id))]
    async fn finalize_payment(&self, payment: Payment) -> ShopResult<FinalizeOutcome> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let order = Self::locked_order(&mut tx, payment.order_id)
            .await?
            .ok_or_else(|| ShopError::OrderNotFound {
                order_id: payment.order_id.to_string(),
            })?;

        if order.paid {
            let existing = Self::payment_where(&mut tx, "order_id = $1", Key::Id(order.id))
                .await?
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

        if Self::payment_where(
            &mut tx,
            "gateway_payment_id = $1",
            Key::Text(&payment.gateway_payment_id),
        )
            .await?
            .is_some()
        {
            return Err(ShopError::PaymentMismatch {
                message: format!(
                    "payment {} is already recorded for another order",
                    payment.gateway_payment_id
                ),
            });
        }

        sqlx::query(
            "INSERT INTO payments (id, user_id, order_id, gateway_payment_id, method, \
                                   amount_paid, currency, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(payment.id)
        .bind(payment.user_id.as_str())
        .bind(payment.order_id)
        .bind(&payment.gateway_payment_id)
        .bind(&payment.method)
        .bind(payment.amount_paid)
        .bind(payment.currency.as_str())
        .bind(payment.status.as_str())
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        sqlx::query("UPDATE orders SET paid = TRUE, payment_id = $2, updated_at = now() WHERE id = $1")
            .bind(order.id)
            .bind(payment.id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        let cleared = sqlx::query(
            "DELETE FROM cart_items WHERE cart_id IN (SELECT id FROM carts WHERE user_id = $1)",
        )
        .bind(order.user_id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        info!(
            "Recorded payment {} for order {} ({} cart rows cleared)",
            payment.gateway_payment_id,
            order.id,
            cleared.rows_affected()
        );
        Ok(FinalizeOutcome::Recorded(payment))
    }

    async fn payment(&self, id: Uuid) -> ShopResult<Option<Payment>> {
        let sql = format!("SELECT {} FROM payments WHERE id = $1", PAYMENT_COLUMNS);
        sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(Payment::try_from)
            .transpose()
    }

    async fn payments_for_order(&self, order_id: Uuid) -> ShopResult<Vec<Payment>> {
        let sql = format!(
            "SELECT {} FROM payments WHERE order_id = $1 ORDER BY created_at",
            PAYMENT_COLUMNS
        );
        let rows: Vec<PaymentRow> = sqlx::query_as(&sql)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(Payment::try_from).collect()
    }
}
