//! # shop-postgres
//!
//! PostgreSQL implementation of the razorcart `Store`.
//!
//! ## Tables
//!
//! - `categories`, `products`, `product_images` - catalog, seeded at startup
//! - `carts` - one per user or anonymous session token
//! - `cart_items` - unique per (cart, product), quantity >= 1
//! - `orders`, `order_items` - frozen checkout snapshots
//! - `payments` - unique per order and per processor payment
//!
//! Multi-row operations (order creation, payment finalization) run in a
//! single transaction; finalization locks the order row first.
//!
//! # Migrations
//!
//! Stored in `crates/shop-postgres/migrations/` and applied by [`migrate`].
//!
//! # Tests
//!
//! The store tests need PostgreSQL and are ignored by default. Run them with
//! `cargo test -p shop-postgres -- --ignored`, against Docker or the server
//! in `TEST_DATABASE_URL`.

mod rows;
mod store;

#[cfg(test)]
mod test_db;

pub use store::PgStore;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Create a `PostgreSQL` connection pool.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
}

/// Apply pending migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
