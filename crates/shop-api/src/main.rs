//! # razorcart
//!
//! Storefront API with Razorpay checkout.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export RAZORPAY_KEY_ID=rzp_test_...
//! export RAZORPAY_KEY_SECRET=...
//! export RAZORPAY_WEBHOOK_SECRET=...
//! export DATABASE_URL=postgres://localhost/razorcart   # optional
//!
//! # Run the server
//! razorcart
//! ```

use shop_api::{
    routes,
    state::{load_product_catalog, seed_catalog, AppConfig, AppState},
};
use shop_core::{BoxedStore, MemoryStore, Storefront};
use shop_postgres::PgStore;
use shop_razorpay::{RazorpayGateway, REQUIRED_WEBHOOK_EVENTS};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with((!json).then(fmt::layer))
        .with(json.then(|| fmt::layer().json()))
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Print banner
    print_banner();

    let config = AppConfig::from_env()?;
    let addr = config.socket_addr()?;
    let is_prod = config.is_production();

    // Persistence
    let store: BoxedStore = match &config.database_url {
        Some(url) => {
            let pool = shop_postgres::create_pool(url).await?;
            shop_postgres::migrate(&pool).await?;
            info!("Using PostgreSQL store");
            Arc::new(PgStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory store (data is lost on restart)");
            Arc::new(MemoryStore::new())
        }
    };

    let catalog = load_product_catalog(config.catalog_path.as_deref())?;
    seed_catalog(&store, &catalog).await?;

    // Payment processor
    let gateway = RazorpayGateway::from_env()?;
    if !gateway.config().is_test_mode() && !is_prod {
        warn!("Live Razorpay keys in a {} environment", config.environment);
    }
    info!(
        "Razorpay webhook events to enable: {}",
        REQUIRED_WEBHOOK_EVENTS.join(", ")
    );

    info!("Environment: {}", config.environment);
    info!("Currency: {}", config.currency);
    info!("Products seeded: {}", catalog.len());

    let storefront = Storefront::new(store, Arc::new(gateway), config.currency);
    let webhook_path = storefront.gateway().webhook_path();
    let state = AppState::new(storefront, config);

    // Create router
    let app = routes::create_router(state);

    // Start server
    info!("razorcart starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Catalog: GET http://{}/api/v1/products", addr);
        info!("Webhook: POST http://{}{}", addr, webhook_path);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  razorcart
  ━━━━━━━━━━━━━━━━━━━━━━━
  Storefront + Razorpay checkout
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
