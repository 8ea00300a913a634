//! # Application State
//!
//! Shared state for the Axum application: the storefront service and
//! configuration. Also loads and seeds the product catalog.

use anyhow::Context;
use shop_core::{BoxedStore, Currency, ProductCatalog, Storefront};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, used for the payment callback
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// PostgreSQL connection string; in-memory store when unset
    pub database_url: Option<String>,
    /// Catalog file; searched for when unset
    pub catalog_path: Option<PathBuf>,
    /// Currency all prices and orders are in
    pub currency: Currency,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let currency = match non_empty("SHOP_CURRENCY") {
            Some(code) => code
                .parse::<Currency>()
                .with_context(|| format!("SHOP_CURRENCY={}", code))?,
            None => Currency::default(),
        };

        Ok(Self {
            host: non_empty("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: non_empty("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            base_url: non_empty("BASE_URL")
                .unwrap_or_else(|| "http://localhost:8080".to_string())
                .trim_end_matches('/')
                .to_string(),
            environment: non_empty("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            database_url: non_empty("DATABASE_URL"),
            catalog_path: non_empty("CATALOG_PATH").map(PathBuf::from),
            currency,
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Where the payment page posts back to
    pub fn payment_callback_url(&self) -> String {
        format!("{}/api/v1/payment/success", self.base_url)
    }
}

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub storefront: Arc<Storefront>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(storefront: Storefront, config: AppConfig) -> Self {
        Self {
            storefront: Arc::new(storefront),
            config,
        }
    }
}

/// Load the product catalog from `path`, or from `config/products.toml`
/// in the working directory or one of its parents.
pub fn load_product_catalog(path: Option<&Path>) -> anyhow::Result<ProductCatalog> {
    let candidates: Vec<PathBuf> = match path {
        Some(path) => vec![path.to_path_buf()],
        None => [
            "config/products.toml",
            "../config/products.toml",
            "../../config/products.toml",
        ]
        .iter()
        .map(PathBuf::from)
        .collect(),
    };

    for candidate in &candidates {
        if let Ok(content) = std::fs::read_to_string(candidate) {
            let catalog = ProductCatalog::from_toml(&content)
                .with_context(|| format!("Failed to parse {}", candidate.display()))?;
            info!(
                "Loaded {} products from {}",
                catalog.len(),
                candidate.display()
            );
            return Ok(catalog);
        }
    }

    if let Some(path) = path {
        anyhow::bail!("catalog file {} not found", path.display());
    }

    warn!("No product catalog found, starting with an empty catalog");
    Ok(ProductCatalog::default())
}

/// Upsert every category and product of the catalog, by slug.
pub async fn seed_catalog(store: &BoxedStore, catalog: &ProductCatalog) -> anyhow::Result<()> {
    for category in catalog.categories() {
        store.upsert_category(category).await?;
    }
    for product in catalog.products() {
        store.upsert_product(product).await?;
    }
    Ok(())
}
