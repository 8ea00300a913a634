//! # Catalog Types
//!
//! Products, categories and images for razorcart.
//! The catalog is seeded from `config/products.toml` and is read-only for
//! the cart and checkout flow.

use crate::error::{ShopError, ShopResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A product category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    /// Unique, URL-safe
    pub slug: String,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: Uuid::new_v4(),
            slug: slugify(&name),
            name,
        }
    }
}

/// Product image reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub position: i32,
}

/// A product in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,

    /// Unique, URL-safe identifier used by the detail page
    pub slug: String,

    /// Display name
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Category slug
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Unit price in major currency units
    pub price: Decimal,

    /// Whether this product is shown and can be bought
    pub available: bool,

    #[serde(default)]
    pub images: Vec<ProductImage>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Create an available product with a slug derived from its name
    pub fn new(name: impl Into<String>, price: Decimal) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            slug: slugify(&name),
            name,
            description: String::new(),
            category: None,
            price,
            available: true,
            images: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder: set description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Builder: set category slug
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Builder: add an image
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        let position = self.images.len() as i32;
        self.images.push(ProductImage {
            url: url.into(),
            alt_text: None,
            position,
        });
        self
    }

    /// Builder: mark unavailable
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }
}

/// Filter for product listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    /// Only products in this category
    #[serde(default)]
    pub category: Option<String>,
    /// Maximum number of products
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ProductFilter {
    /// Does this (available) product pass the filter?
    pub fn matches(&self, product: &Product) -> bool {
        product.available
            && self
                .category
                .as_deref()
                .map_or(true, |c| product.category.as_deref() == Some(c))
    }
}

/// Derive a URL-safe slug: lowercase ASCII alphanumerics, everything else
/// collapsed into single dashes.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Catalog entry as written in `products.toml`
#[derive(Debug, Clone, Deserialize)]
pub struct ProductSeed {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub slug: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    pub price: Decimal,
    #[serde(default = "default_true")]
    pub available: bool,
    #[serde(default)]
    pub images: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Category entry as written in `products.toml`
#[derive(Debug, Clone, Deserialize)]
pub struct CategorySeed {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

/// Product catalog (loaded from config)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductCatalog {
    #[serde(default)]
    pub categories: Vec<CategorySeed>,
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

impl ProductCatalog {
    /// Load catalog from TOML string
    ///
    /// Every product must have a positive price; an order for a free or
    /// negatively priced cart cannot be paid.
    pub fn from_toml(toml_str: &str) -> ShopResult<Self> {
        let catalog: Self =
            toml::from_str(toml_str).map_err(|e| ShopError::Configuration(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> ShopResult<()> {
        for seed in &self.products {
            if seed.price <= Decimal::ZERO {
                return Err(ShopError::Configuration(format!(
                    "product '{}' has non-positive price {}",
                    seed.name, seed.price
                )));
            }
        }
        Ok(())
    }

    /// Materialize the category rows
    pub fn categories(&self) -> Vec<Category> {
        self.categories
            .iter()
            .map(|seed| Category {
                id: Uuid::new_v4(),
                slug: seed.slug.clone().unwrap_or_else(|| slugify(&seed.name)),
                name: seed.name.clone(),
            })
            .collect()
    }

    /// Materialize the product rows
    pub fn products(&self) -> Vec<Product> {
        let now = Utc::now();
        self.products
            .iter()
            .map(|seed| Product {
                id: seed.id.unwrap_or_else(Uuid::new_v4),
                slug: seed.slug.clone().unwrap_or_else(|| slugify(&seed.name)),
                name: seed.name.clone(),
                description: seed.description.clone(),
                category: seed.category.as_deref().map(slugify),
                price: seed.price,
                available: seed.available,
                images: seed
                    .images
                    .iter()
                    .enumerate()
                    .map(|(i, url)| ProductImage {
                        url: url.clone(),
                        alt_text: Some(seed.name.clone()),
                        position: i as i32,
                    })
                    .collect(),
                created_at: now,
                updated_at: now,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Masala Chai  (250g)"), "masala-chai-250g");
        assert_eq!(slugify("  Hello, World!  "), "hello-world");
        assert_eq!(slugify("already-a-slug"), "already-a-slug");
    }

    #[test]
    fn test_catalog_from_toml() {
        let catalog = ProductCatalog::from_toml(
            r#"
            [[categories]]
            name = "Tea & Coffee"

            [[products]]
            name = "Masala Chai"
            category = "Tea & Coffee"
            price = "249.00"
            images = ["/static/chai.jpg"]

            [[products]]
            slug = "old-stock"
            name = "Old Stock"
            price = "10"
            available = false
            "#,
        )
        .unwrap();

        let categories = catalog.categories();
        assert_eq!(categories[0].slug, "tea-coffee");

        let products = catalog.products();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].slug, "masala-chai");
        assert_eq!(products[0].category.as_deref(), Some("tea-coffee"));
        assert_eq!(products[0].price, Decimal::new(249, 0));
        assert_eq!(products[0].images[0].url, "/static/chai.jpg");
        assert!(!products[1].available);
    }

    #[test]
    fn test_catalog_rejects_non_positive_prices() {
        for price in ["0", "0.00", "-5"] {
            let toml = format!(
                "[[products]]\nname = \"Free Sample\"\nprice = \"{}\"\n",
                price
            );
            match ProductCatalog::from_toml(&toml) {
                Err(ShopError::Configuration(message)) => {
                    assert!(message.contains("Free Sample"), "{}", message)
                }
                other => panic!("price {} accepted: {:?}", price, other),
            }
        }

        let malformed = ProductCatalog::from_toml("[[products]]\nname = \"No Price\"\n");
        assert!(matches!(malformed, Err(ShopError::Configuration(_))));
    }

    #[test]
    fn test_product_filter() {
        let chai = Product::new("Chai", Decimal::new(10, 0)).with_category("tea");
        let mug = Product::new("Mug", Decimal::new(5, 0));
        let retired = Product::new("Retired", Decimal::new(5, 0)).unavailable();

        let all = ProductFilter::default();
        assert!(all.matches(&chai));
        assert!(all.matches(&mug));
        assert!(!all.matches(&retired));

        let tea = ProductFilter {
            category: Some("tea".into()),
            limit: None,
        };
        assert!(tea.matches(&chai));
        assert!(!tea.matches(&mug));
    }
}
