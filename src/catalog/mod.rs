//! Remote catalog records and their mapping into wishlist items
//!
//! Every product surface must hand the store the same shape for the same
//! product, so the mapping lives here rather than at each call site.

pub mod client;

pub use client::{CatalogClient, DEFAULT_CATALOG_TIMEOUT};

use crate::core::{ItemId, WishlistItem, resolve_price};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogProduct {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    /// Embedded by listing endpoints; detail endpoints serve variants separately.
    #[serde(default, rename = "Variants")]
    pub variants: Vec<ProductVariant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductVariant {
    pub id: ItemId,
    #[serde(default)]
    pub sku: String,
    /// Number or decimal string, depending on the endpoint.
    #[serde(default)]
    pub price: Value,
    #[serde(default)]
    pub stock: i64,
}

impl ProductVariant {
    pub fn price(&self) -> f64 {
        resolve_price(&self.price)
    }

    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// First variant with stock, else the first variant.
pub fn default_variant(variants: &[ProductVariant]) -> Option<&ProductVariant> {
    variants
        .iter()
        .find(|variant| variant.in_stock())
        .or_else(|| variants.first())
}

impl WishlistItem {
    /// Maps a listing record: priced by its first embedded variant.
    pub fn from_listing(product: &CatalogProduct) -> Self {
        Self {
            id: Some(product.id.clone()),
            name: product.name.clone(),
            price: product.variants.first().map(ProductVariant::price).unwrap_or(0.0),
            image: product.image.clone(),
            description: product.description.clone(),
        }
    }

    /// Maps a detail record priced by the variant the shopper has selected.
    ///
    /// Missing image and description are stored as empty strings, matching
    /// what the detail surface has always written.
    pub fn from_detail(product: &CatalogProduct, selected: Option<&ProductVariant>) -> Self {
        Self {
            id: Some(product.id.clone()),
            name: product.name.clone(),
            price: selected.map(ProductVariant::price).unwrap_or(0.0),
            image: Some(product.image.clone().unwrap_or_default()),
            description: Some(product.description.clone().unwrap_or_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn variant(id: i64, price: Value, stock: i64) -> ProductVariant {
        ProductVariant {
            id: ItemId::from(id),
            sku: format!("SKU-{}", id),
            price,
            stock,
        }
    }

    #[test]
    fn test_default_variant_prefers_stock() {
        let variants = vec![variant(1, json!(10), 0), variant(2, json!(20), 3)];
        assert_eq!(default_variant(&variants).map(|v| v.price()), Some(20.0));

        let sold_out = vec![variant(1, json!(10), 0), variant(2, json!(20), 0)];
        assert_eq!(default_variant(&sold_out).map(|v| v.price()), Some(10.0));

        assert!(default_variant(&[]).is_none());
    }

    #[test]
    fn test_listing_record_decodes_and_maps() {
        let product: CatalogProduct = serde_json::from_value(json!({
            "id": 101,
            "name": "Cá hồi",
            "description": null,
            "image": "/uploads/ca-hoi.png",
            "Variants": [
                {"id": 9, "sku": "CH-500G", "price": "50000.00", "stock": 0},
                {"id": 10, "sku": "CH-1KG", "price": "95000.00", "stock": 4}
            ]
        }))
        .unwrap();

        let item = WishlistItem::from_listing(&product);
        assert_eq!(item.id, Some(ItemId::from(101)));
        assert_eq!(item.price, 50000.0);
        assert_eq!(item.image.as_deref(), Some("/uploads/ca-hoi.png"));
        assert_eq!(item.description, None);
    }

    #[test]
    fn test_listing_without_variants_is_free() {
        let product: CatalogProduct =
            serde_json::from_value(json!({"id": "abc", "name": "Gift card"})).unwrap();
        let item = WishlistItem::from_listing(&product);
        assert_eq!(item.id, Some(ItemId::from("abc")));
        assert_eq!(item.price, 0.0);
    }

    #[test]
    fn test_detail_mapping() {
        let product: CatalogProduct =
            serde_json::from_value(json!({"id": 5, "name": "Tôm", "image": null})).unwrap();
        let selected = variant(3, json!("not a price"), 2);

        let item = WishlistItem::from_detail(&product, Some(&selected));
        assert_eq!(item.price, 0.0);
        assert_eq!(item.image.as_deref(), Some(""));
        assert_eq!(item.description.as_deref(), Some(""));

        let priced = variant(4, json!(120000), 1);
        assert_eq!(WishlistItem::from_detail(&product, Some(&priced)).price, 120000.0);
        assert_eq!(WishlistItem::from_detail(&product, None).price, 0.0);
    }
}
