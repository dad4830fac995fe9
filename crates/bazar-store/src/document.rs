//! Projection payloads: the snapshot a write commits to the inbox and the
//! projector replays into the document store, verbatim.
//!
//! The snapshot embeds related tag/category/brand values at write time so the
//! projector never dereferences relational ids; later writes to those rows
//! must not leak into an already-committed event.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Document-store key for a product, under the indexed `product:` prefix.
#[must_use]
pub fn product_key(guid: Uuid) -> String {
    format!("product:{guid}")
}

/// The denormalized product document, keyed `product:{guid}`.
///
/// Discounted prices are serialized as JSON numbers because the search index
/// ranges over them; every other money field stays a fixed-point string.
/// `updated_at` orders events per product and drives the stale-write guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDocument {
    pub guid: Uuid,
    pub sku: String,
    pub name_en: String,
    pub name_pl: String,
    pub image_url: Option<String>,
    pub description_en: String,
    pub description_pl: String,
    pub base_price_usd: Decimal,
    pub base_price_pln: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discounted_price_usd: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discounted_price_pln: Decimal,
    pub quantity: Decimal,
    pub weight: i32,
    pub color_en: String,
    pub color_pl: String,
    pub tags_en: Vec<String>,
    pub tags_pl: Vec<String>,
    pub category_en: String,
    pub category_pl: String,
    pub brand_name: String,
    pub brand_logo_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Payload of a `PRODUCT_REMOVED` event.
///
/// `updated_at` carries the removal timestamp so deletes participate in the
/// same per-product ordering as updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRemoval {
    pub guid: Uuid,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_document() -> ProductDocument {
        ProductDocument {
            guid: Uuid::new_v4(),
            sku: "2,51,594".to_string(),
            name_en: "Chinese Cabbage".to_string(),
            name_pl: "Kapusta Chińska".to_string(),
            image_url: None,
            description_en: "A vegetable.".to_string(),
            description_pl: "Warzywo.".to_string(),
            base_price_usd: Decimal::from_str("48.00").unwrap(),
            base_price_pln: Decimal::from_str("194.43").unwrap(),
            discounted_price_usd: Decimal::from_str("17.28").unwrap(),
            discounted_price_pln: Decimal::from_str("69.99").unwrap(),
            quantity: Decimal::from_str("5413").unwrap(),
            weight: 3,
            color_en: "Green".to_string(),
            color_pl: "Zielony".to_string(),
            tags_en: vec!["Vegetables".to_string()],
            tags_pl: vec!["Warzywa".to_string()],
            category_en: "Vegetables".to_string(),
            category_pl: "Warzywa".to_string(),
            brand_name: "Farmary".to_string(),
            brand_logo_url: Some("https://s3.eu-central-1.amazonaws.com/bucket/file".to_string()),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn product_key_carries_the_indexed_prefix() {
        let guid = Uuid::new_v4();
        assert_eq!(product_key(guid), format!("product:{guid}"));
    }

    #[test]
    fn base_prices_serialize_as_strings() {
        let doc = sample_document();
        let json = serde_json::to_value(&doc).expect("serialize");
        assert_eq!(json["base_price_usd"], serde_json::json!("48.00"));
        assert_eq!(json["base_price_pln"], serde_json::json!("194.43"));
    }

    #[test]
    fn discounted_prices_serialize_as_numbers_for_the_index() {
        let doc = sample_document();
        let json = serde_json::to_value(&doc).expect("serialize");
        assert!(json["discounted_price_usd"].is_number());
        assert!(
            (json["discounted_price_usd"].as_f64().unwrap() - 17.28).abs() < 1e-9,
            "discounted_price_usd should round-trip"
        );
    }

    #[test]
    fn document_round_trips_through_json() {
        let doc = sample_document();
        let json = serde_json::to_string(&doc).expect("serialize");
        let back: ProductDocument = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.sku, doc.sku);
        assert_eq!(back.base_price_usd, doc.base_price_usd);
        assert_eq!(back.updated_at, doc.updated_at);
    }
}
