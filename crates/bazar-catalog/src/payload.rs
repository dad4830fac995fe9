//! Snapshot construction for `PRODUCT_UPDATED` inbox events.

use bazar_core::discounted_price;
use bazar_db::{BrandRow, CategoryRow, ProductRow, TagRow};
use bazar_store::ProductDocument;

/// Builds the projection payload from the rows resolved inside the write
/// transaction.
///
/// Tag, category, and brand values are embedded by value: the projector
/// replays this snapshot verbatim and never dereferences relational ids,
/// so later edits to those rows cannot leak into an already-committed event.
#[must_use]
pub fn build_product_document(
    product: &ProductRow,
    tags: &[TagRow],
    category: &CategoryRow,
    brand: &BrandRow,
) -> ProductDocument {
    ProductDocument {
        guid: product.guid,
        sku: product.sku.clone(),
        name_en: product.name_en.clone(),
        name_pl: product.name_pl.clone(),
        image_url: product.image_url.clone(),
        description_en: product.description_en.clone(),
        description_pl: product.description_pl.clone(),
        base_price_usd: product.base_price_usd,
        base_price_pln: product.base_price_pln,
        discounted_price_usd: discounted_price(product.base_price_usd, product.discount),
        discounted_price_pln: discounted_price(product.base_price_pln, product.discount),
        quantity: product.quantity,
        weight: product.weight,
        color_en: product.color_en.clone(),
        color_pl: product.color_pl.clone(),
        tags_en: tags.iter().map(|t| t.en.clone()).collect(),
        tags_pl: tags.iter().map(|t| t.pl.clone()).collect(),
        category_en: category.name_en.clone(),
        category_pl: category.name_pl.clone(),
        brand_name: brand.name.clone(),
        brand_logo_url: brand.logo_url.clone(),
        updated_at: product.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use uuid::Uuid;

    #[test]
    fn snapshot_embeds_relations_and_precomputes_discounts() {
        let now = Utc::now();
        let category_guid = Uuid::new_v4();
        let brand_guid = Uuid::new_v4();

        let product = ProductRow {
            guid: Uuid::new_v4(),
            sku: "2,51,594".to_string(),
            name_en: "Chinese Cabbage".to_string(),
            name_pl: "Kapusta Chińska".to_string(),
            image_url: Some("https://s3.eu-central-1.amazonaws.com/bucket/file".to_string()),
            description_en: "A vegetable.".to_string(),
            description_pl: "Warzywo.".to_string(),
            base_price_usd: Decimal::from_str("48.00").unwrap(),
            base_price_pln: Decimal::from_str("194.43").unwrap(),
            discount: Some(64),
            quantity: Decimal::from_str("5413").unwrap(),
            weight: 3,
            color_en: "Green".to_string(),
            color_pl: "Zielony".to_string(),
            category_guid,
            brand_guid,
            created_at: now,
            updated_at: now,
            removed_at: None,
        };
        let tags = vec![
            TagRow {
                guid: Uuid::new_v4(),
                en: "Vegetables".to_string(),
                pl: "Warzywa".to_string(),
                created_at: now,
                removed_at: None,
            },
            TagRow {
                guid: Uuid::new_v4(),
                en: "Green".to_string(),
                pl: "Zielone".to_string(),
                created_at: now,
                removed_at: None,
            },
        ];
        let category = CategoryRow {
            guid: category_guid,
            name_en: "Vegetables".to_string(),
            name_pl: "Warzywa".to_string(),
            created_at: now,
            updated_at: now,
            removed_at: None,
        };
        let brand = BrandRow {
            guid: brand_guid,
            name: "Farmary".to_string(),
            logo_url: Some("https://s3.eu-central-1.amazonaws.com/bucket/logo".to_string()),
            created_at: now,
            updated_at: now,
            removed_at: None,
        };

        let doc = build_product_document(&product, &tags, &category, &brand);

        assert_eq!(doc.guid, product.guid);
        assert_eq!(doc.discounted_price_usd, Decimal::from_str("17.28").unwrap());
        assert_eq!(doc.discounted_price_pln, Decimal::from_str("69.99").unwrap());
        assert_eq!(doc.tags_en, vec!["Vegetables", "Green"]);
        assert_eq!(doc.tags_pl, vec!["Warzywa", "Zielone"]);
        assert_eq!(doc.category_en, "Vegetables");
        assert_eq!(doc.brand_name, "Farmary");
        assert_eq!(doc.brand_logo_url, brand.logo_url);
        assert_eq!(doc.updated_at, product.updated_at);
    }

    #[test]
    fn no_discount_means_discounted_equals_base() {
        let now = Utc::now();
        let product = ProductRow {
            guid: Uuid::new_v4(),
            sku: "3,62,605".to_string(),
            name_en: "Green Chili".to_string(),
            name_pl: "Zielone Chili".to_string(),
            image_url: None,
            description_en: "Spicy.".to_string(),
            description_pl: "Ostre.".to_string(),
            base_price_usd: Decimal::from_str("10.00").unwrap(),
            base_price_pln: Decimal::from_str("40.50").unwrap(),
            discount: None,
            quantity: Decimal::ONE,
            weight: 1,
            color_en: "Green".to_string(),
            color_pl: "Zielony".to_string(),
            category_guid: Uuid::new_v4(),
            brand_guid: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            removed_at: None,
        };
        let category = CategoryRow {
            guid: product.category_guid,
            name_en: "Vegetables".to_string(),
            name_pl: "Warzywa".to_string(),
            created_at: now,
            updated_at: now,
            removed_at: None,
        };
        let brand = BrandRow {
            guid: product.brand_guid,
            name: "Farmary".to_string(),
            logo_url: None,
            created_at: now,
            updated_at: now,
            removed_at: None,
        };

        let doc = build_product_document(&product, &[], &category, &brand);
        assert_eq!(doc.discounted_price_usd, doc.base_price_usd);
        assert_eq!(doc.discounted_price_pln, doc.base_price_pln);
    }
}
