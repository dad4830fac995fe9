//! Write DTOs with their validation rules, and the read views the write
//! model serves to editors.
//!
//! Prices cross the boundary as fixed-point decimals and serialize back out
//! as strings.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bazar_core::discounted_price;
use bazar_db::{BrandRow, CategoryRow, ProductRow, TagRow};

use crate::CatalogError;

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn check_len(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), CatalogError> {
    let n = value.chars().count();
    if n < min || n > max {
        return Err(CatalogError::Validation {
            field,
            reason: format!("must be {min}..{max} characters, got {n}"),
        });
    }
    Ok(())
}

fn check_url(field: &'static str, value: Option<&str>) -> Result<(), CatalogError> {
    if let Some(url) = value {
        check_len(field, url, 1, 256)?;
    }
    Ok(())
}

fn check_price(field: &'static str, value: Decimal) -> Result<(), CatalogError> {
    if value.is_sign_negative() {
        return Err(CatalogError::Validation {
            field,
            reason: "must not be negative".to_string(),
        });
    }
    if value != value.round_dp(2) {
        return Err(CatalogError::Validation {
            field,
            reason: "must have at most two fractional digits".to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write DTOs
// ---------------------------------------------------------------------------

/// Attributes for creating or fully rewriting a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name_en: String,
    pub name_pl: String,
    pub image_url: Option<String>,
    pub description_en: String,
    pub description_pl: String,
    pub base_price_usd: Decimal,
    pub base_price_pln: Decimal,
    pub discount: Option<i32>,
    pub quantity: Decimal,
    pub weight: i32,
    pub color_en: String,
    pub color_pl: String,
    pub tags_guids: Vec<Uuid>,
    pub category_guid: Uuid,
    pub brand_guid: Uuid,
}

impl NewProduct {
    /// Checks every field constraint.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Validation`] naming the offending field.
    pub fn validate(&self) -> Result<(), CatalogError> {
        check_len("sku", &self.sku, 1, 16)?;
        check_len("name_en", &self.name_en, 1, 64)?;
        check_len("name_pl", &self.name_pl, 1, 64)?;
        check_url("image_url", self.image_url.as_deref())?;
        check_len("description_en", &self.description_en, 1, 4096)?;
        check_len("description_pl", &self.description_pl, 1, 4096)?;
        check_price("base_price_usd", self.base_price_usd)?;
        check_price("base_price_pln", self.base_price_pln)?;
        if let Some(d) = self.discount {
            if !(1..=99).contains(&d) {
                return Err(CatalogError::Validation {
                    field: "discount",
                    reason: format!("must be a percentage in 1..=99, got {d}"),
                });
            }
        }
        if self.quantity < Decimal::ONE {
            return Err(CatalogError::Validation {
                field: "quantity",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.quantity != self.quantity.round_dp(2) {
            return Err(CatalogError::Validation {
                field: "quantity",
                reason: "must have at most two fractional digits".to_string(),
            });
        }
        if self.weight <= 0 {
            return Err(CatalogError::Validation {
                field: "weight",
                reason: "must be a positive number of grams".to_string(),
            });
        }
        check_len("color_en", &self.color_en, 1, 32)?;
        check_len("color_pl", &self.color_pl, 1, 32)?;
        Ok(())
    }

    /// Tag guids with duplicates removed, in request order.
    #[must_use]
    pub fn unique_tag_guids(&self) -> Vec<Uuid> {
        let mut seen = std::collections::HashSet::new();
        self.tags_guids
            .iter()
            .copied()
            .filter(|g| seen.insert(*g))
            .collect()
    }
}

/// Attributes for creating or rewriting a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    pub name_en: String,
    pub name_pl: String,
}

impl NewCategory {
    /// # Errors
    ///
    /// Returns [`CatalogError::Validation`] naming the offending field.
    pub fn validate(&self) -> Result<(), CatalogError> {
        check_len("name_en", &self.name_en, 1, 64)?;
        check_len("name_pl", &self.name_pl, 1, 64)
    }
}

/// Attributes for creating or rewriting a brand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBrand {
    pub name: String,
    pub logo_url: Option<String>,
}

impl NewBrand {
    /// # Errors
    ///
    /// Returns [`CatalogError::Validation`] naming the offending field.
    pub fn validate(&self) -> Result<(), CatalogError> {
        check_len("name", &self.name, 1, 64)?;
        check_url("logo_url", self.logo_url.as_deref())
    }
}

/// Attributes for creating a tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTag {
    pub en: String,
    pub pl: String,
}

impl NewTag {
    /// # Errors
    ///
    /// Returns [`CatalogError::Validation`] naming the offending field.
    pub fn validate(&self) -> Result<(), CatalogError> {
        check_len("en", &self.en, 1, 16)?;
        check_len("pl", &self.pl, 1, 16)
    }
}

// ---------------------------------------------------------------------------
// Read views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagItem {
    pub guid: Uuid,
    pub en: String,
    pub pl: String,
}

impl From<TagRow> for TagItem {
    fn from(row: TagRow) -> Self {
        Self {
            guid: row.guid,
            en: row.en,
            pl: row.pl,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryItem {
    pub guid: Uuid,
    pub name_en: String,
    pub name_pl: String,
}

impl From<CategoryRow> for CategoryItem {
    fn from(row: CategoryRow) -> Self {
        Self {
            guid: row.guid,
            name_en: row.name_en,
            name_pl: row.name_pl,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandItem {
    pub guid: Uuid,
    pub name: String,
    pub logo_url: Option<String>,
}

impl From<BrandRow> for BrandItem {
    fn from(row: BrandRow) -> Self {
        Self {
            guid: row.guid,
            name: row.name,
            logo_url: row.logo_url,
        }
    }
}

/// Full product view with resolved relations, served to editors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetail {
    pub guid: Uuid,
    pub sku: String,
    pub name_en: String,
    pub name_pl: String,
    pub image_url: Option<String>,
    pub description_en: String,
    pub description_pl: String,
    pub base_price_usd: Decimal,
    pub base_price_pln: Decimal,
    pub discounted_price_usd: Decimal,
    pub discounted_price_pln: Decimal,
    pub discount: Option<i32>,
    pub quantity: Decimal,
    pub weight: i32,
    pub color_en: String,
    pub color_pl: String,
    pub tags: Vec<TagItem>,
    pub category: CategoryItem,
    pub brand: BrandItem,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductDetail {
    #[must_use]
    pub fn assemble(
        product: ProductRow,
        tags: Vec<TagRow>,
        category: CategoryRow,
        brand: BrandRow,
    ) -> Self {
        Self {
            guid: product.guid,
            sku: product.sku,
            name_en: product.name_en,
            name_pl: product.name_pl,
            image_url: product.image_url,
            description_en: product.description_en,
            description_pl: product.description_pl,
            discounted_price_usd: discounted_price(product.base_price_usd, product.discount),
            discounted_price_pln: discounted_price(product.base_price_pln, product.discount),
            base_price_usd: product.base_price_usd,
            base_price_pln: product.base_price_pln,
            discount: product.discount,
            quantity: product.quantity,
            weight: product.weight,
            color_en: product.color_en,
            color_pl: product.color_pl,
            tags: tags.into_iter().map(TagItem::from).collect(),
            category: CategoryItem::from(category),
            brand: BrandItem::from(brand),
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

/// Flat product view for list pages; relations stay unresolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductListItem {
    pub guid: Uuid,
    pub sku: String,
    pub name_en: String,
    pub name_pl: String,
    pub image_url: Option<String>,
    pub base_price_usd: Decimal,
    pub base_price_pln: Decimal,
    pub discounted_price_usd: Decimal,
    pub discounted_price_pln: Decimal,
    pub discount: Option<i32>,
    pub quantity: Decimal,
    pub weight: i32,
    pub color_en: String,
    pub color_pl: String,
}

impl From<ProductRow> for ProductListItem {
    fn from(row: ProductRow) -> Self {
        Self {
            guid: row.guid,
            sku: row.sku,
            name_en: row.name_en,
            name_pl: row.name_pl,
            image_url: row.image_url,
            discounted_price_usd: discounted_price(row.base_price_usd, row.discount),
            discounted_price_pln: discounted_price(row.base_price_pln, row.discount),
            base_price_usd: row.base_price_usd,
            base_price_pln: row.base_price_pln,
            discount: row.discount,
            quantity: row.quantity,
            weight: row.weight,
            color_en: row.color_en,
            color_pl: row.color_pl,
        }
    }
}

/// One page of a write-side listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub page_number: u32,
    pub page_size: u32,
    pub pages_count: u32,
    pub items: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn valid_product() -> NewProduct {
        NewProduct {
            sku: "2,51,594".to_string(),
            name_en: "Chinese Cabbage".to_string(),
            name_pl: "Kapusta Chińska".to_string(),
            image_url: None,
            description_en: "A vegetable.".to_string(),
            description_pl: "Warzywo.".to_string(),
            base_price_usd: Decimal::from_str("48.00").unwrap(),
            base_price_pln: Decimal::from_str("194.43").unwrap(),
            discount: Some(64),
            quantity: Decimal::from_str("5413").unwrap(),
            weight: 3,
            color_en: "Green".to_string(),
            color_pl: "Zielony".to_string(),
            tags_guids: vec![],
            category_guid: Uuid::new_v4(),
            brand_guid: Uuid::new_v4(),
        }
    }

    #[test]
    fn valid_product_passes_validation() {
        assert!(valid_product().validate().is_ok());
    }

    #[test]
    fn empty_sku_is_rejected() {
        let mut dto = valid_product();
        dto.sku = String::new();
        assert!(matches!(
            dto.validate(),
            Err(CatalogError::Validation { field: "sku", .. })
        ));
    }

    #[test]
    fn over_long_sku_is_rejected() {
        let mut dto = valid_product();
        dto.sku = "x".repeat(17);
        assert!(matches!(
            dto.validate(),
            Err(CatalogError::Validation { field: "sku", .. })
        ));
    }

    #[test]
    fn discount_of_one_hundred_is_rejected() {
        let mut dto = valid_product();
        dto.discount = Some(100);
        assert!(matches!(
            dto.validate(),
            Err(CatalogError::Validation {
                field: "discount",
                ..
            })
        ));
    }

    #[test]
    fn negative_price_is_rejected() {
        let mut dto = valid_product();
        dto.base_price_usd = Decimal::from_str("-1.00").unwrap();
        assert!(matches!(
            dto.validate(),
            Err(CatalogError::Validation {
                field: "base_price_usd",
                ..
            })
        ));
    }

    #[test]
    fn sub_cent_price_is_rejected() {
        let mut dto = valid_product();
        dto.base_price_pln = Decimal::from_str("10.005").unwrap();
        assert!(matches!(
            dto.validate(),
            Err(CatalogError::Validation {
                field: "base_price_pln",
                ..
            })
        ));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let mut dto = valid_product();
        dto.quantity = Decimal::ZERO;
        assert!(matches!(
            dto.validate(),
            Err(CatalogError::Validation {
                field: "quantity",
                ..
            })
        ));
    }

    #[test]
    fn zero_weight_is_rejected() {
        let mut dto = valid_product();
        dto.weight = 0;
        assert!(matches!(
            dto.validate(),
            Err(CatalogError::Validation { field: "weight", .. })
        ));
    }

    #[test]
    fn unique_tag_guids_deduplicates_preserving_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut dto = valid_product();
        dto.tags_guids = vec![a, b, a, b, a];
        assert_eq!(dto.unique_tag_guids(), vec![a, b]);
    }

    #[test]
    fn tag_labels_are_capped_at_sixteen_chars() {
        let dto = NewTag {
            en: "x".repeat(17),
            pl: "ok".to_string(),
        };
        assert!(matches!(
            dto.validate(),
            Err(CatalogError::Validation { field: "en", .. })
        ));
    }

    #[test]
    fn product_detail_precomputes_discounted_prices() {
        let now = Utc::now();
        let product = ProductRow {
            guid: Uuid::new_v4(),
            sku: "2,51,594".to_string(),
            name_en: "Chinese Cabbage".to_string(),
            name_pl: "Kapusta Chińska".to_string(),
            image_url: None,
            description_en: "A vegetable.".to_string(),
            description_pl: "Warzywo.".to_string(),
            base_price_usd: Decimal::from_str("48.00").unwrap(),
            base_price_pln: Decimal::from_str("194.43").unwrap(),
            discount: Some(64),
            quantity: Decimal::from_str("5413").unwrap(),
            weight: 3,
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

        let detail = ProductDetail::assemble(product, vec![], category, brand);
        assert_eq!(
            detail.discounted_price_usd,
            Decimal::from_str("17.28").unwrap()
        );
        assert_eq!(
            detail.discounted_price_pln,
            Decimal::from_str("69.99").unwrap()
        );
    }
}
