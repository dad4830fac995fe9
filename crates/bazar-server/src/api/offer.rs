//! The shopper read path: paginated, filterable search over the projected
//! product documents.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bazar_store::{OfferFilter, ProductDocument};

use super::{default_page_size, map_store_error, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct OfferParams {
    #[serde(default)]
    page_number: u32,
    #[serde(default = "default_page_size")]
    page_size: u32,
    text: Option<String>,
    category: Option<String>,
    brand: Option<String>,
    tag: Option<String>,
    price_min: Option<Decimal>,
    price_max: Option<Decimal>,
}

/// Offer item as served over HTTP: every price is a fixed-point string.
#[derive(Debug, Serialize)]
pub(super) struct OfferItem {
    guid: Uuid,
    sku: String,
    name_en: String,
    name_pl: String,
    image_url: Option<String>,
    description_en: String,
    description_pl: String,
    base_price_usd: Decimal,
    base_price_pln: Decimal,
    discounted_price_usd: Decimal,
    discounted_price_pln: Decimal,
    quantity: Decimal,
    weight: i32,
    color_en: String,
    color_pl: String,
    tags_en: Vec<String>,
    tags_pl: Vec<String>,
    category_en: String,
    category_pl: String,
    brand_name: String,
    brand_logo_url: Option<String>,
    updated_at: DateTime<Utc>,
}

impl From<ProductDocument> for OfferItem {
    fn from(doc: ProductDocument) -> Self {
        Self {
            guid: doc.guid,
            sku: doc.sku,
            name_en: doc.name_en,
            name_pl: doc.name_pl,
            image_url: doc.image_url,
            description_en: doc.description_en,
            description_pl: doc.description_pl,
            base_price_usd: doc.base_price_usd,
            base_price_pln: doc.base_price_pln,
            // The index stores these as floats; renormalize to two places.
            discounted_price_usd: doc.discounted_price_usd.round_dp(2),
            discounted_price_pln: doc.discounted_price_pln.round_dp(2),
            quantity: doc.quantity,
            weight: doc.weight,
            color_en: doc.color_en,
            color_pl: doc.color_pl,
            tags_en: doc.tags_en,
            tags_pl: doc.tags_pl,
            category_en: doc.category_en,
            category_pl: doc.category_pl,
            brand_name: doc.brand_name,
            brand_logo_url: doc.brand_logo_url,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct OfferPageBody {
    page_number: u32,
    page_size: u32,
    pages_count: u32,
    total: u64,
    items: Vec<OfferItem>,
}

/// GET /api/offer
pub(super) async fn search_offer(
    State(state): State<AppState>,
    Query(params): Query<OfferParams>,
) -> Result<Json<OfferPageBody>, ApiError> {
    let filter = OfferFilter {
        text: params.text,
        category: params.category,
        brand: params.brand,
        tag: params.tag,
        price_min: params.price_min,
        price_max: params.price_max,
    };

    let page = state
        .search
        .search(params.page_number, params.page_size, &filter)
        .await
        .map_err(|e| map_store_error(&e))?;

    Ok(Json(OfferPageBody {
        page_number: page.page_number,
        page_size: page.page_size,
        pages_count: page.pages_count,
        total: page.total,
        items: page.items.into_iter().map(OfferItem::from).collect(),
    }))
}
