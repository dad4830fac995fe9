//! Brand endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use bazar_catalog::{BrandItem, NewBrand, Page};

use super::{map_catalog_error, ApiError, AppState, PageParams};

/// GET /api/brands
pub(super) async fn list_brands(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<BrandItem>>, ApiError> {
    let page = state
        .catalog
        .get_brands_list(params.page_number, params.page_size)
        .await
        .map_err(map_catalog_error)?;
    Ok(Json(page))
}

/// POST /api/brands
pub(super) async fn create_brand(
    State(state): State<AppState>,
    Json(dto): Json<NewBrand>,
) -> Result<(StatusCode, Json<BrandItem>), ApiError> {
    let item = state
        .catalog
        .add_brand(&dto)
        .await
        .map_err(map_catalog_error)?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /api/brands/{guid}
pub(super) async fn update_brand(
    State(state): State<AppState>,
    Path(guid): Path<Uuid>,
    Json(dto): Json<NewBrand>,
) -> Result<Json<BrandItem>, ApiError> {
    let item = state
        .catalog
        .update_brand(guid, &dto)
        .await
        .map_err(map_catalog_error)?;
    Ok(Json(item))
}

/// DELETE /api/brands/{guid}
pub(super) async fn delete_brand(
    State(state): State<AppState>,
    Path(guid): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .catalog
        .remove_brand(guid)
        .await
        .map_err(map_catalog_error)?;
    Ok(StatusCode::NO_CONTENT)
}
