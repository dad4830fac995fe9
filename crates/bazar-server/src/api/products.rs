//! Product endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use bazar_catalog::{NewProduct, Page, ProductDetail, ProductListItem};

use super::{map_catalog_error, ApiError, AppState, PageParams};

/// GET /api/products
pub(super) async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<ProductListItem>>, ApiError> {
    let page = state
        .catalog
        .get_product_list(params.page_number, params.page_size)
        .await
        .map_err(map_catalog_error)?;
    Ok(Json(page))
}

/// GET /api/products/{guid}
pub(super) async fn get_product(
    State(state): State<AppState>,
    Path(guid): Path<Uuid>,
) -> Result<Json<ProductDetail>, ApiError> {
    let detail = state
        .catalog
        .get_product_details(guid)
        .await
        .map_err(map_catalog_error)?
        .ok_or_else(|| ApiError::not_found(format!("product {guid} not found")))?;
    Ok(Json(detail))
}

/// POST /api/products
pub(super) async fn create_product(
    State(state): State<AppState>,
    Json(dto): Json<NewProduct>,
) -> Result<(StatusCode, Json<ProductDetail>), ApiError> {
    let detail = state
        .catalog
        .add_product(&dto)
        .await
        .map_err(map_catalog_error)?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// PUT /api/products/{guid}
pub(super) async fn update_product(
    State(state): State<AppState>,
    Path(guid): Path<Uuid>,
    Json(dto): Json<NewProduct>,
) -> Result<Json<ProductDetail>, ApiError> {
    let detail = state
        .catalog
        .update_product(guid, &dto)
        .await
        .map_err(map_catalog_error)?;
    Ok(Json(detail))
}

/// DELETE /api/products/{guid}
pub(super) async fn delete_product(
    State(state): State<AppState>,
    Path(guid): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .catalog
        .remove_product(guid)
        .await
        .map_err(map_catalog_error)?;
    Ok(StatusCode::NO_CONTENT)
}
