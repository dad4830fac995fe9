//! Category endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use bazar_catalog::{CategoryItem, NewCategory, Page};

use super::{map_catalog_error, ApiError, AppState, PageParams};

/// GET /api/categories
pub(super) async fn list_categories(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<CategoryItem>>, ApiError> {
    let page = state
        .catalog
        .get_category_list(params.page_number, params.page_size)
        .await
        .map_err(map_catalog_error)?;
    Ok(Json(page))
}

/// POST /api/categories
pub(super) async fn create_category(
    State(state): State<AppState>,
    Json(dto): Json<NewCategory>,
) -> Result<(StatusCode, Json<CategoryItem>), ApiError> {
    let item = state
        .catalog
        .create_category(&dto)
        .await
        .map_err(map_catalog_error)?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /api/categories/{guid}
pub(super) async fn update_category(
    State(state): State<AppState>,
    Path(guid): Path<Uuid>,
    Json(dto): Json<NewCategory>,
) -> Result<Json<CategoryItem>, ApiError> {
    let item = state
        .catalog
        .update_category(guid, &dto)
        .await
        .map_err(map_catalog_error)?;
    Ok(Json(item))
}

/// DELETE /api/categories/{guid}
pub(super) async fn delete_category(
    State(state): State<AppState>,
    Path(guid): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .catalog
        .remove_category(guid)
        .await
        .map_err(map_catalog_error)?;
    Ok(StatusCode::NO_CONTENT)
}
