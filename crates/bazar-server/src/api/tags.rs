//! Tag endpoints. Tags are created and removed, never updated.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use bazar_catalog::{NewTag, Page, TagItem};

use super::{map_catalog_error, ApiError, AppState, PageParams};

/// GET /api/tags
pub(super) async fn list_tags(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<TagItem>>, ApiError> {
    let page = state
        .catalog
        .get_tags_list(params.page_number, params.page_size)
        .await
        .map_err(map_catalog_error)?;
    Ok(Json(page))
}

/// POST /api/tags
pub(super) async fn create_tag(
    State(state): State<AppState>,
    Json(dto): Json<NewTag>,
) -> Result<(StatusCode, Json<TagItem>), ApiError> {
    let item = state
        .catalog
        .add_tag(&dto)
        .await
        .map_err(map_catalog_error)?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// DELETE /api/tags/{guid}
pub(super) async fn delete_tag(
    State(state): State<AppState>,
    Path(guid): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .catalog
        .remove_tag(guid)
        .await
        .map_err(map_catalog_error)?;
    Ok(StatusCode::NO_CONTENT)
}
