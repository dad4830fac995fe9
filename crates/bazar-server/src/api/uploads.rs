//! Multipart image uploads for product photos and brand logos.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::{ApiError, AppState};

const ACCEPTED_IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// POST /api/product-images
pub(super) async fn upload_product_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    upload_image(&state, "product-images", multipart).await
}

/// POST /api/brand-logos
pub(super) async fn upload_brand_logo(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    upload_image(&state, "brand-logos", multipart).await
}

async fn upload_image(
    state: &AppState,
    bucket: &str,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("malformed multipart body"))?
    {
        let Some(filename) = field.file_name().map(ToString::to_string) else {
            continue;
        };

        let extension = file_extension(&filename)
            .ok_or_else(|| ApiError::bad_request("unsupported file type"))?;
        if !ACCEPTED_IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ApiError::bad_request(format!(
                "unsupported file type '{extension}'; accepted: jpg, jpeg, png"
            )));
        }

        let data = field
            .bytes()
            .await
            .map_err(|_| ApiError::bad_request("could not read uploaded file"))?;
        if data.len() > state.max_upload_file_size_bytes {
            return Err(ApiError::bad_request(format!(
                "file too large; limit is {} bytes",
                state.max_upload_file_size_bytes
            )));
        }

        let file_key = format!("{}.{extension}", Uuid::new_v4());
        let url = state
            .storage
            .upload(bucket, &file_key, data.to_vec(), content_type(&extension))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, bucket, "object storage upload failed");
                ApiError::service_unavailable("object storage unavailable")
            })?;

        return Ok((
            StatusCode::CREATED,
            Json(serde_json::json!({ "uploaded_file_path": url })),
        ));
    }

    Err(ApiError::bad_request("no file field in request"))
}

fn file_extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

fn content_type(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(file_extension("Photo.JPG"), Some("jpg".to_string()));
        assert_eq!(file_extension("logo.png"), Some("png".to_string()));
        assert_eq!(file_extension("noextension"), None);
    }

    #[test]
    fn content_types_cover_accepted_extensions() {
        assert_eq!(content_type("png"), "image/png");
        assert_eq!(content_type("jpg"), "image/jpeg");
        assert_eq!(content_type("jpeg"), "image/jpeg");
    }
}
