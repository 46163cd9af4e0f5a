use axum::{Json, extract::State};
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ValidatedJson},
    models::{PresignedUrlRequest, PresignedUrlResponse},
};

/// get_presigned_url
///
/// [Admin Route] Issues a short-lived signed PUT URL so the browser can upload
/// gallery media straight to object storage. The object key is generated
/// here (`gallery/<uuid>.<ext>`); only the extension comes from the client.
#[utoipa::path(
    post,
    path = "/api/admin/uploads/presigned",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "Signed upload URL", body = PresignedUrlResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_presigned_url(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<PresignedUrlRequest>,
) -> Result<Json<PresignedUrlResponse>, ApiError> {
    let extension = std::path::Path::new(&payload.filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "bin".to_string());
    let object_key = format!("gallery/{}.{}", Uuid::new_v4(), extension);

    let upload_url = state
        .storage
        .get_presigned_upload_url(&object_key, &payload.file_type)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(PresignedUrlResponse {
        upload_url,
        public_url: state.storage.public_url(&object_key),
        resource_key: object_key,
    }))
}
