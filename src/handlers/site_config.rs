use axum::{
    Json,
    extract::{Multipart, State, multipart::Field},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    error::ApiError,
    models::{SiteConfig, SiteConfigPatch},
};

/// get_site_config
///
/// [Public Route] The site settings, or `null` before the first save.
#[utoipa::path(
    get,
    path = "/api/site-config",
    responses(
        (status = 200, description = "Current settings or null", body = SiteConfig),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_site_config(State(state): State<AppState>) -> Result<Json<Option<SiteConfig>>, ApiError> {
    Ok(Json(state.site_config.get_config().await?))
}

/// get_admin_site_config
///
/// [Admin Route] Same payload as the public endpoint, behind auth.
#[utoipa::path(
    get,
    path = "/api/admin/site-config",
    responses(
        (status = 200, description = "Current settings or null", body = SiteConfig),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_admin_site_config(State(state): State<AppState>) -> Result<Json<Option<SiteConfig>>, ApiError> {
    Ok(Json(state.site_config.get_config().await?))
}

/// update_site_config
///
/// [Admin Route] Saves the site settings from a multipart form.
///
/// Text parts are named after the camelCase JSON fields; blank parts are
/// ignored. Optional `logo` and `favicon` file parts must be images no larger
/// than `MAX_UPLOAD_BYTES`; they are stored in object storage and their public
/// URLs written to `logoUrl` / `faviconUrl`. The first save creates the row.
#[utoipa::path(
    put,
    path = "/api/admin/site-config",
    request_body(content_type = "multipart/form-data", description = "Settings fields plus optional logo/favicon files"),
    responses(
        (status = 200, description = "Saved settings", body = SiteConfig),
        (status = 400, description = "Invalid field or file"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_site_config(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SiteConfig>, ApiError> {
    let mut patch = SiteConfigPatch::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to parse multipart data: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "logo" | "favicon" => {
                if let Some(url) = store_image(&state, &name, field).await? {
                    if name == "logo" {
                        patch.logo_url = Some(url);
                    } else {
                        patch.favicon_url = Some(url);
                    }
                }
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Unreadable field {name}: {e}")))?;
                apply_text_field(&mut patch, &name, value);
            }
        }
    }

    patch.validate()?;
    Ok(Json(state.site_config.update_config(patch).await?))
}

/// Maps a text part onto the patch. Unknown names are ignored.
fn apply_text_field(patch: &mut SiteConfigPatch, name: &str, value: String) {
    let value = value.trim().to_string();
    if value.is_empty() {
        return;
    }

    let slot = match name {
        "siteName" => &mut patch.site_name,
        "siteNameEn" => &mut patch.site_name_en,
        "tagline" => &mut patch.tagline,
        "taglineEn" => &mut patch.tagline_en,
        "contactEmail" => &mut patch.contact_email,
        "contactPhone" => &mut patch.contact_phone,
        "address" => &mut patch.address,
        "facebookUrl" => &mut patch.facebook_url,
        "instagramUrl" => &mut patch.instagram_url,
        "youtubeUrl" => &mut patch.youtube_url,
        "logoUrl" => &mut patch.logo_url,
        "faviconUrl" => &mut patch.favicon_url,
        _ => {
            tracing::debug!(field = %name, "Ignoring unknown site config field");
            return;
        }
    };
    *slot = Some(value);
}

/// Uploads one image part. An empty part (no file chosen) yields `None`.
async fn store_image(state: &AppState, kind: &str, field: Field<'_>) -> Result<Option<String>, ApiError> {
    let content_type = field.content_type().unwrap_or("").to_string();
    let extension = field
        .file_name()
        .and_then(|f| std::path::Path::new(f).extension())
        .and_then(std::ffi::OsStr::to_str)
        .map(str::to_ascii_lowercase)
        .or_else(|| content_type.strip_prefix("image/").map(|s| s.trim_end_matches("+xml").to_string()))
        .unwrap_or_else(|| "bin".to_string());

    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read {kind}: {e}")))?;

    if bytes.is_empty() {
        return Ok(None);
    }
    if !content_type.starts_with("image/") {
        return Err(ApiError::BadRequest(format!("{kind} must be an image")));
    }
    if bytes.len() > state.config.max_upload_bytes {
        return Err(ApiError::BadRequest(format!("{kind} is too large")));
    }

    let key = format!("site/{kind}-{}.{extension}", Uuid::new_v4());
    let url = state
        .storage
        .upload_object(&key, &content_type, bytes.to_vec())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(kind, size = bytes.len(), "Site asset uploaded");
    Ok(Some(url))
}
