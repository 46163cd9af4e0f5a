//! Uniform CRUD + reorder handlers, generic over [`ResourceRoute`].
//!
//! The same six handlers serve every resource family; `routes::public` and
//! `routes::admin` instantiate them per resource.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ValidatedJson},
    models::{GalleryCategory, GalleryItem, ReorderRequest, SuccessResponse},
    resource::{GalleryCategories, GalleryItems, Leaders, Milestones, Resource, ShieldValues},
    services::ResourceService,
};

/// Resolves the service for a resource from the shared state.
pub trait ResourceRoute: Resource + Sized {
    fn service(state: &AppState) -> &ResourceService<Self>;
}

impl ResourceRoute for ShieldValues {
    fn service(state: &AppState) -> &ResourceService<Self> {
        &state.shield_values
    }
}

impl ResourceRoute for Milestones {
    fn service(state: &AppState) -> &ResourceService<Self> {
        &state.history
    }
}

impl ResourceRoute for Leaders {
    fn service(state: &AppState) -> &ResourceService<Self> {
        &state.leaders
    }
}

impl ResourceRoute for GalleryCategories {
    fn service(state: &AppState) -> &ResourceService<Self> {
        &state.gallery_categories
    }
}

impl ResourceRoute for GalleryItems {
    fn service(state: &AppState) -> &ResourceService<Self> {
        &state.gallery_items
    }
}

/// GET / → every row, in display order.
pub async fn list<R: ResourceRoute>(State(state): State<AppState>) -> Result<Json<Vec<R::Entity>>, ApiError> {
    Ok(Json(R::service(&state).get_all().await?))
}

/// GET /{id}
pub async fn get_one<R: ResourceRoute>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<R::Entity>, ApiError> {
    R::service(&state).get_by_id(id).await?.map(Json).ok_or(ApiError::NotFound)
}

/// POST / → 201 with the stored row.
pub async fn create<R: ResourceRoute>(
    State(state): State<AppState>,
    ValidatedJson(data): ValidatedJson<R::Create>,
) -> Result<impl IntoResponse, ApiError> {
    let created = R::service(&state).create(data).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /{id} → partial update.
pub async fn update<R: ResourceRoute>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(patch): ValidatedJson<R::Update>,
) -> Result<Json<R::Entity>, ApiError> {
    R::service(&state).update(id, patch).await?.map(Json).ok_or(ApiError::NotFound)
}

/// DELETE /{id}
pub async fn delete<R: ResourceRoute>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if R::service(&state).delete(id).await? {
        Ok(Json(SuccessResponse::ok()))
    } else {
        Err(ApiError::NotFound)
    }
}

/// POST /reorder
pub async fn reorder<R: ResourceRoute>(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ReorderRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    R::service(&state).reorder(&request.items).await?;
    Ok(Json(SuccessResponse::ok()))
}

// --- Gallery extras ---

/// get_category_by_slug
///
/// [Public Route] Looks a gallery category up by its URL slug.
#[utoipa::path(
    get,
    path = "/api/gallery/categories/slug/{slug}",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 200, description = "Category", body = GalleryCategory),
        (status = 404, description = "No category with that slug")
    )
)]
pub async fn get_category_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<GalleryCategory>, ApiError> {
    state
        .gallery_categories
        .get_by_slug(&slug)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// get_category_items
///
/// [Public Route] Items of one category. 404 when the category does not exist.
#[utoipa::path(
    get,
    path = "/api/gallery/categories/{id}/items",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Items in display order", body = [GalleryItem]),
        (status = 404, description = "Unknown category")
    )
)]
pub async fn get_category_items(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<GalleryItem>>, ApiError> {
    if state.gallery_categories.get_by_id(id).await?.is_none() {
        return Err(ApiError::NotFound);
    }
    Ok(Json(state.gallery_items.list_by_category(id).await?))
}
