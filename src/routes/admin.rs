use crate::{
    AppState,
    handlers::{
        resources::{self, ResourceRoute},
        site_config, uploads,
    },
    resource::{GalleryCategories, GalleryItems, Leaders, Milestones, ShieldValues},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Full CRUD + reorder for one resource family.
fn manage<R: ResourceRoute>() -> Router<AppState> {
    Router::new()
        .route("/", get(resources::list::<R>).post(resources::create::<R>))
        // Static segment, matched before `/{id}`.
        .route("/reorder", post(resources::reorder::<R>))
        .route(
            "/{id}",
            get(resources::get_one::<R>)
                .put(resources::update::<R>)
                .delete(resources::delete::<R>),
        )
}

/// Admin Router
///
/// Content management, mounted under `/api/admin`. Wrapped in
/// `auth_middleware` by `create_router`.
///
/// The site config form carries up to two images, so its body limit is raised
/// above axum's default to fit both at `max_upload_bytes`.
pub fn admin_routes(max_upload_bytes: usize) -> Router<AppState> {
    let form_limit = max_upload_bytes.saturating_mul(2).saturating_add(64 * 1024);

    Router::new()
        .route(
            "/site-config",
            get(site_config::get_admin_site_config)
                .put(site_config::update_site_config)
                .layer(DefaultBodyLimit::max(form_limit)),
        )
        .route("/uploads/presigned", post(uploads::get_presigned_url))
        .nest("/shield-values", manage::<ShieldValues>())
        .nest("/history", manage::<Milestones>())
        .nest("/leaders", manage::<Leaders>())
        .nest("/gallery-categories", manage::<GalleryCategories>())
        .nest("/gallery-items", manage::<GalleryItems>())
}
