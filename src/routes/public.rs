use crate::{
    AppState,
    handlers::{
        self,
        resources::{self, ResourceRoute},
        site_config,
    },
    resource::{GalleryCategories, GalleryItems, Leaders, Milestones, ShieldValues},
};
use axum::{Router, routing::get};

/// Read-only list/get for one resource family.
fn read_only<R: ResourceRoute>() -> Router<AppState> {
    Router::new()
        .route("/", get(resources::list::<R>))
        .route("/{id}", get(resources::get_one::<R>))
}

/// Public Router
///
/// Everything the public site renders: settings, shield values, history,
/// leaders and the gallery. No authentication, no writes.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // Load balancer probe.
        .route("/health", get(handlers::health))
        .route("/api/site-config", get(site_config::get_site_config))
        .nest("/api/shield-values", read_only::<ShieldValues>())
        .nest("/api/history", read_only::<Milestones>())
        .nest("/api/leaders", read_only::<Leaders>())
        .nest(
            "/api/gallery/categories",
            read_only::<GalleryCategories>()
                .route("/slug/{slug}", get(resources::get_category_by_slug))
                .route("/{id}/items", get(resources::get_category_items)),
        )
        .nest("/api/gallery/items", read_only::<GalleryItems>())
}
