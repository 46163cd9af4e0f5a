use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod notifications;
pub mod repository;
pub mod resource;
pub mod services;
pub mod slug;
pub mod storage;

pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use auth::{SharedSecretVerifier, VerifierState};
pub use config::AppConfig;
pub use identity::IdentityState;
pub use notifications::NotifierState;
pub use repository::Repositories;
pub use storage::{MockStorageService, S3StorageClient, StorageState};

use services::{
    GalleryCategoryService, GalleryItemService, HistoryService, LeaderService, ResourceService,
    ShieldValueService, SiteConfigService, UserService,
};

/// ApiDoc
///
/// OpenAPI document served at `/api-docs/openapi.json`. The generic resource
/// handlers cannot carry `#[utoipa::path]`; their payloads are still listed as
/// schemas.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::site_config::get_site_config,
        handlers::site_config::get_admin_site_config,
        handlers::site_config::update_site_config,
        handlers::resources::get_category_by_slug,
        handlers::resources::get_category_items,
        handlers::uploads::get_presigned_url,
        handlers::users::get_me,
        handlers::users::update_me,
        handlers::users::create_user,
        handlers::users::verify_email_complete,
    ),
    components(
        schemas(
            models::ShieldValue, models::NewShieldValue, models::ShieldValuePatch,
            models::HistoricalMilestone, models::NewMilestone, models::MilestonePatch,
            models::Leader, models::NewLeader, models::LeaderPatch,
            models::GalleryCategory, models::NewGalleryCategory, models::GalleryCategoryPatch,
            models::GalleryItem, models::NewGalleryItem, models::GalleryItemPatch, models::MediaType,
            models::SiteConfig, models::SiteConfigPatch,
            models::ReorderItem, models::ReorderRequest, models::SuccessResponse,
            models::PresignedUrlRequest, models::PresignedUrlResponse,
            models::User, models::CreateUserRequest, models::UserPatch,
            models::Locale, models::VerifyEmailRequest,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "honor-guard-site", description = "Honor guard website API")
    )
)]
struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
            );
        }
    }
}

/// AppState
///
/// Everything a handler can reach. Built once at startup; cloning is cheap
/// (every field is an `Arc` or wraps one).
#[derive(Clone)]
pub struct AppState {
    pub shield_values: ShieldValueService,
    pub history: HistoryService,
    pub leaders: LeaderService,
    pub gallery_categories: GalleryCategoryService,
    pub gallery_items: GalleryItemService,
    pub site_config: SiteConfigService,
    pub users: UserService,
    pub storage: StorageState,
    pub verifier: VerifierState,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        identity: IdentityState,
        notifier: NotifierState,
        storage: StorageState,
        verifier: VerifierState,
        config: AppConfig,
    ) -> Self {
        Self {
            shield_values: ResourceService::new(repos.shield_values),
            history: ResourceService::new(repos.milestones),
            leaders: ResourceService::new(repos.leaders),
            gallery_categories: ResourceService::new(repos.gallery_categories),
            gallery_items: ResourceService::new(repos.gallery_items),
            site_config: SiteConfigService::new(repos.site_config),
            users: UserService::new(repos.users, identity, notifier),
            storage,
            verifier,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for UserService {
    fn from_ref(app_state: &AppState) -> UserService {
        app_state.users.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for VerifierState {
    fn from_ref(app_state: &AppState) -> VerifierState {
        app_state.verifier.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Resolves `AuthUser` before the handler runs; a failed extraction answers
/// 401/403 and the handler never executes. The resolved user is cached in the
/// request extensions for the handler's own `AuthUser` argument.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles public, token, authenticated and admin routers, then wraps the
/// whole app in request-id, tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_methods(Any).allow_origin(Any).allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let require_user = || middleware::from_fn_with_state(state.clone(), auth_middleware);

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::token_routes())
        .merge(authenticated::authenticated_routes().route_layer(require_user()))
        .nest(
            "/api/admin",
            admin::admin_routes(state.config.max_upload_bytes).route_layer(require_user()),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http().make_span_with(trace_span_logger).on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// One span per request carrying method, URI and the `x-request-id` set by
/// `SetRequestIdLayer`, so every log line of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
