use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use honor_guard_site::{
    AppConfig, AppState, MockStorageService, Repositories, SharedSecretVerifier,
    auth::{Claims, TokenVerifier},
    config::Env,
    create_router,
    identity::{IdentityProfile, MockIdentityProvider},
    notifications::MockNotifier,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::sync::Arc;
use tower::ServiceExt;

const ACTIVE_ID: &str = "9f2c4e1a-active";
const DISABLED_ID: &str = "4b7d0c3e-disabled";

fn profile(id: &str, email: &str, enabled: bool) -> IdentityProfile {
    IdentityProfile {
        id: id.to_string(),
        username: id.to_string(),
        email: Some(email.to_string()),
        enabled,
        ..Default::default()
    }
}

fn test_router(config: AppConfig) -> Router {
    let identity = MockIdentityProvider::new()
        .with_user(profile(ACTIVE_ID, "activo@guardiadehonor.pe", true))
        .with_user(profile(DISABLED_ID, "baja@guardiadehonor.pe", false));

    let state = AppState::new(
        Repositories::in_memory(),
        Arc::new(identity),
        Arc::new(MockNotifier::new()),
        Arc::new(MockStorageService::new()),
        Arc::new(SharedSecretVerifier::new(&config.jwt_secret)),
        config,
    );
    create_router(state)
}

fn token_for(sub: &str, secret: &str, expires_in: Duration) -> String {
    token_with_email(sub, None, secret, expires_in)
}

fn token_with_email(sub: &str, email: Option<&str>, secret: &str, expires_in: Duration) -> String {
    let now = Utc::now();
    let claims = Claims {
        sub: sub.to_string(),
        exp: (now + expires_in).timestamp() as usize,
        iat: now.timestamp() as usize,
        email: email.map(str::to_string),
        token_use: Some("id".to_string()),
        client_id: None,
        aud: None,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}

fn valid_token(sub: &str) -> String {
    token_for(sub, &AppConfig::default().jwt_secret, Duration::hours(1))
}

async fn status_of(router: &Router, request: Request<Body>) -> StatusCode {
    router.clone().oneshot(request).await.unwrap().status()
}

fn get_with_bearer(uri: &str, token: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

// --- Token verification ---

#[tokio::test]
async fn test_shared_secret_verifier_round_trip() {
    let verifier = SharedSecretVerifier::new("s3cr3t");
    let token = token_for(ACTIVE_ID, "s3cr3t", Duration::minutes(5));

    let claims = verifier.verify(&token).await.unwrap();
    assert_eq!(claims.sub, ACTIVE_ID);
    assert_eq!(claims.token_use.as_deref(), Some("id"));
}

#[tokio::test]
async fn test_shared_secret_verifier_rejects_other_secret() {
    let verifier = SharedSecretVerifier::new("s3cr3t");
    let token = token_for(ACTIVE_ID, "another-secret", Duration::minutes(5));
    assert!(verifier.verify(&token).await.is_err());
}

#[tokio::test]
async fn test_shared_secret_verifier_rejects_expired() {
    let verifier = SharedSecretVerifier::new("s3cr3t");
    let token = token_for(ACTIVE_ID, "s3cr3t", Duration::hours(-2));
    assert!(verifier.verify(&token).await.is_err());
}

// --- Protected routes ---

#[tokio::test]
async fn test_missing_token_is_401() {
    let router = test_router(AppConfig::default());

    let me = Request::get("/api/users/me").body(Body::empty()).unwrap();
    assert_eq!(status_of(&router, me).await, StatusCode::UNAUTHORIZED);

    let admin = Request::post("/api/admin/shield-values")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"title":"Honor","description":"d"}"#))
        .unwrap();
    assert_eq!(status_of(&router, admin).await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_authorization_header_is_401() {
    let router = test_router(AppConfig::default());
    let request = Request::get("/api/admin/site-config")
        .header(header::AUTHORIZATION, "Token abc")
        .body(Body::empty())
        .unwrap();
    assert_eq!(status_of(&router, request).await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_valid_token_reaches_admin_routes() {
    let router = test_router(AppConfig::default());
    let token = valid_token(ACTIVE_ID);

    assert_eq!(
        status_of(&router, get_with_bearer("/api/admin/site-config", &token)).await,
        StatusCode::OK
    );
    assert_eq!(status_of(&router, get_with_bearer("/api/users/me", &token)).await, StatusCode::OK);
}

#[tokio::test]
async fn test_expired_token_is_401() {
    let router = test_router(AppConfig::default());
    let token = token_for(ACTIVE_ID, &AppConfig::default().jwt_secret, Duration::hours(-1));

    assert_eq!(
        status_of(&router, get_with_bearer("/api/users/me", &token)).await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_unknown_subject_is_401() {
    let router = test_router(AppConfig::default());
    let token = valid_token("nobody-knows-me");

    assert_eq!(
        status_of(&router, get_with_bearer("/api/admin/leaders", &token)).await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_disabled_account_is_403() {
    let router = test_router(AppConfig::default());
    let token = valid_token(DISABLED_ID);

    assert_eq!(
        status_of(&router, get_with_bearer("/api/admin/leaders", &token)).await,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_public_routes_need_no_token() {
    let router = test_router(AppConfig::default());
    for uri in ["/api/shield-values", "/api/history", "/api/leaders", "/api/gallery/categories", "/api/site-config"] {
        let request = Request::get(uri).body(Body::empty()).unwrap();
        assert_eq!(status_of(&router, request).await, StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn test_public_routes_are_read_only() {
    let router = test_router(AppConfig::default());
    let request = Request::post("/api/shield-values")
        .header("x-user-id", ACTIVE_ID)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"title":"Honor","description":"d"}"#))
        .unwrap();
    assert_eq!(status_of(&router, request).await, StatusCode::METHOD_NOT_ALLOWED);
}

// --- Local bypass ---

#[tokio::test]
async fn test_local_user_id_header_bypasses_token() {
    let router = test_router(AppConfig::default());
    let request = Request::get("/api/users/me")
        .header("x-user-id", ACTIVE_ID)
        .body(Body::empty())
        .unwrap();
    assert_eq!(status_of(&router, request).await, StatusCode::OK);
}

#[tokio::test]
async fn test_user_id_header_ignored_in_production() {
    let config = AppConfig {
        env: Env::Production,
        ..AppConfig::default()
    };
    let router = test_router(config);
    let request = Request::get("/api/users/me")
        .header("x-user-id", ACTIVE_ID)
        .body(Body::empty())
        .unwrap();
    assert_eq!(status_of(&router, request).await, StatusCode::UNAUTHORIZED);
}

// --- Account creation ---

#[tokio::test]
async fn test_create_user_needs_token_but_no_account() {
    let router = test_router(AppConfig::default());
    let body = r#"{"email":"recien@colegio.edu"}"#;

    let anonymous = Request::post("/api/users")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();
    assert_eq!(status_of(&router, anonymous).await, StatusCode::UNAUTHORIZED);

    let with_token = Request::post("/api/users")
        .header(header::AUTHORIZATION, format!("Bearer {}", valid_token("brand-new-sub")))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();
    assert_eq!(status_of(&router, with_token).await, StatusCode::CREATED);

    // The account now exists locally, so the same token passes the auth layer.
    assert_eq!(
        status_of(&router, get_with_bearer("/api/users/me", &valid_token("brand-new-sub"))).await,
        StatusCode::OK
    );
}

fn post_user(token: &str, body: &'static str) -> Request<Body> {
    Request::post("/api/users")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_create_user_body_email_must_match_token_email() {
    let router = test_router(AppConfig::default());
    let secret = AppConfig::default().jwt_secret;
    let token = token_with_email("cadet-sub", Some("cadete@colegio.edu"), &secret, Duration::hours(1));

    let mismatched = post_user(&token, r#"{"email":"activo@guardiadehonor.pe"}"#);
    assert_eq!(status_of(&router, mismatched).await, StatusCode::FORBIDDEN);

    let matching = post_user(&token, r#"{"email":"Cadete@Colegio.edu"}"#);
    assert_eq!(status_of(&router, matching).await, StatusCode::CREATED);
}

#[tokio::test]
async fn test_create_user_with_taken_email_is_409() {
    let router = test_router(AppConfig::default());

    // Materializes the active account locally.
    assert_eq!(
        status_of(&router, get_with_bearer("/api/users/me", &valid_token(ACTIVE_ID))).await,
        StatusCode::OK
    );

    let request = post_user(&valid_token("other-sub"), r#"{"email":"activo@guardiadehonor.pe"}"#);
    assert_eq!(status_of(&router, request).await, StatusCode::CONFLICT);
}
