use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header, jwk::JwkSet};
use serde::{Deserialize, Serialize};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::{
    config::{AppConfig, CognitoConfig, Env},
    error::ApiError,
    models::User,
    services::{UserService, short_id},
};

/// Claims
///
/// Token payload. `sub` is the identity-provider subject and doubles as the
/// local user id. Cognito ID tokens carry the app client in `aud`, access
/// tokens in `client_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub iat: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_use: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

impl Claims {
    /// Claims for the local `x-user-id` bypass.
    fn local(sub: &str) -> Self {
        Self {
            sub: sub.to_string(),
            exp: 0,
            iat: 0,
            email: None,
            token_use: None,
            client_id: None,
            aud: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("no signing key for kid {0:?}")]
    UnknownKey(Option<String>),

    #[error("failed to fetch JWKS: {0}")]
    Jwks(#[from] reqwest::Error),

    #[error("token issued for another client")]
    WrongClient,
}

/// TokenVerifier
///
/// Checks a bearer token's signature and expiry and returns its claims.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError>;
}

pub type VerifierState = Arc<dyn TokenVerifier>;

/// SharedSecretVerifier
///
/// HS256 tokens signed with `JWT_SECRET`. Used locally and in tests.
#[derive(Clone)]
pub struct SharedSecretVerifier {
    key: DecodingKey,
}

impl SharedSecretVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

#[async_trait]
impl TokenVerifier for SharedSecretVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;
        Ok(decode::<Claims>(token, &self.key, &validation)?.claims)
    }
}

/// Minimum gap between two JWKS downloads.
const JWKS_REFETCH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Default)]
struct KeyCache {
    keys: Option<JwkSet>,
    last_fetch: Option<Instant>,
}

/// CognitoVerifier
///
/// RS256 tokens issued by a Cognito user pool. The pool's JWKS is fetched on
/// first use and refetched when a token names an unknown `kid` (key
/// rotation), at most once per refetch interval. Inside the interval an
/// unknown `kid` is rejected without a download.
pub struct CognitoVerifier {
    http: reqwest::Client,
    jwks_url: String,
    issuer: String,
    client_id: String,
    refetch_interval: Duration,
    cache: RwLock<KeyCache>,
}

impl CognitoVerifier {
    pub fn new(config: &CognitoConfig) -> Self {
        Self::with_jwks_url(config.jwks_url(), config.issuer(), config.client_id.clone())
    }

    pub fn with_jwks_url(jwks_url: impl Into<String>, issuer: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            jwks_url: jwks_url.into(),
            issuer: issuer.into(),
            client_id: client_id.into(),
            refetch_interval: JWKS_REFETCH_INTERVAL,
            cache: RwLock::new(KeyCache::default()),
        }
    }

    pub fn refetch_interval(mut self, interval: Duration) -> Self {
        self.refetch_interval = interval;
        self
    }

    async fn fetch_keys(&self) -> Result<JwkSet, AuthError> {
        let keys = self
            .http
            .get(&self.jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json::<JwkSet>()
            .await?;
        tracing::debug!(count = keys.keys.len(), "Fetched Cognito JWKS");
        Ok(keys)
    }

    async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, AuthError> {
        let kid = kid.ok_or(AuthError::UnknownKey(None))?;

        {
            let cache = self.cache.read().await;
            if let Some(jwk) = cache.keys.as_ref().and_then(|keys| keys.find(kid)) {
                return Ok(DecodingKey::from_jwk(jwk)?);
            }
        }

        // Concurrent misses queue here; only the first one downloads.
        let mut cache = self.cache.write().await;
        if let Some(jwk) = cache.keys.as_ref().and_then(|keys| keys.find(kid)) {
            return Ok(DecodingKey::from_jwk(jwk)?);
        }
        if cache.last_fetch.is_some_and(|at| at.elapsed() < self.refetch_interval) {
            tracing::debug!(kid, "Unknown kid, JWKS refetch not due yet");
            return Err(AuthError::UnknownKey(Some(kid.to_string())));
        }

        cache.last_fetch = Some(Instant::now());
        let fresh = self.fetch_keys().await?;
        let key = fresh.find(kid).map(DecodingKey::from_jwk).transpose()?;
        cache.keys = Some(fresh);
        key.ok_or_else(|| AuthError::UnknownKey(Some(kid.to_string())))
    }
}

#[async_trait]
impl TokenVerifier for CognitoVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token)?;
        let key = self.decoding_key(header.kid.as_deref()).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        // Access tokens have no `aud`; the client is checked by hand below.
        validation.validate_aud = false;

        let claims = decode::<Claims>(token, &key, &validation)?.claims;

        if !self.client_id.is_empty() {
            let issued_to = claims.aud.as_deref().or(claims.client_id.as_deref());
            if issued_to != Some(self.client_id.as_str()) {
                return Err(AuthError::WrongClient);
            }
        }
        Ok(claims)
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// In local mode a plain `x-user-id` header stands in for a token.
fn local_bypass(parts: &Parts, config: &AppConfig) -> Option<String> {
    if config.env != Env::Local {
        return None;
    }
    parts
        .headers
        .get("x-user-id")?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// AuthClaims
///
/// A verified token with no local user lookup. Used by the endpoint that
/// creates the caller's local row.
#[derive(Debug, Clone)]
pub struct AuthClaims(pub Claims);

impl<S> FromRequestParts<S> for AuthClaims
where
    S: Send + Sync,
    VerifierState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        if let Some(id) = local_bypass(parts, &config) {
            return Ok(AuthClaims(Claims::local(&id)));
        }

        let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?;
        let verifier = VerifierState::from_ref(state);
        let claims = verifier.verify(token).await.map_err(|e| {
            tracing::debug!("Token rejected: {}", e);
            ApiError::Unauthorized
        })?;
        Ok(AuthClaims(claims))
    }
}

/// AuthUser
///
/// The caller's local user row, synced from the identity provider on first
/// sight. Every authenticated, active user may use the admin API.
///
/// Rejects with 401 when the token is missing or invalid or the account is
/// unknown, 403 when the account is disabled, and 409 when the subject's
/// email is already registered to another account.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub user: User,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    VerifierState: FromRef<S>,
    AppConfig: FromRef<S>,
    UserService: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already resolved by `auth_middleware` for this request.
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let AuthClaims(claims) = AuthClaims::from_request_parts(parts, state).await?;
        let users = UserService::from_ref(state);

        let user = users.get_user(&claims.sub).await?.ok_or_else(|| {
            tracing::debug!(user = %short_id(&claims.sub), "No account for token subject");
            ApiError::Unauthorized
        })?;

        if user.id != claims.sub {
            tracing::warn!(user = %short_id(&claims.sub), "Resolved account belongs to another subject");
            return Err(ApiError::Conflict);
        }

        if !user.is_active {
            tracing::warn!(user = %short_id(&user.id), "Inactive user rejected");
            return Err(ApiError::Forbidden);
        }

        let auth_user = AuthUser { id: user.id.clone(), user };
        parts.extensions.insert(auth_user.clone());
        Ok(auth_user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, routing::get};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::TcpListener;

    /// Serves an empty key set and counts downloads.
    async fn spawn_jwks() -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/jwks.json",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(serde_json::json!({ "keys": [] }))
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (format!("http://{addr}/jwks.json"), hits)
    }

    fn token_with_kid(kid: &str) -> String {
        let header = Header {
            kid: Some(kid.to_string()),
            ..Header::default()
        };
        let claims = Claims::local("someone");
        encode(&header, &claims, &EncodingKey::from_secret(b"irrelevant")).unwrap()
    }

    #[tokio::test]
    async fn unknown_kids_do_not_refetch_inside_interval() {
        let (url, hits) = spawn_jwks().await;
        let verifier = CognitoVerifier::with_jwks_url(url, "issuer", "");

        for kid in ["kid-a", "kid-b", "kid-c"] {
            let err = verifier.verify(&token_with_kid(kid)).await.unwrap_err();
            assert!(matches!(err, AuthError::UnknownKey(Some(_))));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_kid_refetches_once_interval_elapsed() {
        let (url, hits) = spawn_jwks().await;
        let verifier = CognitoVerifier::with_jwks_url(url, "issuer", "").refetch_interval(Duration::ZERO);

        assert!(verifier.verify(&token_with_kid("kid-a")).await.is_err());
        assert!(verifier.verify(&token_with_kid("kid-b")).await.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn token_without_kid_never_fetches() {
        let (url, hits) = spawn_jwks().await;
        let verifier = CognitoVerifier::with_jwks_url(url, "issuer", "");
        let token = encode(&Header::default(), &Claims::local("x"), &EncodingKey::from_secret(b"k")).unwrap();

        assert!(matches!(verifier.verify(&token).await, Err(AuthError::UnknownKey(None))));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
