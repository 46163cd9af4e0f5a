use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider as cognito;
use cognito::error::DisplayErrorContext;
use cognito::types::AttributeType;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::models::NewUser;

pub const ATTR_EMAIL: &str = "email";
pub const ATTR_GIVEN_NAME: &str = "given_name";
pub const ATTR_FAMILY_NAME: &str = "family_name";
pub const ATTR_COMPANY: &str = "custom:company_name";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider request failed: {0}")]
    Request(String),

    #[error("invalid attribute {0}")]
    InvalidAttribute(String),

    #[error("identity provider unavailable (simulated)")]
    Simulated,
}

/// IdentityProfile
///
/// The subset of a provider account this service cares about, already
/// flattened from the provider's attribute list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IdentityProfile {
    /// Provider subject. Becomes the local user id.
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub company: Option<String>,
    pub enabled: bool,
}

impl IdentityProfile {
    /// Builds the local row for this account. Accounts without an email
    /// cannot be mirrored (the local email column is required).
    pub fn to_new_user(&self) -> Option<NewUser> {
        let email = self.email.clone().filter(|e| !e.trim().is_empty())?;
        let user_name = if self.username.trim().is_empty() {
            email.clone()
        } else {
            self.username.clone()
        };

        Some(NewUser {
            id: self.id.clone(),
            email,
            user_name,
            first_name: self.given_name.clone(),
            last_name: self.family_name.clone(),
            company: self.company.clone(),
            is_active: self.enabled,
        })
    }
}

/// A single attribute write, e.g. `given_name = "Ana"`.
#[derive(Debug, Clone, PartialEq)]
pub struct UserAttribute {
    pub name: &'static str,
    pub value: String,
}

impl UserAttribute {
    pub fn new(name: &'static str, value: impl Into<String>) -> Self {
        Self { name, value: value.into() }
    }
}

/// IdentityProvider
///
/// Read and attribute-write access to the external user directory.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` when the directory has no such user.
    async fn get_user(&self, id: &str) -> Result<Option<IdentityProfile>, IdentityError>;

    async fn update_user_attributes(&self, id: &str, attributes: Vec<UserAttribute>) -> Result<(), IdentityError>;
}

pub type IdentityState = Arc<dyn IdentityProvider>;

// --- Cognito ---

/// CognitoIdentityProvider
///
/// Talks to a Cognito user pool through the admin API, so the configured
/// credentials need `AdminGetUser` and `AdminUpdateUserAttributes`.
#[derive(Clone)]
pub struct CognitoIdentityProvider {
    client: cognito::Client,
    user_pool_id: String,
}

impl CognitoIdentityProvider {
    pub fn new(region: &str, user_pool_id: &str, access_key: &str, secret_key: &str) -> Self {
        let credentials = cognito::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = cognito::Config::builder()
            .credentials_provider(credentials)
            .region(cognito::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .build();

        Self {
            client: cognito::Client::from_conf(config),
            user_pool_id: user_pool_id.to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for CognitoIdentityProvider {
    async fn get_user(&self, id: &str) -> Result<Option<IdentityProfile>, IdentityError> {
        let result = self
            .client
            .admin_get_user()
            .user_pool_id(&self.user_pool_id)
            .username(id)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_user_not_found_exception() {
                    return Ok(None);
                }
                return Err(IdentityError::Request(DisplayErrorContext(&service_err).to_string()));
            }
        };

        let attributes: HashMap<&str, &str> = output
            .user_attributes()
            .iter()
            .filter_map(|attr| attr.value().map(|value| (attr.name(), value)))
            .collect();
        let attribute = |name: &str| attributes.get(name).map(|v| v.to_string());

        Ok(Some(IdentityProfile {
            id: attribute("sub").unwrap_or_else(|| id.to_string()),
            username: output.username().to_string(),
            email: attribute(ATTR_EMAIL),
            given_name: attribute(ATTR_GIVEN_NAME),
            family_name: attribute(ATTR_FAMILY_NAME),
            company: attribute(ATTR_COMPANY),
            enabled: output.enabled(),
        }))
    }

    async fn update_user_attributes(&self, id: &str, attributes: Vec<UserAttribute>) -> Result<(), IdentityError> {
        let mut request = self
            .client
            .admin_update_user_attributes()
            .user_pool_id(&self.user_pool_id)
            .username(id);

        for attr in attributes {
            let attribute = AttributeType::builder()
                .name(attr.name)
                .value(attr.value)
                .build()
                .map_err(|_| IdentityError::InvalidAttribute(attr.name.to_string()))?;
            request = request.user_attributes(attribute);
        }

        request
            .send()
            .await
            .map_err(|e| IdentityError::Request(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}

// --- Local ---

/// DisabledIdentityProvider
///
/// Used in local mode when no user pool is configured: every lookup misses
/// and attribute writes are dropped.
#[derive(Clone, Default)]
pub struct DisabledIdentityProvider;

#[async_trait]
impl IdentityProvider for DisabledIdentityProvider {
    async fn get_user(&self, _id: &str) -> Result<Option<IdentityProfile>, IdentityError> {
        Ok(None)
    }

    async fn update_user_attributes(&self, id: &str, attributes: Vec<UserAttribute>) -> Result<(), IdentityError> {
        tracing::debug!(
            user = %crate::services::short_id(id),
            count = attributes.len(),
            "Identity provider disabled, attribute update skipped"
        );
        Ok(())
    }
}

// --- Mock ---

/// MockIdentityProvider
///
/// In-process directory for tests. Counts lookups and records every attribute
/// write so mirroring can be asserted.
#[derive(Default)]
pub struct MockIdentityProvider {
    users: Mutex<HashMap<String, IdentityProfile>>,
    updates: Mutex<Vec<(String, Vec<UserAttribute>)>>,
    lookups: AtomicUsize,
    should_fail: AtomicBool,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, profile: IdentityProfile) -> Self {
        if let Ok(mut users) = self.users.lock() {
            users.insert(profile.id.clone(), profile);
        }
        self
    }

    /// Makes every subsequent call fail.
    pub fn set_failing(&self, failing: bool) {
        self.should_fail.store(failing, Ordering::SeqCst);
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn recorded_updates(&self) -> Vec<(String, Vec<UserAttribute>)> {
        self.updates.lock().map(|u| u.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn get_user(&self, id: &str) -> Result<Option<IdentityProfile>, IdentityError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(IdentityError::Simulated);
        }
        let users = self.users.lock().map_err(|_| IdentityError::Simulated)?;
        Ok(users.get(id).cloned())
    }

    async fn update_user_attributes(&self, id: &str, attributes: Vec<UserAttribute>) -> Result<(), IdentityError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(IdentityError::Simulated);
        }
        let mut updates = self.updates.lock().map_err(|_| IdentityError::Simulated)?;
        updates.push((id.to_string(), attributes));
        Ok(())
    }
}
