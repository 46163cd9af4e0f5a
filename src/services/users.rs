use std::sync::Arc;

use super::{ServiceError, short_id};
use crate::identity::{ATTR_COMPANY, ATTR_FAMILY_NAME, ATTR_GIVEN_NAME, IdentityState, UserAttribute};
use crate::models::{Locale, NewUser, User, UserPatch};
use crate::notifications::NotifierState;
use crate::repository::{RepositoryError, UserRepository};

/// UserService
///
/// Local user rows mirrored from the identity provider. The provider owns
/// the account; the local row exists so the site can attach profile data
/// and onboarding progress to it.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    identity: IdentityState,
    notifier: NotifierState,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, identity: IdentityState, notifier: NotifierState) -> Self {
        Self { repo, identity, notifier }
    }

    /// get_user
    ///
    /// Local row first. On a miss the provider is asked and, if it knows the
    /// account, a local row is materialized from its attributes.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, ServiceError> {
        if let Some(user) = self.repo.find_by_id(id).await? {
            return Ok(Some(user));
        }

        let profile = match self.identity.get_user(id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                tracing::debug!(user = %short_id(id), "User unknown locally and to identity provider");
                return Ok(None);
            }
            Err(e) => {
                tracing::error!(user = %short_id(id), "Identity lookup failed: {}", e);
                return Err(e.into());
            }
        };

        let Some(new_user) = profile.to_new_user() else {
            tracing::warn!(user = %short_id(id), "Identity profile has no email, not synced");
            return Ok(None);
        };

        let user = self.create_user(new_user).await?;
        tracing::info!(user = %short_id(&user.id), "User synced from identity provider");
        Ok(Some(user))
    }

    /// create_user
    ///
    /// Get-or-create keyed on the subject. An email already stored under a
    /// different subject is refused with `EmailTaken`, including when a
    /// concurrent insert wins the race.
    pub async fn create_user(&self, new_user: NewUser) -> Result<User, ServiceError> {
        Ok(self.get_or_create(new_user).await?.0)
    }

    /// Same as `create_user`, also reporting whether a row was inserted.
    pub async fn get_or_create(&self, new_user: NewUser) -> Result<(User, bool), ServiceError> {
        if let Some(existing) = self.repo.find_by_id(&new_user.id).await? {
            return Ok((existing, false));
        }
        if let Some(owner) = self.repo.find_by_email(&new_user.email).await? {
            return Err(email_taken(&new_user.id, &owner));
        }

        let email = new_user.email.clone();
        let id = new_user.id.clone();
        match self.repo.insert(new_user).await {
            Ok(user) => {
                tracing::info!(user = %short_id(&user.id), "User created");
                Ok((user, true))
            }
            Err(RepositoryError::UniqueViolation(constraint)) => {
                tracing::debug!(user = %short_id(&id), "Insert raced ({}), re-reading", constraint);
                if let Some(existing) = self.repo.find_by_id(&id).await? {
                    return Ok((existing, false));
                }
                match self.repo.find_by_email(&email).await? {
                    Some(owner) => Err(email_taken(&id, &owner)),
                    None => Err(RepositoryError::UniqueViolation(constraint).into()),
                }
            }
            Err(e) => {
                tracing::error!(user = %short_id(&id), "Failed to create user: {}", e);
                Err(e.into())
            }
        }
    }

    /// update_user
    ///
    /// Writes locally, then mirrors name and company to the identity
    /// provider. A mirror failure is logged and the local write stands.
    pub async fn update_user(&self, id: &str, patch: UserPatch) -> Result<Option<User>, ServiceError> {
        let attributes = mirrored_attributes(&patch);

        let Some(updated) = self.repo.update(id, patch).await? else {
            return Ok(None);
        };
        tracing::info!(user = %short_id(id), "User updated");

        if !attributes.is_empty() {
            if let Err(e) = self.identity.update_user_attributes(id, attributes).await {
                tracing::warn!(user = %short_id(id), "Identity mirror failed, local update kept: {}", e);
            }
        }

        Ok(Some(updated))
    }

    /// verify_email_complete
    ///
    /// Post-verification hook: makes sure the local row exists, then sends
    /// the welcome email. A send failure is returned even though the row is
    /// already stored.
    pub async fn verify_email_complete(&self, id: &str, locale: Locale) -> Result<User, ServiceError> {
        let user = self.get_user(id).await?.ok_or(ServiceError::NotFound("user"))?;

        self.notifier
            .send_welcome_email(&user.email, user.first_name.as_deref(), user.last_name.as_deref(), locale)
            .await
            .map_err(|e| {
                tracing::error!(user = %short_id(id), "Welcome email failed: {}", e);
                ServiceError::from(e)
            })?;

        tracing::info!(user = %short_id(id), ?locale, "Welcome email sent");
        Ok(user)
    }
}

fn email_taken(requested_by: &str, owner: &User) -> ServiceError {
    tracing::warn!(
        user = %short_id(requested_by),
        owner = %short_id(&owner.id),
        "Email already registered to another account"
    );
    ServiceError::EmailTaken
}

fn mirrored_attributes(patch: &UserPatch) -> Vec<UserAttribute> {
    [
        (ATTR_GIVEN_NAME, &patch.first_name),
        (ATTR_FAMILY_NAME, &patch.last_name),
        (ATTR_COMPANY, &patch.company),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.as_ref().map(|v| UserAttribute::new(name, v.clone())))
    .collect()
}
