//! Business rules on top of the repositories.
//!
//! Services are built once in `AppState::new` and shared by every request.

use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::identity::IdentityError;
use crate::models::{GalleryCategory, GalleryItem, ReorderItem};
use crate::notifications::NotificationError;
use crate::repository::{GalleryCategoryRepository, GalleryItemRepository, RepositoryError, ResourceRepository};
use crate::resource::{GalleryCategories, GalleryItems, Leaders, Milestones, Resource, ShieldValues};
use crate::slug::generate_slug;

pub mod site_config;
pub mod users;

pub use site_config::SiteConfigService;
pub use users::UserService;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Notification(#[from] NotificationError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("email is registered to another account")]
    EmailTaken,
}

/// First 8 characters of an identifier, for log lines.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

fn short_uuid(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

/// ResourceService
///
/// Generic list/get/create/update/delete/reorder over one resource.
pub struct ResourceService<R: Resource> {
    repo: Arc<R::Repository>,
}

impl<R: Resource> Clone for ResourceService<R> {
    fn clone(&self) -> Self {
        Self { repo: self.repo.clone() }
    }
}

pub type ShieldValueService = ResourceService<ShieldValues>;
pub type HistoryService = ResourceService<Milestones>;
pub type LeaderService = ResourceService<Leaders>;
pub type GalleryCategoryService = ResourceService<GalleryCategories>;
pub type GalleryItemService = ResourceService<GalleryItems>;

impl<R: Resource> ResourceService<R> {
    pub fn new(repo: Arc<R::Repository>) -> Self {
        Self { repo }
    }

    pub async fn get_all(&self) -> Result<Vec<R::Entity>, ServiceError> {
        self.repo.get_all().await.map_err(|e| {
            tracing::error!(resource = R::NAME, "Failed to list: {}", e);
            e.into()
        })
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<R::Entity>, ServiceError> {
        self.repo.get_by_id(id).await.map_err(|e| {
            tracing::error!(resource = R::NAME, id = %short_uuid(id), "Failed to fetch: {}", e);
            e.into()
        })
    }

    pub async fn create(&self, mut data: R::Create) -> Result<R::Entity, ServiceError> {
        R::prepare_create(&mut data);
        let created = self.repo.create(data).await.map_err(|e| {
            tracing::error!(resource = R::NAME, "Failed to create: {}", e);
            ServiceError::from(e)
        })?;
        tracing::info!(resource = R::NAME, id = %short_uuid(R::id(&created)), "Created");
        Ok(created)
    }

    pub async fn update(&self, id: Uuid, mut patch: R::Update) -> Result<Option<R::Entity>, ServiceError> {
        R::prepare_update(&mut patch);
        let updated = self.repo.update(id, patch).await.map_err(|e| {
            tracing::error!(resource = R::NAME, id = %short_uuid(id), "Failed to update: {}", e);
            ServiceError::from(e)
        })?;
        if updated.is_some() {
            tracing::info!(resource = R::NAME, id = %short_uuid(id), "Updated");
        }
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, ServiceError> {
        let deleted = self.repo.delete(id).await.map_err(|e| {
            tracing::error!(resource = R::NAME, id = %short_uuid(id), "Failed to delete: {}", e);
            ServiceError::from(e)
        })?;
        if deleted {
            tracing::info!(resource = R::NAME, id = %short_uuid(id), "Deleted");
        }
        Ok(deleted)
    }

    /// reorder
    ///
    /// Writes each item's `display_order` one at a time, in request order.
    /// Not transactional: the first failure stops the loop and earlier writes
    /// stay applied. Unknown ids are skipped.
    pub async fn reorder(&self, items: &[ReorderItem]) -> Result<(), ServiceError> {
        for item in items {
            let found = self
                .repo
                .set_display_order(item.id, item.display_order)
                .await
                .map_err(|e| {
                    tracing::error!(resource = R::NAME, id = %short_uuid(item.id), "Reorder aborted: {}", e);
                    ServiceError::from(e)
                })?;
            if !found {
                tracing::warn!(resource = R::NAME, id = %short_uuid(item.id), "Reorder skipped unknown id");
            }
        }
        tracing::info!(resource = R::NAME, count = items.len(), "Reordered");
        Ok(())
    }
}

impl ResourceService<GalleryCategories> {
    /// Public lookup by URL segment. The input is normalized the same way
    /// stored slugs are.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<GalleryCategory>, ServiceError> {
        let wanted = generate_slug(slug);
        self.repo.find_by_slug(&wanted).await.map_err(|e| {
            tracing::error!(resource = GalleryCategories::NAME, "Slug lookup failed: {}", e);
            e.into()
        })
    }
}

impl ResourceService<GalleryItems> {
    /// Items of one category, in display order.
    pub async fn list_by_category(&self, category_id: Uuid) -> Result<Vec<GalleryItem>, ServiceError> {
        self.repo.list_by_category(category_id).await.map_err(|e| {
            tracing::error!(resource = GalleryItems::NAME, category = %short_uuid(category_id), "Failed to list: {}", e);
            e.into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_truncates_to_eight_chars() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn short_uuid_is_hex_prefix() {
        let id = Uuid::parse_str("6f1c2a3b-0000-4000-8000-000000000000").unwrap();
        assert_eq!(short_uuid(id), "6f1c2a3b");
    }
}
