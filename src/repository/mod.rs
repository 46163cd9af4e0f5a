use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{GalleryCategory, GalleryItem, NewUser, SiteConfig, SiteConfigPatch, User, UserPatch};
use crate::resource::{GalleryCategories, GalleryItems, Leaders, Milestones, Resource, ShieldValues};

pub mod memory;
pub mod postgres;

pub use memory::{InMemorySiteConfig, InMemoryUsers, MemoryTable};
pub use postgres::PostgresRepository;

/// RepositoryError
///
/// Failures raised by the persistence layer. Unique and foreign-key violations
/// are split out because the service layer reacts to them; everything else is
/// an opaque database failure.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("foreign key violated: {0}")]
    ForeignKeyViolation(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    /// Returned by the in-memory store when it is told to fail.
    #[error("store unavailable")]
    Unavailable,
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return RepositoryError::UniqueViolation(db.message().to_string());
            }
            if db.is_foreign_key_violation() {
                return RepositoryError::ForeignKeyViolation(db.message().to_string());
            }
        }
        RepositoryError::Database(err)
    }
}

/// ResourceRepository
///
/// Persistence contract shared by every reorderable resource. Absence is
/// reported through `Option`/`bool`, never as an error.
#[async_trait]
pub trait ResourceRepository<R: Resource>: Send + Sync {
    /// All rows, ordered by `display_order` then creation time.
    async fn get_all(&self) -> Result<Vec<R::Entity>, RepositoryError>;
    async fn get_by_id(&self, id: Uuid) -> Result<Option<R::Entity>, RepositoryError>;
    /// Inserts with a fresh id. A missing `display_order` appends after the current maximum.
    async fn create(&self, data: R::Create) -> Result<R::Entity, RepositoryError>;
    async fn update(&self, id: Uuid, patch: R::Update) -> Result<Option<R::Entity>, RepositoryError>;
    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError>;
    /// Single-row order write used by reorder. Returns false for unknown ids.
    async fn set_display_order(&self, id: Uuid, display_order: i32) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait GalleryCategoryRepository: ResourceRepository<GalleryCategories> {
    /// Exact match on the stored slug. Slugs are not unique; the first in
    /// display order wins.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<GalleryCategory>, RepositoryError>;
}

#[async_trait]
pub trait GalleryItemRepository: ResourceRepository<GalleryItems> {
    /// Items of one category, in display order.
    async fn list_by_category(&self, category_id: Uuid) -> Result<Vec<GalleryItem>, RepositoryError>;
}

#[async_trait]
pub trait SiteConfigRepository: Send + Sync {
    async fn get_current(&self) -> Result<Option<SiteConfig>, RepositoryError>;
    async fn create(&self, data: SiteConfigPatch) -> Result<SiteConfig, RepositoryError>;
    async fn update(&self, id: Uuid, patch: SiteConfigPatch) -> Result<Option<SiteConfig>, RepositoryError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError>;
    async fn update(&self, id: &str, patch: UserPatch) -> Result<Option<User>, RepositoryError>;
}

/// Repositories
///
/// One handle per entity family, built once at startup and handed to the
/// services. Both constructors share a single backing store across fields.
#[derive(Clone)]
pub struct Repositories {
    pub shield_values: Arc<dyn ResourceRepository<ShieldValues>>,
    pub milestones: Arc<dyn ResourceRepository<Milestones>>,
    pub leaders: Arc<dyn ResourceRepository<Leaders>>,
    pub gallery_categories: Arc<dyn GalleryCategoryRepository>,
    pub gallery_items: Arc<dyn GalleryItemRepository>,
    pub site_config: Arc<dyn SiteConfigRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        let repo = Arc::new(PostgresRepository::new(pool));
        Self {
            shield_values: repo.clone(),
            milestones: repo.clone(),
            leaders: repo.clone(),
            gallery_categories: repo.clone(),
            gallery_items: repo.clone(),
            site_config: repo.clone(),
            users: repo,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            shield_values: Arc::new(MemoryTable::<ShieldValues>::default()),
            milestones: Arc::new(MemoryTable::<Milestones>::default()),
            leaders: Arc::new(MemoryTable::<Leaders>::default()),
            gallery_categories: Arc::new(MemoryTable::<GalleryCategories>::default()),
            gallery_items: Arc::new(MemoryTable::<GalleryItems>::default()),
            site_config: Arc::new(InMemorySiteConfig::default()),
            users: Arc::new(InMemoryUsers::default()),
        }
    }
}
