//! In-memory repositories.
//!
//! Used by the integration tests in place of PostgreSQL. They follow the same
//! contracts as `PostgresRepository`, including append-on-create ordering and
//! unique user emails, and can be told to fail to exercise error paths.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::marker::PhantomData;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use super::{
    GalleryCategoryRepository, GalleryItemRepository, RepositoryError, ResourceRepository, SiteConfigRepository,
    UserRepository,
};
use crate::models::{
    GalleryCategory, GalleryItem, HistoricalMilestone, Leader, NewUser, ShieldValue, SiteConfig,
    SiteConfigPatch, User, UserPatch,
};
use crate::resource::{GalleryCategories, GalleryItems, Leaders, Milestones, Resource, ShieldValues};

/// MemoryRecord
///
/// How a resource's rows are built and patched without a database.
pub trait MemoryRecord: Resource {
    fn requested_order(data: &Self::Create) -> Option<i32>;
    fn build(id: Uuid, display_order: i32, now: DateTime<Utc>, data: Self::Create) -> Self::Entity;
    fn apply(entity: &mut Self::Entity, patch: Self::Update, now: DateTime<Utc>);
    fn reorder(entity: &mut Self::Entity, display_order: i32, now: DateTime<Utc>);
}

/// MemoryTable
///
/// One resource table. Rows are kept in insertion order so a stable sort by
/// `display_order` matches the PostgreSQL tie-break on `created_at`.
pub struct MemoryTable<R: MemoryRecord> {
    rows: Mutex<Vec<R::Entity>>,
    unavailable: AtomicBool,
    failing_id: Mutex<Option<Uuid>>,
    _resource: PhantomData<R>,
}

impl<R: MemoryRecord> Default for MemoryTable<R> {
    fn default() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            unavailable: AtomicBool::new(false),
            failing_id: Mutex::new(None),
            _resource: PhantomData,
        }
    }
}

impl<R: MemoryRecord> MemoryTable<R> {
    /// Every subsequent call fails with `RepositoryError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Order writes for `id` fail; other rows are unaffected.
    pub fn fail_order_writes_for(&self, id: Uuid) {
        if let Ok(mut failing) = self.failing_id.lock() {
            *failing = Some(id);
        }
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable);
        }
        Ok(())
    }

    fn rows(&self) -> Result<std::sync::MutexGuard<'_, Vec<R::Entity>>, RepositoryError> {
        self.check()?;
        self.rows.lock().map_err(|_| RepositoryError::Unavailable)
    }
}

#[async_trait]
impl<R: MemoryRecord> ResourceRepository<R> for MemoryTable<R> {
    async fn get_all(&self) -> Result<Vec<R::Entity>, RepositoryError> {
        let mut rows = self.rows()?.clone();
        rows.sort_by_key(|row| R::display_order(row));
        Ok(rows)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<R::Entity>, RepositoryError> {
        Ok(self.rows()?.iter().find(|row| R::id(row) == id).cloned())
    }

    async fn create(&self, data: R::Create) -> Result<R::Entity, RepositoryError> {
        let mut rows = self.rows()?;
        let display_order = R::requested_order(&data)
            .unwrap_or_else(|| rows.iter().map(|row| R::display_order(row)).max().unwrap_or(0) + 1);
        let entity = R::build(Uuid::new_v4(), display_order, Utc::now(), data);
        rows.push(entity.clone());
        Ok(entity)
    }

    async fn update(&self, id: Uuid, patch: R::Update) -> Result<Option<R::Entity>, RepositoryError> {
        let mut rows = self.rows()?;
        Ok(rows.iter_mut().find(|row| R::id(row) == id).map(|row| {
            R::apply(row, patch, Utc::now());
            row.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut rows = self.rows()?;
        let before = rows.len();
        rows.retain(|row| R::id(row) != id);
        Ok(rows.len() < before)
    }

    async fn set_display_order(&self, id: Uuid, display_order: i32) -> Result<bool, RepositoryError> {
        let failing = self.failing_id.lock().map_err(|_| RepositoryError::Unavailable)?;
        if *failing == Some(id) {
            return Err(RepositoryError::Unavailable);
        }
        drop(failing);

        let mut rows = self.rows()?;
        match rows.iter_mut().find(|row| R::id(row) == id) {
            Some(row) => {
                R::reorder(row, display_order, Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl GalleryCategoryRepository for MemoryTable<GalleryCategories> {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<GalleryCategory>, RepositoryError> {
        Ok(self.get_all().await?.into_iter().find(|category| category.slug == slug))
    }
}

#[async_trait]
impl GalleryItemRepository for MemoryTable<GalleryItems> {
    async fn list_by_category(&self, category_id: Uuid) -> Result<Vec<GalleryItem>, RepositoryError> {
        let mut items = self.get_all().await?;
        items.retain(|item| item.category_id == category_id);
        Ok(items)
    }
}

fn overwrite<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

fn overwrite_opt<T>(field: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *field = value;
    }
}

impl MemoryRecord for ShieldValues {
    fn requested_order(data: &Self::Create) -> Option<i32> {
        data.display_order
    }

    fn build(id: Uuid, display_order: i32, now: DateTime<Utc>, data: Self::Create) -> ShieldValue {
        ShieldValue {
            id,
            title: data.title,
            title_en: data.title_en,
            description: data.description,
            description_en: data.description_en,
            icon_url: data.icon_url,
            display_order,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(entity: &mut ShieldValue, patch: Self::Update, now: DateTime<Utc>) {
        overwrite(&mut entity.title, patch.title);
        overwrite_opt(&mut entity.title_en, patch.title_en);
        overwrite(&mut entity.description, patch.description);
        overwrite_opt(&mut entity.description_en, patch.description_en);
        overwrite_opt(&mut entity.icon_url, patch.icon_url);
        overwrite(&mut entity.display_order, patch.display_order);
        entity.updated_at = now;
    }

    fn reorder(entity: &mut ShieldValue, display_order: i32, now: DateTime<Utc>) {
        entity.display_order = display_order;
        entity.updated_at = now;
    }
}

impl MemoryRecord for Milestones {
    fn requested_order(data: &Self::Create) -> Option<i32> {
        data.display_order
    }

    fn build(id: Uuid, display_order: i32, now: DateTime<Utc>, data: Self::Create) -> HistoricalMilestone {
        HistoricalMilestone {
            id,
            year: data.year,
            date_label: data.date_label,
            title: data.title,
            title_en: data.title_en,
            description: data.description,
            description_en: data.description_en,
            image_url: data.image_url,
            display_order,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(entity: &mut HistoricalMilestone, patch: Self::Update, now: DateTime<Utc>) {
        overwrite(&mut entity.year, patch.year);
        overwrite_opt(&mut entity.date_label, patch.date_label);
        overwrite(&mut entity.title, patch.title);
        overwrite_opt(&mut entity.title_en, patch.title_en);
        overwrite(&mut entity.description, patch.description);
        overwrite_opt(&mut entity.description_en, patch.description_en);
        overwrite_opt(&mut entity.image_url, patch.image_url);
        overwrite(&mut entity.display_order, patch.display_order);
        entity.updated_at = now;
    }

    fn reorder(entity: &mut HistoricalMilestone, display_order: i32, now: DateTime<Utc>) {
        entity.display_order = display_order;
        entity.updated_at = now;
    }
}

impl MemoryRecord for Leaders {
    fn requested_order(data: &Self::Create) -> Option<i32> {
        data.display_order
    }

    fn build(id: Uuid, display_order: i32, now: DateTime<Utc>, data: Self::Create) -> Leader {
        Leader {
            id,
            full_name: data.full_name,
            position: data.position,
            position_en: data.position_en,
            period: data.period,
            photo_url: data.photo_url,
            bio: data.bio,
            display_order,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(entity: &mut Leader, patch: Self::Update, now: DateTime<Utc>) {
        overwrite(&mut entity.full_name, patch.full_name);
        overwrite(&mut entity.position, patch.position);
        overwrite_opt(&mut entity.position_en, patch.position_en);
        overwrite_opt(&mut entity.period, patch.period);
        overwrite_opt(&mut entity.photo_url, patch.photo_url);
        overwrite_opt(&mut entity.bio, patch.bio);
        overwrite(&mut entity.display_order, patch.display_order);
        entity.updated_at = now;
    }

    fn reorder(entity: &mut Leader, display_order: i32, now: DateTime<Utc>) {
        entity.display_order = display_order;
        entity.updated_at = now;
    }
}

impl MemoryRecord for GalleryCategories {
    fn requested_order(data: &Self::Create) -> Option<i32> {
        data.display_order
    }

    fn build(id: Uuid, display_order: i32, now: DateTime<Utc>, data: Self::Create) -> GalleryCategory {
        GalleryCategory {
            id,
            name: data.name,
            name_en: data.name_en,
            slug: data.slug.unwrap_or_default(),
            description: data.description,
            cover_image_url: data.cover_image_url,
            display_order,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(entity: &mut GalleryCategory, patch: Self::Update, now: DateTime<Utc>) {
        overwrite(&mut entity.name, patch.name);
        overwrite_opt(&mut entity.name_en, patch.name_en);
        overwrite(&mut entity.slug, patch.slug);
        overwrite_opt(&mut entity.description, patch.description);
        overwrite_opt(&mut entity.cover_image_url, patch.cover_image_url);
        overwrite(&mut entity.display_order, patch.display_order);
        entity.updated_at = now;
    }

    fn reorder(entity: &mut GalleryCategory, display_order: i32, now: DateTime<Utc>) {
        entity.display_order = display_order;
        entity.updated_at = now;
    }
}

impl MemoryRecord for GalleryItems {
    fn requested_order(data: &Self::Create) -> Option<i32> {
        data.display_order
    }

    fn build(id: Uuid, display_order: i32, now: DateTime<Utc>, data: Self::Create) -> GalleryItem {
        GalleryItem {
            id,
            category_id: data.category_id,
            media_type: data.media_type,
            title: data.title,
            caption: data.caption,
            media_url: data.media_url,
            thumbnail_url: data.thumbnail_url,
            display_order,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(entity: &mut GalleryItem, patch: Self::Update, now: DateTime<Utc>) {
        overwrite(&mut entity.category_id, patch.category_id);
        overwrite(&mut entity.media_type, patch.media_type);
        overwrite_opt(&mut entity.title, patch.title);
        overwrite_opt(&mut entity.caption, patch.caption);
        overwrite(&mut entity.media_url, patch.media_url);
        overwrite_opt(&mut entity.thumbnail_url, patch.thumbnail_url);
        overwrite(&mut entity.display_order, patch.display_order);
        entity.updated_at = now;
    }

    fn reorder(entity: &mut GalleryItem, display_order: i32, now: DateTime<Utc>) {
        entity.display_order = display_order;
        entity.updated_at = now;
    }
}

// --- Site Configuration ---

/// InMemorySiteConfig
///
/// Stores rows in a `Vec` (not an `Option`) so tests can assert that the
/// service never creates a second row.
#[derive(Default)]
pub struct InMemorySiteConfig {
    rows: Mutex<Vec<SiteConfig>>,
}

impl InMemorySiteConfig {
    pub fn row_count(&self) -> usize {
        self.rows.lock().map(|rows| rows.len()).unwrap_or(0)
    }
}

#[async_trait]
impl SiteConfigRepository for InMemorySiteConfig {
    async fn get_current(&self) -> Result<Option<SiteConfig>, RepositoryError> {
        let rows = self.rows.lock().map_err(|_| RepositoryError::Unavailable)?;
        Ok(rows.first().cloned())
    }

    async fn create(&self, data: SiteConfigPatch) -> Result<SiteConfig, RepositoryError> {
        let now = Utc::now();
        let config = SiteConfig {
            id: Uuid::new_v4(),
            site_name: data.site_name.unwrap_or_default(),
            site_name_en: data.site_name_en,
            tagline: data.tagline,
            tagline_en: data.tagline_en,
            contact_email: data.contact_email,
            contact_phone: data.contact_phone,
            address: data.address,
            facebook_url: data.facebook_url,
            instagram_url: data.instagram_url,
            youtube_url: data.youtube_url,
            logo_url: data.logo_url,
            favicon_url: data.favicon_url,
            created_at: now,
            updated_at: now,
        };
        let mut rows = self.rows.lock().map_err(|_| RepositoryError::Unavailable)?;
        rows.push(config.clone());
        Ok(config)
    }

    async fn update(&self, id: Uuid, patch: SiteConfigPatch) -> Result<Option<SiteConfig>, RepositoryError> {
        let mut rows = self.rows.lock().map_err(|_| RepositoryError::Unavailable)?;
        Ok(rows.iter_mut().find(|row| row.id == id).map(|row| {
            overwrite(&mut row.site_name, patch.site_name);
            overwrite_opt(&mut row.site_name_en, patch.site_name_en);
            overwrite_opt(&mut row.tagline, patch.tagline);
            overwrite_opt(&mut row.tagline_en, patch.tagline_en);
            overwrite_opt(&mut row.contact_email, patch.contact_email);
            overwrite_opt(&mut row.contact_phone, patch.contact_phone);
            overwrite_opt(&mut row.address, patch.address);
            overwrite_opt(&mut row.facebook_url, patch.facebook_url);
            overwrite_opt(&mut row.instagram_url, patch.instagram_url);
            overwrite_opt(&mut row.youtube_url, patch.youtube_url);
            overwrite_opt(&mut row.logo_url, patch.logo_url);
            overwrite_opt(&mut row.favicon_url, patch.favicon_url);
            row.updated_at = Utc::now();
            row.clone()
        }))
    }
}

// --- Users ---

/// InMemoryUsers
///
/// Enforces the same unique id and case-insensitive unique email constraints
/// as the `users` table.
#[derive(Default)]
pub struct InMemoryUsers {
    rows: Mutex<Vec<User>>,
}

impl InMemoryUsers {
    pub fn row_count(&self) -> usize {
        self.rows.lock().map(|rows| rows.len()).unwrap_or(0)
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        let rows = self.rows.lock().map_err(|_| RepositoryError::Unavailable)?;
        Ok(rows.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let rows = self.rows.lock().map_err(|_| RepositoryError::Unavailable)?;
        Ok(rows.iter().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut rows = self.rows.lock().map_err(|_| RepositoryError::Unavailable)?;
        if rows.iter().any(|u| u.id == user.id || u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(RepositoryError::UniqueViolation("users".to_string()));
        }
        let now = Utc::now();
        let created = User {
            id: user.id,
            email: user.email,
            user_name: user.user_name,
            first_name: user.first_name,
            last_name: user.last_name,
            company: user.company,
            config_step: 0,
            is_active: user.is_active,
            created_at: now,
            updated_at: now,
        };
        rows.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, patch: UserPatch) -> Result<Option<User>, RepositoryError> {
        let mut rows = self.rows.lock().map_err(|_| RepositoryError::Unavailable)?;
        Ok(rows.iter_mut().find(|u| u.id == id).map(|u| {
            overwrite(&mut u.user_name, patch.user_name);
            overwrite_opt(&mut u.first_name, patch.first_name);
            overwrite_opt(&mut u.last_name, patch.last_name);
            overwrite_opt(&mut u.company, patch.company);
            overwrite(&mut u.config_step, patch.config_step);
            u.updated_at = Utc::now();
            u.clone()
        }))
    }
}
