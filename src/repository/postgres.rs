use async_trait::async_trait;
use sqlx::{FromRow, PgPool, postgres::PgRow};
use uuid::Uuid;

use super::{
    GalleryCategoryRepository, GalleryItemRepository, RepositoryError, ResourceRepository, SiteConfigRepository,
    UserRepository,
};
use crate::models::{
    GalleryCategory, GalleryCategoryPatch, GalleryItem, GalleryItemPatch, HistoricalMilestone,
    Leader, LeaderPatch, MilestonePatch, NewGalleryCategory, NewGalleryItem, NewLeader,
    NewMilestone, NewShieldValue, NewUser, ShieldValue, ShieldValuePatch, SiteConfig,
    SiteConfigPatch, User, UserPatch, UserRow,
};
use crate::resource::{GalleryCategories, GalleryItems, Leaders, Milestones, ShieldValues};

const SHIELD_VALUE_COLUMNS: &str = "id, title, title_en, description, description_en, icon_url, display_order, created_at, updated_at";
const MILESTONE_COLUMNS: &str = "id, year, date_label, title, title_en, description, description_en, image_url, display_order, created_at, updated_at";
const LEADER_COLUMNS: &str = "id, full_name, position, position_en, period, photo_url, bio, display_order, created_at, updated_at";
const CATEGORY_COLUMNS: &str = "id, name, name_en, slug, description, cover_image_url, display_order, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, category_id, media_type, title, caption, media_url, thumbnail_url, display_order, created_at, updated_at";
const SITE_CONFIG_COLUMNS: &str = "id, site_name, site_name_en, tagline, tagline_en, contact_email, contact_phone, address, facebook_url, instagram_url, youtube_url, logo_url, favicon_url, created_at, updated_at";
const USER_COLUMNS: &str = "id, email, user_name, first_name, last_name, company, config_step, is_active, created_at, updated_at";

/// PostgresRepository
///
/// The PostgreSQL-backed implementation of every repository trait. Table and
/// column names below are compile-time constants; all values go through binds.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list_ordered<T>(&self, table: &'static str, columns: &'static str) -> Result<Vec<T>, RepositoryError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let sql = format!("SELECT {columns} FROM {table} ORDER BY display_order ASC, created_at ASC");
        Ok(sqlx::query_as::<_, T>(&sql).fetch_all(&self.pool).await?)
    }

    async fn find_one<T>(&self, table: &'static str, columns: &'static str, id: Uuid) -> Result<Option<T>, RepositoryError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let sql = format!("SELECT {columns} FROM {table} WHERE id = $1");
        Ok(sqlx::query_as::<_, T>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn delete_row(&self, table: &'static str, id: Uuid) -> Result<bool, RepositoryError> {
        let sql = format!("DELETE FROM {table} WHERE id = $1");
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn write_display_order(&self, table: &'static str, id: Uuid, display_order: i32) -> Result<bool, RepositoryError> {
        let sql = format!("UPDATE {table} SET display_order = $2, updated_at = NOW() WHERE id = $1");
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(display_order)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// SQL expression appending a new row after the current maximum order.
fn next_order(table: &'static str, param: usize) -> String {
    format!("COALESCE(${param}, (SELECT COALESCE(MAX(display_order), 0) + 1 FROM {table}))")
}

// --- Shield Values ---

#[async_trait]
impl ResourceRepository<ShieldValues> for PostgresRepository {
    async fn get_all(&self) -> Result<Vec<ShieldValue>, RepositoryError> {
        self.list_ordered("shield_values", SHIELD_VALUE_COLUMNS).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<ShieldValue>, RepositoryError> {
        self.find_one("shield_values", SHIELD_VALUE_COLUMNS, id).await
    }

    async fn create(&self, data: NewShieldValue) -> Result<ShieldValue, RepositoryError> {
        let sql = format!(
            "INSERT INTO shield_values (id, title, title_en, description, description_en, icon_url, display_order, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, {}, NOW(), NOW()) RETURNING {SHIELD_VALUE_COLUMNS}",
            next_order("shield_values", 7)
        );
        Ok(sqlx::query_as::<_, ShieldValue>(&sql)
            .bind(Uuid::new_v4())
            .bind(data.title)
            .bind(data.title_en)
            .bind(data.description)
            .bind(data.description_en)
            .bind(data.icon_url)
            .bind(data.display_order)
            .fetch_one(&self.pool)
            .await?)
    }

    /// Uses COALESCE so only the `Some` fields of the patch overwrite columns.
    async fn update(&self, id: Uuid, patch: ShieldValuePatch) -> Result<Option<ShieldValue>, RepositoryError> {
        let sql = format!(
            "UPDATE shield_values SET \
                title = COALESCE($2, title), \
                title_en = COALESCE($3, title_en), \
                description = COALESCE($4, description), \
                description_en = COALESCE($5, description_en), \
                icon_url = COALESCE($6, icon_url), \
                display_order = COALESCE($7, display_order), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {SHIELD_VALUE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, ShieldValue>(&sql)
            .bind(id)
            .bind(patch.title)
            .bind(patch.title_en)
            .bind(patch.description)
            .bind(patch.description_en)
            .bind(patch.icon_url)
            .bind(patch.display_order)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        self.delete_row("shield_values", id).await
    }

    async fn set_display_order(&self, id: Uuid, display_order: i32) -> Result<bool, RepositoryError> {
        self.write_display_order("shield_values", id, display_order).await
    }
}

// --- Historical Milestones ---

#[async_trait]
impl ResourceRepository<Milestones> for PostgresRepository {
    async fn get_all(&self) -> Result<Vec<HistoricalMilestone>, RepositoryError> {
        self.list_ordered("historical_milestones", MILESTONE_COLUMNS).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<HistoricalMilestone>, RepositoryError> {
        self.find_one("historical_milestones", MILESTONE_COLUMNS, id).await
    }

    async fn create(&self, data: NewMilestone) -> Result<HistoricalMilestone, RepositoryError> {
        let sql = format!(
            "INSERT INTO historical_milestones (id, year, date_label, title, title_en, description, description_en, image_url, display_order, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, {}, NOW(), NOW()) RETURNING {MILESTONE_COLUMNS}",
            next_order("historical_milestones", 9)
        );
        Ok(sqlx::query_as::<_, HistoricalMilestone>(&sql)
            .bind(Uuid::new_v4())
            .bind(data.year)
            .bind(data.date_label)
            .bind(data.title)
            .bind(data.title_en)
            .bind(data.description)
            .bind(data.description_en)
            .bind(data.image_url)
            .bind(data.display_order)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update(&self, id: Uuid, patch: MilestonePatch) -> Result<Option<HistoricalMilestone>, RepositoryError> {
        let sql = format!(
            "UPDATE historical_milestones SET \
                year = COALESCE($2, year), \
                date_label = COALESCE($3, date_label), \
                title = COALESCE($4, title), \
                title_en = COALESCE($5, title_en), \
                description = COALESCE($6, description), \
                description_en = COALESCE($7, description_en), \
                image_url = COALESCE($8, image_url), \
                display_order = COALESCE($9, display_order), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {MILESTONE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, HistoricalMilestone>(&sql)
            .bind(id)
            .bind(patch.year)
            .bind(patch.date_label)
            .bind(patch.title)
            .bind(patch.title_en)
            .bind(patch.description)
            .bind(patch.description_en)
            .bind(patch.image_url)
            .bind(patch.display_order)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        self.delete_row("historical_milestones", id).await
    }

    async fn set_display_order(&self, id: Uuid, display_order: i32) -> Result<bool, RepositoryError> {
        self.write_display_order("historical_milestones", id, display_order).await
    }
}

// --- Leadership Roster ---

#[async_trait]
impl ResourceRepository<Leaders> for PostgresRepository {
    async fn get_all(&self) -> Result<Vec<Leader>, RepositoryError> {
        self.list_ordered("leaders", LEADER_COLUMNS).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Leader>, RepositoryError> {
        self.find_one("leaders", LEADER_COLUMNS, id).await
    }

    async fn create(&self, data: NewLeader) -> Result<Leader, RepositoryError> {
        let sql = format!(
            "INSERT INTO leaders (id, full_name, position, position_en, period, photo_url, bio, display_order, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, {}, NOW(), NOW()) RETURNING {LEADER_COLUMNS}",
            next_order("leaders", 8)
        );
        Ok(sqlx::query_as::<_, Leader>(&sql)
            .bind(Uuid::new_v4())
            .bind(data.full_name)
            .bind(data.position)
            .bind(data.position_en)
            .bind(data.period)
            .bind(data.photo_url)
            .bind(data.bio)
            .bind(data.display_order)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update(&self, id: Uuid, patch: LeaderPatch) -> Result<Option<Leader>, RepositoryError> {
        let sql = format!(
            "UPDATE leaders SET \
                full_name = COALESCE($2, full_name), \
                position = COALESCE($3, position), \
                position_en = COALESCE($4, position_en), \
                period = COALESCE($5, period), \
                photo_url = COALESCE($6, photo_url), \
                bio = COALESCE($7, bio), \
                display_order = COALESCE($8, display_order), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {LEADER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Leader>(&sql)
            .bind(id)
            .bind(patch.full_name)
            .bind(patch.position)
            .bind(patch.position_en)
            .bind(patch.period)
            .bind(patch.photo_url)
            .bind(patch.bio)
            .bind(patch.display_order)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        self.delete_row("leaders", id).await
    }

    async fn set_display_order(&self, id: Uuid, display_order: i32) -> Result<bool, RepositoryError> {
        self.write_display_order("leaders", id, display_order).await
    }
}

// --- Gallery Categories ---

#[async_trait]
impl ResourceRepository<GalleryCategories> for PostgresRepository {
    async fn get_all(&self) -> Result<Vec<GalleryCategory>, RepositoryError> {
        self.list_ordered("gallery_categories", CATEGORY_COLUMNS).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<GalleryCategory>, RepositoryError> {
        self.find_one("gallery_categories", CATEGORY_COLUMNS, id).await
    }

    /// Expects `slug` to be filled by the service; an empty string is stored otherwise.
    async fn create(&self, data: NewGalleryCategory) -> Result<GalleryCategory, RepositoryError> {
        let sql = format!(
            "INSERT INTO gallery_categories (id, name, name_en, slug, description, cover_image_url, display_order, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, {}, NOW(), NOW()) RETURNING {CATEGORY_COLUMNS}",
            next_order("gallery_categories", 7)
        );
        Ok(sqlx::query_as::<_, GalleryCategory>(&sql)
            .bind(Uuid::new_v4())
            .bind(data.name)
            .bind(data.name_en)
            .bind(data.slug.unwrap_or_default())
            .bind(data.description)
            .bind(data.cover_image_url)
            .bind(data.display_order)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update(&self, id: Uuid, patch: GalleryCategoryPatch) -> Result<Option<GalleryCategory>, RepositoryError> {
        let sql = format!(
            "UPDATE gallery_categories SET \
                name = COALESCE($2, name), \
                name_en = COALESCE($3, name_en), \
                slug = COALESCE($4, slug), \
                description = COALESCE($5, description), \
                cover_image_url = COALESCE($6, cover_image_url), \
                display_order = COALESCE($7, display_order), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {CATEGORY_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, GalleryCategory>(&sql)
            .bind(id)
            .bind(patch.name)
            .bind(patch.name_en)
            .bind(patch.slug)
            .bind(patch.description)
            .bind(patch.cover_image_url)
            .bind(patch.display_order)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        self.delete_row("gallery_categories", id).await
    }

    async fn set_display_order(&self, id: Uuid, display_order: i32) -> Result<bool, RepositoryError> {
        self.write_display_order("gallery_categories", id, display_order).await
    }
}

#[async_trait]
impl GalleryCategoryRepository for PostgresRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<GalleryCategory>, RepositoryError> {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM gallery_categories WHERE slug = $1 \
             ORDER BY display_order ASC, created_at ASC LIMIT 1"
        );
        Ok(sqlx::query_as::<_, GalleryCategory>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }
}

// --- Gallery Items ---

#[async_trait]
impl ResourceRepository<GalleryItems> for PostgresRepository {
    async fn get_all(&self) -> Result<Vec<GalleryItem>, RepositoryError> {
        self.list_ordered("gallery_items", ITEM_COLUMNS).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<GalleryItem>, RepositoryError> {
        self.find_one("gallery_items", ITEM_COLUMNS, id).await
    }

    async fn create(&self, data: NewGalleryItem) -> Result<GalleryItem, RepositoryError> {
        let sql = format!(
            "INSERT INTO gallery_items (id, category_id, media_type, title, caption, media_url, thumbnail_url, display_order, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, {}, NOW(), NOW()) RETURNING {ITEM_COLUMNS}",
            next_order("gallery_items", 8)
        );
        Ok(sqlx::query_as::<_, GalleryItem>(&sql)
            .bind(Uuid::new_v4())
            .bind(data.category_id)
            .bind(data.media_type.as_str())
            .bind(data.title)
            .bind(data.caption)
            .bind(data.media_url)
            .bind(data.thumbnail_url)
            .bind(data.display_order)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update(&self, id: Uuid, patch: GalleryItemPatch) -> Result<Option<GalleryItem>, RepositoryError> {
        let sql = format!(
            "UPDATE gallery_items SET \
                category_id = COALESCE($2, category_id), \
                media_type = COALESCE($3, media_type), \
                title = COALESCE($4, title), \
                caption = COALESCE($5, caption), \
                media_url = COALESCE($6, media_url), \
                thumbnail_url = COALESCE($7, thumbnail_url), \
                display_order = COALESCE($8, display_order), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {ITEM_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, GalleryItem>(&sql)
            .bind(id)
            .bind(patch.category_id)
            .bind(patch.media_type.map(|m| m.as_str()))
            .bind(patch.title)
            .bind(patch.caption)
            .bind(patch.media_url)
            .bind(patch.thumbnail_url)
            .bind(patch.display_order)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        self.delete_row("gallery_items", id).await
    }

    async fn set_display_order(&self, id: Uuid, display_order: i32) -> Result<bool, RepositoryError> {
        self.write_display_order("gallery_items", id, display_order).await
    }
}

#[async_trait]
impl GalleryItemRepository for PostgresRepository {
    async fn list_by_category(&self, category_id: Uuid) -> Result<Vec<GalleryItem>, RepositoryError> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM gallery_items WHERE category_id = $1 \
             ORDER BY display_order ASC, created_at ASC"
        );
        Ok(sqlx::query_as::<_, GalleryItem>(&sql)
            .bind(category_id)
            .fetch_all(&self.pool)
            .await?)
    }
}

// --- Site Configuration ---

#[async_trait]
impl SiteConfigRepository for PostgresRepository {
    /// Oldest row wins should a second one ever appear.
    async fn get_current(&self) -> Result<Option<SiteConfig>, RepositoryError> {
        let sql = format!("SELECT {SITE_CONFIG_COLUMNS} FROM site_config ORDER BY created_at ASC LIMIT 1");
        Ok(sqlx::query_as::<_, SiteConfig>(&sql).fetch_optional(&self.pool).await?)
    }

    async fn create(&self, data: SiteConfigPatch) -> Result<SiteConfig, RepositoryError> {
        let sql = format!(
            "INSERT INTO site_config (id, site_name, site_name_en, tagline, tagline_en, contact_email, contact_phone, address, \
                facebook_url, instagram_url, youtube_url, logo_url, favicon_url, created_at, updated_at) \
             VALUES ($1, COALESCE($2, ''), $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NOW(), NOW()) \
             RETURNING {SITE_CONFIG_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, SiteConfig>(&sql)
            .bind(Uuid::new_v4())
            .bind(data.site_name)
            .bind(data.site_name_en)
            .bind(data.tagline)
            .bind(data.tagline_en)
            .bind(data.contact_email)
            .bind(data.contact_phone)
            .bind(data.address)
            .bind(data.facebook_url)
            .bind(data.instagram_url)
            .bind(data.youtube_url)
            .bind(data.logo_url)
            .bind(data.favicon_url)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update(&self, id: Uuid, patch: SiteConfigPatch) -> Result<Option<SiteConfig>, RepositoryError> {
        let sql = format!(
            "UPDATE site_config SET \
                site_name = COALESCE($2, site_name), \
                site_name_en = COALESCE($3, site_name_en), \
                tagline = COALESCE($4, tagline), \
                tagline_en = COALESCE($5, tagline_en), \
                contact_email = COALESCE($6, contact_email), \
                contact_phone = COALESCE($7, contact_phone), \
                address = COALESCE($8, address), \
                facebook_url = COALESCE($9, facebook_url), \
                instagram_url = COALESCE($10, instagram_url), \
                youtube_url = COALESCE($11, youtube_url), \
                logo_url = COALESCE($12, logo_url), \
                favicon_url = COALESCE($13, favicon_url), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {SITE_CONFIG_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, SiteConfig>(&sql)
            .bind(id)
            .bind(patch.site_name)
            .bind(patch.site_name_en)
            .bind(patch.tagline)
            .bind(patch.tagline_en)
            .bind(patch.contact_email)
            .bind(patch.contact_phone)
            .bind(patch.address)
            .bind(patch.facebook_url)
            .bind(patch.instagram_url)
            .bind(patch.youtube_url)
            .bind(patch.logo_url)
            .bind(patch.favicon_url)
            .fetch_optional(&self.pool)
            .await?)
    }
}

// --- Users ---

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    /// Email comparison is case-insensitive.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
        let sql = format!(
            "INSERT INTO users (id, email, user_name, first_name, last_name, company, config_step, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, '0', $7, NOW(), NOW()) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.id)
            .bind(user.email)
            .bind(user.user_name)
            .bind(user.first_name)
            .bind(user.last_name)
            .bind(user.company)
            .bind(user.is_active)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn update(&self, id: &str, patch: UserPatch) -> Result<Option<User>, RepositoryError> {
        let sql = format!(
            "UPDATE users SET \
                user_name = COALESCE($2, user_name), \
                first_name = COALESCE($3, first_name), \
                last_name = COALESCE($4, last_name), \
                company = COALESCE($5, company), \
                config_step = COALESCE($6, config_step), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(patch.user_name)
            .bind(patch.first_name)
            .bind(patch.last_name)
            .bind(patch.company)
            .bind(patch.config_step.map(|step| step.to_string()))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }
}
