//! PostgreSQL-backed repository tests. They need a live database:
//!
//! ```text
//! DATABASE_URL=postgres://... cargo test --test repository_integration_tests -- --ignored
//! ```

use honor_guard_site::{
    models::{
        GalleryCategoryPatch, MediaType, NewGalleryCategory, NewGalleryItem, NewShieldValue, NewUser, ReorderItem,
        SiteConfigPatch, UserPatch,
    },
    repository::{PostgresRepository, RepositoryError, UserRepository},
    services::{GalleryCategoryService, GalleryItemService, ServiceError, ShieldValueService, SiteConfigService},
};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> Arc<PostgresRepository> {
        Arc::new(PostgresRepository::new(self.pool.clone()))
    }
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

// --- Resources ---

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_shield_value_crud_and_reorder() {
    let ctx = DbTestContext::setup().await;
    let service = ShieldValueService::new(ctx.repository());

    let a = service
        .create(NewShieldValue {
            title: unique("Honor"),
            description: "Integridad".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let b = service
        .create(NewShieldValue {
            title: unique("Lealtad"),
            description: "Fidelidad".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(b.display_order > a.display_order);

    service
        .reorder(&[
            ReorderItem {
                id: a.id,
                display_order: b.display_order,
            },
            ReorderItem {
                id: b.id,
                display_order: a.display_order,
            },
        ])
        .await
        .unwrap();

    let a_after = service.get_by_id(a.id).await.unwrap().unwrap();
    assert_eq!(a_after.display_order, b.display_order);
    assert!(a_after.updated_at >= a.updated_at);

    assert!(service.delete(a.id).await.unwrap());
    assert!(service.delete(b.id).await.unwrap());
    assert!(!service.delete(b.id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_category_slug_and_cascade_delete() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let categories = GalleryCategoryService::new(repo.clone());
    let items = GalleryItemService::new(repo);

    let name = unique("Ceremonias Cívicas");
    let category = categories
        .create(NewGalleryCategory {
            name: name.clone(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(category.slug.starts_with("ceremonias-civicas-"));

    let renamed = categories
        .update(
            category.id,
            GalleryCategoryPatch {
                description: Some("Actos oficiales".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(renamed.slug, category.slug);

    let item = items
        .create(NewGalleryItem {
            category_id: category.id,
            media_type: MediaType::Video,
            media_url: "https://cdn.example/desfile.mp4".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(items.get_by_id(item.id).await.unwrap().unwrap().media_type, MediaType::Video);

    assert!(categories.delete(category.id).await.unwrap());
    assert!(items.get_by_id(item.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_item_with_unknown_category_is_foreign_key_violation() {
    let ctx = DbTestContext::setup().await;
    let items = GalleryItemService::new(ctx.repository());

    let result = items
        .create(NewGalleryItem {
            category_id: Uuid::new_v4(),
            media_type: MediaType::Photo,
            media_url: "https://cdn.example/a.jpg".to_string(),
            ..Default::default()
        })
        .await;

    assert!(matches!(
        result,
        Err(ServiceError::Repository(RepositoryError::ForeignKeyViolation(_)))
    ));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_slug_and_category_lookups_query_postgres() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let categories = GalleryCategoryService::new(repo.clone());
    let items = GalleryItemService::new(repo);

    let category = categories
        .create(NewGalleryCategory {
            name: unique("Desfiles Patrios"),
            ..Default::default()
        })
        .await
        .unwrap();
    let other = categories
        .create(NewGalleryCategory {
            name: unique("Juramentos"),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(categories.get_by_slug(&category.slug).await.unwrap().map(|c| c.id), Some(category.id));

    for (category_id, url) in [(category.id, "https://cdn.example/1.jpg"), (other.id, "https://cdn.example/2.jpg"), (category.id, "https://cdn.example/3.jpg")] {
        items
            .create(NewGalleryItem {
                category_id,
                media_type: MediaType::Photo,
                media_url: url.to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
    }

    let urls: Vec<String> = items
        .list_by_category(category.id)
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.media_url)
        .collect();
    assert_eq!(urls, vec!["https://cdn.example/1.jpg", "https://cdn.example/3.jpg"]);

    assert!(categories.delete(category.id).await.unwrap());
    assert!(categories.delete(other.id).await.unwrap());
}

// --- Site config ---

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_site_config_stays_single_row() {
    let ctx = DbTestContext::setup().await;
    let service = SiteConfigService::new(ctx.repository());

    let first = service
        .update_config(SiteConfigPatch {
            site_name: Some("Guardia de Honor".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    let second = service
        .update_config(SiteConfigPatch {
            tagline: Some(unique("tagline")),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM site_config")
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

// --- Users ---

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_user_insert_update_and_unique_email() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let email = format!("{}@colegio.edu", unique("cadete"));

    let user = repo
        .insert(NewUser {
            id: unique("sub"),
            email: email.clone(),
            user_name: email.clone(),
            is_active: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(user.config_step, 0);

    let updated = repo
        .update(
            &user.id,
            UserPatch {
                config_step: Some(3),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.config_step, 3);

    let stored: String = sqlx::query_scalar("SELECT config_step FROM users WHERE id = $1")
        .bind(&user.id)
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(stored, "3");

    let duplicate = repo
        .insert(NewUser {
            id: unique("sub"),
            email: email.to_uppercase(),
            user_name: "otro".to_string(),
            is_active: true,
            ..Default::default()
        })
        .await;
    assert!(matches!(duplicate, Err(RepositoryError::UniqueViolation(_))));

    let found = repo.find_by_email(&email.to_uppercase()).await.unwrap().unwrap();
    assert_eq!(found.id, user.id);
}
