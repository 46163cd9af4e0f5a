use honor_guard_site::{
    models::{
        GalleryCategoryPatch, MediaType, NewGalleryCategory, NewGalleryItem, NewLeader, NewMilestone,
        NewShieldValue, ReorderItem, ShieldValuePatch, SiteConfigPatch,
    },
    repository::{InMemorySiteConfig, MemoryTable, RepositoryError},
    resource::{GalleryCategories, GalleryItems, Leaders, Milestones, ShieldValues},
    services::{
        GalleryCategoryService, GalleryItemService, HistoryService, LeaderService, ServiceError,
        ShieldValueService, SiteConfigService,
    },
};
use std::sync::Arc;
use uuid::Uuid;

fn shield_value(title: &str) -> NewShieldValue {
    NewShieldValue {
        title: title.to_string(),
        description: format!("Descripción de {title}"),
        ..Default::default()
    }
}

fn shield_service() -> (ShieldValueService, Arc<MemoryTable<ShieldValues>>) {
    let table = Arc::new(MemoryTable::<ShieldValues>::default());
    (ShieldValueService::new(table.clone()), table)
}

// --- Generic resource contract ---

#[tokio::test]
async fn test_create_then_get_returns_same_row() {
    let (service, _) = shield_service();

    let created = service.create(shield_value("Honor")).await.unwrap();
    let fetched = service.get_by_id(created.id).await.unwrap();

    assert_eq!(fetched, Some(created));
}

#[tokio::test]
async fn test_get_by_id_unknown_is_none() {
    let (service, _) = shield_service();
    assert!(service.get_by_id(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_returns_true_once() {
    let (service, _) = shield_service();
    let created = service.create(shield_value("Lealtad")).await.unwrap();

    assert!(service.delete(created.id).await.unwrap());
    assert!(!service.delete(created.id).await.unwrap());
    assert!(service.get_by_id(created.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_appends_after_max_display_order() {
    let (service, _) = shield_service();

    let first = service.create(shield_value("Honor")).await.unwrap();
    let pinned = service
        .create(NewShieldValue {
            display_order: Some(10),
            ..shield_value("Disciplina")
        })
        .await
        .unwrap();
    let appended = service.create(shield_value("Lealtad")).await.unwrap();

    assert_eq!(first.display_order, 1);
    assert_eq!(pinned.display_order, 10);
    assert_eq!(appended.display_order, 11);
}

#[tokio::test]
async fn test_update_is_partial() {
    let (service, _) = shield_service();
    let created = service
        .create(NewShieldValue {
            title_en: Some("Honor".to_string()),
            ..shield_value("Honor")
        })
        .await
        .unwrap();

    let updated = service
        .update(
            created.id,
            ShieldValuePatch {
                description: Some("Nueva".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.title, "Honor");
    assert_eq!(updated.title_en.as_deref(), Some("Honor"));
    assert_eq!(updated.description, "Nueva");
}

#[tokio::test]
async fn test_update_unknown_is_none() {
    let (service, _) = shield_service();
    let result = service.update(Uuid::new_v4(), ShieldValuePatch::default()).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_reorder_changes_list_order() {
    let (service, _) = shield_service();
    let a = service.create(shield_value("A")).await.unwrap();
    let b = service.create(shield_value("B")).await.unwrap();

    service
        .reorder(&[
            ReorderItem { id: a.id, display_order: 2 },
            ReorderItem { id: b.id, display_order: 1 },
        ])
        .await
        .unwrap();

    let ids: Vec<Uuid> = service.get_all().await.unwrap().into_iter().map(|v| v.id).collect();
    assert_eq!(ids, vec![b.id, a.id]);
}

#[tokio::test]
async fn test_reorder_skips_unknown_ids() {
    let (service, _) = shield_service();
    let a = service.create(shield_value("A")).await.unwrap();

    service
        .reorder(&[
            ReorderItem { id: Uuid::new_v4(), display_order: 1 },
            ReorderItem { id: a.id, display_order: 7 },
        ])
        .await
        .unwrap();

    assert_eq!(service.get_by_id(a.id).await.unwrap().unwrap().display_order, 7);
}

#[tokio::test]
async fn test_reorder_stops_at_first_failure_and_keeps_earlier_writes() {
    let (service, table) = shield_service();
    let a = service.create(shield_value("A")).await.unwrap();
    let b = service.create(shield_value("B")).await.unwrap();
    let c = service.create(shield_value("C")).await.unwrap();
    table.fail_order_writes_for(b.id);

    let result = service
        .reorder(&[
            ReorderItem { id: a.id, display_order: 30 },
            ReorderItem { id: b.id, display_order: 20 },
            ReorderItem { id: c.id, display_order: 10 },
        ])
        .await;

    assert!(matches!(result, Err(ServiceError::Repository(RepositoryError::Unavailable))));
    assert_eq!(service.get_by_id(a.id).await.unwrap().unwrap().display_order, 30);
    assert_eq!(service.get_by_id(b.id).await.unwrap().unwrap().display_order, 2);
    assert_eq!(service.get_by_id(c.id).await.unwrap().unwrap().display_order, 3);
}

#[tokio::test]
async fn test_store_failure_propagates() {
    let (service, table) = shield_service();
    table.set_unavailable(true);

    assert!(service.get_all().await.is_err());
    assert!(service.create(shield_value("Honor")).await.is_err());
    assert!(service.delete(Uuid::new_v4()).await.is_err());
}

#[tokio::test]
async fn test_other_resources_share_the_contract() {
    let history = HistoryService::new(Arc::new(MemoryTable::<Milestones>::default()));
    let milestone = history
        .create(NewMilestone {
            year: 1962,
            date_label: Some("Marzo 1962".to_string()),
            title: "Fundación".to_string(),
            description: "Primera formación".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(history.get_by_id(milestone.id).await.unwrap(), Some(milestone));

    let leaders = LeaderService::new(Arc::new(MemoryTable::<Leaders>::default()));
    let leader = leaders
        .create(NewLeader {
            full_name: "María López".to_string(),
            position: "Comandante".to_string(),
            period: Some("2024-2025".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(leaders.delete(leader.id).await.unwrap());
    assert!(leaders.get_all().await.unwrap().is_empty());
}

// --- Gallery ---

fn category_service() -> GalleryCategoryService {
    GalleryCategoryService::new(Arc::new(MemoryTable::<GalleryCategories>::default()))
}

#[tokio::test]
async fn test_category_slug_derived_from_name() {
    let service = category_service();
    let created = service
        .create(NewGalleryCategory {
            name: "Categoría Épica!!".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(created.slug, "categoria-epica");
}

#[tokio::test]
async fn test_category_rename_regenerates_slug_unless_explicit() {
    let service = category_service();
    let created = service
        .create(NewGalleryCategory {
            name: "Desfiles".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let renamed = service
        .update(
            created.id,
            GalleryCategoryPatch {
                name: Some("Desfiles Patrios".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(renamed.slug, "desfiles-patrios");

    let explicit = service
        .update(
            created.id,
            GalleryCategoryPatch {
                name: Some("Otro Nombre".to_string()),
                slug: Some("desfiles".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(explicit.name, "Otro Nombre");
    assert_eq!(explicit.slug, "desfiles");
}

#[tokio::test]
async fn test_category_lookup_by_slug() {
    let service = category_service();
    let created = service
        .create(NewGalleryCategory {
            name: "Ceremonias Cívicas".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(service.get_by_slug("ceremonias-civicas").await.unwrap(), Some(created));
    assert!(service.get_by_slug("desconocida").await.unwrap().is_none());
}

#[tokio::test]
async fn test_shared_slug_resolves_to_first_in_display_order() {
    let service = category_service();
    let later = service
        .create(NewGalleryCategory {
            name: "Desfiles".to_string(),
            display_order: Some(5),
            ..Default::default()
        })
        .await
        .unwrap();
    let earlier = service
        .create(NewGalleryCategory {
            name: "Desfiles!".to_string(),
            display_order: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(later.slug, earlier.slug);

    let found = service.get_by_slug("  DESFILES ").await.unwrap().unwrap();
    assert_eq!(found.id, earlier.id);
}

#[tokio::test]
async fn test_gallery_lookups_propagate_store_errors() {
    let categories = Arc::new(MemoryTable::<GalleryCategories>::default());
    let items = Arc::new(MemoryTable::<GalleryItems>::default());
    categories.set_unavailable(true);
    items.set_unavailable(true);

    let result = GalleryCategoryService::new(categories).get_by_slug("desfiles").await;
    assert!(matches!(result, Err(ServiceError::Repository(RepositoryError::Unavailable))));

    let result = GalleryItemService::new(items).list_by_category(Uuid::new_v4()).await;
    assert!(matches!(result, Err(ServiceError::Repository(RepositoryError::Unavailable))));
}

#[tokio::test]
async fn test_items_listed_by_category() {
    let items = GalleryItemService::new(Arc::new(MemoryTable::<GalleryItems>::default()));
    let parade = Uuid::new_v4();
    let ceremony = Uuid::new_v4();

    for (category, url) in [(parade, "a.jpg"), (ceremony, "b.jpg"), (parade, "c.mp4")] {
        items
            .create(NewGalleryItem {
                category_id: category,
                media_type: if url.ends_with(".mp4") { MediaType::Video } else { MediaType::Photo },
                media_url: url.to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
    }

    let urls: Vec<String> = items
        .list_by_category(parade)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.media_url)
        .collect();
    assert_eq!(urls, vec!["a.jpg", "c.mp4"]);
}

// --- Site config ---

#[tokio::test]
async fn test_update_config_creates_then_updates_single_row() {
    let repo = Arc::new(InMemorySiteConfig::default());
    let service = SiteConfigService::new(repo.clone());

    assert!(service.get_config().await.unwrap().is_none());

    let created = service
        .update_config(SiteConfigPatch {
            site_name: Some("Guardia de Honor".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(repo.row_count(), 1);

    let updated = service
        .update_config(SiteConfigPatch {
            tagline: Some("Disciplina y servicio".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(repo.row_count(), 1);
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.site_name, "Guardia de Honor");
    assert_eq!(updated.tagline.as_deref(), Some("Disciplina y servicio"));
}

#[tokio::test]
async fn test_first_config_without_name_defaults_to_empty() {
    let service = SiteConfigService::new(Arc::new(InMemorySiteConfig::default()));
    let created = service
        .update_config(SiteConfigPatch {
            contact_phone: Some("+51 999 999 999".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(created.site_name, "");
    assert_eq!(service.get_config().await.unwrap(), Some(created));
}
