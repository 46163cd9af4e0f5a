//! Reorderable CRUD resources.
//!
//! Every content type managed from the admin panel (shield values, history,
//! leaders, gallery categories and items) shares the same contract:
//! list, get, create, partial update, delete and reorder by `displayOrder`.
//! A resource is described once by a marker type implementing [`Resource`];
//! repositories, services and handlers are generic over it.

use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    GalleryCategory, GalleryCategoryPatch, GalleryItem, GalleryItemPatch, HistoricalMilestone,
    Leader, LeaderPatch, MilestonePatch, NewGalleryCategory, NewGalleryItem, NewLeader,
    NewMilestone, NewShieldValue, ShieldValue, ShieldValuePatch,
};
use crate::repository::{GalleryCategoryRepository, GalleryItemRepository, ResourceRepository};
use crate::slug::{explicit_slug, generate_slug};

/// Resource
///
/// Binds an entity to its create and patch payloads. The two `prepare_*` hooks
/// run in the service before the payload reaches the repository.
pub trait Resource: Send + Sync + 'static + Sized {
    /// Human-readable name used in logs.
    const NAME: &'static str;

    type Entity: Serialize + Clone + Send + Sync + 'static;
    type Create: DeserializeOwned + Validate + Send + 'static;
    type Update: DeserializeOwned + Validate + Send + 'static;
    /// Repository handle held by the service. Resources with extra lookups
    /// name a subtrait of `ResourceRepository` here.
    type Repository: ?Sized + ResourceRepository<Self>;

    fn id(entity: &Self::Entity) -> Uuid;
    fn display_order(entity: &Self::Entity) -> i32;

    fn prepare_create(_data: &mut Self::Create) {}
    fn prepare_update(_patch: &mut Self::Update) {}
}

pub struct ShieldValues;
pub struct Milestones;
pub struct Leaders;
pub struct GalleryCategories;
pub struct GalleryItems;

impl Resource for ShieldValues {
    const NAME: &'static str = "shield value";
    type Entity = ShieldValue;
    type Create = NewShieldValue;
    type Update = ShieldValuePatch;
    type Repository = dyn ResourceRepository<Self>;

    fn id(entity: &ShieldValue) -> Uuid {
        entity.id
    }
    fn display_order(entity: &ShieldValue) -> i32 {
        entity.display_order
    }
}

impl Resource for Milestones {
    const NAME: &'static str = "historical milestone";
    type Entity = HistoricalMilestone;
    type Create = NewMilestone;
    type Update = MilestonePatch;
    type Repository = dyn ResourceRepository<Self>;

    fn id(entity: &HistoricalMilestone) -> Uuid {
        entity.id
    }
    fn display_order(entity: &HistoricalMilestone) -> i32 {
        entity.display_order
    }
}

impl Resource for Leaders {
    const NAME: &'static str = "leader";
    type Entity = Leader;
    type Create = NewLeader;
    type Update = LeaderPatch;
    type Repository = dyn ResourceRepository<Self>;

    fn id(entity: &Leader) -> Uuid {
        entity.id
    }
    fn display_order(entity: &Leader) -> i32 {
        entity.display_order
    }
}

impl Resource for GalleryCategories {
    const NAME: &'static str = "gallery category";
    type Entity = GalleryCategory;
    type Create = NewGalleryCategory;
    type Update = GalleryCategoryPatch;
    type Repository = dyn GalleryCategoryRepository;

    fn id(entity: &GalleryCategory) -> Uuid {
        entity.id
    }
    fn display_order(entity: &GalleryCategory) -> i32 {
        entity.display_order
    }

    /// A missing or blank slug is derived from the name.
    fn prepare_create(data: &mut NewGalleryCategory) {
        data.slug = Some(explicit_slug(data.slug.as_deref()).unwrap_or_else(|| generate_slug(&data.name)));
    }

    /// A renamed category without an explicit slug gets a fresh one.
    fn prepare_update(patch: &mut GalleryCategoryPatch) {
        patch.slug = match (explicit_slug(patch.slug.as_deref()), patch.name.as_deref()) {
            (Some(slug), _) => Some(slug),
            (None, Some(name)) => Some(generate_slug(name)),
            (None, None) => None,
        };
    }
}

impl Resource for GalleryItems {
    const NAME: &'static str = "gallery item";
    type Entity = GalleryItem;
    type Create = NewGalleryItem;
    type Update = GalleryItemPatch;
    type Repository = dyn GalleryItemRepository;

    fn id(entity: &GalleryItem) -> Uuid {
        entity.id
    }
    fn display_order(entity: &GalleryItem) -> i32 {
        entity.display_order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_create_derives_missing_slug() {
        let mut data = NewGalleryCategory {
            name: "Ceremonias Cívicas".to_string(),
            ..Default::default()
        };
        GalleryCategories::prepare_create(&mut data);
        assert_eq!(data.slug.as_deref(), Some("ceremonias-civicas"));
    }

    #[test]
    fn category_create_keeps_explicit_slug() {
        let mut data = NewGalleryCategory {
            name: "Ceremonias".to_string(),
            slug: Some("actos".to_string()),
            ..Default::default()
        };
        GalleryCategories::prepare_create(&mut data);
        assert_eq!(data.slug.as_deref(), Some("actos"));
    }

    #[test]
    fn category_rename_regenerates_slug() {
        let mut patch = GalleryCategoryPatch {
            name: Some("Desfiles Patrios".to_string()),
            ..Default::default()
        };
        GalleryCategories::prepare_update(&mut patch);
        assert_eq!(patch.slug.as_deref(), Some("desfiles-patrios"));
    }

    #[test]
    fn category_patch_without_name_leaves_slug_alone() {
        let mut patch = GalleryCategoryPatch {
            description: Some("Nueva descripción".to_string()),
            ..Default::default()
        };
        GalleryCategories::prepare_update(&mut patch);
        assert!(patch.slug.is_none());
    }
}
