use std::sync::Arc;

use super::ServiceError;
use crate::models::{SiteConfig, SiteConfigPatch};
use crate::repository::SiteConfigRepository;

/// SiteConfigService
///
/// Keeps the site configuration a singleton: the first write creates the row,
/// later writes patch it.
#[derive(Clone)]
pub struct SiteConfigService {
    repo: Arc<dyn SiteConfigRepository>,
}

impl SiteConfigService {
    pub fn new(repo: Arc<dyn SiteConfigRepository>) -> Self {
        Self { repo }
    }

    pub async fn get_config(&self) -> Result<Option<SiteConfig>, ServiceError> {
        Ok(self.repo.get_current().await?)
    }

    pub async fn update_config(&self, patch: SiteConfigPatch) -> Result<SiteConfig, ServiceError> {
        match self.repo.get_current().await? {
            Some(current) => {
                let updated = self
                    .repo
                    .update(current.id, patch)
                    .await?
                    // Row vanished between read and write.
                    .ok_or(ServiceError::NotFound("site config"))?;
                tracing::info!("Site config updated");
                Ok(updated)
            }
            None => {
                let created = self.repo.create(patch).await?;
                tracing::info!("Site config created");
                Ok(created)
            }
        }
    }
}
