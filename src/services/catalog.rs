//! Certification catalog service
//!
//! Read-only lookups over certifications used by the lifecycle engine.
//! Catalog data is seeded through `CertificationRepository` directly.

use crate::db::repositories::CertificationRepository;
use crate::models::{Certification, CertificationDuration, CertificationModule};
use anyhow::{Context, Result};
use std::sync::Arc;

pub struct CatalogService {
    repo: Arc<dyn CertificationRepository>,
}

impl CatalogService {
    pub fn new(repo: Arc<dyn CertificationRepository>) -> Self {
        Self { repo }
    }

    /// Get a certification with its syllabus
    pub async fn get(&self, id: i64) -> Result<Option<Certification>> {
        self.repo
            .get_by_id(id)
            .await
            .with_context(|| format!("Failed to load certification {}", id))
    }

    /// Mandatory modules of `certification`, in syllabus order
    pub async fn mandatory_modules(&self, certification: &Certification) -> Result<Vec<CertificationModule>> {
        self.repo
            .find_mandatory_modules(certification.id)
            .await
            .context("Failed to load mandatory modules")
    }

    pub fn duration(&self, certification: &Certification) -> Option<CertificationDuration> {
        certification.duration
    }

    /// The certification a card moves to when `certification` is renewed.
    ///
    /// `None` when no update certification is declared.
    pub async fn update_certification(&self, certification: &Certification) -> Result<Option<Certification>> {
        match certification.update_certification_id {
            Some(id) => self.get(id).await,
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxCertificationRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (Arc<dyn CertificationRepository>, CatalogService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        let repo = SqlxCertificationRepository::boxed(pool);
        (repo.clone(), CatalogService::new(repo))
    }

    #[tokio::test]
    async fn test_update_certification_lookup() {
        let (repo, catalog) = setup().await;
        let base = repo
            .create(&Certification::new("Base".to_string(), Some(CertificationDuration::years(3))))
            .await
            .unwrap();
        let update = repo
            .create(&Certification::new("Update".to_string(), Some(CertificationDuration::years(2))))
            .await
            .unwrap();
        repo.set_update_certification(base.id, Some(update.id)).await.unwrap();

        let base = catalog.get(base.id).await.unwrap().unwrap();
        let next = catalog.update_certification(&base).await.unwrap().expect("update certification");
        assert_eq!(next.id, update.id);
        assert_eq!(catalog.duration(&next), Some(CertificationDuration::years(2)));
        assert!(catalog.update_certification(&next).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mandatory_modules_excludes_optional() {
        let (repo, catalog) = setup().await;
        let cert = repo.create(&Certification::new("Cert".to_string(), None)).await.unwrap();
        let required = repo.create_module("Required").await.unwrap();
        let optional = repo.create_module("Optional").await.unwrap();
        repo.add_module(cert.id, optional.id, false).await.unwrap();
        repo.add_module(cert.id, required.id, true).await.unwrap();

        let modules = catalog.mandatory_modules(&cert).await.unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].module, required);
        assert!(catalog.duration(&cert).is_none());
    }
}
