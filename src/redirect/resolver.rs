use axum::http::HeaderMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::analytics::extract_provenance;
use crate::error::AppError;
use crate::storage::{AliasStore, StorageError, VisitRecorder};

/// Alias resolution with visit recording.
///
/// Steps run in a fixed order: validate the alias, extract provenance, save
/// the visit, resolve. Visit recording is telemetry: its failure is logged
/// and never changes the outcome. Nothing is retried.
pub struct RedirectResolver {
    aliases: Arc<dyn AliasStore>,
    visits: Arc<dyn VisitRecorder>,
}

impl RedirectResolver {
    pub fn new(aliases: Arc<dyn AliasStore>, visits: Arc<dyn VisitRecorder>) -> Self {
        Self { aliases, visits }
    }

    /// Returns the target URL for `alias`
    pub async fn resolve(
        &self,
        alias: &str,
        headers: &HeaderMap,
        remote_addr: &str,
    ) -> Result<String, AppError> {
        if alias.is_empty() {
            info!("alias is empty");
            return Err(AppError::InvalidRequest);
        }

        let visit = extract_provenance(headers, remote_addr);
        if let Err(err) = self.visits.save_visit(&visit).await {
            warn!(alias = %alias, ip = %visit.ip, error = %err, "failed to save redirect info");
        }

        match self.aliases.resolve(alias).await {
            Ok(url) => {
                info!(alias = %alias, url = %url, "got url");
                Ok(url)
            }
            Err(StorageError::NotFound) => {
                info!(alias = %alias, "url not found");
                Err(AppError::NotFound)
            }
            Err(err) => {
                error!(alias = %alias, error = %err, "failed to get url");
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AliasListing, GeoLocation, NewVisit, Page, Visit};
    use crate::storage::StorageResult;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryRecorder {
        saved: Mutex<Vec<NewVisit>>,
    }

    #[async_trait]
    impl VisitRecorder for MemoryRecorder {
        async fn save_visit(&self, visit: &NewVisit) -> StorageResult<i64> {
            let mut saved = self.saved.lock().unwrap();
            saved.push(visit.clone());
            Ok(saved.len() as i64)
        }

        async fn list_visits(&self, _page: Page) -> StorageResult<Vec<Visit>> {
            Ok(vec![])
        }

        async fn enrich_visit(&self, _id: i64, _location: &GeoLocation) -> StorageResult<()> {
            Ok(())
        }
    }

    struct BrokenAliases;

    #[async_trait]
    impl AliasStore for BrokenAliases {
        async fn create(&self, _: &str, _: &str, _: i64) -> StorageResult<i64> {
            Err(StorageError::Other(anyhow::anyhow!("database is locked")))
        }

        async fn resolve(&self, _alias: &str) -> StorageResult<String> {
            Err(StorageError::Other(anyhow::anyhow!("database is locked")))
        }

        async fn delete(&self, _alias: &str) -> StorageResult<()> {
            Err(StorageError::Other(anyhow::anyhow!("database is locked")))
        }

        async fn list_aliases(&self, _page: Page) -> StorageResult<Vec<AliasListing>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn empty_alias_is_rejected_before_recording() {
        let recorder = Arc::new(MemoryRecorder::default());
        let resolver = RedirectResolver::new(Arc::new(BrokenAliases), recorder.clone());

        let err = resolver
            .resolve("", &HeaderMap::new(), "127.0.0.1:1")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidRequest));
        assert!(recorder.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn storage_failure_is_internal_error_after_recording() {
        let recorder = Arc::new(MemoryRecorder::default());
        let resolver = RedirectResolver::new(Arc::new(BrokenAliases), recorder.clone());

        let err = resolver
            .resolve("abc", &HeaderMap::new(), "198.51.100.7:54321")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(err.to_string(), "internal error");

        let saved = recorder.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].ip, "198.51.100.7");
    }
}
