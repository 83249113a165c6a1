use crate::models::{AliasListing, GeoLocation, NewVisit, Page, User, Visit};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StorageError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StorageError::Conflict
            }
            _ => StorageError::Other(err.into()),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Alias to target URL mapping. Uniqueness of `alias` is enforced by the backend.
#[async_trait]
pub trait AliasStore: Send + Sync {
    /// Insert a new alias, returning its id. `Conflict` if the alias is taken.
    async fn create(&self, target_url: &str, alias: &str, owner_user_id: i64)
        -> StorageResult<i64>;

    /// Look up the target URL for an alias. `NotFound` if absent.
    async fn resolve(&self, alias: &str) -> StorageResult<String>;

    /// Remove an alias. `NotFound` if no row was affected.
    async fn delete(&self, alias: &str) -> StorageResult<()>;

    async fn list_aliases(&self, page: Page) -> StorageResult<Vec<AliasListing>>;
}

/// Append-only log of redirect visits
#[async_trait]
pub trait VisitRecorder: Send + Sync {
    async fn save_visit(&self, visit: &NewVisit) -> StorageResult<i64>;

    async fn list_visits(&self, page: Page) -> StorageResult<Vec<Visit>>;

    /// Attach a resolved location to a stored visit
    async fn enrich_visit(&self, id: i64, location: &GeoLocation) -> StorageResult<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, username: &str, password_hash: &str) -> StorageResult<i64>;

    async fn get_user(&self, username: &str) -> StorageResult<User>;
}

/// A full backend: schema management plus every store the service needs
#[async_trait]
pub trait Storage: AliasStore + VisitRecorder + UserStore {
    /// Initialize the storage (create tables and indexes)
    async fn init(&self) -> Result<()>;
}
