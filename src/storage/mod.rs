pub mod cached;
pub mod sqlite;
pub mod trait_def;

pub use cached::CachedAliasStore;
pub use sqlite::SqliteStorage;
pub use trait_def::{
    AliasStore, Storage, StorageError, StorageResult, UserStore, VisitRecorder,
};
