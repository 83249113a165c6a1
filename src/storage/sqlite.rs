use crate::models::{AliasListing, GeoLocation, NewVisit, Owner, Page, User, Visit};
use crate::storage::{AliasStore, Storage, StorageError, StorageResult, UserStore, VisitRecorder};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database url '{database_url}'"))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("failed to open sqlite database")?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS url (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                alias TEXT NOT NULL UNIQUE,
                user_id INTEGER NOT NULL REFERENCES users(id)
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_alias ON url(alias)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS url_redirection_info (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ip TEXT NOT NULL,
                os TEXT NOT NULL,
                platform TEXT NOT NULL,
                browser TEXT NOT NULL,
                created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
                country TEXT,
                city TEXT,
                country_code TEXT
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }
}

#[async_trait]
impl AliasStore for SqliteStorage {
    async fn create(
        &self,
        target_url: &str,
        alias: &str,
        owner_user_id: i64,
    ) -> StorageResult<i64> {
        // A unique violation on `alias` surfaces as StorageError::Conflict
        let result = sqlx::query("INSERT INTO url (url, alias, user_id) VALUES (?, ?, ?)")
            .bind(target_url)
            .bind(alias)
            .bind(owner_user_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.last_insert_rowid())
    }

    async fn resolve(&self, alias: &str) -> StorageResult<String> {
        let url = sqlx::query_scalar::<_, String>("SELECT url FROM url WHERE alias = ?")
            .bind(alias)
            .fetch_optional(self.pool.as_ref())
            .await?;

        url.ok_or(StorageError::NotFound)
    }

    async fn delete(&self, alias: &str) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM url WHERE alias = ?")
            .bind(alias)
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }

    async fn list_aliases(&self, page: Page) -> StorageResult<Vec<AliasListing>> {
        let rows = sqlx::query_as::<_, (String, String, i64, String)>(
            r#"
            SELECT u.alias, u.url, us.id, us.username
            FROM url u
            INNER JOIN users us ON u.user_id = us.id
            ORDER BY u.id
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool.as_ref())
        .await?;

        let listings = rows
            .into_iter()
            .map(|(alias, url, id, username)| AliasListing {
                alias,
                url,
                user: Owner { id, username },
            })
            .collect();

        Ok(listings)
    }
}

#[async_trait]
impl VisitRecorder for SqliteStorage {
    async fn save_visit(&self, visit: &NewVisit) -> StorageResult<i64> {
        let result = sqlx::query(
            "INSERT INTO url_redirection_info (ip, os, platform, browser) VALUES (?, ?, ?, ?)",
        )
        .bind(&visit.ip)
        .bind(&visit.os)
        .bind(&visit.platform)
        .bind(&visit.browser)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn list_visits(&self, page: Page) -> StorageResult<Vec<Visit>> {
        let visits = sqlx::query_as::<_, Visit>(
            r#"
            SELECT id, ip, os, platform, browser, created_at, country, city, country_code
            FROM url_redirection_info
            ORDER BY id
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(visits)
    }

    async fn enrich_visit(&self, id: i64, location: &GeoLocation) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE url_redirection_info
            SET country = ?, city = ?, country_code = ?
            WHERE id = ?
            "#,
        )
        .bind(&location.country)
        .bind(&location.city)
        .bind(&location.country_code)
        .bind(id)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }
}

#[async_trait]
impl UserStore for SqliteStorage {
    async fn create_user(&self, username: &str, password_hash: &str) -> StorageResult<i64> {
        let result = sqlx::query("INSERT INTO users (username, password) VALUES (?, ?)")
            .bind(username)
            .bind(password_hash)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.last_insert_rowid())
    }

    async fn get_user(&self, username: &str) -> StorageResult<User> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(self.pool.as_ref())
        .await?;

        user.ok_or(StorageError::NotFound)
    }
}
