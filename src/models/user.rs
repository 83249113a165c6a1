use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Argon2id PHC string, never serialized
    #[serde(skip_serializing)]
    pub password: String,
}
