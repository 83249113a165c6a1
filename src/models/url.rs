use serde::{Deserialize, Serialize};

/// Identity of the user that created an alias
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: i64,
    pub username: String,
}

/// Row of the alias listing, joined with the owner identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasListing {
    pub alias: String,
    pub url: String,
    pub user: Owner,
}

#[derive(Debug, Deserialize)]
pub struct CreateUrlRequest {
    pub url: String,
    #[serde(default)]
    pub alias: Option<String>,
}
