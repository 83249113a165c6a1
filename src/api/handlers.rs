use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::response::ApiResponse;
use crate::analytics::{enrich_visits, GeoLookup};
use crate::auth::{AuthService, AuthenticatedUser};
use crate::error::{AppError, Result};
use crate::models::{AliasListing, CreateUrlRequest, Page, User, Visit};
use crate::storage::{AliasStore, StorageError, VisitRecorder};

const ALIAS_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const MAX_ALIAS_LEN: usize = 64;
const MAX_GENERATION_ATTEMPTS: usize = 10;
/// First path segments owned by the service itself
const RESERVED_ALIASES: &[&str] = &["url", "auth", "health"];

pub struct AppState {
    pub aliases: Arc<dyn AliasStore>,
    pub visits: Arc<dyn VisitRecorder>,
    pub auth: Arc<AuthService>,
    pub geo: Option<Arc<dyn GeoLookup>>,
    /// Upper bound on the whole enrichment pass of one listing
    pub enrich_budget: Duration,
    pub alias_length: usize,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenInfo {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: &'static str,
}

#[derive(Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub response: ApiResponse,
    pub user: User,
    pub authorisation: TokenInfo,
}

#[derive(Serialize)]
pub struct CreateUrlResponse {
    #[serde(flatten)]
    pub response: ApiResponse,
    pub id: i64,
    pub alias: String,
}

#[derive(Serialize)]
pub struct UrlListResponse {
    #[serde(flatten)]
    pub response: ApiResponse,
    pub urls: Vec<AliasListing>,
}

#[derive(Serialize)]
pub struct RedirectInfoResponse {
    #[serde(flatten)]
    pub response: ApiResponse,
    #[serde(rename = "urlInfo")]
    pub url_info: Vec<Visit>,
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub start: Option<String>,
    pub length: Option<String>,
}

impl PageQuery {
    fn page(&self) -> Result<Page> {
        Ok(Page::parse(self.start.as_deref(), self.length.as_deref())?)
    }
}

/// Generate a random alphanumeric alias
pub fn generate_alias(length: usize) -> String {
    std::iter::repeat_with(|| ALIAS_CHARSET[rand::random_range(0..ALIAS_CHARSET.len())] as char)
        .take(length)
        .collect()
}

fn validate_alias(alias: &str) -> Result<()> {
    if alias.is_empty() || alias.len() > MAX_ALIAS_LEN {
        return Err(AppError::InvalidInput(format!(
            "field alias must be 1-{MAX_ALIAS_LEN} characters"
        )));
    }

    if !alias
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::InvalidInput(
            "field alias may only contain letters, digits, '-' and '_'".to_string(),
        ));
    }

    if RESERVED_ALIASES.contains(&alias) {
        return Err(AppError::InvalidInput(format!("alias '{alias}' is reserved")));
    }

    Ok(())
}

fn validate_url(url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|_| AppError::InvalidInput("field url is not a valid URL".to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::InvalidInput(
            "field url must use http or https".to_string(),
        ));
    }

    Ok(())
}

/// Exchange a username and password for a bearer token
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>> {
    let Json(payload) = payload.map_err(|err| {
        error!(error = %err, "failed to decode request body");
        AppError::InvalidInput("failed parse JSON body".to_string())
    })?;

    let (user, token) = state.auth.login(&payload.username, &payload.password).await?;
    info!(user_id = user.id, "user logged in");

    Ok(Json(LoginResponse {
        response: ApiResponse::ok(),
        user,
        authorisation: TokenInfo {
            token,
            token_type: "bearer",
        },
    }))
}

/// Create a new alias, generating one when the request has none
pub async fn create_url(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: std::result::Result<Json<CreateUrlRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateUrlResponse>)> {
    let Json(payload) = payload.map_err(|err| {
        error!(error = %err, "failed to decode request body");
        AppError::InvalidInput("failed parse JSON body".to_string())
    })?;

    validate_url(&payload.url)?;

    let (id, alias) = match payload.alias {
        Some(alias) => {
            validate_alias(&alias)?;
            let id = state.aliases.create(&payload.url, &alias, user.user_id).await?;
            (id, alias)
        }
        None => create_with_generated_alias(&state, &payload.url, user.user_id).await?,
    };

    info!(alias = %alias, id, user_id = user.user_id, "url added");

    Ok((
        StatusCode::CREATED,
        Json(CreateUrlResponse {
            response: ApiResponse::ok(),
            id,
            alias,
        }),
    ))
}

async fn create_with_generated_alias(
    state: &AppState,
    url: &str,
    owner: i64,
) -> Result<(i64, String)> {
    for _ in 0..MAX_GENERATION_ATTEMPTS {
        let alias = generate_alias(state.alias_length);
        if RESERVED_ALIASES.contains(&alias.as_str()) {
            continue;
        }

        match state.aliases.create(url, &alias, owner).await {
            Ok(id) => return Ok((id, alias)),
            Err(StorageError::Conflict) => continue,
            Err(err) => return Err(err.into()),
        }
    }

    Err(AppError::Storage(anyhow::anyhow!(
        "failed to generate a unique alias after {MAX_GENERATION_ATTEMPTS} attempts"
    )))
}

/// Delete an alias
pub async fn delete_url(
    State(state): State<Arc<AppState>>,
    Path(alias): Path<String>,
) -> Result<Json<ApiResponse>> {
    state.aliases.delete(&alias).await?;
    info!(alias = %alias, "url deleted");

    Ok(Json(ApiResponse::ok()))
}

/// List aliases with their owners
pub async fn list_urls(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<UrlListResponse>> {
    let page = query.page()?;
    let urls = state.aliases.list_aliases(page).await?;

    Ok(Json(UrlListResponse {
        response: ApiResponse::ok(),
        urls,
    }))
}

/// List recorded visits, enriched with location when a provider is configured
pub async fn list_redirect_info(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<RedirectInfoResponse>> {
    let page = query.page()?;
    let mut visits = state.visits.list_visits(page).await?;

    if let Some(geo) = &state.geo {
        let enrichment = enrich_visits(&mut visits, geo.as_ref(), state.visits.as_ref());
        if tokio::time::timeout(state.enrich_budget, enrichment).await.is_err() {
            warn!(
                budget_ms = state.enrich_budget.as_millis() as u64,
                "geo enrichment budget exhausted, returning visits as stored"
            );
        }
    }

    Ok(Json(RedirectInfoResponse {
        response: ApiResponse::ok(),
        url_info: visits,
    }))
}

/// Health check endpoint
pub async fn health_check() -> Json<ApiResponse> {
    Json(ApiResponse::ok())
}
