//! Authentication for the management API.
//!
//! `AuthService` is built once at startup from configuration and handed to
//! the router; there is no process-wide signer. In `jwt` mode requests carry
//! `Authorization: Bearer <token>` issued by [`AuthService::login`]. In
//! `basic` mode they carry `Authorization: Basic`, checked against the users
//! table on every request.

pub mod password;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::prelude::*;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{AuthConfig, AuthMode};
use crate::error::AppError;
use crate::models::User;
use crate::storage::{StorageError, UserStore};

pub use password::{hash_password, verify_password, PasswordError};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing or malformed Authorization header")]
    MissingCredentials,
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials | AuthError::InvalidToken(_) => AppError::Unauthorized,
            AuthError::InvalidCredentials => AppError::InvalidCredentials,
            AuthError::InvalidInput(msg) => AppError::InvalidInput(msg),
            AuthError::Password(err) => AppError::Storage(err.into()),
            AuthError::Storage(err) => err.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub exp: u64,
}

/// Identity attached to a request by [`auth_middleware`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i64,
}

pub struct AuthService {
    mode: AuthMode,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl_secs: i64,
    users: Arc<dyn UserStore>,
}

impl AuthService {
    pub fn new(config: &AuthConfig, users: Arc<dyn UserStore>) -> Self {
        let secret = config.jwt_secret.as_bytes();

        Self {
            mode: config.mode,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            token_ttl_secs: config.token_ttl_hours * 3600,
            users,
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn issue_token(&self, user_id: i64) -> Result<String, AuthError> {
        let exp = chrono::Utc::now().timestamp() + self.token_ttl_secs;
        let claims = Claims {
            user_id,
            exp: exp.max(0) as u64,
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        )?;
        Ok(data.claims)
    }

    /// Check a username and password, returning the user and a fresh token
    pub async fn login(&self, username: &str, password: &str) -> Result<(User, String), AuthError> {
        validate_login(username, password)?;

        let user = self.check_password(username, password).await?;
        let token = self.issue_token(user.id)?;

        Ok((user, token))
    }

    /// Authenticate a request according to the configured mode
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, AuthError> {
        let value = headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::MissingCredentials)?;

        match self.mode {
            AuthMode::Jwt => {
                let token = strip_scheme(value, "Bearer").ok_or(AuthError::MissingCredentials)?;
                let claims = self.verify_token(token)?;
                Ok(AuthenticatedUser {
                    user_id: claims.user_id,
                })
            }
            AuthMode::Basic => {
                let encoded = strip_scheme(value, "Basic").ok_or(AuthError::MissingCredentials)?;
                let (username, password) = decode_basic(encoded)?;
                let user = self.check_password(&username, &password).await?;
                Ok(AuthenticatedUser { user_id: user.id })
            }
        }
    }

    async fn check_password(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let user = match self.users.get_user(username).await {
            Ok(user) => user,
            Err(StorageError::NotFound) => {
                debug!(username = %username, "user doesn't exist");
                return Err(AuthError::InvalidCredentials);
            }
            Err(err) => return Err(AuthError::Storage(err)),
        };

        if !verify_password(password, &user.password)? {
            debug!(username = %username, "invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }
}

/// Username 3-50 alphanumeric characters, password at least 8 characters
pub fn validate_login(username: &str, password: &str) -> Result<(), AuthError> {
    let len = username.chars().count();
    if !(3..=50).contains(&len) || !username.chars().all(char::is_alphanumeric) {
        return Err(AuthError::InvalidInput(
            "field username must be 3-50 alphanumeric characters".to_string(),
        ));
    }

    if password.chars().count() < 8 {
        return Err(AuthError::InvalidInput(
            "field password must be at least 8 characters".to_string(),
        ));
    }

    Ok(())
}

fn strip_scheme<'a>(value: &'a str, scheme: &str) -> Option<&'a str> {
    let (given, rest) = value.split_once(' ')?;
    given
        .eq_ignore_ascii_case(scheme)
        .then(|| rest.trim())
        .filter(|rest| !rest.is_empty())
}

fn decode_basic(encoded: &str) -> Result<(String, String), AuthError> {
    let bytes = BASE64_STANDARD
        .decode(encoded)
        .map_err(|_| AuthError::MissingCredentials)?;
    let text = String::from_utf8(bytes).map_err(|_| AuthError::MissingCredentials)?;
    let (username, password) = text.split_once(':').ok_or(AuthError::MissingCredentials)?;

    Ok((username.to_string(), password.to_string()))
}

pub async fn auth_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    match auth_service.authenticate(request.headers()).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(err) => {
            warn!(error = %err, path = %request.uri().path(), "rejected unauthenticated request");
            AppError::from(err).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{SqliteStorage, Storage};
    use axum::http::HeaderValue;

    fn config(mode: AuthMode) -> AuthConfig {
        AuthConfig {
            mode,
            jwt_secret: "unit-test-secret".to_string(),
            token_ttl_hours: 72,
        }
    }

    async fn service(mode: AuthMode) -> AuthService {
        let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
        storage.init().await.unwrap();
        storage
            .create_user("admin", &hash_password("password123").unwrap())
            .await
            .unwrap();
        AuthService::new(&config(mode), Arc::new(storage))
    }

    #[tokio::test]
    async fn token_round_trip_carries_user_id() {
        let auth = service(AuthMode::Jwt).await;
        let token = auth.issue_token(7).unwrap();
        assert_eq!(auth.verify_token(&token).unwrap().user_id, 7);
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_rejected() {
        let auth = service(AuthMode::Jwt).await;
        let mut other_config = config(AuthMode::Jwt);
        other_config.jwt_secret = "someone-else".to_string();
        let other = AuthService::new(&other_config, Arc::new(NoUsers));

        let token = other.issue_token(1).unwrap();
        assert!(matches!(
            auth.verify_token(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn login_checks_password() {
        let auth = service(AuthMode::Jwt).await;

        let (user, token) = auth.login("admin", "password123").await.unwrap();
        assert_eq!(user.username, "admin");
        assert_eq!(auth.verify_token(&token).unwrap().user_id, user.id);

        assert!(matches!(
            auth.login("admin", "wrongpassword").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody", "password123").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn login_validates_shape() {
        let auth = service(AuthMode::Jwt).await;
        assert!(matches!(
            auth.login("ab", "password123").await,
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            auth.login("admin!", "password123").await,
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            auth.login("admin", "short").await,
            Err(AuthError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn bearer_header_authenticates_in_jwt_mode() {
        let auth = service(AuthMode::Jwt).await;
        let token = auth.issue_token(3).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        assert_eq!(
            auth.authenticate(&headers).await.unwrap(),
            AuthenticatedUser { user_id: 3 }
        );

        assert!(matches!(
            auth.authenticate(&HeaderMap::new()).await,
            Err(AuthError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn basic_header_authenticates_in_basic_mode() {
        let auth = service(AuthMode::Basic).await;
        let encoded = BASE64_STANDARD.encode("admin:password123");

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {encoded}")).unwrap(),
        );
        assert!(auth.authenticate(&headers).await.is_ok());

        let wrong = BASE64_STANDARD.encode("admin:nope");
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {wrong}")).unwrap(),
        );
        assert!(matches!(
            auth.authenticate(&headers).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn scheme_is_case_insensitive() {
        assert_eq!(strip_scheme("bearer abc", "Bearer"), Some("abc"));
        assert_eq!(strip_scheme("Bearer ", "Bearer"), None);
        assert_eq!(strip_scheme("Basic abc", "Bearer"), None);
    }

    struct NoUsers;

    #[async_trait::async_trait]
    impl UserStore for NoUsers {
        async fn create_user(&self, _: &str, _: &str) -> crate::storage::StorageResult<i64> {
            Err(StorageError::Conflict)
        }

        async fn get_user(&self, _: &str) -> crate::storage::StorageResult<User> {
            Err(StorageError::NotFound)
        }
    }
}
