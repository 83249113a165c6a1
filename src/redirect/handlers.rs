use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;

use super::resolver::RedirectResolver;
use crate::error::AppError;

pub struct RedirectState {
    pub resolver: RedirectResolver,
    /// Send 4xx/5xx with error bodies instead of 200
    pub strict_status_codes: bool,
}

impl RedirectState {
    fn error_response(&self, err: AppError) -> Response {
        let status = if self.strict_status_codes {
            err.status_code()
        } else {
            StatusCode::OK
        };
        err.into_response_with_status(status)
    }
}

/// Redirect to the URL stored under `alias` with 302 Found
pub async fn redirect_url(
    State(state): State<Arc<RedirectState>>,
    Path(alias): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    match state
        .resolver
        .resolve(&alias, &headers, &addr.to_string())
        .await
    {
        Ok(url) => (StatusCode::FOUND, [(header::LOCATION, url)]).into_response(),
        Err(err) => state.error_response(err),
    }
}

/// `GET /` carries no alias
pub async fn missing_alias(State(state): State<Arc<RedirectState>>) -> Response {
    tracing::info!("alias is empty");
    state.error_response(AppError::InvalidRequest)
}
