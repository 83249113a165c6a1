use axum::{routing::get, Router};
use std::sync::Arc;

use crate::storage::{AliasStore, VisitRecorder};

use super::handlers::{missing_alias, redirect_url, RedirectState};
use super::resolver::RedirectResolver;

pub fn create_redirect_router(
    aliases: Arc<dyn AliasStore>,
    visits: Arc<dyn VisitRecorder>,
    strict_status_codes: bool,
) -> Router {
    let state = Arc::new(RedirectState {
        resolver: RedirectResolver::new(aliases, visits),
        strict_status_codes,
    });

    Router::new()
        .route("/", get(missing_alias))
        .route("/{alias}", get(redirect_url))
        .with_state(state)
}
