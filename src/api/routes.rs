use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::auth::auth_middleware;
use crate::config::AuthMode;

use super::handlers::{
    create_url, delete_url, health_check, list_redirect_info, list_urls, login, AppState,
};

pub fn create_api_router(state: Arc<AppState>) -> Router {
    let auth_service = Arc::clone(&state.auth);
    let login_enabled = auth_service.mode() == AuthMode::Jwt;

    let protected_routes = Router::new()
        .route("/url", post(create_url).get(list_urls))
        .route("/url/redirect-info", get(list_redirect_info))
        .route("/url/{alias}", delete(delete_url))
        .route_layer(middleware::from_fn_with_state(auth_service, auth_middleware))
        .with_state(Arc::clone(&state));

    let mut router = Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes);

    // Tokens are only accepted in jwt mode, so only issue them there
    if login_enabled {
        router = router.merge(
            Router::new()
                .route("/auth/login", post(login))
                .with_state(state),
        );
    }

    router
}
