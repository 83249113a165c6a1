use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::analytics::{GeoLookup, IpApiLookup, MaxMindLookup};
use crate::api::{create_api_router, AppState};
use crate::config::{GeoIpConfig, GeoIpProvider};
use crate::redirect::create_redirect_router;

/// Build the geo lookup provider selected in configuration, if any
pub fn create_geo_lookup(config: &GeoIpConfig) -> Result<Option<Arc<dyn GeoLookup>>> {
    let lookup: Option<Arc<dyn GeoLookup>> = match config.provider {
        GeoIpProvider::None => None,
        GeoIpProvider::IpApi => Some(Arc::new(IpApiLookup::new(
            &config.ip_api_url,
            Duration::from_millis(config.timeout_ms),
        )?)),
        GeoIpProvider::Maxmind => {
            let path = config.mmdb_path.as_deref().unwrap_or_default();
            Some(Arc::new(MaxMindLookup::new(path)?))
        }
    };

    Ok(lookup)
}

/// Assemble the full application: management API, redirect routes and the
/// shared HTTP layers
pub fn create_app(state: Arc<AppState>, strict_status_codes: bool, timeout: Duration) -> Router {
    let redirect_router = create_redirect_router(
        Arc::clone(&state.aliases),
        Arc::clone(&state.visits),
        strict_status_codes,
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(300));

    create_api_router(state)
        .merge(redirect_router)
        .layer(cors)
        .layer(TimeoutLayer::new(timeout))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
