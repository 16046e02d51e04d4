// CORS configuration for the machine directory API

use axum::http::{HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

/// Allow the configured origins, or any origin when the list contains `*`
pub fn apply_cors(router: Router, allowed_origins: &[String]) -> Router {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_headers(Any);

    if allowed_origins.iter().any(|o| o == "*") {
        return router.layer(layer.allow_origin(Any));
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    router.layer(layer.allow_origin(AllowOrigin::list(origins)))
}
