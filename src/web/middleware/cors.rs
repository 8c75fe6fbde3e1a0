//! CORS middleware configuration.

use axum::http::header::{ACCEPT, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

const METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// Create a CORS layer from configuration.
///
/// An empty list (or a list with no parseable origin) allows any origin.
pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let parsed_origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

    let allow_origin = if parsed_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(parsed_origins)
    };

    CorsLayer::new()
        .allow_methods(METHODS)
        .allow_headers([CONTENT_TYPE, ACCEPT])
        .expose_headers([CONTENT_DISPOSITION])
        .allow_origin(allow_origin)
}
