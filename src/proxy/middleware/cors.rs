use tower_http::cors::{Any, CorsLayer};

/// Permissive CORS for the dashboard frontend.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
