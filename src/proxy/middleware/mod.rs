// Middleware module - axum middleware

pub mod access_gate;
pub mod cors;
pub mod logging;

pub use access_gate::access_gate_middleware;
pub use cors::cors_layer;
pub use logging::request_log_middleware;
