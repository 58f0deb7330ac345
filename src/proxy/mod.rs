// proxy module - authenticated gateway in front of the device-management API

pub mod client;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod upstream;

pub use client::ApiClient;
pub use error::GatewayError;
pub use server::{AppState, AxumServer};
pub use upstream::UpstreamClient;
