//! HTTP ingress: configuration, middleware, handlers and the server lifecycle.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod module;

pub use config::NetworkConfig;
pub use error::ApiError;
pub use handlers::AppState;
pub use module::{build_router, NetworkModule};
