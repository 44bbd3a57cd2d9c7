//! Network module with deferred startup lifecycle.
//!
//! `new()` takes the shared state, `start()` binds the TCP listener and
//! `serve()` accepts connections until shutdown. Binding separately lets the
//! binary report an occupied port before anything else is spawned.

use std::future::Future;

use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    get_log_level_handler, not_found_handler, set_log_level_handler, update_context_handler,
    version_handler, AppState,
};
use super::middleware::{build_http_layers, correlate};

pub const UPDATE_CONTEXT_ROUTE: &str = "/v1/updateContext";
pub const ADMIN_LOG_ROUTE: &str = "/admin/log";
pub const VERSION_ROUTE: &str = "/version";

/// Assembles the router with all routes and middleware.
///
/// Routes:
/// - `POST /v1/updateContext` -- inbound commands
/// - `GET /admin/log` / `PUT /admin/log?level=` -- runtime log level
/// - `GET /version` -- crate version
///
/// Anything else, including a wrong method on a known path, answers 404.
pub fn build_router(config: &NetworkConfig, state: AppState) -> Router {
    Router::new()
        .route(UPDATE_CONTEXT_ROUTE, post(update_context_handler))
        .route(
            ADMIN_LOG_ROUTE,
            get(get_log_level_handler).put(set_log_level_handler),
        )
        .route(VERSION_ROUTE, get(version_handler))
        .fallback(not_found_handler)
        .method_not_allowed_fallback(not_found_handler)
        .layer(axum::middleware::from_fn_with_state(
            state.stats.clone(),
            correlate,
        ))
        .layer(build_http_layers(config))
        .with_state(state)
}

/// Owns the listener and the HTTP server lifecycle.
pub struct NetworkModule {
    config: NetworkConfig,
    state: AppState,
    listener: Option<TcpListener>,
}

impl NetworkModule {
    /// Creates the module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, state: AppState) -> Self {
        Self {
            config,
            state,
            listener: None,
        }
    }

    #[must_use]
    pub fn build_router(&self) -> Router {
        build_router(&self.config, self.state.clone())
    }

    /// Binds the TCP listener and returns the bound port, which differs from
    /// the configured one when port 0 is used.
    ///
    /// # Errors
    ///
    /// Returns the bind error (e.g. address in use) with the address attached.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = self.config.bind_address();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves requests until `shutdown` resolves, then shuts the command
    /// dispatcher down according to its drain policy.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first or the server hits
    /// a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .context("start() must be called before serve()")?;
        let router = self.build_router();

        info!("Serving HTTP connections");
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        if self.state.dispatcher.shutdown().await {
            info!("Command dispatcher stopped");
        } else {
            warn!("Command dispatcher stopped with pipelines still running");
        }
        Ok(())
    }
}
