//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the axum router around a `Dispatcher`
//! - Bind server to listener
//! - Drain in-flight requests on shutdown

use axum::Router;
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::http::dispatch::Dispatcher;

/// HTTP server for compiled routes.
pub struct RouteServer {
    router: Router,
}

impl RouteServer {
    pub fn new(dispatcher: Dispatcher, config: &ServerConfig) -> Self {
        let router = dispatcher.into_router(Duration::from_secs(config.request_timeout_secs));
        Self { router }
    }

    /// The router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` resolves, then finish in-flight requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
