//! HTTP server for the example pages

use std::net::SocketAddr;

use axum::{extract::Path, response::Response, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use driverkit_harness::config::FixtureConfig;

use crate::error::{FixtureError, FixtureResult};
use crate::pages;

pub struct FixtureServer {
    config: FixtureConfig,
}

impl FixtureServer {
    pub fn new(config: FixtureConfig) -> Self {
        Self { config }
    }

    pub fn router() -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/:page", get(page_handler))
            .layer(TraceLayer::new_for_http())
    }

    /// Bind and serve in the background. Port 0 picks a free port.
    pub async fn start(self) -> FixtureResult<FixtureHandle> {
        if !self.config.enabled {
            return Err(FixtureError::Disabled);
        }

        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| FixtureError::Bind { addr, source })?;
        let addr = listener.local_addr()?;

        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, Self::router())
                .with_graceful_shutdown(async {
                    let _ = signal.await;
                })
                .await
        });

        info!("Example pages served on http://{}", addr);
        Ok(FixtureHandle {
            addr,
            shutdown: Some(shutdown),
            task,
        })
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn page_handler(Path(page): Path<String>) -> Response {
    pages::serve_page(&page)
}

/// Running fixture server. Dropping the handle stops it.
pub struct FixtureHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<std::io::Result<()>>,
}

impl FixtureHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, page: &str) -> String {
        format!("{}/{}", self.base_url(), page.trim_start_matches('/'))
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(mut self) -> FixtureResult<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match (&mut self.task).await {
            Ok(result) => Ok(result?),
            Err(e) => Err(FixtureError::Task(e.to_string())),
        }
    }
}

impl Drop for FixtureHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            if tx.send(()).is_err() {
                warn!("Fixture server already stopped");
            }
        }
    }
}
