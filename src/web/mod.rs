//! HTTP interface: the sync trigger, the public read endpoints and the
//! admin operations on devotionals.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};
use chrono::FixedOffset;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::sync::SyncService;

pub mod api;

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<Repository>,
    pub sync: Arc<SyncService>,
    pub feed_url: Option<String>,
    pub offset: FixedOffset,
    pub sync_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(
        repository: Arc<Repository>,
        sync: Arc<SyncService>,
        feed_url: Option<String>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            repository,
            sync,
            feed_url,
            offset,
            sync_lock: Arc::new(Mutex::new(())),
        }
    }
}

pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: &Config, repository: Arc<Repository>) -> Result<Self> {
        let sync = Arc::new(SyncService::from_config(config)?);
        let feed_url = config.feed_url().ok().map(str::to_string);
        if feed_url.is_none() {
            tracing::warn!("feed_url is not configured; sync requests will fail");
        }

        let state = AppState::new(repository, sync, feed_url, config.local_offset()?);
        let addr: SocketAddr = config
            .bind_addr
            .parse()
            .map_err(|e| AppError::Config(format!("invalid bind_addr {:?}: {}", config.bind_addr, e)))?;

        Ok(Self {
            app: create_router(state),
            addr,
        })
    }

    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("Listening on http://{}", self.addr);
        axum::serve(listener, self.app).await?;
        Ok(())
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health_check))
        .nest("/api/renungan", renungan_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn renungan_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(api::list_devotionals)
                .post(api::create_devotional)
                .delete(api::delete_all_devotionals),
        )
        .route("/sync", post(api::trigger_sync))
        .route("/today", get(api::get_today))
        .route(
            "/:id",
            get(api::get_devotional)
                .put(api::update_devotional)
                .delete(api::delete_devotional),
        )
        .route("/:id/visibility", patch(api::set_visibility))
}
