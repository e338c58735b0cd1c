//! members-api library - member lookups, member creation and batch ingestion
//!
//! Uploads are parsed on the request task and handed to a [`JobQueue`] as a
//! single batch job; the HTTP response never waits for ingestion.

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod queue;
pub mod services;

pub use crate::error::{ApiError, ApiResult};
use crate::queue::JobQueue;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Destination of upload batches
    pub queue: Arc<dyn JobQueue>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            db,
            queue,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::member_routes())
        .merge(api::upload_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
