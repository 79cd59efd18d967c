//! vocab-curator library interface
//!
//! HTTP microservice wiring the correction engine from `vocab-common` to a
//! JSON-LD schema provider, a SQLite record store and a review queue.

pub mod api;
pub mod collaborators;
pub mod db;
pub mod error;
pub mod schema_provider;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult, CurationError, CurationResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tower_http::trace::TraceLayer;
use vocab_common::config::TomlConfig;

use crate::db::{CorrectionLog, ReviewQueueEscalator, SqliteRecordStore};
use crate::schema_provider::JsonLdSchemaProvider;
use crate::workflow::CurationWorkflow;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (curated tables + service tables)
    pub db: SqlitePool,
    /// Controlled vocabulary snapshot
    pub schema: Arc<JsonLdSchemaProvider>,
    /// Loaded configuration
    pub config: Arc<TomlConfig>,
    /// Tables with a curation run in progress
    pub active_runs: Arc<Mutex<HashSet<String>>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, schema: JsonLdSchemaProvider, config: TomlConfig) -> Self {
        Self {
            db,
            schema: Arc::new(schema),
            config: Arc::new(config),
            active_runs: Arc::new(Mutex::new(HashSet::new())),
            startup_time: Utc::now(),
        }
    }

    pub fn record_store(&self) -> SqliteRecordStore {
        SqliteRecordStore::new(self.db.clone())
    }

    pub fn review_queue(&self) -> ReviewQueueEscalator {
        ReviewQueueEscalator::new(self.db.clone())
    }

    pub fn correction_log(&self) -> CorrectionLog {
        CorrectionLog::new(self.db.clone())
    }

    /// Workflow configured from `[engine]`, `[policy]` and `[columns]`
    pub fn workflow(&self) -> CurationResult<CurationWorkflow> {
        Ok(CurationWorkflow::new(
            self.schema.clone(),
            Arc::new(self.record_store()),
            Arc::new(self.review_queue()),
        )
        .with_engine(self.config.engine()?)
        .with_policy(self.config.policy()?)
        .with_mapper(self.config.column_mapper()))
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::schema_routes())
        .merge(api::curation_routes())
        .merge(api::review_routes())
        .merge(api::correction_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
