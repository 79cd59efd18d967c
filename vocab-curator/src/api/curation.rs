//! Curation run endpoint

use axum::{extract::State, routing::post, Json, Router};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::workflow::{CurationRequest, RunReport};
use crate::AppState;

/// Marks a table as being curated until dropped
struct RunGuard {
    runs: Arc<Mutex<HashSet<String>>>,
    table: String,
}

impl RunGuard {
    fn acquire(runs: &Arc<Mutex<HashSet<String>>>, table: &str) -> ApiResult<Self> {
        let key = table.to_lowercase();
        let mut active = runs.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(key.clone()) {
            return Err(ApiError::Conflict(format!(
                "a curation run is already active for table {}",
                table
            )));
        }
        Ok(Self {
            runs: runs.clone(),
            table: key,
        })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut active = self.runs.lock().unwrap_or_else(|e| e.into_inner());
        active.remove(&self.table);
    }
}

/// POST /api/curation/run
///
/// Body: `{"table": "...", "columns": [...]?, "dry_run": bool?}`
pub async fn run_curation(
    State(state): State<AppState>,
    Json(request): Json<CurationRequest>,
) -> ApiResult<Json<RunReport>> {
    if request.table.trim().is_empty() {
        return Err(ApiError::BadRequest("table is required".to_string()));
    }

    let _guard = RunGuard::acquire(&state.active_runs, &request.table)?;

    info!(
        table = %request.table,
        columns = ?request.columns,
        dry_run = request.dry_run,
        "Curation run requested"
    );

    let workflow = state.workflow()?;
    let report = workflow.run(&request).await?;
    Ok(Json(report))
}

pub fn curation_routes() -> Router<AppState> {
    Router::new().route("/api/curation/run", post(run_curation))
}
