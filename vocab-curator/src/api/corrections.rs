//! Corrections log endpoint

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use vocab_common::record::export_json;
use vocab_common::CorrectionRecord;

use crate::db::LoggedCorrection;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub table: Option<String>,
    pub limit: Option<i64>,
}

/// GET /api/corrections/log
///
/// Applied corrections, newest first.
pub async fn get_log(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> ApiResult<Json<Vec<LoggedCorrection>>> {
    Ok(Json(list_entries(&state, &query).await?))
}

/// GET /api/corrections/export
///
/// Same selection as the log, as bare interchange records.
pub async fn export_log(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> ApiResult<impl IntoResponse> {
    let records: Vec<CorrectionRecord> = list_entries(&state, &query)
        .await?
        .into_iter()
        .map(|entry| entry.record)
        .collect();

    let mut body = Vec::new();
    export_json(&records, &mut body)?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}

async fn list_entries(state: &AppState, query: &LogQuery) -> ApiResult<Vec<LoggedCorrection>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }

    Ok(state
        .correction_log()
        .list(query.table.as_deref(), limit)
        .await?)
}

pub fn correction_routes() -> Router<AppState> {
    Router::new()
        .route("/api/corrections/log", get(get_log))
        .route("/api/corrections/export", get(export_log))
}
