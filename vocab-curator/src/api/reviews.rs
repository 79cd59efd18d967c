//! Review queue endpoints

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{ReviewItem, ReviewStatus};
use crate::error::{ApiError, ApiResult};
use crate::workflow::{resolve_review, ReviewDecision};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    /// Status filter; `pending` when absent, `all` for every item
    #[serde(default)]
    pub status: Option<String>,
}

/// GET /api/reviews
pub async fn list_reviews(
    State(state): State<AppState>,
    Query(query): Query<ReviewQuery>,
) -> ApiResult<Json<Vec<ReviewItem>>> {
    let status = match query.status.as_deref() {
        None => Some(ReviewStatus::Pending),
        Some("all") => None,
        Some(s) => Some(
            ReviewStatus::parse(s)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown review status {}", s)))?,
        ),
    };

    let items = state.review_queue().list(status).await?;
    Ok(Json(items))
}

/// POST /api/reviews/:id
///
/// Body: `{"action": "accept" | "reject" | "replace", "value": ...}`
pub async fn resolve(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(decision): Json<ReviewDecision>,
) -> ApiResult<Json<ReviewItem>> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::BadRequest(format!("invalid review id {}", id)))?;

    let item = resolve_review(&state.review_queue(), &state.record_store(), id, decision).await?;

    Ok(Json(item))
}

pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/api/reviews", get(list_reviews))
        .route("/api/reviews/:id", post(resolve))
}
