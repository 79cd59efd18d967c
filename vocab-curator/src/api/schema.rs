//! Schema endpoints
//!
//! Look up an attribute's controlled vocabulary and reload the schema file.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use vocab_common::{VocabularyEntry, VocabularyLookup};

use crate::collaborators::SchemaProvider;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ValidValuesResponse {
    pub attribute: String,
    pub values: Vec<VocabularyEntry>,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub attributes: usize,
}

/// GET /api/schema/:attribute
///
/// 404 when the schema has no controlled vocabulary for the attribute.
pub async fn get_valid_values(
    State(state): State<AppState>,
    Path(attribute): Path<String>,
) -> ApiResult<Json<ValidValuesResponse>> {
    match state.schema.get_valid_values(&attribute).await {
        VocabularyLookup::Found(index) => Ok(Json(ValidValuesResponse {
            attribute,
            values: index.all_entries().to_vec(),
        })),
        VocabularyLookup::NotFound => Err(ApiError::NotFound(format!(
            "no controlled vocabulary for attribute {}",
            attribute
        ))),
    }
}

/// POST /api/schema/reload
pub async fn reload_schema(State(state): State<AppState>) -> ApiResult<Json<ReloadResponse>> {
    let attributes = state.schema.reload().await?;
    Ok(Json(ReloadResponse { attributes }))
}

pub fn schema_routes() -> Router<AppState> {
    Router::new()
        .route("/api/schema/reload", post(reload_schema))
        .route("/api/schema/:attribute", get(get_valid_values))
}
