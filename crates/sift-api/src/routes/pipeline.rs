use axum::Json;
use axum::extract::State;
use bson::Document;
use serde::{Deserialize, Serialize};
use sift_query::RawRequest;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PipelineBody {
    /// Mandatory predicate chosen by the calling service, never by the client.
    pub base: Document,
    #[serde(flatten)]
    pub request: RawRequest,
}

#[derive(Debug, Serialize)]
pub struct PipelineResponse {
    pub pipeline: Vec<Document>,
    pub count: Document,
}

pub async fn compile(
    State(state): State<AppState>,
    Json(body): Json<PipelineBody>,
) -> Result<Json<PipelineResponse>, ApiError> {
    let compiled = state.compiler.compile_request(&body.base, &body.request)?;
    Ok(Json(PipelineResponse {
        pipeline: compiled.to_documents(),
        count: compiled.count,
    }))
}
