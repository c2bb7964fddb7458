//! Run creation and snapshot handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use tracing::info;

use reel_models::{
    GenerateVideoRequest, ParseScriptRequest, ParsedScript, ProcessVideoRequest, Run, RunId,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Response to a run creation request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCreatedResponse {
    pub run_id: String,
}

/// Start a clip run.
///
/// POST /api/process-video
pub async fn process_video(
    State(state): State<AppState>,
    payload: Result<Json<ProcessVideoRequest>, JsonRejection>,
) -> ApiResult<Json<RunCreatedResponse>> {
    let Json(request) = payload?;
    let id = state.pipeline.start_clip_run(request).await?;
    info!(run_id = %id, "Clip run created");

    Ok(Json(RunCreatedResponse {
        run_id: id.to_string(),
    }))
}

/// Start a script run.
///
/// POST /api/script-to-video/generate
pub async fn generate_video(
    State(state): State<AppState>,
    payload: Result<Json<GenerateVideoRequest>, JsonRejection>,
) -> ApiResult<Json<RunCreatedResponse>> {
    let Json(request) = payload?;
    let id = state.pipeline.start_script_run(request).await?;
    info!(run_id = %id, "Script run created");

    Ok(Json(RunCreatedResponse {
        run_id: id.to_string(),
    }))
}

/// Segment a script synchronously.
///
/// POST /api/script-to-video/parse
pub async fn parse_script(
    State(state): State<AppState>,
    payload: Result<Json<ParseScriptRequest>, JsonRejection>,
) -> ApiResult<Json<ParsedScript>> {
    let Json(request) = payload?;
    let script = state.pipeline.parse_script(&request).await?;
    Ok(Json(script))
}

/// Current snapshot of a run.
///
/// GET /api/runs/:run_id
pub async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> ApiResult<Json<Run>> {
    let id = RunId::from_string(run_id);
    state
        .registry
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Run {id} not found")))
}
