use crate::{
    store::{RESEARCH_QUEUE, VOICE_QUEUE},
    types::Result,
    AppState,
};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health snapshot of the orchestration layer.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    /// Always `ok` when the server answers at all.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Pending `search_and_parse` tasks.
    pub research_queue_depth: usize,
    /// Pending `voice_input` tasks.
    pub voice_queue_depth: usize,
}

/// Report service health and queue depths
#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "Service is up", body = StatusResponse)
    ),
    tag = "status"
)]
pub async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>> {
    // Snapshot only; workers keep draining while this runs.
    let research_queue_depth = state.store.queue_depth(RESEARCH_QUEUE).await?;
    let voice_queue_depth = state.store.queue_depth(VOICE_QUEUE).await?;

    Ok(Json(StatusResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        research_queue_depth,
        voice_queue_depth,
    }))
}
