use crate::{
    types::{AppError, DecomposeRequest, DecomposeResponse, Result},
    AppState,
};
use axum::{extract::State, Json};

/// Decompose a research query and dispatch the resulting tasks
#[utoipa::path(
    post,
    path = "/api/decompose",
    request_body = DecomposeRequest,
    responses(
        (status = 200, description = "Tasks dispatched", body = DecomposeResponse),
        (status = 400, description = "Empty query")
    ),
    tag = "research"
)]
pub async fn decompose(
    State(state): State<AppState>,
    Json(payload): Json<DecomposeRequest>,
) -> Result<Json<DecomposeResponse>> {
    let query = payload.query.trim();
    if query.is_empty() {
        return Err(AppError::InvalidInput("query must not be empty".to_string()));
    }

    let tasks = state
        .coordinator
        .decompose_and_dispatch(query, payload.session_id.as_deref())
        .await?;

    Ok(Json(DecomposeResponse { tasks }))
}
