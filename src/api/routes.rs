use crate::AppState;
use axum::{
    routing::{get, post},
    Json, Router,
};
use utoipa::OpenApi;

/// Build the full application router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/status", get(crate::api::handlers::status::status))
        .route(
            "/api/decompose",
            post(crate::api::handlers::decompose::decompose),
        )
        .route("/api/papers", get(crate::api::handlers::papers::list_papers))
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api::ApiDoc::openapi()) }),
        )
        .route("/ws/activity", get(crate::ws::activity_ws))
        .route("/ws/voice", get(crate::ws::voice_ws))
}
