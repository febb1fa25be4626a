//! HTTP API handlers and routes.
//!
//! The REST surface is a thin control plane over the orchestration layer:
//!
//! - `GET /status` - Health and queue depth snapshot
//! - `POST /api/decompose` - Decompose a query and dispatch research tasks
//! - `GET /api/papers` - List recently stored paper records
//! - `GET /api/openapi.json` - OpenAPI document
//!
//! The websocket upgrades (`/ws/activity`, `/ws/voice`) are registered on
//! the same router but implemented in [`crate::ws`].

use utoipa::OpenApi;

/// Request handlers for each endpoint.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

/// OpenAPI document for the REST surface.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::status::status,
        handlers::decompose::decompose,
        handlers::papers::list_papers,
    ),
    components(schemas(
        crate::types::DecomposeRequest,
        crate::types::DecomposeResponse,
        crate::types::PaperSummary,
        crate::types::PapersResponse,
        handlers::status::StatusResponse,
    )),
    tags(
        (name = "status", description = "Service health"),
        (name = "research", description = "Research task dispatch and results"),
    )
)]
pub struct ApiDoc;
