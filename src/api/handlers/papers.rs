use crate::{
    store::PAPER_PREFIX,
    types::{PaperSummary, PapersResponse, Result},
    AppState,
};
use axum::{extract::State, Json};

/// Listing cap; the read-side API is a debugging window, not a browse UI.
const MAX_PAPERS: usize = 20;

/// List recently stored paper records
#[utoipa::path(
    get,
    path = "/api/papers",
    responses(
        (status = 200, description = "Stored papers", body = PapersResponse)
    ),
    tag = "research"
)]
pub async fn list_papers(State(state): State<AppState>) -> Result<Json<PapersResponse>> {
    let keys = state.store.keys_with_prefix(PAPER_PREFIX).await?;

    let mut papers = Vec::new();
    for key in keys.into_iter().take(MAX_PAPERS) {
        let record = state.store.get_all_hash_fields(&key).await?;
        if record.is_empty() {
            // Record removed between the key scan and the read.
            continue;
        }
        papers.push(PaperSummary {
            id: key,
            title: record.get("title").cloned().unwrap_or_default(),
            url: record.get("url").cloned().unwrap_or_default(),
        });
    }

    Ok(Json(PapersResponse { papers }))
}
