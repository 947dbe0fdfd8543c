use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{error::ApiError, state::AppState};

use super::services::RepoSummary;

pub fn routes() -> Router<AppState> {
    Router::new().route("/github/:username", get(list_repos))
}

/// Public proxy for a user's five most recent repositories. Upstream
/// non-success reads as "no profile"; transport failures stay opaque.
#[instrument(skip(state))]
async fn list_repos(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<RepoSummary>>, ApiError> {
    let repos = state
        .github
        .recent_repos(&username)
        .await?
        .ok_or(ApiError::Upstream)?;
    Ok(Json(repos))
}
