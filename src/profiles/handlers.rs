use axum::{
    extract::{Path, State},
    routing::{delete, get, put},
    Json, Router,
};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::services::AuthUser,
    error::ApiError,
    state::AppState,
};

use super::dto::{EducationInput, ExperienceInput, ProfileFields};
use super::repo::{OwnedProfile, Profile};
use super::services;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list_profiles).post(upsert_profile).delete(delete_profile),
        )
        .route("/me", get(get_my_profile))
        .route("/user/:user_id", get(get_profile_by_user))
        .route("/experience", put(add_experience))
        .route("/education", put(add_education))
        .route("/experience/:exp_id", delete(remove_experience))
        .route("/education/:edu_id", delete(remove_education))
}

#[instrument(skip(state))]
async fn get_my_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<OwnedProfile>, ApiError> {
    let profile = state
        .store
        .find_owned(user_id)
        .await?
        .ok_or_else(ApiError::no_profile)?;
    Ok(Json(profile))
}

#[instrument(skip(state, fields))]
async fn upsert_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(fields): Json<ProfileFields>,
) -> Result<Json<Profile>, ApiError> {
    let profile = services::upsert_profile(state.store.as_ref(), user_id, fields).await?;
    Ok(Json(profile))
}

#[instrument(skip(state))]
async fn list_profiles(
    State(state): State<AppState>,
) -> Result<Json<Vec<OwnedProfile>>, ApiError> {
    let profiles = state.store.list_all().await?;
    Ok(Json(profiles))
}

/// Public lookup by owner id. A malformed id reads the same as an unknown
/// one: the caller only learns that no profile is there.
#[instrument(skip(state))]
async fn get_profile_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<OwnedProfile>, ApiError> {
    let user_id: Uuid = user_id.parse().map_err(|_| ApiError::no_profile())?;
    let profile = state
        .store
        .find_owned(user_id)
        .await?
        .ok_or_else(ApiError::no_profile)?;
    Ok(Json(profile))
}

#[instrument(skip(state))]
async fn delete_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.delete_with_owner(user_id).await?;
    info!(user_id = %user_id, "profile and user deleted");
    Ok(Json(json!({ "msg": "Profile and User deleted" })))
}

#[instrument(skip(state, input))]
async fn add_experience(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(input): Json<ExperienceInput>,
) -> Result<Json<Profile>, ApiError> {
    let profile = services::add_experience(state.store.as_ref(), user_id, input).await?;
    Ok(Json(profile))
}

#[instrument(skip(state, input))]
async fn add_education(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(input): Json<EducationInput>,
) -> Result<Json<Profile>, ApiError> {
    let profile = services::add_education(state.store.as_ref(), user_id, input).await?;
    Ok(Json(profile))
}

#[instrument(skip(state))]
async fn remove_experience(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(exp_id): Path<String>,
) -> Result<Json<Profile>, ApiError> {
    let entry_id = exp_id.parse::<Uuid>().ok();
    let profile = services::remove_experience(state.store.as_ref(), user_id, entry_id).await?;
    Ok(Json(profile))
}

#[instrument(skip(state))]
async fn remove_education(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(edu_id): Path<String>,
) -> Result<Json<Profile>, ApiError> {
    let entry_id = edu_id.parse::<Uuid>().ok();
    let profile = services::remove_education(state.store.as_ref(), user_id, entry_id).await?;
    Ok(Json(profile))
}

#[cfg(test)]
mod tests {
    use crate::{app::build_app, state::AppState};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn get_profile_for(id: &str) -> (StatusCode, serde_json::Value) {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/profile/user/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn lookup_by_malformed_id_reads_as_no_profile() {
        let (status, body) = get_profile_for("not-a-uuid").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["msg"], "There is no profile for this user.");
    }

    #[tokio::test]
    async fn malformed_and_unmatched_ids_are_indistinguishable() {
        let (malformed_status, malformed_body) = get_profile_for("12345-too-short").await;
        let (unmatched_status, unmatched_body) =
            get_profile_for(&Uuid::new_v4().to_string()).await;
        assert_eq!(malformed_status, unmatched_status);
        assert_eq!(malformed_body, unmatched_body);
    }
}
