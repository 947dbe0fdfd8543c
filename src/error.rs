use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// One field/message pair inside a validation failure.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub param: &'static str,
    pub msg: &'static str,
}

impl FieldError {
    pub fn new(param: &'static str, msg: &'static str) -> Self {
        Self { param, msg }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    /// Client-supplied data violates required-field rules.
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    /// Referenced profile/user does not exist. Reported as 400, not 404,
    /// matching the shape clients already depend on.
    #[error("{0}")]
    NotFound(String),

    /// Upstream GitHub call failed or returned non-success.
    #[error("no github profile found")]
    Upstream,

    /// Anything else. Logged internally, opaque to the caller.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn no_profile() -> Self {
        ApiError::NotFound("There is no profile for this user.".into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "errors": errors })),
            )
                .into_response(),
            ApiError::NotFound(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "msg": msg }))).into_response()
            }
            ApiError::Upstream => (
                StatusCode::NOT_FOUND,
                Json(json!({ "msg": "No Github profile found" })),
            )
                .into_response(),
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server Error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(res: Response) -> serde_json::Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_serializes_as_error_list() {
        let err = ApiError::Validation(vec![
            FieldError::new("status", "Status is required"),
            FieldError::new("skills", "Skills are required"),
        ]);
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let json = body_json(res).await;
        assert_eq!(json["errors"][0]["param"], "status");
        assert_eq!(json["errors"][1]["msg"], "Skills are required");
    }

    #[tokio::test]
    async fn not_found_is_a_400_with_msg() {
        let res = ApiError::no_profile().into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let json = body_json(res).await;
        assert_eq!(json["msg"], "There is no profile for this user.");
    }

    #[tokio::test]
    async fn upstream_maps_to_404() {
        let res = ApiError::Upstream.into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let json = body_json(res).await;
        assert_eq!(json["msg"], "No Github profile found");
    }

    #[tokio::test]
    async fn internal_hides_detail() {
        let res = ApiError::Internal(anyhow::anyhow!("connection refused")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Server Error");
    }
}
