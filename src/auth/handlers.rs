use axum::{
    extract::{FromRef, State},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, RegisterRequest, TokenResponse},
        repo::User,
        services::{
            gravatar_url, hash_password, is_valid_email, verify_password, AuthUser, JwtKeys,
        },
    },
    error::{ApiError, FieldError},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/auth", post(login).get(get_current_user))
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let name = payload.name.unwrap_or_default();
    let email = payload
        .email
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    let password = payload.password.unwrap_or_default();

    let mut errors = Vec::new();
    if name.is_empty() {
        errors.push(FieldError::new("name", "Name is required"));
    }
    if !is_valid_email(&email) {
        errors.push(FieldError::new("email", "Please include a valid email"));
    }
    if password.len() < 6 {
        errors.push(FieldError::new(
            "password",
            "Please enter a password with 6 or more characters",
        ));
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::Validation(vec![FieldError::new(
            "email",
            "User already exists",
        )]));
    }

    let hash = hash_password(&password)?;
    let avatar = gravatar_url(&email);
    let user = User::create(&state.db, &name, &email, &hash, &avatar).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let email = payload
        .email
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    let password = payload.password.unwrap_or_default();

    let mut errors = Vec::new();
    if !is_valid_email(&email) {
        errors.push(FieldError::new("email", "Please include a valid email"));
    }
    if password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let invalid = || {
        ApiError::Validation(vec![FieldError::new("password", "Invalid Credentials")])
    };

    let user = match User::find_by_email(&state.db, &email).await? {
        Some(u) => u,
        None => {
            warn!(email = %email, "login unknown email");
            return Err(invalid());
        }
    };

    if !verify_password(&password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(state))]
async fn get_current_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(PublicUser {
        id: user.id,
        name: user.name,
        email: user.email,
        avatar: user.avatar,
        created_at: user.created_at,
    }))
}
