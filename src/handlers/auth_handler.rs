use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Form, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiError;
use crate::models::user::{NewUser, Role};
use crate::AppState;

#[derive(Deserialize, Validate)]
pub struct RegisterPayload {
    #[validate(email(message = "email is invalid"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    /// Empty or absent means `staff`.
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub role: Role,
}

const BAD_CREDENTIALS: &str = "Invalid email or password";

/// User registration
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Form<RegisterPayload>, FormRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Form(payload) =
        payload.map_err(|_| ApiError::BadRequest("Invalid registration form".into()))?;
    payload.validate()?;

    let role = match payload.role.as_deref().map(str::trim) {
        None | Some("") => Role::default(),
        Some(raw) => raw
            .parse::<Role>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
    };

    let password_hash = state.hasher.hash(&payload.password)?;

    let user = state
        .store
        .insert_user(NewUser {
            email: payload.email,
            password_hash,
            full_name: payload.full_name,
            role,
        })
        .await
        .map_err(|e| ApiError::internal("Failed to register user", e))?;

    let token = state.tokens.issue(&user.email, user.role)?;
    tracing::info!("registered {} as {}", user.email, user.role);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            role: user.role,
        }),
    ))
}

/// User login
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Form<LoginPayload>, FormRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Form(payload) = payload.map_err(|_| ApiError::BadRequest("Invalid login form".into()))?;

    let Some(user) = state.store.find_user_by_email(&payload.email).await? else {
        state.hasher.verify_absent(&payload.password);
        tracing::warn!("login attempt for unknown email {}", payload.email);
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.into()));
    };

    if !state.hasher.verify(&payload.password, &user.password_hash)? {
        tracing::warn!("wrong password for {}", user.email);
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.into()));
    }

    let token = state.tokens.issue(&user.email, user.role)?;
    Ok((
        StatusCode::OK,
        Json(AuthResponse {
            token,
            role: user.role,
        }),
    ))
}
