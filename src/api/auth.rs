//! Login and session endpoints

use axum::{extract::State, response::IntoResponse, Extension, Json};
use serde::{Deserialize, Serialize};

use super::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::services::AuthServiceError;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub username: String,
    pub role: String,
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload
        .username
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation_error("username is required"))?;

    let password = payload
        .password
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation_error("password is required"))?;

    let (user, token) = state
        .auth_service
        .login(username, password)
        .await
        .map_err(|e| match e {
            AuthServiceError::InvalidCredentials => {
                ApiError::unauthorized("Invalid username or password")
            }
            AuthServiceError::InvalidToken => {
                ApiError::unauthorized("Invalid username or password")
            }
            AuthServiceError::InternalError(err) => {
                tracing::error!("Login failed: {:#}", err);
                ApiError::internal_error()
            }
        })?;

    Ok(Json(LoginResponse {
        token,
        username: user.username,
        role: user.role.to_string(),
    }))
}

/// GET /api/me
///
/// Returns the identity embedded in the presented token.
pub async fn me(
    Extension(AuthenticatedUser(claims)): Extension<AuthenticatedUser>,
) -> impl IntoResponse {
    Json(MeResponse {
        username: claims.sub,
        role: claims.role,
    })
}
