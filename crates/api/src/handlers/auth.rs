//! Authentication handlers: login and current-user lookup.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use greenlight_core::error::CoreError;
use greenlight_db::models::user::UserResponse;
use greenlight_db::repositories::{RoleRepo, UserRepo};

use crate::auth::jwt::generate_access_token;
use crate::auth::password::verify_password;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

/// POST /api/auth/login
///
/// Verifies credentials and returns an access token. The response message
/// is identical for unknown-user and wrong-password so usernames cannot
/// be probed.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<DataResponse<LoginResponse>>> {
    let invalid =
        || CoreError::Unauthorized("Invalid username or password".to_string());

    let user = UserRepo::find_by_username(&state.pool, &payload.username)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(invalid)?;

    let verified = verify_password(&payload.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification failed: {e}")))?;
    if !verified {
        return Err(invalid().into());
    }

    let role = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
    let token = generate_access_token(user.id, &role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation failed: {e}")))?;

    tracing::info!(user_id = user.id, username = %user.username, "User logged in");

    Ok(Json(DataResponse {
        data: LoginResponse {
            token,
            user: UserResponse {
                id: user.id,
                username: user.username,
                email: user.email,
                role,
                role_id: user.role_id,
                is_active: user.is_active,
                created_at: user.created_at,
            },
        },
    }))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "user",
            key: auth.user_id.to_string(),
        })?;

    let role = RoleRepo::resolve_name(&state.pool, user.role_id).await?;

    Ok(Json(DataResponse {
        data: UserResponse {
            id: user.id,
            username: user.username,
            email: user.email,
            role,
            role_id: user.role_id,
            is_active: user.is_active,
            created_at: user.created_at,
        },
    }))
}
