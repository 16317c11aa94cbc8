//! Authentication endpoints

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::user::{LoginUser, RegisterUser, User, UserInfo},
};

use super::{AppJson, AuthenticatedUser};

/// Session token plus the public profile of its owner
#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    /// Bearer token for the `Authorization` header
    pub token: String,
    pub user: UserInfo,
}

impl AuthResponse {
    fn new(token: String, user: &User) -> Self {
        Self {
            token,
            user: UserInfo::from(user),
        }
    }
}

/// Register a student or librarian account
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterUser,
    responses(
        (status = 200, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid input or librarian code", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<crate::AppState>,
    AppJson(request): AppJson<RegisterUser>,
) -> AppResult<Json<AuthResponse>> {
    request.validate()?;

    let (token, user) = state.services.auth.register(request).await?;
    Ok(Json(AuthResponse::new(token, &user)))
}

/// Authenticate with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginUser,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Invalid credentials", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    AppJson(request): AppJson<LoginUser>,
) -> AppResult<Json<AuthResponse>> {
    request.validate()?;

    let (token, user) = state.services.auth.login(request).await?;
    Ok(Json(AuthResponse::new(token, &user)))
}

/// Current user profile
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserInfo),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn me(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<UserInfo>> {
    let user = state.services.auth.get_user(&claims).await?;
    Ok(Json(UserInfo::from(&user)))
}
