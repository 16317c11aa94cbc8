//! API handlers for the Bookrent REST endpoints

pub mod auth;
pub mod books;
pub mod health;
pub mod openapi;
pub mod rentals;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
    RequestPartsExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Extractor for the authenticated caller, resolved from the bearer token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|e| {
                tracing::debug!("Rejected authorization header: {}", e);
                AppError::Authentication
            })?;

        let claims = state.services.auth.verify(bearer.token())?;
        Ok(AuthenticatedUser(claims))
    }
}

/// JSON body extractor whose rejections use the API error format
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string extractor with the same error format
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Plain confirmation body
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
