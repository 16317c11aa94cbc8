//! Rental endpoints

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{error::AppResult, models::rental::RentalWithBook};

use super::{AppJson, AppQuery, AuthenticatedUser, MessageResponse};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RentRequest {
    #[validate(length(min = 1, message = "ISBN is required"))]
    pub isbn: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    #[validate(length(min = 1, message = "ISBN is required"))]
    pub isbn: String,
    /// Six-digit code handed out at rent time
    pub return_code: String,
}

#[derive(Serialize, ToSchema)]
pub struct RentedBook {
    pub title: String,
    pub isbn: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RentResponse {
    pub message: String,
    #[schema(example = "482913")]
    pub return_code: String,
    pub book: RentedBook,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RentalsQuery {
    /// Only rentals not yet returned
    pub active: Option<bool>,
}

/// Rent a book by ISBN
#[utoipa::path(
    post,
    path = "/rentals/rent",
    tag = "rentals",
    security(("bearer_auth" = [])),
    request_body = RentRequest,
    responses(
        (status = 200, description = "Book rented, keep the return code", body = RentResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 404, description = "ISBN unknown locally and upstream", body = crate::error::ErrorResponse),
        (status = 409, description = "Book already rented", body = crate::error::ErrorResponse)
    )
)]
pub async fn rent(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppJson(request): AppJson<RentRequest>,
) -> AppResult<Json<RentResponse>> {
    request.validate()?;

    let outcome = state.services.rentals.rent(claims.user_id, &request.isbn).await?;
    Ok(Json(RentResponse {
        message: "Book rented successfully".to_string(),
        return_code: outcome.rental.return_code.to_string(),
        book: RentedBook {
            title: outcome.book.title,
            isbn: outcome.book.isbn,
        },
    }))
}

/// Return a rented book with its code
#[utoipa::path(
    post,
    path = "/rentals/return",
    tag = "rentals",
    security(("bearer_auth" = [])),
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Book returned", body = MessageResponse),
        (status = 400, description = "Invalid ISBN or return code", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppJson(request): AppJson<ReturnRequest>,
) -> AppResult<Json<MessageResponse>> {
    request.validate()?;

    state
        .services
        .rentals
        .return_book(claims.user_id, &request.isbn, &request.return_code)
        .await?;
    Ok(Json(MessageResponse::new("Book returned successfully")))
}

/// Rentals of the current user, newest first
#[utoipa::path(
    get,
    path = "/rentals/me",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(RentalsQuery),
    responses(
        (status = 200, description = "Rentals with their books", body = Vec<RentalWithBook>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn my_rentals(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppQuery(query): AppQuery<RentalsQuery>,
) -> AppResult<Json<Vec<RentalWithBook>>> {
    let rentals = if query.active.unwrap_or(false) {
        state.services.rentals.list_active_for_student(claims.user_id).await?
    } else {
        state.services.rentals.list_for_student(claims.user_id).await?
    };
    Ok(Json(rentals))
}
