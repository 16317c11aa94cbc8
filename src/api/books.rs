//! Catalog endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::book::{Book, BookMetadata, CreateBook, UpdateBook},
};

use super::{AppJson, AuthenticatedUser, MessageResponse};

/// Popular books from the external source (cached)
#[utoipa::path(
    get,
    path = "/books/popular",
    tag = "books",
    responses(
        (status = 200, description = "Up to twelve popular books", body = Vec<BookMetadata>)
    )
)]
pub async fn popular(State(state): State<crate::AppState>) -> AppResult<Json<Vec<BookMetadata>>> {
    let books = state.services.catalog.popular_books().await?;
    Ok(Json(books))
}

/// Look up an ISBN in the external source
#[utoipa::path(
    get,
    path = "/books/search/{isbn}",
    tag = "books",
    params(
        ("isbn" = String, Path, description = "ISBN, hyphens allowed")
    ),
    responses(
        (status = 200, description = "Metadata (possibly a placeholder)", body = BookMetadata),
        (status = 404, description = "Unknown ISBN", body = crate::error::ErrorResponse)
    )
)]
pub async fn search_isbn(
    State(state): State<crate::AppState>,
    Path(isbn): Path<String>,
) -> AppResult<Json<BookMetadata>> {
    let metadata = state.services.catalog.search_isbn(&isbn).await?;
    Ok(Json(metadata))
}

/// List the whole catalog
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    responses(
        (status = 200, description = "All books", body = Vec<Book>)
    )
)]
pub async fn list_books(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.catalog.list_books().await?;
    Ok(Json(books))
}

/// Get one book
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = Uuid, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(State(state): State<crate::AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 403, description = "Librarians only", body = crate::error::ErrorResponse),
        (status = 409, description = "ISBN already in the catalog", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppJson(book): AppJson<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    claims.require_librarian()?;
    book.validate()?;

    let created = state.services.catalog.create_book(claims.user_id, book).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update book fields
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Book ID")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 403, description = "Librarians only", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    AppJson(patch): AppJson<UpdateBook>,
) -> AppResult<Json<Book>> {
    claims.require_librarian()?;
    patch.validate()?;

    let updated = state.services.catalog.update_book(id, patch).await?;
    Ok(Json(updated))
}

/// Remove a book from the catalog
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book removed", body = MessageResponse),
        (status = 403, description = "Librarians only", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    claims.require_librarian()?;

    state.services.catalog.delete_book(id).await?;
    Ok(Json(MessageResponse::new("Book removed")))
}
