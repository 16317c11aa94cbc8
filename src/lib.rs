//! Bookrent library rental server
//!
//! Students rent books by ISBN and get a six-digit return code; librarians
//! manage the catalog. Unknown ISBNs are imported from Google Books on
//! first rent.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .route("/auth/register", post(api::auth::register))
        .route("/auth/login", post(api::auth::login))
        .route("/auth/me", get(api::auth::me))
        // Books
        .route("/books/popular", get(api::books::popular))
        .route("/books/search/:isbn", get(api::books::search_isbn))
        .route("/books", get(api::books::list_books).post(api::books::create_book))
        .route(
            "/books/:id",
            get(api::books::get_book)
                .put(api::books::update_book)
                .delete(api::books::delete_book),
        )
        // Rentals
        .route("/rentals/rent", post(api::rentals::rent))
        .route("/rentals/return", post(api::rentals::return_book))
        .route("/rentals/me", get(api::rentals::my_rentals))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .merge(api::openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
