//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, health, rentals, MessageResponse};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bookrent API",
        version = "1.0.0",
        description = "Library rental REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        // Books
        books::popular,
        books::search_isbn,
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Rentals
        rentals::rent,
        rentals::return_book,
        rentals::my_rentals,
    ),
    components(
        schemas(
            // Auth
            auth::AuthResponse,
            crate::models::user::Role,
            crate::models::user::UserInfo,
            crate::models::user::RegisterUser,
            crate::models::user::LoginUser,
            // Books
            crate::models::book::Book,
            crate::models::book::BookMetadata,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Rentals
            rentals::RentRequest,
            rentals::ReturnRequest,
            rentals::RentResponse,
            rentals::RentedBook,
            crate::models::rental::Rental,
            crate::models::rental::RentalWithBook,
            // Health
            health::HealthResponse,
            // Common
            MessageResponse,
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration and sessions"),
        (name = "books", description = "Catalog and external book metadata"),
        (name = "rentals", description = "Renting and returning books")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
