//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{admin, books, borrow_requests, cart, health, messages};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
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

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Libris API",
        version = "0.3.0",
        description = "Library borrowing REST API: catalogue, carts, borrow requests and their review"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    modifiers(&BearerAuth),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::search_books,
        books::get_book,
        books::create_book,
        books::update_book_status,
        // Cart
        cart::get_cart,
        cart::add_to_cart,
        cart::remove_from_cart,
        cart::clear_cart,
        cart::checkout,
        // Borrow requests
        borrow_requests::get_eligibility,
        borrow_requests::user_history,
        borrow_requests::request_return,
        borrow_requests::request_renewal,
        // Admin
        admin::list_active,
        admin::list_return_requests,
        admin::list_returned,
        admin::list_renewal_requests,
        admin::accept,
        admin::reject,
        admin::mark_overdue,
        admin::accept_return,
        admin::accept_renewal,
        admin::reject_renewal,
        // Messages
        messages::send_message,
        messages::list_user_messages,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::NewBook,
            crate::models::book::SearchField,
            crate::models::book::UpdateBookStatus,
            crate::models::enums::BookStatus,
            // Cart
            crate::models::cart::CartView,
            crate::models::cart::CartLine,
            crate::models::cart::CartEntry,
            crate::models::cart::CartBook,
            crate::models::cart::AddToCart,
            crate::models::cart::CheckoutInfo,
            crate::models::enums::CheckoutFlow,
            // Borrow requests
            crate::models::borrow_request::BorrowRequest,
            crate::models::borrow_request::BorrowRequestView,
            crate::models::borrow_request::BorrowerRequests,
            crate::models::enums::RequestStatus,
            crate::models::enums::RenewalStatus,
            crate::models::user::Borrower,
            crate::models::enums::Role,
            borrow_requests::EligibilityResponse,
            borrow_requests::ReturnRequest,
            borrow_requests::RenewalRequest,
            admin::AcceptRenewalRequest,
            // Messages
            crate::models::message::BorrowerMessage,
            crate::models::message::SendMessage,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalogue and availability"),
        (name = "cart", description = "Session cart and checkout"),
        (name = "borrow-requests", description = "Borrower views and commands"),
        (name = "admin", description = "Borrow request review"),
        (name = "messages", description = "Staff messages to borrowers")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
