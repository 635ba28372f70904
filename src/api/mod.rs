//! API handlers for Libris REST endpoints

pub mod admin;
pub mod books;
pub mod borrow_requests;
pub mod cart;
pub mod health;
pub mod messages;
pub mod openapi;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Get the Authorization header
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        // Validate JWT token using the secret from configuration
        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Catalogue and availability
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/search", get(books::search_books))
        .route("/books/:id", get(books::get_book))
        .route("/books/:id/status", put(books::update_book_status))
        // Cart
        .route("/cart", get(cart::get_cart).delete(cart::clear_cart))
        .route("/cart/items", post(cart::add_to_cart))
        .route("/cart/items/:book_id", delete(cart::remove_from_cart))
        .route("/cart/checkout", post(cart::checkout))
        // Borrower views and commands
        .route("/users/:id/eligibility", get(borrow_requests::get_eligibility))
        .route("/users/:id/borrow-requests", get(borrow_requests::user_history))
        .route("/users/:id/messages", get(messages::list_user_messages))
        .route("/borrow-requests/:id/return", post(borrow_requests::request_return))
        .route("/borrow-requests/:id/renew", post(borrow_requests::request_renewal))
        // Admin review
        .route("/admin/borrow-requests", get(admin::list_active))
        .route("/admin/return-requests", get(admin::list_return_requests))
        .route("/admin/returned", get(admin::list_returned))
        .route("/admin/renewal-requests", get(admin::list_renewal_requests))
        .route("/admin/borrow-requests/:id/accept", post(admin::accept))
        .route("/admin/borrow-requests/:id/reject", post(admin::reject))
        .route("/admin/borrow-requests/:id/overdue", post(admin::mark_overdue))
        .route("/admin/borrow-requests/:id/accept-return", post(admin::accept_return))
        .route("/admin/borrow-requests/:id/accept-renewal", post(admin::accept_renewal))
        .route("/admin/borrow-requests/:id/reject-renewal", post(admin::reject_renewal))
        .route("/admin/messages", post(messages::send_message))
        .with_state(state);

    // OpenAPI documentation
    let openapi = openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
