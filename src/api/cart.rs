//! Cart and checkout endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        borrow_request::BorrowRequest,
        cart::{AddToCart, CartView, CheckoutInfo},
    },
    AppState,
};

use super::AuthenticatedUser;

/// Get the caller's cart
#[utoipa::path(
    get,
    path = "/cart",
    tag = "cart",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current cart with due dates", body = CartView)
    )
)]
pub async fn get_cart(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<CartView>> {
    let cart = state.services.cart.get_cart(&claims.borrower()).await?;
    Ok(Json(cart))
}

/// Add a book to the caller's cart
#[utoipa::path(
    post,
    path = "/cart/items",
    tag = "cart",
    security(("bearer_auth" = [])),
    request_body = AddToCart,
    responses(
        (status = 200, description = "Book held and added", body = CartView),
        (status = 404, description = "Book not found"),
        (status = 409, description = "User already has an active borrow"),
        (status = 422, description = "Cart full, duplicate, or book not available"),
        (status = 503, description = "Borrow history unavailable")
    )
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<AddToCart>,
) -> AppResult<Json<CartView>> {
    let cart = state
        .services
        .cart
        .add_to_cart(&claims.borrower(), request.book_id, request.flow)
        .await?;
    Ok(Json(cart))
}

/// Remove a book from the caller's cart
#[utoipa::path(
    delete,
    path = "/cart/items/{book_id}",
    tag = "cart",
    security(("bearer_auth" = [])),
    params(
        ("book_id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book removed and released", body = CartView),
        (status = 404, description = "Book not in the cart")
    )
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<Json<CartView>> {
    let cart = state
        .services
        .cart
        .remove_from_cart(&claims.borrower(), book_id)
        .await?;
    Ok(Json(cart))
}

/// Empty the caller's cart
#[utoipa::path(
    delete,
    path = "/cart",
    tag = "cart",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Cart emptied", body = CartView)
    )
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<CartView>> {
    let cart = state.services.cart.clear_cart(&claims.borrower()).await?;
    Ok(Json(cart))
}

/// Submit the cart as borrow requests
#[utoipa::path(
    post,
    path = "/cart/checkout",
    tag = "cart",
    security(("bearer_auth" = [])),
    request_body = CheckoutInfo,
    responses(
        (status = 201, description = "Borrow requests created", body = Vec<BorrowRequest>),
        (status = 409, description = "User already has an active borrow"),
        (status = 422, description = "Empty cart or a book is no longer held")
    )
)]
pub async fn checkout(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(info): Json<CheckoutInfo>,
) -> AppResult<(StatusCode, Json<Vec<BorrowRequest>>)> {
    let created = state
        .services
        .cart
        .submit_checkout(&claims.borrower(), info)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}
