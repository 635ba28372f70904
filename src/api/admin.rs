//! Admin review endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::borrow_request::{BorrowRequest, BorrowerRequests},
    AppState,
};

use super::AuthenticatedUser;

/// Accept renewal request body
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AcceptRenewalRequest {
    /// Due date to grant; the borrower's proposal when omitted
    pub new_return_date: Option<NaiveDate>,
}

/// Active borrow requests grouped by borrower
#[utoipa::path(
    get,
    path = "/admin/borrow-requests",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active requests by borrower", body = Vec<BorrowerRequests>),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn list_active(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowerRequests>>> {
    claims.require_admin()?;

    Ok(Json(state.services.lifecycle.active_by_borrower().await?))
}

/// Loans whose return is awaiting acceptance
#[utoipa::path(
    get,
    path = "/admin/return-requests",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Return requests", body = Vec<BorrowRequest>),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn list_return_requests(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowRequest>>> {
    claims.require_admin()?;

    Ok(Json(state.services.lifecycle.return_requests().await?))
}

/// Returned loans
#[utoipa::path(
    get,
    path = "/admin/returned",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Returned requests", body = Vec<BorrowRequest>),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn list_returned(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowRequest>>> {
    claims.require_admin()?;

    Ok(Json(state.services.lifecycle.returned().await?))
}

/// Pending renewal requests
#[utoipa::path(
    get,
    path = "/admin/renewal-requests",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Renewal requests", body = Vec<BorrowRequest>),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn list_renewal_requests(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowRequest>>> {
    claims.require_admin()?;

    Ok(Json(state.services.lifecycle.renewal_requests().await?))
}

/// Accept a borrow request; the book becomes borrowed
#[utoipa::path(
    post,
    path = "/admin/borrow-requests/{id}/accept",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow request ID")),
    responses(
        (status = 200, description = "Request accepted", body = BorrowRequest),
        (status = 404, description = "Borrow request not found"),
        (status = 422, description = "Request already closed")
    )
)]
pub async fn accept(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(request_id): Path<i32>,
) -> AppResult<Json<BorrowRequest>> {
    claims.require_admin()?;

    Ok(Json(state.services.lifecycle.accept(request_id).await?))
}

/// Reject a borrow request; the book becomes available
#[utoipa::path(
    post,
    path = "/admin/borrow-requests/{id}/reject",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow request ID")),
    responses(
        (status = 200, description = "Request rejected", body = BorrowRequest),
        (status = 404, description = "Borrow request not found"),
        (status = 422, description = "Request already returned")
    )
)]
pub async fn reject(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(request_id): Path<i32>,
) -> AppResult<Json<BorrowRequest>> {
    claims.require_admin()?;

    Ok(Json(state.services.lifecycle.reject(request_id).await?))
}

/// Mark an accepted loan overdue
#[utoipa::path(
    post,
    path = "/admin/borrow-requests/{id}/overdue",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow request ID")),
    responses(
        (status = 200, description = "Marked overdue", body = BorrowRequest),
        (status = 404, description = "Borrow request not found"),
        (status = 422, description = "Request is not an accepted loan")
    )
)]
pub async fn mark_overdue(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(request_id): Path<i32>,
) -> AppResult<Json<BorrowRequest>> {
    claims.require_admin()?;

    Ok(Json(state.services.lifecycle.mark_overdue(request_id).await?))
}

/// Accept a return; the book becomes available
#[utoipa::path(
    post,
    path = "/admin/borrow-requests/{id}/accept-return",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow request ID")),
    responses(
        (status = 200, description = "Loan returned", body = BorrowRequest),
        (status = 404, description = "Borrow request not found"),
        (status = 422, description = "Request is not on loan")
    )
)]
pub async fn accept_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(request_id): Path<i32>,
) -> AppResult<Json<BorrowRequest>> {
    claims.require_admin()?;

    Ok(Json(state.services.lifecycle.accept_return(request_id).await?))
}

/// Grant a renewal
#[utoipa::path(
    post,
    path = "/admin/borrow-requests/{id}/accept-renewal",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow request ID")),
    request_body = AcceptRenewalRequest,
    responses(
        (status = 200, description = "Renewal granted", body = BorrowRequest),
        (status = 404, description = "Borrow request not found"),
        (status = 422, description = "No pending renewal or date outside the window")
    )
)]
pub async fn accept_renewal(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(request_id): Path<i32>,
    Json(body): Json<AcceptRenewalRequest>,
) -> AppResult<Json<BorrowRequest>> {
    claims.require_admin()?;

    let request = state
        .services
        .lifecycle
        .accept_renewal(request_id, body.new_return_date)
        .await?;
    Ok(Json(request))
}

/// Refuse a renewal; the due date is unchanged
#[utoipa::path(
    post,
    path = "/admin/borrow-requests/{id}/reject-renewal",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow request ID")),
    responses(
        (status = 200, description = "Renewal refused", body = BorrowRequest),
        (status = 404, description = "Borrow request not found"),
        (status = 422, description = "No pending renewal")
    )
)]
pub async fn reject_renewal(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(request_id): Path<i32>,
) -> AppResult<Json<BorrowRequest>> {
    claims.require_admin()?;

    Ok(Json(state.services.lifecycle.reject_renewal(request_id).await?))
}
