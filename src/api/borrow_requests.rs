//! Borrower-facing borrow request endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        borrow_request::{BorrowRequest, BorrowRequestView, HistoryQuery},
        enums::Role,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Eligibility check result
#[derive(Serialize, ToSchema)]
pub struct EligibilityResponse {
    pub user_id: i32,
    /// True when the user has a request that is neither returned nor rejected
    pub has_active_borrow: bool,
}

/// Return request body
#[derive(Deserialize, ToSchema)]
pub struct ReturnRequest {
    /// Role of the borrower submitting the return
    pub role: Role,
}

/// Renewal request body
#[derive(Deserialize, ToSchema)]
pub struct RenewalRequest {
    /// New due date, at most a few days after the current one
    pub proposed_return_date: NaiveDate,
}

/// Check whether a user may start another borrow
#[utoipa::path(
    get,
    path = "/users/{id}/eligibility",
    tag = "borrow-requests",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Eligibility", body = EligibilityResponse),
        (status = 403, description = "Not the caller's record"),
        (status = 503, description = "Borrow history unavailable")
    )
)]
pub async fn get_eligibility(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<Json<EligibilityResponse>> {
    claims.require_self_or_admin(user_id)?;

    let has_active_borrow = state.services.eligibility.check_eligibility(user_id).await?;
    Ok(Json(EligibilityResponse {
        user_id,
        has_active_borrow,
    }))
}

/// A user's borrow requests, with days left on current loans
#[utoipa::path(
    get,
    path = "/users/{id}/borrow-requests",
    tag = "borrow-requests",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "Borrow history", body = Vec<BorrowRequestView>),
        (status = 403, description = "Not the caller's record")
    )
)]
pub async fn user_history(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<BorrowRequestView>>> {
    claims.require_self_or_admin(user_id)?;

    let history = state
        .services
        .lifecycle
        .user_history(user_id, query.include_archived)
        .await?;
    Ok(Json(history))
}

/// Ask to return a borrowed book
#[utoipa::path(
    post,
    path = "/borrow-requests/{id}/return",
    tag = "borrow-requests",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrow request ID")
    ),
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Return requested", body = BorrowRequest),
        (status = 403, description = "Not the caller's request"),
        (status = 404, description = "Borrow request not found"),
        (status = 422, description = "Role mismatch or request not on loan")
    )
)]
pub async fn request_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(request_id): Path<i32>,
    Json(body): Json<ReturnRequest>,
) -> AppResult<Json<BorrowRequest>> {
    let request = state
        .services
        .lifecycle
        .request_return(&claims, request_id, body.role)
        .await?;
    Ok(Json(request))
}

/// Ask to extend a loan
#[utoipa::path(
    post,
    path = "/borrow-requests/{id}/renew",
    tag = "borrow-requests",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrow request ID")
    ),
    request_body = RenewalRequest,
    responses(
        (status = 200, description = "Renewal requested", body = BorrowRequest),
        (status = 403, description = "Not the caller's request"),
        (status = 404, description = "Borrow request not found"),
        (status = 422, description = "Date outside the renewal window or loan not renewable")
    )
)]
pub async fn request_renewal(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(request_id): Path<i32>,
    Json(body): Json<RenewalRequest>,
) -> AppResult<Json<BorrowRequest>> {
    let request = state
        .services
        .lifecycle
        .request_renewal(&claims, request_id, body.proposed_return_date)
        .await?;
    Ok(Json(request))
}
