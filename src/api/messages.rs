//! Borrower message endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::message::{BorrowerMessage, SendMessage},
    AppState,
};

use super::AuthenticatedUser;

/// Send a message to a borrower
#[utoipa::path(
    post,
    path = "/admin/messages",
    tag = "messages",
    security(("bearer_auth" = [])),
    request_body = SendMessage,
    responses(
        (status = 201, description = "Message stored", body = BorrowerMessage),
        (status = 400, description = "Invalid message"),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(message): Json<SendMessage>,
) -> AppResult<(StatusCode, Json<BorrowerMessage>)> {
    claims.require_admin()?;

    let stored = state.services.messages.send(&claims, message).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// Messages sent to a borrower, newest first
#[utoipa::path(
    get,
    path = "/users/{id}/messages",
    tag = "messages",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Messages", body = Vec<BorrowerMessage>),
        (status = 403, description = "Not the caller's record")
    )
)]
pub async fn list_user_messages(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<BorrowerMessage>>> {
    claims.require_self_or_admin(user_id)?;

    Ok(Json(state.services.messages.list_for(user_id).await?))
}
