//! Messages from library staff to borrowers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowerMessage {
    pub id: i32,
    pub borrower_id: i32,
    pub sender_id: i32,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Send message request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SendMessage {
    pub borrower_id: i32,
    /// Delivered by email too when the borrower's address is known
    #[validate(email(message = "Invalid email format"))]
    pub borrower_email: Option<String>,
    #[validate(length(min = 1, max = 2000, message = "Message must be 1-2000 characters"))]
    pub message: String,
}
