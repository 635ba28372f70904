//! Identity types supplied by the external auth system

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::enums::Role;
use crate::error::AppError;

/// Borrower details captured on a cart entry or borrow request.
///
/// A snapshot: later profile changes in the auth system do not rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Borrower {
    pub user_id: i32,
    pub full_name: String,
    pub email: String,
    pub phone_no: Option<String>,
    pub role: Role,
    pub staff_no: Option<String>,
    pub department: Option<String>,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub role: Role,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone_no: Option<String>,
    #[serde(default)]
    pub staff_no: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    /// Library staff allowed to review requests
    #[serde(default)]
    pub admin: bool,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Snapshot of the caller as a borrower
    pub fn borrower(&self) -> Borrower {
        Borrower {
            user_id: self.user_id,
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            phone_no: self.phone_no.clone(),
            role: self.role,
            staff_no: self.staff_no.clone(),
            department: self.department.clone(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }

    /// Users may read their own records; admins may read anyone's
    pub fn require_self_or_admin(&self, user_id: i32) -> Result<(), AppError> {
        if self.user_id == user_id || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Cannot access another user's records".to_string()))
        }
    }
}
