//! Shared domain enums
//!
//! Stored as lowercase text columns; `as_str`/`FromStr` are the only conversions
//! used by the repositories.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Borrower role, which selects quota and loan period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Staff => "staff",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "staff" => Ok(Role::Staff),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

// ---------------------------------------------------------------------------
// BookStatus
// ---------------------------------------------------------------------------

/// Book availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    Available,
    /// Held in a cart or awaiting review of a borrow request
    Pending,
    /// On loan
    Borrowed,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "available",
            BookStatus::Pending => "pending",
            BookStatus::Borrowed => "borrowed",
        }
    }
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BookStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "available" => Ok(BookStatus::Available),
            "pending" => Ok(BookStatus::Pending),
            "borrowed" => Ok(BookStatus::Borrowed),
            _ => Err(format!("Invalid book status: {}", s)),
        }
    }
}

// ---------------------------------------------------------------------------
// RequestStatus
// ---------------------------------------------------------------------------

/// Borrow request lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Submitted at checkout, awaiting admin review
    Pending,
    /// Return requested by the borrower, awaiting admin acceptance
    Processing,
    /// On loan
    Accepted,
    Rejected,
    Overdue,
    Returned,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 6] = [
        RequestStatus::Pending,
        RequestStatus::Processing,
        RequestStatus::Accepted,
        RequestStatus::Rejected,
        RequestStatus::Overdue,
        RequestStatus::Returned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Processing => "processing",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Overdue => "overdue",
            RequestStatus::Returned => "returned",
        }
    }

    /// Rejected and returned requests are archived and never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::Returned)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// The book is physically with the borrower
    pub fn is_on_loan(&self) -> bool {
        matches!(
            self,
            RequestStatus::Processing | RequestStatus::Accepted | RequestStatus::Overdue
        )
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("Invalid request status: {}", s))
    }
}

// ---------------------------------------------------------------------------
// RenewalStatus
// ---------------------------------------------------------------------------

/// Renewal sub-state of an accepted loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RenewalStatus {
    None,
    Requested,
    Renewed,
    Rejected,
}

impl RenewalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenewalStatus::None => "none",
            RenewalStatus::Requested => "requested",
            RenewalStatus::Renewed => "renewed",
            RenewalStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for RenewalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RenewalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(RenewalStatus::None),
            "requested" => Ok(RenewalStatus::Requested),
            "renewed" => Ok(RenewalStatus::Renewed),
            "rejected" => Ok(RenewalStatus::Rejected),
            _ => Err(format!("Invalid renewal status: {}", s)),
        }
    }
}

// ---------------------------------------------------------------------------
// CheckoutFlow
// ---------------------------------------------------------------------------

/// Entry point a checkout came from; selects the loan-period column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutFlow {
    /// Catalogue listing
    #[default]
    Catalog,
    /// Advanced or serial search
    Search,
}

impl CheckoutFlow {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutFlow::Catalog => "catalog",
            CheckoutFlow::Search => "search",
        }
    }
}

impl std::fmt::Display for CheckoutFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
