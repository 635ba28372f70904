//! Borrow request model and read projections

use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::enums::{RenewalStatus, RequestStatus};
use super::user::Borrower;
use crate::error::AppError;

/// Internal row structure for database queries (borrower snapshot flattened)
#[derive(Debug, Clone, FromRow)]
pub struct BorrowRequestRow {
    id: i32,
    checkout_id: i32,
    book_id: i32,
    book_title: String,
    book_author: String,
    user_id: i32,
    full_name: String,
    email: String,
    phone_no: Option<String>,
    role: String,
    staff_no: Option<String>,
    department: Option<String>,
    borrow_date: NaiveDate,
    return_date: NaiveDate,
    status: String,
    renewal_status: String,
    proposed_return_date: Option<NaiveDate>,
    return_requested_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    archived_at: Option<DateTime<Utc>>,
}

impl TryFrom<BorrowRequestRow> for BorrowRequest {
    type Error = AppError;

    fn try_from(row: BorrowRequestRow) -> Result<Self, Self::Error> {
        Ok(BorrowRequest {
            id: row.id,
            checkout_id: row.checkout_id,
            book_id: row.book_id,
            book_title: row.book_title,
            book_author: row.book_author,
            borrower: Borrower {
                user_id: row.user_id,
                full_name: row.full_name,
                email: row.email,
                phone_no: row.phone_no,
                role: row.role.parse().map_err(AppError::Internal)?,
                staff_no: row.staff_no,
                department: row.department,
            },
            borrow_date: row.borrow_date,
            return_date: row.return_date,
            status: row.status.parse().map_err(AppError::Internal)?,
            renewal_status: row.renewal_status.parse().map_err(AppError::Internal)?,
            proposed_return_date: row.proposed_return_date,
            return_requested_at: row.return_requested_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            archived_at: row.archived_at,
        })
    }
}

/// A request to borrow one book, created at checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BorrowRequest {
    pub id: i32,
    /// Batch created by one checkout
    pub checkout_id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub book_author: String,
    pub borrower: Borrower,
    pub borrow_date: NaiveDate,
    /// Due date
    pub return_date: NaiveDate,
    pub status: RequestStatus,
    pub renewal_status: RenewalStatus,
    /// Due date proposed by a pending renewal request
    pub proposed_return_date: Option<NaiveDate>,
    pub return_requested_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl BorrowRequest {
    /// Days until the due date, shown to the borrower.
    ///
    /// A loan whose return is already requested counts as zero days left; pending
    /// requests and loans with a renewal under review have no countdown.
    pub fn days_left(&self, today: NaiveDate) -> Option<i64> {
        match self.status {
            RequestStatus::Processing => Some(0),
            RequestStatus::Accepted if self.renewal_status != RenewalStatus::Requested => {
                Some((self.return_date - today).num_days())
            }
            _ => None,
        }
    }
}

/// Borrow request with derived read-side fields
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BorrowRequestView {
    #[serde(flatten)]
    pub request: BorrowRequest,
    pub days_left: Option<i64>,
}

impl BorrowRequestView {
    pub fn new(request: BorrowRequest, today: NaiveDate) -> Self {
        let days_left = request.days_left(today);
        Self { request, days_left }
    }
}

/// Active requests of one borrower, for the admin review table
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BorrowerRequests {
    pub borrower: Borrower,
    pub requests: Vec<BorrowRequest>,
}

/// Group requests by borrower, keeping first-seen order
pub fn group_by_borrower(requests: Vec<BorrowRequest>) -> Vec<BorrowerRequests> {
    let mut groups: IndexMap<i32, BorrowerRequests> = IndexMap::new();
    for request in requests {
        groups
            .entry(request.borrower.user_id)
            .or_insert_with(|| BorrowerRequests {
                borrower: request.borrower.clone(),
                requests: Vec::new(),
            })
            .requests
            .push(request);
    }
    groups.into_values().collect()
}

/// One line of a checkout, ready to be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBorrowLine {
    pub book_id: i32,
    pub return_date: NaiveDate,
}

/// Store-level selection over borrow requests
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub user_id: Option<i32>,
    /// Empty means any status
    pub statuses: Vec<RequestStatus>,
    pub renewal_status: Option<RenewalStatus>,
    /// Include rejected/returned (archived) requests
    pub include_archived: bool,
}

impl RequestFilter {
    pub fn active() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: i32) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn with_status(status: RequestStatus) -> Self {
        Self {
            statuses: vec![status],
            include_archived: status.is_terminal(),
            ..Self::default()
        }
    }

    pub fn matches(&self, request: &BorrowRequest) -> bool {
        self.user_id.map_or(true, |id| request.borrower.user_id == id)
            && (self.statuses.is_empty() || self.statuses.contains(&request.status))
            && self
                .renewal_status
                .map_or(true, |renewal| request.renewal_status == renewal)
            && (self.include_archived || request.status.is_active())
    }
}

/// User history query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct HistoryQuery {
    /// Include returned and rejected requests ("previous records")
    #[serde(default)]
    pub include_archived: bool,
}
