//! Borrow request lifecycle service: borrower commands, admin review and read views

use chrono::{NaiveDate, Utc};

use crate::{
    error::{AppError, AppResult, BorrowRule},
    models::{
        borrow_request::{
            group_by_borrower, BorrowRequest, BorrowRequestView, BorrowerRequests, RequestFilter,
        },
        enums::{RenewalStatus, RequestStatus, Role},
        lifecycle::LifecycleCommand,
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LifecycleService {
    repository: Repository,
    renewal_window_days: u32,
}

impl LifecycleService {
    pub fn new(repository: Repository, renewal_window_days: u32) -> Self {
        Self {
            repository,
            renewal_window_days,
        }
    }

    async fn apply(&self, request_id: i32, command: LifecycleCommand) -> AppResult<BorrowRequest> {
        let updated = self
            .repository
            .borrows
            .transition(request_id, command, self.renewal_window_days)
            .await?;
        tracing::info!(
            "Borrow request {} after {}: status={} renewal={}",
            request_id,
            command.name(),
            updated.status,
            updated.renewal_status
        );
        Ok(updated)
    }

    /// Load a request the caller owns
    async fn owned(&self, claims: &UserClaims, request_id: i32) -> AppResult<BorrowRequest> {
        let request = self.repository.borrows.get(request_id).await?;
        if request.borrower.user_id != claims.user_id {
            return Err(AppError::Authorization(
                "Borrow request belongs to another user".to_string(),
            ));
        }
        Ok(request)
    }

    pub async fn get(&self, request_id: i32) -> AppResult<BorrowRequest> {
        self.repository.borrows.get(request_id).await
    }

    // Admin review

    pub async fn accept(&self, request_id: i32) -> AppResult<BorrowRequest> {
        self.apply(request_id, LifecycleCommand::Accept).await
    }

    pub async fn reject(&self, request_id: i32) -> AppResult<BorrowRequest> {
        self.apply(request_id, LifecycleCommand::Reject).await
    }

    pub async fn mark_overdue(&self, request_id: i32) -> AppResult<BorrowRequest> {
        self.apply(request_id, LifecycleCommand::MarkOverdue).await
    }

    /// Close the loan and make the book available again, in one step
    pub async fn accept_return(&self, request_id: i32) -> AppResult<BorrowRequest> {
        self.apply(request_id, LifecycleCommand::AcceptReturn).await
    }

    /// Extend the due date to `new_date`, or to the borrower's proposal when absent
    pub async fn accept_renewal(
        &self,
        request_id: i32,
        new_date: Option<NaiveDate>,
    ) -> AppResult<BorrowRequest> {
        self.apply(request_id, LifecycleCommand::AcceptRenewal { new_date })
            .await
    }

    pub async fn reject_renewal(&self, request_id: i32) -> AppResult<BorrowRequest> {
        self.apply(request_id, LifecycleCommand::RejectRenewal).await
    }

    // Borrower commands

    /// Ask to hand a book back. `role` is the role the client submits, which must
    /// match both the token and the borrower recorded on the request.
    pub async fn request_return(
        &self,
        claims: &UserClaims,
        request_id: i32,
        role: Role,
    ) -> AppResult<BorrowRequest> {
        let request = self.owned(claims, request_id).await?;
        if role != claims.role || role != request.borrower.role {
            tracing::warn!(
                "Return of request {} refused: submitted role {} (token {}, recorded {})",
                request_id,
                role,
                claims.role,
                request.borrower.role
            );
            return Err(BorrowRule::RoleMismatch.into());
        }
        self.apply(request_id, LifecycleCommand::RequestReturn).await
    }

    pub async fn request_renewal(
        &self,
        claims: &UserClaims,
        request_id: i32,
        proposed: NaiveDate,
    ) -> AppResult<BorrowRequest> {
        self.owned(claims, request_id).await?;
        self.apply(request_id, LifecycleCommand::RequestRenewal { proposed })
            .await
    }

    // Read views

    /// Active requests grouped by borrower, for the review table
    pub async fn active_by_borrower(&self) -> AppResult<Vec<BorrowerRequests>> {
        let requests = self.repository.borrows.list(&RequestFilter::active()).await?;
        Ok(group_by_borrower(requests))
    }

    pub async fn renewal_requests(&self) -> AppResult<Vec<BorrowRequest>> {
        let filter = RequestFilter {
            renewal_status: Some(RenewalStatus::Requested),
            ..RequestFilter::active()
        };
        self.repository.borrows.list(&filter).await
    }

    /// Loans whose borrower asked to return them
    pub async fn return_requests(&self) -> AppResult<Vec<BorrowRequest>> {
        self.repository
            .borrows
            .list(&RequestFilter::with_status(RequestStatus::Processing))
            .await
    }

    pub async fn returned(&self) -> AppResult<Vec<BorrowRequest>> {
        self.repository
            .borrows
            .list(&RequestFilter::with_status(RequestStatus::Returned))
            .await
    }

    /// A borrower's requests with days left computed as of today
    pub async fn user_history(
        &self,
        user_id: i32,
        include_archived: bool,
    ) -> AppResult<Vec<BorrowRequestView>> {
        let filter = RequestFilter {
            include_archived,
            ..RequestFilter::for_user(user_id)
        };
        let today = Utc::now().date_naive();
        Ok(self
            .repository
            .borrows
            .list(&filter)
            .await?
            .into_iter()
            .map(|request| BorrowRequestView::new(request, today))
            .collect())
    }
}
