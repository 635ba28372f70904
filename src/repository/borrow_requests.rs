//! Borrow requests repository for database operations

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{Pool, Postgres, Transaction};

use super::{books::BooksRepository, BorrowStore};
use crate::{
    error::{AppError, AppResult, BorrowRule},
    models::{
        borrow_request::{BorrowRequest, BorrowRequestRow, NewBorrowLine, RequestFilter},
        enums::BookStatus,
        lifecycle::{plan, LifecycleCommand},
        user::Borrower,
    },
};

const REQUEST_COLUMNS: &str = r#"
    id, checkout_id, book_id, book_title, book_author,
    user_id, full_name, email, phone_no, role, staff_no, department,
    borrow_date, return_date, status, renewal_status, proposed_return_date,
    return_requested_at, created_at, updated_at, archived_at
"#;

const ACTIVE: &str = "status NOT IN ('rejected', 'returned')";

#[derive(Clone)]
pub struct BorrowRequestsRepository {
    pool: Pool<Postgres>,
}

impl BorrowRequestsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn lock(tx: &mut Transaction<'_, Postgres>, request_id: i32) -> AppResult<BorrowRequest> {
        let query = format!(
            "SELECT {} FROM borrow_requests WHERE id = $1 FOR UPDATE",
            REQUEST_COLUMNS
        );
        sqlx::query_as::<_, BorrowRequestRow>(&query)
            .bind(request_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Borrow request with id {} not found", request_id))
            })?
            .try_into()
    }

    async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        checkout_id: i32,
        borrower: &Borrower,
        book_title: &str,
        book_author: &str,
        borrow_date: NaiveDate,
        line: &NewBorrowLine,
    ) -> AppResult<BorrowRequest> {
        let query = format!(
            r#"
            INSERT INTO borrow_requests (
                checkout_id, book_id, book_title, book_author,
                user_id, full_name, email, phone_no, role, staff_no, department,
                borrow_date, return_date, status, renewal_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 'pending', 'none')
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        );
        sqlx::query_as::<_, BorrowRequestRow>(&query)
            .bind(checkout_id)
            .bind(line.book_id)
            .bind(book_title)
            .bind(book_author)
            .bind(borrower.user_id)
            .bind(&borrower.full_name)
            .bind(&borrower.email)
            .bind(&borrower.phone_no)
            .bind(borrower.role.as_str())
            .bind(&borrower.staff_no)
            .bind(&borrower.department)
            .bind(borrow_date)
            .bind(line.return_date)
            .fetch_one(&mut **tx)
            .await?
            .try_into()
    }
}

#[async_trait]
impl BorrowStore for BorrowRequestsRepository {
    async fn has_active(&self, user_id: i32) -> AppResult<bool> {
        let query = format!(
            "SELECT EXISTS(SELECT 1 FROM borrow_requests WHERE user_id = $1 AND {})",
            ACTIVE
        );
        let active: bool = sqlx::query_scalar(&query)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(active)
    }

    async fn create_checkout(
        &self,
        borrower: &Borrower,
        borrow_date: NaiveDate,
        lines: Vec<NewBorrowLine>,
    ) -> AppResult<Vec<BorrowRequest>> {
        if lines.is_empty() {
            return Err(BorrowRule::EmptyCart.into());
        }

        let mut tx = self.pool.begin().await?;

        // Serializes checkouts of one user until commit
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(i64::from(borrower.user_id))
            .execute(&mut *tx)
            .await?;

        let query = format!(
            "SELECT EXISTS(SELECT 1 FROM borrow_requests WHERE user_id = $1 AND {})",
            ACTIVE
        );
        let active: bool = sqlx::query_scalar(&query)
            .bind(borrower.user_id)
            .fetch_one(&mut *tx)
            .await?;
        if active {
            return Err(BorrowRule::AlreadyBorrowed.into());
        }

        let checkout_id: i32 = sqlx::query_scalar("SELECT nextval('checkout_id_seq')::INTEGER")
            .fetch_one(&mut *tx)
            .await?;

        let mut created = Vec::with_capacity(lines.len());
        for line in &lines {
            let book = BooksRepository::lock(&mut tx, line.book_id).await?;
            book.check_checkout(borrower.user_id)?;

            let request = Self::insert(
                &mut tx,
                checkout_id,
                borrower,
                &book.title,
                &book.author,
                borrow_date,
                line,
            )
            .await?;
            // The hold becomes a pending request
            BooksRepository::write_status(&mut tx, book.id, BookStatus::Pending, None).await?;
            created.push(request);
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn get(&self, request_id: i32) -> AppResult<BorrowRequest> {
        let query = format!("SELECT {} FROM borrow_requests WHERE id = $1", REQUEST_COLUMNS);
        sqlx::query_as::<_, BorrowRequestRow>(&query)
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Borrow request with id {} not found", request_id))
            })?
            .try_into()
    }

    async fn list(&self, filter: &RequestFilter) -> AppResult<Vec<BorrowRequest>> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if filter.user_id.is_some() {
            conditions.push(format!("user_id = ${}", idx));
            idx += 1;
        }
        if !filter.statuses.is_empty() {
            conditions.push(format!("status = ANY(${})", idx));
            idx += 1;
        }
        if filter.renewal_status.is_some() {
            conditions.push(format!("renewal_status = ${}", idx));
        }
        if !filter.include_archived {
            conditions.push(ACTIVE.to_string());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let select_q = format!(
            "SELECT {} FROM borrow_requests {} ORDER BY created_at, id",
            REQUEST_COLUMNS, where_clause
        );
        let mut builder = sqlx::query_as::<_, BorrowRequestRow>(&select_q);
        if let Some(user_id) = filter.user_id {
            builder = builder.bind(user_id);
        }
        if !filter.statuses.is_empty() {
            let statuses: Vec<String> = filter.statuses.iter().map(|s| s.as_str().to_string()).collect();
            builder = builder.bind(statuses);
        }
        if let Some(renewal) = filter.renewal_status {
            builder = builder.bind(renewal.as_str());
        }

        builder
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(BorrowRequest::try_from)
            .collect()
    }

    async fn transition(
        &self,
        request_id: i32,
        command: LifecycleCommand,
        renewal_window_days: u32,
    ) -> AppResult<BorrowRequest> {
        let mut tx = self.pool.begin().await?;
        let current = Self::lock(&mut tx, request_id).await?;

        let planned = plan(&current, command, renewal_window_days, Utc::now())?;
        if !planned.changed {
            return Ok(current);
        }

        let next = planned.request;
        let query = format!(
            r#"
            UPDATE borrow_requests
            SET status = $1, renewal_status = $2, return_date = $3, proposed_return_date = $4,
                return_requested_at = $5, updated_at = $6, archived_at = $7
            WHERE id = $8
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        );
        let updated: BorrowRequest = sqlx::query_as::<_, BorrowRequestRow>(&query)
            .bind(next.status.as_str())
            .bind(next.renewal_status.as_str())
            .bind(next.return_date)
            .bind(next.proposed_return_date)
            .bind(next.return_requested_at)
            .bind(next.updated_at)
            .bind(next.archived_at)
            .bind(request_id)
            .fetch_one(&mut *tx)
            .await?
            .try_into()?;

        if let Some(book_status) = planned.book_status {
            BooksRepository::lock(&mut tx, updated.book_id).await?;
            BooksRepository::write_status(&mut tx, updated.book_id, book_status, None).await?;
        }

        tx.commit().await?;
        Ok(updated)
    }
}
