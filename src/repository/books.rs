//! Books repository for database operations

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::{Pool, Postgres, Transaction};

use super::BookStore;
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{hold_ttl, Book, BookQuery, BookRow, NewBook, SearchField},
        enums::{BookStatus, RequestStatus},
        lifecycle::implied_book_status,
    },
};

const BOOK_COLUMNS: &str =
    "id, title, author, category, description, image_url, status, held_by, held_at, created_at";

/// `%term%` for ILIKE, with wildcards in the term escaped
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
    hold_ttl: Duration,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>, hold_ttl_seconds: u64) -> Self {
        Self {
            pool,
            hold_ttl: hold_ttl(hold_ttl_seconds),
        }
    }

    /// Rows as readers see them: lapsed holds read as available
    fn live(&self, row: BookRow) -> AppResult<Book> {
        let mut book = Book::try_from(row)?;
        book.expire_hold(Utc::now(), self.hold_ttl);
        Ok(book)
    }

    fn into_books(&self, rows: Vec<BookRow>) -> AppResult<Vec<Book>> {
        rows.into_iter().map(|row| self.live(row)).collect()
    }

    /// Lock a book row for the rest of the transaction
    pub(crate) async fn lock(tx: &mut Transaction<'_, Postgres>, book_id: i32) -> AppResult<Book> {
        let query = format!("SELECT {} FROM books WHERE id = $1 FOR UPDATE", BOOK_COLUMNS);
        sqlx::query_as::<_, BookRow>(&query)
            .bind(book_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?
            .try_into()
    }

    /// Write status and hold of a locked book; a new holder starts a fresh hold
    pub(crate) async fn write_status(
        tx: &mut Transaction<'_, Postgres>,
        book_id: i32,
        status: BookStatus,
        held_by: Option<i32>,
    ) -> AppResult<Book> {
        let query = format!(
            r#"
            UPDATE books SET
                status = $1,
                held_by = $2,
                held_at = CASE
                    WHEN $2::INTEGER IS NULL THEN NULL
                    WHEN held_by IS NOT DISTINCT FROM $2::INTEGER THEN held_at
                    ELSE NOW()
                END
            WHERE id = $3
            RETURNING {}
            "#,
            BOOK_COLUMNS
        );
        sqlx::query_as::<_, BookRow>(&query)
            .bind(status.as_str())
            .bind(held_by)
            .bind(book_id)
            .fetch_one(&mut **tx)
            .await?
            .try_into()
    }

    /// A cart write keeps every hold of its owner alive
    async fn touch_holds(tx: &mut Transaction<'_, Postgres>, user_id: i32) -> AppResult<()> {
        sqlx::query("UPDATE books SET held_at = NOW() WHERE held_by = $1")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn list(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        let term = query
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(like_pattern);

        if term.is_some() {
            conditions.push(format!(
                "(title ILIKE ${0} OR author ILIKE ${0} OR category ILIKE ${0})",
                idx
            ));
            idx += 1;
        }
        if query.status.is_some() {
            conditions.push(format!("status = ${}", idx));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let select_q = format!("SELECT {} FROM books {} ORDER BY title, id", BOOK_COLUMNS, where_clause);
        let mut builder = sqlx::query_as::<_, BookRow>(&select_q);
        if let Some(ref term) = term {
            builder = builder.bind(term);
        }
        if let Some(status) = query.status {
            builder = builder.bind(status.as_str());
        }

        self.into_books(builder.fetch_all(&self.pool).await?)
    }

    async fn search(&self, field: SearchField, value: &str) -> AppResult<Vec<Book>> {
        let query = format!(
            "SELECT {} FROM books WHERE {} ILIKE $1 ORDER BY title, id",
            BOOK_COLUMNS,
            field.column()
        );
        let rows = sqlx::query_as::<_, BookRow>(&query)
            .bind(like_pattern(value.trim()))
            .fetch_all(&self.pool)
            .await?;
        self.into_books(rows)
    }

    async fn get(&self, book_id: i32) -> AppResult<Book> {
        let query = format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS);
        let row = sqlx::query_as::<_, BookRow>(&query)
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;
        self.live(row)
    }

    async fn create(&self, book: &NewBook) -> AppResult<Book> {
        let query = format!(
            r#"
            INSERT INTO books (title, author, category, description, image_url, status)
            VALUES ($1, $2, $3, $4, $5, 'available')
            RETURNING {}
            "#,
            BOOK_COLUMNS
        );
        sqlx::query_as::<_, BookRow>(&query)
            .bind(&book.title)
            .bind(&book.author)
            .bind(&book.category)
            .bind(&book.description)
            .bind(&book.image_url)
            .fetch_one(&self.pool)
            .await?
            .try_into()
    }

    async fn reserve(&self, book_id: i32, user_id: i32) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;
        let mut book = Self::lock(&mut tx, book_id).await?;

        if book.expire_hold(Utc::now(), self.hold_ttl) {
            tracing::info!("Lapsed cart hold on book {} released", book_id);
        }
        if book.check_hold(user_id)? {
            Self::write_status(&mut tx, book_id, BookStatus::Pending, Some(user_id)).await?;
        }
        Self::touch_holds(&mut tx, user_id).await?;

        let book = Self::lock(&mut tx, book_id).await?;
        tx.commit().await?;
        Ok(book)
    }

    async fn release(&self, book_id: i32, user_id: i32) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;
        let book = Self::lock(&mut tx, book_id).await?;

        let book = if book.held_by == Some(user_id) {
            Self::write_status(&mut tx, book_id, BookStatus::Available, None).await?
        } else {
            book
        };
        Self::touch_holds(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(book)
    }

    async fn release_holds(&self, user_id: i32) -> AppResult<Vec<i32>> {
        let ids = sqlx::query_scalar::<_, i32>(
            "UPDATE books SET status = 'available', held_by = NULL, held_at = NULL WHERE held_by = $1 RETURNING id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn set_status(&self, book_id: i32, status: BookStatus) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;
        let mut book = Self::lock(&mut tx, book_id).await?;
        book.expire_hold(Utc::now(), self.hold_ttl);

        let active: Option<String> = sqlx::query_scalar(
            r#"
            SELECT status FROM borrow_requests
            WHERE book_id = $1 AND status NOT IN ('rejected', 'returned')
            "#,
        )
        .bind(book_id)
        .fetch_optional(&mut *tx)
        .await?;
        let active = active
            .map(|s| s.parse::<RequestStatus>())
            .transpose()
            .map_err(AppError::Internal)?;

        let expected = implied_book_status(active, book.held_by.is_some());
        if status != expected {
            return Err(AppError::Conflict(format!(
                "Book {} must stay {} while it has an active request or cart hold",
                book_id, expected
            )));
        }

        let book = Self::write_status(&mut tx, book_id, status, book.held_by).await?;
        tx.commit().await?;
        Ok(book)
    }
}
