//! Repository layer: store traits and their backends.
//!
//! PostgreSQL holds books, borrow requests and messages; Redis holds session carts.
//! The in-memory backend implements every store for local runs and tests.
//! Every method that changes more than one record runs as a single transaction.

pub mod books;
pub mod borrow_requests;
pub mod carts;
pub mod memory;
pub mod messages;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookQuery, NewBook, SearchField},
        borrow_request::{BorrowRequest, NewBorrowLine, RequestFilter},
        cart::Cart,
        enums::BookStatus,
        lifecycle::LifecycleCommand,
        message::BorrowerMessage,
        user::Borrower,
    },
    services::redis::RedisService,
};

/// Catalogue and book availability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn list(&self, query: &BookQuery) -> AppResult<Vec<Book>>;

    async fn search(&self, field: SearchField, value: &str) -> AppResult<Vec<Book>>;

    async fn get(&self, book_id: i32) -> AppResult<Book>;

    async fn create(&self, book: &NewBook) -> AppResult<Book>;

    /// Hold an available book for a user's cart (`available -> pending`).
    /// Holding a book already held by the same user succeeds unchanged.
    async fn reserve(&self, book_id: i32, user_id: i32) -> AppResult<Book>;

    /// Drop a user's hold (`pending -> available`); no-op if the user holds nothing
    async fn release(&self, book_id: i32, user_id: i32) -> AppResult<Book>;

    /// Drop every hold of a user, returning the released book ids
    async fn release_holds(&self, user_id: i32) -> AppResult<Vec<i32>>;

    /// Overwrite the status, only when it agrees with holds and active requests
    async fn set_status(&self, book_id: i32, status: BookStatus) -> AppResult<Book>;
}

/// Borrow requests and their lifecycle
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BorrowStore: Send + Sync {
    /// Whether the user has any request that is neither returned nor rejected
    async fn has_active(&self, user_id: i32) -> AppResult<bool>;

    /// Turn held books into pending requests, one checkout batch per call
    async fn create_checkout(
        &self,
        borrower: &Borrower,
        borrow_date: NaiveDate,
        lines: Vec<NewBorrowLine>,
    ) -> AppResult<Vec<BorrowRequest>>;

    async fn get(&self, request_id: i32) -> AppResult<BorrowRequest>;

    async fn list(&self, filter: &RequestFilter) -> AppResult<Vec<BorrowRequest>>;

    /// Apply a lifecycle command and its book availability effect together
    async fn transition(
        &self,
        request_id: i32,
        command: LifecycleCommand,
        renewal_window_days: u32,
    ) -> AppResult<BorrowRequest>;
}

/// Session-scoped carts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Returns an empty cart when the user has none
    async fn load(&self, user_id: i32) -> AppResult<Cart>;

    async fn save(&self, cart: &Cart) -> AppResult<()>;

    async fn clear(&self, user_id: i32) -> AppResult<()>;
}

/// Staff-to-borrower messages
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn create(&self, borrower_id: i32, sender_id: i32, body: &str) -> AppResult<BorrowerMessage>;

    async fn list_for(&self, borrower_id: i32) -> AppResult<Vec<BorrowerMessage>>;
}

/// Main repository struct holding the store backends
#[derive(Clone)]
pub struct Repository {
    /// Present on the PostgreSQL backend, used by readiness checks
    pub pool: Option<Pool<Postgres>>,
    pub books: Arc<dyn BookStore>,
    pub borrows: Arc<dyn BorrowStore>,
    pub carts: Arc<dyn CartStore>,
    pub messages: Arc<dyn MessageStore>,
}

impl Repository {
    /// PostgreSQL stores with Redis-backed carts
    pub fn postgres(pool: Pool<Postgres>, redis: RedisService, cart_ttl_seconds: u64) -> Self {
        Self {
            books: Arc::new(books::BooksRepository::new(pool.clone(), cart_ttl_seconds)),
            borrows: Arc::new(borrow_requests::BorrowRequestsRepository::new(pool.clone())),
            carts: Arc::new(carts::RedisCartRepository::new(redis, cart_ttl_seconds)),
            messages: Arc::new(messages::MessagesRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Process-local stores; cart holds lapse after `cart_ttl_seconds`
    pub fn in_memory(cart_ttl_seconds: u64) -> Self {
        let store = memory::MemoryStore::new(cart_ttl_seconds);
        Self {
            pool: None,
            books: Arc::new(store.clone()),
            borrows: Arc::new(store.clone()),
            carts: Arc::new(memory::MemoryCartStore::new()),
            messages: Arc::new(store),
        }
    }

    /// Check that the database answers
    pub async fn ping(&self) -> AppResult<()> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}
