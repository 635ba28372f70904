//! In-memory store backend.
//!
//! One `tokio::sync::Mutex` guards books, requests and messages, so every operation
//! sees and leaves a consistent state, the same guarantee the PostgreSQL
//! transactions give.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{BookStore, BorrowStore, CartStore, MessageStore};
use crate::{
    error::{AppError, AppResult, BorrowRule},
    models::{
        book::{hold_ttl, Book, BookQuery, NewBook, SearchField},
        borrow_request::{BorrowRequest, NewBorrowLine, RequestFilter},
        cart::Cart,
        enums::{BookStatus, RenewalStatus, RequestStatus},
        lifecycle::{implied_book_status, plan, LifecycleCommand},
        message::BorrowerMessage,
        user::Borrower,
    },
};

#[derive(Debug, Default)]
struct State {
    books: BTreeMap<i32, Book>,
    requests: BTreeMap<i32, BorrowRequest>,
    messages: Vec<BorrowerMessage>,
    next_book_id: i32,
    next_request_id: i32,
    next_checkout_id: i32,
    next_message_id: i32,
}

impl State {
    fn book(&self, book_id: i32) -> AppResult<&Book> {
        self.books
            .get(&book_id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))
    }

    fn book_mut(&mut self, book_id: i32) -> AppResult<&mut Book> {
        self.books
            .get_mut(&book_id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))
    }

    fn request(&self, request_id: i32) -> AppResult<&BorrowRequest> {
        self.requests.get(&request_id).ok_or_else(|| {
            AppError::NotFound(format!("Borrow request with id {} not found", request_id))
        })
    }

    fn has_active(&self, user_id: i32) -> bool {
        self.requests
            .values()
            .any(|r| r.borrower.user_id == user_id && r.status.is_active())
    }

    fn active_for_book(&self, book_id: i32) -> Option<RequestStatus> {
        self.requests
            .values()
            .find(|r| r.book_id == book_id && r.status.is_active())
            .map(|r| r.status)
    }

    fn expire_holds(&mut self, now: DateTime<Utc>, ttl: Duration) {
        for book in self.books.values_mut() {
            book.expire_hold(now, ttl);
        }
    }

    fn touch_holds(&mut self, user_id: i32, now: DateTime<Utc>) {
        for book in self.books.values_mut() {
            if book.held_by == Some(user_id) {
                book.held_at = Some(now);
            }
        }
    }
}

/// Books, borrow requests and messages held in process memory
#[derive(Debug, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    hold_ttl: Duration,
}

impl MemoryStore {
    pub fn new(hold_ttl_seconds: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            hold_ttl: hold_ttl(hold_ttl_seconds),
        }
    }

    /// Lock the state with lapsed cart holds released
    async fn live(&self) -> tokio::sync::MutexGuard<'_, State> {
        let mut state = self.state.lock().await;
        state.expire_holds(Utc::now(), self.hold_ttl);
        state
    }
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn list(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let state = self.live().await;
        let term = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty());

        let mut books: Vec<Book> = state
            .books
            .values()
            .filter(|book| term.map_or(true, |term| book.matches(term)))
            .filter(|book| query.status.map_or(true, |status| book.status == status))
            .cloned()
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(books)
    }

    async fn search(&self, field: SearchField, value: &str) -> AppResult<Vec<Book>> {
        let state = self.live().await;
        let mut books: Vec<Book> = state
            .books
            .values()
            .filter(|book| book.field_matches(field, value.trim()))
            .cloned()
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(books)
    }

    async fn get(&self, book_id: i32) -> AppResult<Book> {
        self.live().await.book(book_id).cloned()
    }

    async fn create(&self, book: &NewBook) -> AppResult<Book> {
        let mut state = self.state.lock().await;
        state.next_book_id += 1;
        let created = Book {
            id: state.next_book_id,
            title: book.title.clone(),
            author: book.author.clone(),
            category: book.category.clone(),
            description: book.description.clone(),
            image_url: book.image_url.clone(),
            status: BookStatus::Available,
            held_by: None,
            held_at: None,
            created_at: Utc::now(),
        };
        state.books.insert(created.id, created.clone());
        Ok(created)
    }

    async fn reserve(&self, book_id: i32, user_id: i32) -> AppResult<Book> {
        let now = Utc::now();
        let mut state = self.live().await;
        let book = state.book_mut(book_id)?;
        if book.check_hold(user_id)? {
            book.status = BookStatus::Pending;
            book.held_by = Some(user_id);
        }
        state.touch_holds(user_id, now);
        state.book(book_id).cloned()
    }

    async fn release(&self, book_id: i32, user_id: i32) -> AppResult<Book> {
        let now = Utc::now();
        let mut state = self.live().await;
        let book = state.book_mut(book_id)?;
        if book.held_by == Some(user_id) {
            book.status = BookStatus::Available;
            book.held_by = None;
            book.held_at = None;
        }
        state.touch_holds(user_id, now);
        state.book(book_id).cloned()
    }

    async fn release_holds(&self, user_id: i32) -> AppResult<Vec<i32>> {
        let mut state = self.state.lock().await;
        let mut released = Vec::new();
        for book in state.books.values_mut() {
            if book.held_by == Some(user_id) {
                book.status = BookStatus::Available;
                book.held_by = None;
                book.held_at = None;
                released.push(book.id);
            }
        }
        Ok(released)
    }

    async fn set_status(&self, book_id: i32, status: BookStatus) -> AppResult<Book> {
        let mut state = self.live().await;
        let active = state.active_for_book(book_id);
        let book = state.book_mut(book_id)?;

        let expected = implied_book_status(active, book.held_by.is_some());
        if status != expected {
            return Err(AppError::Conflict(format!(
                "Book {} must stay {} while it has an active request or cart hold",
                book_id, expected
            )));
        }
        book.status = status;
        Ok(book.clone())
    }
}

#[async_trait]
impl BorrowStore for MemoryStore {
    async fn has_active(&self, user_id: i32) -> AppResult<bool> {
        Ok(self.state.lock().await.has_active(user_id))
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

        let mut state = self.state.lock().await;
        if state.has_active(borrower.user_id) {
            return Err(BorrowRule::AlreadyBorrowed.into());
        }
        // Validate every line before writing anything
        for line in &lines {
            state.book(line.book_id)?.check_checkout(borrower.user_id)?;
        }

        state.next_checkout_id += 1;
        let checkout_id = state.next_checkout_id;
        let now = Utc::now();

        let mut created = Vec::with_capacity(lines.len());
        for line in lines {
            let book = state.book_mut(line.book_id)?;
            book.held_by = None;
            book.held_at = None;
            let (book_title, book_author) = (book.title.clone(), book.author.clone());

            state.next_request_id += 1;
            let request = BorrowRequest {
                id: state.next_request_id,
                checkout_id,
                book_id: line.book_id,
                book_title,
                book_author,
                borrower: borrower.clone(),
                borrow_date,
                return_date: line.return_date,
                status: RequestStatus::Pending,
                renewal_status: RenewalStatus::None,
                proposed_return_date: None,
                return_requested_at: None,
                created_at: now,
                updated_at: now,
                archived_at: None,
            };
            state.requests.insert(request.id, request.clone());
            created.push(request);
        }
        Ok(created)
    }

    async fn get(&self, request_id: i32) -> AppResult<BorrowRequest> {
        self.state.lock().await.request(request_id).cloned()
    }

    async fn list(&self, filter: &RequestFilter) -> AppResult<Vec<BorrowRequest>> {
        let state = self.state.lock().await;
        Ok(state
            .requests
            .values()
            .filter(|request| filter.matches(request))
            .cloned()
            .collect())
    }

    async fn transition(
        &self,
        request_id: i32,
        command: LifecycleCommand,
        renewal_window_days: u32,
    ) -> AppResult<BorrowRequest> {
        let mut state = self.state.lock().await;
        let current = state.request(request_id)?;

        let planned = plan(current, command, renewal_window_days, Utc::now())?;
        if !planned.changed {
            return Ok(planned.request);
        }

        if let Some(book_status) = planned.book_status {
            let book = state.book_mut(planned.request.book_id)?;
            book.status = book_status;
            book.held_by = None;
            book.held_at = None;
        }
        state.requests.insert(request_id, planned.request.clone());
        Ok(planned.request)
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn create(&self, borrower_id: i32, sender_id: i32, body: &str) -> AppResult<BorrowerMessage> {
        let mut state = self.state.lock().await;
        state.next_message_id += 1;
        let message = BorrowerMessage {
            id: state.next_message_id,
            borrower_id,
            sender_id,
            body: body.to_string(),
            created_at: Utc::now(),
        };
        state.messages.push(message.clone());
        Ok(message)
    }

    async fn list_for(&self, borrower_id: i32) -> AppResult<Vec<BorrowerMessage>> {
        let state = self.state.lock().await;
        Ok(state
            .messages
            .iter()
            .rev()
            .filter(|message| message.borrower_id == borrower_id)
            .cloned()
            .collect())
    }
}

/// Carts held in process memory; they live until cleared or restart
#[derive(Debug, Clone, Default)]
pub struct MemoryCartStore {
    carts: Arc<Mutex<HashMap<i32, Cart>>>,
}

impl MemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn load(&self, user_id: i32) -> AppResult<Cart> {
        Ok(self
            .carts
            .lock()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| Cart::empty(user_id)))
    }

    async fn save(&self, cart: &Cart) -> AppResult<()> {
        let mut carts = self.carts.lock().await;
        if cart.is_empty() {
            carts.remove(&cart.user_id);
        } else {
            carts.insert(cart.user_id, cart.clone());
        }
        Ok(())
    }

    async fn clear(&self, user_id: i32) -> AppResult<()> {
        self.carts.lock().await.remove(&user_id);
        Ok(())
    }
}
