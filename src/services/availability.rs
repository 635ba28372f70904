//! Book availability tracker

use crate::{
    error::AppResult,
    models::{book::Book, enums::BookStatus},
    repository::Repository,
};

/// Every change of `Book.status` goes through the store methods called here or
/// through a lifecycle transition; nothing else writes it.
#[derive(Clone)]
pub struct AvailabilityService {
    repository: Repository,
}

impl AvailabilityService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Admin override, refused when it contradicts an active request or cart hold
    pub async fn set_status(&self, book_id: i32, status: BookStatus) -> AppResult<Book> {
        let book = self.repository.books.set_status(book_id, status).await?;
        tracing::info!("Book {} status set to {}", book_id, status);
        Ok(book)
    }

    pub async fn reserve(&self, book_id: i32, user_id: i32) -> AppResult<Book> {
        self.repository.books.reserve(book_id, user_id).await
    }

    pub async fn release(&self, book_id: i32, user_id: i32) -> AppResult<Book> {
        self.repository.books.release(book_id, user_id).await
    }

    pub async fn release_holds(&self, user_id: i32) -> AppResult<Vec<i32>> {
        let released = self.repository.books.release_holds(user_id).await?;
        if !released.is_empty() {
            tracing::info!("Released holds of user {} on books {:?}", user_id, released);
        }
        Ok(released)
    }
}
