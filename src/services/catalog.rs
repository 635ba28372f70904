//! Catalog service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, NewBook, SearchField},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List books, optionally filtered by free text and status
    pub async fn list_books(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        self.repository.books.list(query).await
    }

    /// Search a single field
    pub async fn search_books(&self, field: SearchField, value: &str) -> AppResult<Vec<Book>> {
        if value.trim().is_empty() {
            return Err(AppError::Validation("Search value is required".to_string()));
        }
        self.repository.books.search(field, value).await
    }

    pub async fn get_book(&self, book_id: i32) -> AppResult<Book> {
        self.repository.books.get(book_id).await
    }

    /// Add a book to the catalogue, initially available
    pub async fn create_book(&self, book: NewBook) -> AppResult<Book> {
        book.validate()?;
        let created = self.repository.books.create(&book).await?;
        tracing::info!("Created book {} ({})", created.id, created.title);
        Ok(created)
    }
}
