//! Book model and catalogue query types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::BookStatus;
use crate::error::{AppError, BorrowRule};

/// Internal row structure for database queries
#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    id: i32,
    title: String,
    author: String,
    category: String,
    description: Option<String>,
    image_url: Option<String>,
    status: String,
    held_by: Option<i32>,
    held_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<BookRow> for Book {
    type Error = AppError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        Ok(Book {
            id: row.id,
            title: row.title,
            author: row.author,
            category: row.category,
            description: row.description,
            image_url: row.image_url,
            status: row.status.parse().map_err(AppError::Internal)?,
            held_by: row.held_by,
            held_at: row.held_at,
            created_at: row.created_at,
        })
    }
}

/// Catalogue book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub category: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub status: BookStatus,
    /// User whose cart holds this book, until checkout or removal
    pub held_by: Option<i32>,
    /// Last cart write of the holder; the hold lapses with the cart
    pub held_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Lifetime of a cart hold, the same as the cart's
pub fn hold_ttl(ttl_seconds: u64) -> Duration {
    Duration::seconds(ttl_seconds.min(u64::from(u32::MAX)) as i64)
}

impl Book {
    /// Case-insensitive substring match over title, author and category
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.title.to_lowercase().contains(&term)
            || self.author.to_lowercase().contains(&term)
            || self.category.to_lowercase().contains(&term)
    }

    /// Case-insensitive substring match on a single field
    pub fn field_matches(&self, field: SearchField, value: &str) -> bool {
        let haystack = match field {
            SearchField::Title => &self.title,
            SearchField::Author => &self.author,
            SearchField::Category => &self.category,
        };
        haystack.to_lowercase().contains(&value.to_lowercase())
    }

    /// Release a hold not refreshed within `ttl`; returns whether one lapsed
    pub fn expire_hold(&mut self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let lapsed = self.held_by.is_some() && self.held_at.map_or(true, |at| at + ttl <= now);
        if lapsed {
            self.status = BookStatus::Available;
            self.held_by = None;
            self.held_at = None;
        }
        lapsed
    }

    /// Whether `user_id` may place a cart hold; `Ok(false)` when they already hold it
    pub fn check_hold(&self, user_id: i32) -> Result<bool, BorrowRule> {
        match self.status {
            BookStatus::Available => Ok(true),
            BookStatus::Pending if self.held_by == Some(user_id) => Ok(false),
            BookStatus::Pending => Err(BorrowRule::BookUnavailable { book_id: self.id }),
            BookStatus::Borrowed => Err(BorrowRule::BookBorrowed { book_id: self.id }),
        }
    }

    /// A book can be checked out only by the user holding it
    pub fn check_checkout(&self, user_id: i32) -> Result<(), BorrowRule> {
        match self.status {
            BookStatus::Pending if self.held_by == Some(user_id) => Ok(()),
            BookStatus::Borrowed => Err(BorrowRule::BookBorrowed { book_id: self.id }),
            _ => Err(BorrowRule::BookUnavailable { book_id: self.id }),
        }
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewBook {
    #[validate(length(min = 1, max = 500, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 255, message = "Author is required"))]
    pub author: String,
    #[validate(length(min = 1, max = 100, message = "Category is required"))]
    pub category: String,
    pub description: Option<String>,
    #[validate(url(message = "Invalid image URL"))]
    pub image_url: Option<String>,
}

/// Book listing query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Free-text search over title, author and category
    pub q: Option<String>,
    pub status: Option<BookStatus>,
}

/// Searchable book fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    Title,
    Author,
    Category,
}

impl SearchField {
    /// Column name, safe to interpolate into SQL
    pub fn column(&self) -> &'static str {
        match self {
            SearchField::Title => "title",
            SearchField::Author => "author",
            SearchField::Category => "category",
        }
    }
}

/// Field search query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BookSearch {
    pub field: SearchField,
    pub value: String,
}

/// Admin availability override
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateBookStatus {
    pub status: BookStatus,
}
