//! Session cart of books awaiting checkout

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::book::Book;
use super::enums::CheckoutFlow;
use super::user::Borrower;

/// Book details kept on a cart entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartBook {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub category: String,
}

impl From<&Book> for CartBook {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            category: book.category.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartEntry {
    pub book: CartBook,
    pub borrower: Borrower,
    /// Which loan-period table applies to this selection
    #[serde(default)]
    pub flow: CheckoutFlow,
    pub added_at: DateTime<Utc>,
}

/// Ordered cart of one user
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct Cart {
    pub user_id: i32,
    pub entries: Vec<CartEntry>,
}

impl Cart {
    pub fn empty(user_id: i32) -> Self {
        Self {
            user_id,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, book_id: i32) -> bool {
        self.entries.iter().any(|entry| entry.book.id == book_id)
    }

    /// Remove the entry for `book_id`; returns whether it was present
    pub fn remove(&mut self, book_id: i32) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.book.id != book_id);
        self.entries.len() != before
    }
}

/// Cart entry with the due date it would get if checked out on `borrow_date`
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CartLine {
    #[serde(flatten)]
    pub entry: CartEntry,
    pub due_date: NaiveDate,
}

/// Cart as shown to its owner
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CartView {
    pub user_id: i32,
    /// Maximum number of entries for the owner's role
    pub quota: u32,
    pub borrow_date: NaiveDate,
    pub lines: Vec<CartLine>,
}

/// Add to cart request
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCart {
    pub book_id: i32,
    /// Where the selection was made; defaults to the catalogue
    #[serde(default)]
    pub flow: CheckoutFlow,
}

/// Checkout request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CheckoutInfo {
    /// Defaults to today
    pub borrow_date: Option<NaiveDate>,
}
