//! Data models for Libris

pub mod book;
pub mod borrow_request;
pub mod cart;
pub mod enums;
pub mod lifecycle;
pub mod message;
pub mod user;

// Re-export commonly used types
pub use book::Book;
pub use borrow_request::{BorrowRequest, BorrowRequestView, BorrowerRequests};
pub use cart::{Cart, CartEntry};
pub use enums::{BookStatus, CheckoutFlow, RenewalStatus, RequestStatus, Role};
pub use lifecycle::LifecycleCommand;
pub use message::BorrowerMessage;
pub use user::{Borrower, UserClaims};
